//! Board, membership, and invite document shapes shared by the client and
//! its tests. Like tasks, these are persisted as camelCase JSON documents
//! whose key is carried separately.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::task::ModelError;

/// Collection names and paths in the document store.
pub mod collections {
    /// Board metadata documents, keyed by board id.
    pub const BOARDS: &str = "boards";
    /// Membership documents, keyed by `"{board}_{user}"`.
    pub const MEMBERS: &str = "boardMembers";
    /// Outstanding invite tokens.
    pub const INVITES: &str = "boardInvites";
    /// User profile documents, keyed by derived user id.
    pub const USERS: &str = "users";

    /// The per-board task sub-collection path.
    #[must_use]
    pub fn tasks(board_id: &super::BoardId) -> String {
        format!("{BOARDS}/{board_id}/tasks")
    }
}

/// Unique identifier for a board (UUID v7).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoardId(Uuid);

impl BoardId {
    /// Creates a new time-ordered board identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Parses a board id from a document key.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidTaskId`] if the key is not a UUID.
    pub fn parse(key: &str) -> Result<Self, ModelError> {
        Uuid::parse_str(key)
            .map(Self)
            .map_err(|_| ModelError::InvalidTaskId(key.to_string()))
    }
}

impl Default for BoardId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for BoardId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Board metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    /// Document key.
    #[serde(skip)]
    pub id: BoardId,
    /// Display name; never empty (creation substitutes "Untitled").
    pub name: String,
    /// Identity of the creating user.
    pub owner_id: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Role of a board member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    /// Created the board.
    Owner,
    /// Joined by invite.
    Member,
}

/// One user's membership of one board. Document key is
/// [`Membership::document_key`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    /// The board.
    pub board_id: BoardId,
    /// The member's user id.
    pub user_id: String,
    /// Owner or member.
    pub role: MemberRole,
    /// When the membership was established.
    pub joined_at: DateTime<Utc>,
}

impl Membership {
    /// The deterministic document key, `"{board}_{user}"`. One document per
    /// (board, user) pair makes the membership check a single point read.
    #[must_use]
    pub fn document_key(board_id: &BoardId, user_id: &str) -> String {
        format!("{board_id}_{user_id}")
    }
}

/// An outstanding invitation to join a board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invite {
    /// The board the invite grants access to.
    pub board_id: BoardId,
    /// Opaque random token carried in the invite link.
    pub token: String,
    /// Identity of the issuing user.
    pub created_by: String,
    /// Issue time.
    pub created_at: DateTime<Utc>,
    /// The invite is rejected after this instant.
    pub expires_at: DateTime<Utc>,
}

impl Invite {
    /// Whether the invite is still valid at `now`.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}
