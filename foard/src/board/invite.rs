//! Invite links: opaque tokens that grant board membership.
//!
//! A token is 16 random bytes, hex encoded, stored under its own key in the
//! invites collection. Tokens expire after the configured TTL and are
//! deleted once redeemed. Expired tokens found during resolution are deleted
//! opportunistically.

use std::fmt::Write as _;
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;

use foard_model::board::{BoardId, Invite, MemberRole, Membership, collections};
use foard_store::Fields;

use crate::board::{BoardError, BoardManager};
use crate::cache::keys;
use crate::identity::AuthUser;

fn random_token() -> String {
    let bytes: [u8; 16] = rand::random();
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

fn to_fields<T: serde::Serialize>(value: &T) -> Fields {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => map,
        _ => Fields::new(),
    }
}

impl BoardManager {
    /// Issues an invite for a board. Only members can invite.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::AccessDenied`] if `user` is not a member.
    pub async fn create_invite(
        &self,
        user: &AuthUser,
        board_id: &BoardId,
        ttl: Duration,
    ) -> Result<Invite, BoardError> {
        if !self.is_member(board_id, &user.user_id).await? {
            return Err(BoardError::AccessDenied {
                user_id: user.user_id.clone(),
                board_id: board_id.clone(),
            });
        }

        let now = Utc::now();
        let invite = Invite {
            board_id: board_id.clone(),
            token: random_token(),
            created_by: user.user_id.clone(),
            created_at: now,
            expires_at: now
                + chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::hours(72)),
        };
        self.store()
            .set(collections::INVITES, invite.token.clone(), to_fields(&invite))
            .await?;
        tracing::info!(board_id = %board_id, "invite created");
        Ok(invite)
    }

    /// Looks up an invite by token, rejecting unknown and expired tokens.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::InviteInvalid`] for unknown or expired tokens.
    pub async fn resolve_invite(&self, token: &str) -> Result<Invite, BoardError> {
        let doc = self
            .store()
            .get(collections::INVITES, token)
            .await
            .ok_or(BoardError::InviteInvalid)?;
        let invite: Invite = serde_json::from_value(Value::Object(doc.data))
            .map_err(foard_model::ModelError::from)?;
        if !invite.is_valid_at(Utc::now()) {
            // Expired tokens are garbage; removal is best effort.
            let _ = self.store().delete(collections::INVITES, token).await;
            return Err(BoardError::InviteInvalid);
        }
        Ok(invite)
    }

    /// Redeems an invite, creating a membership for `user`.
    ///
    /// Accepting twice is idempotent: an existing member keeps their current
    /// membership (and role) and the token is simply consumed.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::InviteInvalid`] for unknown or expired tokens.
    pub async fn accept_invite(
        &self,
        user: &AuthUser,
        token: &str,
    ) -> Result<Membership, BoardError> {
        let invite = self.resolve_invite(token).await?;
        let board_id = invite.board_id.clone();

        if let Some(existing) = self.membership(&board_id, &user.user_id).await? {
            let _ = self.store().delete(collections::INVITES, token).await;
            return Ok(existing);
        }

        let membership = Membership {
            board_id: board_id.clone(),
            user_id: user.user_id.clone(),
            role: MemberRole::Member,
            joined_at: Utc::now(),
        };
        self.store()
            .set(
                collections::MEMBERS,
                Membership::document_key(&board_id, &user.user_id),
                to_fields(&membership),
            )
            .await?;
        let _ = self.store().delete(collections::INVITES, token).await;

        // One prefix covers the member list and every cached membership of
        // the board, including a cached miss for the accepting user.
        self.cache()
            .invalidate_prefix(&keys::members(&board_id.to_string()));
        tracing::info!(board_id = %board_id, user_id = %user.user_id, "invite accepted");
        Ok(membership)
    }
}
