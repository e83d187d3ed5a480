//! Boards: metadata and membership management, invites, and live task
//! sessions.

pub mod invite;
pub mod manager;
pub mod session;

pub use manager::BoardManager;
pub use session::BoardSession;

use foard_model::ModelError;
use foard_model::board::BoardId;
use foard_store::StoreError;

/// Errors from board operations.
#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    /// The model or the ordering engine rejected the edit.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// The document store failed (usually transaction contention).
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The board document does not exist.
    #[error("board not found: {0}")]
    BoardNotFound(BoardId),

    /// The user is not a member of the board.
    #[error("user {user_id} is not a member of board {board_id}")]
    AccessDenied {
        /// The rejected user.
        user_id: String,
        /// The board they tried to open.
        board_id: BoardId,
    },

    /// The invite token is unknown, expired, or already consumed.
    #[error("invite is invalid or has expired")]
    InviteInvalid,
}
