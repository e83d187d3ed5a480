//! Local identity: deterministic user ids and sign-in state.
//!
//! There are no passwords. A user id is derived from the display name plus a
//! lucky number, so the same pair signs in as the same user from any client.
//! Sign-in state is published through a watch channel; callers that need an
//! identity wait on it with a bounded timeout instead of polling.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::watch;

use foard_store::{DocumentStore, Fields, StoreError};

use foard_model::board::collections;

/// Errors from identity operations.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// The display name was empty after trimming.
    #[error("display name must not be empty")]
    NameEmpty,

    /// No identity became available within the wait timeout.
    #[error("no identity available within {0:?}")]
    Timeout(Duration),

    /// Persisting the user profile failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    /// Derived user id, stable across clients for the same name and number.
    pub user_id: String,
    /// Display name as entered (trimmed).
    pub name: String,
}

/// Derives the stable user id for a name and lucky number.
///
/// The name is trimmed and lowercased first, so "Alice" and " alice " are
/// the same user.
#[must_use]
pub fn derive_user_id(name: &str, lucky_number: u32) -> String {
    let normalized = name.trim().to_lowercase();
    let digest = Sha256::digest(format!("{normalized}:{lucky_number}"));
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        use std::fmt::Write;
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// Sign-in state shared between the UI task and board sessions.
#[derive(Debug)]
pub struct Identity {
    tx: watch::Sender<Option<AuthUser>>,
}

impl Default for Identity {
    fn default() -> Self {
        Self::new()
    }
}

impl Identity {
    /// Creates signed-out state.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Signs in, deriving the user id and publishing the new state.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::NameEmpty`] if the name is blank.
    pub fn sign_in(&self, name: &str, lucky_number: u32) -> Result<AuthUser, IdentityError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(IdentityError::NameEmpty);
        }
        let user = AuthUser {
            user_id: derive_user_id(trimmed, lucky_number),
            name: trimmed.to_string(),
        };
        tracing::info!(user_id = %user.user_id, "signed in");
        self.tx.send_replace(Some(user.clone()));
        Ok(user)
    }

    /// Signs out.
    pub fn sign_out(&self) {
        self.tx.send_replace(None);
    }

    /// Returns the current identity, if signed in.
    #[must_use]
    pub fn current(&self) -> Option<AuthUser> {
        self.tx.borrow().clone()
    }

    /// Waits until someone signs in, up to `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Timeout`] if nobody signs in before the
    /// deadline.
    pub async fn wait(&self, timeout: Duration) -> Result<AuthUser, IdentityError> {
        let mut rx = self.tx.subscribe();
        let waited = tokio::time::timeout(timeout, async {
            loop {
                if let Some(user) = rx.borrow_and_update().clone() {
                    return user;
                }
                if rx.changed().await.is_err() {
                    // Sender dropped while signed out; keep waiting out the
                    // timeout so the caller sees a consistent error.
                    std::future::pending::<()>().await;
                }
            }
        })
        .await;
        waited.map_err(|_| IdentityError::Timeout(timeout))
    }
}

/// Persists the user profile so other members can resolve ids to names.
///
/// # Errors
///
/// Propagates store write failures.
pub async fn upsert_user(store: &DocumentStore, user: &AuthUser) -> Result<(), IdentityError> {
    let mut fields = Fields::new();
    fields.insert("name".to_string(), user.name.clone().into());
    store
        .merge(collections::USERS, user.user_id.clone(), fields)
        .await?;
    Ok(())
}
