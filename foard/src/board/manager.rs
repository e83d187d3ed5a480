//! Board metadata and membership reads/writes.
//!
//! All reads go through the TTL cache; writes invalidate the keys they make
//! stale. Board creation writes the board document and the owner membership
//! in one atomic batch so a board can never exist without its owner.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use foard_model::board::{Board, BoardId, MemberRole, Membership, collections};
use foard_store::{Direction, DocumentStore, Fields, Mutation, Query};

use crate::board::BoardError;
use crate::cache::{ReadCache, keys};
use crate::config::CacheConfig;
use crate::identity::AuthUser;

fn to_fields<T: serde::Serialize>(value: &T) -> Fields {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => map,
        // Document structs always serialize to objects.
        _ => Fields::new(),
    }
}

/// Cached access to boards, memberships, and user profiles.
pub struct BoardManager {
    store: Arc<DocumentStore>,
    cache: Arc<ReadCache>,
    ttl: CacheConfig,
    title_limit: usize,
}

impl BoardManager {
    /// Creates a manager over a store with its own cache.
    #[must_use]
    pub fn new(store: Arc<DocumentStore>, ttl: CacheConfig) -> Self {
        Self {
            store,
            cache: Arc::new(ReadCache::new()),
            ttl,
            title_limit: foard_model::MAX_TASK_TITLE_LENGTH,
        }
    }

    /// Overrides the task title length limit sessions validate against.
    #[must_use]
    pub fn with_title_limit(mut self, limit: usize) -> Self {
        self.title_limit = limit;
        self
    }

    pub(crate) fn store(&self) -> &Arc<DocumentStore> {
        &self.store
    }

    pub(crate) fn cache(&self) -> &ReadCache {
        &self.cache
    }

    pub(crate) fn title_limit(&self) -> usize {
        self.title_limit
    }

    /// Creates a board owned by `user`. A blank name becomes "Untitled".
    ///
    /// # Errors
    ///
    /// Propagates store write failures.
    pub async fn create_board(&self, user: &AuthUser, name: &str) -> Result<Board, BoardError> {
        let trimmed = name.trim();
        let board = Board {
            id: BoardId::new(),
            name: if trimmed.is_empty() {
                "Untitled".to_string()
            } else {
                trimmed.to_string()
            },
            owner_id: user.user_id.clone(),
            created_at: Utc::now(),
        };
        let membership = Membership {
            board_id: board.id.clone(),
            user_id: user.user_id.clone(),
            role: MemberRole::Owner,
            joined_at: board.created_at,
        };

        self.store
            .commit_batch(vec![
                Mutation::set(collections::BOARDS, board.id.to_string(), to_fields(&board)),
                Mutation::set(
                    collections::MEMBERS,
                    Membership::document_key(&board.id, &user.user_id),
                    to_fields(&membership),
                ),
            ])
            .await?;

        tracing::info!(board_id = %board.id, owner = %user.user_id, "board created");
        self.cache.invalidate(&keys::members(&board.id.to_string()));
        Ok(board)
    }

    /// Fetches board metadata through the cache.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::BoardNotFound`] if the document is missing.
    pub async fn board(&self, board_id: &BoardId) -> Result<Board, BoardError> {
        let key = keys::board(&board_id.to_string());
        let mut board: Board = self
            .cache
            .get_or_fetch(&key, self.ttl.default_ttl, || async {
                let doc = self
                    .store
                    .get(collections::BOARDS, &board_id.to_string())
                    .await
                    .ok_or_else(|| BoardError::BoardNotFound(board_id.clone()))?;
                let board: Board = serde_json::from_value(Value::Object(doc.data))
                    .map_err(foard_model::ModelError::from)?;
                Ok::<Board, BoardError>(board)
            })
            .await?;
        // The id is the document key, not a field; restore it after the
        // cache round trip.
        board.id = board_id.clone();
        Ok(board)
    }

    /// Fetches one membership through the cache. `None` means not a member.
    ///
    /// # Errors
    ///
    /// Propagates document decode failures.
    pub async fn membership(
        &self,
        board_id: &BoardId,
        user_id: &str,
    ) -> Result<Option<Membership>, BoardError> {
        let key = keys::membership(&board_id.to_string(), user_id);
        self.cache
            .get_or_fetch(&key, self.ttl.default_ttl, || async {
                let doc_key = Membership::document_key(board_id, user_id);
                match self.store.get(collections::MEMBERS, &doc_key).await {
                    Some(doc) => {
                        let membership: Membership =
                            serde_json::from_value(Value::Object(doc.data))
                                .map_err(foard_model::ModelError::from)?;
                        Ok(Some(membership))
                    }
                    None => Ok(None),
                }
            })
            .await
    }

    /// Whether `user_id` is a member of the board.
    ///
    /// # Errors
    ///
    /// Propagates document decode failures.
    pub async fn is_member(&self, board_id: &BoardId, user_id: &str) -> Result<bool, BoardError> {
        Ok(self.membership(board_id, user_id).await?.is_some())
    }

    /// Lists the board's members, oldest first.
    ///
    /// # Errors
    ///
    /// Propagates document decode failures.
    pub async fn members(&self, board_id: &BoardId) -> Result<Vec<Membership>, BoardError> {
        let key = keys::members(&board_id.to_string());
        self.cache
            .get_or_fetch(&key, self.ttl.default_ttl, || async {
                let query = Query::collection(collections::MEMBERS)
                    .where_eq("boardId", board_id.to_string())
                    .order_by("joinedAt", Direction::Ascending);
                let docs = self.store.run_query(&query).await;
                let mut members = Vec::with_capacity(docs.len());
                for doc in docs {
                    let membership: Membership = serde_json::from_value(Value::Object(doc.data))
                        .map_err(foard_model::ModelError::from)?;
                    members.push(membership);
                }
                Ok(members)
            })
            .await
    }

    /// Resolves a user id to a display name through the cache.
    pub async fn user_name(&self, user_id: &str) -> Option<String> {
        let key = keys::user(user_id);
        let fetched: Result<Option<String>, BoardError> = self
            .cache
            .get_or_fetch(&key, self.ttl.user_ttl, || async {
                let name = self
                    .store
                    .get(collections::USERS, user_id)
                    .await
                    .and_then(|doc| doc.data.get("name").and_then(Value::as_str).map(String::from));
                Ok(name)
            })
            .await;
        fetched.ok().flatten()
    }
}
