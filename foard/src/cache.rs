//! TTL read-through cache for board metadata, memberships, and user
//! profiles.
//!
//! Values are stored as JSON so one cache serves every document shape.
//! `get_or_fetch` deduplicates concurrent fetches per key: the first caller
//! runs the fetch while later callers wait and reuse the cached result.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;

struct Entry {
    value: Value,
    expires_at: Instant,
}

/// A process-wide read cache with per-entry TTLs.
#[derive(Default)]
pub struct ReadCache {
    entries: RwLock<HashMap<String, Entry>>,
    in_flight: parking_lot::Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl ReadCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached value for `key` if present and fresh.
    #[must_use]
    pub fn get<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let entries = self.entries.read();
        let entry = entries.get(key)?;
        if entry.expires_at <= Instant::now() {
            return None;
        }
        serde_json::from_value(entry.value.clone()).ok()
    }

    /// Stores a value under `key` for `ttl`.
    pub fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let Ok(value) = serde_json::to_value(value) else {
            return;
        };
        self.entries.write().insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Drops one entry.
    pub fn invalidate(&self, key: &str) {
        self.entries.write().remove(key);
    }

    /// Drops every entry whose key starts with `prefix`.
    pub fn invalidate_prefix(&self, prefix: &str) {
        self.entries
            .write()
            .retain(|key, _| !key.starts_with(prefix));
    }

    /// Returns the cached value, or runs `fetch` and caches its result.
    ///
    /// Concurrent callers for the same key serialize on a per-key lock, so
    /// the fetch runs once and the rest read the fresh entry. A fetch error
    /// caches nothing.
    ///
    /// # Errors
    ///
    /// Propagates the fetch error unchanged.
    pub async fn get_or_fetch<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        fetch: F,
    ) -> Result<T, E>
    where
        T: Serialize + serde::de::DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(hit) = self.get::<T>(key) {
            return Ok(hit);
        }

        let lock = self
            .in_flight
            .lock()
            .entry(key.to_string())
            .or_default()
            .clone();
        let guard = lock.lock().await;

        // A concurrent caller may have filled the entry while we waited.
        let result = if let Some(hit) = self.get::<T>(key) {
            Ok(hit)
        } else {
            let fetched = fetch().await;
            if let Ok(value) = &fetched {
                self.set(key, value, ttl);
            }
            fetched
        };

        drop(guard);
        // The last caller out drops the per-key slot so the map does not
        // grow with every key ever fetched. New clones require the map
        // mutex, so the count cannot change under us.
        let mut in_flight = self.in_flight.lock();
        if Arc::strong_count(&lock) == 2 {
            in_flight.remove(key);
        }
        drop(in_flight);

        result
    }
}

/// Cache key builders, one namespace per document shape.
pub mod keys {
    /// Board metadata.
    #[must_use]
    pub fn board(board_id: &str) -> String {
        format!("board:{board_id}")
    }

    /// One membership document.
    #[must_use]
    pub fn membership(board_id: &str, user_id: &str) -> String {
        format!("member:{board_id}:{user_id}")
    }

    /// Member list of a board. Also the shared prefix of that board's
    /// [`membership`] keys, so one prefix invalidation drops both.
    #[must_use]
    pub fn members(board_id: &str) -> String {
        format!("member:{board_id}")
    }

    /// A user profile.
    #[must_use]
    pub fn user(user_id: &str) -> String {
        format!("user:{user_id}")
    }
}
