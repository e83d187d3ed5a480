//! The document store: reads, atomic batches, optimistic transactions, and
//! live query subscriptions.
//!
//! All state lives behind one `tokio::sync::RwLock`. A batch commit takes
//! the write lock, applies every mutation, bumps the global commit version,
//! and fans out fresh snapshots to subscriptions whose query result changed.
//! Transactions clone a consistent snapshot at `begin`, run a synchronous
//! body against it, and validate at commit that no other commit happened in
//! between; on conflict the body is re-run against a fresh snapshot.

use std::collections::{BTreeMap, HashMap};

use thiserror::Error;
use tokio::sync::{RwLock, mpsc};

use crate::document::{Document, Fields, Mutation};
use crate::query::Query;

/// Default number of times a transaction body is re-run on conflict before
/// giving up.
const DEFAULT_RETRY_LIMIT: u32 = 5;

/// Errors surfaced by the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A concurrent commit invalidated the transaction's snapshot.
    #[error("transaction snapshot invalidated by a concurrent commit")]
    Conflict,
    /// The transaction kept conflicting and hit the retry cap.
    #[error("transaction contention: gave up after {0} attempts")]
    Contention(u32),
}

type Collections = HashMap<String, BTreeMap<String, Fields>>;

struct Watcher {
    query: Query,
    tx: mpsc::UnboundedSender<Vec<Document>>,
    last: Vec<Document>,
}

struct Inner {
    collections: Collections,
    version: u64,
    watchers: Vec<Watcher>,
}

/// A live query subscription. The initial snapshot is delivered immediately
/// at subscribe time; afterwards a fresh ordered snapshot arrives for every
/// commit that changes the query result.
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<Vec<Document>>,
}

impl Subscription {
    /// Waits for the next snapshot. Returns `None` if the store was dropped.
    pub async fn next_snapshot(&mut self) -> Option<Vec<Document>> {
        self.rx.recv().await
    }

    /// Returns a pending snapshot without waiting, if one has arrived.
    pub fn try_snapshot(&mut self) -> Option<Vec<Document>> {
        self.rx.try_recv().ok()
    }
}

/// An optimistic transaction: snapshot reads plus staged writes.
///
/// The body of [`DocumentStore::run_transaction`] receives this and must be
/// free of side effects outside the staged writes, because it is re-run on
/// conflict.
pub struct Transaction {
    base_version: u64,
    snapshot: Collections,
    writes: Vec<Mutation>,
}

impl Transaction {
    /// Reads one document from the transaction snapshot.
    #[must_use]
    pub fn get(&self, collection: &str, id: &str) -> Option<Document> {
        self.snapshot
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|data| Document {
                id: id.to_string(),
                data: data.clone(),
            })
    }

    /// Runs a query against the transaction snapshot.
    #[must_use]
    pub fn run_query(&self, query: &Query) -> Vec<Document> {
        static EMPTY: BTreeMap<String, Fields> = BTreeMap::new();
        let docs = self.snapshot.get(&query.collection).unwrap_or(&EMPTY);
        query.eval(docs)
    }

    /// Stages a full document write.
    pub fn set(&mut self, collection: impl Into<String>, id: impl Into<String>, data: Fields) {
        self.writes.push(Mutation::set(collection, id, data));
    }

    /// Stages a shallow merge.
    pub fn merge(&mut self, collection: impl Into<String>, id: impl Into<String>, data: Fields) {
        self.writes.push(Mutation::merge(collection, id, data));
    }

    /// Stages a delete.
    pub fn delete(&mut self, collection: impl Into<String>, id: impl Into<String>) {
        self.writes.push(Mutation::delete(collection, id));
    }
}

/// An in-memory document store with live subscriptions.
pub struct DocumentStore {
    inner: RwLock<Inner>,
    retry_limit: u32,
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore {
    /// Creates an empty store with the default transaction retry limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_retry_limit(DEFAULT_RETRY_LIMIT)
    }

    /// Creates an empty store with a custom transaction retry limit.
    #[must_use]
    pub fn with_retry_limit(retry_limit: u32) -> Self {
        Self {
            inner: RwLock::new(Inner {
                collections: HashMap::new(),
                version: 0,
                watchers: Vec::new(),
            }),
            retry_limit,
        }
    }

    /// Reads one document.
    pub async fn get(&self, collection: &str, id: &str) -> Option<Document> {
        let inner = self.inner.read().await;
        inner
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|data| Document {
                id: id.to_string(),
                data: data.clone(),
            })
    }

    /// Runs a query against the current state.
    pub async fn run_query(&self, query: &Query) -> Vec<Document> {
        let inner = self.inner.read().await;
        inner
            .collections
            .get(&query.collection)
            .map(|docs| query.eval(docs))
            .unwrap_or_default()
    }

    /// Applies a batch of mutations atomically and notifies subscriptions.
    ///
    /// # Errors
    ///
    /// Infallible for the in-memory store; the `Result` is the write-path
    /// contract callers program against.
    pub async fn commit_batch(&self, mutations: Vec<Mutation>) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        for mutation in &mutations {
            inner.apply(mutation);
        }
        inner.version += 1;
        tracing::debug!(
            version = inner.version,
            mutations = mutations.len(),
            "batch committed"
        );
        inner.notify();
        Ok(())
    }

    /// Writes a full document.
    ///
    /// # Errors
    ///
    /// See [`DocumentStore::commit_batch`].
    pub async fn set(
        &self,
        collection: impl Into<String>,
        id: impl Into<String>,
        data: Fields,
    ) -> Result<(), StoreError> {
        self.commit_batch(vec![Mutation::set(collection, id, data)])
            .await
    }

    /// Shallow-merges fields into a document.
    ///
    /// # Errors
    ///
    /// See [`DocumentStore::commit_batch`].
    pub async fn merge(
        &self,
        collection: impl Into<String>,
        id: impl Into<String>,
        data: Fields,
    ) -> Result<(), StoreError> {
        self.commit_batch(vec![Mutation::merge(collection, id, data)])
            .await
    }

    /// Deletes a document.
    ///
    /// # Errors
    ///
    /// See [`DocumentStore::commit_batch`].
    pub async fn delete(
        &self,
        collection: impl Into<String>,
        id: impl Into<String>,
    ) -> Result<(), StoreError> {
        self.commit_batch(vec![Mutation::delete(collection, id)])
            .await
    }

    /// Opens a transaction on a consistent snapshot of the current state.
    pub async fn begin(&self) -> Transaction {
        let inner = self.inner.read().await;
        Transaction {
            base_version: inner.version,
            snapshot: inner.collections.clone(),
            writes: Vec::new(),
        }
    }

    /// Commits a transaction if its snapshot is still current.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] if any commit happened since
    /// [`DocumentStore::begin`]; the caller should re-run its body against a
    /// fresh snapshot.
    pub async fn try_commit(&self, txn: Transaction) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if inner.version != txn.base_version {
            tracing::trace!(
                base = txn.base_version,
                current = inner.version,
                "transaction conflict"
            );
            return Err(StoreError::Conflict);
        }
        for mutation in &txn.writes {
            inner.apply(mutation);
        }
        inner.version += 1;
        inner.notify();
        Ok(())
    }

    /// Runs `body` inside a read-modify-write transaction, re-running it on
    /// conflict up to the retry limit. The body sees a consistent snapshot
    /// and must be side-effect free.
    ///
    /// # Errors
    ///
    /// Propagates body errors unchanged, and yields
    /// [`StoreError::Contention`] (via `E::from`) after the retry limit.
    pub async fn run_transaction<T, E, F>(&self, mut body: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnMut(&mut Transaction) -> Result<T, E>,
    {
        for _ in 0..self.retry_limit {
            let mut txn = self.begin().await;
            let out = body(&mut txn)?;
            match self.try_commit(txn).await {
                Ok(()) => return Ok(out),
                Err(StoreError::Conflict) => {}
                Err(other) => return Err(E::from(other)),
            }
        }
        Err(E::from(StoreError::Contention(self.retry_limit)))
    }

    /// Subscribes to a query. The current snapshot is delivered immediately;
    /// afterwards every commit that changes the result pushes a fresh one.
    pub async fn subscribe(&self, query: Query) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.write().await;
        let initial = inner
            .collections
            .get(&query.collection)
            .map(|docs| query.eval(docs))
            .unwrap_or_default();
        let _ = tx.send(initial.clone());
        inner.watchers.push(Watcher {
            query,
            tx,
            last: initial,
        });
        Subscription { rx }
    }
}

impl Inner {
    fn apply(&mut self, mutation: &Mutation) {
        match mutation {
            Mutation::Set {
                collection,
                id,
                data,
            } => {
                self.collections
                    .entry(collection.clone())
                    .or_default()
                    .insert(id.clone(), data.clone());
            }
            Mutation::Merge {
                collection,
                id,
                data,
            } => {
                let doc = self
                    .collections
                    .entry(collection.clone())
                    .or_default()
                    .entry(id.clone())
                    .or_default();
                for (key, value) in data {
                    doc.insert(key.clone(), value.clone());
                }
            }
            Mutation::Delete { collection, id } => {
                if let Some(docs) = self.collections.get_mut(collection) {
                    docs.remove(id);
                }
            }
        }
    }

    fn notify(&mut self) {
        let collections = &self.collections;
        self.watchers.retain_mut(|watcher| {
            let current = collections
                .get(&watcher.query.collection)
                .map(|docs| watcher.query.eval(docs))
                .unwrap_or_default();
            if current == watcher.last {
                return !watcher.tx.is_closed();
            }
            watcher.last = current.clone();
            watcher.tx.send(current).is_ok()
        });
    }
}
