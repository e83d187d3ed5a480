//! In-memory document store for Foard.
//!
//! Models the hosted document database the client is written against:
//! collections of JSON documents, equality/ordered queries, atomic
//! multi-document batches, optimistic snapshot transactions with automatic
//! retry, and live query subscriptions that push a fresh ordered snapshot
//! after every commit that changes the result.

pub mod document;
pub mod query;
pub mod store;

pub use document::{Document, Fields, Mutation};
pub use query::{Direction, Query};
pub use store::{DocumentStore, StoreError, Subscription, Transaction};
