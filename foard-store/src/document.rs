//! Documents and write operations.

/// The field map of a document.
pub type Fields = serde_json::Map<String, serde_json::Value>;

/// A document together with its key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Document key, unique within its collection.
    pub id: String,
    /// Document fields.
    pub data: Fields,
}

/// A single write operation. Batches and transactions stage these and apply
/// them atomically.
#[derive(Debug, Clone)]
pub enum Mutation {
    /// Replace (or create) a document.
    Set {
        /// Target collection.
        collection: String,
        /// Document key.
        id: String,
        /// Full replacement fields.
        data: Fields,
    },
    /// Shallow-merge fields into a document, creating it if absent.
    Merge {
        /// Target collection.
        collection: String,
        /// Document key.
        id: String,
        /// Fields to overlay; existing fields not named here survive.
        data: Fields,
    },
    /// Delete a document; deleting a missing document is a no-op.
    Delete {
        /// Target collection.
        collection: String,
        /// Document key.
        id: String,
    },
}

impl Mutation {
    /// Builds a [`Mutation::Set`].
    pub fn set(collection: impl Into<String>, id: impl Into<String>, data: Fields) -> Self {
        Self::Set {
            collection: collection.into(),
            id: id.into(),
            data,
        }
    }

    /// Builds a [`Mutation::Merge`].
    pub fn merge(collection: impl Into<String>, id: impl Into<String>, data: Fields) -> Self {
        Self::Merge {
            collection: collection.into(),
            id: id.into(),
            data,
        }
    }

    /// Builds a [`Mutation::Delete`].
    pub fn delete(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self::Delete {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// The collection this mutation targets.
    #[must_use]
    pub fn collection(&self) -> &str {
        match self {
            Self::Set { collection, .. }
            | Self::Merge { collection, .. }
            | Self::Delete { collection, .. } => collection,
        }
    }
}
