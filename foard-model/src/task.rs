//! Task entity model for Foard boards.
//!
//! A task carries a stored `order` (globally unique among active tasks of a
//! board) and a derived `tag` (per-category rank label such as `N1`). The
//! `tag` is a cached projection of `(category, order)` over the full active
//! set; the ordering module is the only place allowed to assign either.
//! Tasks are persisted as camelCase JSON documents whose key is the task id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Maximum allowed task title length in characters.
pub const MAX_TASK_TITLE_LENGTH: usize = 256;

/// Errors produced by the task model and the ordering engine.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Task title cannot be empty.
    #[error("task title cannot be empty")]
    TitleEmpty,
    /// Task title exceeds the maximum length.
    #[error("task title too long (max {max} characters)")]
    TitleTooLong {
        /// The limit the title exceeded.
        max: usize,
    },
    /// A bulk insert was attempted with no titles.
    #[error("at least one task title is required")]
    EmptyBatch,
    /// Task with the given ID was not found in the working set.
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),
    /// A category name outside the closed set was encountered.
    #[error("unknown category: {0}")]
    UnknownCategory(String),
    /// A document key that is not a valid task id.
    #[error("invalid task id: {0}")]
    InvalidTaskId(String),
    /// A persisted document did not match the task shape.
    #[error("invalid task document: {0}")]
    InvalidDocument(#[from] serde_json::Error),
}

/// Unique identifier for a task, based on UUID v7 for time-ordering.
///
/// `Ord` on the id doubles as the deterministic tie-break when two tasks
/// transiently share the same `order` after a concurrent write.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Creates a new time-ordered task identifier (UUID v7).
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a `TaskId` from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID value.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Parses a task id from a document key.
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

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The closed set of board columns, in fixed board order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Immediate tasks.
    Now,
    /// Tasks for today.
    Day,
    /// Tasks for this week.
    Week,
    /// Tasks for this month.
    Month,
}

impl Category {
    /// All categories in the fixed board order used for renumbering.
    pub const ALL: [Self; 4] = [Self::Now, Self::Day, Self::Week, Self::Month];

    /// The single-letter prefix used in tags (`N`, `D`, `W`, `M`).
    #[must_use]
    pub const fn letter(self) -> char {
        match self {
            Self::Now => 'N',
            Self::Day => 'D',
            Self::Week => 'W',
            Self::Month => 'M',
        }
    }

    /// The display label for a 1-based rank in this category, e.g. `D3`.
    #[must_use]
    pub fn tag(self, rank: usize) -> String {
        format!("{}{rank}", self.letter())
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Now => "Now",
            Self::Day => "Day",
            Self::Week => "Week",
            Self::Month => "Month",
        };
        write!(f, "{name}")
    }
}

impl std::str::FromStr for Category {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Now" => Ok(Self::Now),
            "Day" => Ok(Self::Day),
            "Week" => Ok(Self::Week),
            "Month" => Ok(Self::Month),
            other => Err(ModelError::UnknownCategory(other.to_string())),
        }
    }
}

/// Lifecycle status of a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Participates in ordering and tagging.
    #[default]
    Active,
    /// Archived; excluded from ordering entirely.
    Done,
}

/// A board task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique task identifier; the persisted document key, not a field.
    #[serde(skip)]
    pub id: TaskId,
    /// Non-empty task title.
    pub title: String,
    /// Board column the task currently lives in.
    pub category: Category,
    /// Derived per-category rank label, e.g. `N1`.
    pub tag: String,
    /// Position in the total order of active tasks on the board.
    pub order: i64,
    /// Active or archived.
    #[serde(default)]
    pub status: TaskStatus,
    /// Set exactly when the task transitions to [`TaskStatus::Done`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Identity of the creating user (collaborative boards).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
}

impl Task {
    /// Whether the task participates in ordering and tagging.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == TaskStatus::Active
    }

    /// Serializes the task into its persisted document shape (without the id).
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidDocument`] if serialization fails.
    pub fn to_document(&self) -> Result<serde_json::Map<String, serde_json::Value>, ModelError> {
        match serde_json::to_value(self)? {
            serde_json::Value::Object(map) => Ok(map),
            // Struct serialization always yields an object.
            _ => Ok(serde_json::Map::new()),
        }
    }

    /// Decodes a task from a document key and its persisted fields.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidTaskId`] for a malformed key or
    /// [`ModelError::InvalidDocument`] for a malformed body.
    pub fn from_document(
        key: &str,
        data: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<Self, ModelError> {
        let id = TaskId::parse(key)?;
        let mut task: Self = serde_json::from_value(serde_json::Value::Object(data.clone()))?;
        task.id = id;
        Ok(task)
    }
}

/// Validates a task title against the default length limit.
///
/// # Errors
///
/// Returns [`ModelError::TitleEmpty`] or [`ModelError::TitleTooLong`].
pub fn validate_title(title: &str) -> Result<(), ModelError> {
    validate_title_with_limit(title, MAX_TASK_TITLE_LENGTH)
}

/// Validates a task title against a caller-supplied length limit.
///
/// # Errors
///
/// Returns [`ModelError::TitleEmpty`] or [`ModelError::TitleTooLong`].
pub fn validate_title_with_limit(title: &str, max: usize) -> Result<(), ModelError> {
    if title.is_empty() {
        return Err(ModelError::TitleEmpty);
    }
    if title.chars().count() > max {
        return Err(ModelError::TitleTooLong { max });
    }
    Ok(())
}
