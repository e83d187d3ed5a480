//! Shared data model and pure algorithms for Foard boards.

pub mod board;
pub mod ordering;
pub mod task;
pub mod view;

pub use ordering::{ArchiveOutcome, EditOutcome, RemoveOutcome};
pub use task::{Category, MAX_TASK_TITLE_LENGTH, ModelError, Task, TaskId, TaskStatus};
pub use view::BoardView;
