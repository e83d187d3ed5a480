//! Read-model projection of a flat task set into board columns and the
//! archive section. Pure and recomputed on every task-set change; nothing
//! here is persisted.

use chrono::NaiveDate;

use crate::task::{Category, Task};

/// One board column: a category and its active tasks in rank order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// The column's category.
    pub category: Category,
    /// Active tasks sorted by `(order, id)`.
    pub tasks: Vec<Task>,
}

/// Archived tasks completed on one calendar day (UTC).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveGroup {
    /// The completion day.
    pub day: NaiveDate,
    /// Tasks completed that day, most recent first.
    pub tasks: Vec<Task>,
}

/// The rendered shape of a board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardView {
    /// One column per category, in fixed board order.
    pub columns: Vec<Column>,
    /// Archive groups, most recent day first.
    pub archive: Vec<ArchiveGroup>,
}

impl BoardView {
    /// Projects a flat task set (active and archived mixed) into the board
    /// shape. Tolerates the empty set.
    #[must_use]
    pub fn project(tasks: &[Task]) -> Self {
        let columns = Category::ALL
            .iter()
            .map(|&category| {
                let mut column: Vec<Task> = tasks
                    .iter()
                    .filter(|t| t.is_active() && t.category == category)
                    .cloned()
                    .collect();
                column.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
                Column {
                    category,
                    tasks: column,
                }
            })
            .collect();

        let mut archived: Vec<Task> = tasks
            .iter()
            .filter(|t| !t.is_active() && t.completed_at.is_some())
            .cloned()
            .collect();
        archived.sort_by(|a, b| {
            b.completed_at
                .cmp(&a.completed_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        let mut archive: Vec<ArchiveGroup> = Vec::new();
        for task in archived {
            let day = task
                .completed_at
                .map(|ts| ts.date_naive())
                .unwrap_or_default();
            match archive.last_mut() {
                Some(group) if group.day == day => group.tasks.push(task),
                _ => archive.push(ArchiveGroup {
                    day,
                    tasks: vec![task],
                }),
            }
        }

        Self { columns, archive }
    }

    /// The column for a given category.
    #[must_use]
    pub fn column(&self, category: Category) -> &Column {
        // Columns are built from Category::ALL, so the lookup cannot miss.
        self.columns
            .iter()
            .find(|c| c.category == category)
            .unwrap_or(&self.columns[0])
    }
}
