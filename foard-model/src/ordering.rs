//! Pure reindexing engine for board tasks.
//!
//! Every structural edit (bulk insert, reorder, cross-category move, archive,
//! delete) is computed here as a pure function from the current task set to a
//! new one, plus the minimal delta of documents that must be written. No
//! function performs I/O and all are safe to re-run against a fresh snapshot,
//! which is what the creation transaction does on contention.
//!
//! Two invariants hold after every operation on the active set:
//!
//! 1. `order` values are unique across the whole board and monotonically
//!    increasing within each category.
//! 2. Every `tag` equals its category letter plus the task's 1-based rank
//!    among active tasks of that category ordered by `order`.
//!
//! Reorders and moves redistribute the *existing* `order` values of the
//! affected categories over the new sequence instead of renumbering the whole
//! board. The value set is unchanged, so uniqueness is preserved and
//! categories untouched by an edit keep their exact `order` and `tag` — which
//! keeps the persisted write batch minimal.

use chrono::{DateTime, Utc};

use crate::task::{
    Category, MAX_TASK_TITLE_LENGTH, ModelError, Task, TaskId, TaskStatus,
    validate_title_with_limit,
};

/// Result of a reorder or move: the full new active set plus the delta of
/// tasks whose `order`, `category`, or `tag` changed.
#[derive(Debug, Clone)]
pub struct EditOutcome {
    /// The complete active task set after the edit.
    pub tasks: Vec<Task>,
    /// Only the tasks that need to be persisted.
    pub changed: Vec<Task>,
}

/// Result of archiving a task.
#[derive(Debug, Clone)]
pub struct ArchiveOutcome {
    /// The archived task, with `status = done` and `completed_at` stamped.
    pub archived: Task,
    /// The remaining active set.
    pub active: Vec<Task>,
    /// Former siblings whose `tag` shifted down to close the gap.
    pub changed: Vec<Task>,
}

/// Result of hard-deleting a task (active or archived).
#[derive(Debug, Clone)]
pub struct RemoveOutcome {
    /// The deleted task.
    pub removed: Task,
    /// The remaining task set (active and archived).
    pub tasks: Vec<Task>,
    /// Former active siblings whose `tag` shifted down.
    pub changed: Vec<Task>,
}

/// Sorts tasks by `(order, id)`; the id tie-break makes the sequence
/// deterministic even when concurrent writes left equal orders behind.
fn sort_sequence(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
}

/// The ordered sub-sequence of active tasks in one category.
fn category_sequence(active: &[Task], category: Category) -> Vec<Task> {
    let mut seq: Vec<Task> = active
        .iter()
        .filter(|t| t.category == category)
        .cloned()
        .collect();
    sort_sequence(&mut seq);
    seq
}

/// Assigns the sequence's own sorted `order` values back over its new
/// arrangement and recomputes tags. The order-value multiset is unchanged.
fn redistribute(seq: &mut [Task], category: Category) {
    let mut values: Vec<i64> = seq.iter().map(|t| t.order).collect();
    values.sort_unstable();
    for (index, task) in seq.iter_mut().enumerate() {
        task.order = values[index];
        task.tag = category.tag(index + 1);
    }
}

/// Recomputes tags for a sequence whose relative order is already correct.
fn retag(seq: &mut [Task], category: Category) {
    for (index, task) in seq.iter_mut().enumerate() {
        task.tag = category.tag(index + 1);
    }
}

/// Collects the tasks in `after` that differ from their `before` counterpart
/// in `order`, `category`, or `tag` (or are new).
fn diff_changed(before: &[Task], after: &[Task]) -> Vec<Task> {
    after
        .iter()
        .filter(|task| {
            before.iter().find(|b| b.id == task.id).is_none_or(|b| {
                b.order != task.order || b.category != task.category || b.tag != task.tag
            })
        })
        .cloned()
        .collect()
}

/// Creates new tasks appended behind the current maximum `order`.
///
/// Titles are trimmed; the batch preserves input order. Pre-existing tasks
/// are never renumbered: new orders start at `max(order) + 1` (or 0 on an
/// empty board) and new tags continue the target category's rank sequence.
///
/// # Errors
///
/// Returns [`ModelError::EmptyBatch`] for an empty title list and
/// [`ModelError::TitleEmpty`]/[`ModelError::TitleTooLong`] for an invalid
/// title; no tasks are produced on any error.
pub fn bulk_insert(
    active: &[Task],
    titles: &[String],
    category: Category,
    created_by: Option<&str>,
) -> Result<Vec<Task>, ModelError> {
    bulk_insert_with_limit(active, titles, category, created_by, MAX_TASK_TITLE_LENGTH)
}

/// [`bulk_insert`] with a caller-supplied title length limit.
///
/// # Errors
///
/// Same as [`bulk_insert`], with titles validated against `max_title_len`.
pub fn bulk_insert_with_limit(
    active: &[Task],
    titles: &[String],
    category: Category,
    created_by: Option<&str>,
    max_title_len: usize,
) -> Result<Vec<Task>, ModelError> {
    let trimmed: Vec<&str> = titles.iter().map(|t| t.trim()).collect();
    if trimmed.is_empty() {
        return Err(ModelError::EmptyBatch);
    }
    for title in &trimmed {
        validate_title_with_limit(title, max_title_len)?;
    }

    let base = active.iter().map(|t| t.order).max().unwrap_or(-1);
    let rank_base = active.iter().filter(|t| t.category == category).count();

    Ok(trimmed
        .iter()
        .enumerate()
        .map(|(index, title)| Task {
            id: TaskId::new(),
            title: (*title).to_string(),
            category,
            tag: category.tag(rank_base + index + 1),
            order: base + 1 + index as i64,
            status: TaskStatus::Active,
            completed_at: None,
            created_by: created_by.map(String::from),
        })
        .collect())
}

/// Moves a task to a new index inside its own category.
///
/// The index is clamped to the category bounds. Moving a task onto its
/// current position is a no-op with an empty delta.
///
/// # Errors
///
/// Returns [`ModelError::TaskNotFound`] if the id is not in the active set.
pub fn move_within(
    active: &[Task],
    task_id: &TaskId,
    new_index: usize,
) -> Result<EditOutcome, ModelError> {
    let task = active
        .iter()
        .find(|t| t.id == *task_id)
        .ok_or_else(|| ModelError::TaskNotFound(task_id.clone()))?;
    let category = task.category;

    let mut seq = category_sequence(active, category);
    let current = seq
        .iter()
        .position(|t| t.id == *task_id)
        .ok_or_else(|| ModelError::TaskNotFound(task_id.clone()))?;
    let moved = seq.remove(current);
    let target = new_index.min(seq.len());
    if target == current {
        return Ok(EditOutcome {
            tasks: active.to_vec(),
            changed: Vec::new(),
        });
    }
    seq.insert(target, moved);
    redistribute(&mut seq, category);

    let changed = diff_changed(active, &seq);
    let mut tasks: Vec<Task> = active
        .iter()
        .filter(|t| t.category != category)
        .cloned()
        .collect();
    tasks.extend(seq);
    Ok(EditOutcome { tasks, changed })
}

/// Moves a task into another category at the given index.
///
/// `target_index` of `None` means the drop resolved to the column itself:
/// the task goes to the end of the target category. Both affected categories
/// are re-sequenced and re-tagged; every other category is untouched.
///
/// # Errors
///
/// Returns [`ModelError::TaskNotFound`] if the id is not in the active set.
pub fn move_across(
    active: &[Task],
    task_id: &TaskId,
    target_category: Category,
    target_index: Option<usize>,
) -> Result<EditOutcome, ModelError> {
    let task = active
        .iter()
        .find(|t| t.id == *task_id)
        .ok_or_else(|| ModelError::TaskNotFound(task_id.clone()))?;
    let source_category = task.category;
    if source_category == target_category {
        return move_within(active, task_id, target_index.unwrap_or(usize::MAX));
    }

    let mut source_seq = category_sequence(active, source_category);
    source_seq.retain(|t| t.id != *task_id);
    retag(&mut source_seq, source_category);

    let mut moved = task.clone();
    moved.category = target_category;
    let mut target_seq = category_sequence(active, target_category);
    let index = target_index.map_or(target_seq.len(), |i| i.min(target_seq.len()));
    target_seq.insert(index, moved);
    redistribute(&mut target_seq, target_category);

    let mut tasks: Vec<Task> = active
        .iter()
        .filter(|t| t.category != source_category && t.category != target_category)
        .cloned()
        .collect();
    tasks.extend(source_seq);
    tasks.extend(target_seq);
    let changed = diff_changed(active, &tasks);
    Ok(EditOutcome { tasks, changed })
}

/// Archives a task: removes it from the active set, stamps `completed_at`,
/// and re-tags the former category's remaining siblings so stored tags stay
/// consistent with `(category, order)`.
///
/// # Errors
///
/// Returns [`ModelError::TaskNotFound`] if the id is not in the active set.
pub fn archive(
    active: &[Task],
    task_id: &TaskId,
    completed_at: DateTime<Utc>,
) -> Result<ArchiveOutcome, ModelError> {
    let task = active
        .iter()
        .find(|t| t.id == *task_id)
        .ok_or_else(|| ModelError::TaskNotFound(task_id.clone()))?;
    let category = task.category;

    let mut archived = task.clone();
    archived.status = TaskStatus::Done;
    archived.completed_at = Some(completed_at);

    let mut siblings = category_sequence(active, category);
    siblings.retain(|t| t.id != *task_id);
    retag(&mut siblings, category);
    let changed = diff_changed(active, &siblings);

    let mut remaining: Vec<Task> = active
        .iter()
        .filter(|t| t.category != category)
        .cloned()
        .collect();
    remaining.extend(siblings);
    Ok(ArchiveOutcome {
        archived,
        active: remaining,
        changed,
    })
}

/// Hard-deletes a task, active or archived.
///
/// Deleting an active task re-tags its former siblings; deleting an archived
/// task touches nothing else.
///
/// # Errors
///
/// Returns [`ModelError::TaskNotFound`] if the id is unknown.
pub fn remove(tasks: &[Task], task_id: &TaskId) -> Result<RemoveOutcome, ModelError> {
    let removed = tasks
        .iter()
        .find(|t| t.id == *task_id)
        .cloned()
        .ok_or_else(|| ModelError::TaskNotFound(task_id.clone()))?;

    let mut remaining: Vec<Task> = tasks
        .iter()
        .filter(|t| t.id != *task_id)
        .cloned()
        .collect();

    let mut changed = Vec::new();
    if removed.is_active() {
        let active: Vec<Task> = remaining.iter().filter(|t| t.is_active()).cloned().collect();
        let mut siblings = category_sequence(&active, removed.category);
        retag(&mut siblings, removed.category);
        changed = diff_changed(tasks, &siblings);
        for sibling in &changed {
            if let Some(slot) = remaining.iter_mut().find(|t| t.id == sibling.id) {
                *slot = sibling.clone();
            }
        }
    }
    Ok(RemoveOutcome {
        removed,
        tasks: remaining,
        changed,
    })
}

/// Canonical renumbering pass: walks the categories in fixed board order,
/// sorts each by `(order, id)`, and reassigns globally unique incrementing
/// `order` values and fresh tags. Idempotent.
#[must_use]
pub fn renumber(active: &[Task]) -> Vec<Task> {
    let mut out = Vec::with_capacity(active.len());
    let mut next: i64 = 0;
    for category in Category::ALL {
        let mut seq = category_sequence(active, category);
        for (index, task) in seq.iter_mut().enumerate() {
            task.order = next;
            task.tag = category.tag(index + 1);
            next += 1;
        }
        out.extend(seq);
    }
    out
}

/// Checks invariant 2: every stored tag matches a from-scratch recomputation
/// over `(category, order)`.
#[must_use]
pub fn tags_consistent(active: &[Task]) -> bool {
    Category::ALL.iter().all(|&category| {
        category_sequence(active, category)
            .iter()
            .enumerate()
            .all(|(index, task)| task.tag == category.tag(index + 1))
    })
}

/// Checks invariant 1: no two active tasks share an `order` value.
#[must_use]
pub fn orders_unique(active: &[Task]) -> bool {
    let mut seen = std::collections::HashSet::new();
    active.iter().all(|t| seen.insert(t.order))
}
