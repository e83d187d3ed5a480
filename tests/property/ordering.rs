//! Property-based tests for the reindexing engine.
//!
//! Uses proptest to verify that arbitrary edit sequences preserve the two
//! ordering invariants:
//! 1. `order` values stay unique across the whole active set.
//! 2. Every `tag` equals the category letter plus the task's 1-based rank.
//!
//! Plus: `renumber` is idempotent, edits never change untouched categories,
//! and the persisted delta is exactly the set of repositioned tasks.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::similar_names)]

use proptest::prelude::*;

use chrono::Utc;
use foard_model::ordering::{
    archive, bulk_insert, move_across, move_within, orders_unique, remove, renumber,
    tags_consistent,
};
use foard_model::{Category, Task};

// --- Strategies ---

/// Strategy for picking one of the four board categories.
fn arb_category() -> impl Strategy<Value = Category> {
    (0..Category::ALL.len()).prop_map(|i| Category::ALL[i])
}

/// One structural edit, with indices resolved against the set at apply time.
#[derive(Debug, Clone)]
enum Edit {
    Insert { category: Category, count: usize },
    MoveWithin { pick: usize, new_index: usize },
    MoveAcross { pick: usize, target: Category, index: Option<usize> },
    Archive { pick: usize },
    Remove { pick: usize },
}

fn arb_edit() -> impl Strategy<Value = Edit> {
    prop_oneof![
        (arb_category(), 1..4usize).prop_map(|(category, count)| Edit::Insert { category, count }),
        (0..32usize, 0..16usize)
            .prop_map(|(pick, new_index)| Edit::MoveWithin { pick, new_index }),
        (0..32usize, arb_category(), prop::option::of(0..16usize))
            .prop_map(|(pick, target, index)| Edit::MoveAcross { pick, target, index }),
        (0..32usize).prop_map(|pick| Edit::Archive { pick }),
        (0..32usize).prop_map(|pick| Edit::Remove { pick }),
    ]
}

/// Applies one edit to the active set, resolving the pick index modulo the
/// current size. Edits against an empty set are skipped.
fn apply(active: &mut Vec<Task>, edit: &Edit) {
    match edit {
        Edit::Insert { category, count } => {
            let titles: Vec<String> = (0..*count).map(|i| format!("task {i}")).collect();
            let created =
                bulk_insert(active, &titles, *category, None).expect("valid titles insert");
            active.extend(created);
        }
        Edit::MoveWithin { pick, new_index } => {
            if active.is_empty() {
                return;
            }
            let id = active[pick % active.len()].id.clone();
            let outcome = move_within(active, &id, *new_index).expect("task exists");
            *active = outcome.tasks;
        }
        Edit::MoveAcross { pick, target, index } => {
            if active.is_empty() {
                return;
            }
            let id = active[pick % active.len()].id.clone();
            let outcome = move_across(active, &id, *target, *index).expect("task exists");
            *active = outcome.tasks;
        }
        Edit::Archive { pick } => {
            if active.is_empty() {
                return;
            }
            let id = active[pick % active.len()].id.clone();
            let outcome = archive(active, &id, Utc::now()).expect("task exists");
            *active = outcome.active;
        }
        Edit::Remove { pick } => {
            if active.is_empty() {
                return;
            }
            let id = active[pick % active.len()].id.clone();
            let outcome = remove(active, &id).expect("task exists");
            *active = outcome.tasks;
        }
    }
}

// --- Property tests ---

proptest! {
    /// Both ordering invariants hold after every step of any edit sequence.
    #[test]
    fn edit_sequences_preserve_invariants(edits in prop::collection::vec(arb_edit(), 0..24)) {
        let mut active: Vec<Task> = Vec::new();
        for edit in &edits {
            apply(&mut active, edit);
            prop_assert!(orders_unique(&active), "orders collided after {edit:?}");
            prop_assert!(tags_consistent(&active), "tags drifted after {edit:?}");
        }
    }

    /// The global renumber pass is idempotent and preserves both invariants.
    #[test]
    fn renumber_is_idempotent(edits in prop::collection::vec(arb_edit(), 0..16)) {
        let mut active: Vec<Task> = Vec::new();
        for edit in &edits {
            apply(&mut active, edit);
        }
        let once = renumber(&active);
        let twice = renumber(&once);
        prop_assert_eq!(&once, &twice);
        prop_assert!(orders_unique(&once));
        prop_assert!(tags_consistent(&once));
    }

    /// A move never touches tasks outside the affected categories.
    #[test]
    fn moves_leave_other_categories_untouched(
        edits in prop::collection::vec(arb_edit(), 1..12),
        pick in 0..32usize,
        target in arb_category(),
        index in prop::option::of(0..16usize),
    ) {
        let mut active: Vec<Task> = Vec::new();
        for edit in &edits {
            apply(&mut active, edit);
        }
        prop_assume!(!active.is_empty());

        let moved = active[pick % active.len()].clone();
        let outcome = move_across(&active, &moved.id, target, index).expect("task exists");

        for before in &active {
            if before.category == moved.category || before.category == target {
                continue;
            }
            let after = outcome
                .tasks
                .iter()
                .find(|t| t.id == before.id)
                .expect("bystander survives the move");
            prop_assert_eq!(after, before);
        }
    }

    /// The delta reported by a move is exactly the set of tasks whose
    /// position actually changed.
    #[test]
    fn changed_delta_is_exact(
        edits in prop::collection::vec(arb_edit(), 1..12),
        pick in 0..32usize,
        target in arb_category(),
    ) {
        let mut active: Vec<Task> = Vec::new();
        for edit in &edits {
            apply(&mut active, edit);
        }
        prop_assume!(!active.is_empty());

        let id = active[pick % active.len()].id.clone();
        let outcome = move_across(&active, &id, target, None).expect("task exists");

        for after in &outcome.tasks {
            let before = active.iter().find(|t| t.id == after.id);
            let repositioned = before.is_none_or(|b| {
                b.order != after.order || b.category != after.category || b.tag != after.tag
            });
            let reported = outcome.changed.iter().any(|c| c.id == after.id);
            prop_assert_eq!(repositioned, reported, "delta mismatch for {}", after.id);
        }
    }

    /// Bulk inserts append behind the maximum order and extend the target
    /// category's rank sequence without gaps.
    #[test]
    fn bulk_insert_appends_without_renumbering(
        seed_edits in prop::collection::vec(arb_edit(), 0..10),
        category in arb_category(),
        count in 1..5usize,
    ) {
        let mut active: Vec<Task> = Vec::new();
        for edit in &seed_edits {
            apply(&mut active, edit);
        }

        let max_before = active.iter().map(|t| t.order).max().unwrap_or(-1);
        let rank_before = active.iter().filter(|t| t.category == category).count();
        let titles: Vec<String> = (0..count).map(|i| format!("new {i}")).collect();

        let created = bulk_insert(&active, &titles, category, None).expect("valid insert");
        prop_assert_eq!(created.len(), count);
        for (i, task) in created.iter().enumerate() {
            prop_assert_eq!(task.order, max_before + 1 + i as i64);
            prop_assert_eq!(&task.tag, &category.tag(rank_before + i + 1));
        }

        // Nothing pre-existing moves.
        let mut combined = active.clone();
        combined.extend(created);
        prop_assert!(orders_unique(&combined));
        prop_assert!(tags_consistent(&combined));
    }
}
