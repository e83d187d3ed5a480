//! Integration tests for multi-client board synchronization.
//!
//! Two sessions share one store. Creation goes through the store
//! transaction, so concurrent creators never collide on `order`; moves and
//! archives are plain batches reconciled last-write-wins, with subscription
//! snapshots converging every mirror to the same board.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::similar_names)]

use std::sync::Arc;

use foard::board::{BoardManager, BoardSession};
use foard::config::CacheConfig;
use foard::identity::{AuthUser, derive_user_id};
use foard_model::ordering::{orders_unique, tags_consistent};
use foard_model::{Category, Task};
use foard_store::{DocumentStore, Subscription};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn user(name: &str) -> AuthUser {
    AuthUser {
        user_id: derive_user_id(name, 1),
        name: name.to_string(),
    }
}

/// A board with alice as owner and bob joined by invite, plus one open
/// session (and its subscription) per member.
async fn shared_board() -> (
    BoardManager,
    (BoardSession, Subscription),
    (BoardSession, Subscription),
) {
    let manager = BoardManager::new(Arc::new(DocumentStore::new()), CacheConfig::default());
    let alice = user("alice");
    let bob = user("bob");

    let board = manager.create_board(&alice, "Shared").await.unwrap();
    let invite = manager
        .create_invite(&alice, &board.id, std::time::Duration::from_secs(3600))
        .await
        .unwrap();
    manager.accept_invite(&bob, &invite.token).await.unwrap();

    let a = BoardSession::open(&manager, &board.id, &alice).await.unwrap();
    let b = BoardSession::open(&manager, &board.id, &bob).await.unwrap();
    (manager, a, b)
}

/// Drains every pending snapshot into the session, keeping the last.
fn drain(session: &mut BoardSession, subscription: &mut Subscription) {
    let mut latest = None;
    while let Some(snapshot) = subscription.try_snapshot() {
        latest = Some(snapshot);
    }
    if let Some(snapshot) = latest {
        session.apply_snapshot(&snapshot).unwrap();
    }
}

fn active(session: &BoardSession) -> Vec<Task> {
    session
        .tasks()
        .iter()
        .filter(|t| t.is_active())
        .cloned()
        .collect()
}

fn column_titles(session: &BoardSession, category: Category) -> Vec<String> {
    let view = session.view();
    view.columns
        .iter()
        .find(|c| c.category == category)
        .map(|c| c.tasks.iter().map(|t| t.title.clone()).collect())
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Concurrent creation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn concurrent_creation_never_collides_on_order() {
    let (_manager, (mut a, mut sub_a), (mut b, mut sub_b)) = shared_board().await;

    // Both clients create at "the same time": neither has seen the other's
    // write when it starts.
    let (ra, rb) = tokio::join!(
        a.create_tasks("a1\na2", Category::Now),
        b.create_tasks("b1\nb2\nb3", Category::Now)
    );
    ra.unwrap();
    rb.unwrap();

    drain(&mut a, &mut sub_a);
    drain(&mut b, &mut sub_b);

    assert_eq!(active(&a).len(), 5);
    assert_eq!(active(&a), active(&b));
    assert!(orders_unique(&active(&a)));
    assert!(tags_consistent(&active(&a)));
}

#[tokio::test]
async fn sequential_creation_from_two_clients_extends_ranks() {
    let (_manager, (mut a, mut sub_a), (mut b, mut sub_b)) = shared_board().await;

    a.create_tasks("first", Category::Day).await.unwrap();
    drain(&mut b, &mut sub_b);
    let created = b.create_tasks("second", Category::Day).await.unwrap();

    assert_eq!(created[0].order, 1);
    assert_eq!(created[0].tag, "D2");

    drain(&mut a, &mut sub_a);
    assert_eq!(column_titles(&a, Category::Day), vec!["first", "second"]);
}

// ---------------------------------------------------------------------------
// Convergence of moves, archives, deletes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn remote_move_converges_through_snapshots() {
    let (_manager, (mut a, mut sub_a), (mut b, mut sub_b)) = shared_board().await;

    let created = a.create_tasks("x\ny\nz", Category::Week).await.unwrap();
    drain(&mut b, &mut sub_b);

    b.move_task(&created[2].id, 0).await.unwrap();
    drain(&mut a, &mut sub_a);

    assert_eq!(column_titles(&a, Category::Week), vec!["z", "x", "y"]);
    assert_eq!(column_titles(&a, Category::Week), column_titles(&b, Category::Week));
    assert!(tags_consistent(&active(&a)));
}

#[tokio::test]
async fn remote_cross_category_move_converges() {
    let (_manager, (mut a, mut sub_a), (mut b, mut sub_b)) = shared_board().await;

    let now = a.create_tasks("n1\nn2", Category::Now).await.unwrap();
    a.create_tasks("d1", Category::Day).await.unwrap();
    drain(&mut b, &mut sub_b);

    b.move_task_to(&now[1].id, Category::Day, None).await.unwrap();
    drain(&mut a, &mut sub_a);

    assert_eq!(column_titles(&a, Category::Now), vec!["n1"]);
    assert_eq!(column_titles(&a, Category::Day), vec!["d1", "n2"]);
    let view = a.view();
    assert_eq!(view.columns[1].tasks[1].tag, "D2");
}

#[tokio::test]
async fn remote_archive_and_delete_converge() {
    let (_manager, (mut a, mut sub_a), (mut b, mut sub_b)) = shared_board().await;

    let created = a.create_tasks("keep\ndone\ngone", Category::Month).await.unwrap();
    drain(&mut b, &mut sub_b);

    b.archive_task(&created[1].id).await.unwrap();
    b.delete_task(&created[2].id).await.unwrap();
    drain(&mut a, &mut sub_a);

    assert_eq!(column_titles(&a, Category::Month), vec!["keep"]);
    let view = a.view();
    assert_eq!(view.columns[3].tasks[0].tag, "M1");
    assert_eq!(view.archive.len(), 1);
    assert_eq!(view.archive[0].tasks[0].title, "done");
    // The deleted task is gone entirely.
    assert_eq!(a.tasks().len(), 2);
}

// ---------------------------------------------------------------------------
// Last write wins
// ---------------------------------------------------------------------------

#[tokio::test]
async fn conflicting_moves_resolve_to_the_last_write() {
    let (_manager, (mut a, mut sub_a), (mut b, mut sub_b)) = shared_board().await;

    let created = a.create_tasks("p\nq\nr", Category::Now).await.unwrap();
    drain(&mut b, &mut sub_b);

    // Both clients reorder from the same baseline; a's batch lands first,
    // b's second. The store keeps the later write per document.
    a.move_task(&created[2].id, 0).await.unwrap();
    b.move_task(&created[0].id, 2).await.unwrap();

    drain(&mut a, &mut sub_a);
    drain(&mut b, &mut sub_b);

    // Whatever the interleaving produced, both mirrors agree and a resync
    // changes nothing.
    assert_eq!(active(&a), active(&b));
    let before = a.view();
    a.resync().await.unwrap();
    assert_eq!(a.view(), before);
}

#[tokio::test]
async fn resync_discards_unpersisted_local_state() {
    let (_manager, (mut a, mut sub_a), (mut b, _sub_b)) = shared_board().await;

    b.create_tasks("remote truth", Category::Now).await.unwrap();
    drain(&mut a, &mut sub_a);

    a.resync().await.unwrap();
    assert_eq!(column_titles(&a, Category::Now), vec!["remote truth"]);
}
