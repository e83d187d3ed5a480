//! Integration tests for board membership and the invite flow.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::similar_names)]

use std::sync::Arc;
use std::time::Duration;

use foard::board::{BoardError, BoardManager, BoardSession};
use foard::config::CacheConfig;
use foard::identity::{AuthUser, Identity, derive_user_id, upsert_user};
use foard_model::board::MemberRole;
use foard_store::DocumentStore;

const INVITE_TTL: Duration = Duration::from_secs(72 * 3600);

fn manager() -> BoardManager {
    BoardManager::new(Arc::new(DocumentStore::new()), CacheConfig::default())
}

fn user(name: &str) -> AuthUser {
    AuthUser {
        user_id: derive_user_id(name, 1),
        name: name.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

#[tokio::test]
async fn same_credentials_sign_in_as_same_user_everywhere() {
    let client_a = Identity::new();
    let client_b = Identity::new();

    let a = client_a.sign_in("Alice", 7).unwrap();
    let b = client_b.sign_in("  alice ", 7).unwrap();
    assert_eq!(a.user_id, b.user_id);

    let c = client_b.sign_in("alice", 8).unwrap();
    assert_ne!(a.user_id, c.user_id);
}

#[tokio::test]
async fn profiles_resolve_to_display_names() {
    let store = Arc::new(DocumentStore::new());
    let manager = BoardManager::new(Arc::clone(&store), CacheConfig::default());
    let alice = user("Alice");
    upsert_user(&store, &alice).await.unwrap();
    assert_eq!(
        manager.user_name(&alice.user_id).await.as_deref(),
        Some("Alice")
    );
}

// ---------------------------------------------------------------------------
// Membership gate
// ---------------------------------------------------------------------------

#[tokio::test]
async fn owner_membership_is_created_with_the_board() {
    let manager = manager();
    let alice = user("alice");
    let board = manager.create_board(&alice, "Mine").await.unwrap();

    let membership = manager
        .membership(&board.id, &alice.user_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(membership.role, MemberRole::Owner);
    assert_eq!(membership.board_id, board.id);
}

#[tokio::test]
async fn non_members_are_denied_a_session() {
    let manager = manager();
    let board = manager.create_board(&user("alice"), "Mine").await.unwrap();

    let result = BoardSession::open(&manager, &board.id, &user("mallory")).await;
    assert!(matches!(result, Err(BoardError::AccessDenied { .. })));
}

// ---------------------------------------------------------------------------
// Invite flow
// ---------------------------------------------------------------------------

#[tokio::test]
async fn invite_grants_a_working_session() {
    let manager = manager();
    let alice = user("alice");
    let bob = user("bob");
    let board = manager.create_board(&alice, "Shared").await.unwrap();

    let invite = manager
        .create_invite(&alice, &board.id, INVITE_TTL)
        .await
        .unwrap();
    let membership = manager.accept_invite(&bob, &invite.token).await.unwrap();
    assert_eq!(membership.role, MemberRole::Member);

    let opened = BoardSession::open(&manager, &board.id, &bob).await;
    assert!(opened.is_ok());

    let members = manager.members(&board.id).await.unwrap();
    assert_eq!(members.len(), 2);
    assert_eq!(members[0].user_id, alice.user_id);
    assert_eq!(members[1].user_id, bob.user_id);
}

#[tokio::test]
async fn invite_token_is_single_use() {
    let manager = manager();
    let alice = user("alice");
    let board = manager.create_board(&alice, "Shared").await.unwrap();
    let invite = manager
        .create_invite(&alice, &board.id, INVITE_TTL)
        .await
        .unwrap();

    manager.accept_invite(&user("bob"), &invite.token).await.unwrap();
    let second = manager.accept_invite(&user("carol"), &invite.token).await;
    assert!(matches!(second, Err(BoardError::InviteInvalid)));
}

#[tokio::test]
async fn expired_invite_is_rejected() {
    let manager = manager();
    let alice = user("alice");
    let board = manager.create_board(&alice, "Shared").await.unwrap();
    let invite = manager
        .create_invite(&alice, &board.id, Duration::ZERO)
        .await
        .unwrap();

    let result = manager.accept_invite(&user("bob"), &invite.token).await;
    assert!(matches!(result, Err(BoardError::InviteInvalid)));
}

#[tokio::test]
async fn only_members_can_issue_invites() {
    let manager = manager();
    let board = manager.create_board(&user("alice"), "Shared").await.unwrap();

    let denied = manager
        .create_invite(&user("mallory"), &board.id, INVITE_TTL)
        .await;
    assert!(matches!(denied, Err(BoardError::AccessDenied { .. })));

    // A joined member can invite further members.
    let bob = user("bob");
    let invite = manager
        .create_invite(&user("alice"), &board.id, INVITE_TTL)
        .await
        .unwrap();
    manager.accept_invite(&bob, &invite.token).await.unwrap();
    let from_bob = manager.create_invite(&bob, &board.id, INVITE_TTL).await;
    assert!(from_bob.is_ok());
}

#[tokio::test]
async fn accepting_an_invite_for_a_board_you_own_is_idempotent() {
    let manager = manager();
    let alice = user("alice");
    let board = manager.create_board(&alice, "Solo").await.unwrap();
    let invite = manager
        .create_invite(&alice, &board.id, INVITE_TTL)
        .await
        .unwrap();

    let membership = manager.accept_invite(&alice, &invite.token).await.unwrap();
    assert_eq!(membership.role, MemberRole::Owner);
    let members = manager.members(&board.id).await.unwrap();
    assert_eq!(members.len(), 1);
}
