//! Connection state machine: pure resolution plus emulator-gated
//! transitions against Firestore.

use dealerhub::models::connection::{pair_key, resolve_state, ConnectionEdge, EdgeStatus};
use dealerhub::models::{ConnectionState, Profile, Role};
use dealerhub::services::ConnectionService;

mod common;

fn edge(sender: &str, receiver: &str, status: EdgeStatus) -> ConnectionEdge {
    ConnectionEdge {
        id: pair_key(sender, receiver),
        sender_id: sender.to_string(),
        receiver_id: receiver.to_string(),
        status,
        created_at: "2024-06-01T00:00:00.000000Z".to_string(),
    }
}

#[test]
fn lookup_rule_matches_spec_table() {
    let viewer = "viewer";
    let other = "other";

    assert_eq!(resolve_state(None, viewer), ConnectionState::None);

    let outbound = edge(viewer, other, EdgeStatus::Pending);
    assert_eq!(resolve_state(Some(&outbound), viewer), ConnectionState::Sent);

    let inbound = edge(other, viewer, EdgeStatus::Pending);
    assert_eq!(
        resolve_state(Some(&inbound), viewer),
        ConnectionState::Pending
    );

    let accepted = edge(other, viewer, EdgeStatus::Accepted);
    assert_eq!(
        resolve_state(Some(&accepted), viewer),
        ConnectionState::Connected
    );
}

// ─── Emulator-backed transition tests ────────────────────────

fn test_profile(user_id: &str, shop: &str) -> Profile {
    Profile {
        id: user_id.to_string(),
        shop_name: shop.to_string(),
        city: "Pune".to_string(),
        phone: "9876543210".to_string(),
        email: format!("{}@example.com", user_id),
        bio: None,
        profile_image: None,
        approved: true,
        role: Role::Dealer,
        connection_count: 0,
        created_at: "2024-06-01T00:00:00.000000Z".to_string(),
    }
}

async fn seed_pair(db: &dealerhub::db::FirestoreDb) -> (String, String) {
    let a = format!("user-a-{}", uuid::Uuid::new_v4());
    let b = format!("user-b-{}", uuid::Uuid::new_v4());
    db.upsert_profile(&test_profile(&a, "Shop A")).await.unwrap();
    db.upsert_profile(&test_profile(&b, "Shop B")).await.unwrap();
    (a, b)
}

#[tokio::test]
async fn send_yields_sent_for_sender_and_pending_for_receiver() {
    require_emulator!();
    let db = common::test_db().await;
    let service = ConnectionService::new(db.clone());
    let (alice, bob) = seed_pair(&db).await;

    assert_eq!(
        service.status(&alice, &bob).await.unwrap(),
        ConnectionState::None
    );

    let state = service.send(&alice, &bob).await.unwrap();
    assert_eq!(state, ConnectionState::Sent);

    assert_eq!(
        service.status(&alice, &bob).await.unwrap(),
        ConnectionState::Sent
    );
    assert_eq!(
        service.status(&bob, &alice).await.unwrap(),
        ConnectionState::Pending
    );
}

#[tokio::test]
async fn accept_connects_both_sides_and_bumps_counts() {
    require_emulator!();
    let db = common::test_db().await;
    let service = ConnectionService::new(db.clone());
    let (alice, bob) = seed_pair(&db).await;

    service.send(&alice, &bob).await.unwrap();
    let state = service.accept(&bob, &alice).await.unwrap();
    assert_eq!(state, ConnectionState::Connected);

    assert_eq!(
        service.status(&alice, &bob).await.unwrap(),
        ConnectionState::Connected
    );
    assert_eq!(
        service.status(&bob, &alice).await.unwrap(),
        ConnectionState::Connected
    );

    let alice_profile = db.get_profile(&alice).await.unwrap().unwrap();
    let bob_profile = db.get_profile(&bob).await.unwrap().unwrap();
    assert_eq!(alice_profile.connection_count, 1);
    assert_eq!(bob_profile.connection_count, 1);
}

#[tokio::test]
async fn double_send_is_rejected_either_direction() {
    require_emulator!();
    let db = common::test_db().await;
    let service = ConnectionService::new(db.clone());
    let (alice, bob) = seed_pair(&db).await;

    service.send(&alice, &bob).await.unwrap();

    // Same sender again, and the reverse direction: both hit the
    // existing pair-keyed edge.
    assert!(service.send(&alice, &bob).await.is_err());
    assert!(service.send(&bob, &alice).await.is_err());

    assert_eq!(
        service.status(&bob, &alice).await.unwrap(),
        ConnectionState::Pending
    );
}

#[tokio::test]
async fn sender_cannot_accept_their_own_request() {
    require_emulator!();
    let db = common::test_db().await;
    let service = ConnectionService::new(db.clone());
    let (alice, bob) = seed_pair(&db).await;

    service.send(&alice, &bob).await.unwrap();

    assert!(service.accept(&alice, &bob).await.is_err());
    assert_eq!(
        service.status(&alice, &bob).await.unwrap(),
        ConnectionState::Sent
    );
}

#[tokio::test]
async fn cancel_and_decline_return_to_none() {
    require_emulator!();
    let db = common::test_db().await;
    let service = ConnectionService::new(db.clone());

    // Cancel by the sender.
    let (alice, bob) = seed_pair(&db).await;
    service.send(&alice, &bob).await.unwrap();
    assert_eq!(
        service.remove(&alice, &bob).await.unwrap(),
        ConnectionState::None
    );
    assert_eq!(
        service.status(&bob, &alice).await.unwrap(),
        ConnectionState::None
    );

    // Decline by the receiver.
    let (carol, dave) = seed_pair(&db).await;
    service.send(&carol, &dave).await.unwrap();
    assert_eq!(
        service.remove(&dave, &carol).await.unwrap(),
        ConnectionState::None
    );
    assert_eq!(
        service.status(&carol, &dave).await.unwrap(),
        ConnectionState::None
    );
}

#[tokio::test]
async fn disconnect_decrements_counts_and_is_idempotent() {
    require_emulator!();
    let db = common::test_db().await;
    let service = ConnectionService::new(db.clone());
    let (alice, bob) = seed_pair(&db).await;

    service.send(&alice, &bob).await.unwrap();
    service.accept(&bob, &alice).await.unwrap();

    assert_eq!(
        service.remove(&alice, &bob).await.unwrap(),
        ConnectionState::None
    );

    let alice_profile = db.get_profile(&alice).await.unwrap().unwrap();
    let bob_profile = db.get_profile(&bob).await.unwrap().unwrap();
    assert_eq!(alice_profile.connection_count, 0);
    assert_eq!(bob_profile.connection_count, 0);

    // Removing an already-absent edge must not error.
    assert_eq!(
        service.remove(&alice, &bob).await.unwrap(),
        ConnectionState::None
    );
    assert_eq!(
        service.remove(&bob, &alice).await.unwrap(),
        ConnectionState::None
    );
}

#[tokio::test]
async fn incoming_lists_pending_requests_with_sender_summary() {
    require_emulator!();
    let db = common::test_db().await;
    let service = ConnectionService::new(db.clone());
    let (alice, bob) = seed_pair(&db).await;
    let (carol, _) = seed_pair(&db).await;

    service.send(&alice, &bob).await.unwrap();
    service.send(&carol, &bob).await.unwrap();

    let incoming = service.incoming(&bob).await.unwrap();

    assert_eq!(incoming.len(), 2);
    let senders: Vec<&str> = incoming.iter().map(|r| r.sender_id.as_str()).collect();
    assert!(senders.contains(&alice.as_str()));
    assert!(senders.contains(&carol.as_str()));
    assert!(incoming.iter().all(|r| !r.sender_shop_name.is_empty()));
}
