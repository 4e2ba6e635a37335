//! Sign-in and sign-out reconciliation.

#![allow(clippy::unwrap_used)]

use cartsync_client::remote::Collection;
use cartsync_client::{CacheScope, CartEvent, ClientConfig, MemoryDocumentStore, SyncPhase};
use cartsync_integration_tests::{Harness, user};
use serde_json::json;

#[tokio::test]
async fn test_sign_out_loads_local_and_signals_ready() {
    let mut h = Harness::new();
    h.seed_local(&json!([{"id": "A", "price": 3, "quantity": 2}]));

    h.sign_out().await;

    assert!(h.cart.is_ready());
    assert_eq!(h.cart.phase(), SyncPhase::SignedOut);
    assert_eq!(h.cart.cart_count(), 2);

    let events = h.drain_events();
    assert_eq!(events.len(), 2);
    assert!(matches!(&events[0], CartEvent::CartUpdated { count: 2, .. }));
    assert_eq!(events[1], CartEvent::CartReady { user: false });
    assert_eq!(h.remote.read_count(), 0);
}

#[tokio::test]
async fn test_empty_remote_receives_local_cart() {
    let mut h = Harness::new();
    h.seed_local(&json!([
        {"id": "A", "price": 3, "quantity": 2},
        {"id": "B", "price": 1, "quantity": 1},
    ]));
    h.sign_out().await;
    let before = h.cart.cart_items();

    h.sign_in("u1").await;

    let doc = h.remote.document(Collection::Carts, "u1").unwrap();
    assert_eq!(doc["items"], serde_json::to_value(&before).unwrap());
    assert!(doc["updatedAt"].is_string());
    assert_eq!(h.cart.cart_items(), before);
    assert_eq!(h.cart.phase(), SyncPhase::Ready);

    assert_eq!(
        h.drain_event_names(),
        vec!["cartUpdated", "cartReady", "cartUpdated", "cartUpdated", "cartReady"]
    );
}

#[tokio::test]
async fn test_empty_remote_and_empty_local_stays_empty() {
    let mut h = Harness::new();
    h.sign_in("u1").await;

    assert!(h.cart.cart_items().is_empty());
    assert_eq!(h.remote.write_count(), 0);
    assert!(h.remote.document(Collection::Carts, "u1").is_none());

    let events = h.drain_events();
    assert_eq!(events.len(), 3);
    assert!(matches!(&events[1], CartEvent::CartUpdated { count: 0, .. }));
    assert_eq!(events[2], CartEvent::CartReady { user: true });
}

#[tokio::test]
async fn test_populated_remote_replaces_local() {
    let mut h = Harness::new();
    h.seed_local(&json!([{"id": "A", "price": 3, "quantity": 1}]));
    h.remote.insert(
        Collection::Carts,
        "u1",
        json!({"items": [{"id": "B", "price": "4.50", "quantity": 2}]}),
    );

    h.sign_in("u1").await;

    let items = h.cart.cart_items();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id.as_str(), "B");
    assert_eq!(h.cart.cart_total().to_string(), "9.00");
    assert_eq!(h.local_items()[0]["id"], "B");
    assert_eq!(h.remote.write_count(), 0);

    let events = h.drain_events();
    assert_eq!(events.len(), 3);
    match (&events[0], &events[1]) {
        (
            CartEvent::CartUpdated { items: first, .. },
            CartEvent::CartUpdated { items: second, .. },
        ) => {
            assert_eq!(first[0].id.as_str(), "A");
            assert_eq!(second[0].id.as_str(), "B");
        }
        other => panic!("unexpected events: {other:?}"),
    }
    assert_eq!(events[2], CartEvent::CartReady { user: true });
}

#[tokio::test]
async fn test_remote_read_failure_keeps_local_state() {
    let mut h = Harness::new();
    h.seed_local(&json!([{"id": "A", "price": 3, "quantity": 4}]));
    h.remote.fail_reads(true);

    h.sign_in("u1").await;

    assert_eq!(h.cart.cart_count(), 4);
    assert!(h.cart.is_ready());
    assert_eq!(h.cart.phase(), SyncPhase::Ready);
    assert_eq!(h.remote.write_count(), 0);
    assert_eq!(h.local_items()[0]["quantity"], 4);

    // The kept local cart is still announced before ready
    let events = h.drain_events();
    assert_eq!(events.len(), 3);
    assert!(matches!(&events[1], CartEvent::CartUpdated { count: 4, .. }));
    assert_eq!(events[2], CartEvent::CartReady { user: true });
}

#[tokio::test]
async fn test_remote_read_failure_still_writes_later_mutations() {
    let h = Harness::new();
    h.remote.fail_reads(true);
    h.sign_in("u1").await;

    h.cart
        .add_to_cart(&cartsync_integration_tests::product("A", 2), 1)
        .await
        .unwrap();

    let doc = h.remote.document(Collection::Carts, "u1").unwrap();
    assert_eq!(doc["items"][0]["id"], "A");
}

#[tokio::test]
async fn test_failed_push_leaves_local_intact() {
    let h = Harness::new();
    h.seed_local(&json!([{"id": "A", "price": 3, "quantity": 1}]));
    h.remote.fail_writes(true);

    h.sign_in("u1").await;

    assert_eq!(h.cart.cart_count(), 1);
    assert!(h.cart.is_ready());
    assert!(h.remote.document(Collection::Carts, "u1").is_none());
}

#[tokio::test]
async fn test_corrupt_remote_entries_are_dropped() {
    let h = Harness::new();
    h.remote.insert(
        Collection::Carts,
        "u1",
        json!({"items": [{"id": "A", "quantity": 1}, {"title": "no id"}, 7]}),
    );

    h.sign_in("u1").await;

    assert_eq!(h.cart.cart_items().len(), 1);
}

#[tokio::test]
async fn test_superseded_sign_in_publishes_no_ready() {
    let mut h = Harness::with(
        ClientConfig::default(),
        CacheScope::Device,
        MemoryDocumentStore::new().with_latency(),
    );
    h.remote.insert(
        Collection::Carts,
        "u1",
        json!({"items": [{"id": "R", "quantity": 1}]}),
    );

    // The sign-in starts its remote read, then the sign-out overtakes it
    tokio::join!(h.cart.handle_auth_change(Some(user("u1"))), async {
        h.cart.handle_auth_change(None).await;
    });

    assert!(h.cart.current_user().is_none());
    assert_eq!(h.cart.phase(), SyncPhase::SignedOut);
    assert!(h.cart.cart_items().is_empty());

    let ready: Vec<_> = h
        .drain_events()
        .into_iter()
        .filter(|e| matches!(e, CartEvent::CartReady { .. }))
        .collect();
    assert_eq!(ready, vec![CartEvent::CartReady { user: false }]);
}

#[tokio::test]
async fn test_device_scope_shows_previous_users_cart_until_reconciled() {
    let h = Harness::new();
    h.sign_in("alice").await;
    h.cart
        .add_to_cart(&cartsync_integration_tests::product("A", 1), 1)
        .await
        .unwrap();

    // Bob has no remote cart, so the shared device cart is pushed to him
    h.sign_in("bob").await;
    assert_eq!(h.cart.cart_items()[0].id.as_str(), "A");
    assert!(h.remote.document(Collection::Carts, "bob").is_some());
}

#[tokio::test]
async fn test_user_scope_isolates_accounts() {
    let h = Harness::with(
        ClientConfig::default(),
        CacheScope::User,
        MemoryDocumentStore::new(),
    );
    h.sign_in("alice").await;
    h.cart
        .add_to_cart(&cartsync_integration_tests::product("A", 1), 1)
        .await
        .unwrap();

    h.sign_in("bob").await;
    assert!(h.cart.cart_items().is_empty());
    assert!(h.remote.document(Collection::Carts, "bob").is_none());
}
