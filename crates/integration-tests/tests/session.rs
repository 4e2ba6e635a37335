//! Auth stream binding.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use cartsync_client::remote::Collection;
use cartsync_client::{CartEvent, SessionTracker, SyncPhase};
use cartsync_integration_tests::{Harness, user};
use serde_json::json;
use tokio::sync::{broadcast, watch};

async fn next_ready(events: &mut broadcast::Receiver<CartEvent>) -> CartEvent {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let event = events.recv().await.unwrap();
            if matches!(event, CartEvent::CartReady { .. }) {
                return event;
            }
        }
    })
    .await
    .unwrap()
}

#[tokio::test]
async fn test_tracker_follows_auth_stream() {
    let mut h = Harness::new();
    h.remote.insert(
        Collection::Carts,
        "u1",
        json!({"items": [{"id": "A", "quantity": 2}]}),
    );
    let (auth, auth_rx) = watch::channel(None);

    let tracker = SessionTracker::new(h.cart.clone());
    assert!(tracker.bind(auth_rx));
    assert!(tracker.is_bound());

    assert_eq!(
        next_ready(&mut h.events).await,
        CartEvent::CartReady { user: false }
    );
    assert_eq!(h.cart.phase(), SyncPhase::SignedOut);

    auth.send(Some(user("u1"))).unwrap();
    assert_eq!(
        next_ready(&mut h.events).await,
        CartEvent::CartReady { user: true }
    );
    assert_eq!(h.cart.current_user(), Some(user("u1")));
    assert_eq!(h.cart.cart_count(), 2);

    auth.send(None).unwrap();
    assert_eq!(
        next_ready(&mut h.events).await,
        CartEvent::CartReady { user: false }
    );
    assert!(h.cart.current_user().is_none());
}

#[tokio::test]
async fn test_second_bind_is_ignored() {
    let h = Harness::new();
    let (_auth, first_rx) = watch::channel(None);
    let (_other, second_rx) = watch::channel(Some(user("intruder")));

    let tracker = SessionTracker::new(h.cart.clone());
    assert!(tracker.bind(first_rx));
    assert!(!tracker.clone().bind(second_rx));

    tokio::task::yield_now().await;
    assert_ne!(h.cart.current_user(), Some(user("intruder")));
}
