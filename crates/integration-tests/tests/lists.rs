//! Wishlist and following.

#![allow(clippy::unwrap_used)]

use cartsync_client::remote::Collection;
use cartsync_client::{CacheScope, CartError, ClientConfig, MemoryDocumentStore};
use cartsync_core::{ProductId, VendorId};
use cartsync_integration_tests::{Harness, product};
use serde_json::json;

#[tokio::test]
async fn test_wishlist_add_twice_keeps_one_entry() {
    let mut h = Harness::new();
    h.sign_in("u1").await;
    h.drain_events();

    assert!(h.cart.add_to_wishlist(&product("p1", 10)).await.unwrap());
    assert!(!h.cart.add_to_wishlist(&product("p1", 10)).await.unwrap());

    let doc = h.remote.document(Collection::Buyers, "u1").unwrap();
    assert_eq!(doc["wishlist"].as_array().unwrap().len(), 1);
    assert_eq!(doc["wishlist"][0]["price"], 10);
    assert!(doc["updatedAt"].is_string());
    assert_eq!(h.drain_event_names(), vec!["wishlistUpdated"]);
}

#[tokio::test]
async fn test_wishlist_does_not_touch_cart() {
    let h = Harness::new();
    h.sign_in("u1").await;
    h.cart.add_to_wishlist(&product("p1", 10)).await.unwrap();

    assert!(h.cart.cart_items().is_empty());
    assert!(h.remote.document(Collection::Carts, "u1").is_none());
}

#[tokio::test]
async fn test_wishlist_remove_and_read() {
    let mut h = Harness::new();
    h.sign_in("u1").await;
    h.cart.add_to_wishlist(&product("p1", 1)).await.unwrap();
    h.cart.add_to_wishlist(&product("p2", 2)).await.unwrap();
    h.drain_events();

    assert!(h.cart.remove_from_wishlist(&ProductId::new("p1")).await.unwrap());
    assert!(!h.cart.remove_from_wishlist(&ProductId::new("p1")).await.unwrap());

    let wishlist = h.cart.get_wishlist().await;
    assert_eq!(wishlist.len(), 1);
    assert_eq!(wishlist[0].id.as_str(), "p2");
    assert_eq!(h.drain_event_names(), vec!["wishlistUpdated"]);
}

#[tokio::test]
async fn test_follow_lifecycle() {
    let mut h = Harness::new();
    h.sign_in("u1").await;
    h.drain_events();
    let v1 = VendorId::new("v1");

    assert!(!h.cart.is_following_store(&v1).await);
    assert!(h.cart.follow_store(&v1, Some("Clay Works")).await.unwrap());
    assert!(!h.cart.follow_store(&v1, Some("Clay Works")).await.unwrap());
    assert!(h.cart.is_following_store(&v1).await);

    let stores = h.cart.get_followed_stores().await;
    assert_eq!(stores.len(), 1);
    assert_eq!(stores[0].store_name, "Clay Works");
    assert!(stores[0].followed_at.is_some());

    assert!(h.cart.unfollow_store(&v1).await.unwrap());
    assert!(!h.cart.is_following_store(&v1).await);
    assert_eq!(
        h.drain_event_names(),
        vec!["followingUpdated", "followingUpdated"]
    );
}

#[tokio::test]
async fn test_lists_share_the_buyer_document() {
    let h = Harness::new();
    h.remote.insert(
        Collection::Buyers,
        "u1",
        json!({"displayName": "Ada", "addresses": [{"city": "Oslo"}]}),
    );
    h.sign_in("u1").await;

    h.cart.add_to_wishlist(&product("p1", 1)).await.unwrap();
    h.cart
        .follow_store(&VendorId::new("v1"), None)
        .await
        .unwrap();

    let doc = h.remote.document(Collection::Buyers, "u1").unwrap();
    assert_eq!(doc["displayName"], "Ada");
    assert_eq!(doc["addresses"][0]["city"], "Oslo");
    assert_eq!(doc["wishlist"][0]["id"], "p1");
    assert_eq!(doc["following"][0]["vendorUid"], "v1");
}

#[tokio::test]
async fn test_list_bound() {
    let config = ClientConfig {
        max_list_entries: 2,
        ..ClientConfig::default()
    };
    let h = Harness::with(config, CacheScope::Device, MemoryDocumentStore::new());
    h.sign_in("u1").await;

    h.cart.follow_store(&VendorId::new("v1"), None).await.unwrap();
    h.cart.follow_store(&VendorId::new("v2"), None).await.unwrap();
    let err = h
        .cart
        .follow_store(&VendorId::new("v3"), None)
        .await
        .unwrap_err();

    assert!(matches!(err, CartError::ListFull { max: 2 }));
    assert_eq!(err.user_message(), "You can save up to 2 items.");
    assert_eq!(h.cart.get_followed_stores().await.len(), 2);
}

#[tokio::test]
async fn test_write_failure_is_reported() {
    let mut h = Harness::new();
    h.sign_in("u1").await;
    h.drain_events();
    h.remote.fail_writes(true);

    let err = h.cart.add_to_wishlist(&product("p1", 1)).await.unwrap_err();

    assert!(matches!(err, CartError::Remote(_)));
    assert!(!err.user_message().contains("injected"));
    assert!(h.drain_events().is_empty());
}

#[tokio::test]
async fn test_concurrent_wishlist_adds_lose_one_write() {
    // Known race: the read-modify-write is not serialized, so two adds that
    // both read before either writes leave only the later write's list.
    let h = Harness::with(
        ClientConfig::default(),
        CacheScope::Device,
        MemoryDocumentStore::new().with_latency(),
    );
    h.sign_in("u1").await;

    let p1 = product("p1", 1);
    let p2 = product("p2", 1);
    let (first, second) = tokio::join!(
        h.cart.add_to_wishlist(&p1),
        h.cart.add_to_wishlist(&p2),
    );

    assert!(first.unwrap());
    assert!(second.unwrap());
    assert_eq!(h.cart.get_wishlist().await.len(), 1);
}

#[tokio::test]
async fn test_sequential_wishlist_adds_keep_both() {
    let h = Harness::with(
        ClientConfig::default(),
        CacheScope::Device,
        MemoryDocumentStore::new().with_latency(),
    );
    h.sign_in("u1").await;

    h.cart.add_to_wishlist(&product("p1", 1)).await.unwrap();
    h.cart.add_to_wishlist(&product("p2", 1)).await.unwrap();

    assert_eq!(h.cart.get_wishlist().await.len(), 2);
}
