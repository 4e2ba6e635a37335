//! Integration tests for cartsync.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p cartsync-integration-tests
//! ```
//!
//! Every test drives a real [`CartSynchronizer`] against in-memory
//! collaborators: [`MemoryDocumentStore`] for the remote, [`MemoryStorage`]
//! for the device cache, and recording stand-ins for the UI.
//!
//! # Test Categories
//!
//! - `reconciliation` - sign-in/sign-out transitions
//! - `cart_properties` - cart mutation rules and the commit protocol
//! - `lists` - wishlist and following
//! - `session` - auth stream binding

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::{Arc, Mutex, PoisonError};

use cartsync_client::local::ITEMS_KEY;
use cartsync_client::{
    CacheScope, CartEvent, CartSynchronizer, ClientConfig, CountIndicator, GuardedAction,
    KeyValueStore, LocalCartCache, MemoryDocumentStore, MemoryStorage, SignInPrompt,
};
use cartsync_core::{ProductInput, UserId};
use serde_json::Value;
use tokio::sync::broadcast;

/// Records every sign-in prompt.
#[derive(Debug, Default)]
pub struct RecordingPrompt {
    actions: Mutex<Vec<(GuardedAction, String)>>,
}

impl RecordingPrompt {
    /// Actions that triggered a prompt, in order.
    #[must_use]
    pub fn actions(&self) -> Vec<GuardedAction> {
        self.actions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(action, _)| *action)
            .collect()
    }

    /// Sign-in URLs the prompt was sent to.
    #[must_use]
    pub fn urls(&self) -> Vec<String> {
        self.actions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, url)| url.clone())
            .collect()
    }
}

impl SignInPrompt for RecordingPrompt {
    fn require_sign_in(&self, action: GuardedAction, sign_in_url: &str) {
        self.actions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((action, sign_in_url.to_string()));
    }
}

/// Records badge updates: `Some(n)` for show, `None` for hide.
#[derive(Debug, Default)]
pub struct RecordingBadge {
    updates: Mutex<Vec<Option<u32>>>,
}

impl RecordingBadge {
    #[must_use]
    pub fn updates(&self) -> Vec<Option<u32>> {
        self.updates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl CountIndicator for RecordingBadge {
    fn show(&self, count: u32) {
        self.updates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Some(count));
    }

    fn hide(&self) {
        self.updates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(None);
    }
}

/// A synchronizer wired to in-memory collaborators.
pub struct Harness {
    pub cart: CartSynchronizer,
    pub remote: Arc<MemoryDocumentStore>,
    pub storage: MemoryStorage,
    pub prompt: Arc<RecordingPrompt>,
    pub badge: Arc<RecordingBadge>,
    pub events: broadcast::Receiver<CartEvent>,
}

impl Harness {
    /// Default configuration, device-scoped cache, empty remote.
    #[must_use]
    pub fn new() -> Self {
        Self::with(
            ClientConfig::default(),
            CacheScope::Device,
            MemoryDocumentStore::new(),
        )
    }

    /// Custom configuration, cache scope, and remote.
    #[must_use]
    pub fn with(config: ClientConfig, scope: CacheScope, remote: MemoryDocumentStore) -> Self {
        let remote = Arc::new(remote);
        let storage = MemoryStorage::new();
        let prompt = Arc::new(RecordingPrompt::default());
        let badge = Arc::new(RecordingBadge::default());

        let cart = CartSynchronizer::builder(config)
            .local(LocalCartCache::new(storage.clone(), scope))
            .remote(remote.clone())
            .prompt(prompt.clone())
            .indicator(badge.clone())
            .build();
        let events = cart.subscribe();

        Self {
            cart,
            remote,
            storage,
            prompt,
            badge,
            events,
        }
    }

    /// Write a raw item list into the device cache.
    ///
    /// # Panics
    ///
    /// Panics if the in-memory storage rejects the write.
    pub fn seed_local(&self, items: &Value) {
        let written = self.storage.set(ITEMS_KEY, &items.to_string());
        assert!(written.is_ok(), "seeding local storage failed");
    }

    /// Raw item list currently in the device cache.
    #[must_use]
    pub fn local_items(&self) -> Value {
        self.storage
            .raw(ITEMS_KEY)
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or(Value::Null)
    }

    /// Every event published since the last drain.
    pub fn drain_events(&mut self) -> Vec<CartEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }

    /// Event names since the last drain.
    pub fn drain_event_names(&mut self) -> Vec<&'static str> {
        self.drain_events().iter().map(CartEvent::name).collect()
    }

    /// Sign in as `uid` and wait for reconciliation to settle.
    pub async fn sign_in(&self, uid: &str) {
        self.cart.handle_auth_change(Some(user(uid))).await;
    }

    /// Sign out and wait for the local reload to settle.
    pub async fn sign_out(&self) {
        self.cart.handle_auth_change(None).await;
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

/// A product payload with an id and price.
#[must_use]
pub fn product(id: &str, price: i64) -> ProductInput {
    ProductInput::default()
        .with("id", id)
        .with("title", format!("Product {id}"))
        .with("price", price)
}

#[must_use]
pub fn user(uid: &str) -> UserId {
    UserId::new(uid)
}
