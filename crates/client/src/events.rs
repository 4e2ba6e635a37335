//! Publish/subscribe notifications for UI code.
//!
//! The synchronizer owns a [`Notifier`]. View code either subscribes to the
//! broadcast stream of [`CartEvent`]s or registers a [`CountIndicator`] that
//! is refreshed synchronously on every `cartUpdated`.
//!
//! Subscribers that fall more than the configured capacity behind observe a
//! `Lagged` error from the receiver and skip to the newest events.

use std::sync::Arc;

use cartsync_core::CartItem;
use serde::Serialize;
use tokio::sync::broadcast;

/// State-change notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "detail", rename_all = "camelCase")]
pub enum CartEvent {
    /// Emitted after every cart load or mutation.
    CartUpdated { items: Vec<CartItem>, count: u32 },
    /// Emitted once per sign-in/sign-out transition after reconciliation.
    CartReady { user: bool },
    /// Emitted after a successful wishlist mutation.
    WishlistUpdated,
    /// Emitted after a successful following mutation.
    FollowingUpdated,
}

impl CartEvent {
    /// Event name as used by page scripts.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::CartUpdated { .. } => "cartUpdated",
            Self::CartReady { .. } => "cartReady",
            Self::WishlistUpdated => "wishlistUpdated",
            Self::FollowingUpdated => "followingUpdated",
        }
    }
}

/// A cart-count badge.
///
/// Shows the count when it is positive and hides itself at zero.
pub trait CountIndicator: Send + Sync {
    fn show(&self, count: u32);
    fn hide(&self);
}

/// Event fan-out owned by the synchronizer.
pub struct Notifier {
    sender: broadcast::Sender<CartEvent>,
    indicators: Vec<Arc<dyn CountIndicator>>,
}

impl Notifier {
    /// Create a notifier buffering up to `capacity` events per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            indicators: Vec::new(),
        }
    }

    /// Register a cart-count badge.
    #[must_use]
    pub fn with_indicator(mut self, indicator: Arc<dyn CountIndicator>) -> Self {
        self.indicators.push(indicator);
        self
    }

    /// Subscribe to future events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CartEvent> {
        self.sender.subscribe()
    }

    /// Publish an event, refreshing badges first for cart updates.
    pub fn publish(&self, event: CartEvent) {
        if let CartEvent::CartUpdated { count, .. } = &event {
            self.refresh_indicators(*count);
        }

        let name = event.name();
        // No subscribers is fine; the event is simply dropped
        match self.sender.send(event) {
            Ok(receivers) => tracing::debug!(event = name, receivers, "Published event"),
            Err(_) => tracing::trace!(event = name, "Published event with no subscribers"),
        }
    }

    fn refresh_indicators(&self, count: u32) {
        for indicator in &self.indicators {
            if count > 0 {
                indicator.show(count);
            } else {
                indicator.hide();
            }
        }
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("subscribers", &self.sender.receiver_count())
            .field("indicators", &self.indicators.len())
            .finish()
    }
}
