//! Identity session tracking.
//!
//! The auth provider publishes the signed-in user through a
//! [`tokio::sync::watch`] channel. [`SessionTracker::bind`] subscribes once
//! and forwards every transition to the synchronizer; binding again is a
//! no-op.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use cartsync_core::UserId;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::sync::CartSynchronizer;

/// Forwards sign-in and sign-out transitions to a [`CartSynchronizer`].
#[derive(Debug, Clone)]
pub struct SessionTracker {
    sync: CartSynchronizer,
    bound: Arc<AtomicBool>,
}

impl SessionTracker {
    /// Create an unbound tracker.
    #[must_use]
    pub fn new(sync: CartSynchronizer) -> Self {
        Self {
            sync,
            bound: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Subscribe to the auth state stream.
    ///
    /// The current value is handled immediately, then every change. Returns
    /// `false` if this tracker was already bound, in which case `auth` is
    /// dropped. Must be called from within a Tokio runtime.
    pub fn bind(&self, mut auth: watch::Receiver<Option<UserId>>) -> bool {
        if self.bound.swap(true, Ordering::SeqCst) {
            debug!("Session tracker already bound, ignoring");
            return false;
        }

        let sync = self.sync.clone();
        tokio::spawn(async move {
            loop {
                let user = auth.borrow_and_update().clone();
                // Local state is applied before the next change is observed;
                // reconciliation runs detached so a newer transition can
                // supersede it.
                let transition = sync.begin_transition(user);
                let finisher = sync.clone();
                tokio::spawn(async move { finisher.finish_transition(transition).await });

                if auth.changed().await.is_err() {
                    info!("Auth state stream closed, session tracking stopped");
                    break;
                }
            }
        });

        true
    }

    /// Whether [`bind`](Self::bind) has been called.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.bound.load(Ordering::SeqCst)
    }
}
