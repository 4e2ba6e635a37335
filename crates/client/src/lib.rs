//! cartsync client library.
//!
//! Keeps a buyer's cart consistent between a device-local cache and a
//! per-user remote document, and manages the wishlist and followed stores
//! stored on the buyer profile document.
//!
//! # Architecture
//!
//! - [`local`] - Synchronous key-value persistence for the cart snapshot
//! - [`remote`] - Async document store abstraction with merge writes
//! - [`session`] - Binds the auth provider's state stream to the synchronizer
//! - [`sync`] - The reconciliation engine and cart mutations
//! - [`lists`] - Wishlist and following read-modify-write operations
//! - [`events`] - Publish/subscribe notifications and cart badge updates
//! - [`ui`] - Sign-in prompt contract for guarded actions
//!
//! # Example
//!
//! ```rust,ignore
//! use cartsync_client::{CartSynchronizer, ClientConfig, SessionTracker};
//!
//! let config = ClientConfig::from_env()?;
//! let cart = CartSynchronizer::builder(config.clone())
//!     .local(local_cache)
//!     .remote(remote_store)
//!     .build();
//!
//! let tracker = SessionTracker::new(cart.clone());
//! tracker.bind(auth_provider.subscribe());
//!
//! cart.add_to_cart(&product, 2).await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod events;
pub mod lists;
pub mod local;
pub mod remote;
pub mod session;
pub mod sync;
pub mod ui;

pub use config::{CacheScope, ClientConfig, ConfigError};
pub use error::{CartError, MutationOutcome, PersistMode};
pub use events::{CartEvent, CountIndicator, Notifier};
pub use local::{FileStorage, KeyValueStore, LocalCartCache, MemoryStorage};
pub use remote::{
    DocumentStore, HttpDocumentStore, MemoryDocumentStore, RemoteError, RemoteGateway,
};
pub use session::SessionTracker;
pub use sync::{CartSynchronizer, SyncPhase};
pub use ui::{GuardedAction, SignInPrompt, TracingSignInPrompt};

/// Lock a mutex, recovering the data if a previous holder panicked.
///
/// Every critical section in this crate leaves the guarded data consistent
/// before it can panic, so poisoned data is still valid.
pub(crate) fn lock<T>(mutex: &std::sync::Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}
