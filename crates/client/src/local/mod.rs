//! Device-local cart persistence.
//!
//! # Keys
//!
//! - `cartsync.cart_items.v1` - JSON array of cart items
//! - `cartsync.cart_updated_at.v1` - RFC 3339 timestamp of the last save
//!
//! With [`CacheScope::User`] both keys get a `.{user_id}` suffix while a
//! buyer is signed in.
//!
//! # Contract
//!
//! [`LocalCartCache::load`] never fails: a missing, unreadable, or corrupt
//! snapshot loads as an empty cart. [`LocalCartCache::save`] is best-effort:
//! failures are logged and swallowed. Both are synchronous.

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use cartsync_core::{CartItem, UserId, decode_items};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::CacheScope;

/// Key holding the serialized item list.
pub const ITEMS_KEY: &str = "cartsync.cart_items.v1";

/// Key holding the last-saved timestamp.
pub const UPDATED_AT_KEY: &str = "cartsync.cart_updated_at.v1";

/// Errors from a key-value backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The backend refused the write (quota, read-only, injected failure).
    #[error("Write rejected: {0}")]
    Rejected(String),
}

/// Synchronous string key-value storage.
pub trait KeyValueStore: Send + Sync {
    /// Read a value. `Ok(None)` when the key is absent.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// The local cart snapshot.
pub struct LocalCartCache {
    store: Box<dyn KeyValueStore>,
    scope: CacheScope,
}

impl LocalCartCache {
    /// Create a cache over a key-value backend.
    #[must_use]
    pub fn new(store: impl KeyValueStore + 'static, scope: CacheScope) -> Self {
        Self {
            store: Box::new(store),
            scope,
        }
    }

    /// Load the cached items for `user` (or the device when signed out).
    ///
    /// Returns an empty list if nothing is stored or the snapshot is corrupt.
    #[must_use]
    pub fn load(&self, user: Option<&UserId>) -> Vec<CartItem> {
        let key = self.key(ITEMS_KEY, user);

        let raw = match self.store.get(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(error = %e, key, "Failed to read local cart cache");
                return Vec::new();
            }
        };

        let value = match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, key, "Local cart cache is corrupt, starting empty");
                return Vec::new();
            }
        };

        let (items, dropped) = decode_items(&value);
        if dropped > 0 {
            warn!(dropped, key, "Dropped undecodable items from local cart cache");
        }
        debug!(items = items.len(), key, "Loaded cart from local cache");
        items
    }

    /// Save `items` and stamp the save time. Failures are logged only.
    pub fn save(&self, user: Option<&UserId>, items: &[CartItem]) {
        let key = self.key(ITEMS_KEY, user);

        let serialized = match serde_json::to_string(items) {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "Failed to serialize cart for local cache");
                return;
            }
        };

        if let Err(e) = self.store.set(&key, &serialized) {
            warn!(error = %e, key, "Failed to save cart to local cache");
            return;
        }

        let stamp_key = self.key(UPDATED_AT_KEY, user);
        if let Err(e) = self.store.set(&stamp_key, &Utc::now().to_rfc3339()) {
            warn!(error = %e, key = stamp_key, "Failed to save local cart timestamp");
        }
    }

    /// When the snapshot was last saved, if known.
    #[must_use]
    pub fn last_saved_at(&self, user: Option<&UserId>) -> Option<DateTime<Utc>> {
        let raw = self
            .store
            .get(&self.key(UPDATED_AT_KEY, user))
            .ok()
            .flatten()?;
        DateTime::parse_from_rfc3339(raw.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// How this cache is keyed.
    #[must_use]
    pub const fn scope(&self) -> CacheScope {
        self.scope
    }

    fn key(&self, base: &str, user: Option<&UserId>) -> String {
        match (self.scope, user) {
            (CacheScope::User, Some(user)) => format!("{base}.{user}"),
            _ => base.to_string(),
        }
    }
}

impl std::fmt::Debug for LocalCartCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalCartCache")
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}
