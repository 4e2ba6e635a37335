//! In-memory key-value storage.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use super::{KeyValueStore, StorageError};

/// Process-local storage for tests and ephemeral sessions.
///
/// Clones share the same underlying map, so a test can keep a handle while
/// the cache owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryStorage {
    /// Create empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `set` fail (simulates a full or read-only store).
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Raw value for `key`, bypassing the error path.
    #[must_use]
    pub fn raw(&self, key: &str) -> Option<String> {
        crate::lock(&self.entries).get(key).cloned()
    }
}

impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(crate::lock(&self.entries).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Rejected("memory storage is read-only".to_string()));
        }
        crate::lock(&self.entries).insert(key.to_string(), value.to_string());
        Ok(())
    }
}
