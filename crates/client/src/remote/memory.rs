//! In-memory document store.
//!
//! Applies merges the same way the hosted store does and adds the knobs
//! tests need: failure injection, call counters, and an optional
//! cooperative delay that lets concurrent read-modify-write sequences
//! interleave on a single task.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use super::{Collection, Document, DocumentStore, FieldValue, RemoteError};

/// Process-local [`DocumentStore`].
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    documents: Mutex<HashMap<(Collection, String), Document>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    latency: AtomicBool,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl MemoryDocumentStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Yield to the scheduler once inside every operation.
    ///
    /// Reads take their snapshot before yielding and writes apply before
    /// yielding, so two sequences driven with `tokio::join!` both read before
    /// either writes.
    #[must_use]
    pub fn with_latency(self) -> Self {
        self.latency.store(true, Ordering::SeqCst);
        self
    }

    /// Make subsequent reads fail.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent writes fail.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Replace a document wholesale. Non-object values are ignored.
    pub fn insert(&self, collection: Collection, id: &str, document: Value) {
        if let Value::Object(fields) = document {
            crate::lock(&self.documents).insert((collection, id.to_string()), fields);
        }
    }

    /// Current contents of a document.
    #[must_use]
    pub fn document(&self, collection: Collection, id: &str) -> Option<Document> {
        crate::lock(&self.documents)
            .get(&(collection, id.to_string()))
            .cloned()
    }

    /// Number of `get` calls so far, failed ones included.
    #[must_use]
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of `merge` calls so far, failed ones included.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    async fn delay(&self) {
        if self.latency.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>, RemoteError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            self.delay().await;
            return Err(RemoteError::Unavailable("injected read failure".to_string()));
        }

        let snapshot = self.document(collection, id);
        self.delay().await;
        Ok(snapshot)
    }

    async fn merge(
        &self,
        collection: Collection,
        id: &str,
        fields: Vec<(String, FieldValue)>,
    ) -> Result<(), RemoteError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            self.delay().await;
            return Err(RemoteError::Unavailable("injected write failure".to_string()));
        }

        {
            let now = Utc::now().to_rfc3339();
            let mut documents = crate::lock(&self.documents);
            let doc = documents.entry((collection, id.to_string())).or_default();
            for (name, value) in fields {
                let value = match value {
                    FieldValue::Value(value) => value,
                    FieldValue::ServerTimestamp => Value::String(now.clone()),
                };
                doc.insert(name, value);
            }
        }

        self.delay().await;
        Ok(())
    }
}
