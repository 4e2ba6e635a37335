//! Remote per-user document store.
//!
//! # Documents
//!
//! - `carts/{user_id}` - `{ items: CartItem[], updatedAt }`
//! - `buyers/{user_id}` - `{ wishlist: WishlistEntry[], following: FollowEntry[], updatedAt, ... }`
//!
//! The buyer document is shared with other subsystems, so every write is a
//! merge of the named fields and `updatedAt` is always server-assigned.
//!
//! [`DocumentStore`] is the transport seam; [`RemoteGateway`] maps the two
//! document shapes onto it.

mod http;
mod memory;

pub use http::HttpDocumentStore;
pub use memory::MemoryDocumentStore;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use cartsync_core::{CartItem, FollowEntry, UserId, WishlistEntry, decode_items};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{instrument, warn};

/// Field holding the server-assigned modification time.
pub const UPDATED_AT_FIELD: &str = "updatedAt";

/// A document body: top-level field name to value.
pub type Document = Map<String, Value>;

/// Errors from the remote document store.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The store could not be reached or is not usable.
    #[error("Remote store unavailable: {0}")]
    Unavailable(String),

    /// The store rejected the caller's credentials for this document.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse a response body.
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Top-level document collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Carts,
    Buyers,
}

impl Collection {
    /// Path segment of the collection.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Carts => "carts",
            Self::Buyers => "buyers",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value of a field in a merge write.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// A literal JSON value.
    Value(Value),
    /// Replaced by the store's clock when the write is applied.
    ServerTimestamp,
}

/// Document transport.
///
/// Implementations must apply `merge` as a field-level update: fields not
/// named in the write are left untouched, and a missing document is created.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document. `Ok(None)` when it does not exist.
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>, RemoteError>;

    /// Merge the given fields into a document.
    async fn merge(
        &self,
        collection: Collection,
        id: &str,
        fields: Vec<(String, FieldValue)>,
    ) -> Result<(), RemoteError>;
}

/// The remote cart document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartDocument {
    pub items: Vec<CartItem>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// The slice of the buyer profile document this crate owns.
///
/// Entries are kept as raw JSON so a rewrite preserves fields written by
/// other clients.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuyerProfileDocument {
    pub wishlist: Vec<Value>,
    pub following: Vec<Value>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl BuyerProfileDocument {
    /// Raw entries of one list field.
    #[must_use]
    pub fn list(&self, field: ProfileField) -> &[Value] {
        match field {
            ProfileField::Wishlist => &self.wishlist,
            ProfileField::Following => &self.following,
        }
    }

    /// Typed wishlist entries; entries that fail to decode are skipped.
    #[must_use]
    pub fn wishlist_entries(&self) -> Vec<WishlistEntry> {
        decode_entries(&self.wishlist, "wishlist")
    }

    /// Typed following entries; entries that fail to decode are skipped.
    #[must_use]
    pub fn following_entries(&self) -> Vec<FollowEntry> {
        decode_entries(&self.following, "following")
    }
}

/// List fields on the buyer profile document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileField {
    Wishlist,
    Following,
}

impl ProfileField {
    /// Document field name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Wishlist => "wishlist",
            Self::Following => "following",
        }
    }

    /// Field identifying an entry of this list.
    #[must_use]
    pub const fn key_field(self) -> &'static str {
        match self {
            Self::Wishlist => "id",
            Self::Following => "vendorUid",
        }
    }
}

impl fmt::Display for ProfileField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed access to the cart and buyer documents.
#[derive(Clone)]
pub struct RemoteGateway {
    store: Arc<dyn DocumentStore>,
}

impl RemoteGateway {
    /// Wrap a document store.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Read `carts/{user}`.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` if the store fails.
    #[instrument(skip(self), fields(user_id = %user))]
    pub async fn read_cart_document(
        &self,
        user: &UserId,
    ) -> Result<Option<CartDocument>, RemoteError> {
        let Some(doc) = self.store.get(Collection::Carts, user.as_str()).await? else {
            return Ok(None);
        };

        let (items, dropped) = doc
            .get("items")
            .map_or_else(|| (Vec::new(), 0), decode_items);
        if dropped > 0 {
            warn!(dropped, "Dropped undecodable items from remote cart");
        }

        Ok(Some(CartDocument {
            items,
            updated_at: parse_timestamp(doc.get(UPDATED_AT_FIELD)),
        }))
    }

    /// Merge-write `items` into `carts/{user}` with a server `updatedAt`.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` if the store fails.
    #[instrument(skip(self, items), fields(user_id = %user, items = items.len()))]
    pub async fn write_cart_document(
        &self,
        user: &UserId,
        items: &[CartItem],
    ) -> Result<(), RemoteError> {
        let items = serde_json::to_value(items)?;
        self.store
            .merge(
                Collection::Carts,
                user.as_str(),
                vec![
                    ("items".to_string(), FieldValue::Value(items)),
                    (UPDATED_AT_FIELD.to_string(), FieldValue::ServerTimestamp),
                ],
            )
            .await
    }

    /// Read the lists on `buyers/{user}`.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` if the store fails.
    #[instrument(skip(self), fields(user_id = %user))]
    pub async fn read_profile_document(
        &self,
        user: &UserId,
    ) -> Result<Option<BuyerProfileDocument>, RemoteError> {
        let Some(doc) = self.store.get(Collection::Buyers, user.as_str()).await? else {
            return Ok(None);
        };

        Ok(Some(BuyerProfileDocument {
            wishlist: array_field(&doc, ProfileField::Wishlist.as_str()),
            following: array_field(&doc, ProfileField::Following.as_str()),
            updated_at: parse_timestamp(doc.get(UPDATED_AT_FIELD)),
        }))
    }

    /// Merge-write one list field of `buyers/{user}` with a server `updatedAt`.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` if the store fails.
    #[instrument(skip(self, value), fields(user_id = %user, field = %field))]
    pub async fn write_profile_field(
        &self,
        user: &UserId,
        field: ProfileField,
        value: Value,
    ) -> Result<(), RemoteError> {
        self.store
            .merge(
                Collection::Buyers,
                user.as_str(),
                vec![
                    (field.as_str().to_string(), FieldValue::Value(value)),
                    (UPDATED_AT_FIELD.to_string(), FieldValue::ServerTimestamp),
                ],
            )
            .await
    }
}

impl fmt::Debug for RemoteGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteGateway").finish_non_exhaustive()
    }
}

fn array_field(doc: &Document, field: &str) -> Vec<Value> {
    match doc.get(field) {
        Some(Value::Array(entries)) => entries.clone(),
        _ => Vec::new(),
    }
}

fn decode_entries<T: serde::de::DeserializeOwned>(raw: &[Value], list: &str) -> Vec<T> {
    let mut skipped = 0_usize;
    let entries = raw
        .iter()
        .filter_map(|entry| {
            let decoded = serde_json::from_value(entry.clone()).ok();
            if decoded.is_none() {
                skipped += 1;
            }
            decoded
        })
        .collect();
    if skipped > 0 {
        warn!(list, skipped, "Skipped undecodable list entries");
    }
    entries
}

fn parse_timestamp(value: Option<&Value>) -> Option<DateTime<Utc>> {
    let raw = value?.as_str()?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
