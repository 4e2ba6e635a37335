//! Wishlist and followed stores.
//!
//! Both lists live on the buyer profile document and have no local mirror.
//! Each mutation reads the whole list, edits it in memory, and merge-writes
//! the whole field back, so a mutation costs O(n) in the list length and the
//! length is capped at `max_list_entries`.
//!
//! There is no locking around the read-modify-write: two mutations in flight
//! for the same buyer can interleave, and the later write wins.

use cartsync_core::{FollowEntry, ProductId, ProductInput, UserId, VendorId, WishlistEntry};
use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::error::{CartError, add_breadcrumb};
use crate::events::CartEvent;
use crate::remote::{ProfileField, RemoteError, RemoteGateway};
use crate::sync::{CartSynchronizer, report_remote_failure};
use crate::ui::GuardedAction;

impl CartSynchronizer {
    // =========================================================================
    // Wishlist
    // =========================================================================

    /// Save a product to the wishlist.
    ///
    /// Returns `Ok(false)` if the product is already saved.
    ///
    /// # Errors
    ///
    /// - [`CartError::AuthRequired`] when signed out (the sign-in prompt has
    ///   been shown)
    /// - [`CartError::InvalidProduct`] when the product has no usable id
    /// - [`CartError::ListFull`] when the wishlist is at capacity
    /// - [`CartError::RemoteUnavailable`] / [`CartError::Remote`] when the
    ///   profile document cannot be read or written
    #[instrument(skip(self, product))]
    pub async fn add_to_wishlist(&self, product: &ProductInput) -> Result<bool, CartError> {
        let (user, remote) = self.guarded(GuardedAction::AddToWishlist)?;
        let product = product.resolve()?;
        let id = product.id.clone();
        let entry = serde_json::to_value(WishlistEntry::from_product(product, Utc::now()))
            .map_err(RemoteError::from)?;

        let added = self
            .rewrite_list(&user, &remote, ProfileField::Wishlist, |list| {
                if contains_key(list, ProfileField::Wishlist, id.as_str()) {
                    return Ok(false);
                }
                self.ensure_capacity(list)?;
                list.push(entry);
                Ok(true)
            })
            .await?;

        if added {
            add_breadcrumb("wishlist", "Saved item", Some(&[("product_id", id.as_str())]));
        } else {
            debug!(product_id = %id, "Already on wishlist");
        }
        Ok(added)
    }

    /// Remove a product from the wishlist.
    ///
    /// Returns `Ok(false)` when signed out or when the product was not saved.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::RemoteUnavailable`] / [`CartError::Remote`] when
    /// the profile document cannot be read or written.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn remove_from_wishlist(&self, id: &ProductId) -> Result<bool, CartError> {
        let Some((user, remote)) = self.signed_in()? else {
            return Ok(false);
        };

        self.rewrite_list(&user, &remote, ProfileField::Wishlist, |list| {
            Ok(remove_key(list, ProfileField::Wishlist, id.as_str()))
        })
        .await
    }

    /// Saved products. Empty when signed out or when the read fails.
    #[instrument(skip(self))]
    pub async fn get_wishlist(&self) -> Vec<WishlistEntry> {
        self.read_profile()
            .await
            .map(|doc| doc.wishlist_entries())
            .unwrap_or_default()
    }

    // =========================================================================
    // Following
    // =========================================================================

    /// Follow a store.
    ///
    /// Returns `Ok(false)` if the store is already followed.
    ///
    /// # Errors
    ///
    /// - [`CartError::AuthRequired`] when signed out (the sign-in prompt has
    ///   been shown)
    /// - [`CartError::MissingStoreId`] when `vendor_uid` is blank
    /// - [`CartError::ListFull`] when the following list is at capacity
    /// - [`CartError::RemoteUnavailable`] / [`CartError::Remote`] when the
    ///   profile document cannot be read or written
    #[instrument(skip(self), fields(vendor_uid = %vendor_uid))]
    pub async fn follow_store(
        &self,
        vendor_uid: &VendorId,
        store_name: Option<&str>,
    ) -> Result<bool, CartError> {
        let (user, remote) = self.guarded(GuardedAction::FollowStore)?;
        if vendor_uid.is_blank() {
            return Err(CartError::MissingStoreId);
        }

        let entry = serde_json::to_value(FollowEntry::new(
            vendor_uid.clone(),
            store_name,
            Utc::now(),
        ))
        .map_err(RemoteError::from)?;

        let added = self
            .rewrite_list(&user, &remote, ProfileField::Following, |list| {
                if contains_key(list, ProfileField::Following, vendor_uid.as_str()) {
                    return Ok(false);
                }
                self.ensure_capacity(list)?;
                list.push(entry);
                Ok(true)
            })
            .await?;

        if added {
            add_breadcrumb(
                "following",
                "Followed store",
                Some(&[("vendor_uid", vendor_uid.as_str())]),
            );
        }
        Ok(added)
    }

    /// Stop following a store.
    ///
    /// Returns `Ok(false)` when signed out or when the store was not followed.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::RemoteUnavailable`] / [`CartError::Remote`] when
    /// the profile document cannot be read or written.
    #[instrument(skip(self), fields(vendor_uid = %vendor_uid))]
    pub async fn unfollow_store(&self, vendor_uid: &VendorId) -> Result<bool, CartError> {
        let Some((user, remote)) = self.signed_in()? else {
            return Ok(false);
        };

        self.rewrite_list(&user, &remote, ProfileField::Following, |list| {
            Ok(remove_key(list, ProfileField::Following, vendor_uid.as_str()))
        })
        .await
    }

    /// Followed stores. Empty when signed out or when the read fails.
    #[instrument(skip(self))]
    pub async fn get_followed_stores(&self) -> Vec<FollowEntry> {
        self.read_profile()
            .await
            .map(|doc| doc.following_entries())
            .unwrap_or_default()
    }

    /// Whether the buyer follows `vendor_uid`. `false` when signed out.
    pub async fn is_following_store(&self, vendor_uid: &VendorId) -> bool {
        self.get_followed_stores()
            .await
            .iter()
            .any(|entry| &entry.vendor_uid == vendor_uid)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Signed-in buyer and remote for an add, prompting sign-in if needed.
    fn guarded(&self, action: GuardedAction) -> Result<(UserId, RemoteGateway), CartError> {
        let Some(user) = self.current_user() else {
            return Err(self.require_sign_in(action));
        };
        let remote = self
            .inner
            .remote
            .clone()
            .ok_or(CartError::RemoteUnavailable)?;
        Ok((user, remote))
    }

    /// Signed-in buyer and remote for a removal; `None` when signed out.
    fn signed_in(&self) -> Result<Option<(UserId, RemoteGateway)>, CartError> {
        let Some(user) = self.current_user() else {
            return Ok(None);
        };
        let remote = self
            .inner
            .remote
            .clone()
            .ok_or(CartError::RemoteUnavailable)?;
        Ok(Some((user, remote)))
    }

    async fn read_profile(&self) -> Option<crate::remote::BuyerProfileDocument> {
        let user = self.current_user()?;
        let remote = self.inner.remote.clone()?;
        match remote.read_profile_document(&user).await {
            Ok(doc) => Some(doc.unwrap_or_default()),
            Err(e) => {
                report_remote_failure("Failed to read buyer profile", &e);
                None
            }
        }
    }

    fn ensure_capacity(&self, list: &[Value]) -> Result<(), CartError> {
        let max = self.inner.config.max_list_entries;
        if list.len() >= max {
            warn!(max, len = list.len(), "List is full");
            return Err(CartError::ListFull { max });
        }
        Ok(())
    }

    /// Read a list field, apply `edit`, and write it back if it changed.
    ///
    /// Publishes the list's update event after a successful write.
    async fn rewrite_list<F>(
        &self,
        user: &UserId,
        remote: &RemoteGateway,
        field: ProfileField,
        edit: F,
    ) -> Result<bool, CartError>
    where
        F: FnOnce(&mut Vec<Value>) -> Result<bool, CartError> + Send,
    {
        let doc = remote
            .read_profile_document(user)
            .await
            .inspect_err(|e| report_remote_failure("Failed to read buyer profile", e))?
            .unwrap_or_default();

        let mut list = doc.list(field).to_vec();
        if !edit(&mut list)? {
            return Ok(false);
        }

        let len = list.len();
        remote
            .write_profile_field(user, field, Value::Array(list))
            .await
            .inspect_err(|e| report_remote_failure("Failed to write buyer profile", e))?;

        info!(%field, len, "Updated buyer list");
        self.inner.notifier.publish(match field {
            ProfileField::Wishlist => CartEvent::WishlistUpdated,
            ProfileField::Following => CartEvent::FollowingUpdated,
        });
        Ok(true)
    }
}

/// Identifier of a raw list entry. Numeric ids compare by their text.
fn entry_key(entry: &Value, field: ProfileField) -> Option<String> {
    match entry.get(field.key_field())? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn contains_key(list: &[Value], field: ProfileField, key: &str) -> bool {
    list.iter()
        .any(|entry| entry_key(entry, field).as_deref() == Some(key))
}

/// Drop every entry with `key`. Returns `true` if anything was removed.
fn remove_key(list: &mut Vec<Value>, field: ProfileField, key: &str) -> bool {
    let before = list.len();
    list.retain(|entry| entry_key(entry, field).as_deref() != Some(key));
    list.len() != before
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use crate::config::{CacheScope, ClientConfig};
    use crate::local::{LocalCartCache, MemoryStorage};
    use crate::remote::{Collection, MemoryDocumentStore};

    use super::*;

    fn setup(max_list_entries: usize) -> (CartSynchronizer, Arc<MemoryDocumentStore>) {
        let remote = Arc::new(MemoryDocumentStore::new());
        let config = ClientConfig {
            max_list_entries,
            ..ClientConfig::default()
        };
        let sync = CartSynchronizer::builder(config)
            .local(LocalCartCache::new(MemoryStorage::new(), CacheScope::Device))
            .remote(remote.clone())
            .build();
        (sync, remote)
    }

    fn product(id: &str) -> ProductInput {
        ProductInput::default().with("id", id).with("title", "Mug")
    }

    #[tokio::test]
    async fn test_wishlist_add_is_idempotent() {
        let (sync, _) = setup(10);
        sync.handle_auth_change(Some(UserId::new("u1"))).await;
        let mut events = sync.subscribe();

        assert!(sync.add_to_wishlist(&product("p1")).await.unwrap());
        assert!(!sync.add_to_wishlist(&product("p1")).await.unwrap());

        let wishlist = sync.get_wishlist().await;
        assert_eq!(wishlist.len(), 1);
        assert_eq!(wishlist[0].title, "Mug");

        assert_eq!(events.try_recv().unwrap(), CartEvent::WishlistUpdated);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_wishlist_remove() {
        let (sync, remote) = setup(10);
        sync.handle_auth_change(Some(UserId::new("u1"))).await;
        sync.add_to_wishlist(&product("p1")).await.unwrap();
        let writes = remote.write_count();

        assert!(!sync.remove_from_wishlist(&ProductId::new("nope")).await.unwrap());
        assert_eq!(remote.write_count(), writes);

        assert!(sync.remove_from_wishlist(&ProductId::new("p1")).await.unwrap());
        assert!(sync.get_wishlist().await.is_empty());
    }

    #[tokio::test]
    async fn test_list_capacity() {
        let (sync, _) = setup(1);
        sync.handle_auth_change(Some(UserId::new("u1"))).await;
        sync.add_to_wishlist(&product("p1")).await.unwrap();

        let err = sync.add_to_wishlist(&product("p2")).await.unwrap_err();
        assert!(matches!(err, CartError::ListFull { max: 1 }));
        // Duplicates are still reported as not added rather than full
        assert!(!sync.add_to_wishlist(&product("p1")).await.unwrap());
    }

    #[tokio::test]
    async fn test_follow_preserves_unknown_fields() {
        let (sync, remote) = setup(10);
        remote.insert(
            Collection::Buyers,
            "u1",
            json!({
                "displayName": "Ada",
                "following": [{"vendorUid": "v1", "storeName": "One", "tier": "gold"}],
            }),
        );
        sync.handle_auth_change(Some(UserId::new("u1"))).await;

        assert!(sync.follow_store(&VendorId::new("v2"), None).await.unwrap());
        assert!(sync.is_following_store(&VendorId::new("v1")).await);
        assert!(sync.is_following_store(&VendorId::new("v2")).await);

        let doc = remote.document(Collection::Buyers, "u1").unwrap();
        assert_eq!(doc["displayName"], "Ada");
        assert_eq!(doc["following"][0]["tier"], "gold");
        assert_eq!(doc["following"][1]["storeName"], "");
    }

    #[tokio::test]
    async fn test_follow_rejects_blank_store() {
        let (sync, _) = setup(10);
        sync.handle_auth_change(Some(UserId::new("u1"))).await;
        let err = sync.follow_store(&VendorId::new("  "), None).await.unwrap_err();
        assert!(matches!(err, CartError::MissingStoreId));
    }

    #[tokio::test]
    async fn test_signed_out_reads_and_removes_are_silent() {
        let (sync, remote) = setup(10);
        sync.handle_auth_change(None).await;

        assert!(!sync.unfollow_store(&VendorId::new("v1")).await.unwrap());
        assert!(!sync.remove_from_wishlist(&ProductId::new("p1")).await.unwrap());
        assert!(sync.get_followed_stores().await.is_empty());
        assert!(!sync.is_following_store(&VendorId::new("v1")).await);
        assert_eq!(remote.read_count() + remote.write_count(), 0);
    }

    #[tokio::test]
    async fn test_read_failure_reads_as_empty() {
        let (sync, remote) = setup(10);
        sync.handle_auth_change(Some(UserId::new("u1"))).await;
        sync.add_to_wishlist(&product("p1")).await.unwrap();
        remote.fail_reads(true);

        assert!(sync.get_wishlist().await.is_empty());
        assert!(matches!(
            sync.add_to_wishlist(&product("p2")).await.unwrap_err(),
            CartError::Remote(_)
        ));
    }

    #[test]
    fn test_numeric_keys_match_text() {
        let list = vec![json!({"id": 42}), json!({"id": "a"})];
        assert!(contains_key(&list, ProfileField::Wishlist, "42"));
        assert!(!contains_key(&list, ProfileField::Wishlist, "b"));
    }
}
