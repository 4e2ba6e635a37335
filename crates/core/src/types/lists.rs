//! Wishlist and followed-store entries.
//!
//! Both lists live on the buyer profile document and have no local mirror.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{ProductId, VendorId};
use super::price::serde_price;
use super::product::ResolvedProduct;

/// A saved product on a buyer's wishlist. Unique per `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistEntry {
    pub id: ProductId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default, with = "serde_price")]
    pub price: Decimal,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub vendor: String,
    #[serde(default)]
    pub vendor_uid: String,
    #[serde(default)]
    pub added_at: Option<DateTime<Utc>>,
}

impl WishlistEntry {
    /// Create a wishlist entry from a resolved product.
    #[must_use]
    pub fn from_product(product: ResolvedProduct, added_at: DateTime<Utc>) -> Self {
        Self {
            id: product.id,
            title: product.title,
            subtitle: product.subtitle,
            price: product.price,
            currency: product.currency,
            image_url: product.image_url,
            vendor: product.vendor,
            vendor_uid: product.vendor_uid,
            added_at: Some(added_at),
        }
    }
}

/// A store the buyer follows. Unique per `vendor_uid`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowEntry {
    pub vendor_uid: VendorId,
    #[serde(default)]
    pub store_name: String,
    #[serde(default)]
    pub followed_at: Option<DateTime<Utc>>,
}

impl FollowEntry {
    /// Create a follow entry stamped with `followed_at`.
    #[must_use]
    pub fn new(vendor_uid: VendorId, store_name: Option<&str>, followed_at: DateTime<Utc>) -> Self {
        Self {
            vendor_uid,
            store_name: store_name.unwrap_or_default().to_string(),
            followed_at: Some(followed_at),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_follow_entry_shape() {
        let ts = DateTime::parse_from_rfc3339("2024-01-02T03:04:05Z")
            .unwrap()
            .with_timezone(&Utc);
        let entry = FollowEntry::new(VendorId::new("v-9"), None, ts);
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["vendorUid"], json!("v-9"));
        assert_eq!(value["storeName"], json!(""));
        assert_eq!(value["followedAt"], json!("2024-01-02T03:04:05Z"));
    }

    #[test]
    fn test_wishlist_entry_tolerates_missing_fields() {
        let entry: WishlistEntry = serde_json::from_value(json!({"id": "p1"})).unwrap();
        assert_eq!(entry.id.as_str(), "p1");
        assert_eq!(entry.price, Decimal::ZERO);
        assert!(entry.added_at.is_none());
    }
}
