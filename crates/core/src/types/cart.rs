//! Cart line items and the derived cart queries.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::id::{ProductId, VendorId};
use super::price::serde_price;
use super::product::ResolvedProduct;
use super::quantity::serde_quantity;

/// A single line in a shopping cart.
///
/// Serialized with camelCase field names; this is the shape stored both in
/// the local snapshot and in the remote cart document.
///
/// ## Invariants
///
/// - At most one item per `id` in a cart (see [`normalize_items`]).
/// - Items created by this crate always have `quantity >= 1`. Items decoded
///   from storage may carry a zero quantity if the stored value was garbage;
///   such items count as zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: ProductId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default, with = "serde_price")]
    pub price: Decimal,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub vendor: String,
    #[serde(default)]
    pub vendor_uid: String,
    #[serde(default, deserialize_with = "serde_quantity::deserialize")]
    pub quantity: u32,
    /// Set once when the item is first added.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub added_at: Option<DateTime<Utc>>,
}

impl CartItem {
    /// Create a new cart item from a resolved product.
    #[must_use]
    pub fn from_product(product: ResolvedProduct, quantity: u32, added_at: DateTime<Utc>) -> Self {
        Self {
            id: product.id,
            title: product.title,
            subtitle: product.subtitle,
            price: product.price,
            currency: product.currency,
            image_url: product.image_url,
            vendor: product.vendor,
            vendor_uid: product.vendor_uid,
            quantity: quantity.max(1),
            added_at: Some(added_at),
        }
    }

    /// Line total (`price * quantity`), saturating at [`Decimal::MAX`].
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price.saturating_mul(Decimal::from(self.quantity))
    }

    /// The vendor as a typed id, if present.
    #[must_use]
    pub fn vendor_id(&self) -> Option<VendorId> {
        (!self.vendor_uid.is_empty()).then(|| VendorId::new(self.vendor_uid.clone()))
    }
}

fn default_currency() -> String {
    super::price::DEFAULT_CURRENCY.to_string()
}

/// Decode a timestamp, treating anything unparsable as absent.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        _ => None,
    })
}

/// Sum of `price * quantity` across all items, saturating at [`Decimal::MAX`].
#[must_use]
pub fn cart_total(items: &[CartItem]) -> Decimal {
    items
        .iter()
        .fold(Decimal::ZERO, |total, item| total.saturating_add(item.line_total()))
}

/// Sum of quantities across all items.
#[must_use]
pub fn cart_count(items: &[CartItem]) -> u32 {
    items
        .iter()
        .fold(0u32, |total, item| total.saturating_add(item.quantity))
}

/// Decode a list of items from an untyped JSON value.
///
/// Returns the decoded items and how many entries were dropped. A value that
/// is not an array decodes as empty. Duplicate ids collapse into the first
/// occurrence with summed quantity.
#[must_use]
pub fn decode_items(value: &Value) -> (Vec<CartItem>, usize) {
    let Value::Array(entries) = value else {
        return (Vec::new(), 0);
    };

    let mut dropped = 0;
    let items = entries
        .iter()
        .filter_map(|entry| {
            let item = serde_json::from_value::<CartItem>(entry.clone())
                .ok()
                .filter(|item| !item.id.is_blank());
            if item.is_none() {
                dropped += 1;
            }
            item
        })
        .collect();

    (normalize_items(items), dropped)
}

/// Enforce one item per id by merging duplicates into the first occurrence.
#[must_use]
pub fn normalize_items(items: Vec<CartItem>) -> Vec<CartItem> {
    let mut out: Vec<CartItem> = Vec::with_capacity(items.len());
    for item in items {
        if let Some(existing) = out.iter_mut().find(|it| it.id == item.id) {
            existing.quantity = existing.quantity.saturating_add(item.quantity);
        } else {
            out.push(item);
        }
    }
    out
}
