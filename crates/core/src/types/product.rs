//! Product input contract.
//!
//! Product payloads come from several page types (listing pages, vendor
//! stores, search results) that disagree on field names. Each normalized
//! field is resolved from an ordered list of aliases; the first alias with a
//! non-empty value wins.
//!
//! | field | aliases, in order | fallback |
//! | --- | --- | --- |
//! | id | `id`, `listingId`, `docId` | none: resolution fails |
//! | price | `priceNumber` (strict), else `price` (numeric prefix) | `0` |
//! | image | `imageUrl`, `image`, `primaryImage`, `primaryImageUrl`, `images[0]` | `""` |
//! | title | `title` | `"Untitled Product"` |
//! | subtitle | `subtitle` | `""` |
//! | currency | `currency` | `"USD"` |
//! | vendor | `vendor`, `vendorName` | `""` |
//! | vendorUid | `vendorUid`, `ownerId`, `vendorId` | `""` |
//!
//! When `priceNumber` is present and not null it is authoritative even if it
//! fails to coerce (the result is then zero); `price` is only consulted when
//! `priceNumber` is missing.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use super::id::ProductId;
use super::price::{self, DEFAULT_CURRENCY};

/// Title used when a product has none.
pub const UNTITLED_PRODUCT: &str = "Untitled Product";

const ID_ALIASES: &[&str] = &["id", "listingId", "docId"];
const IMAGE_ALIASES: &[&str] = &["imageUrl", "image", "primaryImage", "primaryImageUrl"];
const IMAGE_LIST_ALIAS: &str = "images";
const VENDOR_ALIASES: &[&str] = &["vendor", "vendorName"];
const VENDOR_UID_ALIASES: &[&str] = &["vendorUid", "ownerId", "vendorId"];
const STRICT_PRICE_ALIAS: &str = "priceNumber";
const LOOSE_PRICE_ALIAS: &str = "price";

/// Errors that can occur when resolving a [`ProductInput`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProductError {
    /// The payload is not a JSON object.
    #[error("product payload must be an object")]
    NotAnObject,
    /// None of the id aliases produced a non-empty identifier.
    #[error("product is missing an id (expected one of: id, listingId, docId)")]
    MissingId,
}

/// Untyped product payload as handed over by page code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductInput(Map<String, Value>);

/// A product with every field normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedProduct {
    pub id: ProductId,
    pub title: String,
    pub subtitle: String,
    pub price: Decimal,
    pub currency: String,
    pub image_url: String,
    pub vendor: String,
    pub vendor_uid: String,
}

impl ProductInput {
    /// Wrap a JSON object.
    #[must_use]
    pub const fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Build from any JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`ProductError::NotAnObject`] for non-object values.
    pub fn from_value(value: Value) -> Result<Self, ProductError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            _ => Err(ProductError::NotAnObject),
        }
    }

    /// Set a field, builder style.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    /// Resolve only the identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ProductError::MissingId`] if no alias yields a non-empty id.
    pub fn product_id(&self) -> Result<ProductId, ProductError> {
        self.first_text(ID_ALIASES)
            .map(ProductId::new)
            .ok_or(ProductError::MissingId)
    }

    /// Resolve every normalized field.
    ///
    /// # Errors
    ///
    /// Returns [`ProductError::MissingId`] if no alias yields a non-empty id.
    pub fn resolve(&self) -> Result<ResolvedProduct, ProductError> {
        let id = self.product_id()?;

        Ok(ResolvedProduct {
            id,
            title: self
                .first_text(&["title"])
                .unwrap_or_else(|| UNTITLED_PRODUCT.to_string()),
            subtitle: self.first_text(&["subtitle"]).unwrap_or_default(),
            price: self.price(),
            currency: self
                .first_text(&["currency"])
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            image_url: self.image_url(),
            vendor: self.first_text(VENDOR_ALIASES).unwrap_or_default(),
            vendor_uid: self.first_text(VENDOR_UID_ALIASES).unwrap_or_default(),
        })
    }

    fn price(&self) -> Decimal {
        match self.0.get(STRICT_PRICE_ALIAS) {
            Some(value) if !value.is_null() => price::coerce_number(value),
            _ => self
                .0
                .get(LOOSE_PRICE_ALIAS)
                .map_or(Decimal::ZERO, price::coerce_loose),
        }
    }

    fn image_url(&self) -> String {
        self.first_text(IMAGE_ALIASES)
            .or_else(|| {
                self.0
                    .get(IMAGE_LIST_ALIAS)
                    .and_then(Value::as_array)
                    .and_then(|images| images.first())
                    .and_then(text_of)
            })
            .unwrap_or_default()
    }

    /// First alias whose value renders as non-empty text.
    fn first_text(&self, aliases: &[&str]) -> Option<String> {
        aliases
            .iter()
            .find_map(|alias| self.0.get(*alias).and_then(text_of))
    }
}

impl From<Map<String, Value>> for ProductInput {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// Render a JSON scalar as text. Empty strings, `false`, zero, and null are
/// treated as absent so the next alias gets a chance.
fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64().is_some_and(f64::is_normal) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn input(value: Value) -> ProductInput {
        ProductInput::from_value(value).unwrap()
    }

    #[test]
    fn test_id_alias_order() {
        let p = input(json!({"listingId": "L1", "docId": "D1"}));
        assert_eq!(p.product_id().unwrap().as_str(), "L1");

        let p = input(json!({"id": "", "docId": "D1"}));
        assert_eq!(p.product_id().unwrap().as_str(), "D1");

        let p = input(json!({"id": 42}));
        assert_eq!(p.product_id().unwrap().as_str(), "42");
    }

    #[test]
    fn test_missing_id_is_an_error() {
        let p = input(json!({"title": "Lamp"}));
        assert_eq!(p.resolve().unwrap_err(), ProductError::MissingId);
    }

    #[test]
    fn test_non_object_rejected() {
        assert_eq!(
            ProductInput::from_value(json!("id")).unwrap_err(),
            ProductError::NotAnObject
        );
    }

    #[test]
    fn test_defaults() {
        let resolved = input(json!({"id": "p"})).resolve().unwrap();
        assert_eq!(resolved.title, UNTITLED_PRODUCT);
        assert_eq!(resolved.subtitle, "");
        assert_eq!(resolved.currency, "USD");
        assert_eq!(resolved.price, Decimal::ZERO);
        assert_eq!(resolved.image_url, "");
    }

    #[test]
    fn test_price_number_wins_over_price() {
        let resolved = input(json!({"id": "p", "priceNumber": 5, "price": "9.99"}))
            .resolve()
            .unwrap();
        assert_eq!(resolved.price, Decimal::from(5));

        // Present but unusable priceNumber does not fall through
        let resolved = input(json!({"id": "p", "priceNumber": "n/a", "price": "9.99"}))
            .resolve()
            .unwrap();
        assert_eq!(resolved.price, Decimal::ZERO);

        let resolved = input(json!({"id": "p", "priceNumber": null, "price": "9.99 each"}))
            .resolve()
            .unwrap();
        assert_eq!(resolved.price, Decimal::new(999, 2));
    }

    #[test]
    fn test_image_alias_order() {
        let resolved = input(json!({
            "id": "p",
            "image": "",
            "primaryImage": "primary.png",
            "images": ["first.png"]
        }))
        .resolve()
        .unwrap();
        assert_eq!(resolved.image_url, "primary.png");

        let resolved = input(json!({"id": "p", "images": ["first.png", "second.png"]}))
            .resolve()
            .unwrap();
        assert_eq!(resolved.image_url, "first.png");
    }

    #[test]
    fn test_vendor_aliases() {
        let resolved = input(json!({"id": "p", "vendorName": "Acme", "ownerId": "o-1"}))
            .resolve()
            .unwrap();
        assert_eq!(resolved.vendor, "Acme");
        assert_eq!(resolved.vendor_uid, "o-1");
    }

    #[test]
    fn test_builder() {
        let p = ProductInput::default().with("docId", "d").with("price", 3);
        let resolved = p.resolve().unwrap();
        assert_eq!(resolved.id.as_str(), "d");
        assert_eq!(resolved.price, Decimal::from(3));
    }
}
