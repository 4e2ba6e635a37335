//! Newtype IDs for type-safe entity references.
//!
//! Use the `define_id!` macro to create type-safe ID wrappers that prevent
//! accidentally mixing IDs from different entity types. Remote documents key
//! everything by opaque strings (user uids, listing ids, vendor uids), so the
//! wrappers are string-backed.

/// Macro to define a type-safe, string-backed ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize` as a plain string
/// - `Deserialize` from a string or an integer (documents written by other
///   clients sometimes store numeric ids)
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`
/// - `From<String>`, `From<&str>`, and `Display` implementations
///
/// # Example
///
/// ```rust
/// # use cartsync_core::define_id;
/// define_id!(UserId);
/// define_id!(ProductId);
///
/// let user_id = UserId::new("u-1");
/// let product_id = ProductId::new("u-1");
///
/// // These are different types, so this won't compile:
/// // let _: UserId = product_id;
/// assert_eq!(user_id.as_str(), product_id.as_str());
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, ::serde::Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from anything string-like.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the ID and return the underlying string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }

            /// Returns `true` if the ID is empty or only whitespace.
            #[must_use]
            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl<'de> ::serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> ::core::result::Result<Self, D::Error>
            where
                D: ::serde::Deserializer<'de>,
            {
                #[derive(::serde::Deserialize)]
                #[serde(untagged)]
                enum Raw {
                    Text(String),
                    Signed(i64),
                    Unsigned(u64),
                }

                Ok(match Raw::deserialize(deserializer)? {
                    Raw::Text(s) => Self(s),
                    Raw::Signed(n) => Self(n.to_string()),
                    Raw::Unsigned(n) => Self(n.to_string()),
                })
            }
        }
    };
}

// Define standard entity IDs
define_id!(UserId);
define_id!(ProductId);
define_id!(VendorId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display_and_accessors() {
        let id = ProductId::new("listing-42");
        assert_eq!(id.to_string(), "listing-42");
        assert_eq!(id.as_str(), "listing-42");
        assert_eq!(id.into_inner(), "listing-42");
    }

    #[test]
    fn test_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&VendorId::new("v1")).unwrap();
        assert_eq!(json, "\"v1\"");
    }

    #[test]
    fn test_id_deserializes_from_number() {
        let id: ProductId = serde_json::from_str("1234").unwrap();
        assert_eq!(id.as_str(), "1234");
    }

    #[test]
    fn test_id_rejects_objects() {
        assert!(serde_json::from_str::<UserId>("{}").is_err());
    }

    #[test]
    fn test_is_blank() {
        assert!(UserId::new("  ").is_blank());
        assert!(!UserId::new("u").is_blank());
    }
}
