//! Core types for cartsync.
//!
//! This module provides type-safe wrappers for the cart domain.

pub mod cart;
pub mod id;
pub mod lists;
pub mod price;
pub mod product;
pub mod quantity;

pub use cart::{CartItem, cart_count, cart_total, decode_items, normalize_items};
pub use id::*;
pub use lists::{FollowEntry, WishlistEntry};
pub use price::{DEFAULT_CURRENCY, coerce_number, parse_leading_number};
pub use product::{ProductError, ProductInput, ResolvedProduct};
pub use quantity::QuantityInput;
