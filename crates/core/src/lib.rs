//! cartsync core - Shared types library.
//!
//! This crate provides the domain types used across all cartsync components:
//! - `client` - Local-first cart synchronizer (local cache + remote documents)
//! - `cli` - Command-line driver for the synchronizer
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no
//! network clients, no persistence. This keeps it lightweight and allows it
//! to be used anywhere, including in tests that fake every collaborator.
//!
//! # Modules
//!
//! - [`types`] - String-backed IDs, price coercion, cart items, wishlist and
//!   follow entries, and the product input contract

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
