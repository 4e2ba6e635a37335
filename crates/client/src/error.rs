//! Unified error handling with Sentry integration.
//!
//! Operation-level failures are reported through [`CartError`]. Remote write
//! failures on cart mutations are *not* errors: the local cache already holds
//! the new state, so the mutation reports [`PersistMode::LocalOnly`] instead.

use cartsync_core::ProductError;
use thiserror::Error;

use crate::remote::RemoteError;
use crate::ui::GuardedAction;

/// Errors surfaced to callers of cart, wishlist, and following operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The action needs a signed-in buyer; the sign-in prompt has been shown.
    #[error("Sign-in required: {}", .0.prompt_message())]
    AuthRequired(GuardedAction),

    /// The product payload failed validation.
    #[error("Invalid product: {0}")]
    InvalidProduct(#[from] ProductError),

    /// No remote document store is configured for this session.
    #[error("Remote store unavailable")]
    RemoteUnavailable,

    /// The remote document store rejected or failed the operation.
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    /// The store to follow has an empty id.
    #[error("Store id is empty")]
    MissingStoreId,

    /// The list already holds the configured maximum number of entries.
    #[error("List is full ({max} entries)")]
    ListFull { max: usize },
}

impl CartError {
    /// Message suitable for showing to the buyer.
    ///
    /// Internal details of remote failures are not exposed.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::AuthRequired(action) => action.prompt_message().to_string(),
            Self::InvalidProduct(ProductError::MissingId) => {
                "This product is missing an ID and can't be added yet.".to_string()
            }
            Self::InvalidProduct(ProductError::NotAnObject) => {
                "This product can't be added right now.".to_string()
            }
            Self::MissingStoreId => "This store can't be followed right now.".to_string(),
            Self::RemoteUnavailable | Self::Remote(_) => {
                "We couldn't reach your account right now. Please try again.".to_string()
            }
            Self::ListFull { max } => format!("You can save up to {max} items."),
        }
    }
}

/// Where a committed mutation ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistMode {
    /// Written to the local cache and the remote document.
    Remote,
    /// Written to the local cache only (signed out, no remote store, or the
    /// remote write failed).
    LocalOnly,
}

/// Result of a mutation that may turn out to be a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    /// Nothing matched; no state changed and nothing was written.
    Unchanged,
    /// State changed and was committed.
    Committed(PersistMode),
}

impl MutationOutcome {
    /// Returns `true` if the mutation changed state.
    #[must_use]
    pub const fn is_committed(self) -> bool {
        matches!(self, Self::Committed(_))
    }

    /// Where the change was persisted, if anything changed.
    #[must_use]
    pub const fn persist_mode(self) -> Option<PersistMode> {
        match self {
            Self::Unchanged => None,
            Self::Committed(mode) => Some(mode),
        }
    }
}

/// Capture a remote failure in Sentry.
///
/// Without an initialized Sentry client this is a no-op.
pub fn capture_remote_error(err: &RemoteError) {
    let event_id = sentry::capture_error(err);
    tracing::debug!(sentry_event_id = %event_id, "Captured remote error");
}

/// Set the Sentry user context from a user ID.
///
/// Call this after sign-in to associate errors with the buyer.
pub fn set_sentry_user(user_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on sign-out to stop associating errors with the buyer.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for cart actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added item", Some(&[("product_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_error_display() {
        let err = CartError::InvalidProduct(ProductError::MissingId);
        assert_eq!(
            err.to_string(),
            "Invalid product: product is missing an id (expected one of: id, listingId, docId)"
        );

        let err = CartError::ListFull { max: 3 };
        assert_eq!(err.to_string(), "List is full (3 entries)");
    }

    #[test]
    fn test_user_messages_hide_remote_details() {
        let err = CartError::Remote(RemoteError::Unavailable("socket closed".to_string()));
        assert!(!err.user_message().contains("socket"));
    }

    #[test]
    fn test_auth_required_message() {
        let err = CartError::AuthRequired(GuardedAction::AddToWishlist);
        assert_eq!(err.user_message(), "Please sign in to add items to wishlist");
    }

    #[test]
    fn test_mutation_outcome() {
        assert!(MutationOutcome::Committed(PersistMode::LocalOnly).is_committed());
        assert!(!MutationOutcome::Unchanged.is_committed());
        assert_eq!(
            MutationOutcome::Committed(PersistMode::Remote).persist_mode(),
            Some(PersistMode::Remote)
        );
        assert_eq!(MutationOutcome::Unchanged.persist_mode(), None);
    }
}
