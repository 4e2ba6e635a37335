//! Sign-in prompt contract for guarded actions.
//!
//! Adding to the cart, saving to the wishlist, and following a store all
//! require a signed-in buyer. When nobody is signed in the synchronizer hands
//! the action to a [`SignInPrompt`], which is expected to show a blocking
//! message and navigate to the sign-in page. The pending action is dropped;
//! it is not replayed after sign-in.

use std::fmt;

/// An action that requires a signed-in buyer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GuardedAction {
    AddToCart,
    AddToWishlist,
    FollowStore,
}

impl GuardedAction {
    /// Message shown to a signed-out buyer.
    #[must_use]
    pub const fn prompt_message(self) -> &'static str {
        match self {
            Self::AddToCart => "Please sign in to add items to cart",
            Self::AddToWishlist => "Please sign in to add items to wishlist",
            Self::FollowStore => "Please sign in to follow stores",
        }
    }
}

impl fmt::Display for GuardedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AddToCart => "add_to_cart",
            Self::AddToWishlist => "add_to_wishlist",
            Self::FollowStore => "follow_store",
        })
    }
}

/// Shows the sign-in prompt and redirects to the sign-in page.
pub trait SignInPrompt: Send + Sync {
    /// Called once per rejected action, before the operation returns.
    fn require_sign_in(&self, action: GuardedAction, sign_in_url: &str);
}

/// Prompt that only logs. Used when no UI layer is attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSignInPrompt;

impl SignInPrompt for TracingSignInPrompt {
    fn require_sign_in(&self, action: GuardedAction, sign_in_url: &str) {
        tracing::warn!(
            action = %action,
            sign_in_url,
            "{}",
            action.prompt_message()
        );
    }
}
