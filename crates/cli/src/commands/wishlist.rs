//! Wishlist commands.

use cartsync_client::CartSynchronizer;
use cartsync_core::ProductId;
use clap::Subcommand;

use super::ProductArgs;
use crate::terminal::{print_json, print_line};

#[derive(Subcommand)]
pub enum WishlistAction {
    /// Print saved products
    Show,
    /// Save a product (requires --user)
    Add {
        #[command(flatten)]
        product: ProductArgs,
    },
    /// Remove a saved product
    Remove {
        /// Product id
        id: String,
    },
}

/// Run a wishlist command.
///
/// # Errors
///
/// Returns error if the operation is rejected or output fails.
pub async fn run(
    cart: &CartSynchronizer,
    action: WishlistAction,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        WishlistAction::Show => print_json(&cart.get_wishlist().await)?,
        WishlistAction::Add { product } => {
            let added = cart
                .add_to_wishlist(&product.into_input())
                .await
                .map_err(|e| e.user_message())?;
            print_line(if added { "Saved" } else { "Already saved" });
        }
        WishlistAction::Remove { id } => {
            let removed = cart
                .remove_from_wishlist(&ProductId::new(id))
                .await
                .map_err(|e| e.user_message())?;
            print_line(if removed { "Removed" } else { "Not on wishlist" });
        }
    }
    Ok(())
}
