//! Cart commands.

use cartsync_client::{CartSynchronizer, MutationOutcome, PersistMode};
use cartsync_core::{ProductId, QuantityInput};
use clap::Subcommand;
use serde_json::json;

use super::ProductArgs;
use crate::terminal::{print_json, print_line};

#[derive(Subcommand)]
pub enum CartAction {
    /// Print cart lines, count, and total
    Show,
    /// Add a product (requires --user)
    Add {
        #[command(flatten)]
        product: ProductArgs,

        /// Quantity to add; invalid or below one counts as one
        #[arg(short, long, default_value = "1")]
        quantity: String,
    },
    /// Remove a line
    Remove {
        /// Product id
        id: String,
    },
    /// Set a line's quantity; zero or below removes it
    Update {
        /// Product id
        id: String,

        /// New quantity
        #[arg(allow_hyphen_values = true)]
        quantity: String,
    },
    /// Remove every line
    Clear,
}

/// Run a cart command.
///
/// # Errors
///
/// Returns error if the operation is rejected or output fails.
pub async fn run(
    cart: &CartSynchronizer,
    action: CartAction,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        CartAction::Show => show(cart)?,
        CartAction::Add { product, quantity } => {
            let mode = cart
                .add_to_cart(&product.into_input(), QuantityInput::parse(&quantity))
                .await
                .map_err(|e| e.user_message())?;
            print_line(&format!("Added ({})", describe(mode)));
        }
        CartAction::Remove { id } => {
            let outcome = cart.remove_from_cart(&ProductId::new(id)).await;
            print_line(&describe_outcome(outcome));
        }
        CartAction::Update { id, quantity } => {
            let outcome = cart
                .update_quantity(&ProductId::new(id), QuantityInput::parse(&quantity))
                .await;
            print_line(&describe_outcome(outcome));
        }
        CartAction::Clear => {
            let mode = cart.clear_cart().await;
            print_line(&format!("Cleared ({})", describe(mode)));
        }
    }
    Ok(())
}

fn show(cart: &CartSynchronizer) -> Result<(), serde_json::Error> {
    print_json(&json!({
        "items": cart.cart_items(),
        "count": cart.cart_count(),
        "total": cart.cart_total().to_string(),
        "lastSavedAt": cart.last_saved_at(),
    }))
}

const fn describe(mode: PersistMode) -> &'static str {
    match mode {
        PersistMode::Remote => "synced",
        PersistMode::LocalOnly => "saved on this device only",
    }
}

fn describe_outcome(outcome: MutationOutcome) -> String {
    match outcome {
        MutationOutcome::Unchanged => "No matching item".to_string(),
        MutationOutcome::Committed(mode) => format!("Updated ({})", describe(mode)),
    }
}
