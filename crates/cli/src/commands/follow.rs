//! Followed-store commands.

use cartsync_client::CartSynchronizer;
use cartsync_core::VendorId;
use clap::Subcommand;

use crate::terminal::{print_json, print_line};

#[derive(Subcommand)]
pub enum FollowAction {
    /// Print followed stores
    Show,
    /// Follow a store (requires --user)
    Add {
        /// Store id
        vendor_uid: String,

        /// Store display name
        #[arg(long)]
        name: Option<String>,
    },
    /// Stop following a store
    Remove {
        /// Store id
        vendor_uid: String,
    },
    /// Exit with status 0 if the store is followed, 3 otherwise
    Check {
        /// Store id
        vendor_uid: String,
    },
}

/// Run a following command.
///
/// # Errors
///
/// Returns error if the operation is rejected or output fails.
pub async fn run(
    cart: &CartSynchronizer,
    action: FollowAction,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        FollowAction::Show => print_json(&cart.get_followed_stores().await)?,
        FollowAction::Add { vendor_uid, name } => {
            let added = cart
                .follow_store(&VendorId::new(vendor_uid), name.as_deref())
                .await
                .map_err(|e| e.user_message())?;
            print_line(if added { "Following" } else { "Already following" });
        }
        FollowAction::Remove { vendor_uid } => {
            let removed = cart
                .unfollow_store(&VendorId::new(vendor_uid))
                .await
                .map_err(|e| e.user_message())?;
            print_line(if removed { "Unfollowed" } else { "Not following" });
        }
        FollowAction::Check { vendor_uid } => {
            let following = cart.is_following_store(&VendorId::new(vendor_uid)).await;
            print_line(if following { "Following" } else { "Not following" });
            if !following {
                std::process::exit(3);
            }
        }
    }
    Ok(())
}
