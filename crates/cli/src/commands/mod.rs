//! Subcommand implementations.

pub mod cart;
pub mod follow;
pub mod wishlist;

use cartsync_core::ProductInput;

/// Product fields accepted on the command line.
#[derive(clap::Args)]
pub struct ProductArgs {
    /// Product id
    pub id: String,

    /// Display title
    #[arg(long)]
    pub title: Option<String>,

    /// Price, e.g. `12.50`
    #[arg(long)]
    pub price: Option<String>,

    /// Image URL
    #[arg(long)]
    pub image: Option<String>,

    /// Store display name
    #[arg(long)]
    pub vendor: Option<String>,

    /// Store id
    #[arg(long)]
    pub vendor_uid: Option<String>,
}

impl ProductArgs {
    /// Build the product payload the synchronizer expects.
    pub fn into_input(self) -> ProductInput {
        let optional = [
            ("title", self.title),
            ("price", self.price),
            ("imageUrl", self.image),
            ("vendor", self.vendor),
            ("vendorUid", self.vendor_uid),
        ];

        optional
            .into_iter()
            .filter_map(|(key, value)| value.map(|v| (key, v)))
            .fold(ProductInput::default().with("id", self.id), |input, (key, value)| {
                input.with(key, value)
            })
    }
}
