//! cartsync CLI - inspect and edit the cart, wishlist, and followed stores.
//!
//! # Usage
//!
//! ```bash
//! # Show the device cart (signed out)
//! cartsync cart show
//!
//! # Add two mugs as a signed-in buyer
//! cartsync --user u123 cart add mug-1 --title "Mug" --price 12.50 --quantity 2
//!
//! # Save to wishlist, follow a store
//! cartsync --user u123 wishlist add mug-1 --title "Mug"
//! cartsync --user u123 follow add vendor-9 --name "Clay Works"
//! ```
//!
//! # Commands
//!
//! - `cart` - `show`, `add`, `remove`, `update`, `clear`
//! - `wishlist` - `show`, `add`, `remove`
//! - `follow` - `show`, `add`, `remove`, `check`
//!
//! Configuration is read from the environment (see `cartsync_client::config`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use cartsync_client::{CartEvent, CartSynchronizer, ClientConfig, SessionTracker};
use cartsync_core::UserId;
use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tokio::sync::{broadcast, watch};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod terminal;

#[derive(Parser)]
#[command(name = "cartsync")]
#[command(author, version, about = "Local-first cart synchronizer")]
struct Cli {
    /// Act as this signed-in buyer (omit to stay signed out)
    #[arg(short, long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect or edit the cart
    Cart {
        #[command(subcommand)]
        action: commands::cart::CartAction,
    },
    /// Inspect or edit the wishlist
    Wishlist {
        #[command(subcommand)]
        action: commands::wishlist::WishlistAction,
    },
    /// Inspect or edit followed stores
    Follow {
        #[command(subcommand)]
        action: commands::follow::FollowAction,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load configuration from environment (needed for Sentry init)
    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            terminal::report_failure(&format!("Invalid configuration: {e}"));
            std::process::exit(2);
        }
    };

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "cartsync_client=info,cartsync_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    if let Err(e) = run(cli, config).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: ClientConfig) -> Result<(), Box<dyn std::error::Error>> {
    let cart = CartSynchronizer::builder(config)
        .indicator(Arc::new(terminal::TerminalBadge))
        .prompt(Arc::new(terminal::TerminalPrompt))
        .build();

    // The auth provider for a CLI session is the --user flag
    let (auth, auth_rx) = watch::channel(cli.user.map(UserId::new));
    let mut events = cart.subscribe();
    SessionTracker::new(cart.clone()).bind(auth_rx);
    wait_until_ready(&mut events).await?;

    match cli.command {
        Commands::Cart { action } => commands::cart::run(&cart, action).await?,
        Commands::Wishlist { action } => commands::wishlist::run(&cart, action).await?,
        Commands::Follow { action } => commands::follow::run(&cart, action).await?,
    }

    drop(auth);
    Ok(())
}

async fn wait_until_ready(
    events: &mut broadcast::Receiver<CartEvent>,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        match events.recv().await {
            Ok(CartEvent::CartReady { .. }) => return Ok(()),
            Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
            Err(broadcast::error::RecvError::Closed) => {
                return Err("cart closed before it became ready".into());
            }
        }
    }
}
