//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `CARTSYNC_REMOTE_URL` - Base URL of the remote document store. When unset
//!   the client runs in local-only mode.
//! - `CARTSYNC_REMOTE_API_KEY` - Bearer token for the remote document store
//! - `CARTSYNC_CACHE_DIR` - Directory for the local cart cache (default: `.cartsync`)
//! - `CARTSYNC_CACHE_SCOPE` - `device` (one cart per device) or `user` (one per
//!   signed-in user) (default: `device`)
//! - `CARTSYNC_MAX_LIST_ENTRIES` - Maximum wishlist/following length (default: 500)
//! - `CARTSYNC_SIGN_IN_URL` - Where guarded actions send signed-out buyers
//!   (default: `login.html`)
//! - `CARTSYNC_EVENT_CAPACITY` - Notification buffer per subscriber (default: 64)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::path::PathBuf;
use std::str::FromStr;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const MIN_API_KEY_LENGTH: usize = 16;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "insert",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// How the local cart cache is keyed.
///
/// `Device` keeps a single cart per device regardless of who is signed in:
/// switching accounts briefly shows the previous account's cart until the
/// remote document replaces it. `User` namespaces the cache key with the
/// signed-in user's id; signed-out buyers share the device key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheScope {
    #[default]
    Device,
    User,
}

impl FromStr for CacheScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "device" => Ok(Self::Device),
            "user" => Ok(Self::User),
            other => Err(format!("expected 'device' or 'user', got '{other}'")),
        }
    }
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Remote document store; `None` means local-only mode
    pub remote: Option<RemoteConfig>,
    /// Directory holding the file-backed local cache
    pub cache_dir: PathBuf,
    /// Local cache keying
    pub cache_scope: CacheScope,
    /// Upper bound on wishlist and following lengths
    pub max_list_entries: usize,
    /// Sign-in entry point for guarded actions
    pub sign_in_url: String,
    /// Notification buffer per subscriber
    pub event_capacity: usize,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// Remote document store configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct RemoteConfig {
    /// Base URL of the document store API
    pub base_url: Url,
    /// Bearer token sent with every request
    pub api_key: Option<SecretString>,
}

impl std::fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            remote: None,
            cache_dir: PathBuf::from(".cartsync"),
            cache_scope: CacheScope::Device,
            max_list_entries: 500,
            sign_in_url: "login.html".to_string(),
            event_capacity: 64,
            sentry_dsn: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but invalid, or if the API
    /// key looks like a placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// See [`ClientConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let remote = match lookup("CARTSYNC_REMOTE_URL").filter(|v| !v.trim().is_empty()) {
            Some(raw) => {
                let base_url = Url::parse(raw.trim()).map_err(|e| {
                    ConfigError::InvalidEnvVar("CARTSYNC_REMOTE_URL".to_string(), e.to_string())
                })?;
                let api_key = lookup("CARTSYNC_REMOTE_API_KEY")
                    .map(|key| validate_api_key(key, "CARTSYNC_REMOTE_API_KEY"))
                    .transpose()?;
                Some(RemoteConfig { base_url, api_key })
            }
            None => None,
        };

        let cache_dir = lookup("CARTSYNC_CACHE_DIR").map_or(defaults.cache_dir, PathBuf::from);
        let cache_scope = parse_or(&lookup, "CARTSYNC_CACHE_SCOPE", defaults.cache_scope)?;
        let max_list_entries =
            parse_or(&lookup, "CARTSYNC_MAX_LIST_ENTRIES", defaults.max_list_entries)?;
        let sign_in_url = lookup("CARTSYNC_SIGN_IN_URL").unwrap_or(defaults.sign_in_url);
        let event_capacity = parse_or(&lookup, "CARTSYNC_EVENT_CAPACITY", defaults.event_capacity)?;
        let sentry_dsn = lookup("SENTRY_DSN");

        if event_capacity == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "CARTSYNC_EVENT_CAPACITY".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            remote,
            cache_dir,
            cache_scope,
            max_list_entries,
            sign_in_url,
            event_capacity,
            sentry_dsn,
        })
    }

    /// Returns `true` when no remote document store is configured.
    #[must_use]
    pub const fn is_local_only(&self) -> bool {
        self.remote.is_none()
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse an optional variable, falling back to `default` when unset.
fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}

/// Validate that an API key is not a placeholder and is long enough.
fn validate_api_key(key: String, var_name: &str) -> Result<SecretString, ConfigError> {
    let secret = SecretString::from(key);
    let value = secret.expose_secret();
    let lower = value.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    if value.len() < MIN_API_KEY_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_API_KEY_LENGTH,
                value.len()
            ),
        ));
    }

    Ok(secret)
}
