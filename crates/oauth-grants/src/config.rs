//! Configuration for the authorization and resource servers.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::error::ConfigError;
use crate::models::Registry;

/// Default values for server configuration.
pub mod defaults {
    use std::time::Duration;

    /// Access token lifetime (30 days).
    pub const TOKEN_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

    /// Longest accepted token lifetime (100 years).
    pub const MAX_TOKEN_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

    /// Interval between expired-token sweeps (5 minutes).
    pub const CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

    /// Per-request timeout applied at the HTTP boundary.
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    /// Authorization server port.
    pub const AUTH_SERVER_PORT: u16 = 9001;

    /// Resource server port.
    pub const RESOURCE_SERVER_PORT: u16 = 3002;

    /// Token store file shared by separately deployed servers.
    pub const STORE_FILE: &str = "database.jsonl";
}

/// Environment variable holding the token lifetime in seconds.
pub const ENV_TOKEN_TTL: &str = "OAUTH_TOKEN_TTL_SECS";

/// Environment variable holding the registry file path.
pub const ENV_REGISTRY_FILE: &str = "OAUTH_REGISTRY_FILE";

/// Process-wide configuration, fixed at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Lifetime of every issued token.
    pub token_ttl: Duration,

    /// Registered clients and resource owners.
    pub registry: Arc<Registry>,

    /// Background sweep interval; `None` relies on lazy expiry alone.
    pub cleanup_interval: Option<Duration>,

    /// Request timeout for the HTTP layer.
    pub request_timeout: Duration,
}

impl Config {
    #[must_use]
    pub fn new(registry: Registry, token_ttl: Duration) -> Self {
        Self {
            token_ttl,
            registry: Arc::new(registry),
            cleanup_interval: Some(defaults::CLEANUP_INTERVAL),
            request_timeout: defaults::REQUEST_TIMEOUT,
        }
    }

    /// Demo registry, the given TTL, and no background sweep.
    #[must_use]
    pub fn for_testing(token_ttl: Duration) -> Self {
        Self { cleanup_interval: None, ..Self::new(Registry::demo(), token_ttl) }
    }

    /// Create configuration from environment variables.
    ///
    /// Falls back to the demo registry and a 30 day TTL when unset.
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set to an unusable value or the
    /// registry file cannot be loaded.
    pub fn from_env() -> Result<Self, ConfigError> {
        let token_ttl = match std::env::var(ENV_TOKEN_TTL) {
            Ok(raw) => Some(parse_ttl(&raw)?),
            Err(_) => None,
        };
        let registry = std::env::var(ENV_REGISTRY_FILE).ok();

        Self::load(token_ttl, registry.as_deref().map(Path::new))
    }

    /// Build configuration from already-parsed settings.
    ///
    /// `None` selects the 30 day TTL or the demo registry.
    ///
    /// # Errors
    ///
    /// Returns error if the TTL is out of range or the registry file cannot
    /// be loaded.
    pub fn load(token_ttl: Option<Duration>, registry: Option<&Path>) -> Result<Self, ConfigError> {
        let token_ttl = match token_ttl {
            Some(ttl) if ttl.is_zero() || ttl > defaults::MAX_TOKEN_TTL => {
                return Err(ConfigError::InvalidEnv {
                    name: ENV_TOKEN_TTL,
                    value: ttl.as_secs().to_string(),
                });
            }
            Some(ttl) => ttl,
            None => defaults::TOKEN_TTL,
        };

        let registry = match registry {
            Some(path) => load_registry(path)?,
            None => Registry::demo(),
        };

        Ok(Self::new(registry, token_ttl))
    }

    /// Token lifetime as a `chrono` duration for timestamp arithmetic.
    #[must_use]
    pub fn token_ttl_chrono(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.token_ttl).unwrap_or(chrono::Duration::MAX)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Registry::demo(), defaults::TOKEN_TTL)
    }
}

/// Read a JSON registry file.
///
/// # Errors
///
/// Returns error if the file is unreadable, malformed, or has duplicate keys.
pub fn load_registry(path: &Path) -> Result<Registry, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    Registry::from_json(&raw)
}

/// Parse a positive TTL in whole seconds, at most [`defaults::MAX_TOKEN_TTL`].
///
/// # Errors
///
/// Returns [`ConfigError::InvalidEnv`] for non-numeric, zero or oversized values.
pub fn parse_ttl(raw: &str) -> Result<Duration, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 && secs <= defaults::MAX_TOKEN_TTL.as_secs() => {
            Ok(Duration::from_secs(secs))
        }
        _ => Err(ConfigError::InvalidEnv { name: ENV_TOKEN_TTL, value: raw.to_owned() }),
    }
}
