//! Configuration for slotcycle.
//!
//! Resolved from environment variables (a `.env` file is loaded by the
//! binary before resolution). Panel credentials are held as
//! [`SecretString`] so they never appear in debug output.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Configuration for the primary panel (form-encoded API).
#[derive(Debug, Clone)]
pub struct PrimaryPanelConfig {
    /// Base URL; operation paths (`info`, `add`, `kick`) are appended.
    pub base_url: String,
    /// Auth token sent with every request.
    pub token: SecretString,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl PrimaryPanelConfig {
    /// Build from environment variables.
    pub fn resolve() -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: require_env("SLOTCYCLE_PRIMARY_URL")?,
            token: SecretString::from(require_env("SLOTCYCLE_PRIMARY_TOKEN")?),
            timeout: Duration::from_secs(parse_optional_env(
                "SLOTCYCLE_PRIMARY_TIMEOUT_SECS",
                30,
            )?),
        })
    }
}

/// Configuration for the secondary panel (single JSON action endpoint).
#[derive(Debug, Clone)]
pub struct SecondaryPanelConfig {
    /// Full endpoint URL; the operation is selected by the `action` field.
    pub endpoint: String,
    /// Operator identity.
    pub username: String,
    /// Operator password.
    pub password: SecretString,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Wait before the single retry when `info` returns an empty slot
    /// array (observed panel caching quirk).
    pub empty_retry_delay: Duration,
}

impl SecondaryPanelConfig {
    /// Build from environment variables.
    pub fn resolve() -> Result<Self, ConfigError> {
        Ok(Self {
            endpoint: require_env("SLOTCYCLE_SECONDARY_URL")?,
            username: require_env("SLOTCYCLE_SECONDARY_USER")?,
            password: SecretString::from(require_env("SLOTCYCLE_SECONDARY_PASS")?),
            timeout: Duration::from_secs(parse_optional_env(
                "SLOTCYCLE_SECONDARY_TIMEOUT_SECS",
                60,
            )?),
            empty_retry_delay: Duration::from_secs(parse_optional_env(
                "SLOTCYCLE_SECONDARY_EMPTY_RETRY_SECS",
                2,
            )?),
        })
    }
}

/// Engine pacing and eligibility settings.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// A slot is only recycled when its remaining add credits equal this
    /// value exactly. The panels decrement the counter per add, and slots
    /// below the threshold are presumed about to lock; confirm intended
    /// semantics with the API owner before changing the default.
    pub required_add_credits: u32,
    /// Wait between a successful add and the paired kick, long enough for
    /// panel-side propagation before a kick is accepted.
    pub post_add_delay: Duration,
    /// Cool-down between consecutive slot attempts for one account.
    pub slot_cooldown: Duration,
}

impl EngineConfig {
    /// Build from environment variables, falling back to defaults.
    pub fn resolve() -> Result<Self, ConfigError> {
        Ok(Self {
            required_add_credits: parse_optional_env("SLOTCYCLE_REQUIRED_ADD_CREDITS", 2)?,
            post_add_delay: Duration::from_secs(parse_optional_env(
                "SLOTCYCLE_POST_ADD_DELAY_SECS",
                20,
            )?),
            slot_cooldown: Duration::from_secs(parse_optional_env(
                "SLOTCYCLE_SLOT_COOLDOWN_SECS",
                25,
            )?),
        })
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            required_add_credits: 2,
            post_add_delay: Duration::from_secs(20),
            slot_cooldown: Duration::from_secs(25),
        }
    }
}

/// Full engine configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub primary: PrimaryPanelConfig,
    pub secondary: SecondaryPanelConfig,
    pub engine: EngineConfig,
}

impl Config {
    /// Build from environment variables.
    pub fn resolve() -> Result<Self, ConfigError> {
        Ok(Self {
            primary: PrimaryPanelConfig::resolve()?,
            secondary: SecondaryPanelConfig::resolve()?,
            engine: EngineConfig::resolve()?,
        })
    }
}

// Helper functions

pub(crate) fn require_env(key: &str) -> Result<String, ConfigError> {
    optional_env(key)?.ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

pub(crate) fn optional_env(key: &str) -> Result<Option<String>, ConfigError> {
    match std::env::var(key) {
        Ok(val) if val.is_empty() => Ok(None),
        Ok(val) => Ok(Some(val)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(ConfigError::ParseError(format!(
            "failed to read {key}: {e}"
        ))),
    }
}

pub(crate) fn parse_optional_env<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    optional_env(key)?
        .map(|s| {
            s.parse().map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("{e}"),
            })
        })
        .transpose()
        .map(|opt| opt.unwrap_or(default))
}
