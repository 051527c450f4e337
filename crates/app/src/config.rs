//! Storefront configuration.
//!
//! Loaded from environment variables prefixed `STOREFRONT`, with `__`
//! separating nested keys. A `.env` file is read first when present.
//!
//! - `STOREFRONT__LOG__FILTER=debug` -> `log.filter = "debug"`
//! - `STOREFRONT__STORAGE__PATH=/var/lib/storefront/state.json`
//! - `STOREFRONT__WHEEL__REVEAL_DELAY_MS=1500`
//!
//! Every section has defaults, so an empty environment yields a working
//! in-memory configuration.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use storefront_observability::LogSettings;
use storefront_rewards::{DEFAULT_REVEAL_DELAY, NotificationSettings};

pub const ENV_PREFIX: &str = "STOREFRONT";

/// Upper bound for the reveal delay.
pub const MAX_REVEAL_DELAY_MS: u64 = 60_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration loading failed: {0}")]
    Load(#[from] config::ConfigError),

    #[error("configuration invalid: {0}")]
    Invalid(#[from] ValidationError),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("log filter cannot be empty")]
    EmptyLogFilter,

    #[error("storage path cannot be empty")]
    EmptyStoragePath,

    #[error("reveal delay must not exceed {MAX_REVEAL_DELAY_MS} ms")]
    RevealDelayTooLong,

    #[error("notification subject cannot be empty")]
    EmptySubject,

    #[error("invalid support email address")]
    InvalidSupportEmail,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StorefrontConfig {
    #[serde(default)]
    pub log: LogSettings,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub wheel: WheelConfig,

    #[serde(default)]
    pub notification: NotificationConfig,
}

/// Where shopper state lives. No path keeps everything in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WheelConfig {
    pub reveal_delay_ms: u64,
}

impl Default for WheelConfig {
    fn default() -> Self {
        Self {
            reveal_delay_ms: DEFAULT_REVEAL_DELAY.as_millis() as u64,
        }
    }
}

impl WheelConfig {
    pub fn reveal_delay(&self) -> Duration {
        Duration::from_millis(self.reveal_delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub subject: String,
    pub support_email: String,
    pub signature: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        let defaults = NotificationSettings::default();
        Self {
            subject: defaults.subject,
            support_email: defaults.support_email,
            signature: defaults.signature,
        }
    }
}

impl From<&NotificationConfig> for NotificationSettings {
    fn from(config: &NotificationConfig) -> Self {
        NotificationSettings {
            subject: config.subject.clone(),
            support_email: config.support_email.clone(),
            signature: config.signature.clone(),
        }
    }
}

impl StorefrontConfig {
    /// Load from `.env` (if present) and the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_environment(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
    }

    /// Load from an explicit variable map instead of the process environment.
    pub fn load_from(vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::from_environment(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .source(Some(vars)),
        )
    }

    fn from_environment(env: config::Environment) -> Result<Self, ConfigError> {
        let config = config::Config::builder()
            .add_source(env)
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.log.filter.trim().is_empty() {
            return Err(ValidationError::EmptyLogFilter);
        }
        if self
            .storage
            .path
            .as_ref()
            .is_some_and(|p| p.as_os_str().is_empty())
        {
            return Err(ValidationError::EmptyStoragePath);
        }
        if self.wheel.reveal_delay_ms > MAX_REVEAL_DELAY_MS {
            return Err(ValidationError::RevealDelayTooLong);
        }
        if self.notification.subject.trim().is_empty() {
            return Err(ValidationError::EmptySubject);
        }
        let email = self.notification.support_email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(ValidationError::InvalidSupportEmail);
        }
        Ok(())
    }
}
