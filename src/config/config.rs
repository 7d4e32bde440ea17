use std::path::Path;

use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};

use super::logging::LoggingConfig;
use super::refresh::{RefreshSettings, MAX_REFRESH_INTERVAL_SECS};
use super::storage::{StorageBackend, StorageConfig};
use crate::error::AuthKitError;

/// A top-level enum for versioned configurations.
#[derive(Deserialize, Serialize, JsonSchema)]
#[serde(tag = "version")]
pub enum Config {
    #[serde(rename = "1.0.0")]
    ConfigV1(ConfigV1),
}

/// Main config for v1.0.0: storage backend, refresh settings, logging.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, JsonSchema)]
pub struct ConfigV1 {
    /// Emit debug-level traces from the token store.
    #[serde(default)]
    pub debug: bool,
    pub storage: StorageConfig,
    /// Present when the session uses refresh tokens.
    #[serde(default)]
    pub refresh: Option<RefreshSettings>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ConfigV1 {
    /// Parse a configuration from an in-memory YAML document and validate it.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, AuthKitError> {
        extract(Figment::new().merge(Yaml::string(yaml)))
    }

    /// Whether the store should run in refresh-token mode.
    pub fn uses_refresh_token(&self) -> bool {
        self.refresh.is_some()
    }

    /// Rejects parameter combinations that are programmer errors.
    pub fn validate(&self) -> Result<(), AuthKitError> {
        if self.storage.prefix.trim().is_empty() {
            return Err(AuthKitError::Config(
                "storage.prefix must not be empty".into(),
            ));
        }

        if let StorageBackend::Cookie(cookie) = &self.storage.backend {
            if cookie.domain.trim().is_empty() {
                return Err(AuthKitError::Config(
                    "storage type 'cookie' requires 'domain' to be set".into(),
                ));
            }
        }

        if let Some(refresh) = &self.refresh {
            if refresh.interval_secs <= 0 || refresh.interval_secs > MAX_REFRESH_INTERVAL_SECS {
                return Err(AuthKitError::Config(format!(
                    "refresh.interval_secs must be between 1 and {}, got {}",
                    MAX_REFRESH_INTERVAL_SECS, refresh.interval_secs
                )));
            }
        }

        Ok(())
    }
}

/// Load config from a YAML file, with `AUTHKIT_`-prefixed environment
/// variables layered on top (`AUTHKIT_STORAGE__PREFIX=...`).
pub fn load_config(path: impl AsRef<Path>) -> Result<ConfigV1, AuthKitError> {
    let figment = Figment::new()
        .merge(Yaml::file(path.as_ref()))
        .merge(Env::prefixed("AUTHKIT_").split("__"));
    extract(figment)
}

fn extract(figment: Figment) -> Result<ConfigV1, AuthKitError> {
    let config = figment
        .extract::<Config>()
        .map_err(|e| AuthKitError::Config(format!("Error loading configuration: {}", e)))?;

    // handle configuration migration between versions here when necessary
    let config = match config {
        Config::ConfigV1(c) => c,
    };
    config.validate()?;
    Ok(config)
}

/// The JSON schema of the configuration file, pretty-printed.
pub fn config_schema() -> String {
    let schema = schema_for!(Config);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}
