//! Warehouse connection configuration
//!
//! Settings come from a JSON config file (`config/snowflake.json` by default)
//! with `SNOWFLAKE_*` environment variables taking precedence, e.g.
//! `SNOWFLAKE_ACCOUNT` overrides the file's `account` key.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Schema used when neither the config file, the environment, nor the CLI
/// names one.
pub const DEFAULT_SCHEMA: &str = "sec_raw";

/// Connection settings for the Snowflake warehouse.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct WarehouseConfig {
    #[serde(default)]
    pub account: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub warehouse: String,
    #[serde(default)]
    pub database: String,
    #[serde(default = "default_schema")]
    pub schema: String,
    #[serde(default)]
    pub role: Option<String>,
}

fn default_schema() -> String {
    DEFAULT_SCHEMA.to_string()
}

impl WarehouseConfig {
    /// Load configuration from a JSON file merged with environment variables.
    ///
    /// Environment variables override file values. When `path` is `None` the
    /// default `config/snowflake.json` is used and may be absent (environment
    /// variables alone are then sufficient); an explicitly passed path must
    /// exist.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read/parsed, or if any
    /// required key is missing after merging (the message names every missing
    /// key).
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (file, required) = match path {
            Some(p) => (File::from(p), true),
            None => (File::with_name("config/snowflake.json"), false),
        };

        let settings = Config::builder()
            .add_source(file.required(required))
            .add_source(Environment::with_prefix("SNOWFLAKE"))
            .build()?;

        let config: WarehouseConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every required connection parameter is present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Message` naming each missing key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("account", &self.account),
            ("user", &self.user),
            ("password", &self.password),
            ("warehouse", &self.warehouse),
            ("database", &self.database),
        ];

        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.is_empty())
            .map(|(key, _)| *key)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Message(format!(
                "Missing required configuration: {}. \
                 Set via SNOWFLAKE_* environment variables or the config file.",
                missing.join(", ")
            )))
        }
    }
}
