//! Configuration loading utilities

use crate::Config;
use dmbot_common::Result as DmBotResult;
use std::env;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info};

/// Environment variable naming an explicit configuration file
pub const CONFIG_PATH_ENV: &str = "DMBOT_CONFIG_PATH";

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error when reading configuration file
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    /// YAML parsing error
    #[error("Failed to parse YAML configuration: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// Configuration validation error
    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] validator::ValidationErrors),

    /// Environment variable parsing error
    #[error("Failed to parse environment variable '{var}': {source}")]
    EnvParseError {
        /// Variable name
        var: String,
        /// Parse failure
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl From<ConfigError> for dmbot_common::DmBotError {
    fn from(err: ConfigError) -> Self {
        Self::config_with_source("Failed to load configuration", err)
    }
}

fn parse_env<T>(var: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim().parse().map_err(|e| ConfigError::EnvParseError {
        var: var.to_string(),
        source: Box::new(e),
    })
}

/// Configuration loader for the application
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a YAML file with environment variable overrides
    pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config = Self::load_from_str(&content)?;
        info!(path = %path.as_ref().display(), "Loaded configuration file");
        Ok(config)
    }

    /// Parse YAML text, apply environment overrides and validate
    pub fn load_from_str(content: &str) -> Result<Config, ConfigError> {
        let mut config: Config = serde_yaml::from_str(content)?;
        Self::apply_env_overrides(&mut config)?;
        config.validate_all()?;
        Ok(config)
    }

    /// Resolve the configuration file the way the binary does.
    ///
    /// `DMBOT_CONFIG_PATH` wins, then `config.yaml`, then `config.yml`, then
    /// built-in defaults. Environment overrides apply in every case.
    pub fn load() -> DmBotResult<Config> {
        let config = if let Ok(config_path) = env::var(CONFIG_PATH_ENV) {
            Self::load_config(&config_path)?
        } else if Path::new("config.yaml").exists() {
            Self::load_config("config.yaml")?
        } else if Path::new("config.yml").exists() {
            Self::load_config("config.yml")?
        } else {
            debug!("No configuration file found, using defaults");
            Self::load_defaults()?
        };

        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> DmBotResult<Config> {
        Ok(Self::load_config(path)?)
    }

    /// Built-in defaults with environment overrides applied
    pub fn load_defaults() -> Result<Config, ConfigError> {
        let mut config = Config::default();
        Self::apply_env_overrides(&mut config)?;
        config.validate_all()?;
        Ok(config)
    }

    /// Apply environment variable overrides to configuration
    fn apply_env_overrides(config: &mut Config) -> Result<(), ConfigError> {
        if let Ok(key) = env::var("WEATHER_API_KEY") {
            let key = key.trim().to_string();
            config.providers.weather_api_key = (!key.is_empty()).then_some(key);
        }

        if let Ok(path) = env::var("DMBOT_DB_PATH") {
            config.database.path = path;
        }

        if let Ok(level) = env::var("LOG_LEVEL") {
            config.logging.level = level.trim().to_lowercase();
        }

        if let Ok(file) = env::var("LOG_FILE") {
            config.logging.file = Some(file);
        }

        if let Ok(raw) = env::var("MAX_MESSAGES_PER_MINUTE") {
            config.security.max_messages_per_minute = parse_env("MAX_MESSAGES_PER_MINUTE", &raw)?;
        }

        if let Ok(raw) = env::var("BLOCK_THRESHOLD") {
            config.security.block_threshold = parse_env("BLOCK_THRESHOLD", &raw)?;
        }

        Ok(())
    }
}
