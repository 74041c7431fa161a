//! Configuration management for dmbot

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod loader;
pub mod settings;
pub mod validation;

pub use loader::{ConfigError, ConfigLoader};
pub use settings::{
    BotConfig, Config, DatabaseConfig, GamesConfig, LoggingConfig, ProvidersConfig,
    SecurityConfig,
};
