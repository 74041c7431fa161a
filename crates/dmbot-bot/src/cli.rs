//! Command line interface

use clap::Parser;
use dmbot_common::LoggingConfig;
use dmbot_config::Config;
use std::path::PathBuf;

/// Turkish direct-message bot with keyword commands and mini games
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file path (defaults to DMBOT_CONFIG_PATH, then ./config.yaml)
    #[arg(short, long, env = "DMBOT_CONFIG_PATH")]
    pub config: Option<PathBuf>,

    /// Keep all state in memory; nothing is written to disk
    #[arg(long)]
    pub ephemeral: bool,

    /// Never call external weather, news or exchange-rate services
    #[arg(long)]
    pub offline: bool,

    /// Log level or filter directive, overriding the config file
    #[arg(short, long)]
    pub log_level: Option<String>,
}

impl Args {
    /// Fold the flags into a loaded configuration
    pub fn apply(&self, config: &mut Config) {
        if self.ephemeral {
            config.database.ephemeral = true;
        }
        if self.offline {
            config.providers.offline = true;
        }
        if let Some(level) = &self.log_level {
            config.logging.level.clone_from(level);
        }
    }
}

/// Subscriber settings for the `logging` config section
pub fn logging_config(config: &Config) -> LoggingConfig {
    LoggingConfig {
        level: config.logging.level.clone(),
        json_format: config.logging.json,
        pretty_format: config.logging.colored,
        file_path: config.logging.file.clone(),
        ..LoggingConfig::default()
    }
}

/// Startup banner
pub fn banner(config: &Config) -> String {
    let storage = if config.database.ephemeral {
        "bellek (geçici)".to_string()
    } else {
        config.database.path.clone()
    };
    let providers = if config.providers.offline {
        "çevrimdışı"
    } else {
        "çevrimiçi"
    };

    format!(
        "🤖 {} v{}\n💾 Depolama: {storage}\n🌐 Veri kaynakları: {providers}\nÇıkmak için Ctrl+C veya Ctrl+D.",
        config.bot.name,
        env!("CARGO_PKG_VERSION")
    )
}
