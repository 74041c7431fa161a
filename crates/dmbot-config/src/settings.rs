//! Application configuration structures

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use validator::{Validate, ValidationError, ValidationErrors};

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Config {
    /// Polling loop and reply delivery
    #[validate]
    pub bot: BotConfig,

    /// Rate limiting and spam blocking
    #[validate]
    pub security: SecurityConfig,

    /// Game bounds and session lifetimes
    #[validate]
    pub games: GamesConfig,

    /// Weather, news and exchange-rate sources
    #[validate]
    pub providers: ProvidersConfig,

    /// Persistent storage
    #[validate]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[validate]
    pub logging: LoggingConfig,
}

/// Polling loop configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct BotConfig {
    /// Display name used in the startup banner and `bot` command
    #[validate(length(min = 1, max = 64, message = "Bot name must be 1-64 characters"))]
    pub name: String,

    /// Lower bound of the random wait between inbox polls
    #[validate(range(min = 1, max = 3600, message = "Poll interval must be between 1 and 3600 seconds"))]
    pub poll_interval_min_secs: u64,

    /// Upper bound of the random wait between inbox polls
    #[validate(range(min = 1, max = 3600, message = "Poll interval must be between 1 and 3600 seconds"))]
    pub poll_interval_max_secs: u64,

    /// Longest single outbound message; longer replies are split
    #[validate(range(min = 16, max = 10000, message = "Max message length must be between 16 and 10000"))]
    pub max_message_length: usize,

    /// Consecutive transport failures tolerated before the loop gives up
    #[validate(range(min = 1, max = 100, message = "Max retry count must be between 1 and 100"))]
    pub max_retry_count: u32,

    /// Threads fetched per poll
    #[validate(range(min = 1, max = 100, message = "Thread fetch limit must be between 1 and 100"))]
    pub thread_fetch_limit: usize,

    /// Answered message ids kept before the set is reset
    #[validate(range(min = 10, message = "Answered cache limit must be at least 10"))]
    pub answered_cache_limit: usize,

    /// Interval of the session/rate-state cleanup task
    #[validate(range(min = 10, max = 86400, message = "Housekeeping interval must be between 10 and 86400 seconds"))]
    pub housekeeping_interval_secs: u64,

    /// Identities exempt from the rate limiter and spam detector
    pub admin_ids: Vec<u64>,
}

/// Rate limiting and spam blocking
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SecurityConfig {
    /// Messages admitted per identity inside one window
    #[validate(range(min = 1, max = 1000, message = "Max messages per minute must be between 1 and 1000"))]
    pub max_messages_per_minute: usize,

    /// Sliding window length
    #[validate(range(min = 1, max = 3600, message = "Rate window must be between 1 and 3600 seconds"))]
    pub rate_window_secs: u64,

    /// Spam violations tolerated; exceeding it blocks the identity
    #[validate(range(min = 1, message = "Block threshold must be at least 1"))]
    pub block_threshold: u32,
}

/// Game bounds and session lifetimes
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct GamesConfig {
    /// Inclusive lower bound of the number-guess target
    pub number_guess_min: i64,

    /// Inclusive upper bound of the number-guess target
    pub number_guess_max: i64,

    /// Guesses allowed before the game is lost
    #[validate(range(min = 1, max = 100, message = "Max attempts must be between 1 and 100"))]
    pub number_guess_max_attempts: u32,

    /// Number-guess session lifetime
    #[validate(range(min = 1, message = "Number guess TTL must be positive"))]
    pub number_guess_ttl_secs: u64,

    /// Quiz session lifetime
    #[validate(range(min = 1, message = "Quiz TTL must be positive"))]
    pub quiz_ttl_secs: u64,

    /// How long a weather prompt waits for a city name
    #[validate(range(min = 1, message = "City prompt TTL must be positive"))]
    pub city_prompt_ttl_secs: u64,
}

/// External content providers
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Disable all HTTP providers and answer with simulated data
    pub offline: bool,

    /// OpenWeatherMap API key; weather is simulated without it
    pub weather_api_key: Option<String>,

    /// Current-weather endpoint
    #[validate(custom(function = "crate::validation::validate_http_url", message = "Weather URL must be an http(s) URL"))]
    pub weather_url: String,

    /// Exchange-rate endpoint returning rates relative to TRY
    #[validate(custom(function = "crate::validation::validate_http_url", message = "Exchange URL must be an http(s) URL"))]
    pub exchange_url: String,

    /// RSS feeds polled by the `haber` command
    pub news_sources: Vec<String>,

    /// Per-request timeout
    #[validate(range(min = 1, max = 300, message = "Timeout must be between 1 and 300 seconds"))]
    pub timeout_seconds: u64,

    /// Retries after the first failed request
    #[validate(range(max = 10, message = "Max retries cannot exceed 10"))]
    pub max_retries: u32,

    /// Outbound requests per second across all providers
    #[validate(range(min = 1, max = 100, message = "Rate limit must be between 1 and 100 requests per second"))]
    pub rate_limit_per_sec: u32,

    /// How long fetched news and rates are reused
    #[validate(range(min = 1, max = 86400, message = "Cache TTL must be between 1 and 86400 seconds"))]
    pub cache_ttl_secs: u64,
}

/// Persistent storage
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Directory of the sled database
    #[validate(custom(function = "crate::validation::validate_file_path", message = "Database path contains invalid characters"))]
    pub path: String,

    /// Keep everything in memory; nothing survives a restart
    pub ephemeral: bool,

    /// Upper bound on a single storage call
    #[validate(range(min = 1, max = 60, message = "Operation timeout must be between 1 and 60 seconds"))]
    pub operation_timeout_seconds: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[validate(custom(function = "crate::validation::validate_log_level", message = "Log level must be one of: trace, debug, info, warn, error"))]
    pub level: String,

    /// Optional log file path
    #[validate(custom(function = "crate::validation::validate_file_path", message = "Log file path contains invalid characters"))]
    pub file: Option<String>,

    /// Multi-line colored output on the console
    pub colored: bool,

    /// One JSON object per event
    pub json: bool,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: "dmbot".to_string(),
            poll_interval_min_secs: 25,
            poll_interval_max_secs: 45,
            max_message_length: 2000,
            max_retry_count: 5,
            thread_fetch_limit: 20,
            answered_cache_limit: 1000,
            housekeeping_interval_secs: 600,
            admin_ids: Vec::new(),
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_messages_per_minute: 10,
            rate_window_secs: 60,
            block_threshold: 100,
        }
    }
}

impl Default for GamesConfig {
    fn default() -> Self {
        Self {
            number_guess_min: 1,
            number_guess_max: 100,
            number_guess_max_attempts: 10,
            number_guess_ttl_secs: 600,
            quiz_ttl_secs: 300,
            city_prompt_ttl_secs: 60,
        }
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            offline: false,
            weather_api_key: None,
            weather_url: "https://api.openweathermap.org/data/2.5/weather".to_string(),
            exchange_url: "https://api.exchangerate-api.com/v4/latest/TRY".to_string(),
            news_sources: vec!["https://www.trthaber.com/manset_articles.rss".to_string()],
            timeout_seconds: 10,
            max_retries: 2,
            rate_limit_per_sec: 5,
            cache_ttl_secs: 600,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "data/dmbot.db".to_string(),
            ephemeral: false,
            operation_timeout_seconds: 5,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            colored: true,
            json: false,
        }
    }
}

fn cross_field_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

impl Config {
    /// Field validation followed by the checks that span several fields
    pub fn validate_all(&self) -> Result<(), ValidationErrors> {
        self.validate()?;

        let mut errors = ValidationErrors::new();

        if self.bot.poll_interval_min_secs > self.bot.poll_interval_max_secs {
            errors.add(
                "poll_interval_min_secs",
                cross_field_error(
                    "poll_interval_order",
                    "Poll interval minimum must not exceed the maximum",
                ),
            );
        }

        if self.games.number_guess_min >= self.games.number_guess_max {
            errors.add(
                "number_guess_min",
                cross_field_error(
                    "number_guess_bounds",
                    "Number guess minimum must be below the maximum",
                ),
            );
        }

        for source in &self.providers.news_sources {
            if crate::validation::validate_http_url(source).is_err() {
                errors.add(
                    "news_sources",
                    cross_field_error("invalid_news_source", "News sources must be http(s) URLs"),
                );
                break;
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Whether the identity is listed in `bot.admin_ids`
    pub fn is_admin(&self, user_id: u64) -> bool {
        self.bot.admin_ids.contains(&user_id)
    }
}
