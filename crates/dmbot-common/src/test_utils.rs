//! Test utilities and shared fixtures for the dmbot workspace.

use chrono::{TimeZone, Utc};
use std::sync::Once;
use tracing_subscriber::{fmt, EnvFilter};

use crate::types::{Timestamp, UserId};

static INIT: Once = Once::new();

/// Initialize logging for tests. Safe to call from every test.
pub fn init_test_logging() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

        let _ = fmt().with_test_writer().with_env_filter(filter).try_init();
    });
}

/// Fixed UTC timestamp for clock-dependent tests.
pub fn mock_timestamp(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> Timestamp {
    Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
        .single()
        .expect("Invalid mock timestamp")
}

/// Create a temporary directory that is removed on drop.
pub fn create_temp_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("Failed to create temporary directory")
}

/// Identity fixtures.
pub mod identity_fixtures {
    use super::UserId;

    /// A single test identity.
    pub const fn test_user_id() -> UserId {
        UserId(1_001)
    }

    /// A second identity, distinct from [`test_user_id`].
    pub const fn other_user_id() -> UserId {
        UserId(2_002)
    }

    /// `count` distinct identities.
    pub fn test_user_ids(count: usize) -> Vec<UserId> {
        (0..count as u64).map(|i| UserId(10_000 + i)).collect()
    }
}

/// Configuration fixtures.
pub mod config_fixtures {
    /// A small but complete YAML configuration.
    pub const fn minimal_config_yaml() -> &'static str {
        r#"
bot:
  name: "test-bot"
  poll_interval_min_secs: 1
  poll_interval_max_secs: 2

security:
  max_messages_per_minute: 5
  block_threshold: 3

database:
  ephemeral: true

logging:
  level: "debug"
"#
    }
}
