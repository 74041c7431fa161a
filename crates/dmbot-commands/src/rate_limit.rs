//! Sliding-window rate limiting per identity

use chrono::Duration;
use dashmap::DashMap;
use dmbot_common::{Timestamp, UserId};
use dmbot_config::SecurityConfig;
use std::collections::VecDeque;
use tracing::debug;

/// Admits at most `limit` messages per identity inside any `window`.
///
/// State lives in memory only and starts empty after a restart.
#[derive(Debug)]
pub struct RateLimiter {
    windows: DashMap<UserId, VecDeque<Timestamp>>,
    limit: usize,
    window: Duration,
}

impl RateLimiter {
    /// Create a limiter admitting `limit` messages per `window`
    pub fn new(limit: usize, window: std::time::Duration) -> Self {
        Self {
            windows: DashMap::new(),
            limit,
            window: Duration::from_std(window).unwrap_or_else(|_| Duration::seconds(60)),
        }
    }

    /// Create a limiter from the `security` configuration section
    pub fn from_config(config: &SecurityConfig) -> Self {
        Self::new(
            config.max_messages_per_minute,
            std::time::Duration::from_secs(config.rate_window_secs),
        )
    }

    fn prune(timestamps: &mut VecDeque<Timestamp>, now: Timestamp, window: Duration) {
        while timestamps
            .front()
            .is_some_and(|oldest| now - *oldest >= window)
        {
            timestamps.pop_front();
        }
    }

    /// Check and record one message.
    ///
    /// Prune, compare and append happen under the entry's shard lock, so two
    /// concurrent calls for one identity cannot both take the last slot. A
    /// rejected message is not recorded.
    pub fn admit(&self, identity: UserId, now: Timestamp) -> bool {
        let mut entry = self.windows.entry(identity).or_default();
        let timestamps = entry.value_mut();
        Self::prune(timestamps, now, self.window);

        if timestamps.len() >= self.limit {
            debug!(user_id = %identity, count = timestamps.len(), "Rate limit exceeded");
            return false;
        }

        timestamps.push_back(now);
        true
    }

    /// Messages counted against the identity at `now`
    pub fn recent_count(&self, identity: UserId, now: Timestamp) -> usize {
        self.windows.get(&identity).map_or(0, |entry| {
            entry
                .value()
                .iter()
                .filter(|ts| now - **ts < self.window)
                .count()
        })
    }

    /// Drop identities whose whole window has slid past. Returns how many.
    pub fn prune_idle(&self, now: Timestamp) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, timestamps| {
            Self::prune(timestamps, now, self.window);
            !timestamps.is_empty()
        });
        let removed = before.saturating_sub(self.windows.len());
        if removed > 0 {
            debug!("Pruned {} idle rate-limit entries", removed);
        }
        removed
    }

    /// Identities currently tracked
    pub fn tracked_identities(&self) -> usize {
        self.windows.len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::from_config(&SecurityConfig::default())
    }
}
