//! Pattern-based spam detection with a durable block

use crate::store::UserStore;
use dashmap::DashMap;
use dmbot_common::{Result, UserId};
use regex::Regex;
use std::sync::{Arc, LazyLock};
use tracing::{debug, warn};

/// Patterns tried in order; the first hit decides.
static SPAM_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)https?://",
        r"(?i)\.(?:com|net|org)",
        r"@\w+",
        // Case-sensitive: five uppercase letters in a row, Turkish ones included.
        r"\p{Lu}{5,}",
    ]
    .into_iter()
    .map(|pattern| Regex::new(pattern).expect("valid spam pattern"))
    .collect()
});

/// Whether `text` matches any spam pattern
pub fn looks_like_spam(text: &str) -> bool {
    SPAM_PATTERNS.iter().any(|pattern| pattern.is_match(text))
}

/// Counts flagged messages per identity and blocks past a threshold.
///
/// Counters live in memory and never decrease; the block itself is written
/// to the user store and survives restarts.
pub struct SpamDetector {
    users: Arc<dyn UserStore>,
    violations: DashMap<UserId, u32>,
    threshold: u32,
}

impl std::fmt::Debug for SpamDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpamDetector")
            .field("threshold", &self.threshold)
            .field("tracked", &self.violations.len())
            .finish_non_exhaustive()
    }
}

impl SpamDetector {
    /// Create a detector that blocks once the count exceeds `threshold`
    pub fn new(users: Arc<dyn UserStore>, threshold: u32) -> Self {
        Self {
            users,
            violations: DashMap::new(),
            threshold,
        }
    }

    /// Check one raw message.
    ///
    /// Returns `true` when the message is flagged. A flagged message adds one
    /// violation no matter how many patterns it hits; when the count then
    /// exceeds the threshold the identity is blocked.
    pub async fn inspect(&self, user_id: UserId, text: &str) -> Result<bool> {
        if !looks_like_spam(text) {
            return Ok(false);
        }

        let count = {
            let mut entry = self.violations.entry(user_id).or_insert(0);
            *entry = entry.saturating_add(1);
            *entry
        };
        debug!(user_id = %user_id, count, "Spam pattern matched");

        if count > self.threshold {
            self.users.set_blocked(user_id, true).await?;
            warn!(user_id = %user_id, count, "User blocked for spam");
        }
        Ok(true)
    }

    /// Violations recorded for the identity
    pub fn violations(&self, user_id: UserId) -> u32 {
        self.violations.get(&user_id).map_or(0, |count| *count)
    }

    /// Whether the identity carries the durable block
    pub async fn is_blocked(&self, user_id: UserId) -> Result<bool> {
        self.users.is_blocked(user_id).await
    }
}
