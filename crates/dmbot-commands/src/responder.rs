//! Per-message pipeline: block check, gates, dispatch, logging

use crate::dispatcher::Dispatcher;
use crate::games::GameEngine;
use crate::handlers::BotStats;
use crate::providers::DataProvider;
use crate::rate_limit::RateLimiter;
use crate::session::SessionStore;
use crate::spam::SpamDetector;
use crate::store::{MessageLogEntry, SessionBackend, StatField, TimeoutStore, UserStore};
use chrono::Utc;
use dashmap::DashMap;
use dmbot_common::{normalize_text, InboundMessage, Result, Timestamp, UserId};
use dmbot_config::Config;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, instrument, warn};

/// Why a message was stopped before dispatch. `Display` is the user-facing
/// reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GateRejection {
    /// Too many messages in the rate window
    #[error("⏳ Çok hızlı mesaj gönderiyorsun. Lütfen 1 dakika bekleyin.")]
    RateLimited,
    /// The message matched a spam pattern
    #[error("🚫 Spam tespit edildi. Mesaj gönderimi engellendi.")]
    SpamFlagged,
}

/// Serializes work per identity.
#[derive(Debug, Default)]
pub struct IdentityLocks {
    locks: DashMap<UserId, Arc<Mutex<()>>>,
}

impl IdentityLocks {
    /// Wait for exclusive access to `user_id`
    pub async fn acquire(&self, user_id: UserId) -> OwnedMutexGuard<()> {
        let lock = self.locks.entry(user_id).or_default().clone();
        lock.lock_owned().await
    }

    /// Drop locks nobody holds or waits on. Returns how many.
    pub fn prune(&self) -> usize {
        let before = self.locks.len();
        self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        before.saturating_sub(self.locks.len())
    }

    /// Identities with a lock entry
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Whether no lock entries exist
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Turns inbound messages into replies
pub struct Responder {
    users: Arc<dyn UserStore>,
    sessions: SessionStore,
    rate_limiter: RateLimiter,
    spam: SpamDetector,
    dispatcher: Dispatcher,
    locks: IdentityLocks,
    stats: Arc<BotStats>,
    admin_ids: Vec<u64>,
}

impl std::fmt::Debug for Responder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Responder")
            .field("rate_limiter", &self.rate_limiter)
            .field("spam", &self.spam)
            .field("locks", &self.locks.len())
            .finish_non_exhaustive()
    }
}

impl Responder {
    /// Build the pipeline over one store that holds users and sessions.
    ///
    /// Every storage call is bounded by `database.operation_timeout_seconds`.
    pub fn new<S>(config: &Config, store: Arc<S>, provider: Arc<dyn DataProvider>) -> Self
    where
        S: UserStore + SessionBackend + 'static,
    {
        let bounded = Arc::new(TimeoutStore::new(
            store,
            Duration::from_secs(config.database.operation_timeout_seconds),
        ));
        let users: Arc<dyn UserStore> = bounded.clone();
        let sessions = SessionStore::new(bounded);
        let stats = Arc::new(BotStats::default());

        let games = GameEngine::new(sessions.clone(), users.clone(), config.games.clone());
        let dispatcher = Dispatcher::new(
            sessions.clone(),
            users.clone(),
            games,
            provider,
            stats.clone(),
            Duration::from_secs(config.games.city_prompt_ttl_secs),
        );

        Self {
            rate_limiter: RateLimiter::from_config(&config.security),
            spam: SpamDetector::new(users.clone(), config.security.block_threshold),
            users,
            sessions,
            dispatcher,
            locks: IdentityLocks::default(),
            stats,
            admin_ids: config.bot.admin_ids.clone(),
        }
    }

    /// Process-wide counters
    pub fn stats(&self) -> &BotStats {
        &self.stats
    }

    /// Reply to one message, or `None` when nothing should be sent.
    ///
    /// Storage failures are logged and drop the turn.
    #[instrument(skip(self, message), fields(user_id = %message.user_id, message_id = %message.message_id))]
    pub async fn handle(&self, message: &InboundMessage) -> Option<String> {
        let _guard = self.locks.acquire(message.user_id).await;
        match self.process(message).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Dropping turn after error: {}", e);
                None
            }
        }
    }

    async fn process(&self, message: &InboundMessage) -> Result<Option<String>> {
        let user_id = message.user_id;
        self.users
            .create_user(user_id, &message.display_name)
            .await?;

        if self.users.is_blocked(user_id).await? {
            debug!("Ignoring blocked user");
            return Ok(None);
        }

        if let Err(rejection) = self.check_gates(user_id, &message.text, Utc::now()).await? {
            debug!(?rejection, "Message rejected at gate");
            return Ok(Some(rejection.to_string()));
        }

        self.users
            .increment_stat(user_id, StatField::MessageCount)
            .await?;
        self.stats.record_message();

        let normalized = normalize_text(&message.text);
        let reply = self.dispatcher.dispatch(user_id, &normalized).await?;

        if let Some(response) = &reply {
            self.users
                .log_message(MessageLogEntry {
                    user_id,
                    message: message.text.clone(),
                    response: response.clone(),
                    timestamp: Utc::now(),
                })
                .await?;
        }
        Ok(reply)
    }

    /// Rate limit, then spam. Admins skip both.
    async fn check_gates(
        &self,
        user_id: UserId,
        text: &str,
        now: Timestamp,
    ) -> Result<std::result::Result<(), GateRejection>> {
        if self.admin_ids.contains(&user_id.0) {
            return Ok(Ok(()));
        }
        if !self.rate_limiter.admit(user_id, now) {
            return Ok(Err(GateRejection::RateLimited));
        }
        if self.spam.inspect(user_id, text).await? {
            return Ok(Err(GateRejection::SpamFlagged));
        }
        Ok(Ok(()))
    }

    /// Storage hygiene: drop expired sessions, idle rate windows and unused
    /// locks.
    pub async fn sweep(&self, now: Timestamp) -> Result<usize> {
        let sessions = self.sessions.purge_expired(now).await?;
        let windows = self.rate_limiter.prune_idle(now);
        let locks = self.locks.prune();
        if sessions + windows + locks > 0 {
            info!(sessions, windows, locks, "Housekeeping sweep");
        }
        Ok(sessions)
    }
}
