//! Single-slot, expiring interaction context per identity

use crate::games::GameRecord;
use crate::store::{SessionBackend, SessionRecord};
use chrono::Utc;
use dmbot_common::{DmBotError, Result, Timestamp, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// What a session is waiting for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "data", rename_all = "snake_case")]
pub enum SessionState {
    /// The weather command asked which city
    AwaitingCity,
    /// A game is in progress
    Game(GameRecord),
}

/// Discriminant of [`SessionState`], for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionTag {
    /// [`SessionState::AwaitingCity`]
    AwaitingCity,
    /// [`SessionState::Game`]
    Game,
}

impl fmt::Display for SessionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AwaitingCity => f.write_str("awaiting_city"),
            Self::Game => f.write_str("game"),
        }
    }
}

/// A live session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Current state and its payload
    pub state: SessionState,
    /// The session is void once this passes
    pub expires_at: Timestamp,
}

impl Session {
    /// State discriminant
    pub const fn tag(&self) -> SessionTag {
        match self.state {
            SessionState::AwaitingCity => SessionTag::AwaitingCity,
            SessionState::Game(_) => SessionTag::Game,
        }
    }

    /// Whether the session is still valid at `now`
    pub fn is_live(&self, now: Timestamp) -> bool {
        self.expires_at > now
    }
}

/// Session access over a [`SessionBackend`].
///
/// The backend row is the only source of truth. Nothing is cached in
/// process, so a restart or a second worker sees the same session.
#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn SessionBackend>,
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore").finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Create a store over `backend`
    pub fn new(backend: Arc<dyn SessionBackend>) -> Self {
        Self { backend }
    }

    /// Replace any session for `user_id`; it expires `ttl` after `now`
    pub async fn set_at(
        &self,
        user_id: UserId,
        state: SessionState,
        ttl: Duration,
        now: Timestamp,
    ) -> Result<Session> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| DmBotError::validation(format!("Session TTL out of range: {e}")))?;
        let session = Session {
            state,
            expires_at: now + ttl,
        };
        self.save(user_id, &session).await?;
        debug!(user_id = %user_id, tag = %session.tag(), expires_at = %session.expires_at, "Session set");
        Ok(session)
    }

    /// [`SessionStore::set_at`] with the current time
    pub async fn set(&self, user_id: UserId, state: SessionState, ttl: Duration) -> Result<Session> {
        self.set_at(user_id, state, ttl, Utc::now()).await
    }

    /// Write a mutated session back, keeping its `expires_at`
    pub async fn save(&self, user_id: UserId, session: &Session) -> Result<()> {
        let record = SessionRecord {
            expires_at: session.expires_at,
            payload: serde_json::to_string(&session.state)?,
        };
        self.backend.put(user_id, record).await
    }

    /// The session for `user_id` if it is live at `now`.
    ///
    /// An expired row reads as absent and is left for housekeeping.
    pub async fn get_at(&self, user_id: UserId, now: Timestamp) -> Result<Option<Session>> {
        let Some(record) = self.backend.fetch(user_id).await? else {
            return Ok(None);
        };

        if record.expires_at <= now {
            debug!(user_id = %user_id, "Ignoring expired session");
            return Ok(None);
        }

        let state: SessionState = serde_json::from_str(&record.payload)?;
        Ok(Some(Session {
            state,
            expires_at: record.expires_at,
        }))
    }

    /// [`SessionStore::get_at`] with the current time
    pub async fn get(&self, user_id: UserId) -> Result<Option<Session>> {
        self.get_at(user_id, Utc::now()).await
    }

    /// Remove the session; clearing a missing session is fine
    pub async fn clear(&self, user_id: UserId) -> Result<()> {
        self.backend.remove(user_id).await?;
        debug!(user_id = %user_id, "Session cleared");
        Ok(())
    }

    /// Delete expired rows from the backend
    pub async fn purge_expired(&self, now: Timestamp) -> Result<usize> {
        self.backend.purge_expired(now).await
    }
}
