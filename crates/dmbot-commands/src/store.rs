//! Durable user records, session rows and the message log
//!
//! Two backends implement both storage traits: [`SledStore`] on disk and
//! [`MemoryStore`] for ephemeral runs and tests. [`TimeoutStore`] wraps
//! either one and bounds every call.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dmbot_common::{DmBotError, Result, Timestamp, UserId};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Per-user counters that commands increment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatField {
    /// Every admitted message
    MessageCount,
    /// Jokes requested
    FikraCount,
    /// Facts requested
    BilgiCount,
    /// Number-guess and quiz wins
    GameWins,
}

/// Durable record of one correspondent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Identity
    pub user_id: UserId,
    /// Display name seen on first contact
    pub username: String,
    /// First message time
    pub first_seen: Timestamp,
    /// Last counted activity
    pub last_seen: Timestamp,
    /// Admitted messages
    pub message_count: u64,
    /// Jokes requested
    pub fikra_count: u64,
    /// Facts requested
    pub bilgi_count: u64,
    /// Games won
    pub game_wins: u64,
    /// Blocked for spam; cleared only out-of-band
    pub is_blocked: bool,
}

impl UserRecord {
    /// A fresh record with zeroed counters
    pub fn new(user_id: UserId, username: impl Into<String>, now: Timestamp) -> Self {
        Self {
            user_id,
            username: username.into(),
            first_seen: now,
            last_seen: now,
            message_count: 0,
            fikra_count: 0,
            bilgi_count: 0,
            game_wins: 0,
            is_blocked: false,
        }
    }

    /// Current value of a counter
    pub const fn stat(&self, field: StatField) -> u64 {
        match field {
            StatField::MessageCount => self.message_count,
            StatField::FikraCount => self.fikra_count,
            StatField::BilgiCount => self.bilgi_count,
            StatField::GameWins => self.game_wins,
        }
    }

    /// Increment a counter and touch `last_seen`
    pub fn bump(&mut self, field: StatField, now: Timestamp) {
        let counter = match field {
            StatField::MessageCount => &mut self.message_count,
            StatField::FikraCount => &mut self.fikra_count,
            StatField::BilgiCount => &mut self.bilgi_count,
            StatField::GameWins => &mut self.game_wins,
        };
        *counter = counter.saturating_add(1);
        self.last_seen = now;
    }
}

/// One answered message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageLogEntry {
    /// Sender
    pub user_id: UserId,
    /// Raw inbound text
    pub message: String,
    /// Reply sent
    pub response: String,
    /// When the reply was produced
    pub timestamp: Timestamp,
}

/// A stored session row. `payload` is the encoded session state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Absolute expiry; the row is void once this passes
    pub expires_at: Timestamp,
    /// JSON-encoded session state
    pub payload: String,
}

/// Durable per-user data
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Look up a record
    async fn get_user(&self, user_id: UserId) -> Result<Option<UserRecord>>;

    /// Insert a record unless one exists; returns the stored record
    async fn create_user(&self, user_id: UserId, username: &str) -> Result<UserRecord>;

    /// Increment a counter. A missing user is left alone.
    async fn increment_stat(&self, user_id: UserId, field: StatField) -> Result<()>;

    /// Set or clear the durable block flag, creating the record if needed
    async fn set_blocked(&self, user_id: UserId, blocked: bool) -> Result<()>;

    /// Whether the identity is blocked
    async fn is_blocked(&self, user_id: UserId) -> Result<bool> {
        Ok(self
            .get_user(user_id)
            .await?
            .is_some_and(|user| user.is_blocked))
    }

    /// Number of known users
    async fn user_count(&self) -> Result<usize>;

    /// Append an answered message to the log
    async fn log_message(&self, entry: MessageLogEntry) -> Result<()>;
}

/// Raw session persistence keyed by identity
#[async_trait]
pub trait SessionBackend: Send + Sync {
    /// Replace the row for `user_id`
    async fn put(&self, user_id: UserId, record: SessionRecord) -> Result<()>;

    /// Fetch the row, expired or not
    async fn fetch(&self, user_id: UserId) -> Result<Option<SessionRecord>>;

    /// Remove the row; removing a missing row is not an error
    async fn remove(&self, user_id: UserId) -> Result<()>;

    /// Delete rows whose expiry is at or before `now`. Returns how many.
    async fn purge_expired(&self, now: Timestamp) -> Result<usize>;
}

// ============================================================================
// Sled backend
// ============================================================================

/// On-disk store backed by sled
#[derive(Debug, Clone)]
pub struct SledStore {
    db: Arc<sled::Db>,
    users: sled::Tree,
    sessions: sled::Tree,
    messages: sled::Tree,
}

impl SledStore {
    /// Open or create the database at `db_path`
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        info!("Opening dmbot database at: {:?}", db_path.as_ref());

        let db = sled::Config::default()
            .path(db_path.as_ref())
            .cache_capacity(16 * 1024 * 1024)
            .flush_every_ms(Some(1000))
            .open()
            .map_err(|e| {
                DmBotError::database_with_source(
                    format!("Failed to open database at {}", db_path.as_ref().display()),
                    e,
                )
            })?;

        let users = db.open_tree("users")?;
        let sessions = db.open_tree("sessions")?;
        let messages = db.open_tree("messages")?;

        Ok(Self {
            db: Arc::new(db),
            users,
            sessions,
            messages,
        })
    }

    fn read_user(&self, user_id: UserId) -> Result<Option<UserRecord>> {
        match self.users.get(user_id.to_key())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn write_user(&self, user: &UserRecord) -> Result<()> {
        let bytes = serde_json::to_vec(user)?;
        self.users.insert(user.user_id.to_key(), bytes)?;
        self.users.flush_async().await?;
        Ok(())
    }

    /// Entries in the message log, oldest first
    pub fn logged_messages(&self) -> Result<Vec<MessageLogEntry>> {
        self.messages
            .iter()
            .values()
            .map(|value| -> Result<MessageLogEntry> { Ok(serde_json::from_slice(&value?)?) })
            .collect()
    }

    /// Flush all pending writes to disk
    pub async fn flush(&self) -> Result<()> {
        self.db.flush_async().await?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for SledStore {
    async fn get_user(&self, user_id: UserId) -> Result<Option<UserRecord>> {
        self.read_user(user_id)
    }

    async fn create_user(&self, user_id: UserId, username: &str) -> Result<UserRecord> {
        if let Some(existing) = self.read_user(user_id)? {
            return Ok(existing);
        }
        debug!(user_id = %user_id, "Creating user record");
        let user = UserRecord::new(user_id, username, Utc::now());
        self.write_user(&user).await?;
        Ok(user)
    }

    async fn increment_stat(&self, user_id: UserId, field: StatField) -> Result<()> {
        if let Some(mut user) = self.read_user(user_id)? {
            user.bump(field, Utc::now());
            self.write_user(&user).await?;
        }
        Ok(())
    }

    async fn set_blocked(&self, user_id: UserId, blocked: bool) -> Result<()> {
        let mut user = self
            .read_user(user_id)?
            .unwrap_or_else(|| UserRecord::new(user_id, "", Utc::now()));
        user.is_blocked = blocked;
        self.write_user(&user).await
    }

    async fn user_count(&self) -> Result<usize> {
        Ok(self.users.len())
    }

    async fn log_message(&self, entry: MessageLogEntry) -> Result<()> {
        let id = self.db.generate_id()?;
        self.messages
            .insert(id.to_be_bytes(), serde_json::to_vec(&entry)?)?;
        self.messages.flush_async().await?;
        Ok(())
    }
}

#[async_trait]
impl SessionBackend for SledStore {
    async fn put(&self, user_id: UserId, record: SessionRecord) -> Result<()> {
        self.sessions
            .insert(user_id.to_key(), serde_json::to_vec(&record)?)?;
        self.sessions.flush_async().await?;
        Ok(())
    }

    async fn fetch(&self, user_id: UserId) -> Result<Option<SessionRecord>> {
        match self.sessions.get(user_id.to_key())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn remove(&self, user_id: UserId) -> Result<()> {
        if self.sessions.remove(user_id.to_key())?.is_some() {
            self.sessions.flush_async().await?;
        }
        Ok(())
    }

    async fn purge_expired(&self, now: Timestamp) -> Result<usize> {
        let mut expired = Vec::new();
        for item in &self.sessions {
            let (key, value) = item?;
            // Undecodable rows are swept as well; they can never be served.
            let stale = serde_json::from_slice::<SessionRecord>(&value)
                .map_or(true, |record| record.expires_at <= now);
            if stale {
                expired.push(key);
            }
        }

        for key in &expired {
            self.sessions.remove(key)?;
        }
        if !expired.is_empty() {
            self.sessions.flush_async().await?;
        }
        Ok(expired.len())
    }
}

// ============================================================================
// In-memory backend
// ============================================================================

/// Process-local store; nothing survives a restart
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: DashMap<UserId, UserRecord>,
    sessions: DashMap<UserId, SessionRecord>,
    messages: RwLock<Vec<MessageLogEntry>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries in the message log, oldest first
    pub async fn logged_messages(&self) -> Vec<MessageLogEntry> {
        self.messages.read().await.clone()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn get_user(&self, user_id: UserId) -> Result<Option<UserRecord>> {
        Ok(self.users.get(&user_id).map(|user| user.value().clone()))
    }

    async fn create_user(&self, user_id: UserId, username: &str) -> Result<UserRecord> {
        Ok(self
            .users
            .entry(user_id)
            .or_insert_with(|| UserRecord::new(user_id, username, Utc::now()))
            .value()
            .clone())
    }

    async fn increment_stat(&self, user_id: UserId, field: StatField) -> Result<()> {
        if let Some(mut user) = self.users.get_mut(&user_id) {
            user.bump(field, Utc::now());
        }
        Ok(())
    }

    async fn set_blocked(&self, user_id: UserId, blocked: bool) -> Result<()> {
        self.users
            .entry(user_id)
            .or_insert_with(|| UserRecord::new(user_id, "", Utc::now()))
            .is_blocked = blocked;
        Ok(())
    }

    async fn user_count(&self) -> Result<usize> {
        Ok(self.users.len())
    }

    async fn log_message(&self, entry: MessageLogEntry) -> Result<()> {
        self.messages.write().await.push(entry);
        Ok(())
    }
}

#[async_trait]
impl SessionBackend for MemoryStore {
    async fn put(&self, user_id: UserId, record: SessionRecord) -> Result<()> {
        self.sessions.insert(user_id, record);
        Ok(())
    }

    async fn fetch(&self, user_id: UserId) -> Result<Option<SessionRecord>> {
        Ok(self.sessions.get(&user_id).map(|row| row.value().clone()))
    }

    async fn remove(&self, user_id: UserId) -> Result<()> {
        self.sessions.remove(&user_id);
        Ok(())
    }

    async fn purge_expired(&self, now: Timestamp) -> Result<usize> {
        let before = self.sessions.len();
        self.sessions.retain(|_, record| record.expires_at > now);
        Ok(before.saturating_sub(self.sessions.len()))
    }
}

// ============================================================================
// Timeout decorator
// ============================================================================

/// Bounds every storage call of the wrapped store by `limit`.
///
/// A call that runs out of time fails with a database error; the caller
/// drops the turn instead of writing partial state.
#[derive(Debug)]
pub struct TimeoutStore<S: ?Sized> {
    inner: Arc<S>,
    limit: Duration,
}

impl<S: ?Sized> TimeoutStore<S> {
    /// Wrap `inner`
    pub const fn new(inner: Arc<S>, limit: Duration) -> Self {
        Self { inner, limit }
    }

    /// The wrapped store
    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn bounded<T>(&self, op: &'static str, fut: impl Future<Output = Result<T>> + Send) -> Result<T> {
        match tokio::time::timeout(self.limit, fut).await {
            Ok(result) => result,
            Err(_) => Err(DmBotError::database(format!(
                "Storage call '{op}' timed out after {:?}",
                self.limit
            ))),
        }
    }
}

#[async_trait]
impl<S: UserStore + ?Sized> UserStore for TimeoutStore<S> {
    async fn get_user(&self, user_id: UserId) -> Result<Option<UserRecord>> {
        self.bounded("get_user", self.inner.get_user(user_id)).await
    }

    async fn create_user(&self, user_id: UserId, username: &str) -> Result<UserRecord> {
        self.bounded("create_user", self.inner.create_user(user_id, username))
            .await
    }

    async fn increment_stat(&self, user_id: UserId, field: StatField) -> Result<()> {
        self.bounded("increment_stat", self.inner.increment_stat(user_id, field))
            .await
    }

    async fn set_blocked(&self, user_id: UserId, blocked: bool) -> Result<()> {
        self.bounded("set_blocked", self.inner.set_blocked(user_id, blocked))
            .await
    }

    async fn is_blocked(&self, user_id: UserId) -> Result<bool> {
        self.bounded("is_blocked", self.inner.is_blocked(user_id)).await
    }

    async fn user_count(&self) -> Result<usize> {
        self.bounded("user_count", self.inner.user_count()).await
    }

    async fn log_message(&self, entry: MessageLogEntry) -> Result<()> {
        self.bounded("log_message", self.inner.log_message(entry)).await
    }
}

#[async_trait]
impl<S: SessionBackend + ?Sized> SessionBackend for TimeoutStore<S> {
    async fn put(&self, user_id: UserId, record: SessionRecord) -> Result<()> {
        self.bounded("session_put", self.inner.put(user_id, record)).await
    }

    async fn fetch(&self, user_id: UserId) -> Result<Option<SessionRecord>> {
        self.bounded("session_fetch", self.inner.fetch(user_id)).await
    }

    async fn remove(&self, user_id: UserId) -> Result<()> {
        self.bounded("session_remove", self.inner.remove(user_id)).await
    }

    async fn purge_expired(&self, now: Timestamp) -> Result<usize> {
        self.bounded("session_purge", self.inner.purge_expired(now))
            .await
    }
}
