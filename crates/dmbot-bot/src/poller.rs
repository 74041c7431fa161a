//! Inbox polling loop

use crate::transport::MessageTransport;
use dmbot_commands::Responder;
use dmbot_common::{chunk_text, ensure, MessageId, Result, ThreadId};
use dmbot_config::BotConfig;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_retry::strategy::ExponentialBackoff;
use tokio_retry::Retry;
use tracing::{debug, error, info, warn};

/// Pause after a failed inbox fetch
const ERROR_BACKOFF: Duration = Duration::from_secs(60);
/// Extra attempts per outbound chunk
const SEND_RETRIES: usize = 2;

/// Loop tuning, normally taken from [`BotConfig`]
#[derive(Debug, Clone)]
pub struct PollerSettings {
    /// Shortest pause between polls
    pub poll_min: Duration,
    /// Longest pause between polls
    pub poll_max: Duration,
    /// Threads requested per poll
    pub thread_fetch_limit: usize,
    /// Longest outbound message, in characters
    pub max_message_length: usize,
    /// Answered ids remembered before the set is reset
    pub answered_cache_limit: usize,
    /// Consecutive failed polls tolerated
    pub max_retry_count: u32,
    /// Pause after a failed poll
    pub error_backoff: Duration,
}

impl PollerSettings {
    /// Settings from the `bot` config section
    pub fn from_config(config: &BotConfig) -> Self {
        Self {
            poll_min: Duration::from_secs(config.poll_interval_min_secs),
            poll_max: Duration::from_secs(config.poll_interval_max_secs),
            thread_fetch_limit: config.thread_fetch_limit,
            max_message_length: config.max_message_length,
            answered_cache_limit: config.answered_cache_limit,
            max_retry_count: config.max_retry_count,
            error_backoff: ERROR_BACKOFF,
        }
    }

    /// A random pause in `[poll_min, poll_max]`
    pub fn next_pause(&self) -> Duration {
        let low = self.poll_min.as_millis().min(self.poll_max.as_millis());
        let high = self.poll_min.as_millis().max(self.poll_max.as_millis());
        let low = u64::try_from(low).unwrap_or(u64::MAX);
        let high = u64::try_from(high).unwrap_or(u64::MAX);
        Duration::from_millis(fastrand::u64(low..=high))
    }
}

/// What one poll did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStatus {
    /// The inbox was read; this many messages got a reply
    Answered(usize),
    /// The transport has no more input
    Closed,
}

/// A computed reply that has not been fully delivered yet
#[derive(Debug, Clone)]
struct PendingReply {
    thread_id: ThreadId,
    chunks: Vec<String>,
    /// Chunks already delivered, in order
    sent: usize,
}

/// Reads the inbox, answers new messages and remembers what it answered.
///
/// Each message is handled by the responder once. When delivery fails the
/// reply is kept and only the undelivered chunks are sent on a later poll.
pub struct Poller<T: ?Sized> {
    transport: Arc<T>,
    responder: Arc<Responder>,
    settings: PollerSettings,
    answered: HashSet<MessageId>,
    pending: HashMap<MessageId, PendingReply>,
}

impl<T: ?Sized> std::fmt::Debug for Poller<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller")
            .field("settings", &self.settings)
            .field("answered", &self.answered.len())
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

impl<T: MessageTransport + ?Sized> Poller<T> {
    /// Create a poller with an empty answered set
    pub fn new(transport: Arc<T>, responder: Arc<Responder>, settings: PollerSettings) -> Self {
        Self {
            transport,
            responder,
            settings,
            answered: HashSet::new(),
            pending: HashMap::new(),
        }
    }

    /// Whether the message id was already answered
    pub fn is_answered(&self, message_id: &MessageId) -> bool {
        self.answered.contains(message_id)
    }

    /// Poll until `shutdown` resolves or the transport closes.
    ///
    /// A failed poll backs off and tries again; more than `max_retry_count`
    /// failures in a row end the loop with an error.
    pub async fn run<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        tokio::pin!(shutdown);
        let mut failures = 0_u32;

        loop {
            let outcome = tokio::select! {
                () = &mut shutdown => {
                    info!("Shutdown requested, leaving the poll loop");
                    return Ok(());
                }
                outcome = self.poll_once() => outcome,
            };

            let pause = match outcome {
                Ok(PollStatus::Closed) => {
                    info!("Transport closed, leaving the poll loop");
                    return Ok(());
                }
                Ok(PollStatus::Answered(count)) => {
                    failures = 0;
                    if count > 0 {
                        debug!("Answered {} messages", count);
                    }
                    if self.transport.long_polls() {
                        continue;
                    }
                    self.settings.next_pause()
                }
                Err(e) => {
                    failures += 1;
                    ensure!(
                        failures <= self.settings.max_retry_count,
                        "Giving up after {} consecutive poll failures: {}",
                        failures,
                        e
                    );
                    warn!(
                        "Poll failed ({}/{}): {}; retrying in {:?}",
                        failures, self.settings.max_retry_count, e, self.settings.error_backoff
                    );
                    self.settings.error_backoff
                }
            };

            tokio::select! {
                () = &mut shutdown => {
                    info!("Shutdown requested, leaving the poll loop");
                    return Ok(());
                }
                () = sleep(pause) => {}
            }
        }
    }

    /// Replies computed but not yet fully delivered
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Fetch the inbox once and answer everything new.
    ///
    /// A message whose reply could not be delivered stays unanswered; when it
    /// shows up again only the remaining chunks of the stored reply are sent.
    pub async fn poll_once(&mut self) -> Result<PollStatus> {
        let Some(messages) = self
            .transport
            .fetch_inbox(self.settings.thread_fetch_limit)
            .await?
        else {
            return Ok(PollStatus::Closed);
        };

        let own_id = self.transport.self_id();
        let mut answered = 0;

        for message in messages {
            if message.user_id == own_id || self.answered.contains(&message.message_id) {
                continue;
            }

            let mut reply = match self.pending.remove(&message.message_id) {
                Some(reply) => {
                    debug!(message_id = %message.message_id, "Resuming reply delivery");
                    reply
                }
                None => {
                    let Some(text) = self.responder.handle(&message).await else {
                        self.mark_answered(message.message_id);
                        continue;
                    };
                    PendingReply {
                        thread_id: message.thread_id.clone(),
                        chunks: chunk_text(&text, self.settings.max_message_length),
                        sent: 0,
                    }
                }
            };

            match self.deliver(&mut reply).await {
                Ok(()) => {
                    self.mark_answered(message.message_id);
                    answered += 1;
                }
                Err(e) => {
                    error!(
                        thread_id = %message.thread_id,
                        message_id = %message.message_id,
                        sent = reply.sent,
                        total = reply.chunks.len(),
                        "Failed to deliver reply: {}",
                        e
                    );
                    self.pending.insert(message.message_id, reply);
                }
            }
        }

        Ok(PollStatus::Answered(answered))
    }

    /// Send the undelivered chunks, retrying each with backoff
    async fn deliver(&self, reply: &mut PendingReply) -> Result<()> {
        while let Some(chunk) = reply.chunks.get(reply.sent) {
            // 100ms, 200ms, 400ms, ...
            let strategy = ExponentialBackoff::from_millis(2)
                .factor(50)
                .max_delay(Duration::from_secs(5))
                .take(SEND_RETRIES);
            let thread_id = &reply.thread_id;
            Retry::spawn(strategy, || self.transport.send(thread_id, chunk)).await?;
            reply.sent += 1;
        }
        Ok(())
    }

    fn mark_answered(&mut self, message_id: MessageId) {
        if self.answered.len() >= self.settings.answered_cache_limit {
            debug!("Answered set reached {} ids, resetting", self.answered.len());
            self.answered.clear();
        }
        self.answered.insert(message_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use dmbot_commands::{CommandRegistry, MemoryStore, OfflineProvider, SessionBackend, UserStore};
    use dmbot_common::{DmBotError, InboundMessage, UserId};
    use dmbot_config::Config;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const BOT: UserId = UserId(999);

    /// Serves scripted polls and records what was sent.
    #[derive(Default)]
    struct ScriptedTransport {
        polls: Mutex<VecDeque<Result<Vec<InboundMessage>>>>,
        sent: Mutex<Vec<(ThreadId, String)>>,
        failing_sends: AtomicUsize,
        /// Sends accepted before every further send fails; `None` is unlimited
        send_budget: Mutex<Option<usize>>,
    }

    impl ScriptedTransport {
        fn with_polls(polls: Vec<Result<Vec<InboundMessage>>>) -> Self {
            Self {
                polls: Mutex::new(polls.into()),
                ..Self::default()
            }
        }

        fn sent(&self) -> Vec<(ThreadId, String)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MessageTransport for ScriptedTransport {
        async fn fetch_inbox(&self, _limit: usize) -> Result<Option<Vec<InboundMessage>>> {
            match self.polls.lock().unwrap().pop_front() {
                Some(poll) => poll.map(Some),
                None => Ok(None),
            }
        }

        async fn send(&self, thread_id: &ThreadId, text: &str) -> Result<()> {
            if self.failing_sends.load(Ordering::SeqCst) > 0 {
                self.failing_sends.fetch_sub(1, Ordering::SeqCst);
                return Err(DmBotError::transport("send rejected"));
            }
            if let Some(budget) = self.send_budget.lock().unwrap().as_mut() {
                if *budget == 0 {
                    return Err(DmBotError::transport("quota exhausted"));
                }
                *budget -= 1;
            }
            self.sent
                .lock()
                .unwrap()
                .push((thread_id.clone(), text.to_string()));
            Ok(())
        }

        fn self_id(&self) -> UserId {
            BOT
        }
    }

    fn message(id: &str, user: UserId, text: &str) -> InboundMessage {
        InboundMessage {
            message_id: MessageId(id.to_string()),
            thread_id: ThreadId(format!("t{user}")),
            user_id: user,
            display_name: "deneme".to_string(),
            text: text.to_string(),
        }
    }

    fn settings() -> PollerSettings {
        PollerSettings {
            poll_min: Duration::from_millis(1),
            poll_max: Duration::from_millis(2),
            thread_fetch_limit: 20,
            max_message_length: 2000,
            answered_cache_limit: 1000,
            max_retry_count: 2,
            error_backoff: Duration::from_millis(1),
        }
    }

    fn poller(transport: Arc<ScriptedTransport>, settings: PollerSettings) -> Poller<ScriptedTransport> {
        poller_with_store(transport, settings, Arc::new(MemoryStore::new()))
    }

    fn poller_with_store(
        transport: Arc<ScriptedTransport>,
        settings: PollerSettings,
        store: Arc<MemoryStore>,
    ) -> Poller<ScriptedTransport> {
        let responder = Responder::new(&Config::default(), store, Arc::new(OfflineProvider));
        Poller::new(transport, Arc::new(responder), settings)
    }

    async fn guess_attempts(store: &MemoryStore, user: UserId) -> (i64, u64) {
        let record = store.fetch(user).await.unwrap().unwrap();
        let payload: serde_json::Value = serde_json::from_str(&record.payload).unwrap();
        (
            payload["data"]["target"].as_i64().unwrap(),
            payload["data"]["attempts"].as_u64().unwrap(),
        )
    }

    #[tokio::test]
    async fn test_skips_own_and_answered_messages() {
        let batch = vec![
            message("m1", UserId(1), "zar"),
            message("m2", BOT, "zar"),
        ];
        let transport = Arc::new(ScriptedTransport::with_polls(vec![
            Ok(batch.clone()),
            Ok(batch),
        ]));
        let mut poller = poller(transport.clone(), settings());

        assert_eq!(poller.poll_once().await.unwrap(), PollStatus::Answered(1));
        assert_eq!(poller.poll_once().await.unwrap(), PollStatus::Answered(0));
        assert_eq!(poller.poll_once().await.unwrap(), PollStatus::Closed);

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, ThreadId("t1".to_string()));
        assert!(sent[0].1.starts_with("🎲"));
    }

    #[tokio::test]
    async fn test_long_reply_is_chunked() {
        let transport = Arc::new(ScriptedTransport::with_polls(vec![Ok(vec![message(
            "m1",
            UserId(1),
            "yardım",
        )])]));
        let mut settings = settings();
        settings.max_message_length = 50;
        let mut poller = poller(transport.clone(), settings);

        poller.poll_once().await.unwrap();
        let sent = transport.sent();
        assert!(sent.len() > 1);
        assert!(sent.iter().all(|(_, text)| text.chars().count() <= 50));

        let joined: String = sent.into_iter().map(|(_, text)| text).collect();
        assert_eq!(joined, CommandRegistry::new().help_text());
    }

    #[tokio::test]
    async fn test_failed_delivery_is_not_marked_answered() {
        let transport = Arc::new(ScriptedTransport::with_polls(vec![Ok(vec![message(
            "m1",
            UserId(1),
            "zar",
        )])]));
        transport
            .failing_sends
            .store(SEND_RETRIES + 1, Ordering::SeqCst);
        let mut poller = poller(transport.clone(), settings());

        assert_eq!(poller.poll_once().await.unwrap(), PollStatus::Answered(0));
        assert!(!poller.is_answered(&MessageId("m1".to_string())));
        assert_eq!(poller.pending_count(), 1);
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_redelivery_does_not_replay_the_turn() {
        let user = UserId(4);
        let store = Arc::new(MemoryStore::new());
        let transport = Arc::new(ScriptedTransport::with_polls(vec![Ok(vec![message(
            "m0",
            user,
            "sayı tahmin",
        )])]));
        let mut poller = poller_with_store(transport.clone(), settings(), store.clone());
        assert_eq!(poller.poll_once().await.unwrap(), PollStatus::Answered(1));

        let (target, attempts) = guess_attempts(&store, user).await;
        assert_eq!(attempts, 0);
        let wrong = if target == 1 { 2 } else { 1 };
        let guess = message("m1", user, &wrong.to_string());

        transport.polls.lock().unwrap().extend([Ok(vec![guess.clone()]), Ok(vec![guess])]);
        transport
            .failing_sends
            .store(SEND_RETRIES + 1, Ordering::SeqCst);

        assert_eq!(poller.poll_once().await.unwrap(), PollStatus::Answered(0));
        assert_eq!(poller.pending_count(), 1);
        assert_eq!(guess_attempts(&store, user).await.1, 1);

        assert_eq!(poller.poll_once().await.unwrap(), PollStatus::Answered(1));
        assert_eq!(poller.pending_count(), 0);
        assert!(poller.is_answered(&MessageId("m1".to_string())));
        // One message, one counted guess, one delivered hint.
        assert_eq!(guess_attempts(&store, user).await.1, 1);
        let sent = transport.sent();
        assert_eq!(sent.len(), 2);
        assert!(sent[1].1.contains("Kalan deneme: 9"), "{}", sent[1].1);
        let record = store.get_user(user).await.unwrap().unwrap();
        assert_eq!(record.message_count, 2);
    }

    #[tokio::test]
    async fn test_partial_delivery_resumes_at_next_chunk() {
        let help = message("m1", UserId(1), "yardım");
        let transport = Arc::new(ScriptedTransport::with_polls(vec![
            Ok(vec![help.clone()]),
            Ok(vec![help]),
        ]));
        *transport.send_budget.lock().unwrap() = Some(1);
        let mut settings = settings();
        settings.max_message_length = 50;
        let mut poller = poller(transport.clone(), settings);

        assert_eq!(poller.poll_once().await.unwrap(), PollStatus::Answered(0));
        assert_eq!(transport.sent().len(), 1);

        *transport.send_budget.lock().unwrap() = None;
        assert_eq!(poller.poll_once().await.unwrap(), PollStatus::Answered(1));

        let joined: String = transport.sent().into_iter().map(|(_, text)| text).collect();
        assert_eq!(joined, CommandRegistry::new().help_text());
    }

    #[tokio::test]
    async fn test_send_retry_recovers() {
        let transport = Arc::new(ScriptedTransport::with_polls(vec![Ok(vec![message(
            "m1",
            UserId(1),
            "zar",
        )])]));
        transport.failing_sends.store(1, Ordering::SeqCst);
        let mut poller = poller(transport.clone(), settings());

        assert_eq!(poller.poll_once().await.unwrap(), PollStatus::Answered(1));
        assert!(poller.is_answered(&MessageId("m1".to_string())));
    }

    #[tokio::test]
    async fn test_answered_set_resets_past_limit() {
        let batch: Vec<_> = (0..12)
            .map(|i| message(&format!("m{i}"), UserId(i), "zar"))
            .collect();
        let transport = Arc::new(ScriptedTransport::with_polls(vec![Ok(batch)]));
        let mut settings = settings();
        settings.answered_cache_limit = 10;
        let mut poller = poller(transport, settings);

        poller.poll_once().await.unwrap();
        assert!(poller.answered.len() <= 10);
        assert!(poller.is_answered(&MessageId("m11".to_string())));
        assert!(!poller.is_answered(&MessageId("m0".to_string())));
    }

    #[tokio::test]
    async fn test_run_stops_when_transport_closes() {
        let transport = Arc::new(ScriptedTransport::with_polls(vec![
            Err(DmBotError::transport("inbox unavailable")),
            Ok(vec![message("m1", UserId(1), "saat")]),
        ]));
        let mut poller = poller(transport.clone(), settings());

        poller.run(std::future::pending()).await.unwrap();
        assert_eq!(transport.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_run_gives_up_after_repeated_failures() {
        let transport = Arc::new(ScriptedTransport::with_polls(vec![
            Err(DmBotError::transport("down")),
            Err(DmBotError::transport("down")),
            Err(DmBotError::transport("down")),
        ]));
        let mut poller = poller(transport, settings());

        let err = poller.run(std::future::pending()).await.unwrap_err();
        assert!(err.to_string().contains("3 consecutive poll failures"));
    }

    #[tokio::test]
    async fn test_run_honours_shutdown() {
        let transport = Arc::new(ScriptedTransport::with_polls(
            (0..1000).map(|_| Ok(Vec::new())).collect(),
        ));
        let mut poller = poller(transport, settings());

        let result = tokio::time::timeout(Duration::from_secs(5), poller.run(async {})).await;
        assert!(result.unwrap().is_ok());
    }

    #[test]
    fn test_next_pause_within_bounds() {
        let settings = PollerSettings::from_config(&Config::default().bot);
        for _ in 0..100 {
            let pause = settings.next_pause();
            assert!(pause >= Duration::from_secs(25) && pause <= Duration::from_secs(45));
        }
    }
}
