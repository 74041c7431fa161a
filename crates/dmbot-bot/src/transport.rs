//! Message transports the poller reads from and replies through

use async_trait::async_trait;
use dmbot_common::{DmBotError, InboundMessage, MessageId, Result, ThreadId, UserId};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::{
    self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Lines, Stdin,
    Stdout,
};
use tokio::sync::Mutex;

/// Thread id every console message and reply uses
pub const CONSOLE_THREAD: &str = "console";

/// A direct-message inbox.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    /// Latest inbound messages across at most `limit` threads.
    ///
    /// `Ok(None)` means the inbox is closed for good and polling should stop.
    async fn fetch_inbox(&self, limit: usize) -> Result<Option<Vec<InboundMessage>>>;

    /// Deliver one message to a thread
    async fn send(&self, thread_id: &ThreadId, text: &str) -> Result<()>;

    /// The bot's own identity, whose messages are never answered
    fn self_id(&self) -> UserId;

    /// Whether `fetch_inbox` itself waits for new input. The poller skips its
    /// pause between polls for such transports.
    fn long_polls(&self) -> bool {
        false
    }
}

/// Local chat: each input line is a message from one fixed identity, and
/// replies are written to the output.
pub struct ConsoleTransport<R, W> {
    lines: Mutex<Lines<R>>,
    output: Mutex<W>,
    user_id: UserId,
    display_name: String,
    next_id: AtomicU64,
}

impl<R, W> std::fmt::Debug for ConsoleTransport<R, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleTransport")
            .field("user_id", &self.user_id)
            .field("display_name", &self.display_name)
            .finish_non_exhaustive()
    }
}

impl ConsoleTransport<BufReader<Stdin>, Stdout> {
    /// Console chat over the process's stdin and stdout
    pub fn stdio(user_id: UserId, display_name: impl Into<String>) -> Self {
        Self::new(BufReader::new(io::stdin()), io::stdout(), user_id, display_name)
    }
}

impl<R, W> ConsoleTransport<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// Console chat over arbitrary streams
    pub fn new(reader: R, writer: W, user_id: UserId, display_name: impl Into<String>) -> Self {
        Self {
            lines: Mutex::new(reader.lines()),
            output: Mutex::new(writer),
            user_id,
            display_name: display_name.into(),
            next_id: AtomicU64::new(1),
        }
    }
}

#[async_trait]
impl<R, W> MessageTransport for ConsoleTransport<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn fetch_inbox(&self, _limit: usize) -> Result<Option<Vec<InboundMessage>>> {
        let line = self
            .lines
            .lock()
            .await
            .next_line()
            .await
            .map_err(|e| DmBotError::transport_with_source("Failed to read console input", e))?;

        let Some(text) = line else {
            return Ok(None);
        };

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        Ok(Some(vec![InboundMessage {
            message_id: MessageId(format!("console-{id}")),
            thread_id: ThreadId(CONSOLE_THREAD.to_string()),
            user_id: self.user_id,
            display_name: self.display_name.clone(),
            text,
        }]))
    }

    async fn send(&self, _thread_id: &ThreadId, text: &str) -> Result<()> {
        let mut output = self.output.lock().await;
        let write = async {
            output.write_all(text.as_bytes()).await?;
            output.write_all(b"\n").await?;
            output.flush().await
        };
        write
            .await
            .map_err(|e| DmBotError::transport_with_source("Failed to write console reply", e))
    }

    fn self_id(&self) -> UserId {
        UserId(0)
    }

    fn long_polls(&self) -> bool {
        true
    }
}
