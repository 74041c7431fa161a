//! # dmbot commands
//!
//! The conversational core of dmbot: message gates, sessions, games and the
//! keyword dispatcher, plus the storage and data-provider adapters they run
//! against.
//!
//! [`Responder`] is the entry point. It takes one inbound message and
//! returns the reply, if any.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod content;
pub mod dispatcher;
pub mod games;
pub mod handlers;
pub mod housekeeping;
pub mod providers;
pub mod rate_limit;
pub mod registry;
pub mod responder;
pub mod session;
pub mod spam;
pub mod store;

pub use dispatcher::Dispatcher;
pub use games::{GameEngine, GameRecord, NumberGuessGame, QuizGame};
pub use handlers::BotStats;
pub use housekeeping::spawn_housekeeping;
pub use providers::{DataProvider, HttpDataProvider, OfflineProvider};
pub use rate_limit::RateLimiter;
pub use registry::{CommandCategory, CommandEntry, CommandKind, CommandRegistry};
pub use responder::{GateRejection, Responder};
pub use session::{Session, SessionState, SessionStore, SessionTag};
pub use spam::SpamDetector;
pub use store::{
    MemoryStore, MessageLogEntry, SessionBackend, SledStore, StatField, TimeoutStore, UserRecord,
    UserStore,
};
