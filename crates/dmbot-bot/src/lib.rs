//! # dmbot
//!
//! Runs the dmbot responder against a message transport: the inbox polling
//! loop, the console transport and the command line surface.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod poller;
pub mod transport;

pub use cli::Args;
pub use poller::{PollStatus, Poller, PollerSettings};
pub use transport::{ConsoleTransport, MessageTransport};
