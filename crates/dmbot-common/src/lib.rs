//! # dmbot common
//!
//! Shared error type, logging setup, identity newtypes and text utilities
//! used by every crate in the dmbot workspace.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod logging;
#[macro_use]
pub mod macros;
pub mod types;
pub mod utils;

#[cfg(any(test, feature = "testing"))]
pub mod test_utils;

pub use error::{DmBotError, Result};
pub use logging::{init_logging, LoggingConfig};
pub use types::*;
pub use utils::*;
