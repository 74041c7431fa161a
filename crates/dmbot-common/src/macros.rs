//! Early-return helper for [`DmBotError`](crate::DmBotError)

/// Return a generic [`DmBotError`](crate::DmBotError) unless `cond` holds.
///
/// The message takes `format!` arguments:
///
/// ```rust
/// use dmbot_common::{ensure, Result};
///
/// fn check_retries(failures: u32, limit: u32) -> Result<()> {
///     ensure!(failures <= limit, "Giving up after {} failures", failures);
///     Ok(())
/// }
///
/// assert!(check_retries(1, 2).is_ok());
/// assert!(check_retries(3, 2).is_err());
/// ```
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $msg:literal $(,)?) => {
        if !$cond {
            return Err($crate::DmBotError::new(format!($msg)));
        }
    };
    ($cond:expr, $fmt:literal, $($arg:tt)*) => {
        if !$cond {
            return Err($crate::DmBotError::new(format!($fmt, $($arg)*)));
        }
    };
}
