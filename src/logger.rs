//! The [`Logger`] capability: a user-facing channel the engine reports
//! phase boundaries and failures to, distinct from the ambient `log` crate
//! tracing used internally. See spec [6].
//!
//! Modeled on the teacher's `DevicePolicyManager` trait: default method
//! bodies make the trait trivial to implement for callers who don't care
//! about one channel or the other.

/// Sink for user-facing and debug-facing engine messages.
pub trait Logger {
    /// A message meant for an end user (phase names, failure reasons).
    fn add_user_message(&mut self, message: &str) {
        let _ = message;
    }

    /// A message meant for a developer (retry attempts, raw frame dumps).
    fn add_debug_message(&mut self, message: &str) {
        let _ = message;
    }
}

/// A [`Logger`] that discards everything. Useful in tests and for callers
/// that only want the ambient `log` crate tracing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLogger;

impl Logger for NullLogger {}

/// A [`Logger`] that forwards both channels to the ambient `log` crate —
/// user messages at `info!`, debug messages at `debug!`. Not wired up
/// automatically: logging sinks are a named Non-goal for the library's own
/// opinionated output, but the crate still ships a real adapter built on
/// the ecosystem logging crate rather than leaving callers to write one.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogCrateLogger;

impl Logger for LogCrateLogger {
    fn add_user_message(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn add_debug_message(&mut self, message: &str) {
        log::debug!("{message}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_logger_accepts_messages_without_panicking() {
        let mut logger = NullLogger;
        logger.add_user_message("hello");
        logger.add_debug_message("world");
    }
}
