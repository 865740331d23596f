//! User-visible message reporting.
//!
//! All user-facing error text funnels through one hook so the client stays
//! decoupled from whatever renders messages.

/// Sink for messages intended for the user.
pub trait MessageSink: Send + Sync {
    /// Display an error message.
    fn show_error(&self, message: &str);
}

/// Default sink that forwards messages to the `log` facade.
#[derive(Debug, Default)]
pub struct LogMessageSink;

impl MessageSink for LogMessageSink {
    fn show_error(&self, message: &str) {
        log::error!("{message}");
    }
}
