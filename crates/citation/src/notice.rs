//! User-facing notices.
//!
//! Operations report what the user should see (a missing entry, a folder that
//! cannot be found, a batch summary) through a [`Notifier`]. How notices are
//! displayed is up to the host application.

/// Sink for user-facing messages.
pub trait Notifier: Send + Sync {
    fn info(&self, message: &str);
    fn error(&self, message: &str);
}

/// Forwards notices to [`tracing`].
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;
impl Notifier for TracingNotifier {
    fn info(&self, message: &str) {
        tracing::info!(notice = %message, "Notice");
    }

    fn error(&self, message: &str) {
        tracing::error!(notice = %message, "Notice");
    }
}
