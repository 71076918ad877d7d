//! User-facing notifications (toasts).
//!
//! The HTTP client emits exactly one error notification per failed request,
//! and mutations emit one success notification per successful write; view
//! code subscribes to the hub and renders whatever arrives. Queries never
//! notify.

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            created_at: Utc::now(),
        }
    }
}

/// Fan-out channel for notifications.
///
/// Cloning the hub is cheap; all clones feed the same subscribers. Emitting
/// with no subscribers is a no-op rather than an error, so library code can
/// notify unconditionally.
#[derive(Debug, Clone)]
pub struct NotificationHub {
    tx: broadcast::Sender<Notification>,
}

impl NotificationHub {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(64);
        Self { tx }
    }

    /// Subscribes to notifications emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    pub fn success(&self, message: impl Into<String>) {
        let _ = self
            .tx
            .send(Notification::new(NotificationLevel::Success, message));
    }

    pub fn error(&self, message: impl Into<String>) {
        let _ = self
            .tx
            .send(Notification::new(NotificationLevel::Error, message));
    }
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_notifications() {
        let hub = NotificationHub::new();
        let mut rx = hub.subscribe();

        hub.error("boom");
        hub.success("done");

        let first = rx.recv().await.expect("channel open");
        assert_eq!(first.level, NotificationLevel::Error);
        assert_eq!(first.message, "boom");

        let second = rx.recv().await.expect("channel open");
        assert_eq!(second.level, NotificationLevel::Success);
        assert_eq!(second.message, "done");
    }

    #[tokio::test]
    async fn test_emit_without_subscribers_is_noop() {
        let hub = NotificationHub::new();
        // Must not panic or error.
        hub.error("nobody listening");

        // A subscriber created afterwards sees only later messages.
        let mut rx = hub.subscribe();
        hub.success("later");
        let seen = rx.recv().await.expect("channel open");
        assert_eq!(seen.message, "later");
    }

    #[tokio::test]
    async fn test_clones_share_subscribers() {
        let hub = NotificationHub::new();
        let clone = hub.clone();
        let mut rx = hub.subscribe();

        clone.error("from clone");
        let seen = rx.recv().await.expect("channel open");
        assert_eq!(seen.message, "from clone");
    }
}
