//! User-facing notifications
//!
//! [`Notifications`] is the [`Notifier`] handed to the daemon client. Each
//! message is split into display lines, timestamped and queued for whatever
//! surface drains the receiver.

use chrono::{DateTime, Local};
use serde::Serialize;
use tokio::sync::mpsc;

use fbridge_core::prelude::*;
use fbridge_daemon::Notifier;

/// A queued notification
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub timestamp: DateTime<Local>,
    pub lines: Vec<String>,
}

impl Notification {
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// Split a message into trimmed, non-empty lines
pub fn format_message(message: &str) -> Vec<String> {
    message
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Notification queue
pub struct Notifications {
    tx: mpsc::UnboundedSender<Notification>,
}

impl Notifications {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queue a message; blank messages are dropped
    pub fn show(&self, message: &str) {
        let lines = format_message(message);
        if lines.is_empty() {
            return;
        }

        info!("notification: {}", lines.join(" | "));
        let notification = Notification {
            timestamp: Local::now(),
            lines,
        };
        if self.tx.send(notification).is_err() {
            debug!("Notification receiver dropped");
        }
    }
}

impl Notifier for Notifications {
    fn notify(&self, message: &str) {
        self.show(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_message() {
        assert_eq!(
            format_message("  first line \n\n second\r\n   \n"),
            vec!["first line", "second"]
        );
        assert!(format_message(" \n ").is_empty());
    }

    #[tokio::test]
    async fn test_notify_queues_message() {
        let (notifications, mut rx) = Notifications::new();
        notifications.notify("Android SDK not found.\nRun flutter doctor.");

        let notification = rx.recv().await.unwrap();
        assert_eq!(
            notification.lines,
            vec!["Android SDK not found.", "Run flutter doctor."]
        );
        assert_eq!(notification.text(), "Android SDK not found.\nRun flutter doctor.");
    }

    #[tokio::test]
    async fn test_blank_message_is_dropped() {
        let (notifications, mut rx) = Notifications::new();
        notifications.notify("   ");
        notifications.notify("real");

        assert_eq!(rx.recv().await.unwrap().lines, vec!["real"]);
    }

    #[test]
    fn test_notify_after_receiver_dropped() {
        let (notifications, rx) = Notifications::new();
        drop(rx);
        notifications.notify("nobody listening");
    }
}
