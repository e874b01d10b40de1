//! Notification events for mutation outcomes.
//!
//! The board produces success/error events with human-readable messages;
//! how they are displayed is the consumer's concern.

use std::sync::Mutex;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Error,
}

/// A notification-worthy mutation outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub severity: Severity,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }
}

/// Sink for notification events.
///
/// Publishing must never fail or block: a mutation's outcome does not
/// depend on whether anyone is listening.
pub trait NotificationSink: Send + Sync {
    fn publish(&self, notification: Notification);
}

/// Forwards notifications to an unbounded channel for UI consumption.
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<Notification>,
}

impl ChannelSink {
    /// Creates the sink and the receiving end for the UI.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl NotificationSink for ChannelSink {
    fn publish(&self, notification: Notification) {
        // A dropped receiver just means no one is listening anymore.
        let _ = self.sender.send(notification);
    }
}

/// Collects notifications in memory. Intended for tests.
#[derive(Default)]
pub struct MemorySink {
    published: Mutex<Vec<Notification>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drains and returns everything published so far.
    pub fn take(&self) -> Vec<Notification> {
        std::mem::take(&mut self.lock())
    }

    pub fn last(&self) -> Option<Notification> {
        self.lock().last().cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Notification>> {
        self.published.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl NotificationSink for MemorySink {
    fn publish(&self, notification: Notification) {
        self.lock().push(notification);
    }
}
