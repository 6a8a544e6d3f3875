//! User-facing notifications (toasts)

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::config::NotificationConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    /// How long the front-end should keep it on screen
    pub duration: Duration,
}

/// Sink for notifications
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Publishes notifications on an unbounded channel read by the front-end
#[derive(Clone)]
pub struct ChannelNotifier {
    sender: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notification: Notification) {
        if self.sender.send(notification).is_err() {
            tracing::debug!("Notification dropped, no front-end listening");
        }
    }
}

/// Builds notifications with the configured display durations
#[derive(Clone)]
pub struct Notifications {
    sink: Arc<dyn Notifier>,
    config: NotificationConfig,
}

impl Notifications {
    pub fn new(sink: Arc<dyn Notifier>, config: NotificationConfig) -> Self {
        Self { sink, config }
    }

    pub fn success(&self, message: impl Into<String>) {
        self.sink.notify(Notification {
            level: NotificationLevel::Success,
            message: message.into(),
            duration: self.config.success_duration(),
        });
    }

    pub fn error(&self, message: impl Into<String>) {
        self.sink.notify(Notification {
            level: NotificationLevel::Error,
            message: message.into(),
            duration: self.config.error_duration(),
        });
    }
}

/// Keeps every notification in memory
#[cfg(test)]
#[derive(Default)]
pub(crate) struct RecordingNotifier {
    seen: std::sync::Mutex<Vec<Notification>>,
}

#[cfg(test)]
impl RecordingNotifier {
    pub(crate) fn all(&self) -> Vec<Notification> {
        self.seen.lock().unwrap().clone()
    }

    pub(crate) fn messages(&self) -> Vec<String> {
        self.all().into_iter().map(|n| n.message).collect()
    }
}

#[cfg(test)]
impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.seen.lock().unwrap().push(notification);
    }
}
