//! User-facing notifications.
//!
//! Components report outcomes as structured [`Notification`]s to a
//! [`NotificationSink`]. Sinks:
//! - [`TracingSink`] writes them to the log
//! - [`ChannelSink`] forwards them over an mpsc channel to a UI task
//! - [`MultiSink`] fans out to several sinks

use aurum_domain::error::{ActionError, ErrorKind};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Notification severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// A structured event for the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// What the notification is about, e.g. `"stake"` or `"pool-snapshot"`.
    pub kind: String,
    pub message: String,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl Notification {
    pub fn new(kind: impl Into<String>, message: impl Into<String>, severity: Severity) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            severity,
            error_kind: None,
        }
    }

    pub fn info(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(kind, message, Severity::Info)
    }

    pub fn success(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(kind, message, Severity::Success)
    }

    pub fn warning(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(kind, message, Severity::Warning)
    }

    /// Error notification carrying the error's message and kind.
    pub fn from_error(kind: impl Into<String>, err: &ActionError) -> Self {
        Self {
            kind: kind.into(),
            message: err.to_string(),
            severity: Severity::Error,
            error_kind: Some(err.kind()),
        }
    }
}

/// Receiver of notifications.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Sink writing notifications to the tracing log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, n: Notification) {
        match n.severity {
            Severity::Info | Severity::Success => {
                info!(kind = %n.kind, severity = ?n.severity, "{}", n.message);
            }
            Severity::Warning => warn!(kind = %n.kind, "{}", n.message),
            Severity::Error => error!(kind = %n.kind, error_kind = ?n.error_kind, "{}", n.message),
        }
    }
}

/// Sink forwarding notifications over a bounded channel.
///
/// Notifications are dropped with a warning when the receiver lags.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<Notification>,
}

impl ChannelSink {
    /// Creates a sink and the receiver it feeds.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Notification>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl NotificationSink for ChannelSink {
    fn notify(&self, notification: Notification) {
        if let Err(e) = self.tx.try_send(notification) {
            warn!(error = %e, "Dropping notification");
        }
    }
}

/// Sink forwarding to several sinks in order.
#[derive(Clone, Default)]
pub struct MultiSink {
    sinks: Vec<Arc<dyn NotificationSink>>,
}

impl MultiSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl NotificationSink for MultiSink {
    fn notify(&self, notification: Notification) {
        for sink in &self.sinks {
            sink.notify(notification.clone());
        }
    }
}
