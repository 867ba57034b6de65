//! User-facing notifications ("toasts") emitted by dashboard actions.
//!
//! Every action surfaces exactly one notification per attempt. The sink is a
//! trait so the UI shell, the HTTP layer and tests can each collect them.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// Visual variant of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ToastVariant {
    /// Success or neutral information.
    #[default]
    Default,
    /// Failed operation.
    Destructive,
    /// Validation problem or a write that matched nothing.
    Warning,
}

impl std::fmt::Display for ToastVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToastVariant::Default => write!(f, "default"),
            ToastVariant::Destructive => write!(f, "destructive"),
            ToastVariant::Warning => write!(f, "warning"),
        }
    }
}

/// A single notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toast {
    pub title: String,
    pub description: String,
    pub variant: ToastVariant,
}

impl Toast {
    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant: ToastVariant::Default,
        }
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant: ToastVariant::Destructive,
        }
    }

    pub fn warning(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant: ToastVariant::Warning,
        }
    }
}

/// Sink for user-facing notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, toast: Toast);
}

/// Notifier that writes notifications to the log.
///
/// Used by the HTTP server, where there is no toast surface.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, toast: Toast) {
        match toast.variant {
            ToastVariant::Default => tracing::info!(
                title = %toast.title,
                description = %toast.description,
                "Notification"
            ),
            ToastVariant::Warning => tracing::warn!(
                title = %toast.title,
                description = %toast.description,
                "Notification"
            ),
            ToastVariant::Destructive => tracing::error!(
                title = %toast.title,
                description = %toast.description,
                "Notification"
            ),
        }
    }
}

/// Notifier that records every notification in memory.
///
/// Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    toasts: Arc<Mutex<Vec<Toast>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// All notifications recorded so far, oldest first.
    pub fn toasts(&self) -> Vec<Toast> {
        self.toasts.lock().map(|t| t.clone()).unwrap_or_default()
    }

    pub fn last(&self) -> Option<Toast> {
        self.toasts().pop()
    }

    pub fn len(&self) -> usize {
        self.toasts.lock().map(|t| t.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut toasts) = self.toasts.lock() {
            toasts.clear();
        }
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, toast: Toast) {
        tracing::debug!(title = %toast.title, variant = %toast.variant, "Recorded notification");
        if let Ok(mut toasts) = self.toasts.lock() {
            toasts.push(toast);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toast_constructors() {
        assert_eq!(Toast::success("a", "b").variant, ToastVariant::Default);
        assert_eq!(Toast::error("a", "b").variant, ToastVariant::Destructive);
        assert_eq!(Toast::warning("a", "b").variant, ToastVariant::Warning);
    }

    #[test]
    fn test_recording_notifier_shares_buffer() {
        let notifier = RecordingNotifier::new();
        let clone = notifier.clone();
        clone.notify(Toast::success("Saved", "Settings saved"));
        notifier.notify(Toast::error("Error", "Boom"));

        assert_eq!(notifier.len(), 2);
        assert_eq!(notifier.last().unwrap().title, "Error");
        notifier.clear();
        assert!(clone.is_empty());
    }

    #[test]
    fn test_tracing_notifier_does_not_panic() {
        let notifier = TracingNotifier;
        notifier.notify(Toast::warning("Careful", "Nothing matched"));
    }

    #[test]
    fn test_variant_display() {
        assert_eq!(ToastVariant::Destructive.to_string(), "destructive");
    }
}
