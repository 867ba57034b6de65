//! Domain services for the Playtime admin dashboard.

pub mod audit;
pub mod notification;

pub use audit::AuditLogBuilder;
pub use notification::{Notifier, RecordingNotifier, Toast, ToastVariant, TracingNotifier};
