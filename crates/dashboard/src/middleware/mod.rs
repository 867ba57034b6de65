//! HTTP middleware components.

pub mod auth;
pub mod logging;
pub mod metrics;
pub mod request_id;

pub use auth::{require_admin, AdminUser};
pub use metrics::{init_metrics, metrics_handler, metrics_middleware};
pub use request_id::{request_id, RequestId, REQUEST_ID_HEADER};
