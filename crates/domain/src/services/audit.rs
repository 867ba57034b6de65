//! Audit log entry construction.
//!
//! Repositories submit the built entry in the same batch as the change it
//! describes.

use chrono::Utc;
use serde_json::{json, Map, Value as JsonValue};
use uuid::Uuid;

use crate::models::{AuditAction, NewAuditLog};

/// Builder for creating audit log entries with a fluent API.
#[derive(Debug, Clone)]
pub struct AuditLogBuilder {
    actor_id: Option<Uuid>,
    action: AuditAction,
    resource_type: String,
    resource_id: Option<String>,
    details: Map<String, JsonValue>,
}

impl AuditLogBuilder {
    /// Create a builder for an action performed by `actor_id` (or the system).
    pub fn new(actor_id: Option<Uuid>, action: AuditAction) -> Self {
        Self {
            actor_id,
            action,
            resource_type: String::new(),
            resource_id: None,
            details: Map::new(),
        }
    }

    /// Set the resource being acted upon.
    pub fn on_resource(
        mut self,
        resource_type: impl Into<String>,
        resource_id: impl ToString,
    ) -> Self {
        self.resource_type = resource_type.into();
        self.resource_id = Some(resource_id.to_string());
        self
    }

    /// Record a field change.
    pub fn with_change(
        mut self,
        field: impl Into<String>,
        old: Option<JsonValue>,
        new: Option<JsonValue>,
    ) -> Self {
        self.details
            .insert(field.into(), json!({ "old": old, "new": new }));
        self
    }

    /// Attach an arbitrary detail value.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> NewAuditLog {
        NewAuditLog {
            actor_id: self.actor_id,
            action: self.action,
            resource_type: self.resource_type,
            resource_id: self.resource_id,
            details: JsonValue::Object(self.details),
            created_at: Utc::now(),
        }
    }
}
