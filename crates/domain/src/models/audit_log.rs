//! Audit log domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::str::FromStr;
use uuid::Uuid;

/// Audited admin actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuditAction {
    #[serde(rename = "user.profile_updated")]
    UserProfileUpdated,
    #[serde(rename = "user.status_changed")]
    UserStatusChanged,
    #[serde(rename = "kyc.status_changed")]
    KycStatusChanged,
    #[serde(rename = "transaction.status_changed")]
    TransactionStatusChanged,
    #[serde(rename = "bot.created")]
    BotCreated,
    #[serde(rename = "bot.updated")]
    BotUpdated,
    #[serde(rename = "bot.deleted")]
    BotDeleted,
    #[serde(rename = "bot.tested")]
    BotTested,
    #[serde(rename = "setting.updated")]
    SettingUpdated,
    #[serde(rename = "playlist.created")]
    PlaylistCreated,
    #[serde(rename = "playlist.deleted")]
    PlaylistDeleted,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::UserProfileUpdated => "user.profile_updated",
            AuditAction::UserStatusChanged => "user.status_changed",
            AuditAction::KycStatusChanged => "kyc.status_changed",
            AuditAction::TransactionStatusChanged => "transaction.status_changed",
            AuditAction::BotCreated => "bot.created",
            AuditAction::BotUpdated => "bot.updated",
            AuditAction::BotDeleted => "bot.deleted",
            AuditAction::BotTested => "bot.tested",
            AuditAction::SettingUpdated => "setting.updated",
            AuditAction::PlaylistCreated => "playlist.created",
            AuditAction::PlaylistDeleted => "playlist.deleted",
        }
    }

    /// Sentence fragment used by the activity feed.
    pub fn describe(&self) -> &'static str {
        match self {
            AuditAction::UserProfileUpdated => "updated a user profile",
            AuditAction::UserStatusChanged => "changed a user's status",
            AuditAction::KycStatusChanged => "reviewed a KYC document",
            AuditAction::TransactionStatusChanged => "changed a transaction status",
            AuditAction::BotCreated => "created a bot configuration",
            AuditAction::BotUpdated => "updated a bot configuration",
            AuditAction::BotDeleted => "deleted a bot configuration",
            AuditAction::BotTested => "tested a bot configuration",
            AuditAction::SettingUpdated => "updated a setting",
            AuditAction::PlaylistCreated => "created a playlist",
            AuditAction::PlaylistDeleted => "deleted a playlist",
        }
    }
}

impl FromStr for AuditAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user.profile_updated" => Ok(AuditAction::UserProfileUpdated),
            "user.status_changed" => Ok(AuditAction::UserStatusChanged),
            "kyc.status_changed" => Ok(AuditAction::KycStatusChanged),
            "transaction.status_changed" => Ok(AuditAction::TransactionStatusChanged),
            "bot.created" => Ok(AuditAction::BotCreated),
            "bot.updated" => Ok(AuditAction::BotUpdated),
            "bot.deleted" => Ok(AuditAction::BotDeleted),
            "bot.tested" => Ok(AuditAction::BotTested),
            "setting.updated" => Ok(AuditAction::SettingUpdated),
            "playlist.created" => Ok(AuditAction::PlaylistCreated),
            "playlist.deleted" => Ok(AuditAction::PlaylistDeleted),
            _ => Err(format!("Unknown audit action: {}", s)),
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row of the `audit_logs` table.
///
/// `action` stays a string so rows written by other tools still decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLog {
    pub id: Uuid,
    #[serde(default)]
    pub actor_id: Option<Uuid>,
    pub action: String,
    pub resource_type: String,
    #[serde(default)]
    pub resource_id: Option<String>,
    #[serde(default)]
    pub details: JsonValue,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for an audit log row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewAuditLog {
    pub actor_id: Option<Uuid>,
    pub action: AuditAction,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub details: JsonValue,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_serializes_dotted() {
        let json = serde_json::to_value(AuditAction::KycStatusChanged).unwrap();
        assert_eq!(json, serde_json::json!("kyc.status_changed"));
    }

    #[test]
    fn test_action_round_trip() {
        for action in [
            AuditAction::UserProfileUpdated,
            AuditAction::BotTested,
            AuditAction::PlaylistDeleted,
        ] {
            assert_eq!(action.as_str().parse::<AuditAction>().unwrap(), action);
        }
        assert!("device.create".parse::<AuditAction>().is_err());
    }
}
