//! Profile, role and user-list models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use super::kyc::KycStatus;

/// Row of the `profiles` table. One per authenticated principal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub spotify_connected: bool,
    #[serde(default)]
    pub spotify_user_id: Option<String>,
    #[serde(default)]
    pub spotify_display_name: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_true() -> bool {
    true
}

impl Profile {
    /// Name to show in tables: full name, then email, then a placeholder.
    pub fn display_name(&self) -> String {
        self.full_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .or(self.email.as_deref())
            .unwrap_or(super::common::UNKNOWN_USER)
            .to_string()
    }
}

/// Application role assigned through `user_roles`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AppRole {
    Admin,
    Moderator,
    #[default]
    User,
}

impl AppRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppRole::Admin => "admin",
            AppRole::Moderator => "moderator",
            AppRole::User => "user",
        }
    }

    /// Whether the role may open the admin dashboard.
    pub fn can_access_admin(&self) -> bool {
        matches!(self, AppRole::Admin | AppRole::Moderator)
    }
}

impl FromStr for AppRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(AppRole::Admin),
            "moderator" => Ok(AppRole::Moderator),
            "user" => Ok(AppRole::User),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

impl std::fmt::Display for AppRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row of the `user_roles` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRole {
    pub user_id: Uuid,
    pub role: AppRole,
}

/// Self-service profile edit from the user dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[validate(length(min = 1, max = 100, message = "Full name must be between 1 and 100 characters"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,

    #[validate(length(max = 32, message = "Phone number is too long"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[validate(length(max = 500, message = "Bio must be at most 500 characters"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,

    #[validate(url(message = "Avatar URL must be a valid URL"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// Profile reshaped for the admin users table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub status: String,
    pub kyc_status: KycStatus,
    pub role: AppRole,
    pub total_points: i64,
    pub level: i32,
    pub spotify_connected: bool,
    pub join_date: String,
}

/// Single user with related records for the detail panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetail {
    pub profile: Profile,
    pub role: AppRole,
    pub rewards: super::reward::UserReward,
    pub kyc_documents: Vec<super::kyc::KycDocument>,
}

/// Aggregate counters for the users page header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_users: i64,
    pub active_users: i64,
    pub inactive_users: i64,
    pub new_this_month: i64,
    pub verified_users: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    fn profile(full_name: Option<&str>, email: Option<&str>) -> Profile {
        Profile {
            id: Uuid::new_v4(),
            email: email.map(str::to_string),
            full_name: full_name.map(str::to_string),
            phone: None,
            bio: None,
            avatar_url: None,
            is_active: true,
            spotify_connected: false,
            spotify_user_id: None,
            spotify_display_name: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn test_display_name_fallbacks() {
        assert_eq!(profile(Some("John"), Some("j@x.io")).display_name(), "John");
        assert_eq!(profile(Some(" "), Some("j@x.io")).display_name(), "j@x.io");
        assert_eq!(profile(None, None).display_name(), "Unknown User");
    }

    #[test]
    fn test_profile_deserializes_with_defaults() {
        let json = serde_json::json!({
            "id": Uuid::new_v4(),
            "email": "john@example.com",
            "created_at": "2024-01-05T14:03:00+00:00"
        });
        let p: Profile = serde_json::from_value(json).unwrap();
        assert!(p.is_active);
        assert!(!p.spotify_connected);
        assert_eq!(p.full_name, None);
    }

    #[test]
    fn test_role_access() {
        assert!(AppRole::Admin.can_access_admin());
        assert!(AppRole::Moderator.can_access_admin());
        assert!(!AppRole::User.can_access_admin());
        assert_eq!("ADMIN".parse::<AppRole>().unwrap(), AppRole::Admin);
    }

    #[test]
    fn test_profile_update_validation() {
        let ok = ProfileUpdate {
            full_name: Some("Jane Doe".into()),
            ..Default::default()
        };
        assert!(ok.validate().is_ok());

        let bad = ProfileUpdate {
            full_name: Some(String::new()),
            avatar_url: Some("not a url".into()),
            ..Default::default()
        };
        let errors = bad.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("full_name"));
        assert!(errors.field_errors().contains_key("avatar_url"));
    }
}
