//! Dashboard analytics models.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Headline counters for the admin overview page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_users: i64,
    pub active_users: i64,
    pub new_users_this_week: i64,
    pub pending_kyc: i64,
    pub total_revenue: f64,
    pub active_bots: i64,
    pub total_listening_hours: f64,
    pub total_points: i64,
}

/// Count for one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: i64,
}

/// Amount for one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyAmount {
    pub date: NaiveDate,
    pub amount: f64,
}

/// Audit log row reshaped for the activity feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityItem {
    pub id: Uuid,
    pub actor: String,
    pub action: String,
    pub resource: String,
    pub time: String,
}
