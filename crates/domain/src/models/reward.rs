//! Reward, listening and points models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Row of the `user_rewards` table: aggregate counters per user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserReward {
    pub user_id: Uuid,
    #[serde(default)]
    pub total_points: i64,
    /// Seconds of listening time.
    #[serde(default)]
    pub total_listening_time: i64,
    #[serde(default)]
    pub total_sessions: i64,
    #[serde(default = "default_level")]
    pub level: i32,
}

fn default_level() -> i32 {
    1
}

impl UserReward {
    /// Zeroed counters for a user without a rewards row.
    pub fn empty(user_id: Uuid) -> Self {
        Self {
            user_id,
            total_points: 0,
            total_listening_time: 0,
            total_sessions: 0,
            level: default_level(),
        }
    }
}

/// Row of the `reward_transactions` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardTransaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub points: i64,
    #[serde(default)]
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Row of the `listening_sessions` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListeningSession {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(default)]
    pub track_id: Option<Uuid>,
    #[serde(default)]
    pub duration_seconds: i64,
    #[serde(default)]
    pub points_earned: i64,
    pub started_at: DateTime<Utc>,
}

/// Reward thresholds stored under the `rewards` settings category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct RewardConfig {
    #[validate(range(min = 0.0, message = "Points per minute must not be negative"))]
    pub points_per_minute: f64,
    #[validate(range(min = 0, message = "Daily point cap must not be negative"))]
    pub daily_point_cap: i64,
    #[validate(range(min = 0, message = "Minimum session length must not be negative"))]
    pub min_session_seconds: i64,
    #[validate(range(min = 0, message = "Referral bonus must not be negative"))]
    pub referral_bonus: i64,
    /// Points required to reach level `i + 2`; must be strictly increasing.
    #[validate(custom(function = "validate_thresholds"))]
    pub level_thresholds: Vec<i64>,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            points_per_minute: 1.0,
            daily_point_cap: 500,
            min_session_seconds: 30,
            referral_bonus: 100,
            level_thresholds: vec![100, 500, 1_000, 5_000, 10_000],
        }
    }
}

fn validate_thresholds(thresholds: &[i64]) -> Result<(), ValidationError> {
    let increasing = thresholds.windows(2).all(|w| w[0] < w[1]);
    if increasing && thresholds.iter().all(|t| *t > 0) {
        Ok(())
    } else {
        let mut err = ValidationError::new("level_thresholds");
        err.message = Some("Level thresholds must be positive and strictly increasing".into());
        Err(err)
    }
}

impl RewardConfig {
    /// Level reached with `points`, starting at level 1.
    pub fn level_for(&self, points: i64) -> i32 {
        1 + self
            .level_thresholds
            .iter()
            .take_while(|t| points >= **t)
            .count() as i32
    }
}

/// Leaderboard row joined with the user's profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub user_id: Uuid,
    pub name: String,
    pub total_points: i64,
    pub level: i32,
    pub listening_hours: f64,
}

/// Aggregate reward counters for the rewards page header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardStats {
    pub total_points_awarded: i64,
    pub total_listening_hours: f64,
    pub total_sessions: i64,
    pub average_level: f64,
    pub rewarded_users: i64,
}
