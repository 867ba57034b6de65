//! Reward configuration, leaderboard and points ledger.

use std::sync::Arc;

use domain::models::setting::REWARD_CONFIG_KEY;
use domain::models::{
    LeaderboardEntry, RewardConfig, RewardStats, RewardTransaction, SettingCategory,
    SettingPayload, UserReward, UNKNOWN_USER,
};
use serde_json::Value;
use shared::format::seconds_to_hours;
use uuid::Uuid;
use validator::Validate;

use super::{logged, profiles_by_id, zeroed_on_error, SystemSettingsRepository};
use crate::schema::tables;
use crate::store::{decode_rows, DataStore, Direction, Query, StoreError};

#[derive(Clone)]
pub struct RewardSettingsRepository {
    store: Arc<dyn DataStore>,
    settings: SystemSettingsRepository,
}

impl RewardSettingsRepository {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self {
            settings: SystemSettingsRepository::new(store.clone()),
            store,
        }
    }

    /// Current reward configuration, or the defaults when none is stored.
    pub async fn get_reward_config(&self) -> Result<RewardConfig, StoreError> {
        match self.settings.get_typed(REWARD_CONFIG_KEY).await? {
            Some(SettingPayload::Rewards(config)) => Ok(config),
            Some(other) => Err(StoreError::Validation(format!(
                "{} holds a {} setting",
                REWARD_CONFIG_KEY,
                other.category()
            ))),
            None => Ok(RewardConfig::default()),
        }
    }

    /// Change one field of the reward configuration.
    ///
    /// The merged configuration is validated as a whole before it is saved.
    pub async fn update_reward_setting(
        &self,
        key: &str,
        value: Value,
        actor: Option<Uuid>,
    ) -> Result<RewardConfig, StoreError> {
        let current = self.get_reward_config().await?;
        let mut fields = match serde_json::to_value(&current)? {
            Value::Object(fields) => fields,
            _ => return Err(StoreError::Validation("Reward config is not an object".into())),
        };
        if !fields.contains_key(key) {
            return Err(StoreError::Validation(format!("Unknown reward setting: {}", key)));
        }
        fields.insert(key.to_string(), value);

        let merged: RewardConfig = serde_json::from_value(Value::Object(fields))
            .map_err(|e| StoreError::Validation(format!("Invalid value for {}: {}", key, e)))?;
        self.save_reward_config(merged, actor).await
    }

    /// Validate and store a full reward configuration.
    pub async fn save_reward_config(
        &self,
        config: RewardConfig,
        actor: Option<Uuid>,
    ) -> Result<RewardConfig, StoreError> {
        config.validate()?;
        self.settings
            .put_typed(REWARD_CONFIG_KEY, &SettingPayload::Rewards(config.clone()), actor)
            .await?;
        tracing::info!(category = %SettingCategory::Rewards, "Saved reward configuration");
        Ok(config)
    }

    /// Top users by points, ranked from 1.
    pub async fn leaderboard(&self, limit: u32) -> Result<Vec<LeaderboardEntry>, StoreError> {
        logged(self.fetch_leaderboard(limit).await, "leaderboard")
    }

    async fn fetch_leaderboard(&self, limit: u32) -> Result<Vec<LeaderboardEntry>, StoreError> {
        let rewards: Vec<UserReward> = decode_rows(
            self.store
                .select(
                    &Query::from(tables::USER_REWARDS)
                        .order_by("total_points", Direction::Desc)
                        .limit(limit),
                )
                .await?,
        )?;
        let names = profiles_by_id(self.store.as_ref(), rewards.iter().map(|r| r.user_id)).await?;

        Ok(rewards
            .into_iter()
            .enumerate()
            .map(|(i, reward)| LeaderboardEntry {
                rank: i + 1,
                user_id: reward.user_id,
                name: names
                    .get(&reward.user_id)
                    .map(|p| p.display_name())
                    .unwrap_or_else(|| UNKNOWN_USER.into()),
                total_points: reward.total_points,
                level: reward.level,
                listening_hours: seconds_to_hours(reward.total_listening_time),
            })
            .collect())
    }

    /// Totals across all users. Zeroed when the store fails.
    pub async fn get_reward_stats(&self) -> RewardStats {
        zeroed_on_error(self.fetch_reward_stats().await, "rewards")
    }

    async fn fetch_reward_stats(&self) -> Result<RewardStats, StoreError> {
        let rewards: Vec<UserReward> = decode_rows(
            self.store
                .select(&Query::from(tables::USER_REWARDS))
                .await?,
        )?;
        if rewards.is_empty() {
            return Ok(RewardStats::default());
        }
        let listening: i64 = rewards.iter().map(|r| r.total_listening_time).sum();
        let levels: i64 = rewards.iter().map(|r| r.level as i64).sum();
        Ok(RewardStats {
            total_points_awarded: rewards.iter().map(|r| r.total_points).sum(),
            total_listening_hours: seconds_to_hours(listening),
            total_sessions: rewards.iter().map(|r| r.total_sessions).sum(),
            average_level: levels as f64 / rewards.len() as f64,
            rewarded_users: rewards.iter().filter(|r| r.total_points > 0).count() as i64,
        })
    }

    /// Points ledger, newest first, optionally for one user.
    pub async fn list_reward_transactions(
        &self,
        user_id: Option<Uuid>,
        limit: u32,
    ) -> Result<Vec<RewardTransaction>, StoreError> {
        let mut query = Query::from(tables::REWARD_TRANSACTIONS)
            .order_by("created_at", Direction::Desc)
            .limit(limit);
        if let Some(user_id) = user_id {
            query = query.eq("user_id", user_id.to_string());
        }
        let rows = logged(self.store.select(&query).await, "list_reward_transactions")?;
        decode_rows(rows)
    }
}
