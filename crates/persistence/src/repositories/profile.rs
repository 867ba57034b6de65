//! Self-service profile access for the end-user dashboard.

use std::sync::Arc;

use chrono::Utc;
use domain::models::{ListeningSession, Profile, ProfileUpdate, UserReward};
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

use super::{logged, row, timestamp};
use crate::schema::tables;
use crate::store::{decode_row, decode_rows, to_row, DataStore, Direction, Query, StoreError};

#[derive(Clone)]
pub struct ProfileRepository {
    store: Arc<dyn DataStore>,
}

impl ProfileRepository {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    pub async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>, StoreError> {
        let rows = logged(
            self.store
                .select(&Query::from(tables::PROFILES).eq("id", user_id.to_string()))
                .await,
            "get_profile",
        )?;
        rows.into_iter().next().map(decode_row).transpose()
    }

    /// Apply a validated self-service edit. Text fields are trimmed.
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        update: ProfileUpdate,
    ) -> Result<Profile, StoreError> {
        update.validate()?;
        let mut values = to_row(&update)?;
        if values.is_empty() {
            return Err(StoreError::Validation("No fields to update".into()));
        }
        for value in values.values_mut() {
            if let Value::String(text) = value {
                *text = text.trim().to_string();
            }
        }
        values.insert("updated_at".into(), timestamp(Utc::now()));
        self.patch(user_id, values, "update_profile").await
    }

    /// Counters for a user. Zeroed when the user has no rewards row.
    pub async fn get_rewards(&self, user_id: Uuid) -> Result<UserReward, StoreError> {
        let rows = logged(
            self.store
                .select(&Query::from(tables::USER_REWARDS).eq("user_id", user_id.to_string()))
                .await,
            "get_rewards",
        )?;
        Ok(rows
            .into_iter()
            .next()
            .map(decode_row)
            .transpose()?
            .unwrap_or_else(|| UserReward::empty(user_id)))
    }

    pub async fn list_listening_sessions(
        &self,
        user_id: Uuid,
        limit: u32,
    ) -> Result<Vec<ListeningSession>, StoreError> {
        let rows = logged(
            self.store
                .select(
                    &Query::from(tables::LISTENING_SESSIONS)
                        .eq("user_id", user_id.to_string())
                        .order_by("started_at", Direction::Desc)
                        .limit(limit),
                )
                .await,
            "list_listening_sessions",
        )?;
        decode_rows(rows)
    }

    /// Clear the linked music account.
    pub async fn disconnect_spotify(&self, user_id: Uuid) -> Result<Profile, StoreError> {
        let values = row(json!({
            "spotify_connected": false,
            "spotify_user_id": null,
            "spotify_display_name": null,
            "updated_at": timestamp(Utc::now()),
        }));
        let profile = self.patch(user_id, values, "disconnect_spotify").await?;
        tracing::info!(user_id = %user_id, "Disconnected Spotify account");
        Ok(profile)
    }

    async fn patch(
        &self,
        user_id: Uuid,
        values: crate::store::Row,
        operation: &str,
    ) -> Result<Profile, StoreError> {
        let rows = logged(
            self.store
                .update(Query::from(tables::PROFILES).eq("id", user_id.to_string()), values)
                .await,
            operation,
        )?;
        let updated = rows
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound(format!("profile {}", user_id)))?;
        decode_row(updated)
    }
}
