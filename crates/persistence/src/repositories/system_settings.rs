//! Key/value system settings with typed payloads per category.

use std::sync::Arc;

use chrono::Utc;
use domain::models::{AuditAction, SettingCategory, SettingPayload, SystemSetting};
use domain::services::AuditLogBuilder;
use serde_json::{json, Value};
use shared::validation::validate_setting_key;
use uuid::Uuid;

use super::{audit_mutation, logged, row, timestamp};
use crate::schema::tables;
use crate::store::{decode_row, decode_rows, DataStore, Direction, Mutation, Query, StoreError};

#[derive(Clone)]
pub struct SystemSettingsRepository {
    store: Arc<dyn DataStore>,
}

impl SystemSettingsRepository {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    /// All settings, or those of one category, ordered by key.
    pub async fn list_settings(
        &self,
        category: Option<SettingCategory>,
    ) -> Result<Vec<SystemSetting>, StoreError> {
        let mut query = Query::from(tables::SYSTEM_SETTINGS).order_by("key", Direction::Asc);
        if let Some(category) = category {
            query = query.eq("category", category.as_str());
        }
        let rows = logged(self.store.select(&query).await, "list_settings")?;
        decode_rows(rows)
    }

    pub async fn get_setting(&self, key: &str) -> Result<Option<SystemSetting>, StoreError> {
        let rows = logged(
            self.store
                .select(&Query::from(tables::SYSTEM_SETTINGS).eq("key", key))
                .await,
            "get_setting",
        )?;
        rows.into_iter().next().map(decode_row).transpose()
    }

    /// Insert or replace a setting. Last write wins.
    ///
    /// A `None` description keeps the stored one.
    pub async fn update_setting(
        &self,
        key: &str,
        value: Value,
        description: Option<&str>,
        category: SettingCategory,
        actor: Option<Uuid>,
    ) -> Result<SystemSetting, StoreError> {
        validate_setting_key(key).map_err(|e| StoreError::Validation(e.to_string()))?;

        let mut values = row(json!({
            "key": key,
            "value": value,
            "category": category.as_str(),
            "updated_by": actor,
            "updated_at": timestamp(Utc::now()),
        }));
        if let Some(description) = description {
            values.insert("description".into(), json!(description));
        }
        let audit = AuditLogBuilder::new(actor, AuditAction::SettingUpdated)
            .on_resource("system_setting", key)
            .with_detail("category", category.as_str())
            .build();

        let mut results = logged(
            self.store
                .batch(vec![
                    Mutation::upsert(tables::SYSTEM_SETTINGS, vec![values], &["key"]),
                    audit_mutation(&audit)?,
                ])
                .await,
            "update_setting",
        )?;
        let saved = results
            .swap_remove(0)
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound(format!("setting {}", key)))?;

        tracing::info!(key = %key, category = %category, "Saved setting");
        decode_row(saved)
    }

    /// Decode a setting into its category's payload, validating it.
    pub async fn get_typed(&self, key: &str) -> Result<Option<SettingPayload>, StoreError> {
        let Some(setting) = self.get_setting(key).await? else {
            return Ok(None);
        };
        SettingPayload::decode(setting.category, setting.value)
            .map(Some)
            .map_err(|e| {
                tracing::warn!(key = %key, error = %e, "Stored setting failed to decode");
                StoreError::Validation(e.to_string())
            })
    }

    /// Validate and store a typed payload under its category.
    pub async fn put_typed(
        &self,
        key: &str,
        payload: &SettingPayload,
        actor: Option<Uuid>,
    ) -> Result<SystemSetting, StoreError> {
        payload.validate()?;
        let value = payload.to_value()?;
        self.update_setting(key, value, None, payload.category(), actor)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::test_support::store;
    use domain::models::{FaqEntry, RewardConfig};

    #[tokio::test]
    async fn test_upsert_is_last_write_wins() {
        let (memory, store) = store();
        let repo = SystemSettingsRepository::new(store);

        repo.update_setting(
            "maintenance_mode",
            json!(false),
            Some("Blocks sign-ins"),
            SettingCategory::General,
            None,
        )
        .await
        .unwrap();
        let saved = repo
            .update_setting("maintenance_mode", json!(true), None, SettingCategory::General, None)
            .await
            .unwrap();

        assert_eq!(saved.value, json!(true));
        assert_eq!(saved.description.as_deref(), Some("Blocks sign-ins"));
        assert_eq!(memory.rows(tables::SYSTEM_SETTINGS).len(), 1);
        assert_eq!(memory.rows(tables::AUDIT_LOGS).len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_key_is_rejected() {
        let (memory, store) = store();
        let repo = SystemSettingsRepository::new(store);
        let err = repo
            .update_setting("Bad Key", json!(1), None, SettingCategory::General, None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert_eq!(memory.write_count(), 0);
    }

    #[tokio::test]
    async fn test_list_by_category() {
        let (_, store) = store();
        let repo = SystemSettingsRepository::new(store);
        repo.update_setting("b_key", json!(1), None, SettingCategory::General, None)
            .await
            .unwrap();
        repo.update_setting("a_key", json!(2), None, SettingCategory::General, None)
            .await
            .unwrap();
        repo.put_typed("faqs", &SettingPayload::Faq(vec![]), None)
            .await
            .unwrap();

        let general = repo
            .list_settings(Some(SettingCategory::General))
            .await
            .unwrap();
        let keys: Vec<&str> = general.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, vec!["a_key", "b_key"]);
        assert_eq!(repo.list_settings(None).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_typed_round_trip_through_store() {
        let (_, store) = store();
        let repo = SystemSettingsRepository::new(store);
        let config = RewardConfig {
            points_per_minute: 2.0,
            ..Default::default()
        };
        repo.put_typed("reward_config", &SettingPayload::Rewards(config.clone()), None)
            .await
            .unwrap();

        let loaded = repo.get_typed("reward_config").await.unwrap();
        assert_eq!(loaded, Some(SettingPayload::Rewards(config)));
        assert_eq!(repo.get_typed("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_put_typed_rejects_invalid_payload() {
        let (memory, store) = store();
        let repo = SystemSettingsRepository::new(store);
        let payload = SettingPayload::Faq(vec![FaqEntry {
            question: String::new(),
            answer: "Yes".into(),
            order: 0,
        }]);
        let err = repo.put_typed("faqs", &payload, None).await.unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert_eq!(memory.write_count(), 0);
    }

    #[tokio::test]
    async fn test_corrupt_stored_value_fails_decode() {
        let (memory, store) = store();
        memory
            .seed(
                tables::SYSTEM_SETTINGS,
                vec![json!({"key": "page_home", "category": "cms", "value": [1, 2, 3]})],
            )
            .unwrap();
        let repo = SystemSettingsRepository::new(store);
        let err = repo.get_typed("page_home").await.unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }
}
