//! Bot configuration CRUD, test runs and logs.

use std::sync::Arc;

use chrono::Utc;
use domain::models::{
    AuditAction, BotConfig, BotConfigPatch, BotLog, BotStats, BotStatus, LogLevel, NewBotConfig,
};
use domain::services::AuditLogBuilder;
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

use super::{audit_mutation, logged, row, timestamp, zeroed_on_error};
use crate::schema::tables;
use crate::store::{
    decode_row, decode_rows, to_row, DataStore, Direction, Mutation, Query, StoreError,
};

#[derive(Clone)]
pub struct BotConfigRepository {
    store: Arc<dyn DataStore>,
}

impl BotConfigRepository {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    pub async fn list_bot_configs(&self) -> Result<Vec<BotConfig>, StoreError> {
        let rows = logged(
            self.store
                .select(&Query::from(tables::BOT_CONFIGS).order_by("created_at", Direction::Desc))
                .await,
            "list_bot_configs",
        )?;
        decode_rows(rows)
    }

    pub async fn get_bot_config(&self, id: Uuid) -> Result<Option<BotConfig>, StoreError> {
        let rows = logged(
            self.store
                .select(&Query::from(tables::BOT_CONFIGS).eq("id", id.to_string()))
                .await,
            "get_bot_config",
        )?;
        rows.into_iter().next().map(decode_row).transpose()
    }

    /// Create a configuration after validating its name.
    pub async fn create_bot_config(
        &self,
        input: NewBotConfig,
        actor: Option<Uuid>,
    ) -> Result<BotConfig, StoreError> {
        input.validate()?;

        let now = timestamp(Utc::now());
        let config = if input.config.is_null() {
            json!({})
        } else {
            input.config
        };
        let new_row = row(json!({
            "name": input.name.trim(),
            "description": input.description,
            "config": config,
            "status": input.status,
            "created_by": actor,
            "created_at": now,
            "updated_at": now,
        }));

        let inserted = logged(
            self.store.insert(tables::BOT_CONFIGS, vec![new_row]).await,
            "create_bot_config",
        )?;
        let created: BotConfig = inserted
            .into_iter()
            .next()
            .map(decode_row)
            .transpose()?
            .ok_or_else(|| StoreError::NotFound("inserted bot config".into()))?;

        let audit = AuditLogBuilder::new(actor, AuditAction::BotCreated)
            .on_resource("bot_config", created.id)
            .with_detail("name", created.name.clone())
            .build();
        // Audit failure does not undo the create.
        if let Err(e) = self.store.execute(audit_mutation(&audit)?).await {
            tracing::warn!(error = %e, bot_id = %created.id, "Failed to record bot creation");
        }

        tracing::info!(bot_id = %created.id, name = %created.name, "Created bot config");
        Ok(created)
    }

    /// Apply the fields present in `patch`. Returns the updated rows.
    pub async fn update_bot_config(
        &self,
        id: Uuid,
        patch: BotConfigPatch,
    ) -> Result<Vec<BotConfig>, StoreError> {
        patch.validate()?;
        if patch.is_empty() {
            return Err(StoreError::Validation("No fields to update".into()));
        }

        let mut values = to_row(&patch)?;
        if let Some(Value::String(name)) = values.get_mut("name") {
            *name = name.trim().to_string();
        }
        values.insert("updated_at".into(), timestamp(Utc::now()));

        let rows = logged(
            self.store
                .update(Query::from(tables::BOT_CONFIGS).eq("id", id.to_string()), values)
                .await,
            "update_bot_config",
        )?;
        if rows.is_empty() {
            tracing::warn!(bot_id = %id, "No bot config matched update");
        } else {
            tracing::info!(bot_id = %id, "Updated bot config");
        }
        decode_rows(rows)
    }

    /// Delete a configuration together with its logs.
    pub async fn delete_bot_config(
        &self,
        id: Uuid,
        actor: Option<Uuid>,
    ) -> Result<Vec<BotConfig>, StoreError> {
        let audit = AuditLogBuilder::new(actor, AuditAction::BotDeleted)
            .on_resource("bot_config", id)
            .build();
        let result = self
            .store
            .batch(vec![
                Mutation::delete(Query::from(tables::BOT_LOGS).eq("bot_config_id", id.to_string())),
                Mutation::delete(Query::from(tables::BOT_CONFIGS).eq("id", id.to_string()))
                    .required(),
                audit_mutation(&audit)?,
            ])
            .await;

        match result {
            Ok(mut results) => {
                let deleted: Vec<BotConfig> = decode_rows(results.swap_remove(1))?;
                tracing::info!(bot_id = %id, "Deleted bot config");
                Ok(deleted)
            }
            Err(StoreError::NotFound(_)) => {
                tracing::warn!(bot_id = %id, "No bot config matched delete");
                Ok(Vec::new())
            }
            Err(e) => logged(Err(e), "delete_bot_config"),
        }
    }

    pub async fn set_bot_status(
        &self,
        id: Uuid,
        status: BotStatus,
    ) -> Result<Vec<BotConfig>, StoreError> {
        self.update_bot_config(
            id,
            BotConfigPatch {
                status: Some(status),
                ..Default::default()
            },
        )
        .await
    }

    /// Record a test run: one log row plus the `last_tested_at` stamp.
    ///
    /// No bot is contacted.
    pub async fn test_bot_config(
        &self,
        id: Uuid,
        actor: Option<Uuid>,
    ) -> Result<Vec<BotConfig>, StoreError> {
        let now = Utc::now();
        let log = row(json!({
            "bot_config_id": id,
            "level": LogLevel::Info,
            "message": "Test run requested",
            "metadata": { "actor_id": actor },
            "created_at": timestamp(now),
        }));
        let stamp = row(json!({
            "last_tested_at": timestamp(now),
            "updated_at": timestamp(now),
        }));
        let audit = AuditLogBuilder::new(actor, AuditAction::BotTested)
            .on_resource("bot_config", id)
            .build();

        let result = self
            .store
            .batch(vec![
                Mutation::update(Query::from(tables::BOT_CONFIGS).eq("id", id.to_string()), stamp)
                    .required(),
                Mutation::insert(tables::BOT_LOGS, vec![log]),
                audit_mutation(&audit)?,
            ])
            .await;

        match result {
            Ok(mut results) => {
                let tested: Vec<BotConfig> = decode_rows(results.swap_remove(0))?;
                tracing::info!(bot_id = %id, "Recorded bot test run");
                Ok(tested)
            }
            Err(StoreError::NotFound(_)) => {
                tracing::warn!(bot_id = %id, "No bot config matched test run");
                Ok(Vec::new())
            }
            Err(e) => logged(Err(e), "test_bot_config"),
        }
    }

    /// Latest log rows of one configuration.
    pub async fn get_bot_logs(&self, config_id: Uuid, limit: u32) -> Result<Vec<BotLog>, StoreError> {
        let rows = logged(
            self.store
                .select(
                    &Query::from(tables::BOT_LOGS)
                        .eq("bot_config_id", config_id.to_string())
                        .order_by("created_at", Direction::Desc)
                        .limit(limit),
                )
                .await,
            "get_bot_logs",
        )?;
        decode_rows(rows)
    }

    /// Configuration counts per status. Zeroed when the store fails.
    pub async fn get_bot_stats(&self) -> BotStats {
        zeroed_on_error(self.fetch_bot_stats().await, "bots")
    }

    async fn fetch_bot_stats(&self) -> Result<BotStats, StoreError> {
        let by_status =
            |status: BotStatus| Query::from(tables::BOT_CONFIGS).eq("status", status.as_str());
        Ok(BotStats {
            total: self.store.count(&Query::from(tables::BOT_CONFIGS)).await?,
            active: self.store.count(&by_status(BotStatus::Active)).await?,
            inactive: self.store.count(&by_status(BotStatus::Inactive)).await?,
            paused: self.store.count(&by_status(BotStatus::Paused)).await?,
            error: self.store.count(&by_status(BotStatus::Error)).await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::test_support::store;
    use crate::store::MemoryStore;

    fn new_bot(name: &str) -> NewBotConfig {
        NewBotConfig {
            name: name.into(),
            description: Some("Plays the morning rotation".into()),
            config: json!({"interval": 30}),
            status: BotStatus::Inactive,
        }
    }

    async fn created(repo: &BotConfigRepository, name: &str) -> BotConfig {
        repo.create_bot_config(new_bot(name), None).await.unwrap()
    }

    fn repo() -> (Arc<MemoryStore>, BotConfigRepository) {
        let (memory, store) = store();
        (memory, BotConfigRepository::new(store))
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let (memory, repo) = repo();
        let bot = created(&repo, "  Morning bot ").await;
        assert_eq!(bot.name, "Morning bot");
        assert_eq!(bot.config, json!({"interval": 30}));

        let fetched = repo.get_bot_config(bot.id).await.unwrap().unwrap();
        assert_eq!(fetched, bot);
        assert_eq!(memory.rows(tables::AUDIT_LOGS).len(), 1);
    }

    #[tokio::test]
    async fn test_create_rejects_blank_name() {
        let (memory, repo) = repo();
        let err = repo.create_bot_config(new_bot("   "), None).await.unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert_eq!(memory.write_count(), 0);
    }

    #[tokio::test]
    async fn test_update_and_status() {
        let (_, repo) = repo();
        let bot = created(&repo, "Night").await;

        let updated = repo
            .update_bot_config(
                bot.id,
                BotConfigPatch {
                    description: Some("Late shift".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated[0].description.as_deref(), Some("Late shift"));
        assert_eq!(updated[0].name, "Night");

        let active = repo.set_bot_status(bot.id, BotStatus::Active).await.unwrap();
        assert_eq!(active[0].status, BotStatus::Active);

        let stats = repo.get_bot_stats().await;
        assert_eq!(stats.total, 1);
        assert_eq!(stats.active, 1);
        assert_eq!(stats.inactive, 0);
    }

    #[tokio::test]
    async fn test_empty_patch_is_rejected() {
        let (_, repo) = repo();
        let err = repo
            .update_bot_config(Uuid::new_v4(), BotConfigPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[tokio::test]
    async fn test_test_run_logs_and_stamps() {
        let (_, repo) = repo();
        let bot = created(&repo, "Probe").await;
        assert!(bot.last_tested_at.is_none());

        let tested = repo.test_bot_config(bot.id, None).await.unwrap();
        assert_eq!(tested.len(), 1);
        assert!(tested[0].last_tested_at.is_some());

        let logs = repo.get_bot_logs(bot.id, 10).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].level, LogLevel::Info);
    }

    #[tokio::test]
    async fn test_test_run_on_missing_bot_writes_nothing() {
        let (memory, repo) = repo();
        let tested = repo.test_bot_config(Uuid::new_v4(), None).await.unwrap();
        assert!(tested.is_empty());
        assert!(memory.rows(tables::BOT_LOGS).is_empty());
    }

    #[tokio::test]
    async fn test_delete_removes_logs() {
        let (memory, repo) = repo();
        let bot = created(&repo, "Doomed").await;
        let keep = created(&repo, "Keeper").await;
        repo.test_bot_config(bot.id, None).await.unwrap();
        repo.test_bot_config(keep.id, None).await.unwrap();

        let deleted = repo.delete_bot_config(bot.id, None).await.unwrap();
        assert_eq!(deleted.len(), 1);
        assert_eq!(memory.rows(tables::BOT_LOGS).len(), 1);
        assert_eq!(repo.list_bot_configs().await.unwrap().len(), 1);

        let again = repo.delete_bot_config(bot.id, None).await.unwrap();
        assert!(again.is_empty());
    }

    #[tokio::test]
    async fn test_stats_zeroed_on_failure() {
        let (memory, repo) = repo();
        memory.set_failing(true);
        assert_eq!(repo.get_bot_stats().await, BotStats::default());
    }
}
