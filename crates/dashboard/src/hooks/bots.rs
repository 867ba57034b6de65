//! Bot configuration bindings and actions.

use domain::models::{BotConfig, BotConfigPatch, BotLog, BotStats, BotStatus, NewBotConfig};
use uuid::Uuid;

use super::{done, done_unless_empty, ActionResult, ActionRunner, DashboardContext, Refetch};
use crate::query::AsyncQuery;

pub fn use_bot_configs(ctx: &DashboardContext) -> AsyncQuery<Vec<BotConfig>, ()> {
    let repo = ctx.bots();
    AsyncQuery::new(ctx.notifier.clone(), move |_: ()| {
        let repo = repo.clone();
        async move { repo.list_bot_configs().await }
    })
}

/// Log lines of one configuration, bound to `(config_id, limit)`.
pub fn use_bot_logs(ctx: &DashboardContext) -> AsyncQuery<Vec<BotLog>, (Uuid, u32)> {
    let repo = ctx.bots();
    AsyncQuery::new(ctx.notifier.clone(), move |(id, limit): (Uuid, u32)| {
        let repo = repo.clone();
        async move { repo.get_bot_logs(id, limit).await }
    })
}

pub fn use_bot_stats(ctx: &DashboardContext) -> AsyncQuery<BotStats, ()> {
    let repo = ctx.bots();
    AsyncQuery::new(ctx.notifier.clone(), move |_: ()| {
        let repo = repo.clone();
        async move { Ok(repo.get_bot_stats().await) }
    })
}

#[derive(Clone)]
pub struct BotActions {
    ctx: DashboardContext,
    runner: ActionRunner,
}

impl BotActions {
    pub fn new(ctx: &DashboardContext) -> Self {
        Self {
            ctx: ctx.clone(),
            runner: ActionRunner::new("bots", ctx.notifier.clone()),
        }
    }

    pub fn with_refetch(mut self, refetch: Refetch) -> Self {
        self.runner.set_refetch(refetch);
        self
    }

    pub fn loading(&self) -> bool {
        self.runner.loading()
    }

    pub async fn create(&self, input: NewBotConfig, actor: Option<Uuid>) -> ActionResult<BotConfig> {
        if input.name.trim().is_empty() {
            return self.runner.reject("Name Required", "Please enter a bot name");
        }
        let repo = self.ctx.bots();
        self.runner
            .run(repo.create_bot_config(input, actor), |bot| {
                done("Success", format!("Bot \"{}\" created", bot.name))
            })
            .await
    }

    pub async fn update(&self, id: Uuid, patch: BotConfigPatch) -> bool {
        if patch.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return self
                .runner
                .reject::<()>("Name Required", "Please enter a bot name")
                .success;
        }
        let repo = self.ctx.bots();
        self.runner
            .run(repo.update_bot_config(id, patch), |rows| {
                done_unless_empty(rows, "Success", "Bot configuration updated", "Bot not found")
            })
            .await
            .success
    }

    pub async fn delete(&self, id: Uuid, actor: Option<Uuid>) -> bool {
        let repo = self.ctx.bots();
        self.runner
            .run(repo.delete_bot_config(id, actor), |rows| {
                done_unless_empty(rows, "Success", "Bot configuration deleted", "Bot not found")
            })
            .await
            .success
    }

    pub async fn set_status(&self, id: Uuid, status: BotStatus) -> bool {
        let repo = self.ctx.bots();
        self.runner
            .run(repo.set_bot_status(id, status), |rows| {
                done_unless_empty(
                    rows,
                    "Success",
                    format!("Bot is now {}", status.as_str()),
                    "Bot not found",
                )
            })
            .await
            .success
    }

    /// Request a test run. The bot engine picks it up from the log.
    pub async fn test(&self, id: Uuid, actor: Option<Uuid>) -> bool {
        let repo = self.ctx.bots();
        self.runner
            .run(repo.test_bot_config(id, actor), |rows| {
                done_unless_empty(rows, "Test Started", "Bot test run requested", "Bot not found")
            })
            .await
            .success
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::test_support::harness;
    use domain::services::ToastVariant;
    use persistence::schema::tables;

    fn new_bot(name: &str) -> NewBotConfig {
        NewBotConfig {
            name: name.into(),
            description: None,
            config: serde_json::json!({"interval": 30}),
            status: BotStatus::Inactive,
        }
    }

    #[tokio::test]
    async fn test_blank_name_rejected_in_hook() {
        let h = harness();
        let actions = BotActions::new(&h.ctx);
        let result = actions.create(new_bot("  "), None).await;
        assert!(!result.success);
        assert_eq!(h.memory.write_count(), 0);
        assert_eq!(h.notifier.last().unwrap().title, "Name Required");
    }

    #[tokio::test]
    async fn test_create_test_and_delete() {
        let h = harness();
        let actions = BotActions::new(&h.ctx);
        let bot = actions.create(new_bot("Playlist warmer"), None).await.data.unwrap();

        assert!(actions.test(bot.id, None).await);
        assert_eq!(h.memory.rows(tables::BOT_LOGS).len(), 1);

        let logs = use_bot_logs(&h.ctx);
        logs.sync((bot.id, 10)).await;
        assert_eq!(logs.snapshot().data.unwrap().len(), 1);

        assert!(actions.delete(bot.id, None).await);
        assert!(h.memory.rows(tables::BOT_CONFIGS).is_empty());

        assert!(!actions.test(bot.id, None).await);
        assert_eq!(h.notifier.last().unwrap().variant, ToastVariant::Warning);
        assert_eq!(h.notifier.len(), 4);
    }
}
