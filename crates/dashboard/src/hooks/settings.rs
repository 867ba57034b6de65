//! System settings, reward configuration and CMS bindings and actions.

use domain::models::{
    FaqEntry, LeaderboardEntry, LegalDocument, LegalKind, PageContent, RewardConfig, RewardStats,
    SettingCategory, SystemSetting,
};
use serde_json::Value;
use uuid::Uuid;

use super::{done, ActionResult, ActionRunner, DashboardContext, Refetch};
use crate::query::AsyncQuery;

/// Settings of one category, or all of them for `None`.
pub fn use_settings(
    ctx: &DashboardContext,
) -> AsyncQuery<Vec<SystemSetting>, Option<SettingCategory>> {
    let repo = ctx.settings();
    AsyncQuery::new(ctx.notifier.clone(), move |category: Option<SettingCategory>| {
        let repo = repo.clone();
        async move { repo.list_settings(category).await }
    })
}

pub fn use_reward_config(ctx: &DashboardContext) -> AsyncQuery<RewardConfig, ()> {
    let repo = ctx.rewards();
    AsyncQuery::new(ctx.notifier.clone(), move |_: ()| {
        let repo = repo.clone();
        async move { repo.get_reward_config().await }
    })
}

pub fn use_leaderboard(ctx: &DashboardContext) -> AsyncQuery<Vec<LeaderboardEntry>, u32> {
    let repo = ctx.rewards();
    AsyncQuery::new(ctx.notifier.clone(), move |limit: u32| {
        let repo = repo.clone();
        async move { repo.leaderboard(limit).await }
    })
}

pub fn use_reward_stats(ctx: &DashboardContext) -> AsyncQuery<RewardStats, ()> {
    let repo = ctx.rewards();
    AsyncQuery::new(ctx.notifier.clone(), move |_: ()| {
        let repo = repo.clone();
        async move { Ok(repo.get_reward_stats().await) }
    })
}

pub fn use_page_content(ctx: &DashboardContext) -> AsyncQuery<Option<PageContent>, String> {
    let repo = ctx.cms();
    AsyncQuery::new(ctx.notifier.clone(), move |page: String| {
        let repo = repo.clone();
        async move { repo.get_page_content(&page).await }
    })
}

pub fn use_faqs(ctx: &DashboardContext) -> AsyncQuery<Vec<FaqEntry>, ()> {
    let repo = ctx.cms();
    AsyncQuery::new(ctx.notifier.clone(), move |_: ()| {
        let repo = repo.clone();
        async move { repo.get_faqs().await }
    })
}

pub fn use_legal_document(
    ctx: &DashboardContext,
) -> AsyncQuery<Option<LegalDocument>, LegalKind> {
    let repo = ctx.cms();
    AsyncQuery::new(ctx.notifier.clone(), move |kind: LegalKind| {
        let repo = repo.clone();
        async move { repo.get_legal_document(kind).await }
    })
}

#[derive(Clone)]
pub struct SettingsActions {
    ctx: DashboardContext,
    runner: ActionRunner,
    actor: Option<Uuid>,
}

impl SettingsActions {
    /// Writes are attributed to `actor` in the audit log.
    pub fn new(ctx: &DashboardContext, actor: Option<Uuid>) -> Self {
        Self {
            ctx: ctx.clone(),
            runner: ActionRunner::new("settings", ctx.notifier.clone()),
            actor,
        }
    }

    pub fn with_refetch(mut self, refetch: Refetch) -> Self {
        self.runner.set_refetch(refetch);
        self
    }

    pub fn loading(&self) -> bool {
        self.runner.loading()
    }

    pub async fn update_setting(
        &self,
        key: &str,
        value: Value,
        description: Option<&str>,
        category: SettingCategory,
    ) -> ActionResult<SystemSetting> {
        let repo = self.ctx.settings();
        self.runner
            .run(
                repo.update_setting(key, value, description, category, self.actor),
                |setting| done("Settings Saved", format!("{} updated", setting.key)),
            )
            .await
    }

    /// Change one field of the reward configuration.
    pub async fn update_reward_setting(&self, key: &str, value: Value) -> ActionResult<RewardConfig> {
        let repo = self.ctx.rewards();
        self.runner
            .run(repo.update_reward_setting(key, value, self.actor), |_| {
                done("Settings Saved", "Reward settings updated")
            })
            .await
    }

    pub async fn save_reward_config(&self, config: RewardConfig) -> ActionResult<RewardConfig> {
        let repo = self.ctx.rewards();
        self.runner
            .run(repo.save_reward_config(config, self.actor), |_| {
                done("Settings Saved", "Reward settings updated")
            })
            .await
    }

    pub async fn update_page_content(
        &self,
        page: &str,
        content: PageContent,
    ) -> ActionResult<PageContent> {
        let repo = self.ctx.cms();
        self.runner
            .run(repo.update_page_content(page, content, self.actor), |_| {
                done("Content Saved", format!("{} page updated", page))
            })
            .await
    }

    pub async fn update_faqs(&self, entries: Vec<FaqEntry>) -> ActionResult<Vec<FaqEntry>> {
        let repo = self.ctx.cms();
        self.runner
            .run(repo.update_faqs(entries, self.actor), |entries| {
                done("Content Saved", format!("{} FAQ entries saved", entries.len()))
            })
            .await
    }

    pub async fn update_legal_document(
        &self,
        kind: LegalKind,
        document: LegalDocument,
    ) -> ActionResult<LegalDocument> {
        let repo = self.ctx.cms();
        self.runner
            .run(repo.update_legal_document(kind, document, self.actor), |doc| {
                done("Content Saved", format!("{} updated", doc.title))
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::test_support::harness;
    use domain::services::ToastVariant;
    use serde_json::json;

    #[tokio::test]
    async fn test_reward_setting_update_flows_to_binding() {
        let h = harness();
        let config = use_reward_config(&h.ctx);
        config.sync(()).await;
        assert_eq!(config.snapshot().data, Some(RewardConfig::default()));

        let actions = SettingsActions::new(&h.ctx, Some(Uuid::new_v4()));
        let saved = actions.update_reward_setting("daily_point_cap", json!(900)).await;
        assert!(saved.success);

        config.refetch().await;
        assert_eq!(config.snapshot().data.unwrap().daily_point_cap, 900);
    }

    #[tokio::test]
    async fn test_invalid_reward_value_reports_error() {
        let h = harness();
        let actions = SettingsActions::new(&h.ctx, None);
        let result = actions.update_reward_setting("points_per_minute", json!("fast")).await;
        assert!(!result.success);
        assert_eq!(h.notifier.last().unwrap().variant, ToastVariant::Destructive);
        assert_eq!(h.notifier.len(), 1);
    }

    #[tokio::test]
    async fn test_settings_binding_by_category() {
        let h = harness();
        let actions = SettingsActions::new(&h.ctx, None);
        actions
            .update_setting("maintenance_mode", json!(false), None, SettingCategory::General)
            .await;
        actions
            .update_faqs(vec![FaqEntry {
                question: "How do points work?".into(),
                answer: "Listen more.".into(),
                order: 1,
            }])
            .await;

        let settings = use_settings(&h.ctx);
        settings.sync(Some(SettingCategory::General)).await;
        assert_eq!(settings.snapshot().data.unwrap().len(), 1);
        settings.sync(None).await;
        assert_eq!(settings.snapshot().data.unwrap().len(), 2);

        let faqs = use_faqs(&h.ctx);
        faqs.sync(()).await;
        assert_eq!(faqs.snapshot().data.unwrap()[0].order, 1);
    }
}
