//! Dashboard overview bindings. Read-only.

use domain::models::{ActivityItem, DailyAmount, DailyCount, DashboardStats};

use super::DashboardContext;
use crate::query::AsyncQuery;

pub fn use_dashboard_stats(ctx: &DashboardContext) -> AsyncQuery<DashboardStats, ()> {
    let repo = ctx.analytics();
    AsyncQuery::new(ctx.notifier.clone(), move |_: ()| {
        let repo = repo.clone();
        async move { Ok(repo.get_dashboard_stats().await) }
    })
}

/// Sign-ups per day, bound to the window length in days.
pub fn use_user_growth(ctx: &DashboardContext) -> AsyncQuery<Vec<DailyCount>, u32> {
    let repo = ctx.analytics();
    AsyncQuery::new(ctx.notifier.clone(), move |days: u32| {
        let repo = repo.clone();
        async move { repo.get_user_growth(days).await }
    })
}

/// Completed revenue per day, bound to the window length in days.
pub fn use_revenue_by_day(ctx: &DashboardContext) -> AsyncQuery<Vec<DailyAmount>, u32> {
    let repo = ctx.analytics();
    AsyncQuery::new(ctx.notifier.clone(), move |days: u32| {
        let repo = repo.clone();
        async move { repo.get_revenue_by_day(days).await }
    })
}

pub fn use_recent_activity(ctx: &DashboardContext) -> AsyncQuery<Vec<ActivityItem>, u32> {
    let repo = ctx.analytics();
    AsyncQuery::new(ctx.notifier.clone(), move |limit: u32| {
        let repo = repo.clone();
        async move { repo.get_recent_activity(limit).await }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::test_support::harness;

    #[tokio::test]
    async fn test_growth_window_rebinds_on_change() {
        let h = harness();
        let growth = use_user_growth(&h.ctx);
        growth.sync(7).await;
        assert_eq!(growth.snapshot().data.unwrap().len(), 7);
        growth.sync(30).await;
        assert_eq!(growth.snapshot().data.unwrap().len(), 30);
    }

    #[tokio::test]
    async fn test_stats_survive_store_failure() {
        let h = harness();
        h.memory.set_failing(true);
        let stats = use_dashboard_stats(&h.ctx);
        stats.sync(()).await;
        assert_eq!(stats.snapshot().data, Some(DashboardStats::default()));
        assert!(h.notifier.is_empty());
    }
}
