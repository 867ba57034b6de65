//! Overview counters, daily series and the recent activity feed.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use domain::models::{
    ActivityItem, AuditAction, AuditLog, BotStatus, DailyAmount, DailyCount, DashboardStats,
    KycStatus, TransactionStatus, UNKNOWN_USER,
};
use shared::format::{format_datetime, seconds_to_hours};
use uuid::Uuid;

use super::{day_window, logged, profiles_by_id, timestamp, zeroed_on_error};
use crate::schema::tables;
use crate::store::{decode_rows, row_f64, row_str, DataStore, Direction, Query, Row, StoreError};

/// Actor shown for audit rows written without a signed-in user.
const SYSTEM_ACTOR: &str = "System";

#[derive(Clone)]
pub struct AnalyticsRepository {
    store: Arc<dyn DataStore>,
}

impl AnalyticsRepository {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    /// Headline counters for the overview page. Zeroed when the store fails.
    pub async fn get_dashboard_stats(&self) -> DashboardStats {
        zeroed_on_error(self.fetch_dashboard_stats().await, "dashboard")
    }

    async fn fetch_dashboard_stats(&self) -> Result<DashboardStats, StoreError> {
        let week_ago = Utc::now() - Duration::days(7);

        let total_users = self.store.count(&Query::from(tables::PROFILES)).await?;
        let active_users = self
            .store
            .count(&Query::from(tables::PROFILES).eq("is_active", true))
            .await?;
        let new_users_this_week = self
            .store
            .count(&Query::from(tables::PROFILES).gte("created_at", timestamp(week_ago)))
            .await?;
        let pending_kyc = self
            .store
            .count(
                &Query::from(tables::KYC_DOCUMENTS).eq("status", KycStatus::Pending.as_str()),
            )
            .await?;
        let active_bots = self
            .store
            .count(&Query::from(tables::BOT_CONFIGS).eq("status", BotStatus::Active.as_str()))
            .await?;

        let revenue = self
            .store
            .select(
                &Query::from(tables::TRANSACTIONS)
                    .columns(&["amount"])
                    .eq("status", TransactionStatus::Completed.as_str()),
            )
            .await?;
        let rewards = self
            .store
            .select(
                &Query::from(tables::USER_REWARDS)
                    .columns(&["total_points", "total_listening_time"]),
            )
            .await?;
        let listening_seconds: f64 = rewards
            .iter()
            .map(|r| row_f64(r, "total_listening_time"))
            .sum();

        Ok(DashboardStats {
            total_users,
            active_users,
            new_users_this_week,
            pending_kyc,
            total_revenue: revenue.iter().map(|r| row_f64(r, "amount")).sum(),
            active_bots,
            total_listening_hours: seconds_to_hours(listening_seconds as i64),
            total_points: rewards.iter().map(|r| row_f64(r, "total_points") as i64).sum(),
        })
    }

    /// Signups per day over the last `days` days, oldest first, zero-filled.
    pub async fn get_user_growth(&self, days: u32) -> Result<Vec<DailyCount>, StoreError> {
        let now = Utc::now();
        let window = day_window(now, days);
        let rows = logged(
            self.rows_since(
                Query::from(tables::PROFILES).columns(&["created_at"]),
                "created_at",
                &window,
            )
            .await,
            "get_user_growth",
        )?;

        let mut per_day: HashMap<NaiveDate, i64> = HashMap::new();
        for row in &rows {
            if let Some(day) = row_day(row, "created_at") {
                *per_day.entry(day).or_default() += 1;
            }
        }
        Ok(window
            .into_iter()
            .map(|date| DailyCount {
                date,
                count: per_day.get(&date).copied().unwrap_or(0),
            })
            .collect())
    }

    /// Completed transaction volume per day, oldest first, zero-filled.
    pub async fn get_revenue_by_day(&self, days: u32) -> Result<Vec<DailyAmount>, StoreError> {
        let window = day_window(Utc::now(), days);
        let rows = logged(
            self.rows_since(
                Query::from(tables::TRANSACTIONS)
                    .columns(&["amount", "created_at"])
                    .eq("status", TransactionStatus::Completed.as_str()),
                "created_at",
                &window,
            )
            .await,
            "get_revenue_by_day",
        )?;

        let mut per_day: HashMap<NaiveDate, f64> = HashMap::new();
        for row in &rows {
            if let Some(day) = row_day(row, "created_at") {
                *per_day.entry(day).or_default() += row_f64(row, "amount");
            }
        }
        Ok(window
            .into_iter()
            .map(|date| DailyAmount {
                date,
                amount: per_day.get(&date).copied().unwrap_or(0.0),
            })
            .collect())
    }

    async fn rows_since(
        &self,
        query: Query,
        column: &str,
        window: &[NaiveDate],
    ) -> Result<Vec<Row>, StoreError> {
        let Some(first) = window.first() else {
            return Ok(Vec::new());
        };
        let start = first.and_time(chrono::NaiveTime::MIN).and_utc();
        self.store.select(&query.gte(column, timestamp(start))).await
    }

    /// Latest audit entries with actor names.
    pub async fn get_recent_activity(&self, limit: u32) -> Result<Vec<ActivityItem>, StoreError> {
        logged(self.fetch_recent_activity(limit).await, "get_recent_activity")
    }

    async fn fetch_recent_activity(&self, limit: u32) -> Result<Vec<ActivityItem>, StoreError> {
        let entries: Vec<AuditLog> = decode_rows(
            self.store
                .select(
                    &Query::from(tables::AUDIT_LOGS)
                        .order_by("created_at", Direction::Desc)
                        .limit(limit),
                )
                .await?,
        )?;
        let actors =
            profiles_by_id(self.store.as_ref(), entries.iter().filter_map(|e| e.actor_id)).await?;

        Ok(entries
            .into_iter()
            .map(|entry| ActivityItem {
                id: entry.id,
                actor: actor_name(entry.actor_id, &actors),
                action: entry
                    .action
                    .parse::<AuditAction>()
                    .map(|a| a.describe().to_string())
                    .unwrap_or(entry.action),
                resource: match entry.resource_id {
                    Some(id) => format!("{} {}", entry.resource_type, id),
                    None => entry.resource_type,
                },
                time: format_datetime(&entry.created_at),
            })
            .collect())
    }
}

fn actor_name(actor: Option<Uuid>, actors: &HashMap<Uuid, domain::models::Profile>) -> String {
    match actor {
        None => SYSTEM_ACTOR.to_string(),
        Some(id) => actors
            .get(&id)
            .map(|p| p.display_name())
            .unwrap_or_else(|| UNKNOWN_USER.to_string()),
    }
}

fn row_day(row: &Row, column: &str) -> Option<NaiveDate> {
    row_str(row, column)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|at| at.with_timezone(&Utc).date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::test_support::{seed_profile, seed_profile_with, store};
    use serde_json::json;

    #[tokio::test]
    async fn test_dashboard_stats() {
        let (memory, store) = store();
        let user = seed_profile(&memory, "a@example.com", None);
        seed_profile_with(
            &memory,
            json!({"email": "old@example.com", "is_active": false, "created_at": "2020-01-01T00:00:00Z"}),
        );
        memory
            .seed(
                tables::KYC_DOCUMENTS,
                vec![json!({"user_id": user, "document_type": "passport", "file_path": "p"})],
            )
            .unwrap();
        memory
            .seed(
                tables::TRANSACTIONS,
                vec![
                    json!({"user_id": user, "amount": 30.0, "transaction_type": "deposit", "status": "completed"}),
                    json!({"user_id": user, "amount": 70.0, "transaction_type": "deposit", "status": "failed"}),
                ],
            )
            .unwrap();
        memory
            .seed(
                tables::USER_REWARDS,
                vec![json!({"user_id": user, "total_points": 500, "total_listening_time": 7200})],
            )
            .unwrap();
        memory
            .seed(tables::BOT_CONFIGS, vec![json!({"name": "a", "status": "active"})])
            .unwrap();
        let repo = AnalyticsRepository::new(store);

        let stats = repo.get_dashboard_stats().await;
        assert_eq!(stats.total_users, 2);
        assert_eq!(stats.active_users, 1);
        assert_eq!(stats.new_users_this_week, 1);
        assert_eq!(stats.pending_kyc, 1);
        assert_eq!(stats.total_revenue, 30.0);
        assert_eq!(stats.active_bots, 1);
        assert_eq!(stats.total_listening_hours, 2.0);
        assert_eq!(stats.total_points, 500);
    }

    #[tokio::test]
    async fn test_dashboard_stats_zeroed_on_failure() {
        let (memory, store) = store();
        memory.set_failing(true);
        let stats = AnalyticsRepository::new(store).get_dashboard_stats().await;
        assert_eq!(stats, DashboardStats::default());
    }

    #[tokio::test]
    async fn test_user_growth_zero_fills() {
        let (memory, store) = store();
        seed_profile(&memory, "a@example.com", None);
        seed_profile(&memory, "b@example.com", None);
        let yesterday = timestamp(Utc::now() - Duration::days(1));
        seed_profile_with(&memory, json!({"email": "c@example.com", "created_at": yesterday}));
        let repo = AnalyticsRepository::new(store);

        let growth = repo.get_user_growth(7).await.unwrap();
        assert_eq!(growth.len(), 7);
        assert_eq!(growth[6].date, Utc::now().date_naive());
        assert_eq!(growth[6].count, 2);
        assert_eq!(growth[5].count, 1);
        assert_eq!(growth.iter().map(|d| d.count).sum::<i64>(), 3);
    }

    #[tokio::test]
    async fn test_revenue_by_day_counts_completed_only() {
        let (memory, store) = store();
        let user = Uuid::new_v4();
        memory
            .seed(
                tables::TRANSACTIONS,
                vec![
                    json!({"user_id": user, "amount": 12.5, "transaction_type": "deposit", "status": "completed"}),
                    json!({"user_id": user, "amount": 7.5, "transaction_type": "deposit", "status": "completed"}),
                    json!({"user_id": user, "amount": 100.0, "transaction_type": "deposit", "status": "pending"}),
                ],
            )
            .unwrap();
        let repo = AnalyticsRepository::new(store);

        let revenue = repo.get_revenue_by_day(3).await.unwrap();
        assert_eq!(revenue.len(), 3);
        assert_eq!(revenue[2].amount, 20.0);
        assert_eq!(revenue[0].amount, 0.0);
    }

    #[tokio::test]
    async fn test_zero_day_window_is_empty() {
        let (_, store) = store();
        let repo = AnalyticsRepository::new(store);
        assert!(repo.get_user_growth(0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_recent_activity_names_actors() {
        let (memory, store) = store();
        let admin = seed_profile(&memory, "admin@example.com", Some("Ada"));
        memory
            .seed(
                tables::AUDIT_LOGS,
                vec![
                    json!({"actor_id": admin, "action": "kyc.status_changed", "resource_type": "kyc_document", "resource_id": "42", "created_at": "2024-03-02T10:00:00Z"}),
                    json!({"actor_id": null, "action": "legacy.import", "resource_type": "users", "created_at": "2024-03-01T10:00:00Z"}),
                ],
            )
            .unwrap();
        let repo = AnalyticsRepository::new(store);

        let feed = repo.get_recent_activity(10).await.unwrap();
        assert_eq!(feed.len(), 2);
        assert_eq!(feed[0].actor, "Ada");
        assert_eq!(feed[0].action, "reviewed a KYC document");
        assert_eq!(feed[0].resource, "kyc_document 42");
        assert_eq!(feed[1].actor, SYSTEM_ACTOR);
        assert_eq!(feed[1].action, "legacy.import");
        assert_eq!(feed[1].resource, "users");
    }

    #[tokio::test]
    async fn test_recent_activity_propagates_failure() {
        let (memory, store) = store();
        memory.set_failing(true);
        let repo = AnalyticsRepository::new(store);
        assert!(repo.get_recent_activity(5).await.is_err());
    }
}
