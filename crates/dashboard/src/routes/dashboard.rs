//! Dashboard overview routes.

use axum::{
    extract::{Query, State},
    Json,
};
use domain::models::{ActivityItem, DailyAmount, DailyCount, DashboardStats};
use serde::Deserialize;

use super::LimitQuery;
use crate::app::AppState;
use crate::error::ApiError;

/// Default chart window.
pub const DEFAULT_DAYS: u32 = 30;

/// Longest chart window served.
pub const MAX_DAYS: u32 = 365;

#[derive(Debug, Default, Deserialize)]
pub struct DaysQuery {
    pub days: Option<u32>,
}

impl DaysQuery {
    fn resolve(&self) -> Result<u32, ApiError> {
        match self.days {
            None => Ok(DEFAULT_DAYS),
            Some(days) if (1..=MAX_DAYS).contains(&days) => Ok(days),
            Some(_) => Err(ApiError::Validation(format!(
                "Days must be between 1 and {}",
                MAX_DAYS
            ))),
        }
    }
}

/// GET /api/v1/admin/dashboard/stats
pub async fn dashboard_stats(State(state): State<AppState>) -> Json<DashboardStats> {
    Json(state.ctx.analytics().get_dashboard_stats().await)
}

/// GET /api/v1/admin/dashboard/user-growth
pub async fn user_growth(
    State(state): State<AppState>,
    Query(query): Query<DaysQuery>,
) -> Result<Json<Vec<DailyCount>>, ApiError> {
    let days = query.resolve()?;
    Ok(Json(state.ctx.analytics().get_user_growth(days).await?))
}

/// GET /api/v1/admin/dashboard/revenue
pub async fn revenue(
    State(state): State<AppState>,
    Query(query): Query<DaysQuery>,
) -> Result<Json<Vec<DailyAmount>>, ApiError> {
    let days = query.resolve()?;
    Ok(Json(state.ctx.analytics().get_revenue_by_day(days).await?))
}

/// GET /api/v1/admin/dashboard/activity
pub async fn recent_activity(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<ActivityItem>>, ApiError> {
    let limit = query.resolve()?;
    Ok(Json(state.ctx.analytics().get_recent_activity(limit).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_days_bounds() {
        assert_eq!(DaysQuery::default().resolve().unwrap(), DEFAULT_DAYS);
        assert_eq!(DaysQuery { days: Some(7) }.resolve().unwrap(), 7);
        assert!(DaysQuery { days: Some(0) }.resolve().is_err());
        assert!(DaysQuery { days: Some(400) }.resolve().is_err());
    }
}
