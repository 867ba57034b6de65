//! System and reward settings routes.

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use domain::models::{
    LeaderboardEntry, RewardConfig, RewardStats, RewardTransaction, SettingCategory, SystemSetting,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use super::LimitQuery;
use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::AdminUser;

#[derive(Debug, Default, Deserialize)]
pub struct CategoryQuery {
    pub category: Option<SettingCategory>,
}

/// Body of `PUT /settings/:key`.
#[derive(Debug, Deserialize)]
pub struct UpsertSettingRequest {
    pub value: Value,
    #[serde(default)]
    pub description: Option<String>,
    /// Defaults to the stored category, or `general` for new keys.
    #[serde(default)]
    pub category: Option<SettingCategory>,
}

/// Body of `PATCH /rewards/config`.
#[derive(Debug, Deserialize)]
pub struct RewardSettingRequest {
    pub key: String,
    pub value: Value,
}

#[derive(Debug, Default, Deserialize)]
pub struct RewardTransactionsQuery {
    pub user_id: Option<Uuid>,
    pub limit: Option<u32>,
}

/// GET /api/v1/admin/settings
pub async fn list_settings(
    State(state): State<AppState>,
    Query(query): Query<CategoryQuery>,
) -> Result<Json<Vec<SystemSetting>>, ApiError> {
    Ok(Json(state.ctx.settings().list_settings(query.category).await?))
}

/// GET /api/v1/admin/settings/:key
pub async fn get_setting(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<SystemSetting>, ApiError> {
    state
        .ctx
        .settings()
        .get_setting(&key)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Setting {} not found", key)))
}

/// PUT /api/v1/admin/settings/:key
///
/// Insert-or-update keyed by `key`; last write wins.
pub async fn upsert_setting(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminUser>,
    Path(key): Path<String>,
    Json(request): Json<UpsertSettingRequest>,
) -> Result<Json<SystemSetting>, ApiError> {
    let repo = state.ctx.settings();
    let category = match request.category {
        Some(category) => category,
        None => repo
            .get_setting(&key)
            .await?
            .map(|s| s.category)
            .unwrap_or_default(),
    };
    let setting = repo
        .update_setting(
            &key,
            request.value,
            request.description.as_deref(),
            category,
            Some(admin.user_id),
        )
        .await?;
    info!(admin_id = %admin.user_id, key = %key, "Admin updated setting");
    Ok(Json(setting))
}

/// GET /api/v1/admin/rewards/config
pub async fn reward_config(State(state): State<AppState>) -> Result<Json<RewardConfig>, ApiError> {
    Ok(Json(state.ctx.rewards().get_reward_config().await?))
}

/// PUT /api/v1/admin/rewards/config
pub async fn save_reward_config(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminUser>,
    Json(config): Json<RewardConfig>,
) -> Result<Json<RewardConfig>, ApiError> {
    let saved = state
        .ctx
        .rewards()
        .save_reward_config(config, Some(admin.user_id))
        .await?;
    info!(admin_id = %admin.user_id, "Admin saved reward configuration");
    Ok(Json(saved))
}

/// PATCH /api/v1/admin/rewards/config
///
/// Changes a single field of the reward configuration.
pub async fn update_reward_setting(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminUser>,
    Json(request): Json<RewardSettingRequest>,
) -> Result<Json<RewardConfig>, ApiError> {
    let saved = state
        .ctx
        .rewards()
        .update_reward_setting(&request.key, request.value, Some(admin.user_id))
        .await?;
    info!(admin_id = %admin.user_id, field = %request.key, "Admin updated reward setting");
    Ok(Json(saved))
}

/// GET /api/v1/admin/rewards/leaderboard
pub async fn leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<LeaderboardEntry>>, ApiError> {
    let limit = query.resolve()?;
    Ok(Json(state.ctx.rewards().leaderboard(limit).await?))
}

/// GET /api/v1/admin/rewards/stats
pub async fn reward_stats(State(state): State<AppState>) -> Json<RewardStats> {
    Json(state.ctx.rewards().get_reward_stats().await)
}

/// GET /api/v1/admin/rewards/transactions
pub async fn reward_transactions(
    State(state): State<AppState>,
    Query(query): Query<RewardTransactionsQuery>,
) -> Result<Json<Vec<RewardTransaction>>, ApiError> {
    let limit = LimitQuery { limit: query.limit }.resolve()?;
    Ok(Json(
        state
            .ctx
            .rewards()
            .list_reward_transactions(query.user_id, limit)
            .await?,
    ))
}
