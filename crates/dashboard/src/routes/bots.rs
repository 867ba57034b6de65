//! Bot configuration routes.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use domain::models::{BotConfig, BotConfigPatch, BotLog, BotStats, BotStatus, NewBotConfig};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::{first_or, LimitQuery};
use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::AdminUser;

#[derive(Debug, Deserialize)]
pub struct SetBotStatusRequest {
    pub status: BotStatus,
}

fn bot_not_found() -> ApiError {
    ApiError::NotFound("Bot configuration not found".to_string())
}

/// GET /api/v1/admin/bots
pub async fn list_bots(State(state): State<AppState>) -> Result<Json<Vec<BotConfig>>, ApiError> {
    Ok(Json(state.ctx.bots().list_bot_configs().await?))
}

/// GET /api/v1/admin/bots/stats
pub async fn bot_stats(State(state): State<AppState>) -> Json<BotStats> {
    Json(state.ctx.bots().get_bot_stats().await)
}

/// POST /api/v1/admin/bots
pub async fn create_bot(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminUser>,
    Json(request): Json<NewBotConfig>,
) -> Result<(StatusCode, Json<BotConfig>), ApiError> {
    let bot = state
        .ctx
        .bots()
        .create_bot_config(request, Some(admin.user_id))
        .await?;
    info!(admin_id = %admin.user_id, bot_id = %bot.id, "Admin created bot configuration");
    Ok((StatusCode::CREATED, Json(bot)))
}

/// GET /api/v1/admin/bots/:bot_id
pub async fn get_bot(
    State(state): State<AppState>,
    Path(bot_id): Path<Uuid>,
) -> Result<Json<BotConfig>, ApiError> {
    state
        .ctx
        .bots()
        .get_bot_config(bot_id)
        .await?
        .map(Json)
        .ok_or_else(bot_not_found)
}

/// PATCH /api/v1/admin/bots/:bot_id
pub async fn update_bot(
    State(state): State<AppState>,
    Path(bot_id): Path<Uuid>,
    Json(patch): Json<BotConfigPatch>,
) -> Result<Json<BotConfig>, ApiError> {
    if patch.is_empty() {
        return Err(ApiError::Validation("No fields to update".to_string()));
    }
    let updated = state.ctx.bots().update_bot_config(bot_id, patch).await?;
    Ok(Json(first_or(updated, bot_not_found())?))
}

/// DELETE /api/v1/admin/bots/:bot_id
pub async fn delete_bot(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminUser>,
    Path(bot_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let deleted = state
        .ctx
        .bots()
        .delete_bot_config(bot_id, Some(admin.user_id))
        .await?;
    first_or(deleted, bot_not_found())?;
    info!(admin_id = %admin.user_id, bot_id = %bot_id, "Admin deleted bot configuration");
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/admin/bots/:bot_id/status
pub async fn set_bot_status(
    State(state): State<AppState>,
    Path(bot_id): Path<Uuid>,
    Json(request): Json<SetBotStatusRequest>,
) -> Result<Json<BotConfig>, ApiError> {
    let updated = state.ctx.bots().set_bot_status(bot_id, request.status).await?;
    Ok(Json(first_or(updated, bot_not_found())?))
}

/// POST /api/v1/admin/bots/:bot_id/test
///
/// Records a test run and stamps `last_run_at`.
pub async fn test_bot(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminUser>,
    Path(bot_id): Path<Uuid>,
) -> Result<Json<BotConfig>, ApiError> {
    let updated = state
        .ctx
        .bots()
        .test_bot_config(bot_id, Some(admin.user_id))
        .await?;
    Ok(Json(first_or(updated, bot_not_found())?))
}

/// GET /api/v1/admin/bots/:bot_id/logs
pub async fn bot_logs(
    State(state): State<AppState>,
    Path(bot_id): Path<Uuid>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<BotLog>>, ApiError> {
    let limit = query.resolve()?;
    Ok(Json(state.ctx.bots().get_bot_logs(bot_id, limit).await?))
}
