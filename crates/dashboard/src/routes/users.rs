//! User administration routes.

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use domain::models::{
    KycDocument, KycStatus, ListOptions, ListeningSession, Profile, Transaction, UserDetail,
    UserReward, UserStats, UserView,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use shared::validation::normalize_reason;
use tracing::info;
use uuid::Uuid;

use super::LimitQuery;
use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::AdminUser;

/// Body of `PUT /users/:id/active`.
#[derive(Debug, Deserialize)]
pub struct SetActiveRequest {
    pub active: bool,
}

/// Body of a KYC review.
#[derive(Debug, Deserialize)]
pub struct KycReviewRequest {
    pub status: KycStatus,
    #[serde(default)]
    pub reason: Option<String>,
}

impl KycReviewRequest {
    /// Rejections must carry a non-blank reason.
    pub fn checked_reason(&self) -> Result<Option<String>, ApiError> {
        let reason = normalize_reason(self.reason.as_deref());
        if self.status == KycStatus::Rejected && reason.is_none() {
            return Err(ApiError::Validation(
                "Please provide a reason for rejection".to_string(),
            ));
        }
        Ok(reason)
    }
}

/// GET /api/v1/admin/users
pub async fn list_users(
    State(state): State<AppState>,
    Query(options): Query<ListOptions>,
) -> Result<Json<Vec<UserView>>, ApiError> {
    Ok(Json(state.users.list_users(&options).await?))
}

/// GET /api/v1/admin/users/stats
pub async fn user_stats(State(state): State<AppState>) -> Json<UserStats> {
    Json(state.users.get_user_stats().await)
}

/// GET /api/v1/admin/users/:user_id
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<UserDetail>, ApiError> {
    state
        .users
        .get_user(user_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
}

/// PATCH /api/v1/admin/users/:user_id
///
/// Partial profile update. Unknown fields are ignored.
pub async fn update_user(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminUser>,
    Path(user_id): Path<Uuid>,
    Json(updates): Json<Map<String, Value>>,
) -> Result<Json<Profile>, ApiError> {
    let profile = state.users.update_user_profile(user_id, &updates).await?;
    info!(admin_id = %admin.user_id, user_id = %user_id, "Admin updated user profile");
    Ok(Json(profile))
}

/// PUT /api/v1/admin/users/:user_id/active
pub async fn set_user_active(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminUser>,
    Path(user_id): Path<Uuid>,
    Json(request): Json<SetActiveRequest>,
) -> Result<Json<Profile>, ApiError> {
    let profile = state.users.set_user_active(user_id, request.active).await?;
    info!(
        admin_id = %admin.user_id,
        user_id = %user_id,
        active = request.active,
        "Admin changed user activation"
    );
    Ok(Json(profile))
}

/// PUT /api/v1/admin/users/:user_id/kyc
///
/// Reviews every document of the user that may move to the new status.
pub async fn update_user_kyc(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminUser>,
    Path(user_id): Path<Uuid>,
    Json(request): Json<KycReviewRequest>,
) -> Result<Json<Vec<KycDocument>>, ApiError> {
    let reason = request.checked_reason()?;
    let documents = state
        .users
        .update_user_kyc_status(user_id, request.status, reason.as_deref(), Some(admin.user_id))
        .await?;
    info!(
        admin_id = %admin.user_id,
        user_id = %user_id,
        status = %request.status,
        documents = documents.len(),
        "Admin reviewed user KYC"
    );
    Ok(Json(documents))
}

/// GET /api/v1/admin/users/:user_id/documents
pub async fn user_documents(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<KycDocument>>, ApiError> {
    Ok(Json(state.ctx.kyc().list_user_documents(user_id).await?))
}

/// GET /api/v1/admin/users/:user_id/transactions
pub async fn user_transactions(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<Transaction>>, ApiError> {
    let limit = query.resolve()?;
    Ok(Json(
        state
            .ctx
            .transactions()
            .list_user_transactions(user_id, limit)
            .await?,
    ))
}

/// GET /api/v1/admin/users/:user_id/rewards
pub async fn user_rewards(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<UserReward>, ApiError> {
    Ok(Json(state.ctx.profiles().get_rewards(user_id).await?))
}

/// GET /api/v1/admin/users/:user_id/sessions
pub async fn user_sessions(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<ListeningSession>>, ApiError> {
    let limit = query.resolve()?;
    Ok(Json(
        state
            .ctx
            .profiles()
            .list_listening_sessions(user_id, limit)
            .await?,
    ))
}
