//! KYC review routes.

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use domain::models::{KycDocument, KycDocumentView, KycStats, ListOptions};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use super::first_or;
use super::users::KycReviewRequest;
use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::AdminUser;

/// A document with a short-lived download link.
#[derive(Debug, Serialize)]
pub struct KycDocumentResponse {
    #[serde(flatten)]
    pub document: KycDocument,
    pub download_url: String,
}

/// GET /api/v1/admin/kyc
pub async fn list_documents(
    State(state): State<AppState>,
    Query(options): Query<ListOptions>,
) -> Result<Json<Vec<KycDocumentView>>, ApiError> {
    Ok(Json(state.ctx.kyc().list_documents(&options).await?))
}

/// GET /api/v1/admin/kyc/stats
pub async fn kyc_stats(State(state): State<AppState>) -> Json<KycStats> {
    Json(state.ctx.kyc().get_kyc_stats().await)
}

/// GET /api/v1/admin/kyc/:document_id
pub async fn get_document(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
) -> Result<Json<KycDocumentResponse>, ApiError> {
    let repo = state.ctx.kyc();
    let document = repo
        .get_document(document_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("KYC document not found".to_string()))?;
    let download_url = repo.document_url(&document.file_path).await?;
    Ok(Json(KycDocumentResponse {
        document,
        download_url,
    }))
}

/// PUT /api/v1/admin/kyc/:document_id/status
///
/// Returns 409 when the document is missing or its status does not allow
/// the requested transition.
pub async fn update_status(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminUser>,
    Path(document_id): Path<Uuid>,
    Json(request): Json<KycReviewRequest>,
) -> Result<Json<KycDocument>, ApiError> {
    let reason = request.checked_reason()?;
    let updated = state
        .ctx
        .kyc()
        .update_kyc_status(document_id, request.status, reason.as_deref(), Some(admin.user_id))
        .await?;
    let document = first_or(
        updated,
        ApiError::Conflict("Document not found or already reviewed".to_string()),
    )?;
    info!(
        admin_id = %admin.user_id,
        document_id = %document_id,
        status = %request.status,
        "Admin reviewed KYC document"
    );
    Ok(Json(document))
}
