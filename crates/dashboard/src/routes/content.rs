//! CMS routes: page content, FAQs and legal documents.

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use domain::models::{FaqEntry, LegalDocument, LegalKind, PageContent};
use tracing::info;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::AdminUser;

/// GET /api/v1/admin/content/pages/:page
pub async fn get_page(
    State(state): State<AppState>,
    Path(page): Path<String>,
) -> Result<Json<PageContent>, ApiError> {
    state
        .ctx
        .cms()
        .get_page_content(&page)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Page {} has no content", page)))
}

/// PUT /api/v1/admin/content/pages/:page
pub async fn update_page(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminUser>,
    Path(page): Path<String>,
    Json(content): Json<PageContent>,
) -> Result<Json<PageContent>, ApiError> {
    let saved = state
        .ctx
        .cms()
        .update_page_content(&page, content, Some(admin.user_id))
        .await?;
    info!(admin_id = %admin.user_id, page = %page, "Admin updated page content");
    Ok(Json(saved))
}

/// GET /api/v1/admin/content/faqs
pub async fn get_faqs(State(state): State<AppState>) -> Result<Json<Vec<FaqEntry>>, ApiError> {
    Ok(Json(state.ctx.cms().get_faqs().await?))
}

/// PUT /api/v1/admin/content/faqs
///
/// Replaces the whole FAQ list.
pub async fn update_faqs(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminUser>,
    Json(entries): Json<Vec<FaqEntry>>,
) -> Result<Json<Vec<FaqEntry>>, ApiError> {
    let saved = state
        .ctx
        .cms()
        .update_faqs(entries, Some(admin.user_id))
        .await?;
    info!(admin_id = %admin.user_id, entries = saved.len(), "Admin updated FAQs");
    Ok(Json(saved))
}

/// GET /api/v1/admin/content/legal/:kind
pub async fn get_legal(
    State(state): State<AppState>,
    Path(kind): Path<LegalKind>,
) -> Result<Json<LegalDocument>, ApiError> {
    state
        .ctx
        .cms()
        .get_legal_document(kind)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("{} document not found", kind.setting_key())))
}

/// PUT /api/v1/admin/content/legal/:kind
pub async fn update_legal(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminUser>,
    Path(kind): Path<LegalKind>,
    Json(document): Json<LegalDocument>,
) -> Result<Json<LegalDocument>, ApiError> {
    let saved = state
        .ctx
        .cms()
        .update_legal_document(kind, document, Some(admin.user_id))
        .await?;
    info!(admin_id = %admin.user_id, kind = kind.setting_key(), "Admin updated legal document");
    Ok(Json(saved))
}
