//! Transaction routes.

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use domain::models::{ListOptions, Transaction, TransactionStats, TransactionStatus, TransactionView};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::first_or;
use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::AdminUser;

#[derive(Debug, Deserialize)]
pub struct UpdateTransactionStatusRequest {
    pub status: TransactionStatus,
}

/// GET /api/v1/admin/transactions
pub async fn list_transactions(
    State(state): State<AppState>,
    Query(options): Query<ListOptions>,
) -> Result<Json<Vec<TransactionView>>, ApiError> {
    Ok(Json(state.ctx.transactions().list_transactions(&options).await?))
}

/// GET /api/v1/admin/transactions/stats
pub async fn transaction_stats(State(state): State<AppState>) -> Json<TransactionStats> {
    Json(state.ctx.transactions().get_transaction_stats().await)
}

/// PUT /api/v1/admin/transactions/:transaction_id/status
///
/// Completed transactions are final; changing them returns 409.
pub async fn update_status(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminUser>,
    Path(transaction_id): Path<Uuid>,
    Json(request): Json<UpdateTransactionStatusRequest>,
) -> Result<Json<Transaction>, ApiError> {
    let updated = state
        .ctx
        .transactions()
        .update_transaction_status(transaction_id, request.status, Some(admin.user_id))
        .await?;
    let transaction = first_or(
        updated,
        ApiError::Conflict("Transaction not found or already completed".to_string()),
    )?;
    info!(
        admin_id = %admin.user_id,
        transaction_id = %transaction_id,
        status = %request.status,
        "Admin updated transaction status"
    );
    Ok(Json(transaction))
}
