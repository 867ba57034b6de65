//! Transaction listing, stats and settlement status changes.

use std::sync::Arc;

use chrono::Utc;
use domain::models::{
    AuditAction, ListOptions, Transaction, TransactionStats, TransactionStatus, TransactionView,
    NOT_AVAILABLE, UNKNOWN_USER,
};
use domain::services::AuditLogBuilder;
use serde_json::json;
use shared::format::{format_currency, format_date};
use uuid::Uuid;

use super::{audit_mutation, logged, profiles_by_id, row, start_of_month, timestamp, zeroed_on_error};
use crate::schema::tables;
use crate::store::{decode_rows, row_f64, DataStore, Direction, Mutation, Query, StoreError};

#[derive(Clone)]
pub struct TransactionsRepository {
    store: Arc<dyn DataStore>,
}

impl TransactionsRepository {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    /// List transactions with owner names and formatted amounts.
    pub async fn list_transactions(
        &self,
        options: &ListOptions,
    ) -> Result<Vec<TransactionView>, StoreError> {
        logged(self.fetch_transactions(options).await, "list_transactions")
    }

    async fn fetch_transactions(
        &self,
        options: &ListOptions,
    ) -> Result<Vec<TransactionView>, StoreError> {
        let mut query = Query::from(tables::TRANSACTIONS).order_by("created_at", Direction::Desc);
        if let Some(term) = options.search_term() {
            query = query.search(&["description", "gateway_reference"], term);
        }
        if let Some(status) = options.status_filter() {
            match status.parse::<TransactionStatus>() {
                Ok(status) => query = query.eq("status", status.as_str()),
                Err(e) => {
                    tracing::debug!(error = %e, "Unknown transaction status filter matches nothing");
                    return Ok(Vec::new());
                }
            }
        }
        let query = query.range(options.page_limit(), options.offset);

        let transactions: Vec<Transaction> = decode_rows(self.store.select(&query).await?)?;
        let owners =
            profiles_by_id(self.store.as_ref(), transactions.iter().map(|t| t.user_id)).await?;

        Ok(transactions
            .into_iter()
            .map(|tx| {
                let owner = owners.get(&tx.user_id);
                TransactionView {
                    id: tx.id,
                    user_id: tx.user_id,
                    user_name: owner
                        .map(|p| p.display_name())
                        .unwrap_or_else(|| UNKNOWN_USER.into()),
                    user_email: owner
                        .and_then(|p| p.email.clone())
                        .unwrap_or_else(|| NOT_AVAILABLE.into()),
                    amount: tx.amount,
                    formatted_amount: format_currency(tx.amount, &tx.currency),
                    currency: tx.currency,
                    transaction_type: tx.transaction_type,
                    type_label: tx.transaction_type.label().to_string(),
                    status: tx.status,
                    description: tx.description.unwrap_or_default(),
                    reference: tx
                        .gateway_reference
                        .unwrap_or_else(|| NOT_AVAILABLE.into()),
                    date: format_date(&tx.created_at),
                }
            })
            .collect())
    }

    /// Most recent transactions of one user.
    pub async fn list_user_transactions(
        &self,
        user_id: Uuid,
        limit: u32,
    ) -> Result<Vec<Transaction>, StoreError> {
        let rows = logged(
            self.store
                .select(
                    &Query::from(tables::TRANSACTIONS)
                        .eq("user_id", user_id.to_string())
                        .order_by("created_at", Direction::Desc)
                        .limit(limit),
                )
                .await,
            "list_user_transactions",
        )?;
        decode_rows(rows)
    }

    /// Volume and status counts. Zeroed when the store fails.
    pub async fn get_transaction_stats(&self) -> TransactionStats {
        zeroed_on_error(self.fetch_transaction_stats().await, "transactions")
    }

    async fn fetch_transaction_stats(&self) -> Result<TransactionStats, StoreError> {
        let completed = TransactionStatus::Completed.as_str();
        let total_volume = self
            .sum_amounts(Query::from(tables::TRANSACTIONS).eq("status", completed))
            .await?;
        let volume_this_month = self
            .sum_amounts(
                Query::from(tables::TRANSACTIONS)
                    .eq("status", completed)
                    .gte("created_at", timestamp(start_of_month(Utc::now()))),
            )
            .await?;

        Ok(TransactionStats {
            total_volume,
            volume_this_month,
            completed: self.count_status(TransactionStatus::Completed).await?,
            pending: self.count_status(TransactionStatus::Pending).await?,
            failed: self.count_status(TransactionStatus::Failed).await?,
        })
    }

    async fn count_status(&self, status: TransactionStatus) -> Result<i64, StoreError> {
        self.store
            .count(&Query::from(tables::TRANSACTIONS).eq("status", status.as_str()))
            .await
    }

    async fn sum_amounts(&self, query: Query) -> Result<f64, StoreError> {
        let rows = self.store.select(&query.columns(&["amount"])).await?;
        Ok(rows.iter().map(|r| row_f64(r, "amount")).sum())
    }

    /// Change the status of a transaction that has not completed yet.
    ///
    /// Completed transactions are never matched, so changing one returns an
    /// empty result.
    pub async fn update_transaction_status(
        &self,
        id: Uuid,
        status: TransactionStatus,
        actor: Option<Uuid>,
    ) -> Result<Vec<Transaction>, StoreError> {
        let query = Query::from(tables::TRANSACTIONS)
            .eq("id", id.to_string())
            .neq("status", TransactionStatus::Completed.as_str());
        let patch = row(json!({
            "status": status.as_str(),
            "updated_at": timestamp(Utc::now()),
        }));
        let audit = AuditLogBuilder::new(actor, AuditAction::TransactionStatusChanged)
            .on_resource("transaction", id)
            .with_change("status", None, Some(json!(status.as_str())))
            .build();

        let result = self
            .store
            .batch(vec![
                Mutation::update(query, patch).required(),
                audit_mutation(&audit)?,
            ])
            .await;

        match result {
            Ok(mut results) => {
                let updated: Vec<Transaction> = decode_rows(results.swap_remove(0))?;
                tracing::info!(transaction_id = %id, status = %status, "Updated transaction status");
                Ok(updated)
            }
            Err(StoreError::NotFound(_)) => {
                tracing::warn!(transaction_id = %id, status = %status, "No mutable transaction matched");
                Ok(Vec::new())
            }
            Err(e) => logged(Err(e), "update_transaction_status"),
        }
    }
}
