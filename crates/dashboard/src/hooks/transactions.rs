//! Transaction bindings and actions.

use domain::models::{ListOptions, Transaction, TransactionStats, TransactionStatus, TransactionView};
use uuid::Uuid;

use super::{done_unless_empty, ActionRunner, DashboardContext, Refetch};
use crate::query::AsyncQuery;

pub fn use_transactions(
    ctx: &DashboardContext,
) -> AsyncQuery<Vec<TransactionView>, ListOptions> {
    let repo = ctx.transactions();
    AsyncQuery::new(ctx.notifier.clone(), move |options: ListOptions| {
        let repo = repo.clone();
        async move { repo.list_transactions(&options).await }
    })
}

/// Latest transactions of one user, bound to `(user_id, limit)`.
pub fn use_user_transactions(
    ctx: &DashboardContext,
) -> AsyncQuery<Vec<Transaction>, (Uuid, u32)> {
    let repo = ctx.transactions();
    AsyncQuery::new(ctx.notifier.clone(), move |(user_id, limit): (Uuid, u32)| {
        let repo = repo.clone();
        async move { repo.list_user_transactions(user_id, limit).await }
    })
}

pub fn use_transaction_stats(ctx: &DashboardContext) -> AsyncQuery<TransactionStats, ()> {
    let repo = ctx.transactions();
    AsyncQuery::new(ctx.notifier.clone(), move |_: ()| {
        let repo = repo.clone();
        async move { Ok(repo.get_transaction_stats().await) }
    })
}

#[derive(Clone)]
pub struct TransactionActions {
    ctx: DashboardContext,
    runner: ActionRunner,
}

impl TransactionActions {
    pub fn new(ctx: &DashboardContext) -> Self {
        Self {
            ctx: ctx.clone(),
            runner: ActionRunner::new("transactions", ctx.notifier.clone()),
        }
    }

    pub fn with_refetch(mut self, refetch: Refetch) -> Self {
        self.runner.set_refetch(refetch);
        self
    }

    pub fn loading(&self) -> bool {
        self.runner.loading()
    }

    /// Completed transactions are immutable and report a warning.
    pub async fn update_status(
        &self,
        id: Uuid,
        status: TransactionStatus,
        actor: Option<Uuid>,
    ) -> bool {
        let repo = self.ctx.transactions();
        self.runner
            .run(repo.update_transaction_status(id, status, actor), |rows| {
                done_unless_empty(
                    rows,
                    "Success",
                    format!("Transaction marked as {}", status.as_str()),
                    "Transaction not found or already completed",
                )
            })
            .await
            .success
    }
}
