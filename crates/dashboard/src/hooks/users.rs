//! User administration bindings and actions.

use domain::models::{KycStatus, ListOptions, Profile, UserStats, UserView};
use serde_json::{Map, Value};
use shared::validation::normalize_reason;
use uuid::Uuid;

use super::{done, done_unless_empty, ActionResult, ActionRunner, DashboardContext, Refetch};
use crate::query::AsyncQuery;

pub fn use_users(ctx: &DashboardContext) -> AsyncQuery<Vec<UserView>, ListOptions> {
    let repo = ctx.users();
    AsyncQuery::new(ctx.notifier.clone(), move |options: ListOptions| {
        let repo = repo.clone();
        async move { repo.list_users(&options).await }
    })
}

pub fn use_user_stats(ctx: &DashboardContext) -> AsyncQuery<UserStats, ()> {
    let repo = ctx.users();
    AsyncQuery::new(ctx.notifier.clone(), move |_: ()| {
        let repo = repo.clone();
        async move { Ok(repo.get_user_stats().await) }
    })
}

#[derive(Clone)]
pub struct UserActions {
    ctx: DashboardContext,
    runner: ActionRunner,
}

impl UserActions {
    pub fn new(ctx: &DashboardContext) -> Self {
        Self {
            ctx: ctx.clone(),
            runner: ActionRunner::new("users", ctx.notifier.clone()),
        }
    }

    pub fn with_refetch(mut self, refetch: Refetch) -> Self {
        self.runner.set_refetch(refetch);
        self
    }

    pub fn loading(&self) -> bool {
        self.runner.loading()
    }

    /// Apply a partial profile update keyed by form field names.
    pub async fn update_profile(
        &self,
        id: Uuid,
        updates: &Map<String, Value>,
    ) -> ActionResult<Profile> {
        let repo = self.ctx.users();
        self.runner
            .run(repo.update_user_profile(id, updates), |_| {
                done("Success", "User profile updated successfully")
            })
            .await
    }

    pub async fn set_active(&self, id: Uuid, active: bool) -> bool {
        let repo = self.ctx.users();
        let description = if active {
            "User activated"
        } else {
            "User deactivated"
        };
        self.runner
            .run(repo.set_user_active(id, active), |_| done("Success", description))
            .await
            .success
    }

    /// Review every document of a user. Rejecting requires a reason.
    pub async fn update_kyc_status(
        &self,
        user_id: Uuid,
        status: KycStatus,
        reason: Option<&str>,
        reviewer: Option<Uuid>,
    ) -> bool {
        if status == KycStatus::Rejected && normalize_reason(reason).is_none() {
            return self
                .runner
                .reject::<()>("Rejection Reason Required", "Please provide a reason for rejection")
                .success;
        }
        let repo = self.ctx.users();
        self.runner
            .run(
                repo.update_user_kyc_status(user_id, status, reason, reviewer),
                |docs| {
                    done_unless_empty(
                        docs,
                        "Success",
                        format!("KYC status updated to {}", status),
                        "No documents awaiting this review",
                    )
                },
            )
            .await
            .success
    }
}
