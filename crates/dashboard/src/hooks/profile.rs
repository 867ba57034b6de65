//! End-user dashboard bindings and actions.

use domain::models::{ListeningSession, Profile, ProfileUpdate, UserReward};
use uuid::Uuid;

use super::{done, ActionResult, ActionRunner, DashboardContext, Refetch};
use crate::query::AsyncQuery;

pub fn use_profile(ctx: &DashboardContext) -> AsyncQuery<Option<Profile>, Uuid> {
    let repo = ctx.profiles();
    AsyncQuery::new(ctx.notifier.clone(), move |user_id: Uuid| {
        let repo = repo.clone();
        async move { repo.get_profile(user_id).await }
    })
}

pub fn use_rewards(ctx: &DashboardContext) -> AsyncQuery<UserReward, Uuid> {
    let repo = ctx.profiles();
    AsyncQuery::new(ctx.notifier.clone(), move |user_id: Uuid| {
        let repo = repo.clone();
        async move { repo.get_rewards(user_id).await }
    })
}

/// Recent listening sessions, bound to `(user_id, limit)`.
pub fn use_listening_sessions(
    ctx: &DashboardContext,
) -> AsyncQuery<Vec<ListeningSession>, (Uuid, u32)> {
    let repo = ctx.profiles();
    AsyncQuery::new(ctx.notifier.clone(), move |(user_id, limit): (Uuid, u32)| {
        let repo = repo.clone();
        async move { repo.list_listening_sessions(user_id, limit).await }
    })
}

/// Actions the signed-in user takes on their own account.
#[derive(Clone)]
pub struct ProfileActions {
    ctx: DashboardContext,
    runner: ActionRunner,
    user_id: Uuid,
}

impl ProfileActions {
    pub fn new(ctx: &DashboardContext, user_id: Uuid) -> Self {
        Self {
            ctx: ctx.clone(),
            runner: ActionRunner::new("profile", ctx.notifier.clone()),
            user_id,
        }
    }

    pub fn with_refetch(mut self, refetch: Refetch) -> Self {
        self.runner.set_refetch(refetch);
        self
    }

    pub fn loading(&self) -> bool {
        self.runner.loading()
    }

    pub async fn update_profile(&self, update: ProfileUpdate) -> ActionResult<Profile> {
        let repo = self.ctx.profiles();
        self.runner
            .run(repo.update_profile(self.user_id, update), |_| {
                done("Profile Updated", "Your profile has been saved")
            })
            .await
    }

    pub async fn disconnect_spotify(&self) -> bool {
        let repo = self.ctx.profiles();
        self.runner
            .run(repo.disconnect_spotify(self.user_id), |_| {
                done("Disconnected", "Your Spotify account has been disconnected")
            })
            .await
            .success
    }
}
