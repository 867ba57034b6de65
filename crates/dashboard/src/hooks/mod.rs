//! Per-domain read bindings and action bundles.
//!
//! Each `use_*` function returns an [`AsyncQuery`] bound to a repository read;
//! callers drive it with [`AsyncQuery::sync`]. Each `*Actions` bundle exposes
//! one method per write plus a `loading()` flag shared by the bundle's
//! actions. Every action attempt emits exactly one notification.

pub mod analytics;
pub mod bots;
pub mod kyc;
pub mod playlists;
pub mod profile;
pub mod settings;
pub mod transactions;
pub mod users;

pub use analytics::{use_dashboard_stats, use_recent_activity, use_revenue_by_day, use_user_growth};
pub use bots::{use_bot_configs, use_bot_logs, use_bot_stats, BotActions};
pub use kyc::{use_kyc_documents, use_kyc_stats, use_user_documents, KycActions, UploadFile};
pub use playlists::{use_playlist, use_playlists, PlaylistActions};
pub use profile::{use_listening_sessions, use_profile, use_rewards, ProfileActions};
pub use settings::{
    use_faqs, use_leaderboard, use_legal_document, use_page_content, use_reward_config,
    use_reward_stats, use_settings, SettingsActions,
};
pub use transactions::{
    use_transaction_stats, use_transactions, use_user_transactions, TransactionActions,
};
pub use users::{use_user_stats, use_users, UserActions};

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use domain::models::ListOptions;
use domain::services::{Notifier, Toast};
use persistence::repositories::{
    AnalyticsRepository, BotConfigRepository, CmsRepository, KycRepository, PlaylistRepository,
    ProfileRepository, RewardSettingsRepository, SystemSettingsRepository,
    TransactionsRepository, UsersRepository,
};
use persistence::storage::SIGNED_URL_TTL;
use persistence::{DataStore, ObjectStorage, StoreError};
use shared::pagination::{Pagination, DEFAULT_PAGE_SIZE};
use shared::search::{SearchFilters, DEFAULT_DEBOUNCE};

use crate::middleware::metrics::record_action;
use crate::query::{AsyncQuery, BoxFuture};

/// Filter key holding the status selection of a list view.
pub const STATUS_FILTER: &str = "status";

/// Shared handles every binding and action bundle is built from.
#[derive(Clone)]
pub struct DashboardContext {
    pub store: Arc<dyn DataStore>,
    pub storage: Arc<dyn ObjectStorage>,
    pub notifier: Arc<dyn Notifier>,
    bucket: Option<String>,
    signed_url_ttl: Duration,
    page_size: u32,
    debounce: Duration,
}

impl DashboardContext {
    pub fn new(
        store: Arc<dyn DataStore>,
        storage: Arc<dyn ObjectStorage>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            storage,
            notifier,
            bucket: None,
            signed_url_ttl: SIGNED_URL_TTL,
            page_size: DEFAULT_PAGE_SIZE,
            debounce: DEFAULT_DEBOUNCE,
        }
    }

    pub fn with_documents(mut self, bucket: impl Into<String>, signed_url_ttl: Duration) -> Self {
        self.bucket = Some(bucket.into());
        self.signed_url_ttl = signed_url_ttl;
        self
    }

    pub fn with_list_defaults(mut self, page_size: u32, debounce: Duration) -> Self {
        self.page_size = page_size;
        self.debounce = debounce;
        self
    }

    pub fn users(&self) -> UsersRepository {
        UsersRepository::new(self.store.clone())
    }

    pub fn kyc(&self) -> KycRepository {
        let repo = KycRepository::new(self.store.clone(), self.storage.clone())
            .with_signed_url_ttl(self.signed_url_ttl);
        match &self.bucket {
            Some(bucket) => repo.with_bucket(bucket.clone()),
            None => repo,
        }
    }

    pub fn transactions(&self) -> TransactionsRepository {
        TransactionsRepository::new(self.store.clone())
    }

    pub fn analytics(&self) -> AnalyticsRepository {
        AnalyticsRepository::new(self.store.clone())
    }

    pub fn bots(&self) -> BotConfigRepository {
        BotConfigRepository::new(self.store.clone())
    }

    pub fn playlists(&self) -> PlaylistRepository {
        PlaylistRepository::new(self.store.clone())
    }

    pub fn settings(&self) -> SystemSettingsRepository {
        SystemSettingsRepository::new(self.store.clone())
    }

    pub fn rewards(&self) -> RewardSettingsRepository {
        RewardSettingsRepository::new(self.store.clone())
    }

    pub fn cms(&self) -> CmsRepository {
        CmsRepository::new(self.store.clone())
    }

    pub fn profiles(&self) -> ProfileRepository {
        ProfileRepository::new(self.store.clone())
    }

    /// Pagination state at the configured page size.
    pub fn pagination(&self) -> Pagination {
        Pagination::new(self.page_size)
    }

    /// Search state with the configured debounce delay.
    pub fn search_filters(&self) -> SearchFilters {
        SearchFilters::new(self.debounce)
    }
}

/// Options for a list read from the current page and the debounced search.
pub fn list_options(pagination: &Pagination, filters: &SearchFilters) -> ListOptions {
    ListOptions {
        search: Some(filters.debounced_search()).filter(|s| !s.is_empty()),
        status: filters.filter(STATUS_FILTER),
        limit: Some(pagination.limit()),
        offset: Some(pagination.offset()),
    }
}

/// Outcome of an action that returns data.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionResult<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ActionResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

/// Callback run after a successful action, typically a query refetch.
pub type Refetch = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Refetch callback for a query.
pub fn refetch_of<T, D>(query: &AsyncQuery<T, D>) -> Refetch
where
    T: Clone + Send + Sync + 'static,
    D: Clone + PartialEq + Send + Sync + 'static,
{
    let query = query.clone();
    Arc::new(move || -> BoxFuture<'static, ()> {
        let query = query.clone();
        Box::pin(async move { query.refetch().await })
    })
}

/// How a completed write should be reported.
pub(crate) enum Outcome {
    Done(Toast),
    /// The write went through but matched nothing.
    Empty(Toast),
}

/// Shared loading counter, notifier and refetch callback of an action bundle.
#[derive(Clone)]
pub(crate) struct ActionRunner {
    domain: &'static str,
    notifier: Arc<dyn Notifier>,
    in_flight: Arc<AtomicUsize>,
    refetch: Option<Refetch>,
}

struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ActionRunner {
    pub(crate) fn new(domain: &'static str, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            domain,
            notifier,
            in_flight: Arc::new(AtomicUsize::new(0)),
            refetch: None,
        }
    }

    pub(crate) fn set_refetch(&mut self, refetch: Refetch) {
        self.refetch = Some(refetch);
    }

    /// True while any action of the bundle is running.
    pub(crate) fn loading(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    /// Report a validation failure without calling the store.
    pub(crate) fn reject<T>(&self, title: &str, description: &str) -> ActionResult<T> {
        record_action(self.domain, "rejected");
        self.notifier.notify(Toast::warning(title, description));
        ActionResult::failed(description)
    }

    pub(crate) async fn run<T, F>(
        &self,
        operation: F,
        judge: impl FnOnce(&T) -> Outcome,
    ) -> ActionResult<T>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let _guard = InFlight(self.in_flight.clone());

        match operation.await {
            Ok(value) => match judge(&value) {
                Outcome::Done(toast) => {
                    record_action(self.domain, "success");
                    self.notifier.notify(toast);
                    if let Some(refetch) = &self.refetch {
                        refetch().await;
                    }
                    ActionResult::ok(value)
                }
                Outcome::Empty(toast) => {
                    record_action(self.domain, "empty");
                    let description = toast.description.clone();
                    self.notifier.notify(toast);
                    ActionResult {
                        success: false,
                        data: Some(value),
                        error: Some(description),
                    }
                }
            },
            Err(e) => {
                record_action(self.domain, "failure");
                let message = e.to_string();
                tracing::warn!(domain = self.domain, error = %message, "Dashboard action failed");
                self.notifier.notify(Toast::error("Error", message.clone()));
                ActionResult::failed(message)
            }
        }
    }
}

/// Success toast.
pub(crate) fn done(title: &str, description: impl Into<String>) -> Outcome {
    Outcome::Done(Toast::success(title, description))
}

/// Success toast unless the write affected no rows.
pub(crate) fn done_unless_empty<T>(
    rows: &[T],
    title: &str,
    description: impl Into<String>,
    empty: &str,
) -> Outcome {
    if rows.is_empty() {
        Outcome::Empty(Toast::warning("Nothing Updated", empty))
    } else {
        done(title, description)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use domain::services::RecordingNotifier;
    use persistence::{MemoryObjectStorage, MemoryStore};

    use super::DashboardContext;

    pub struct Harness {
        pub memory: Arc<MemoryStore>,
        pub storage: Arc<MemoryObjectStorage>,
        pub notifier: RecordingNotifier,
        pub ctx: DashboardContext,
    }

    pub fn harness() -> Harness {
        let memory = Arc::new(MemoryStore::new());
        let storage = Arc::new(MemoryObjectStorage::new());
        let notifier = RecordingNotifier::new();
        let ctx = DashboardContext::new(
            memory.clone(),
            storage.clone(),
            Arc::new(notifier.clone()),
        );
        Harness {
            memory,
            storage,
            notifier,
            ctx,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::harness;
    use super::*;
    use domain::services::ToastVariant;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn test_runner_reports_once_and_refetches_on_success() {
        let h = harness();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut runner = ActionRunner::new("test", h.ctx.notifier.clone());
        runner.set_refetch(Arc::new(move || -> BoxFuture<'static, ()> {
            counter.fetch_add(1, Ordering::SeqCst);
            Box::pin(async {})
        }));

        let result = runner
            .run(async { Ok::<_, StoreError>(3) }, |n| done("Saved", format!("{} rows", n)))
            .await;
        assert_eq!(result, ActionResult::ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.notifier.len(), 1);
        assert!(!runner.loading());
    }

    #[tokio::test]
    async fn test_runner_failure_and_empty_do_not_refetch() {
        let h = harness();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut runner = ActionRunner::new("test", h.ctx.notifier.clone());
        runner.set_refetch(Arc::new(move || -> BoxFuture<'static, ()> {
            counter.fetch_add(1, Ordering::SeqCst);
            Box::pin(async {})
        }));

        let failed = runner
            .run(
                async { Err::<Vec<u8>, _>(StoreError::Unavailable("down".into())) },
                |rows| done_unless_empty(rows, "Saved", "ok", "none"),
            )
            .await;
        assert!(!failed.success);
        assert_eq!(h.notifier.last().unwrap().variant, ToastVariant::Destructive);

        let empty = runner
            .run(async { Ok::<Vec<u8>, StoreError>(vec![]) }, |rows| {
                done_unless_empty(rows, "Saved", "ok", "none")
            })
            .await;
        assert!(!empty.success);
        assert_eq!(empty.data, Some(vec![]));
        assert_eq!(h.notifier.last().unwrap().variant, ToastVariant::Warning);

        assert_eq!(h.notifier.len(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_loading_is_shared_while_any_action_runs() {
        let h = harness();
        let runner = ActionRunner::new("test", h.ctx.notifier.clone());
        let gate = Arc::new(tokio::sync::Notify::new());

        let slow = {
            let runner = runner.clone();
            let gate = gate.clone();
            tokio::spawn(async move {
                runner
                    .run(
                        async move {
                            gate.notified().await;
                            Ok::<_, StoreError>(())
                        },
                        |_| done("Done", ""),
                    )
                    .await
            })
        };
        while !runner.loading() {
            tokio::task::yield_now().await;
        }

        runner
            .run(async { Ok::<_, StoreError>(()) }, |_| done("Done", ""))
            .await;
        assert!(runner.loading());

        gate.notify_one();
        slow.await.unwrap();
        assert!(!runner.loading());
    }

    #[tokio::test(start_paused = true)]
    async fn test_list_options_use_debounced_search() {
        let h = harness();
        let ctx = h.ctx.with_list_defaults(25, Duration::from_millis(300));
        let mut pagination = ctx.pagination();
        let filters = ctx.search_filters();

        filters.set_search("john");
        filters.update_filter(STATUS_FILTER, "active");
        pagination.go_to_page(3);

        let before = list_options(&pagination, &filters);
        assert_eq!(before.search, None);
        assert_eq!(before.status.as_deref(), Some("active"));
        assert_eq!(before.limit, Some(25));
        assert_eq!(before.offset, Some(50));

        tokio::time::sleep(Duration::from_millis(301)).await;
        assert_eq!(list_options(&pagination, &filters).search.as_deref(), Some("john"));
    }
}
