//! Debounced search text and filter state for list views.
//!
//! Only the debounced value should feed queries, so a request is not fired for
//! every keystroke.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;

/// Default delay before raw search text is published.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug, Default)]
struct SearchState {
    search: String,
    filters: BTreeMap<String, String>,
    generation: u64,
}

/// Raw search text, a filter map, and the debounced search text.
///
/// Every [`SearchFilters::set_search`] call restarts the debounce window; the
/// debounced value is published once the text has been stable for the full
/// delay. Must be used from within a tokio runtime.
#[derive(Debug, Clone)]
pub struct SearchFilters {
    state: Arc<Mutex<SearchState>>,
    debounced: Arc<watch::Sender<String>>,
    delay: Duration,
}

impl Default for SearchFilters {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl SearchFilters {
    pub fn new(delay: Duration) -> Self {
        let (tx, _rx) = watch::channel(String::new());
        Self {
            state: Arc::new(Mutex::new(SearchState::default())),
            debounced: Arc::new(tx),
            delay,
        }
    }

    fn lock(&self) -> MutexGuard<'_, SearchState> {
        // A poisoned lock only means another holder panicked mid-update of
        // plain data; the state is still usable.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Updates the raw search text and schedules its publication.
    pub fn set_search(&self, text: impl Into<String>) {
        let text = text.into();
        let generation = {
            let mut state = self.lock();
            state.search = text.clone();
            state.generation += 1;
            state.generation
        };

        let state = Arc::clone(&self.state);
        let debounced = Arc::clone(&self.debounced);
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let current = state.lock().unwrap_or_else(|e| e.into_inner()).generation;
            if current != generation {
                return;
            }
            debounced.send_if_modified(|value| {
                if *value == text {
                    false
                } else {
                    tracing::trace!(search = %text, "Debounced search published");
                    *value = text;
                    true
                }
            });
        });
    }

    /// Current raw search text.
    pub fn search(&self) -> String {
        self.lock().search.clone()
    }

    /// Last published search text.
    pub fn debounced_search(&self) -> String {
        self.debounced.borrow().clone()
    }

    /// Receiver that is notified whenever the debounced search changes.
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.debounced.subscribe()
    }

    /// Merges a single filter value.
    pub fn update_filter(&self, key: impl Into<String>, value: impl Into<String>) {
        self.lock().filters.insert(key.into(), value.into());
    }

    pub fn filter(&self, key: &str) -> Option<String> {
        self.lock().filters.get(key).cloned()
    }

    pub fn filters(&self) -> BTreeMap<String, String> {
        self.lock().filters.clone()
    }

    /// Resets search text and filters.
    ///
    /// The empty search is published immediately and any pending publication
    /// is abandoned.
    pub fn clear_filters(&self) {
        {
            let mut state = self.lock();
            state.search.clear();
            state.filters.clear();
            state.generation += 1;
        }
        self.debounced.send_if_modified(|value| {
            if value.is_empty() {
                false
            } else {
                value.clear();
                true
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_rapid_updates_publish_only_final_value() {
        let search = SearchFilters::new(Duration::from_millis(300));
        let mut rx = search.subscribe();

        search.set_search("j");
        tokio::time::sleep(Duration::from_millis(100)).await;
        search.set_search("jo");
        tokio::time::sleep(Duration::from_millis(100)).await;
        search.set_search("john");

        assert_eq!(search.search(), "john");
        assert_eq!(search.debounced_search(), "");

        tokio::time::sleep(Duration::from_millis(350)).await;

        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), "john");
        assert!(!rx.has_changed().unwrap());
        assert_eq!(search.debounced_search(), "john");
    }

    #[tokio::test(start_paused = true)]
    async fn test_value_not_published_before_delay() {
        let search = SearchFilters::new(Duration::from_millis(300));
        search.set_search("jane");
        tokio::time::sleep(Duration::from_millis(299)).await;
        assert_eq!(search.debounced_search(), "");
        tokio::time::sleep(Duration::from_millis(2)).await;
        tokio::task::yield_now().await;
        assert_eq!(search.debounced_search(), "jane");
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_windows_publish_separately() {
        let search = SearchFilters::default();
        let mut rx = search.subscribe();

        search.set_search("a");
        tokio::time::sleep(DEFAULT_DEBOUNCE * 2).await;
        assert_eq!(*rx.borrow_and_update(), "a");

        search.set_search("ab");
        tokio::time::sleep(DEFAULT_DEBOUNCE * 2).await;
        assert_eq!(*rx.borrow_and_update(), "ab");
    }

    #[tokio::test]
    async fn test_update_filter_merges_keys() {
        let search = SearchFilters::default();
        search.update_filter("status", "pending");
        search.update_filter("type", "passport");
        search.update_filter("status", "approved");

        let filters = search.filters();
        assert_eq!(filters.len(), 2);
        assert_eq!(search.filter("status").as_deref(), Some("approved"));
        assert_eq!(search.filter("type").as_deref(), Some("passport"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_filters_resets_everything() {
        let search = SearchFilters::new(Duration::from_millis(300));
        search.set_search("john");
        search.update_filter("status", "active");
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(search.debounced_search(), "john");

        search.set_search("johnny");
        search.clear_filters();
        assert_eq!(search.search(), "");
        assert!(search.filters().is_empty());
        assert_eq!(search.debounced_search(), "");

        // The pending "johnny" publication was abandoned.
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(search.debounced_search(), "");
    }
}
