//! Types shared by list reads across all entities.

use serde::{Deserialize, Serialize};

/// Status filter value that disables status filtering.
pub const ALL_STATUSES: &str = "all";

/// Largest page a list read returns.
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Placeholder shown when a joined profile is missing.
pub const UNKNOWN_USER: &str = "Unknown User";

/// Placeholder shown when an optional joined value is missing.
pub const NOT_AVAILABLE: &str = "N/A";

/// Options bag accepted by every filtered list read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListOptions {
    /// Case-insensitive substring matched against the entity's text columns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    /// Status equality filter; `"all"` disables it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    /// Zero-based offset of the first row.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
}

impl ListOptions {
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_page(mut self, limit: u32, offset: u32) -> Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }

    /// Search text to apply, if any. Blank text means no search.
    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Requested page size, clamped to `1..=MAX_PAGE_LIMIT`.
    pub fn page_limit(&self) -> Option<u32> {
        self.limit.map(|limit| limit.clamp(1, MAX_PAGE_LIMIT))
    }

    /// Status to filter on, if any. `"all"` and blank mean no filter.
    pub fn status_filter(&self) -> Option<&str> {
        self.status
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case(ALL_STATUSES))
    }
}
