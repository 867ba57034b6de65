//! Page/offset pagination state for list views.

use serde::{Deserialize, Serialize};

/// Default number of rows per page.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Tracks the current page of a list view.
///
/// Pages are 1-based. The helper has no knowledge of the total row count;
/// callers approximate "has a next page" from the size of the last fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    page: u32,
    limit: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl Pagination {
    /// Creates a pagination state on page 1 with the given page size.
    ///
    /// A zero limit is bumped to 1 so that offsets stay meaningful.
    pub fn new(limit: u32) -> Self {
        Self {
            page: 1,
            limit: limit.max(1),
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Zero-based row offset of the current page.
    pub fn offset(&self) -> u32 {
        (self.page - 1) * self.limit
    }

    pub fn next_page(&mut self) {
        self.page = self.page.saturating_add(1);
    }

    /// Moves back one page, never below page 1.
    pub fn prev_page(&mut self) {
        self.page = self.page.saturating_sub(1).max(1);
    }

    /// Jumps to `page`, clamped to a minimum of 1.
    pub fn go_to_page(&mut self, page: u32) {
        self.page = page.max(1);
    }

    /// Changes the page size and returns to the first page.
    pub fn set_limit(&mut self, limit: u32) {
        self.limit = limit.max(1);
        self.page = 1;
    }

    /// Whether a "next" control should be enabled after fetching `fetched` rows.
    ///
    /// This is the full-page heuristic: a page that is exactly full enables
    /// "next" even when no further rows exist.
    pub fn has_next(&self, fetched: usize) -> bool {
        fetched == self.limit as usize
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }
}
