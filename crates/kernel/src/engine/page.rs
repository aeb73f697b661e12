//! Pagination request and page envelope.

use serde::{Deserialize, Serialize};

use super::error::{EngineError, EngineResult};

/// Largest page a caller may request.
pub const MAX_PAGE_SIZE: i64 = 1000;

/// Page size used when the caller omits one.
pub const DEFAULT_PAGE_SIZE: i64 = 50;

/// Zero-based page request.
///
/// Kept as signed integers so out-of-range input survives deserialization
/// and is rejected by [`PageRequest::validate`] with a proper error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    #[serde(default)]
    pub page: i64,
    #[serde(default = "default_size")]
    pub size: i64,
}

fn default_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    pub fn new(page: i64, size: i64) -> Self {
        Self { page, size }
    }

    /// Reject negative pages and sizes outside `1..=MAX_PAGE_SIZE`.
    pub fn validate(&self) -> EngineResult<()> {
        if self.page < 0 {
            return Err(EngineError::InvalidPagination(format!(
                "page must be >= 0, got {}",
                self.page
            )));
        }
        if self.size <= 0 || self.size > MAX_PAGE_SIZE {
            return Err(EngineError::InvalidPagination(format!(
                "size must be between 1 and {MAX_PAGE_SIZE}, got {}",
                self.size
            )));
        }
        self.offset().map(|_| ())
    }

    /// Row offset of the first element on this page.
    pub fn offset(&self) -> EngineResult<u64> {
        self.page
            .checked_mul(self.size)
            .and_then(|o| u64::try_from(o).ok())
            .ok_or_else(|| {
                EngineError::InvalidPagination(format!("page {} is out of range", self.page))
            })
    }

    /// Page size as a row limit.
    pub fn limit(&self) -> u64 {
        u64::try_from(self.size).unwrap_or(0)
    }
}

/// One page of rows plus the totals for the whole filter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResult<T> {
    /// Rows on this page, ascending by id.
    pub content: Vec<T>,

    /// Requested page index (zero-based).
    pub page: i64,

    /// Requested page size.
    pub size: i64,

    /// Matching rows across all pages.
    pub total_elements: u64,

    /// `ceil(total_elements / size)`.
    pub total_pages: u64,
}

impl<T> PageResult<T> {
    /// Assemble a page from a validated request.
    pub fn new(content: Vec<T>, request: PageRequest, total_elements: u64) -> Self {
        let size = request.limit().max(1);
        Self {
            content,
            page: request.page,
            size: request.size,
            total_elements,
            total_pages: total_elements.div_ceil(size),
        }
    }

    /// Whether a page after this one exists.
    pub fn has_next(&self) -> bool {
        u64::try_from(self.page).is_ok_and(|p| p + 1 < self.total_pages)
    }

    /// Transform the rows while keeping the paging metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PageResult<U> {
        PageResult {
            content: self.content.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total_elements: self.total_elements,
            total_pages: self.total_pages,
        }
    }
}
