//! Offset pagination shared by product and order listings.

use serde::{Deserialize, Serialize};

use super::ValidationError;

/// Default page size.
pub const DEFAULT_PER_PAGE: u32 = 24;

/// Largest page size a client may request.
pub const MAX_PER_PAGE: u32 = 100;

/// Pagination query parameters.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageRequest {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl PageRequest {
    /// Validate and fill in defaults.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for `page == 0` or `per_page` outside `1..=100`.
    pub fn resolve(self) -> Result<Pagination, ValidationError> {
        let page = self.page.unwrap_or(1);
        if page == 0 {
            return Err(ValidationError::new("page must be at least 1"));
        }
        let per_page = self.per_page.unwrap_or(DEFAULT_PER_PAGE);
        if !(1..=MAX_PER_PAGE).contains(&per_page) {
            return Err(ValidationError::new(format!(
                "per_page must be between 1 and {MAX_PER_PAGE}"
            )));
        }
        Ok(Pagination { page, per_page })
    }
}

/// A validated page position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
}

impl Pagination {
    /// Number of items to skip.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.per_page as u64
    }

    /// Slice one page out of an already ordered list.
    #[must_use]
    pub fn slice<T: Clone>(&self, all: &[T]) -> Page<T> {
        let start = usize::try_from(self.offset()).unwrap_or(usize::MAX);
        let items = all
            .iter()
            .skip(start)
            .take(self.per_page as usize)
            .cloned()
            .collect();
        self.page_of(items, all.len() as u64)
    }

    /// Wrap a page of items fetched elsewhere with its totals.
    #[must_use]
    pub const fn page_of<T>(&self, items: Vec<T>, total: u64) -> Page<T> {
        Page {
            items,
            page: self.page,
            per_page: self.per_page,
            total,
            total_pages: total.div_ceil(self.per_page as u64),
        }
    }
}

/// One page of results.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    /// Convert every item, keeping the totals.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            total: self.total,
            total_pages: self.total_pages,
        }
    }
}
