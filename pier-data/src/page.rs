use serde::Serialize;

use crate::error::DataError;

/// Page geometry for a result set of `total_items` rows.
///
/// `current_page` is 1-based and clamped to `[1, max(1, page_count)]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub total_items: u64,
    pub items_per_page: u64,
    pub current_page: u64,
    pub page_count: u64,
    #[serde(skip)]
    requested_page: u64,
}

impl Pagination {
    /// Page 0 is treated as page 1; `items_per_page` must be at least 1.
    pub fn new(total_items: u64, items_per_page: u64, requested_page: u64) -> Result<Self, DataError> {
        if items_per_page == 0 {
            return Err(DataError::InvalidArgument(
                "items per page must be at least 1".into(),
            ));
        }
        let requested_page = requested_page.max(1);
        let page_count = total_items.div_ceil(items_per_page);
        Ok(Self {
            total_items,
            items_per_page,
            current_page: requested_page.min(page_count.max(1)),
            page_count,
            requested_page,
        })
    }

    /// Row offset of the first item on the current page.
    pub fn offset(&self) -> u64 {
        (self.current_page - 1) * self.items_per_page
    }

    pub fn limit(&self) -> u64 {
        self.items_per_page
    }

    /// The caller asked for a page past the last one.
    pub fn is_out_of_range(&self) -> bool {
        self.requested_page > self.page_count.max(1)
    }

    pub fn has_previous(&self) -> bool {
        self.current_page > 1
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.page_count
    }
}

/// A page of results with pagination metadata.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub content: Vec<T>,
    #[serde(flatten)]
    pub pagination: Pagination,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, pagination: Pagination) -> Self {
        Self {
            content,
            pagination,
        }
    }

    pub fn empty(pagination: Pagination) -> Self {
        Self::new(Vec::new(), pagination)
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            pagination: self.pagination,
        }
    }
}
