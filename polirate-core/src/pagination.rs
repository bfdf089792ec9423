//! Pagination types

use serde::{Deserialize, Serialize};

/// Maximum items per page
const MAX_LIMIT: u32 = 100;

/// Default items per page
const DEFAULT_LIMIT: u32 = 20;

/// Pagination parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Page number (1-indexed)
    pub page: u32,
    /// Items per page (max 100)
    pub limit: u32,
}

impl Pagination {
    /// Create pagination with validation.
    ///
    /// - Page is clamped to minimum of 1
    /// - Limit is clamped to 1..=100
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, MAX_LIMIT),
        }
    }

    /// Calculate SQL OFFSET value.
    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.limit as i64
    }

    /// Get LIMIT value.
    pub fn limit(&self) -> i64 {
        self.limit as i64
    }

    /// Wrap a page of rows fetched with these parameters.
    pub fn wrap<T>(&self, items: Vec<T>, total: i64) -> Paginated<T> {
        Paginated {
            items,
            total,
            page: self.page,
            limit: self.limit,
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// A page of results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    /// Items for current page
    pub items: Vec<T>,
    /// Total count across all pages
    pub total: i64,
    /// Current page number
    pub page: u32,
    /// Items per page
    pub limit: u32,
}

impl<T> Paginated<T> {
    /// Calculate total number of pages.
    pub fn total_pages(&self) -> u32 {
        if self.total <= 0 {
            1
        } else {
            let limit = self.limit.max(1) as i64;
            ((self.total + limit - 1) / limit).max(1) as u32
        }
    }

    /// Check if there's a next page.
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    /// Check if there's a previous page.
    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    /// Convert the items while keeping the page metadata.
    pub fn map<U, F>(self, f: F) -> Paginated<U>
    where
        F: FnMut(T) -> U,
    {
        Paginated {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            limit: self.limit,
        }
    }

    /// Page metadata for response envelopes.
    pub fn meta(&self) -> PageMeta {
        PageMeta {
            page: self.page,
            limit: self.limit,
            total: self.total,
            total_pages: self.total_pages(),
            has_next: self.has_next(),
            has_prev: self.has_prev(),
        }
    }
}

/// Serialized pagination block returned next to list data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_prev: bool,
}

/// Query parameters for pagination and sorting
///
/// `sortBy`/`sortOrder` stay raw strings here; each resource parses them
/// against its own whitelist (see [`crate::sort`]).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaginationParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    #[serde(rename = "sortBy", alias = "sort_by")]
    pub sort_by: Option<String>,
    #[serde(rename = "sortOrder", alias = "sort_order")]
    pub sort_order: Option<String>,
}

impl PaginationParams {
    pub fn pagination(&self) -> Pagination {
        Pagination::new(self.page.unwrap_or(1), self.limit.unwrap_or(DEFAULT_LIMIT))
    }
}

impl From<PaginationParams> for Pagination {
    fn from(params: PaginationParams) -> Self {
        params.pagination()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_calculation() {
        assert_eq!(Pagination::new(1, 10).offset(), 0);
        assert_eq!(Pagination::new(2, 10).offset(), 10);
        assert_eq!(Pagination::new(3, 25).offset(), 50);
    }

    #[test]
    fn clamps_page() {
        assert_eq!(Pagination::new(0, 10).page, 1);
    }

    #[test]
    fn clamps_limit() {
        assert_eq!(Pagination::new(1, 0).limit, 1);
        assert_eq!(Pagination::new(1, 999).limit, 100);
    }

    #[test]
    fn params_defaults() {
        let p = PaginationParams::default().pagination();
        assert_eq!(p, Pagination::new(1, 20));
    }

    #[test]
    fn params_deserialize_camel_case() {
        let params: PaginationParams =
            serde_json::from_str(r#"{"page":2,"limit":5,"sortBy":"like_count","sortOrder":"asc"}"#)
                .unwrap();
        assert_eq!(params.pagination(), Pagination::new(2, 5));
        assert_eq!(params.sort_by.as_deref(), Some("like_count"));
        assert_eq!(params.sort_order.as_deref(), Some("asc"));
    }

    #[test]
    fn total_pages() {
        let page = |total| Paginated::<()> {
            items: vec![],
            total,
            page: 1,
            limit: 10,
        };
        assert_eq!(page(0).total_pages(), 1);
        assert_eq!(page(25).total_pages(), 3);
        assert_eq!(page(100).total_pages(), 10);
    }

    #[test]
    fn has_next_prev() {
        let page = |page| Paginated::<()> {
            items: vec![],
            total: 30,
            page,
            limit: 10,
        };
        assert!(page(1).has_next());
        assert!(!page(1).has_prev());
        assert!(page(2).has_next() && page(2).has_prev());
        assert!(!page(3).has_next());
    }

    #[test]
    fn map_keeps_meta() {
        let p = Pagination::new(2, 2).wrap(vec![1, 2], 5).map(|n| n * 10);
        assert_eq!(p.items, vec![10, 20]);
        let meta = p.meta();
        assert_eq!(meta.total_pages, 3);
        assert!(meta.has_next && meta.has_prev);
    }
}
