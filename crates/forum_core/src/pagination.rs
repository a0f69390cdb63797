//! crates/forum_core/src/pagination.rs
//!
//! Offset pagination shared by every list operation.

use serde::Serialize;

use crate::ports::{PortError, PortResult};

pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;

/// A validated 1-indexed page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl PageRequest {
    pub fn new(page: Option<u32>, limit: Option<u32>) -> PortResult<Self> {
        let page = page.unwrap_or(1);
        let limit = limit.unwrap_or(DEFAULT_LIMIT);
        if page < 1 {
            return Err(PortError::Validation("page must be at least 1".to_string()));
        }
        if limit < 1 || limit > MAX_LIMIT {
            return Err(PortError::Validation(format!(
                "limit must be between 1 and {}",
                MAX_LIMIT
            )));
        }
        Ok(Self { page, limit })
    }

    pub fn skip(&self) -> u64 {
        (self.page as u64 - 1) * self.limit as u64
    }

    pub fn limit(&self) -> u64 {
        self.limit as u64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u64,
    pub total_items: u64,
    pub has_more: bool,
}

impl Pagination {
    pub fn new(request: PageRequest, total: u64) -> Self {
        let limit = request.limit as u64;
        Self {
            current_page: request.page,
            total_pages: total.div_ceil(limit),
            total_items: total,
            has_more: (request.page as u64) * limit < total,
        }
    }
}

/// A page of items together with its bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total: u64) -> Self {
        Self {
            items,
            pagination: Pagination::new(request, total),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            items: self.items.into_iter().map(f).collect(),
            pagination: self.pagination,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic_matches_ceil_and_has_more() {
        for (page, limit, total) in [(1, 10, 0), (1, 10, 10), (1, 10, 11), (2, 10, 11), (3, 7, 30)] {
            let request = PageRequest::new(Some(page), Some(limit)).unwrap();
            let p = Pagination::new(request, total);
            assert_eq!(p.total_pages, (total as f64 / limit as f64).ceil() as u64);
            assert_eq!(p.has_more, (page as u64 * limit as u64) < total);
            assert_eq!(p.current_page, page);
        }
    }

    #[test]
    fn skip_is_offset_of_previous_pages() {
        let request = PageRequest::new(Some(3), Some(20)).unwrap();
        assert_eq!(request.skip(), 40);
        assert_eq!(PageRequest::default().skip(), 0);
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(PageRequest::new(Some(0), None).is_err());
        assert!(PageRequest::new(None, Some(0)).is_err());
        assert!(PageRequest::new(None, Some(MAX_LIMIT + 1)).is_err());
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(Pagination::new(PageRequest::default(), 25)).unwrap();
        assert_eq!(json["totalPages"], 3);
        assert_eq!(json["hasMore"], true);
        assert_eq!(json["currentPage"], 1);
    }
}
