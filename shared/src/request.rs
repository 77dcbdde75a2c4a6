//! Request types shared by list endpoints

use serde::Deserialize;

/// Upper bound on page_size, whatever the client asks for
pub const MAX_PAGE_SIZE: u32 = 100;

/// Pagination query parameters
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PaginationQuery {
    /// Page number (1-based, default: 1)
    #[serde(default = "default_page")]
    pub page: u32,

    /// Items per page (default: 10, max: 100)
    #[serde(default = "default_page_size", alias = "pageSize")]
    pub page_size: u32,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    10
}

impl Default for PaginationQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

impl PaginationQuery {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self { page, page_size }
    }

    /// Page clamped to >= 1
    pub fn page(&self) -> u32 {
        self.page.max(1)
    }

    /// Page size clamped to 1..=100; zero falls back to the default
    pub fn limit(&self) -> u32 {
        match self.page_size {
            0 => default_page_size(),
            n => n.min(MAX_PAGE_SIZE),
        }
    }

    /// Row offset for database queries
    pub fn offset(&self) -> u64 {
        (self.page() - 1) as u64 * self.limit() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_absent() {
        let q: PaginationQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(q.page(), 1);
        assert_eq!(q.limit(), 10);
        assert_eq!(q.offset(), 0);
    }

    #[test]
    fn page_size_is_capped_and_zero_page_clamped() {
        let q = PaginationQuery::new(0, 500);
        assert_eq!(q.page(), 1);
        assert_eq!(q.limit(), MAX_PAGE_SIZE);

        let q = PaginationQuery::new(3, 20);
        assert_eq!(q.offset(), 40);
    }

    #[test]
    fn camel_case_alias_is_accepted() {
        let q: PaginationQuery = serde_json::from_str(r#"{"page":2,"pageSize":25}"#).unwrap();
        assert_eq!(q.limit(), 25);
        assert_eq!(q.offset(), 25);
    }
}
