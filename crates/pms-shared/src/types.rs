//! Common types

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_PAGE, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

/// Pagination metadata returned with every list response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total: u64) -> Self {
        let limit = limit.max(1);
        Self {
            page,
            limit,
            total,
            total_pages: total.div_ceil(u64::from(limit)),
        }
    }
}

/// Coerce raw page/limit values to sane bounds instead of failing.
pub fn coerce_page(page: Option<&str>) -> u32 {
    page.and_then(|p| p.trim().parse::<i64>().ok())
        .filter(|p| *p >= 1)
        .map(|p| p.min(i64::from(u32::MAX)) as u32)
        .unwrap_or(DEFAULT_PAGE)
}

pub fn coerce_limit(limit: Option<&str>) -> u32 {
    limit.and_then(|l| l.trim().parse::<i64>().ok())
        .filter(|l| *l >= 1)
        .map(|l| l.min(i64::from(MAX_PAGE_SIZE)) as u32)
        .unwrap_or(DEFAULT_PAGE_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_pages_rounds_up() {
        assert_eq!(Pagination::new(1, 10, 0).total_pages, 0);
        assert_eq!(Pagination::new(1, 10, 10).total_pages, 1);
        assert_eq!(Pagination::new(1, 10, 11).total_pages, 2);
        assert_eq!(Pagination::new(3, 7, 50).total_pages, 8);
    }

    #[test]
    fn test_coerce_invalid_values() {
        assert_eq!(coerce_page(None), 1);
        assert_eq!(coerce_page(Some("0")), 1);
        assert_eq!(coerce_page(Some("-4")), 1);
        assert_eq!(coerce_page(Some("abc")), 1);
        assert_eq!(coerce_page(Some("3")), 3);
        assert_eq!(coerce_limit(Some("0")), DEFAULT_PAGE_SIZE);
        assert_eq!(coerce_limit(Some("25")), 25);
        assert_eq!(coerce_limit(Some("100000")), MAX_PAGE_SIZE);
    }
}
