use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_PAGE_SIZE;

/// 1-based page window over a newest-first listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: i64,
    pub page_size: i64,
}

impl Pagination {
    /// Non-positive page sizes fall back to [`DEFAULT_PAGE_SIZE`].
    /// Pages past the end are allowed and simply yield nothing.
    pub fn new(page: i64, page_size: i64) -> Self {
        let page_size = if page_size <= 0 {
            DEFAULT_PAGE_SIZE
        } else {
            page_size
        };
        Self { page, page_size }
    }

    pub fn limit(&self) -> i64 {
        self.page_size
    }

    /// `(page - 1) * page_size`, clamped at zero for pages below 1.
    pub fn offset(&self) -> i64 {
        self.page
            .saturating_sub(1)
            .saturating_mul(self.page_size)
            .max(0)
    }

    /// Last page index for `total` records: `ceil(total / page_size)`, at least 1.
    pub fn max_page(total: i64, page_size: i64) -> i64 {
        let page_size = Self::new(1, page_size).page_size;
        let total = total.max(0);
        let pages = total / page_size + i64::from(total % page_size != 0);
        pages.max(1)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_is_zero_based_from_one_based_page() {
        assert_eq!(Pagination::new(1, 20).offset(), 0);
        assert_eq!(Pagination::new(3, 20).offset(), 40);
        assert_eq!(Pagination::new(2, 7).offset(), 7);
    }

    #[test]
    fn non_positive_page_size_uses_default() {
        assert_eq!(Pagination::new(1, 0).limit(), DEFAULT_PAGE_SIZE);
        assert_eq!(Pagination::new(1, -5).limit(), DEFAULT_PAGE_SIZE);
        assert_eq!(Pagination::new(2, -1).offset(), DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn pages_below_one_clamp_to_start() {
        assert_eq!(Pagination::new(0, 20).offset(), 0);
        assert_eq!(Pagination::new(-3, 20).offset(), 0);
    }

    #[test]
    fn max_page_rounds_up_with_minimum_one() {
        assert_eq!(Pagination::max_page(0, 20), 1);
        assert_eq!(Pagination::max_page(20, 20), 1);
        assert_eq!(Pagination::max_page(21, 20), 2);
        assert_eq!(Pagination::max_page(45, 0), 3);
    }

    #[test]
    fn max_page_with_huge_page_size() {
        assert_eq!(Pagination::max_page(2, i64::MAX), 1);
        assert_eq!(Pagination::max_page(i64::MAX, i64::MAX), 1);
        assert_eq!(Pagination::max_page(i64::MAX, 1), i64::MAX);
    }
}
