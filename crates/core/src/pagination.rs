//! Offset pagination used by listing endpoints.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// A validated 1-based page request.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    page: u32,
    per_page: u32,
}

impl PageRequest {
    /// Both `page` and `per_page` must be at least 1.
    pub fn new(page: u32, per_page: u32) -> DomainResult<Self> {
        if page == 0 {
            return Err(DomainError::validation("page must be >= 1"));
        }
        if per_page == 0 {
            return Err(DomainError::validation("per_page must be >= 1"));
        }
        Ok(Self { page, per_page })
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    /// Number of records to skip.
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.per_page)
    }

    pub fn limit(&self) -> u64 {
        u64::from(self.per_page)
    }

    pub fn summarize(&self, total: u64) -> PageSummary {
        PageSummary {
            page: self.page,
            per_page: self.per_page,
            total,
            total_pages: total.div_ceil(u64::from(self.per_page)),
        }
    }
}

/// Pagination summary returned next to a page of rows.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSummary {
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub total_pages: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn zero_page_is_rejected() {
        assert!(PageRequest::new(0, 10).is_err());
        assert!(PageRequest::new(1, 0).is_err());
    }

    #[test]
    fn summary_rounds_total_pages_up() {
        let req = PageRequest::new(1, 1).unwrap();
        assert_eq!(req.summarize(2).total_pages, 2);

        let req = PageRequest::new(2, 10).unwrap();
        assert_eq!(req.offset(), 10);
        assert_eq!(req.summarize(21).total_pages, 3);
        assert_eq!(req.summarize(0).total_pages, 0);
    }

    proptest! {
        /// Property: every record falls on exactly one page.
        #[test]
        fn pages_cover_total(total in 0u64..10_000, per_page in 1u32..200) {
            let req = PageRequest::new(1, per_page).unwrap();
            let summary = req.summarize(total);
            prop_assert!(summary.total_pages * u64::from(per_page) >= total);
            if summary.total_pages > 0 {
                prop_assert!((summary.total_pages - 1) * u64::from(per_page) < total);
            }
        }
    }
}
