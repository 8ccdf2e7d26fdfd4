//! Pagination types

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

/// Default items per page
pub const DEFAULT_PER_PAGE: u32 = 10;

/// Pagination parameters. Only constructible through [`Pagination::new`],
/// deserialization included, so `page` and `per_page` are always >= 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPagination")]
pub struct Pagination {
    /// Page number (1-indexed)
    page: u32,
    /// Items per page
    per_page: u32,
}

#[derive(Deserialize)]
struct RawPagination {
    page: u32,
    per_page: u32,
}

impl TryFrom<RawPagination> for Pagination {
    type Error = StoreError;

    fn try_from(raw: RawPagination) -> Result<Self> {
        Self::new(raw.page, raw.per_page)
    }
}

impl Pagination {
    /// Create pagination, rejecting a page number or page size below 1.
    pub fn new(page: u32, per_page: u32) -> Result<Self> {
        if page < 1 {
            return Err(StoreError::invalid_argument(
                "page",
                format!("page number must be >= 1 (got {})", page),
            ));
        }
        if per_page < 1 {
            return Err(StoreError::invalid_argument(
                "per_page",
                format!("page size must be >= 1 (got {})", per_page),
            ));
        }
        Ok(Self { page, per_page })
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    /// Calculate SQL OFFSET value.
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.per_page)
    }

    /// Get LIMIT value.
    pub fn limit(&self) -> u32 {
        self.per_page
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}
