//! Page parameter handling shared by every list endpoint.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PageParams {
    /// Clamps the requested page into [1, MAX_PAGE_SIZE] with a non-negative
    /// offset.
    pub fn clamp(&self) -> (i64, i64) {
        let limit = self
            .limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        let offset = self.offset.unwrap_or(0).max(0);
        (limit, offset)
    }
}

/// Standard list envelope: rows plus the unpaginated total.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = PageParams {
            limit: None,
            offset: None,
        };
        assert_eq!(params.clamp(), (10, 0));
    }

    #[test]
    fn test_clamps_oversized_limit() {
        let params = PageParams {
            limit: Some(5000),
            offset: Some(-3),
        };
        assert_eq!(params.clamp(), (100, 0));
    }

    #[test]
    fn test_zero_limit_bumped_to_one() {
        let params = PageParams {
            limit: Some(0),
            offset: Some(20),
        };
        assert_eq!(params.clamp(), (1, 20));
    }
}
