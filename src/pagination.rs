use serde::{Deserialize, Serialize};

const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 100;

/// `?page=N&limit=M`, 1-based page.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageParams {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    /// Saturates for huge page numbers; Postgres then returns an empty page.
    pub fn offset(&self) -> i64 {
        (self.page.unwrap_or(1).max(1) - 1).saturating_mul(self.limit())
    }
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub count: i64,
    pub results: Vec<T>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let p = PageParams::default();
        assert_eq!(p.limit(), 20);
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn offset_follows_page_and_limit() {
        let p = PageParams {
            page: Some(3),
            limit: Some(6),
        };
        assert_eq!(p.offset(), 12);
    }

    #[test]
    fn clamps_out_of_range_values() {
        let p = PageParams {
            page: Some(0),
            limit: Some(10_000),
        };
        assert_eq!(p.limit(), 100);
        assert_eq!(p.offset(), 0);

        let p = PageParams {
            page: Some(-2),
            limit: Some(0),
        };
        assert_eq!(p.limit(), 1);
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn huge_page_saturates_instead_of_overflowing() {
        let p = PageParams {
            page: Some(i64::MAX),
            limit: Some(20),
        };
        assert_eq!(p.offset(), i64::MAX);

        let p = PageParams {
            page: Some(i64::MAX / 10),
            limit: Some(100),
        };
        assert!(p.offset() > 0);
    }
}
