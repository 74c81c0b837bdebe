use serde::Serialize;

const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 100;
// Largest page whose offset still fits in i64 at any limit
const MAX_PAGE: i64 = i64::MAX / MAX_LIMIT;

/// Page window resolved from optional `page` (1-based) and `limit` query parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Page {
    pub page: i64,
    pub limit: i64,
}

impl Page {
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).clamp(1, MAX_PAGE),
            limit: limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let page = Page::new(None, None);
        assert_eq!(page.limit, 20);
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn test_clamping() {
        assert_eq!(Page::new(Some(0), Some(1000)), Page { page: 1, limit: 100 });
        assert_eq!(Page::new(Some(-3), Some(0)), Page { page: 1, limit: 1 });
    }

    #[test]
    fn test_offset() {
        assert_eq!(Page::new(Some(3), Some(10)).offset(), 20);
    }

    #[test]
    fn test_huge_page_does_not_overflow() {
        let page = Page::new(Some(i64::MAX), Some(100));
        assert_eq!(page.page, MAX_PAGE);
        assert!(page.offset() > 0);
        assert!(page.offset() <= i64::MAX - 100);
    }
}
