const DEFAULT_LIMIT: i64 = 10;
const MAX_LIMIT: i64 = 100;

/// Normalized page/limit pair. Out-of-range input is clamped rather than
/// rejected so a request like `?page=0` still answers with the first page.
#[derive(Debug, Clone, Copy)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
}

impl Pagination {
    pub fn clamp(page: Option<i64>, limit: Option<i64>) -> Self {
        let page = page.unwrap_or(1).max(1);
        let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        Self { page, limit }
    }

    pub fn offset(&self) -> i64 {
        // page is clamped to >= 1 but otherwise caller-chosen, so the
        // multiplication must saturate rather than overflow.
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn total_pages(&self, total_count: i64) -> i64 {
        if total_count <= 0 {
            0
        } else {
            (total_count + self.limit - 1) / self.limit
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply() {
        let p = Pagination::clamp(None, None);
        assert_eq!(p.page, 1);
        assert_eq!(p.limit, DEFAULT_LIMIT);
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn twelve_tickets_limit_five_is_three_pages() {
        let p = Pagination::clamp(Some(2), Some(5));
        assert_eq!(p.offset(), 5);
        assert_eq!(p.total_pages(12), 3);
    }

    #[test]
    fn exact_multiple_has_no_partial_page() {
        let p = Pagination::clamp(Some(1), Some(5));
        assert_eq!(p.total_pages(10), 2);
    }

    #[test]
    fn empty_collection_has_zero_pages() {
        let p = Pagination::clamp(Some(1), Some(5));
        assert_eq!(p.total_pages(0), 0);
    }

    #[test]
    fn huge_page_saturates_instead_of_overflowing() {
        let p = Pagination::clamp(Some(i64::MAX), Some(100));
        assert_eq!(p.offset(), i64::MAX);
        assert!(Pagination::clamp(Some(i64::MAX - 1), Some(7)).offset() >= 0);
    }

    #[test]
    fn zero_page_and_oversized_limit_are_clamped() {
        let p = Pagination::clamp(Some(0), Some(5000));
        assert_eq!(p.page, 1);
        assert_eq!(p.limit, MAX_LIMIT);
    }
}
