//! Page/limit pagination primitives shared by backend endpoints.
//!
//! Endpoints that page through owner-scoped collections accept 1-indexed
//! `page`/`limit` query parameters and reply with a [`PageEnvelope`] whose
//! `pagination` block mirrors the request alongside the collection totals.
//! Validation lives here so every endpoint rejects the same malformed
//! inputs with the same messages.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest page size an endpoint will serve in one response.
pub const MAX_LIMIT: u32 = 100;

/// Page size applied when the caller omits `limit`.
pub const DEFAULT_LIMIT: u32 = 10;

/// Validation failures raised when constructing a [`PageRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PageRequestError {
    /// Pages are 1-indexed; zero is not addressable.
    #[error("page must be at least 1")]
    PageOutOfRange,
    /// A zero limit would never terminate client-side paging.
    #[error("limit must be at least 1")]
    LimitTooSmall,
    /// Limits above [`MAX_LIMIT`] are refused rather than clamped.
    #[error("limit must not exceed {MAX_LIMIT}")]
    LimitTooLarge,
}

/// Validated 1-indexed page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    limit: u32,
}

impl PageRequest {
    /// Validate a page/limit pair, applying [`DEFAULT_LIMIT`] and page 1
    /// for absent values.
    ///
    /// # Examples
    /// ```
    /// use pagination::PageRequest;
    ///
    /// let request = PageRequest::new(None, None).expect("defaults are valid");
    /// assert_eq!(request.page(), 1);
    /// assert_eq!(request.limit(), pagination::DEFAULT_LIMIT);
    /// ```
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Result<Self, PageRequestError> {
        let page = page.unwrap_or(1);
        let limit = limit.unwrap_or(DEFAULT_LIMIT);
        if page == 0 {
            return Err(PageRequestError::PageOutOfRange);
        }
        if limit == 0 {
            return Err(PageRequestError::LimitTooSmall);
        }
        if limit > MAX_LIMIT {
            return Err(PageRequestError::LimitTooLarge);
        }
        Ok(Self { page, limit })
    }

    /// 1-indexed page number.
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Number of items per page.
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Row offset for SQL-style `OFFSET`/`LIMIT` paging.
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

/// Collection totals echoed back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    /// Total number of items across all pages.
    pub total: u64,
    /// 1-indexed page this envelope covers.
    pub page: u32,
    /// Page size used for this envelope.
    pub limit: u32,
    /// `ceil(total / limit)`; zero when the collection is empty.
    pub total_pages: u64,
}

impl PageInfo {
    /// Compute page info for a request against a collection of `total`
    /// items.
    ///
    /// # Examples
    /// ```
    /// use pagination::{PageInfo, PageRequest};
    ///
    /// let request = PageRequest::new(Some(2), Some(10)).expect("valid");
    /// let info = PageInfo::for_request(&request, 25);
    /// assert_eq!(info.total_pages, 3);
    /// ```
    pub fn for_request(request: &PageRequest, total: u64) -> Self {
        Self {
            total,
            page: request.page(),
            limit: request.limit(),
            total_pages: total.div_ceil(u64::from(request.limit())),
        }
    }

    /// Whether a further page exists after this one.
    pub fn has_next_page(&self) -> bool {
        u64::from(self.page) < self.total_pages
    }
}

/// Response envelope pairing one page of data with its [`PageInfo`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageEnvelope<T> {
    /// Items on this page, in the endpoint's documented order.
    pub data: Vec<T>,
    /// Collection totals for this page.
    pub pagination: PageInfo,
}

impl<T> PageEnvelope<T> {
    /// Wrap one page of items with totals computed from the request.
    pub fn new(data: Vec<T>, request: &PageRequest, total: u64) -> Self {
        Self {
            data,
            pagination: PageInfo::for_request(request, total),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(Some(0), None, PageRequestError::PageOutOfRange)]
    #[case(None, Some(0), PageRequestError::LimitTooSmall)]
    #[case(None, Some(MAX_LIMIT + 1), PageRequestError::LimitTooLarge)]
    fn rejects_out_of_range_input(
        #[case] page: Option<u32>,
        #[case] limit: Option<u32>,
        #[case] expected: PageRequestError,
    ) {
        let err = PageRequest::new(page, limit).expect_err("input rejected");
        assert_eq!(err, expected);
    }

    #[rstest]
    fn defaults_apply_when_absent() {
        let request = PageRequest::new(None, None).expect("defaults valid");
        assert_eq!(request.page(), 1);
        assert_eq!(request.limit(), DEFAULT_LIMIT);
        assert_eq!(request.offset(), 0);
    }

    #[rstest]
    #[case(1, 10, 0)]
    #[case(2, 10, 10)]
    #[case(3, 25, 50)]
    fn offset_is_zero_indexed(#[case] page: u32, #[case] limit: u32, #[case] expected: u64) {
        let request = PageRequest::new(Some(page), Some(limit)).expect("valid");
        assert_eq!(request.offset(), expected);
    }

    #[rstest]
    #[case(0, 10, 0)]
    #[case(1, 10, 1)]
    #[case(25, 10, 3)]
    #[case(30, 10, 3)]
    fn total_pages_rounds_up(#[case] total: u64, #[case] limit: u32, #[case] expected: u64) {
        let request = PageRequest::new(None, Some(limit)).expect("valid");
        let info = PageInfo::for_request(&request, total);
        assert_eq!(info.total_pages, expected);
    }

    #[rstest]
    fn has_next_page_compares_against_total_pages() {
        let request = PageRequest::new(Some(2), Some(10)).expect("valid");
        let info = PageInfo::for_request(&request, 25);
        assert!(info.has_next_page());

        let last = PageRequest::new(Some(3), Some(10)).expect("valid");
        let info = PageInfo::for_request(&last, 25);
        assert!(!info.has_next_page());
    }

    #[rstest]
    fn envelope_serialises_camel_case() {
        let request = PageRequest::new(Some(1), Some(2)).expect("valid");
        let envelope = PageEnvelope::new(vec!["a", "b"], &request, 5);
        let value = serde_json::to_value(&envelope).expect("serialise");
        assert_eq!(value["pagination"]["totalPages"], 3);
        assert_eq!(value["data"][1], "b");
    }
}
