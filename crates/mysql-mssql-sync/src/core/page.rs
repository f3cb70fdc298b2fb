//! Page requests, pages, and the search filter.

use serde::{Deserialize, Serialize};

use super::record::Record;
use crate::error::{Result, SyncError};

/// Page size used when the caller does not supply one.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Upper bound on page size unless configured otherwise.
pub const DEFAULT_MAX_PAGE_SIZE: u32 = 1000;

/// Escape character used in generated LIKE patterns.
pub const LIKE_ESCAPE: char = '\\';

/// Substring predicate against the stringified primary key or the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchFilter {
    term: String,
}

impl SearchFilter {
    /// Build a filter from raw user input. Blank input means "no filter".
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        let term = raw?.trim();
        if term.is_empty() {
            None
        } else {
            Some(Self {
                term: term.to_string(),
            })
        }
    }

    /// The search term as given (trimmed).
    pub fn term(&self) -> &str {
        &self.term
    }

    /// Build a `%term%` LIKE pattern with the term matched literally.
    ///
    /// `%`, `_` and the escape character are always escaped; `extra` lists
    /// dialect-specific metacharacters (e.g. `[` for SQL Server).
    pub fn like_pattern(&self, extra: &[char]) -> String {
        let mut pattern = String::with_capacity(self.term.len() + 2);
        pattern.push('%');
        for c in self.term.chars() {
            if c == '%' || c == '_' || c == LIKE_ESCAPE || extra.contains(&c) {
                pattern.push(LIKE_ESCAPE);
            }
            pattern.push(c);
        }
        pattern.push('%');
        pattern
    }

    /// In-process equivalent of the SQL predicate.
    ///
    /// Case-insensitive, like the default collations of both stores.
    pub fn matches(&self, record: &Record) -> bool {
        let needle = self.term.to_lowercase();
        record.primary_key.to_string().contains(&needle)
            || record.payload.to_lowercase().contains(&needle)
    }
}

/// A validated request for one page of records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    page_size: u32,
    search: Option<SearchFilter>,
}

impl PageRequest {
    /// Validate paging input. Page numbers are 1-based; page 0 is rejected.
    pub fn new(page: u32, page_size: u32, max_page_size: u32) -> Result<Self> {
        if page < 1 {
            return Err(SyncError::Validation("page must be at least 1".into()));
        }
        if page_size < 1 {
            return Err(SyncError::Validation("pageSize must be at least 1".into()));
        }
        if page_size > max_page_size {
            return Err(SyncError::Validation(format!(
                "pageSize must be at most {}",
                max_page_size
            )));
        }
        Ok(Self {
            page,
            page_size,
            search: None,
        })
    }

    /// Build a request from optional signed query values, applying defaults.
    pub fn from_query(
        page: Option<i64>,
        page_size: Option<i64>,
        search: Option<&str>,
        default_page_size: u32,
        max_page_size: u32,
    ) -> Result<Self> {
        let page = page.unwrap_or(1);
        let page_size = page_size.unwrap_or(default_page_size as i64);
        if page < 1 {
            return Err(SyncError::Validation("page must be at least 1".into()));
        }
        if page_size < 1 {
            return Err(SyncError::Validation("pageSize must be at least 1".into()));
        }
        let page = u32::try_from(page)
            .map_err(|_| SyncError::Validation(format!("page {} is out of range", page)))?;
        let page_size = u32::try_from(page_size).unwrap_or(u32::MAX);
        Ok(Self::new(page, page_size, max_page_size)?.with_search(SearchFilter::parse(search)))
    }

    /// Attach (or clear) a search filter.
    pub fn with_search(mut self, search: Option<SearchFilter>) -> Self {
        self.search = search;
        self
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn search(&self) -> Option<&SearchFilter> {
        self.search.as_ref()
    }

    /// Rows to skip: `(page - 1) * page_size`. Never negative.
    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.page_size as u64
    }

    /// Maximum rows to return.
    pub fn limit(&self) -> u64 {
        self.page_size as u64
    }

    /// The request for the following page, keeping size and filter.
    pub fn next(&self) -> Self {
        Self {
            page: self.page.saturating_add(1),
            page_size: self.page_size,
            search: self.search.clone(),
        }
    }
}

/// One page of a store's records plus the total matching count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    #[serde(rename = "data")]
    pub items: Vec<Record>,

    /// All records matching the filter, independent of paging.
    #[serde(rename = "total")]
    pub total_count: u64,

    pub page: u32,

    #[serde(rename = "pageSize")]
    pub page_size: u32,
}

impl Page {
    /// Assemble a page for `request`.
    pub fn new(request: &PageRequest, items: Vec<Record>, total_count: u64) -> Self {
        debug_assert!(items.len() as u64 <= request.limit());
        Self {
            items,
            total_count,
            page: request.page(),
            page_size: request.page_size(),
        }
    }

    /// Number of pages needed to cover `total_count`.
    pub fn total_pages(&self) -> u64 {
        self.total_count.div_ceil(self.page_size.max(1) as u64)
    }

    /// Whether a later page holds more records.
    pub fn has_next(&self) -> bool {
        (self.page as u64) < self.total_pages()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_arithmetic() {
        let req = PageRequest::new(1, 50, DEFAULT_MAX_PAGE_SIZE).unwrap();
        assert_eq!(req.offset(), 0);
        assert_eq!(req.limit(), 50);

        let req = PageRequest::new(3, 25, DEFAULT_MAX_PAGE_SIZE).unwrap();
        assert_eq!(req.offset(), 50);

        // Large pages must not overflow 32-bit arithmetic
        let req = PageRequest::new(u32::MAX, 1000, DEFAULT_MAX_PAGE_SIZE).unwrap();
        assert_eq!(req.offset(), (u32::MAX as u64 - 1) * 1000);
    }

    #[test]
    fn test_page_zero_rejected() {
        let err = PageRequest::new(0, 50, DEFAULT_MAX_PAGE_SIZE).unwrap_err();
        assert!(matches!(err, SyncError::Validation(_)));
    }

    #[test]
    fn test_page_size_bounds() {
        assert!(PageRequest::new(1, 0, DEFAULT_MAX_PAGE_SIZE).is_err());
        assert!(PageRequest::new(1, 1001, DEFAULT_MAX_PAGE_SIZE).is_err());
        assert!(PageRequest::new(1, 1000, DEFAULT_MAX_PAGE_SIZE).is_ok());
    }

    #[test]
    fn test_from_query_defaults() {
        let req = PageRequest::from_query(None, None, None, DEFAULT_PAGE_SIZE, 1000).unwrap();
        assert_eq!(req.page(), 1);
        assert_eq!(req.page_size(), DEFAULT_PAGE_SIZE);
        assert!(req.search().is_none());
    }

    #[test]
    fn test_from_query_rejects_negative() {
        assert!(PageRequest::from_query(Some(-1), None, None, 50, 1000).is_err());
        assert!(PageRequest::from_query(Some(1), Some(-5), None, 50, 1000).is_err());
        assert!(PageRequest::from_query(Some(i64::MAX), None, None, 50, 1000).is_err());
    }

    #[test]
    fn test_blank_search_is_no_filter() {
        assert!(SearchFilter::parse(None).is_none());
        assert!(SearchFilter::parse(Some("   ")).is_none());
        assert_eq!(SearchFilter::parse(Some(" ab ")).unwrap().term(), "ab");
    }

    #[test]
    fn test_like_pattern_escapes_metacharacters() {
        let filter = SearchFilter::parse(Some("50%_off\\")).unwrap();
        assert_eq!(filter.like_pattern(&[]), "%50\\%\\_off\\\\%");

        let filter = SearchFilter::parse(Some("[a]")).unwrap();
        assert_eq!(filter.like_pattern(&['[']), "%\\[a]%");
        assert_eq!(filter.like_pattern(&[]), "%[a]%");
    }

    #[test]
    fn test_filter_matches_key_or_payload() {
        let filter = SearchFilter::parse(Some("a")).unwrap();
        assert!(filter.matches(&Record::new(1, "apple")));
        assert!(filter.matches(&Record::new(2, "BANANA")));
        assert!(!filter.matches(&Record::new(3, "cherry")));

        let filter = SearchFilter::parse(Some("12")).unwrap();
        assert!(filter.matches(&Record::new(312, "x")));
        assert!(!filter.matches(&Record::new(31, "x")));
    }

    #[test]
    fn test_page_serializes_with_wire_names() {
        let req = PageRequest::new(2, 10, DEFAULT_MAX_PAGE_SIZE).unwrap();
        let page = Page::new(&req, vec![Record::new(11, "k")], 11);
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["total"], 11);
        assert_eq!(json["page"], 2);
        assert_eq!(json["pageSize"], 10);
        assert_eq!(json["data"][0]["primary_key"], 11);
        assert_eq!(page.total_pages(), 2);
        assert!(!page.has_next());
    }
}
