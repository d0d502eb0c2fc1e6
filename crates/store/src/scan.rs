use serde::{Deserialize, Serialize};

/// Default number of items per page, matching the list endpoints.
pub const DEFAULT_PAGE_LIMIT: usize = 10;

/// Largest page a single scan returns.
pub const MAX_PAGE_LIMIT: usize = 100;

/// A bounded scan over one table.
///
/// Items are returned in key order. `start_key` is exclusive: pass the
/// `last_key` of the previous page to continue where it stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    /// Maximum number of items to return, within `1..=MAX_PAGE_LIMIT`.
    pub limit: usize,
    /// Continuation token from a previous page.
    pub start_key: Option<String>,
}

impl ScanRequest {
    /// Creates a scan for the first page. `limit` is clamped to
    /// `1..=MAX_PAGE_LIMIT`.
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.clamp(1, MAX_PAGE_LIMIT),
            start_key: None,
        }
    }

    /// Continues after the given key.
    pub fn after(mut self, key: impl Into<String>) -> Self {
        self.start_key = Some(key.into());
        self
    }
}

impl Default for ScanRequest {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_LIMIT)
    }
}

/// One page of scan results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// Items on this page.
    #[serde(rename = "data")]
    pub items: Vec<T>,
    /// Continuation token; absent on the last page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_key: Option<String>,
}

impl<T> Page<T> {
    /// Creates a page.
    pub fn new(items: Vec<T>, last_key: Option<String>) -> Self {
        Self { items, last_key }
    }

    /// Returns true if more items follow this page.
    pub fn has_more(&self) -> bool {
        self.last_key.is_some()
    }

    /// Converts every item, keeping the continuation token.
    pub fn try_map<U, E>(self, f: impl FnMut(T) -> Result<U, E>) -> Result<Page<U>, E> {
        let items = self.items.into_iter().map(f).collect::<Result<Vec<_>, _>>()?;
        Ok(Page {
            items,
            last_key: self.last_key,
        })
    }
}
