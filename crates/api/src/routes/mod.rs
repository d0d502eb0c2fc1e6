//! HTTP handlers.

pub mod health;
pub mod kitchen;
pub mod metrics;
pub mod orders;
pub mod purchases;

use serde::Deserialize;
use store::ScanRequest;
use store::scan::MAX_PAGE_LIMIT;

use domain::ValidationError;

/// `?limit=&startKey=` query of the list endpoints.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub limit: Option<String>,
    pub start_key: Option<String>,
}

impl ListParams {
    /// Builds the scan for one page, using `default_limit` when no limit is
    /// given. An explicit limit must lie in `1..=MAX_PAGE_LIMIT`.
    pub fn scan(self, default_limit: usize) -> Result<ScanRequest, ValidationError> {
        let limit = match self.limit.as_deref() {
            None => default_limit,
            Some(raw) => match raw.parse::<usize>() {
                Ok(0) => {
                    return Err(ValidationError::single(
                        "limit",
                        "Must be greater than or equal to 1",
                    ));
                }
                Ok(limit) if limit > MAX_PAGE_LIMIT => {
                    return Err(ValidationError::single(
                        "limit",
                        format!("Must be less than or equal to {MAX_PAGE_LIMIT}"),
                    ));
                }
                Ok(limit) => limit,
                Err(_) => return Err(ValidationError::single("limit", "Expected integer")),
            },
        };

        let request = ScanRequest::new(limit);
        Ok(match self.start_key.filter(|key| !key.is_empty()) {
            Some(key) => request.after(key),
            None => request,
        })
    }
}
