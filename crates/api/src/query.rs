//! Shared query parameter types for API handlers.

use serde::Deserialize;

/// Default page size for job listing.
pub const DEFAULT_LIMIT: u32 = 20;

/// Pagination parameters (`?limit=&offset=`), passed through to upstream.
///
/// Values are kept as sent; upstream decides what is valid.
#[derive(Debug, Deserialize)]
pub struct PaginationParams {
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl PaginationParams {
    /// Query pairs with defaults applied (`limit=20`, `offset=0`).
    pub fn to_query(&self) -> Vec<(String, String)> {
        vec![
            (
                "limit".to_string(),
                self.limit.clone().unwrap_or_else(|| DEFAULT_LIMIT.to_string()),
            ),
            (
                "offset".to_string(),
                self.offset.clone().unwrap_or_else(|| "0".to_string()),
            ),
        ]
    }
}
