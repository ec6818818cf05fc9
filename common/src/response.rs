//! API response body types.
//!
//! Successful responses return their payload directly; failures share [`ErrorBody`].

use serde::Serialize;
use utoipa::ToSchema;

/// Error body returned by every failing endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Human-readable reason.
    pub error: String,

    /// Error code for client handling (e.g., "DENIED_QUERY", "QUERY_REJECTED").
    pub code: String,
}

/// Offset pagination information for table browsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Pagination {
    /// Rows skipped before this page.
    pub skip: u64,

    /// Page size requested (after clamping).
    pub limit: u64,

    /// Total rows in the table.
    pub total_count: u64,

    /// Rows actually returned in this page.
    pub showing: u64,

    /// Whether rows exist beyond this page.
    pub has_more: bool,
}

impl Pagination {
    /// Creates pagination info from the page window and the table total.
    pub fn new(skip: u64, limit: u64, total_count: u64, showing: u64) -> Self {
        Self {
            skip,
            limit,
            total_count,
            showing,
            has_more: skip.saturating_add(showing) < total_count,
        }
    }
}
