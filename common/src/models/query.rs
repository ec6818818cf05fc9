//! SQL terminal models.
//!
//! Request, verdict and result shapes for ad-hoc read-only queries.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Request body for executing a SQL query.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QueryRequest {
    /// SQL text to execute. Only single read-only SELECT statements are accepted.
    #[serde(default)]
    pub query: String,
}

/// Outcome of classifying query text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryVerdict {
    /// The query may run.
    Allow,
    /// The query must not run.
    Deny(DenyReason),
}

impl QueryVerdict {
    /// Returns true if the query may run.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Why a query was refused. The display text is returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DenyReason {
    /// Nothing but whitespace.
    #[error("empty query")]
    Empty,
    /// Longer than the accepted maximum.
    #[error("too long: query exceeds {max} characters")]
    TooLong { max: usize },
    /// A `;` followed by more content.
    #[error("statement chaining is not allowed: submit a single SELECT statement")]
    StatementChaining,
    /// A denylisted keyword appears as a whole word.
    #[error("forbidden keyword: {0} (only read-only SELECT queries are allowed)")]
    ForbiddenKeyword(String),
    /// The leading keyword is not SELECT.
    #[error("only SELECT queries are allowed{}", found_suffix(.found))]
    NotSelect { found: String },
    /// The parsed statement contains a write-capable construct.
    #[error("write operation not allowed: {0}")]
    WriteClause(String),
}

fn found_suffix(found: &str) -> String {
    if found.is_empty() {
        String::new()
    } else {
        format!(" (found {found})")
    }
}

/// Uniform tabular result of a query.
///
/// Every row has exactly `columns.len()` values. `None` is SQL NULL and serializes
/// as JSON `null`, distinct from an empty string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ResultSet {
    /// Column names in store order.
    pub columns: Vec<String>,

    /// Rendered row values.
    pub rows: Vec<Vec<Option<String>>>,

    /// Number of rows returned.
    pub row_count: usize,

    /// Whether the store produced more rows than were returned.
    #[serde(default)]
    pub truncated: bool,

    /// Query execution time in milliseconds.
    #[serde(default)]
    pub execution_time_ms: u64,
}

impl ResultSet {
    /// Returns true if every row has one value per column.
    pub fn is_rectangular(&self) -> bool {
        self.rows.iter().all(|row| row.len() == self.columns.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deny_reason_messages() {
        assert_eq!(DenyReason::Empty.to_string(), "empty query");
        assert!(DenyReason::TooLong { max: 10 }.to_string().starts_with("too long"));
        assert!(DenyReason::ForbiddenKeyword("DROP".into())
            .to_string()
            .contains("DROP"));
        assert_eq!(
            DenyReason::NotSelect { found: String::new() }.to_string(),
            "only SELECT queries are allowed"
        );
        assert_eq!(
            DenyReason::NotSelect { found: "EXPLAIN".into() }.to_string(),
            "only SELECT queries are allowed (found EXPLAIN)"
        );
        assert_eq!(
            DenyReason::WriteClause("SELECT INTO".into()).to_string(),
            "write operation not allowed: SELECT INTO"
        );
    }

    #[test]
    fn test_null_is_not_empty_string() {
        let result = ResultSet {
            columns: vec!["phone".into()],
            rows: vec![vec![None], vec![Some(String::new())]],
            row_count: 2,
            truncated: false,
            execution_time_ms: 0,
        };

        let json = serde_json::to_value(&result).unwrap();
        assert!(json["rows"][0][0].is_null());
        assert_eq!(json["rows"][1][0], "");
        assert!(result.is_rectangular());
    }

    #[test]
    fn test_missing_query_field_defaults_to_empty() {
        let req: QueryRequest = serde_json::from_str("{}").unwrap();
        assert!(req.query.is_empty());
    }
}
