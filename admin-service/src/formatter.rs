//! Result formatting.
//!
//! Turns raw store values into the display shape returned to admin callers:
//! every value stringified, long values cut, row count capped.

use common::config::QueryLimits;
use common::models::ResultSet;

use crate::executor::{RawRows, ScalarValue};

/// Marker appended to values cut at the display width.
pub const ELLIPSIS: &str = "...";

/// Converts raw rows into a [`ResultSet`].
#[derive(Debug, Clone, Copy)]
pub struct ResultFormatter {
    display_limit: usize,
    value_max_chars: usize,
}

impl ResultFormatter {
    /// Creates a formatter with the given row cap and per-value character cap.
    pub fn new(display_limit: usize, value_max_chars: usize) -> Self {
        Self {
            display_limit,
            value_max_chars,
        }
    }

    /// Creates a formatter from the configured query limits.
    pub fn from_limits(limits: &QueryLimits) -> Self {
        Self::new(limits.display_limit.min(limits.fetch_limit), limits.value_max_chars)
    }

    /// Formats an executed query result.
    pub fn format(&self, raw: RawRows) -> ResultSet {
        let RawRows {
            columns,
            rows,
            has_more,
            elapsed,
        } = raw;

        let truncated = has_more || rows.len() > self.display_limit;
        let rows: Vec<Vec<Option<String>>> = rows
            .iter()
            .take(self.display_limit)
            .map(|row| self.render_row(row, columns.len()))
            .collect();

        ResultSet {
            row_count: rows.len(),
            columns,
            rows,
            truncated,
            execution_time_ms: elapsed.as_millis() as u64,
        }
    }

    /// Renders one row, padded with NULL or cut to exactly `width` values.
    pub fn render_row(&self, row: &[ScalarValue], width: usize) -> Vec<Option<String>> {
        let mut rendered: Vec<Option<String>> =
            row.iter().take(width).map(|v| self.render_value(v)).collect();
        rendered.resize(width, None);
        rendered
    }

    /// Renders one value; `None` stands for SQL NULL.
    pub fn render_value(&self, value: &ScalarValue) -> Option<String> {
        let text = match value {
            ScalarValue::Null => return None,
            ScalarValue::Integer(v) => v.to_string(),
            ScalarValue::Real(v) => format_real(*v),
            ScalarValue::Text(v) => v.clone(),
            ScalarValue::Blob(len) => format!("<blob {len} bytes>"),
        };
        Some(truncate_chars(&text, self.value_max_chars))
    }
}

/// Cuts `text` to at most `max_chars` characters, appending [`ELLIPSIS`] when cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}{ELLIPSIS}", &text[..byte_idx]),
        None => text.to_string(),
    }
}

/// Integral reals keep a trailing `.0` so they stay distinguishable from integers.
fn format_real(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn raw(columns: &[&str], rows: Vec<Vec<ScalarValue>>, has_more: bool) -> RawRows {
        RawRows {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
            has_more,
            elapsed: Duration::from_millis(7),
        }
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("short", 50), "short");
        assert_eq!(truncate_chars("abcdef", 3), "abc...");
        assert_eq!(truncate_chars("abc", 3), "abc");
        assert_eq!(truncate_chars("日本語テキスト", 3), "日本語...");
    }

    #[test]
    fn test_render_scalars() {
        let formatter = ResultFormatter::new(100, 50);
        assert_eq!(formatter.render_value(&ScalarValue::Null), None);
        assert_eq!(
            formatter.render_value(&ScalarValue::Text(String::new())),
            Some(String::new())
        );
        assert_eq!(
            formatter.render_value(&ScalarValue::Integer(-42)),
            Some("-42".into())
        );
        assert_eq!(
            formatter.render_value(&ScalarValue::Real(1250.0)),
            Some("1250.0".into())
        );
        assert_eq!(
            formatter.render_value(&ScalarValue::Real(99.95)),
            Some("99.95".into())
        );
        assert_eq!(
            formatter.render_value(&ScalarValue::Blob(16)),
            Some("<blob 16 bytes>".into())
        );
    }

    #[test]
    fn test_long_values_are_cut() {
        let formatter = ResultFormatter::new(100, 50);
        let long = "x".repeat(80);
        let rendered = formatter.render_value(&ScalarValue::Text(long)).unwrap();
        assert_eq!(rendered.chars().count(), 50 + ELLIPSIS.len());
        assert!(rendered.ends_with(ELLIPSIS));
    }

    #[test]
    fn test_rows_capped_to_display_limit() {
        let formatter = ResultFormatter::new(2, 50);
        let rows = (0..5).map(|i| vec![ScalarValue::Integer(i)]).collect();
        let result = formatter.format(raw(&["id"], rows, false));

        assert_eq!(result.row_count, 2);
        assert_eq!(result.rows.len(), 2);
        assert!(result.truncated);
        assert_eq!(result.execution_time_ms, 7);
    }

    #[test]
    fn test_has_more_marks_truncated() {
        let formatter = ResultFormatter::new(10, 50);
        let result = formatter.format(raw(&["id"], vec![vec![ScalarValue::Integer(1)]], true));
        assert_eq!(result.row_count, 1);
        assert!(result.truncated);
    }

    #[test]
    fn test_rows_match_column_count() {
        let formatter = ResultFormatter::new(10, 50);
        let rows = vec![
            vec![ScalarValue::Integer(1)],
            vec![
                ScalarValue::Integer(2),
                ScalarValue::Text("a".into()),
                ScalarValue::Text("extra".into()),
            ],
        ];
        let result = formatter.format(raw(&["id", "name"], rows, false));

        assert!(result.is_rectangular());
        assert_eq!(result.rows[0], vec![Some("1".into()), None]);
        assert_eq!(result.rows[1], vec![Some("2".into()), Some("a".into())]);
        assert!(!result.truncated);
    }

    #[test]
    fn test_from_limits_never_exceeds_fetch_limit() {
        let limits = QueryLimits {
            fetch_limit: 10,
            display_limit: 50,
            ..QueryLimits::default()
        };
        let formatter = ResultFormatter::from_limits(&limits);
        let rows = (0..10).map(|i| vec![ScalarValue::Integer(i)]).collect();
        assert_eq!(formatter.format(raw(&["id"], rows, false)).row_count, 10);
    }
}
