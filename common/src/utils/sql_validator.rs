//! SQL statement validator.
//!
//! Decides whether ad-hoc SQL from the admin terminal may run. Two passes are
//! applied in order:
//!
//! 1. A textual pass: emptiness, length, statement chaining, a whole-word keyword
//!    denylist and a leading `SELECT` check. This pass is a heuristic, not a
//!    parser; a denylisted word is refused even inside a string literal or an alias.
//! 2. A structural pass with `sqlparser` (SQLite dialect) that refuses write-capable
//!    constructs the denylist cannot see, such as `SELECT ... INTO`. Text the parser
//!    cannot read is left to the store, which runs it on a read-only connection and
//!    reports its own diagnostic.
//!
//! Classification is pure and total: any `&str` yields a verdict.

use sqlparser::ast::{Query, SetExpr, Statement, TableFactor, TableWithJoins};
use sqlparser::dialect::SQLiteDialect;
use sqlparser::parser::Parser;

use crate::models::query::{DenyReason, QueryVerdict};

/// Keywords that disqualify a query as read-only wherever they appear.
pub const FORBIDDEN_KEYWORDS: [&str; 12] = [
    "INSERT", "UPDATE", "DELETE", "DROP", "ALTER", "CREATE", "TRUNCATE", "ATTACH", "PRAGMA",
    "REPLACE", "GRANT", "REVOKE",
];

/// Default maximum query length, in characters.
pub const DEFAULT_MAX_QUERY_CHARS: usize = 10_000;

/// Validates SQL statements for read-only execution.
#[derive(Debug, Clone, Copy)]
pub struct SqlValidator {
    max_query_chars: usize,
}

impl Default for SqlValidator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_QUERY_CHARS)
    }
}

impl SqlValidator {
    /// Creates a validator accepting queries up to `max_query_chars` characters.
    pub fn new(max_query_chars: usize) -> Self {
        Self { max_query_chars }
    }

    /// Classifies query text as allowed or denied.
    pub fn classify(&self, text: &str) -> QueryVerdict {
        match self.check(text) {
            Ok(()) => QueryVerdict::Allow,
            Err(reason) => QueryVerdict::Deny(reason),
        }
    }

    fn check(&self, text: &str) -> Result<(), DenyReason> {
        let sql = text.trim();
        if sql.is_empty() {
            return Err(DenyReason::Empty);
        }

        // 先按字符数判断，超长文本不做后续扫描
        if sql.chars().nth(self.max_query_chars).is_some() {
            return Err(DenyReason::TooLong {
                max: self.max_query_chars,
            });
        }

        if has_chained_statement(sql) {
            return Err(DenyReason::StatementChaining);
        }

        if let Some(keyword) = first_forbidden_keyword(sql) {
            return Err(DenyReason::ForbiddenKeyword(keyword.to_string()));
        }

        let leading = leading_keyword(sql);
        if !leading.eq_ignore_ascii_case("SELECT") {
            return Err(DenyReason::NotSelect {
                found: leading.to_ascii_uppercase(),
            });
        }

        match Parser::parse_sql(&SQLiteDialect {}, sql) {
            Ok(statements) => check_statements(&statements),
            Err(e) => {
                tracing::debug!(error = %e, "sql parser could not read query, deferring to store");
                Ok(())
            }
        }
    }
}

/// Classifies query text with the default length limit.
pub fn classify(text: &str) -> QueryVerdict {
    SqlValidator::default().classify(text)
}

/// True if a `;` is followed by anything other than whitespace or further `;`.
fn has_chained_statement(sql: &str) -> bool {
    match sql.find(';') {
        Some(pos) => sql[pos..].chars().any(|c| c != ';' && !c.is_whitespace()),
        None => false,
    }
}

/// Returns the first denylisted keyword appearing as a whole word.
fn first_forbidden_keyword(sql: &str) -> Option<&'static str> {
    sql.split(|c: char| !is_identifier_char(c))
        .filter(|token| !token.is_empty())
        .find_map(|token| {
            FORBIDDEN_KEYWORDS
                .iter()
                .copied()
                .find(|keyword| token.eq_ignore_ascii_case(keyword))
        })
}

/// Identifier characters at the very start of the text.
fn leading_keyword(sql: &str) -> &str {
    let end = sql
        .find(|c: char| !is_identifier_char(c))
        .unwrap_or(sql.len());
    &sql[..end]
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn check_statements(statements: &[Statement]) -> Result<(), DenyReason> {
    if statements.len() > 1 {
        return Err(DenyReason::StatementChaining);
    }

    for statement in statements {
        match statement {
            Statement::Query(query) => check_query(query)?,
            other => return Err(DenyReason::WriteClause(statement_label(other))),
        }
    }
    Ok(())
}

fn check_query(query: &Query) -> Result<(), DenyReason> {
    if let Some(with) = &query.with {
        for cte in &with.cte_tables {
            check_query(&cte.query)?;
        }
    }
    check_set_expr(&query.body)
}

fn check_set_expr(body: &SetExpr) -> Result<(), DenyReason> {
    match body {
        SetExpr::Select(select) => {
            if select.into.is_some() {
                return Err(DenyReason::WriteClause("SELECT ... INTO".to_string()));
            }
            for table in &select.from {
                check_table_with_joins(table)?;
            }
            Ok(())
        }
        SetExpr::Query(query) => check_query(query),
        SetExpr::SetOperation { left, right, .. } => {
            check_set_expr(left)?;
            check_set_expr(right)
        }
        SetExpr::Values(_) | SetExpr::Table(_) => Ok(()),
        SetExpr::Insert(_) => Err(DenyReason::WriteClause("INSERT".to_string())),
        SetExpr::Update(_) => Err(DenyReason::WriteClause("UPDATE".to_string())),
        #[allow(unreachable_patterns)]
        _ => Err(DenyReason::WriteClause("data-modifying expression".to_string())),
    }
}

fn check_table_with_joins(table: &TableWithJoins) -> Result<(), DenyReason> {
    check_table_factor(&table.relation)?;
    for join in &table.joins {
        check_table_factor(&join.relation)?;
    }
    Ok(())
}

fn check_table_factor(factor: &TableFactor) -> Result<(), DenyReason> {
    match factor {
        TableFactor::Derived { subquery, .. } => check_query(subquery),
        TableFactor::NestedJoin {
            table_with_joins, ..
        } => check_table_with_joins(table_with_joins),
        _ => Ok(()),
    }
}

/// Short uppercase label of a non-query statement, e.g. `"VACUUM"`.
fn statement_label(statement: &Statement) -> String {
    statement
        .to_string()
        .split_whitespace()
        .next()
        .unwrap_or("statement")
        .to_ascii_uppercase()
}
