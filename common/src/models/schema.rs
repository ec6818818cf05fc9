//! Schema and table browsing models.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::response::Pagination;

/// Column description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ColumnStructure {
    /// Column name.
    pub name: String,
    /// Declared type (may be empty for untyped SQLite columns).
    #[serde(rename = "type")]
    pub data_type: String,
    /// Whether NULL is accepted.
    pub nullable: bool,
    /// Whether the column is part of the primary key.
    pub primary_key: bool,
    /// Whether SQLite assigns the value itself (single `INTEGER PRIMARY KEY`, a rowid alias).
    pub autoincrement: bool,
    /// Default value expression.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

/// Foreign key from this table to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ForeignKeyStructure {
    pub constrained_columns: Vec<String>,
    pub referred_table: String,
    pub referred_columns: Vec<String>,
}

/// Index on a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct IndexStructure {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
}

/// Full description of one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TableStructure {
    pub columns: Vec<ColumnStructure>,
    pub foreign_keys: Vec<ForeignKeyStructure>,
    pub indexes: Vec<IndexStructure>,
}

/// Response of the schema browser, keyed by table name.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DatabaseStructure {
    pub tables: BTreeMap<String, TableStructure>,
}

/// Query parameters for paginated listings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageParams {
    /// Rows to skip (default 0).
    #[serde(default)]
    pub skip: Option<u64>,
    /// Page size (default 100, clamped to the fetch limit).
    #[serde(default)]
    pub limit: Option<u64>,
}

/// One page of a table.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TablePage {
    /// Table name.
    pub table_name: String,
    /// Column names in table order.
    pub columns: Vec<String>,
    /// Rendered rows; `null` for SQL NULL.
    pub rows: Vec<Vec<Option<String>>>,
    /// Page window and total.
    #[serde(flatten)]
    pub pagination: Pagination,
}

/// Contents of one table in the full dump.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct TableDump {
    pub columns: Vec<String>,
    /// Rows keyed by column name; `null` for SQL NULL.
    pub data: Vec<BTreeMap<String, Option<String>>>,
    /// Rows in `data`.
    pub count: usize,
    /// Whether the table had more rows than were dumped.
    pub truncated: bool,
    /// Set when the table could not be read; the other fields are then empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Response of the full data dump, keyed by table name.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct DatabaseDump {
    pub tables: BTreeMap<String, TableDump>,
}
