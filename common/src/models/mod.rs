//! Shared data models.

pub mod query;
pub mod records;
pub mod schema;
pub mod stats;

// Re-export commonly used types
pub use query::{DenyReason, QueryRequest, QueryVerdict, ResultSet};
pub use records::{CommissionList, CommissionSummary, UserList, UserSummary};
pub use schema::{
    ColumnStructure, DatabaseDump, DatabaseStructure, ForeignKeyStructure, IndexStructure,
    PageParams, TableDump, TablePage, TableStructure,
};
pub use stats::{
    DashboardOverview, DashboardStats, RecentActivity, RecentClient, RecentCommission, RecentUser,
};
