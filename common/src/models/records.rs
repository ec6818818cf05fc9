//! Paginated CRM record listings.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A user account as listed in the admin panel. Password hashes are never read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserSummary {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub is_active: bool,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserList {
    pub users: Vec<UserSummary>,
    /// Total users, independent of the page window.
    pub total_count: u64,
}

/// A commission with the name of its client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CommissionSummary {
    pub id: i64,
    pub client_id: i64,
    /// `Unknown` when the client row is missing.
    pub client_name: String,
    pub amount: f64,
    pub source: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CommissionList {
    pub commissions: Vec<CommissionSummary>,
    /// Total commissions, independent of the page window.
    pub total_count: u64,
}
