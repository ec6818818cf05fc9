//! Dashboard statistics models.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Headline numbers for the admin landing page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DashboardStats {
    /// Registered users.
    pub total_users: u64,
    /// Users with `is_active` set.
    pub active_users: u64,
    /// Clients.
    pub total_clients: u64,
    /// Commission records.
    pub total_commissions: u64,
    /// Sum of all commission amounts.
    pub total_commission_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RecentUser {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RecentClient {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RecentCommission {
    pub id: i64,
    pub client_id: i64,
    pub amount: f64,
    pub created_at: Option<String>,
}

/// Newest records per table, most recent first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RecentActivity {
    pub recent_users: Vec<RecentUser>,
    pub recent_clients: Vec<RecentClient>,
    pub recent_commissions: Vec<RecentCommission>,
}

/// Response of the dashboard endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DashboardOverview {
    pub stats: DashboardStats,
    pub recent_activity: RecentActivity,
}
