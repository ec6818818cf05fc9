//! 路由模块

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use common::middleware::auth_middleware;

use crate::handlers;
use crate::state::AppState;

/// Admin API routes. Everything under `/admin/api` requires a bearer token.
pub fn router(state: &AppState) -> Router<AppState> {
    let admin = Router::new()
        .route("/admin/api/sql/execute", post(handlers::execute_query))
        .route(
            "/admin/api/database/structure",
            get(handlers::database_structure),
        )
        .route("/admin/api/tables/{table_name}", get(handlers::table_data))
        .route("/admin/api/stats", get(handlers::dashboard_stats))
        .route("/admin/api/users", get(handlers::list_users))
        .route("/admin/api/commissions", get(handlers::list_commissions))
        .route("/admin/api/all-data", get(handlers::all_data))
        .route_layer(middleware::from_fn_with_state(
            state.authenticator.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/api/health", get(handlers::health_check))
        .merge(admin)
}
