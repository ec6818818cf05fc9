//! CRM 管理后台服务
//!
//! 提供以下功能：
//! - 只读 SQL 终端（分类校验、执行、结果格式化）
//! - 数据库结构浏览与单表分页浏览
//! - 用户、佣金分页列表与全量数据导出
//! - 仪表盘统计与最近活动

pub mod executor;
pub mod formatter;
pub mod handlers;
pub mod routes;
pub mod service;
pub mod state;
pub mod store;

use axum::{middleware, routing::get, Json, Router};
use common::middleware::request_id_middleware;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "CRM 管理后台 API",
        version = "0.1.0",
        description = "只读 SQL 终端与数据浏览"
    ),
    paths(
        handlers::execute_query,
        handlers::database_structure,
        handlers::table_data,
        handlers::dashboard_stats,
        handlers::list_users,
        handlers::list_commissions,
        handlers::all_data,
        handlers::health_check,
    ),
    components(schemas(
        common::models::QueryRequest,
        common::models::ResultSet,
        common::models::DatabaseStructure,
        common::models::TableStructure,
        common::models::ColumnStructure,
        common::models::ForeignKeyStructure,
        common::models::IndexStructure,
        common::models::TablePage,
        common::models::DashboardStats,
        common::models::DashboardOverview,
        common::models::RecentActivity,
        common::models::RecentUser,
        common::models::RecentClient,
        common::models::RecentCommission,
        common::models::UserList,
        common::models::UserSummary,
        common::models::CommissionList,
        common::models::CommissionSummary,
        common::models::DatabaseDump,
        common::models::TableDump,
        common::response::ErrorBody,
        common::response::Pagination,
        handlers::HealthResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "sql", description = "只读 SQL 终端"),
        (name = "browse", description = "数据浏览端点"),
        (name = "health", description = "健康检查端点")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

/// Builds the full application router with middleware applied.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(routes::router(&state))
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(CompressionLayer::new())
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
