//! Handler模块

use std::time::Duration;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use common::errors::AppError;
use common::middleware::AuthenticatedCaller;
use common::models::{
    CommissionList, DashboardOverview, DatabaseDump, DatabaseStructure, PageParams, QueryRequest,
    ResultSet, TablePage, UserList,
};
use crate::service::{BrowseService, QueryService};
use crate::state::AppState;

const HEALTH_PING_TIMEOUT: Duration = Duration::from_secs(2);

/// 执行只读 SQL 查询
#[utoipa::path(
    post,
    path = "/admin/api/sql/execute",
    tag = "sql",
    request_body = QueryRequest,
    responses(
        (status = 200, description = "查询执行成功", body = ResultSet),
        (status = 400, description = "查询被拒绝或执行出错", body = common::response::ErrorBody),
        (status = 401, description = "未认证", body = common::response::ErrorBody),
        (status = 408, description = "查询超时", body = common::response::ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn execute_query(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedCaller>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<ResultSet>, AppError> {
    let Json(req) = payload.map_err(|e| AppError::Validation(e.body_text()))?;
    tracing::info!(caller = %caller.subject, chars = req.query.chars().count(), "sql terminal query");

    let result = QueryService::from_state(&state).execute(req).await?;
    Ok(Json(result))
}

/// 获取数据库结构
#[utoipa::path(
    get,
    path = "/admin/api/database/structure",
    tag = "browse",
    responses(
        (status = 200, description = "所有表的结构", body = DatabaseStructure),
        (status = 401, description = "未认证", body = common::response::ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn database_structure(
    State(state): State<AppState>,
) -> Result<Json<DatabaseStructure>, AppError> {
    let data = BrowseService::from_state(&state).structure().await?;
    Ok(Json(data))
}

/// 分页浏览表数据
#[utoipa::path(
    get,
    path = "/admin/api/tables/{table_name}",
    tag = "browse",
    params(
        ("table_name" = String, Path, description = "表名"),
        ("skip" = Option<u64>, Query, description = "跳过的行数"),
        ("limit" = Option<u64>, Query, description = "每页行数")
    ),
    responses(
        (status = 200, description = "表数据", body = TablePage),
        (status = 400, description = "分页参数无效", body = common::response::ErrorBody),
        (status = 404, description = "表不存在", body = common::response::ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn table_data(
    State(state): State<AppState>,
    Path(table_name): Path<String>,
    params: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<TablePage>, AppError> {
    let data = BrowseService::from_state(&state)
        .table_page(&table_name, page_params(params)?)
        .await?;
    Ok(Json(data))
}

/// 分页获取用户列表
#[utoipa::path(
    get,
    path = "/admin/api/users",
    tag = "browse",
    params(
        ("skip" = Option<u64>, Query, description = "跳过的行数"),
        ("limit" = Option<u64>, Query, description = "每页行数")
    ),
    responses(
        (status = 200, description = "用户列表", body = UserList),
        (status = 400, description = "分页参数无效", body = common::response::ErrorBody),
        (status = 401, description = "未认证", body = common::response::ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn list_users(
    State(state): State<AppState>,
    params: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<UserList>, AppError> {
    let data = BrowseService::from_state(&state)
        .users(page_params(params)?)
        .await?;
    Ok(Json(data))
}

/// 分页获取佣金列表（附客户名称）
#[utoipa::path(
    get,
    path = "/admin/api/commissions",
    tag = "browse",
    params(
        ("skip" = Option<u64>, Query, description = "跳过的行数"),
        ("limit" = Option<u64>, Query, description = "每页行数")
    ),
    responses(
        (status = 200, description = "佣金列表", body = CommissionList),
        (status = 400, description = "分页参数无效", body = common::response::ErrorBody),
        (status = 401, description = "未认证", body = common::response::ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn list_commissions(
    State(state): State<AppState>,
    params: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<CommissionList>, AppError> {
    let data = BrowseService::from_state(&state)
        .commissions(page_params(params)?)
        .await?;
    Ok(Json(data))
}

/// 导出所有表数据
#[utoipa::path(
    get,
    path = "/admin/api/all-data",
    tag = "browse",
    responses(
        (status = 200, description = "每张表的数据", body = DatabaseDump),
        (status = 401, description = "未认证", body = common::response::ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn all_data(State(state): State<AppState>) -> Result<Json<DatabaseDump>, AppError> {
    let data = BrowseService::from_state(&state).dump().await?;
    Ok(Json(data))
}

fn page_params(params: Result<Query<PageParams>, QueryRejection>) -> Result<PageParams, AppError> {
    params
        .map(|Query(params)| params)
        .map_err(|e| AppError::Validation(e.body_text()))
}

/// 仪表盘统计与最近活动
#[utoipa::path(
    get,
    path = "/admin/api/stats",
    tag = "browse",
    responses(
        (status = 200, description = "统计数据", body = DashboardOverview),
        (status = 401, description = "未认证", body = common::response::ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn dashboard_stats(
    State(state): State<AppState>,
) -> Result<Json<DashboardOverview>, AppError> {
    let data = BrowseService::from_state(&state).overview().await?;
    Ok(Json(data))
}

/// 健康检查端点
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    responses(
        (status = 200, description = "服务状态", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = state.store.ping(HEALTH_PING_TIMEOUT).await;

    Json(HealthResponse {
        status: if database { "healthy" } else { "degraded" }.to_string(),
        service: state.config.service_name.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        database,
    })
}

/// 健康检查响应
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// 服务状态
    pub status: String,
    /// 服务名称
    pub service: String,
    /// 服务版本
    pub version: String,
    /// 当前时间戳
    pub timestamp: DateTime<Utc>,
    /// 只读存储是否可用
    pub database: bool,
}
