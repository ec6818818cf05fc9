//! 管理后台服务模块
//!
//! `QueryService` is the SQL terminal gate: classify, then execute, then format.
//! `BrowseService` backs the schema browser, table browser, record listings,
//! dashboard and full data dump.

use std::collections::BTreeMap;
use std::sync::Arc;

use common::errors::{AppError, AppResult};
use common::models::{
    CommissionList, DashboardOverview, DatabaseDump, DatabaseStructure, PageParams, QueryRequest,
    QueryVerdict, ResultSet, TableDump, TablePage, UserList,
};
use common::response::Pagination;
use common::utils::SqlValidator;

use crate::executor::{decode_row, QueryExecutor, QueryRunner};
use crate::formatter::ResultFormatter;
use crate::state::AppState;
use crate::store::{quote_identifier, to_sql_int, ReadOnlyStore};

/// Default page size for paginated listings.
pub const DEFAULT_PAGE_SIZE: u64 = 100;

/// Records per table in the dashboard's recent activity.
pub const RECENT_ACTIVITY_LIMIT: u64 = 5;

/// SQL 终端查询服务
pub struct QueryService {
    validator: SqlValidator,
    runner: Arc<dyn QueryRunner>,
    formatter: ResultFormatter,
}

impl QueryService {
    /// 创建新的查询服务实例
    pub fn new(
        validator: SqlValidator,
        runner: Arc<dyn QueryRunner>,
        formatter: ResultFormatter,
    ) -> Self {
        Self {
            validator,
            runner,
            formatter,
        }
    }

    /// Builds the service from shared application state.
    pub fn from_state(state: &AppState) -> Self {
        let limits = &state.config.query;
        Self::new(
            SqlValidator::new(limits.max_query_chars),
            Arc::new(QueryExecutor::from_limits(state.store.pool().clone(), limits)),
            ResultFormatter::from_limits(limits),
        )
    }

    /// 执行 SQL 查询
    ///
    /// Denied text never reaches the runner.
    pub async fn execute(&self, req: QueryRequest) -> AppResult<ResultSet> {
        if let QueryVerdict::Deny(reason) = self.validator.classify(&req.query) {
            tracing::info!(reason = %reason, "query denied");
            return Err(AppError::DeniedQuery(reason.to_string()));
        }

        let raw = match self.runner.run(&req.query).await {
            Ok(raw) => raw,
            Err(AppError::QueryRejected(msg)) => {
                tracing::warn!(error = %msg, "store rejected query");
                return Err(AppError::QueryRejected(msg));
            }
            Err(e) => return Err(e),
        };

        let result = self.formatter.format(raw);
        tracing::debug!(
            rows = result.row_count,
            truncated = result.truncated,
            elapsed_ms = result.execution_time_ms,
            "query executed"
        );
        Ok(result)
    }
}

/// 数据浏览服务
pub struct BrowseService {
    store: ReadOnlyStore,
    formatter: ResultFormatter,
    max_page_size: u64,
}

impl BrowseService {
    /// 创建新的浏览服务实例
    pub fn new(store: ReadOnlyStore, formatter: ResultFormatter, max_page_size: u64) -> Self {
        Self {
            store,
            formatter,
            max_page_size: max_page_size.max(1),
        }
    }

    /// Builds the service from shared application state.
    pub fn from_state(state: &AppState) -> Self {
        let limits = &state.config.query;
        Self::new(
            state.store.clone(),
            ResultFormatter::from_limits(limits),
            limits.fetch_limit as u64,
        )
    }

    /// 获取完整数据库结构
    pub async fn structure(&self) -> AppResult<DatabaseStructure> {
        Ok(DatabaseStructure {
            tables: self.store.database_structure().await?,
        })
    }

    /// 分页读取单表数据
    pub async fn table_page(&self, table: &str, params: PageParams) -> AppResult<TablePage> {
        // 表名只有在确认存在后才会拼接进 SQL
        if !self.store.has_table(table).await? {
            return Err(AppError::TableNotFound(table.to_string()));
        }

        let (skip, limit) = self.page_window(&params);

        let columns: Vec<String> = self
            .store
            .columns(table)
            .await?
            .into_iter()
            .map(|c| c.name)
            .collect();

        let sql = format!(
            "SELECT * FROM {} LIMIT ?1 OFFSET ?2",
            quote_identifier(table)
        );
        let rows = sqlx::query(&sql)
            .bind(to_sql_int(limit))
            .bind(to_sql_int(skip))
            .fetch_all(self.store.pool())
            .await?;

        let rows: Vec<Vec<Option<String>>> = rows
            .iter()
            .map(|row| self.formatter.render_row(&decode_row(row), columns.len()))
            .collect();

        let total_count = self.store.count_rows(table).await?;
        let showing = rows.len() as u64;

        Ok(TablePage {
            table_name: table.to_string(),
            columns,
            rows,
            pagination: Pagination::new(skip, limit, total_count, showing),
        })
    }

    /// 分页读取用户列表
    pub async fn users(&self, params: PageParams) -> AppResult<UserList> {
        let (skip, limit) = self.page_window(&params);
        Ok(UserList {
            users: self.store.list_users(skip, limit).await?,
            total_count: self.store.count_rows("users").await?,
        })
    }

    /// 分页读取佣金列表
    pub async fn commissions(&self, params: PageParams) -> AppResult<CommissionList> {
        let (skip, limit) = self.page_window(&params);
        Ok(CommissionList {
            commissions: self.store.list_commissions(skip, limit).await?,
            total_count: self.store.count_rows("commissions").await?,
        })
    }

    /// 获取仪表盘统计与最近活动
    pub async fn overview(&self) -> AppResult<DashboardOverview> {
        Ok(DashboardOverview {
            stats: self.store.dashboard_stats().await?,
            recent_activity: self.store.recent_activity(RECENT_ACTIVITY_LIMIT).await?,
        })
    }

    /// 导出所有表的数据，每张表最多 `max_page_size` 行
    ///
    /// A table that fails to read is reported in its own entry instead of failing the dump.
    pub async fn dump(&self) -> AppResult<DatabaseDump> {
        let mut tables = BTreeMap::new();
        for name in self.store.table_names().await? {
            let dump = match self.dump_table(&name).await {
                Ok(dump) => dump,
                Err(e) => {
                    tracing::warn!(table = %name, error = %e, "table dump failed");
                    TableDump {
                        error: Some(e.to_string()),
                        ..TableDump::default()
                    }
                }
            };
            tables.insert(name, dump);
        }
        Ok(DatabaseDump { tables })
    }

    async fn dump_table(&self, table: &str) -> AppResult<TableDump> {
        let columns: Vec<String> = self
            .store
            .columns(table)
            .await?
            .into_iter()
            .map(|c| c.name)
            .collect();

        let sql = format!("SELECT * FROM {} LIMIT ?1", quote_identifier(table));
        let mut rows = sqlx::query(&sql)
            .bind(to_sql_int(self.max_page_size.saturating_add(1)))
            .fetch_all(self.store.pool())
            .await?;

        let truncated = rows.len() as u64 > self.max_page_size;
        rows.truncate(self.max_page_size as usize);

        let data: Vec<BTreeMap<String, Option<String>>> = rows
            .iter()
            .map(|row| {
                let values = self.formatter.render_row(&decode_row(row), columns.len());
                columns.iter().cloned().zip(values).collect()
            })
            .collect();

        Ok(TableDump {
            count: data.len(),
            columns,
            data,
            truncated,
            error: None,
        })
    }

    /// Resolves `skip` and a `limit` clamped to `1..=max_page_size`.
    fn page_window(&self, params: &PageParams) -> (u64, u64) {
        let skip = params.skip.unwrap_or(0);
        let limit = params
            .limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, self.max_page_size);
        (skip, limit)
    }
}
