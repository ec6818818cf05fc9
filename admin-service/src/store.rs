//! Read-only access to the CRM store.
//!
//! Opens the SQLite database with `SQLITE_OPEN_READONLY` so that no code path in
//! this service can write, and provides schema introspection for the admin UI.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use common::config::AppConfig;
use common::errors::{AppError, AppResult};
use common::models::{
    ColumnStructure, CommissionSummary, DashboardStats, ForeignKeyStructure, IndexStructure,
    RecentActivity, RecentClient, RecentCommission, RecentUser, TableStructure, UserSummary,
};

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Read-only connection pool plus introspection helpers.
#[derive(Clone)]
pub struct ReadOnlyStore {
    pool: SqlitePool,
}

impl ReadOnlyStore {
    /// Connects to `config.database_url` in read-only mode.
    pub async fn connect(config: &AppConfig) -> AppResult<Self> {
        let options = SqliteConnectOptions::from_str(&config.database_url)
            .map_err(|e| AppError::Config(format!("invalid DATABASE_URL: {e}")))?
            .read_only(true)
            .create_if_missing(false)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            // 被超时丢弃的查询可能留下进度回调，归还前清除
            .after_release(|conn, _meta| {
                Box::pin(async move {
                    conn.lock_handle().await?.remove_progress_handler();
                    Ok(true)
                })
            })
            .connect_with(options)
            .await
            .map_err(|e| AppError::Database(format!("failed to open store: {e}")))?;

        tracing::info!(url = %config.database_url, "read-only store connected");
        Ok(Self { pool })
    }

    /// Returns the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Returns true if a trivial query succeeds before `deadline`.
    pub async fn ping(&self, deadline: Duration) -> bool {
        tokio::time::timeout(deadline, sqlx::query("SELECT 1").execute(&self.pool))
            .await
            .is_ok_and(|res| res.is_ok())
    }

    /// Lists user tables, sorted by name.
    pub async fn table_names(&self) -> AppResult<Vec<String>> {
        let names = sqlx::query_scalar(
            "SELECT name FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' \
             ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(names)
    }

    /// Returns true if `table` is one of the user tables.
    pub async fn has_table(&self, table: &str) -> AppResult<bool> {
        Ok(self.table_names().await?.iter().any(|name| name == table))
    }

    /// Describes every user table.
    pub async fn database_structure(&self) -> AppResult<BTreeMap<String, TableStructure>> {
        let mut tables = BTreeMap::new();
        for name in self.table_names().await? {
            let structure = self.table_structure(&name).await?;
            tables.insert(name, structure);
        }
        Ok(tables)
    }

    /// Describes one table: columns, foreign keys and indexes.
    pub async fn table_structure(&self, table: &str) -> AppResult<TableStructure> {
        Ok(TableStructure {
            columns: self.columns(table).await?,
            foreign_keys: self.foreign_keys(table).await?,
            indexes: self.indexes(table).await?,
        })
    }

    /// Columns of `table` in declaration order.
    pub async fn columns(&self, table: &str) -> AppResult<Vec<ColumnStructure>> {
        let rows: Vec<(String, String, i64, Option<String>, i64)> = sqlx::query_as(
            r#"SELECT name, type, "notnull", dflt_value, pk FROM pragma_table_info(?1) ORDER BY cid"#,
        )
        .bind(table)
        .fetch_all(&self.pool)
        .await?;

        // 单列 INTEGER 主键即 rowid 别名，由 SQLite 自动赋值
        let pk_columns = rows.iter().filter(|(.., pk)| *pk > 0).count();

        Ok(rows
            .into_iter()
            .map(|(name, data_type, not_null, default, pk)| {
                let autoincrement =
                    pk > 0 && pk_columns == 1 && data_type.eq_ignore_ascii_case("INTEGER");
                ColumnStructure {
                    name,
                    data_type,
                    nullable: not_null == 0 && pk == 0,
                    primary_key: pk > 0,
                    autoincrement,
                    default,
                }
            })
            .collect())
    }

    async fn foreign_keys(&self, table: &str) -> AppResult<Vec<ForeignKeyStructure>> {
        let rows: Vec<(i64, String, String, Option<String>)> = sqlx::query_as(
            r#"SELECT id, "table", "from", "to" FROM pragma_foreign_key_list(?1) ORDER BY id, seq"#,
        )
        .bind(table)
        .fetch_all(&self.pool)
        .await?;

        // 复合外键按 id 聚合
        let mut grouped: BTreeMap<i64, ForeignKeyStructure> = BTreeMap::new();
        for (id, referred_table, from, to) in rows {
            let entry = grouped.entry(id).or_insert_with(|| ForeignKeyStructure {
                constrained_columns: Vec::new(),
                referred_table,
                referred_columns: Vec::new(),
            });
            entry.constrained_columns.push(from);
            if let Some(to) = to {
                entry.referred_columns.push(to);
            }
        }
        Ok(grouped.into_values().collect())
    }

    async fn indexes(&self, table: &str) -> AppResult<Vec<IndexStructure>> {
        let list: Vec<(String, i64)> =
            sqlx::query_as(r#"SELECT name, "unique" FROM pragma_index_list(?1) ORDER BY name"#)
                .bind(table)
                .fetch_all(&self.pool)
                .await?;

        let mut indexes = Vec::with_capacity(list.len());
        for (name, unique) in list {
            let columns: Vec<String> = sqlx::query_scalar(
                "SELECT name FROM pragma_index_info(?1) WHERE name IS NOT NULL ORDER BY seqno",
            )
            .bind(&name)
            .fetch_all(&self.pool)
            .await?;

            indexes.push(IndexStructure {
                name,
                columns,
                unique: unique != 0,
            });
        }
        Ok(indexes)
    }

    /// Counts rows of a table that is known to exist.
    pub async fn count_rows(&self, table: &str) -> AppResult<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_identifier(table));
        let count: i64 = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;
        Ok(count.max(0) as u64)
    }

    /// Headline counts for the dashboard.
    pub async fn dashboard_stats(&self) -> AppResult<DashboardStats> {
        let count = |sql: &'static str| async move {
            sqlx::query_scalar::<_, i64>(sql)
                .fetch_one(&self.pool)
                .await
                .map(|n| n.max(0) as u64)
        };

        let total_commission_amount: f64 = sqlx::query_scalar(
            "SELECT CAST(COALESCE(SUM(amount), 0) AS REAL) FROM commissions",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(DashboardStats {
            total_users: count("SELECT COUNT(*) FROM users").await?,
            active_users: count("SELECT COUNT(*) FROM users WHERE is_active").await?,
            total_clients: count("SELECT COUNT(*) FROM clients").await?,
            total_commissions: count("SELECT COUNT(*) FROM commissions").await?,
            total_commission_amount,
        })
    }

    /// Newest `limit` users, clients and commissions by `created_at`.
    pub async fn recent_activity(&self, limit: u64) -> AppResult<RecentActivity> {
        let limit = to_sql_int(limit);

        let users: Vec<(i64, String, String, Option<String>)> = sqlx::query_as(
            "SELECT id, name, email, CAST(created_at AS TEXT) FROM users \
             ORDER BY created_at DESC, id DESC LIMIT ?1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let clients: Vec<(i64, String, Option<String>, Option<String>)> = sqlx::query_as(
            "SELECT id, name, email, CAST(created_at AS TEXT) FROM clients \
             ORDER BY created_at DESC, id DESC LIMIT ?1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let commissions: Vec<(i64, i64, f64, Option<String>)> = sqlx::query_as(
            "SELECT id, client_id, CAST(amount AS REAL), CAST(created_at AS TEXT) \
             FROM commissions ORDER BY created_at DESC, id DESC LIMIT ?1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(RecentActivity {
            recent_users: users
                .into_iter()
                .map(|(id, name, email, created_at)| RecentUser {
                    id,
                    name,
                    email,
                    created_at,
                })
                .collect(),
            recent_clients: clients
                .into_iter()
                .map(|(id, name, email, created_at)| RecentClient {
                    id,
                    name,
                    email,
                    created_at,
                })
                .collect(),
            recent_commissions: commissions
                .into_iter()
                .map(|(id, client_id, amount, created_at)| RecentCommission {
                    id,
                    client_id,
                    amount,
                    created_at,
                })
                .collect(),
        })
    }

    /// One page of users ordered by id.
    pub async fn list_users(&self, skip: u64, limit: u64) -> AppResult<Vec<UserSummary>> {
        let rows: Vec<(i64, String, String, i64, Option<String>)> = sqlx::query_as(
            "SELECT id, name, email, CAST(COALESCE(is_active, 0) AS INTEGER), \
             CAST(created_at AS TEXT) FROM users ORDER BY id LIMIT ?1 OFFSET ?2",
        )
        .bind(to_sql_int(limit))
        .bind(to_sql_int(skip))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, name, email, is_active, created_at)| UserSummary {
                id,
                name,
                email,
                is_active: is_active != 0,
                created_at,
            })
            .collect())
    }

    /// One page of commissions ordered by id, joined to their client's name.
    pub async fn list_commissions(
        &self,
        skip: u64,
        limit: u64,
    ) -> AppResult<Vec<CommissionSummary>> {
        let rows: Vec<(i64, i64, String, f64, Option<String>, Option<String>)> = sqlx::query_as(
            "SELECT co.id, co.client_id, COALESCE(c.name, 'Unknown'), \
             CAST(co.amount AS REAL), co.source, CAST(co.created_at AS TEXT) \
             FROM commissions co LEFT JOIN clients c ON c.id = co.client_id \
             ORDER BY co.id LIMIT ?1 OFFSET ?2",
        )
        .bind(to_sql_int(limit))
        .bind(to_sql_int(skip))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(id, client_id, client_name, amount, source, created_at)| CommissionSummary {
                    id,
                    client_id,
                    client_name,
                    amount,
                    source,
                    created_at,
                },
            )
            .collect())
    }
}

/// SQLite integers are signed 64-bit.
pub fn to_sql_int(value: u64) -> i64 {
    value.min(i64::MAX as u64) as i64
}

/// Quotes an SQL identifier, doubling embedded quotes.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
