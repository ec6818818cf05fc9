//! Service configuration.
//!
//! Configuration is read from environment variables. A `.env` file in the
//! working directory is loaded first when present; variables already set in
//! the process environment win.

use crate::errors::{AppError, AppResult};

/// Limits applied to ad-hoc SQL submitted through the admin terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryLimits {
    /// Wall-clock deadline for a single query, in milliseconds.
    pub timeout_ms: u64,
    /// Maximum rows pulled from the store per query.
    pub fetch_limit: usize,
    /// Maximum rows returned to the caller. Never larger than `fetch_limit`.
    pub display_limit: usize,
    /// Maximum characters kept per rendered value.
    pub value_max_chars: usize,
    /// Maximum accepted query length, in characters.
    pub max_query_chars: usize,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            timeout_ms: 5_000,
            fetch_limit: 100,
            display_limit: 100,
            value_max_chars: 50,
            max_query_chars: 10_000,
        }
    }
}

/// Application configuration shared by every handler.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Service name, used in logs and health responses.
    pub service_name: String,
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// SQLite connection URL of the CRM store.
    pub database_url: String,
    /// Maximum pooled read-only connections.
    pub db_max_connections: u32,
    /// Bearer tokens accepted for the admin API.
    pub admin_tokens: Vec<String>,
    /// Ad-hoc query limits.
    pub query: QueryLimits,
}

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_DATABASE_URL: &str = "sqlite://crm.db";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

impl AppConfig {
    /// Loads configuration for the named service from `.env` and the process environment.
    pub fn load_with_service(service_name: &str) -> AppResult<Self> {
        // 缺少 .env 文件不是错误
        let _ = dotenvy::dotenv();
        Self::from_lookup(service_name, |key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(service_name: &str, lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = QueryLimits::default();

        let fetch_limit = parse_or(&lookup, "QUERY_FETCH_LIMIT", defaults.fetch_limit)?.max(1);
        let display_limit = parse_or(&lookup, "QUERY_DISPLAY_LIMIT", defaults.display_limit)?
            .clamp(1, fetch_limit);

        let query = QueryLimits {
            timeout_ms: parse_or(&lookup, "QUERY_TIMEOUT_MS", defaults.timeout_ms)?.max(1),
            fetch_limit,
            display_limit,
            value_max_chars: parse_or(&lookup, "QUERY_VALUE_MAX_CHARS", defaults.value_max_chars)?
                .max(1),
            max_query_chars: parse_or(&lookup, "QUERY_MAX_CHARS", defaults.max_query_chars)?,
        };

        let admin_tokens = lookup("ADMIN_API_TOKENS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|token| !token.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            service_name: service_name.to_string(),
            host: lookup("SERVER_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_or(&lookup, "SERVER_PORT", DEFAULT_PORT)?,
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?
                .max(1),
            admin_tokens,
            query,
        })
    }

    /// Returns the `host:port` bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> AppResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("invalid {key}={raw:?}: {e}"))),
        _ => Ok(default),
    }
}
