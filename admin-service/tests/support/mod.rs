//! Shared fixtures for admin-service integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::str::FromStr;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tempfile::TempDir;
use tower::ServiceExt;

use admin_service::create_router;
use admin_service::state::AppState;
use common::config::AppConfig;

pub const TOKEN: &str = "test-token";
pub const CLIENT_COUNT: i64 = 120;

const SCHEMA: &[&str] = &[
    "CREATE TABLE users (
        id INTEGER NOT NULL,
        email VARCHAR NOT NULL,
        name VARCHAR NOT NULL,
        hashed_password VARCHAR NOT NULL,
        is_active BOOLEAN,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        PRIMARY KEY (id)
    )",
    "CREATE INDEX ix_users_id ON users (id)",
    "CREATE UNIQUE INDEX ix_users_email ON users (email)",
    "CREATE TABLE clients (
        id INTEGER NOT NULL,
        name VARCHAR NOT NULL,
        email VARCHAR,
        phone VARCHAR,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        PRIMARY KEY (id)
    )",
    "CREATE INDEX ix_clients_id ON clients (id)",
    "CREATE UNIQUE INDEX ix_clients_email ON clients (email)",
    "CREATE TABLE commissions (
        id INTEGER NOT NULL,
        client_id INTEGER NOT NULL,
        amount NUMERIC(12, 2) NOT NULL,
        source VARCHAR,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        PRIMARY KEY (id),
        FOREIGN KEY(client_id) REFERENCES clients (id)
    )",
    "CREATE INDEX ix_commissions_id ON commissions (id)",
    "INSERT INTO users (email, name, hashed_password, is_active, created_at) VALUES
        ('alice@example.com', 'Alice Admin', '$2b$12$alice', 1, '2024-01-01 09:00:00'),
        ('bob@example.com', 'Bob Broker', '$2b$12$bob', 1, '2024-02-01 09:00:00'),
        ('carol@example.com', 'Carol Closed', '$2b$12$carol', 0, '2024-03-01 09:00:00')",
    "WITH RECURSIVE seq(n) AS (SELECT 1 UNION ALL SELECT n + 1 FROM seq WHERE n < 120)
     INSERT INTO clients (id, name, email, phone, created_at)
     SELECT n, 'Client ' || n, 'client' || n || '@example.com',
            CASE WHEN n % 2 = 0 THEN NULL ELSE '555-' || n END,
            datetime('2024-01-01 00:00:00', '+' || n || ' days')
     FROM seq",
    "INSERT INTO commissions (client_id, amount, source, created_at) VALUES
        (1, 100.5, 'referral', '2024-04-01 10:00:00'),
        (2, 200.0, 'website', '2024-04-02 10:00:00'),
        (3, 50.25, NULL, '2024-04-03 10:00:00'),
        (4, 49.25, 'referral', '2024-04-04 10:00:00')",
];

/// A seeded CRM database on disk plus the router serving it.
pub struct TestApp {
    pub router: Router,
    _dir: TempDir,
}

async fn seed(path: &Path) {
    let options = SqliteConnectOptions::from_str(&database_url(path))
        .unwrap()
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .unwrap();
    for statement in SCHEMA {
        sqlx::query(statement).execute(&pool).await.unwrap();
    }
    pool.close().await;
}

fn database_url(path: &Path) -> String {
    format!("sqlite://{}", path.display())
}

/// Config for the seeded database with `overrides` applied on top.
pub fn config_for(path: &Path, overrides: &[(&str, &str)]) -> AppConfig {
    let url = database_url(path);
    AppConfig::from_lookup("admin-service", |key| {
        if let Some((_, value)) = overrides.iter().find(|(k, _)| *k == key) {
            return Some(value.to_string());
        }
        match key {
            "DATABASE_URL" => Some(url.clone()),
            "ADMIN_API_TOKENS" => Some(TOKEN.to_string()),
            _ => None,
        }
    })
    .unwrap()
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(&[]).await
}

/// Creates and seeds a CRM database in a fresh temp dir.
pub async fn seeded_db() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("crm.db");
    seed(&path).await;
    (dir, path)
}

pub async fn spawn_app_with(overrides: &[(&str, &str)]) -> TestApp {
    let (dir, path) = seeded_db().await;

    let state = AppState::new(config_for(&path, overrides)).await.unwrap();
    TestApp {
        router: create_router(state),
        _dir: dir,
    }
}

impl TestApp {
    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::GET, uri, token, None).await
    }

    pub async fn query(&self, sql: &str) -> (StatusCode, Value) {
        let body = serde_json::json!({ "query": sql }).to_string();
        self.send(Method::POST, "/admin/api/sql/execute", Some(TOKEN), Some(body))
            .await
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<String>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }
}
