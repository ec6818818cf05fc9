//! Error types shared by the admin services.
//!
//! Every variant maps to an HTTP status and a stable error code. Client-class
//! errors carry their message to the caller verbatim; server-class errors are
//! logged and answered with a generic message.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::response::ErrorBody;

/// Main error type for admin service operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// No valid admin credentials on the request.
    #[error("Could not validate credentials")]
    Unauthorized,

    /// The query classifier refused the submitted text.
    #[error("{0}")]
    DeniedQuery(String),

    /// The store refused an allowed query (syntax error, unknown table, ...).
    #[error("Query execution error: {0}")]
    QueryRejected(String),

    /// The query did not finish before the deadline.
    #[error("Query timed out after {0} ms")]
    Timeout(u64),

    /// The requested table does not exist.
    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// Malformed request input.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Store unreachable or failing outside of the submitted query.
    #[error("Database error: {0}")]
    Database(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// Returns the HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::DeniedQuery(_) | Self::QueryRejected(_) | Self::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
            Self::TableNotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(_) | Self::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns the stable error code reported to clients.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized => "UNAUTHORIZED",
            Self::DeniedQuery(_) => "DENIED_QUERY",
            Self::QueryRejected(_) => "QUERY_REJECTED",
            Self::Timeout(_) => "QUERY_TIMEOUT",
            Self::TableNotFound(_) => "TABLE_NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Database(_) | Self::Config(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns true for errors the caller can correct.
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if self.is_client_error() {
            self.to_string()
        } else {
            tracing::error!(error = %self, "request failed");
            "internal server error".to_string()
        };

        let mut response = (
            status,
            Json(ErrorBody {
                error: message,
                code: self.code().to_string(),
            }),
        )
            .into_response();

        if matches!(self, Self::Unauthorized) {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }

        response
    }
}

/// Result type alias using AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_query_errors_are_client_errors() {
        assert!(AppError::DeniedQuery("empty query".into()).is_client_error());
        assert!(AppError::QueryRejected("no such table: x".into()).is_client_error());
        assert!(AppError::Timeout(5000).is_client_error());
        assert!(AppError::Unauthorized.is_client_error());
        assert!(!AppError::Database("pool closed".into()).is_client_error());
    }

    #[test]
    fn test_denied_query_message_is_reason() {
        let err = AppError::DeniedQuery("empty query".into());
        assert_eq!(err.to_string(), "empty query");
        assert_eq!(err.code(), "DENIED_QUERY");
    }

    #[tokio::test]
    async fn test_rejected_query_body_keeps_store_diagnostic() {
        let response = AppError::QueryRejected("no such table: ghosts".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["code"], "QUERY_REJECTED");
        assert!(body["error"].as_str().unwrap().contains("no such table: ghosts"));
    }

    #[tokio::test]
    async fn test_internal_error_hides_details() {
        let response = AppError::Database("disk I/O error at /var/db".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["error"], "internal server error");
        assert_eq!(body["code"], "INTERNAL_ERROR");
    }

    #[tokio::test]
    async fn test_unauthorized_sets_www_authenticate() {
        let response = AppError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Bearer"
        );
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AppError>();
    }
}
