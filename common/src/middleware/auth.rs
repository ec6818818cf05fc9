//! Authentication middleware.
//!
//! Admin endpoints require a bearer token. Whether a token is valid is decided by an
//! [`Authenticator`]; the middleware only extracts the token, asks, and attaches the
//! resulting [`AuthenticatedCaller`] to the request extensions.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::Response,
};

use crate::errors::AppError;

/// A caller whose credentials were accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedCaller {
    /// Identifier of the caller, safe to log.
    pub subject: String,
}

/// Decides whether a bearer token belongs to an admin caller.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Returns the caller for a valid token, or `None`.
    async fn authenticate(&self, token: &str) -> Option<AuthenticatedCaller>;
}

/// Authenticator backed by a fixed list of admin tokens.
///
/// An empty list rejects every request.
pub struct StaticTokenAuthenticator {
    tokens: Vec<String>,
}

impl StaticTokenAuthenticator {
    /// Creates an authenticator accepting exactly the given tokens.
    pub fn new(tokens: impl IntoIterator<Item = String>) -> Self {
        Self {
            tokens: tokens.into_iter().filter(|t| !t.is_empty()).collect(),
        }
    }
}

#[async_trait]
impl Authenticator for StaticTokenAuthenticator {
    async fn authenticate(&self, token: &str) -> Option<AuthenticatedCaller> {
        self.tokens
            .iter()
            .position(|known| known == token)
            .map(|index| AuthenticatedCaller {
                subject: format!("admin-token-{}", index + 1),
            })
    }
}

/// Authentication middleware handler.
///
/// Rejects the request with [`AppError::Unauthorized`] when the bearer token is
/// missing or unknown. Otherwise the caller is inserted into the request extensions.
pub async fn auth_middleware(
    State(authenticator): State<Arc<dyn Authenticator>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(&req)
        .map(str::to_owned)
        .ok_or(AppError::Unauthorized)?;

    let Some(caller) = authenticator.authenticate(&token).await else {
        tracing::warn!(uri = %req.uri(), "rejected admin request with unknown token");
        return Err(AppError::Unauthorized);
    };

    req.extensions_mut().insert(caller);
    Ok(next.run(req).await)
}

/// Extract bearer token from Authorization header.
pub fn extract_bearer_token(req: &Request<Body>) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
