//! Application state for the admin service.

use std::sync::Arc;

use common::config::AppConfig;
use common::errors::AppResult;
use common::middleware::{Authenticator, StaticTokenAuthenticator};

use crate::store::ReadOnlyStore;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: ReadOnlyStore,
    pub authenticator: Arc<dyn Authenticator>,
}

impl AppState {
    /// Connects the read-only store and builds the token authenticator from config.
    pub async fn new(config: AppConfig) -> AppResult<Self> {
        let store = ReadOnlyStore::connect(&config).await?;
        let authenticator = Arc::new(StaticTokenAuthenticator::new(config.admin_tokens.clone()));
        Ok(Self::with_parts(config, store, authenticator))
    }

    /// Assembles state from already-built parts.
    pub fn with_parts(
        config: AppConfig,
        store: ReadOnlyStore,
        authenticator: Arc<dyn Authenticator>,
    ) -> Self {
        if config.admin_tokens.is_empty() {
            tracing::warn!("ADMIN_API_TOKENS is empty, every admin request will be rejected");
        }
        Self {
            config: Arc::new(config),
            store,
            authenticator,
        }
    }
}
