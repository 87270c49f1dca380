//! Service configuration shared by the CLI and the daemon

use crate::auth::AccessKey;
use crate::issuer::{SelectionRule, TokenIssuer};
use crate::server::{HttpState, DEFAULT_IDENTITY_HEADER};
use crate::storage::{
    PermissionStore, PostgresConfig, PostgresStore, StorageError, UnavailableStore,
    DEFAULT_DATABASE_ID,
};
use axum::http::HeaderName;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::warn;

/// Everything needed to run the token service
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to bind the HTTP server to
    pub bind_addr: SocketAddr,
    /// Store endpoint; `None` when missing or unparseable
    pub database: Option<PostgresConfig>,
    /// Store access key (signs resource tokens)
    pub access_key: Option<AccessKey>,
    /// Database namespace collections and users live in
    pub database_id: String,
    /// Header the authenticating proxy puts the verified user id in
    pub identity_header: HeaderName,
    pub selection: SelectionRule,
}

impl ServiceConfig {
    pub fn new(
        bind_addr: SocketAddr,
        database: Option<PostgresConfig>,
        access_key: Option<AccessKey>,
    ) -> Self {
        Self {
            bind_addr,
            database,
            access_key,
            database_id: DEFAULT_DATABASE_ID.to_string(),
            identity_header: HeaderName::from_static(DEFAULT_IDENTITY_HEADER),
            selection: SelectionRule::default(),
        }
    }

    /// Build the postgres store; no connection is made until first use
    pub fn store(&self) -> Result<Arc<PostgresStore>, StorageError> {
        let database = self.database.clone().ok_or_else(|| {
            StorageError::Unavailable("store endpoint missing or invalid".to_string())
        })?;
        let key = self
            .access_key
            .clone()
            .ok_or_else(|| StorageError::Unavailable("store access key missing".to_string()))?;

        Ok(Arc::new(PostgresStore::new(database, key)?))
    }

    /// Store handle for the service
    ///
    /// Never fails: a missing endpoint or key, or a store that cannot be
    /// reached for the schema check, is logged here and then reported as
    /// `StorageError::Unavailable` by the token requests that need it.
    pub async fn service_store(&self) -> Arc<dyn PermissionStore> {
        match self.store() {
            Ok(store) => {
                if let Err(e) = store.ensure_schema().await {
                    warn!(error = %e, "Store schema check failed, continuing");
                }
                store
            }
            Err(e) => {
                warn!(error = %e, "Store not configured, token requests will fail");
                Arc::new(UnavailableStore::new(e.to_string()))
            }
        }
    }

    /// Build the issuer and HTTP state around an existing store
    pub fn http_state(&self, store: Arc<dyn PermissionStore>) -> HttpState {
        let issuer = TokenIssuer::new(store)
            .with_database_id(self.database_id.clone())
            .with_selection(self.selection);

        HttpState::new(issuer).with_identity_header(self.identity_header.clone())
    }
}

/// Parse a header name given on the command line
pub fn parse_header_name(s: &str) -> Result<HeaderName, String> {
    HeaderName::try_from(s.to_lowercase())
        .map_err(|e| format!("Invalid header name '{}': {}", s, e))
}
