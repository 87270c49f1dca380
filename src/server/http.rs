//! HTTP endpoints for token requests
//!
//! - `GET /tokens/read/{collection_id}`
//! - `GET /tokens/write/{collection_id}`
//! - `GET /health`
//!
//! The caller's verified user id arrives in a header set by the
//! authenticating proxy in front of this service.

use crate::auth::Caller;
use crate::issuer::TokenIssuer;
use crate::server::requests::{read_token, write_token, TokenResponse};

use axum::{
    extract::{Path, State},
    http::{HeaderMap, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::future::Future;
use std::net::SocketAddr;
use tracing::{debug, info, warn};

/// Header carrying the verified user id when none is configured
pub const DEFAULT_IDENTITY_HEADER: &str = "x-authenticated-user";

/// Shared state for HTTP handlers
#[derive(Clone)]
pub struct HttpState {
    pub issuer: TokenIssuer,
    pub identity_header: HeaderName,
}

impl HttpState {
    pub fn new(issuer: TokenIssuer) -> Self {
        Self {
            issuer,
            identity_header: HeaderName::from_static(DEFAULT_IDENTITY_HEADER),
        }
    }

    pub fn with_identity_header(mut self, header: HeaderName) -> Self {
        self.identity_header = header;
        self
    }

    /// A missing header is anonymous; one that is present must decode as UTF-8
    fn caller(&self, headers: &HeaderMap) -> Result<Caller, StatusCode> {
        let Some(value) = headers.get(&self.identity_header) else {
            return Ok(Caller::Anonymous);
        };

        match std::str::from_utf8(value.as_bytes()) {
            Ok(user_id) => Ok(Caller::from_user_id(Some(user_id))),
            Err(e) => {
                warn!(
                    header = %self.identity_header,
                    error = %e,
                    "Rejecting request with unreadable identity header"
                );
                Err(StatusCode::BAD_REQUEST)
            }
        }
    }
}

/// Create the HTTP router
pub fn create_router(state: HttpState) -> Router {
    Router::new()
        .route("/tokens/read/{collection_id}", get(read_handler))
        .route("/tokens/write/{collection_id}", get(write_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

async fn health_handler() -> &'static str {
    "ok"
}

async fn read_handler(
    State(state): State<HttpState>,
    Path(collection_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let caller = match state.caller(&headers) {
        Ok(caller) => caller,
        Err(status) => return status.into_response(),
    };
    debug!(collection_id = %collection_id, "Read token requested");
    into_response(read_token(&state.issuer, &caller, &collection_id).await)
}

async fn write_handler(
    State(state): State<HttpState>,
    Path(collection_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let caller = match state.caller(&headers) {
        Ok(caller) => caller,
        Err(status) => return status.into_response(),
    };
    debug!(collection_id = %collection_id, "Write token requested");
    into_response(write_token(&state.issuer, &caller, &collection_id).await)
}

fn into_response(outcome: TokenResponse) -> Response {
    match outcome {
        TokenResponse::Issued(token) => (StatusCode::OK, Json(token.into_string())).into_response(),
        TokenResponse::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
        TokenResponse::Failed => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

/// Run the HTTP server until `shutdown` resolves
pub async fn run_http_server<F>(
    bind_addr: SocketAddr,
    state: HttpState,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!(addr = %bind_addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
