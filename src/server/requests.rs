//! Read and write token requests
//!
//! Thin callers over [`TokenIssuer`]: pick the user, slot, and mode from the
//! caller's identity, then flatten the outcome into what the HTTP layer
//! returns. "No token" and "store error" look the same from outside.

use crate::auth::{Caller, ResourceToken};
use crate::issuer::{IssueError, TokenIssuer};
use tracing::{error, info, warn};

/// Outcome of a token request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenResponse {
    Issued(ResourceToken),
    Unauthorized,
    Failed,
}

/// Read token: personal for authenticated callers, shared anonymous otherwise
pub async fn read_token(
    issuer: &TokenIssuer,
    caller: &Caller,
    collection_id: &str,
) -> TokenResponse {
    if caller.is_authenticated() {
        info!("User is authenticated");
    } else {
        info!("User is not authenticated, retrieving anonymous read token");
    }

    let (user_id, slot, mode) = caller.read_grant();
    let result = issuer.issue_token(user_id, collection_id, slot, mode).await;
    finish(result, user_id, collection_id)
}

/// Write token: authenticated callers only
pub async fn write_token(
    issuer: &TokenIssuer,
    caller: &Caller,
    collection_id: &str,
) -> TokenResponse {
    let Some((user_id, slot, mode)) = caller.write_grant() else {
        info!("User is not authenticated");
        return TokenResponse::Unauthorized;
    };

    info!(user_id = %user_id, "User is authenticated");
    let result = issuer.issue_token(user_id, collection_id, slot, mode).await;
    finish(result, user_id, collection_id)
}

fn finish(
    result: Result<Option<ResourceToken>, IssueError>,
    user_id: &str,
    collection_id: &str,
) -> TokenResponse {
    match result {
        Ok(Some(token)) => TokenResponse::Issued(token),
        Ok(None) => {
            warn!(user_id = %user_id, collection_id = %collection_id, "No token available");
            TokenResponse::Failed
        }
        Err(e) => {
            error!(
                user_id = %user_id,
                collection_id = %collection_id,
                error = %e,
                "Token issuance failed"
            );
            TokenResponse::Failed
        }
    }
}
