//! Resource tokens and the store access key
//!
//! A resource token is minted by the store when a permission is created:
//! `res-{payload}.{signature}`, where the payload is the base64 JSON of
//! [`TokenClaims`] and the signature is HMAC-SHA256 under the store's
//! [`AccessKey`]. Clients treat the string as opaque.

use crate::auth::slots::{PermissionMode, PermissionSlot};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;
use thiserror::Error;

/// Resource token prefix
pub const RESOURCE_TOKEN_PREFIX: &str = "res-";

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("invalid token format")]
    InvalidFormat,

    #[error("invalid token prefix: expected '{expected}', got '{got}'")]
    InvalidPrefix { expected: String, got: String },

    #[error("invalid token signature")]
    InvalidSignature,

    #[error("token decode error: {0}")]
    DecodeError(String),
}

/// Store access key, used to sign resource tokens
#[derive(Clone)]
pub struct AccessKey {
    key: String,
}

impl AccessKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    pub fn from_env() -> Option<Self> {
        std::env::var("CONTENT_STORE_KEY").ok().map(Self::new)
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.key.as_bytes()
    }

    fn sign(&self, payload_b64: &str) -> String {
        let mut mac =
            HmacSha256::new_from_slice(self.as_bytes()).expect("HMAC can take key of any size");
        mac.update(payload_b64.as_bytes());
        let signature = mac.finalize().into_bytes();
        URL_SAFE_NO_PAD.encode(&signature[..16])
    }
}

impl fmt::Debug for AccessKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccessKey([REDACTED])")
    }
}

/// Constant-time string comparison
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

/// What a resource token grants
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub user_id: String,
    pub permission_id: PermissionSlot,
    /// Locator of the collection the token is scoped to
    pub resource_link: String,
    pub mode: PermissionMode,
    /// Random per-mint value, so no two permissions share a token
    pub nonce: String,
}

impl TokenClaims {
    pub fn new(
        user_id: impl Into<String>,
        permission_id: PermissionSlot,
        resource_link: impl Into<String>,
        mode: PermissionMode,
    ) -> Self {
        let mut rng = rand::rng();
        let mut bytes = [0u8; 12];
        rng.fill(&mut bytes);

        Self {
            user_id: user_id.into(),
            permission_id,
            resource_link: resource_link.into(),
            mode,
            nonce: URL_SAFE_NO_PAD.encode(bytes),
        }
    }
}

/// An opaque, store-issued credential for one permission
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceToken(String);

impl ResourceToken {
    /// Sign claims into a new token
    pub fn mint(claims: &TokenClaims, key: &AccessKey) -> Result<Self, TokenError> {
        let payload_json =
            serde_json::to_vec(claims).map_err(|e| TokenError::DecodeError(e.to_string()))?;
        let payload_b64 = URL_SAFE_NO_PAD.encode(&payload_json);
        let signature_b64 = key.sign(&payload_b64);

        Ok(Self(format!(
            "{}{}.{}",
            RESOURCE_TOKEN_PREFIX, payload_b64, signature_b64
        )))
    }

    /// Wrap a token string read back from storage
    pub fn from_stored(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Check the signature and decode the claims
    pub fn verify(token: &str, key: &AccessKey) -> Result<TokenClaims, TokenError> {
        let content = token.strip_prefix(RESOURCE_TOKEN_PREFIX).ok_or_else(|| {
            TokenError::InvalidPrefix {
                expected: RESOURCE_TOKEN_PREFIX.to_string(),
                got: token.chars().take(4).collect(),
            }
        })?;

        let (payload_b64, signature_b64) =
            content.split_once('.').ok_or(TokenError::InvalidFormat)?;
        if signature_b64.contains('.') {
            return Err(TokenError::InvalidFormat);
        }

        if !constant_time_eq(signature_b64, &key.sign(payload_b64)) {
            return Err(TokenError::InvalidSignature);
        }

        let payload_json = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|e| TokenError::DecodeError(e.to_string()))?;

        serde_json::from_slice(&payload_json).map_err(|e| TokenError::DecodeError(e.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ResourceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> AccessKey {
        AccessKey::new("test-store-key")
    }

    fn claims() -> TokenClaims {
        TokenClaims::new(
            "user-1",
            PermissionSlot::UserRead,
            "dbs/Content/colls/articles",
            PermissionMode::Read,
        )
    }

    #[test]
    fn test_mint_verify() {
        let claims = claims();
        let token = ResourceToken::mint(&claims, &test_key()).unwrap();
        assert!(token.as_str().starts_with(RESOURCE_TOKEN_PREFIX));

        let decoded = ResourceToken::verify(token.as_str(), &test_key()).unwrap();
        assert_eq!(decoded, claims);
    }

    #[test]
    fn test_verify_wrong_key() {
        let token = ResourceToken::mint(&claims(), &test_key()).unwrap();

        let result = ResourceToken::verify(token.as_str(), &AccessKey::new("other-key"));
        assert!(matches!(result, Err(TokenError::InvalidSignature)));
    }

    #[test]
    fn test_verify_malformed() {
        let key = test_key();
        assert!(matches!(
            ResourceToken::verify("tok-abc.def", &key),
            Err(TokenError::InvalidPrefix { .. })
        ));
        assert!(matches!(
            ResourceToken::verify("res-nodot", &key),
            Err(TokenError::InvalidFormat)
        ));
        assert!(matches!(
            ResourceToken::verify("res-a.b.c", &key),
            Err(TokenError::InvalidFormat)
        ));
    }

    #[test]
    fn test_same_claims_mint_distinct_tokens() {
        let key = test_key();
        let a = ResourceToken::mint(&claims(), &key).unwrap();
        let b = ResourceToken::mint(&claims(), &key).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_access_key_debug_redacted() {
        let key = AccessKey::new("super-secret");
        assert_eq!(format!("{:?}", key), "AccessKey([REDACTED])");
    }
}
