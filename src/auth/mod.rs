//! Identity, permission vocabulary, and resource tokens
//!
//! Slots:
//! - `anonymous_read`: shared read access for unauthenticated callers
//! - `user_read`: personal read access
//! - `user_write`: personal read+write access
//!
//! Modes:
//! - `read`: read documents
//! - `all`: read and write documents

mod identity;
mod slots;
mod tokens;

pub use identity::Caller;
pub use slots::{PermissionMode, PermissionSlot, ANONYMOUS_USER_ID};
pub use tokens::{AccessKey, ResourceToken, TokenClaims, TokenError, RESOURCE_TOKEN_PREFIX};
