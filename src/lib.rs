//! Content tokens - scoped read/write tokens for content collections
//!
//! Hands out store-issued resource tokens: a shared anonymous read token for
//! unauthenticated callers, and personal read or read+write tokens for
//! authenticated ones. Users and permissions are provisioned on first use.

pub mod auth;
pub mod config;
pub mod issuer;
pub mod server;
pub mod storage;

pub use auth::{AccessKey, Caller, PermissionMode, PermissionSlot, ResourceToken};
pub use config::ServiceConfig;
pub use issuer::{IssueError, SelectionRule, TokenIssuer};
pub use server::{HttpState, TokenResponse};
pub use storage::{InMemoryPermissionStore, PermissionStore, PostgresStore, StorageError};
