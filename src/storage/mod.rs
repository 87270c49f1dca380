//! Permission store backends
//!
//! - Postgres: durable users, permissions, and their tokens
//! - Memory: in-process store for tests and local development
//! - Unavailable: fails every call, for a service started without a store

mod memory;
mod postgres;
mod unavailable;

pub use memory::InMemoryPermissionStore;
pub use postgres::{PostgresConfig, PostgresStore, StoreCounts};
pub use unavailable::UnavailableStore;

use crate::auth::{PermissionMode, PermissionSlot, ResourceToken};
pub use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Database namespace used when none is configured
pub const DEFAULT_DATABASE_ID: &str = "Content";

const PERMISSIONS_SUFFIX: &str = "/permissions";

/// Storage errors
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    Conflict(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Opaque address of a store resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locator(String);

impl Locator {
    pub fn new(link: impl Into<String>) -> Self {
        Self(link.into())
    }

    pub fn collection(database_id: &str, collection_id: &str) -> Self {
        Self(format!("dbs/{}/colls/{}", database_id, collection_id))
    }

    pub fn user(database_id: &str, user_id: &str) -> Self {
        Self(format!("dbs/{}/users/{}", database_id, user_id))
    }

    /// Permissions feed of a user self link
    pub fn permissions_of(user_link: &Locator) -> Self {
        Self(format!("{}{}", user_link.0, PERMISSIONS_SUFFIX))
    }

    /// Split a user self link into `(database_id, user_id)`
    pub fn user_parts(&self) -> Option<(&str, &str)> {
        let rest = self.0.strip_prefix("dbs/")?;
        let (database_id, user_id) = rest.split_once("/users/")?;
        if database_id.is_empty() || user_id.is_empty() {
            return None;
        }
        Some((database_id, user_id))
    }

    /// The user self link a permissions feed belongs to
    pub fn owning_user(&self) -> Option<Locator> {
        self.0
            .strip_suffix(PERMISSIONS_SUFFIX)
            .map(|link| Locator(link.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A store user
///
/// Either link may be missing when the store hands back a user it cannot
/// address yet; callers treat that as "no permissions".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub self_link: Option<Locator>,
    pub permissions_link: Option<Locator>,
}

impl User {
    pub fn new(database_id: &str, id: impl Into<String>) -> Self {
        let id = id.into();
        let self_link = Locator::user(database_id, &id);
        Self {
            permissions_link: Some(Locator::permissions_of(&self_link)),
            self_link: Some(self_link),
            id,
        }
    }

    /// A user record without usable links
    pub fn detached(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            self_link: None,
            permissions_link: None,
        }
    }
}

/// A permission to be created under a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPermission {
    pub id: PermissionSlot,
    pub resource_link: Locator,
    pub mode: PermissionMode,
}

/// A stored permission and its token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permission {
    pub id: PermissionSlot,
    pub resource_link: Locator,
    pub mode: PermissionMode,
    pub token: ResourceToken,
}

/// Outcome of a user read; absence is an expected answer, not an error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserLookup {
    Found(User),
    NotFound,
}

/// Users, permissions, and collection addressing
#[async_trait]
pub trait PermissionStore: Send + Sync {
    /// Resolve a collection to its locator
    ///
    /// Returns `StorageError::NotFound` if the collection does not exist.
    async fn resolve_collection(
        &self,
        database_id: &str,
        collection_id: &str,
    ) -> Result<Locator, StorageError>;

    /// Read a user by id
    async fn read_user(&self, database_id: &str, user_id: &str)
        -> Result<UserLookup, StorageError>;

    /// Create a user; `StorageError::Conflict` if it already exists
    async fn create_user(&self, database_id: &str, user_id: &str) -> Result<User, StorageError>;

    /// Create a permission under a user and mint its token
    ///
    /// Returns `StorageError::Conflict` if the user already holds that slot.
    async fn create_permission(
        &self,
        user_link: &Locator,
        permission: NewPermission,
    ) -> Result<Permission, StorageError>;

    /// List a user's permissions in creation order
    async fn list_permissions(
        &self,
        permissions_link: &Locator,
    ) -> Result<Vec<Permission>, StorageError>;

    /// Register a collection (idempotent)
    ///
    /// Administrative; token issuance never creates collections.
    async fn create_collection(
        &self,
        database_id: &str,
        collection_id: &str,
    ) -> Result<Locator, StorageError>;
}
