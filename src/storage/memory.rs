//! In-memory permission store for tests and local development

use crate::auth::{AccessKey, ResourceToken, TokenClaims};
use crate::storage::{
    Locator, NewPermission, Permission, PermissionStore, StorageError, User, UserLookup,
};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

struct UserRecord {
    user: User,
    /// Creation order is listing order
    permissions: Vec<Permission>,
}

#[derive(Default)]
struct State {
    collections: HashSet<Locator>,
    /// Keyed by the user's canonical self link
    users: HashMap<Locator, UserRecord>,
}

/// In-memory permission store
pub struct InMemoryPermissionStore {
    key: AccessKey,
    state: RwLock<State>,
    /// Hand out users without links (store-side degraded creation)
    detached_users: bool,
    /// Fail every call as if the store were unreachable
    unavailable: AtomicBool,
}

impl Default for InMemoryPermissionStore {
    fn default() -> Self {
        Self::new(AccessKey::new("in-memory-store-key"))
    }
}

impl InMemoryPermissionStore {
    pub fn new(key: AccessKey) -> Self {
        Self {
            key,
            state: RwLock::new(State::default()),
            detached_users: false,
            unavailable: AtomicBool::new(false),
        }
    }

    /// Created users come back without a self link or permissions link
    pub fn detached_users(mut self) -> Self {
        self.detached_users = true;
        self
    }

    /// Simulate an outage (or recovery)
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of users
    pub fn user_count(&self) -> usize {
        self.state.read().users.len()
    }

    /// Number of permissions across all users
    pub fn permission_count(&self) -> usize {
        self.state
            .read()
            .users
            .values()
            .map(|r| r.permissions.len())
            .sum()
    }

    fn check_available(&self) -> Result<(), StorageError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable(
                "in-memory store marked unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl PermissionStore for InMemoryPermissionStore {
    async fn resolve_collection(
        &self,
        database_id: &str,
        collection_id: &str,
    ) -> Result<Locator, StorageError> {
        self.check_available()?;

        let link = Locator::collection(database_id, collection_id);
        if self.state.read().collections.contains(&link) {
            Ok(link)
        } else {
            Err(StorageError::NotFound(format!(
                "Collection not found: {}",
                link
            )))
        }
    }

    async fn read_user(
        &self,
        database_id: &str,
        user_id: &str,
    ) -> Result<UserLookup, StorageError> {
        self.check_available()?;

        let state = self.state.read();
        match state.users.get(&Locator::user(database_id, user_id)) {
            Some(record) => Ok(UserLookup::Found(record.user.clone())),
            None => Ok(UserLookup::NotFound),
        }
    }

    async fn create_user(&self, database_id: &str, user_id: &str) -> Result<User, StorageError> {
        self.check_available()?;

        let key = Locator::user(database_id, user_id);
        let mut state = self.state.write();

        if state.users.contains_key(&key) {
            return Err(StorageError::Conflict(format!("User already exists: {}", key)));
        }

        let user = if self.detached_users {
            User::detached(user_id)
        } else {
            User::new(database_id, user_id)
        };

        state.users.insert(
            key,
            UserRecord {
                user: user.clone(),
                permissions: Vec::new(),
            },
        );

        debug!(user_id = %user_id, "Created user");
        Ok(user)
    }

    async fn create_permission(
        &self,
        user_link: &Locator,
        permission: NewPermission,
    ) -> Result<Permission, StorageError> {
        self.check_available()?;

        let mut state = self.state.write();
        let record = state
            .users
            .get_mut(user_link)
            .ok_or_else(|| StorageError::NotFound(format!("User not found: {}", user_link)))?;

        if record.permissions.iter().any(|p| p.id == permission.id) {
            return Err(StorageError::Conflict(format!(
                "Permission {} already exists for {}",
                permission.id, user_link
            )));
        }

        let claims = TokenClaims::new(
            record.user.id.clone(),
            permission.id,
            permission.resource_link.as_str(),
            permission.mode,
        );
        let token = ResourceToken::mint(&claims, &self.key)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        let created = Permission {
            id: permission.id,
            resource_link: permission.resource_link,
            mode: permission.mode,
            token,
        };
        record.permissions.push(created.clone());

        debug!(user = %user_link, permission_id = %created.id, "Created permission");
        Ok(created)
    }

    async fn list_permissions(
        &self,
        permissions_link: &Locator,
    ) -> Result<Vec<Permission>, StorageError> {
        self.check_available()?;

        let user_link = permissions_link.owning_user().ok_or_else(|| {
            StorageError::NotFound(format!("Not a permissions feed: {}", permissions_link))
        })?;

        let state = self.state.read();
        match state.users.get(&user_link) {
            Some(record) => Ok(record.permissions.clone()),
            None => Err(StorageError::NotFound(format!(
                "User not found: {}",
                user_link
            ))),
        }
    }

    async fn create_collection(
        &self,
        database_id: &str,
        collection_id: &str,
    ) -> Result<Locator, StorageError> {
        self.check_available()?;

        let link = Locator::collection(database_id, collection_id);
        self.state.write().collections.insert(link.clone());
        Ok(link)
    }
}
