//! Stand-in store for a service started without a usable store endpoint

use crate::storage::{
    Locator, NewPermission, Permission, PermissionStore, StorageError, User, UserLookup,
};
use async_trait::async_trait;

/// Fails every call with `StorageError::Unavailable` and the given reason
pub struct UnavailableStore {
    reason: String,
}

impl UnavailableStore {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    fn fail<T>(&self) -> Result<T, StorageError> {
        Err(StorageError::Unavailable(self.reason.clone()))
    }
}

#[async_trait]
impl PermissionStore for UnavailableStore {
    async fn resolve_collection(
        &self,
        _database_id: &str,
        _collection_id: &str,
    ) -> Result<Locator, StorageError> {
        self.fail()
    }

    async fn read_user(
        &self,
        _database_id: &str,
        _user_id: &str,
    ) -> Result<UserLookup, StorageError> {
        self.fail()
    }

    async fn create_user(&self, _database_id: &str, _user_id: &str) -> Result<User, StorageError> {
        self.fail()
    }

    async fn create_permission(
        &self,
        _user_link: &Locator,
        _permission: NewPermission,
    ) -> Result<Permission, StorageError> {
        self.fail()
    }

    async fn list_permissions(
        &self,
        _permissions_link: &Locator,
    ) -> Result<Vec<Permission>, StorageError> {
        self.fail()
    }

    async fn create_collection(
        &self,
        _database_id: &str,
        _collection_id: &str,
    ) -> Result<Locator, StorageError> {
        self.fail()
    }
}
