//! Token issuance
//!
//! Maps (user, collection, slot, mode) to a permission record in the store
//! and returns its token. The first request for an unknown user provisions
//! the user and one permission; later requests only read.

use crate::auth::{PermissionMode, PermissionSlot, ResourceToken};
use crate::storage::{
    NewPermission, Permission, PermissionStore, StorageError, UserLookup, DEFAULT_DATABASE_ID,
};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum IssueError {
    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    #[error("invalid request: {0}")]
    InvalidRequest(&'static str),

    #[error(transparent)]
    Store(#[from] StorageError),
}

/// How a token is picked from a user's permission listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionRule {
    /// First permission in listing order, whatever its slot.
    ///
    /// A user holding several slots gets the token of whichever was created
    /// first, regardless of the slot requested.
    #[default]
    First,
    /// First permission whose id equals the requested slot
    MatchingSlot,
}

impl SelectionRule {
    pub fn parse(s: &str) -> Option<SelectionRule> {
        match s.to_lowercase().as_str() {
            "first" => Some(SelectionRule::First),
            "matching-slot" | "matching_slot" => Some(SelectionRule::MatchingSlot),
            _ => None,
        }
    }

    fn select(self, permissions: Vec<Permission>, slot: PermissionSlot) -> Option<Permission> {
        match self {
            SelectionRule::First => permissions.into_iter().next(),
            SelectionRule::MatchingSlot => permissions.into_iter().find(|p| p.id == slot),
        }
    }
}

impl fmt::Display for SelectionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionRule::First => write!(f, "first"),
            SelectionRule::MatchingSlot => write!(f, "matching-slot"),
        }
    }
}

impl FromStr for SelectionRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SelectionRule::parse(s).ok_or_else(|| {
            format!("Invalid selection rule: '{}'. Must be: first or matching-slot", s)
        })
    }
}

/// Issues collection tokens backed by a permission store
#[derive(Clone)]
pub struct TokenIssuer {
    store: Arc<dyn PermissionStore>,
    database_id: String,
    selection: SelectionRule,
}

impl TokenIssuer {
    pub fn new(store: Arc<dyn PermissionStore>) -> Self {
        Self {
            store,
            database_id: DEFAULT_DATABASE_ID.to_string(),
            selection: SelectionRule::default(),
        }
    }

    /// Use a database namespace other than the default
    pub fn with_database_id(mut self, database_id: impl Into<String>) -> Self {
        self.database_id = database_id.into();
        self
    }

    pub fn with_selection(mut self, selection: SelectionRule) -> Self {
        self.selection = selection;
        self
    }

    pub fn database_id(&self) -> &str {
        &self.database_id
    }

    pub fn selection(&self) -> SelectionRule {
        self.selection
    }

    /// Fetch (or on first use, provision) a token for `user_id` on `collection_id`
    ///
    /// `mode` only matters when the permission is created; an existing
    /// permission keeps the mode it was created with. Returns `Ok(None)` when
    /// the user ends up with no permissions at all.
    pub async fn issue_token(
        &self,
        user_id: &str,
        collection_id: &str,
        slot: PermissionSlot,
        mode: PermissionMode,
    ) -> Result<Option<ResourceToken>, IssueError> {
        if user_id.is_empty() {
            return Err(IssueError::InvalidRequest("user id is empty"));
        }
        if collection_id.is_empty() {
            return Err(IssueError::InvalidRequest("collection id is empty"));
        }

        let collection = match self
            .store
            .resolve_collection(&self.database_id, collection_id)
            .await
        {
            Ok(link) => link,
            Err(StorageError::NotFound(_)) => {
                return Err(IssueError::CollectionNotFound(collection_id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        let user = match self.store.read_user(&self.database_id, user_id).await? {
            UserLookup::Found(user) => user,
            UserLookup::NotFound => {
                info!(user_id = %user_id, "Did not find user, creating");

                let user = self.store.create_user(&self.database_id, user_id).await?;

                match &user.self_link {
                    Some(self_link) => {
                        let permission = NewPermission {
                            id: slot,
                            resource_link: collection.clone(),
                            mode,
                        };
                        self.store.create_permission(self_link, permission).await?;
                        debug!(
                            user_id = %user_id,
                            slot = %slot,
                            mode = %mode,
                            collection = %collection,
                            "Provisioned permission"
                        );
                    }
                    None => {
                        warn!(
                            user_id = %user_id,
                            "Created user has no self link, skipping permission"
                        );
                    }
                }

                user
            }
        };

        let permissions = match &user.permissions_link {
            Some(link) => self.store.list_permissions(link).await?,
            None => Vec::new(),
        };

        let selected = self.selection.select(permissions, slot);
        if selected.is_none() {
            debug!(user_id = %user_id, slot = %slot, "No permission to issue a token for");
        }

        Ok(selected.map(|p| p.token))
    }
}
