//! Caller identity as seen by the token endpoints
//!
//! Claim verification happens upstream; by the time a request reaches this
//! crate the caller is either anonymous or carries a verified user id.

use crate::auth::slots::{PermissionMode, PermissionSlot, ANONYMOUS_USER_ID};

/// Who is asking for a token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
    Anonymous,
    Authenticated(String),
}

impl Caller {
    /// Build from an optional verified user id; an empty id counts as anonymous.
    /// Any other id is opaque and kept byte for byte.
    pub fn from_user_id(user_id: Option<&str>) -> Self {
        match user_id {
            Some(id) if !id.is_empty() => Caller::Authenticated(id.to_string()),
            _ => Caller::Anonymous,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Caller::Authenticated(_))
    }

    /// User id, slot, and mode used for a read token
    pub fn read_grant(&self) -> (&str, PermissionSlot, PermissionMode) {
        match self {
            Caller::Authenticated(id) => {
                (id.as_str(), PermissionSlot::UserRead, PermissionMode::Read)
            }
            Caller::Anonymous => (
                ANONYMOUS_USER_ID,
                PermissionSlot::AnonymousRead,
                PermissionMode::Read,
            ),
        }
    }

    /// User id, slot, and mode used for a write token; anonymous callers get none
    pub fn write_grant(&self) -> Option<(&str, PermissionSlot, PermissionMode)> {
        match self {
            Caller::Authenticated(id) => {
                Some((id.as_str(), PermissionSlot::UserWrite, PermissionMode::All))
            }
            Caller::Anonymous => None,
        }
    }
}
