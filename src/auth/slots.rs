//! Permission slots and access modes

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// User id shared by every unauthenticated caller
pub const ANONYMOUS_USER_ID: &str = "anonymous_user";

/// Logical role a permission record plays for its user
///
/// A user holds at most one permission per slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionSlot {
    /// Read access handed to the shared anonymous user
    AnonymousRead,
    /// Personal read access for an authenticated user
    UserRead,
    /// Personal read+write access for an authenticated user
    UserWrite,
}

impl PermissionSlot {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionSlot::AnonymousRead => "anonymous_read",
            PermissionSlot::UserRead => "user_read",
            PermissionSlot::UserWrite => "user_write",
        }
    }

    /// Parse a slot id as stored and exchanged on the wire
    pub fn parse(s: &str) -> Option<PermissionSlot> {
        match s.to_lowercase().as_str() {
            "anonymous_read" => Some(PermissionSlot::AnonymousRead),
            "user_read" => Some(PermissionSlot::UserRead),
            "user_write" => Some(PermissionSlot::UserWrite),
            _ => None,
        }
    }
}

impl fmt::Display for PermissionSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionSlot {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PermissionSlot::parse(s).ok_or_else(|| {
            format!(
                "Invalid slot: '{}'. Must be: anonymous_read, user_read, or user_write",
                s
            )
        })
    }
}

/// Access level encoded in a permission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionMode {
    /// Read documents in the collection
    Read,
    /// Read and write documents in the collection
    All,
}

impl PermissionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionMode::Read => "read",
            PermissionMode::All => "all",
        }
    }

    pub fn parse(s: &str) -> Option<PermissionMode> {
        match s.to_lowercase().as_str() {
            "read" => Some(PermissionMode::Read),
            "all" => Some(PermissionMode::All),
            _ => None,
        }
    }
}

impl fmt::Display for PermissionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PermissionMode::parse(s)
            .ok_or_else(|| format!("Invalid mode: '{}'. Must be: read or all", s))
    }
}
