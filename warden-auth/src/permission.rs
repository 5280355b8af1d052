//! Permission System
//!
//! The fixed permission sets the remote service answers for, one per scope kind.
//! Each permission type knows its scope kind, so an organization permission can
//! never be checked against a project.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// What a permission is evaluated against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    Organization,
    Project,
}

impl ScopeKind {
    /// Collection segment of the remote path
    pub fn path_segment(&self) -> &'static str {
        match self {
            ScopeKind::Organization => "organizations",
            ScopeKind::Project => "projects",
        }
    }
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeKind::Organization => write!(f, "organization"),
            ScopeKind::Project => write!(f, "project"),
        }
    }
}

impl FromStr for ScopeKind {
    type Err = UnknownPermission;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "organization" | "organizations" | "org" => Ok(ScopeKind::Organization),
            "project" | "projects" => Ok(ScopeKind::Project),
            _ => Err(UnknownPermission(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown permission or scope: {0}")]
pub struct UnknownPermission(pub String);

/// A permission bound to the scope kind it is checked in
pub trait ScopedPermission: Copy + fmt::Display + Send + Sync {
    const KIND: ScopeKind;

    /// Wire name used in the remote path
    fn as_str(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrganizationPermission {
    Create,
    Edit,
    Delete,
    Manage,
    DeleteRole,
    Invite,
}

impl OrganizationPermission {
    pub const ALL: [OrganizationPermission; 6] = [
        OrganizationPermission::Create,
        OrganizationPermission::Edit,
        OrganizationPermission::Delete,
        OrganizationPermission::Manage,
        OrganizationPermission::DeleteRole,
        OrganizationPermission::Invite,
    ];
}

impl ScopedPermission for OrganizationPermission {
    const KIND: ScopeKind = ScopeKind::Organization;

    fn as_str(&self) -> &'static str {
        match self {
            OrganizationPermission::Create => "create",
            OrganizationPermission::Edit => "edit",
            OrganizationPermission::Delete => "delete",
            OrganizationPermission::Manage => "manage",
            OrganizationPermission::DeleteRole => "delete_role",
            OrganizationPermission::Invite => "invite",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectPermission {
    Create,
    Edit,
    Delete,
    Manage,
}

impl ProjectPermission {
    pub const ALL: [ProjectPermission; 4] = [
        ProjectPermission::Create,
        ProjectPermission::Edit,
        ProjectPermission::Delete,
        ProjectPermission::Manage,
    ];
}

impl ScopedPermission for ProjectPermission {
    const KIND: ScopeKind = ScopeKind::Project;

    fn as_str(&self) -> &'static str {
        match self {
            ProjectPermission::Create => "create",
            ProjectPermission::Edit => "edit",
            ProjectPermission::Delete => "delete",
            ProjectPermission::Manage => "manage",
        }
    }
}

impl fmt::Display for OrganizationPermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ProjectPermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrganizationPermission {
    type Err = UnknownPermission;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wire = normalize(s);
        Self::ALL
            .into_iter()
            .find(|permission| permission.as_str() == wire)
            .ok_or_else(|| UnknownPermission(s.to_string()))
    }
}

impl FromStr for ProjectPermission {
    type Err = UnknownPermission;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wire = normalize(s);
        Self::ALL
            .into_iter()
            .find(|permission| permission.as_str() == wire)
            .ok_or_else(|| UnknownPermission(s.to_string()))
    }
}

/// Accept `DeleteRole`, `delete-role`, `DELETE_ROLE` and `delete_role` alike
fn normalize(s: &str) -> String {
    let s = s.trim();
    if s.contains(['_', '-']) || !s.chars().any(|c| c.is_ascii_lowercase()) {
        return s.to_ascii_lowercase().replace('-', "_");
    }

    let mut wire = String::with_capacity(s.len() + 2);
    for (i, c) in s.chars().enumerate() {
        if c.is_ascii_uppercase() && i > 0 {
            wire.push('_');
        }
        wire.push(c.to_ascii_lowercase());
    }
    wire
}
