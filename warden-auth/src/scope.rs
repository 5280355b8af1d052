//! Route parameters naming the organization, project or user a view is about

use crate::permission::ScopeKind;
use serde::{Deserialize, Serialize};

/// Identifiers (slug or uuid) taken from the current route. Empty strings count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteParams {
    pub organization: Option<String>,
    pub project: Option<String>,
    pub user: Option<String>,
}

impl RouteParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn organization(&self) -> Option<&str> {
        present(&self.organization)
    }

    pub fn project(&self) -> Option<&str> {
        present(&self.project)
    }

    pub fn user(&self) -> Option<&str> {
        present(&self.user)
    }

    pub fn scope_id(&self, kind: ScopeKind) -> Option<&str> {
        match kind {
            ScopeKind::Organization => self.organization(),
            ScopeKind::Project => self.project(),
        }
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.is_empty())
}
