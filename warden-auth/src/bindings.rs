//! Named permission checks for views
//!
//! One method per question a view asks, each forwarding to the gateway with a
//! fixed scope kind and permission.

use crate::gateway::AuthorizationGateway;
use crate::permission::{OrganizationPermission, ProjectPermission};
use crate::scope::RouteParams;
use std::sync::Arc;
use warden_core::{DiagnosticSink, WardenConfig, WardenResult};
use warden_session::SessionCache;

macro_rules! permission_checks {
    ($($(#[$doc:meta])* $name:ident => $check:ident($permission:expr);)*) => {
        $(
            $(#[$doc])*
            pub async fn $name(&self, params: Option<&RouteParams>) -> bool {
                self.gateway.$check(&self.api_url, params, $permission).await
            }
        )*
    };
}

#[derive(Clone)]
pub struct PermissionBindings {
    gateway: Arc<AuthorizationGateway>,
    api_url: String,
}

impl PermissionBindings {
    pub fn new(gateway: Arc<AuthorizationGateway>, api_url: impl Into<String>) -> Self {
        Self {
            gateway,
            api_url: api_url.into(),
        }
    }

    pub fn from_config(
        config: &WardenConfig,
        session: Arc<SessionCache>,
        sink: Arc<dyn DiagnosticSink>,
    ) -> WardenResult<Self> {
        let gateway = AuthorizationGateway::new(&config.http, session, sink)?;
        Ok(Self::new(Arc::new(gateway), config.api_url.clone()))
    }

    pub fn gateway(&self) -> &Arc<AuthorizationGateway> {
        &self.gateway
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    permission_checks! {
        can_create_organization => check_organization(OrganizationPermission::Create);
        can_edit_organization => check_organization(OrganizationPermission::Edit);
        can_delete_organization => check_organization(OrganizationPermission::Delete);
        can_manage_organization => check_organization(OrganizationPermission::Manage);
        /// Remove a member's role in the organization
        can_delete_organization_role => check_organization(OrganizationPermission::DeleteRole);
        can_invite_organization => check_organization(OrganizationPermission::Invite);
        can_create_project => check_project(ProjectPermission::Create);
        can_edit_project => check_project(ProjectPermission::Edit);
        can_delete_project => check_project(ProjectPermission::Delete);
        can_manage_project => check_project(ProjectPermission::Manage);
    }

    /// Same user as the route, or an admin. Answered locally.
    pub fn is_same_user(&self, params: Option<&RouteParams>) -> bool {
        self.gateway.is_same_user(params)
    }
}
