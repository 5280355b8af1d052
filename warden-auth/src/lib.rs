//! Warden Auth - remote, permission-scoped authorization checks
//!
//! Every check asks the API at `/v0/{organizations|projects}/{id}/allowed/{permission}`
//! with the current session's bearer token. Anything short of a well-formed
//! `{"allowed": true}` answer means "not allowed".

pub mod bindings;
pub mod gateway;
pub mod permission;
pub mod scope;

pub use bindings::PermissionBindings;
pub use gateway::{allowed_path, AuthorizationError, AuthorizationGateway, JsonAllowed};
pub use permission::{
    OrganizationPermission, ProjectPermission, ScopeKind, ScopedPermission, UnknownPermission,
};
pub use scope::RouteParams;
