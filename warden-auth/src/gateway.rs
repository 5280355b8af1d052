//! Authorization Gateway
//!
//! Asks the remote API whether the current session may perform a permission in
//! an organization or project. Decisions are never cached: every check is a
//! fresh round trip, and every failure collapses to `false`.

use crate::permission::{OrganizationPermission, ProjectPermission, ScopeKind, ScopedPermission};
use crate::scope::RouteParams;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};
use warden_core::{DiagnosticSink, ErrorContext, HttpConfig, WardenError, WardenResult};
use warden_session::SessionCache;

/// Why a round trip produced no decision
#[derive(Debug, Error)]
pub enum AuthorizationError {
    #[error("Invalid authorization URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Authorization request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("Authorization check returned HTTP {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Malformed authorization response: {0}")]
    Decode(#[source] reqwest::Error),
}

/// Response body of the allowed endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct JsonAllowed {
    pub allowed: bool,
}

/// Remote path for one check, e.g. `/v0/projects/p1/allowed/edit`
pub fn allowed_path(kind: ScopeKind, id: &str, permission: &str) -> String {
    format!(
        "/v0/{}/{}/allowed/{}",
        kind.path_segment(),
        urlencoding::encode(id),
        permission
    )
}

pub struct AuthorizationGateway {
    client: reqwest::Client,
    session: Arc<SessionCache>,
    sink: Arc<dyn DiagnosticSink>,
}

impl AuthorizationGateway {
    pub fn new(
        http: &HttpConfig,
        session: Arc<SessionCache>,
        sink: Arc<dyn DiagnosticSink>,
    ) -> WardenResult<Self> {
        Ok(Self {
            client: create_http_client(http)?,
            session,
            sink,
        })
    }

    pub fn session(&self) -> &Arc<SessionCache> {
        &self.session
    }

    /// Whether the current session holds `permission` in the scope `scope_id`.
    ///
    /// A missing scope id or an anonymous session answers `false` without any
    /// network traffic.
    pub async fn check<P: ScopedPermission>(
        &self,
        api_url: &str,
        scope_id: Option<&str>,
        permission: P,
    ) -> bool {
        let Some(id) = scope_id.filter(|id| !id.is_empty()) else {
            debug!(scope = %P::KIND, %permission, "No scope id; not allowed");
            return false;
        };
        self.is_allowed(api_url, &allowed_path(P::KIND, id, permission.as_str()))
            .await
    }

    pub async fn check_organization(
        &self,
        api_url: &str,
        params: Option<&RouteParams>,
        permission: OrganizationPermission,
    ) -> bool {
        self.check(api_url, params.and_then(RouteParams::organization), permission)
            .await
    }

    pub async fn check_project(
        &self,
        api_url: &str,
        params: Option<&RouteParams>,
        permission: ProjectPermission,
    ) -> bool {
        self.check(api_url, params.and_then(RouteParams::project), permission)
            .await
    }

    /// GET `api_url` + `path` with the session's bearer token and read `allowed`
    pub async fn is_allowed(&self, api_url: &str, path: &str) -> bool {
        let token = self.session.token();
        if token.is_empty() {
            debug!(path, "Anonymous session; not allowed");
            return false;
        }

        match self.request_allowed(api_url, path, &token).await {
            Ok(allowed) => {
                debug!(path, allowed, "Authorization decision");
                allowed
            }
            Err(e) => {
                warn!(path, error = %e, "Authorization check failed");
                self.sink.capture_error(&e);
                false
            }
        }
    }

    /// Local check: the route's user is the session's user, or the session is an admin
    pub fn is_same_user(&self, params: Option<&RouteParams>) -> bool {
        let reference = params.and_then(RouteParams::user);
        self.session.with_current(|session| {
            session.identity.admin
                || reference.is_some_and(|user| {
                    user == session.identity.id || user == session.identity.slug
                })
        })
    }

    async fn request_allowed(
        &self,
        api_url: &str,
        path: &str,
        token: &str,
    ) -> Result<bool, AuthorizationError> {
        let url = format!(
            "{}/{}",
            api_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        let url = url::Url::parse(&url)
            .map_err(|source| AuthorizationError::InvalidUrl { url, source })?;

        let response = self
            .client
            .get(url.clone())
            .bearer_auth(token)
            .send()
            .await
            .map_err(AuthorizationError::Request)?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthorizationError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body: JsonAllowed = response.json().await.map_err(AuthorizationError::Decode)?;
        Ok(body.allowed)
    }
}

/// HTTP client with the configured user agent and request timeout
pub(crate) fn create_http_client(config: &HttpConfig) -> WardenResult<reqwest::Client> {
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        reqwest::header::USER_AGENT,
        reqwest::header::HeaderValue::from_str(&config.user_agent).map_err(|e| {
            WardenError::Config {
                message: format!("Invalid user agent: {}", e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("http_client").with_operation("create_client"),
            }
        })?,
    );

    reqwest::Client::builder()
        .timeout(config.timeout())
        .default_headers(headers)
        .build()
        .map_err(|e| WardenError::Network {
            message: format!("Failed to create HTTP client: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("http_client").with_operation("create_client"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_shape() {
        assert_eq!(
            allowed_path(ScopeKind::Project, "p1", "edit"),
            "/v0/projects/p1/allowed/edit"
        );
        assert_eq!(
            allowed_path(ScopeKind::Organization, "acme corp/", "delete_role"),
            "/v0/organizations/acme%20corp%2F/allowed/delete_role"
        );
    }

    #[test]
    fn rejects_unusable_user_agent() {
        let config = HttpConfig {
            user_agent: "bad\nagent".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            create_http_client(&config),
            Err(WardenError::Config { .. })
        ));
        assert!(create_http_client(&HttpConfig::default()).is_ok());
    }
}
