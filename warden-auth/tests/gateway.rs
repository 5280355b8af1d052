//! Authorization checks against a local mock of the remote API

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json, Router,
};
use chrono::{Duration, Utc};
use serde_json::json;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use warden_auth::{
    AuthorizationGateway, OrganizationPermission, PermissionBindings, ProjectPermission,
    RouteParams,
};
use warden_core::{Diagnostic, HttpConfig, RecordingSink, WardenConfig};
use warden_session::{Identity, MemorySlot, Session, SessionCache, SessionStore};

#[derive(Debug, Clone)]
struct Hit {
    path: String,
    authorization: Option<String>,
}

#[derive(Default)]
struct MockApi {
    hits: Mutex<Vec<Hit>>,
}

/// Answers by the scope id: `boom` fails, `garbled` sends a non-JSON body,
/// `slow` stalls, `denied` refuses, anything else allows.
async fn allowed(State(api): State<Arc<MockApi>>, uri: Uri, headers: HeaderMap) -> Response {
    let path = uri.path().to_string();
    api.hits.lock().unwrap().push(Hit {
        path: path.clone(),
        authorization: headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string),
    });

    if path.contains("/boom/") {
        (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").into_response()
    } else if path.contains("/garbled/") {
        (StatusCode::OK, "<html>not json</html>").into_response()
    } else if path.contains("/slow/") {
        tokio::time::sleep(std::time::Duration::from_secs(3)).await;
        Json(json!({ "allowed": true })).into_response()
    } else if path.contains("/denied/") {
        Json(json!({ "allowed": false })).into_response()
    } else {
        Json(json!({ "allowed": true })).into_response()
    }
}

struct TestApi {
    address: String,
    api: Arc<MockApi>,
}

impl TestApi {
    async fn spawn() -> Self {
        let api = Arc::new(MockApi::default());
        let app = Router::new().fallback(allowed).with_state(api.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind random port");
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            address: format!("http://127.0.0.1:{}", port),
            api,
        }
    }

    fn hits(&self) -> Vec<Hit> {
        self.api.hits.lock().unwrap().clone()
    }
}

fn identity(admin: bool) -> Identity {
    Identity {
        id: "u1".to_string(),
        name: "Alice".to_string(),
        slug: "alice".to_string(),
        email: "a@x.com".to_string(),
        admin,
        locked: false,
    }
}

fn cache_with(session: Option<Session>, sink: Arc<RecordingSink>) -> Arc<SessionCache> {
    let cache = SessionCache::new(SessionStore::new(Arc::new(MemorySlot::new()), sink));
    if let Some(session) = session {
        assert!(cache.login(session));
    }
    Arc::new(cache)
}

fn logged_in(admin: bool) -> Session {
    let now = Utc::now();
    Session::new(identity(admin), "T", now, now + Duration::hours(1))
}

fn gateway(
    session: Option<Session>,
    http: HttpConfig,
) -> (AuthorizationGateway, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::new());
    let cache = cache_with(session, sink.clone());
    let gateway = AuthorizationGateway::new(&http, cache, sink.clone()).unwrap();
    (gateway, sink)
}

#[tokio::test]
async fn project_edit_is_allowed_with_bearer_token() {
    let api = TestApi::spawn().await;
    let (gateway, sink) = gateway(Some(logged_in(false)), HttpConfig::default());

    let params = RouteParams::new().with_project("p1");
    assert!(
        gateway
            .check_project(&api.address, Some(&params), ProjectPermission::Edit)
            .await
    );

    let hits = api.hits();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].path, "/v0/projects/p1/allowed/edit");
    assert_eq!(hits[0].authorization.as_deref(), Some("Bearer T"));
    assert!(sink.is_empty());
}

#[tokio::test]
async fn explicit_refusal_is_not_reported() {
    let api = TestApi::spawn().await;
    let (gateway, sink) = gateway(Some(logged_in(false)), HttpConfig::default());

    let params = RouteParams::new().with_organization("denied");
    assert!(
        !gateway
            .check_organization(&api.address, Some(&params), OrganizationPermission::Manage)
            .await
    );
    assert_eq!(api.hits().len(), 1);
    assert!(sink.is_empty());
}

#[tokio::test]
async fn server_error_is_false_and_reported_once() {
    let api = TestApi::spawn().await;
    let (gateway, sink) = gateway(Some(logged_in(false)), HttpConfig::default());

    let params = RouteParams::new().with_project("boom");
    assert!(
        !gateway
            .check_project(&api.address, Some(&params), ProjectPermission::Delete)
            .await
    );

    let reports = sink.reports();
    assert_eq!(reports.len(), 1);
    assert!(matches!(&reports[0], Diagnostic::Error(text) if text.contains("500")));
}

#[tokio::test]
async fn malformed_body_is_false() {
    let api = TestApi::spawn().await;
    let (gateway, sink) = gateway(Some(logged_in(false)), HttpConfig::default());

    let params = RouteParams::new().with_project("garbled");
    assert!(
        !gateway
            .check_project(&api.address, Some(&params), ProjectPermission::Manage)
            .await
    );
    assert_eq!(sink.len(), 1);
}

#[tokio::test]
async fn slow_remote_times_out_to_false() {
    let api = TestApi::spawn().await;
    let http = HttpConfig {
        timeout_seconds: 1,
        ..Default::default()
    };
    let (gateway, sink) = gateway(Some(logged_in(false)), http);

    let params = RouteParams::new().with_project("slow");
    let started = std::time::Instant::now();
    assert!(
        !gateway
            .check_project(&api.address, Some(&params), ProjectPermission::Edit)
            .await
    );
    assert!(started.elapsed() < std::time::Duration::from_secs(3));
    assert_eq!(sink.len(), 1);
}

#[tokio::test]
async fn anonymous_session_makes_no_request() {
    let api = TestApi::spawn().await;
    let (gateway, sink) = gateway(None, HttpConfig::default());

    let params = RouteParams::new().with_project("p1");
    assert!(
        !gateway
            .check_project(&api.address, Some(&params), ProjectPermission::Edit)
            .await
    );
    assert!(!gateway.is_allowed(&api.address, "/v0/projects/p1/allowed/edit").await);
    assert!(api.hits().is_empty());
    assert!(sink.is_empty());
}

#[tokio::test]
async fn missing_scope_makes_no_request() {
    let api = TestApi::spawn().await;
    let (gateway, sink) = gateway(Some(logged_in(false)), HttpConfig::default());

    assert!(
        !gateway
            .check_project(&api.address, None, ProjectPermission::Edit)
            .await
    );
    let org_only = RouteParams::new().with_organization("acme").with_project("");
    assert!(
        !gateway
            .check_project(&api.address, Some(&org_only), ProjectPermission::Edit)
            .await
    );
    assert!(api.hits().is_empty());
    assert!(sink.is_empty());
}

#[tokio::test]
async fn scope_ids_are_percent_encoded() {
    let api = TestApi::spawn().await;
    let (gateway, _sink) = gateway(Some(logged_in(false)), HttpConfig::default());

    let params = RouteParams::new().with_organization("acme corp");
    assert!(
        gateway
            .check_organization(
                &format!("{}/", api.address),
                Some(&params),
                OrganizationPermission::DeleteRole
            )
            .await
    );
    assert_eq!(
        api.hits()[0].path,
        "/v0/organizations/acme%20corp/allowed/delete_role"
    );
}

#[tokio::test]
async fn unreachable_api_is_false() {
    let (gateway, sink) = gateway(Some(logged_in(false)), HttpConfig::default());

    let params = RouteParams::new().with_project("p1");
    assert!(
        !gateway
            .check_project("not a url", Some(&params), ProjectPermission::Edit)
            .await
    );
    assert_eq!(sink.len(), 1);
}

#[tokio::test]
async fn bindings_route_to_the_right_endpoints() {
    let api = TestApi::spawn().await;
    let sink = Arc::new(RecordingSink::new());
    let config = WardenConfig {
        api_url: api.address.clone(),
        ..Default::default()
    };
    let bindings = PermissionBindings::from_config(
        &config,
        cache_with(Some(logged_in(false)), sink.clone()),
        sink.clone(),
    )
    .unwrap();

    let params = RouteParams::new()
        .with_organization("acme")
        .with_project("p1");
    assert!(bindings.can_invite_organization(Some(&params)).await);
    assert!(bindings.can_delete_organization_role(Some(&params)).await);
    assert!(bindings.can_create_project(Some(&params)).await);
    assert!(!bindings.can_manage_project(None).await);

    let paths: Vec<String> = api.hits().into_iter().map(|hit| hit.path).collect();
    assert_eq!(
        paths,
        vec![
            "/v0/organizations/acme/allowed/invite",
            "/v0/organizations/acme/allowed/delete_role",
            "/v0/projects/p1/allowed/create",
        ]
    );
}

#[tokio::test]
async fn same_user_is_local() {
    let api = TestApi::spawn().await;
    let (gateway, _sink) = gateway(Some(logged_in(false)), HttpConfig::default());

    assert!(gateway.is_same_user(Some(&RouteParams::new().with_user("alice"))));
    assert!(gateway.is_same_user(Some(&RouteParams::new().with_user("u1"))));
    assert!(!gateway.is_same_user(Some(&RouteParams::new().with_user("bob"))));
    assert!(!gateway.is_same_user(Some(&RouteParams::new().with_user(""))));
    assert!(!gateway.is_same_user(None));

    let (admin, _sink) = gateway_for_admin();
    assert!(admin.is_same_user(Some(&RouteParams::new().with_user("bob"))));
    assert!(admin.is_same_user(None));

    assert!(api.hits().is_empty());
}

fn gateway_for_admin() -> (AuthorizationGateway, Arc<RecordingSink>) {
    gateway(Some(logged_in(true)), HttpConfig::default())
}
