//! Request gate: 401 for authentication failures, 403 for missing permissions
#![cfg(feature = "server")]

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::routing::get;
use axum::{middleware, Json, Router};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use assetgate::api_error::ApiError;
use assetgate::gate::{authenticate, AuthContext, Gate, PermissionSource, RequirePermission};
use assetgate::{CredentialStore, Identity, IdentityStatus, LmdbStore, NewIdentity, PermissionSet, TokenCodec};

const SECRET: &str = "gate-test-secret-0123456789abcdef";
const OTHER_SECRET: &str = "some-other-secret-0123456789abcdef";

struct Harness {
    _dir: TempDir,
    store: Arc<LmdbStore>,
    codec: TokenCodec,
    app: Router,
}

async fn whoami(ctx: AuthContext) -> Json<Value> {
    Json(json!({ "id": ctx.identity_id, "permissions": ctx.permissions }))
}

async fn missing_thing() -> Result<Json<Value>, ApiError> {
    Err(ApiError::NotFound("System not found".into()))
}

fn harness_with(codec: TokenCodec, source: PermissionSource) -> Harness {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(LmdbStore::open(dir.path()).unwrap());
    let dyn_store: Arc<dyn CredentialStore> = store.clone();
    let gate = Gate::new(codec.clone(), dyn_store, source);

    let app = Router::new()
        .route("/open", get(whoami))
        .route("/users", get(whoami).route_layer(RequirePermission::one("view_users")))
        .route("/systems/:id", get(missing_thing).route_layer(RequirePermission::one("view_systems")))
        .route("/faults", get(whoami).route_layer(RequirePermission::any_of(["view_faults", "edit_faults"])))
        .route("/roles", get(whoami).route_layer(RequirePermission::all_of(["edit_roles", "delete_roles"])))
        .route_layer(middleware::from_fn_with_state(gate, authenticate));

    Harness { _dir: dir, store, codec, app }
}

fn harness() -> Harness {
    harness_with(TokenCodec::new(SECRET, 3600).unwrap(), PermissionSource::Token)
}

impl Harness {
    fn identity(&self, mobile: &str, permissions: &[&str]) -> Identity {
        self.store
            .create_identity(NewIdentity {
                name: "Gate Tester".into(),
                email: format!("{}@example.com", mobile),
                mobile_no: mobile.into(),
                secret_hash: String::new(),
                status: IdentityStatus::Active,
                permissions: permissions.iter().copied().collect(),
            })
            .unwrap()
    }

    fn token_for(&self, mobile: &str, permissions: &[&str]) -> String {
        let identity = self.identity(mobile, permissions);
        self.codec.issue(&identity).unwrap()
    }

    async fn get(&self, uri: &str, authorization: Option<&str>) -> (StatusCode, Value) {
        let mut req = Request::builder().uri(uri);
        if let Some(a) = authorization {
            req = req.header(header::AUTHORIZATION, a);
        }
        let resp = self.app.clone().oneshot(req.body(Body::empty()).unwrap()).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, body)
    }
}

fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

fn now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs()
}

#[tokio::test]
async fn missing_token_is_401() {
    let h = harness();
    let (status, body) = h.get("/open", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "No token provided");

    let (status, _) = h.get("/open", Some("Bearer ")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn garbage_or_foreign_token_is_401() {
    let h = harness();
    let (status, body) = h.get("/open", Some("Bearer not.a.token")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid token");

    let identity = h.identity("9000000001", &["*"]);
    let foreign = TokenCodec::new(OTHER_SECRET, 3600).unwrap().issue(&identity).unwrap();
    let (status, _) = h.get("/users", Some(&bearer(&foreign))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = h.get("/open", Some("Basic dXNlcjpwYXNz")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn expired_token_is_401() {
    let h = harness();
    let identity = h.identity("9000000001", &["*"]);
    let token = h.codec.issue_at(&identity, now() - 7200).unwrap();
    let (status, body) = h.get("/users", Some(&bearer(&token))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Token expired");
}

#[tokio::test]
async fn disabled_codec_rejects_everything() {
    let h = harness_with(TokenCodec::disabled(3600), PermissionSource::Token);
    let identity = h.identity("9000000001", &["*"]);
    let token = TokenCodec::new(SECRET, 3600).unwrap().issue(&identity).unwrap();
    let (status, _) = h.get("/open", Some(&bearer(&token))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn valid_token_attaches_context() {
    let h = harness();
    let token = h.token_for("9000000001", &["view_faults"]);
    let (status, body) = h.get("/open", Some(&bearer(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["permissions"], json!(["view_faults"]));
}

#[tokio::test]
async fn token_without_bearer_scheme_is_401() {
    let h = harness();
    let token = h.token_for("9000000001", &["*"]);
    let (status, body) = h.get("/open", Some(&token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid token");
}

#[tokio::test]
async fn missing_permission_is_403_naming_it() {
    let h = harness();
    let token = h.token_for("9000000001", &["view_faults"]);
    let (status, body) = h.get("/users", Some(&bearer(&token))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["missing"], json!(["view_users"]));
}

#[tokio::test]
async fn held_or_wildcard_permission_passes() {
    let h = harness();
    let viewer = h.token_for("9000000001", &["view_users"]);
    let admin = h.token_for("9000000002", &["*"]);
    assert_eq!(h.get("/users", Some(&bearer(&viewer))).await.0, StatusCode::OK);
    assert_eq!(h.get("/users", Some(&bearer(&admin))).await.0, StatusCode::OK);
    assert_eq!(h.get("/roles", Some(&bearer(&admin))).await.0, StatusCode::OK);
}

#[tokio::test]
async fn denial_precedes_not_found() {
    let h = harness();
    let token = h.token_for("9000000001", &["view_faults"]);
    assert_eq!(h.get("/systems/17", Some(&bearer(&token))).await.0, StatusCode::FORBIDDEN);

    let viewer = h.token_for("9000000002", &["view_systems"]);
    assert_eq!(h.get("/systems/17", Some(&bearer(&viewer))).await.0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn any_of_and_all_of_requirements() {
    let h = harness();
    let editor = h.token_for("9000000001", &["edit_faults", "edit_roles"]);
    assert_eq!(h.get("/faults", Some(&bearer(&editor))).await.0, StatusCode::OK);

    let (status, body) = h.get("/roles", Some(&bearer(&editor))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["missing"], json!(["delete_roles"]));

    let nobody = h.token_for("9000000002", &[]);
    assert_eq!(h.get("/faults", Some(&bearer(&nobody))).await.0, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn store_source_sees_revocation_immediately() {
    let h = harness_with(TokenCodec::new(SECRET, 3600).unwrap(), PermissionSource::Store);
    let identity = h.identity("9000000001", &["view_users"]);
    let token = h.codec.issue(&identity).unwrap();
    assert_eq!(h.get("/users", Some(&bearer(&token))).await.0, StatusCode::OK);

    h.store.update_permissions(identity.id, &PermissionSet::new()).unwrap();
    assert_eq!(h.get("/users", Some(&bearer(&token))).await.0, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn token_source_trusts_snapshot_until_expiry() {
    let h = harness();
    let identity = h.identity("9000000001", &["view_users"]);
    let token = h.codec.issue(&identity).unwrap();
    h.store.update_permissions(identity.id, &PermissionSet::new()).unwrap();
    assert_eq!(h.get("/users", Some(&bearer(&token))).await.0, StatusCode::OK);
}

#[tokio::test]
async fn token_without_snapshot_reads_store() {
    let codec = TokenCodec::new(SECRET, 3600).unwrap().with_permission_snapshot(false);
    let h = harness_with(codec, PermissionSource::Token);
    let token = h.token_for("9000000001", &["view_users"]);
    assert_eq!(h.get("/users", Some(&bearer(&token))).await.0, StatusCode::OK);
}

#[tokio::test]
async fn token_for_unknown_identity_is_401_when_reading_store() {
    let h = harness_with(TokenCodec::new(SECRET, 3600).unwrap(), PermissionSource::Store);
    let ghost = Identity {
        id: 4040,
        name: "Ghost".into(),
        email: "ghost@example.com".into(),
        mobile_no: "9000000404".into(),
        secret_hash: String::new(),
        image_url: None,
        status: IdentityStatus::Active,
        permissions: PermissionSet::wildcard(),
        created_at: 0,
        updated_at: 0,
    };
    let token = h.codec.issue(&ghost).unwrap();
    assert_eq!(h.get("/open", Some(&bearer(&token))).await.0, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn store_source_refuses_suspended_identity() {
    let h = harness_with(TokenCodec::new(SECRET, 3600).unwrap(), PermissionSource::Store);
    let identity = h.identity("9000000001", &["view_users"]);
    let token = h.codec.issue(&identity).unwrap();
    assert_eq!(h.get("/users", Some(&bearer(&token))).await.0, StatusCode::OK);

    h.store.update_status(identity.id, IdentityStatus::Suspended).unwrap();
    let (status, body) = h.get("/users", Some(&bearer(&token))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].as_str().unwrap().contains("suspended"));
}
