//! assetgate HTTP API
//!
//! Endpoints:
//!   GET    /health                   - Health check
//!   POST   /auth/login               - Exchange identifier + secret for a token
//!   POST   /auth/register            - Register an inactive identity
//!   GET    /permissions              - Grantable permission vocabulary
//!   GET    /users                    - List identities (view_users)
//!   GET    /users/me                 - Current identity
//!   GET    /users/me/permissions     - Current permission set
//!   PATCH  /users/permissions        - Replace another identity's permissions
//!   GET    /users/:id/permissions    - Permissions of an identity (view_users)
//!   PATCH  /users/:id/status         - Change an identity's status (edit_users)

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    middleware,
    routing::{get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api_error::{ApiError, ApiJson};
use crate::constants::{EDIT_USERS, VIEW_USERS};
use crate::delegation::can_delegate;
use crate::error::{AuthError, DelegationError};
use crate::gate::{authenticate, AuthContext, Gate, RequirePermission};
use crate::identity::{IdentityStatus, NewIdentity, PublicIdentity, Registration};
use crate::password::{hash_password, verify_password};
use crate::permissions::{PermissionInfo, PermissionSet};
use crate::store::CredentialStore;

// ============================================================================
// State
// ============================================================================

#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn CredentialStore>,
    gate: Gate,
}

impl AppState {
    pub fn new(store: Arc<dyn CredentialStore>, gate: Gate) -> Self {
        Self { store, gate }
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct LoginRequest {
    #[serde(alias = "mobile_no", alias = "mobileNo", alias = "email")]
    identifier: String,
    #[serde(alias = "password")]
    secret: String,
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    token: String,
    identity: PublicIdentity,
}

#[derive(Debug, Serialize)]
struct RegisterResponse {
    message: String,
    id: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PermissionsUpdated {
    success: bool,
    target_identifier: String,
    permissions: PermissionSet,
}

#[derive(Debug, Deserialize)]
struct StatusRequest {
    status: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusUpdated {
    success: bool,
    user_id: u64,
    status: IdentityStatus,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

// ============================================================================
// Handlers
// ============================================================================

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok".to_string(), version: env!("CARGO_PKG_VERSION").to_string() })
}

async fn login(State(state): State<AppState>, ApiJson(req): ApiJson<LoginRequest>) -> Result<Json<LoginResponse>, ApiError> {
    let identity = state.store.find_by_identifier(&req.identifier)?.ok_or(AuthError::InvalidCredentials)?;

    let hash = identity.secret_hash.clone();
    let valid = tokio::task::spawn_blocking(move || verify_password(&req.secret, &hash)).await.unwrap_or(false);
    if !valid {
        tracing::info!(identity_id = identity.id, "login rejected: bad credentials");
        return Err(AuthError::InvalidCredentials.into());
    }
    if identity.status != IdentityStatus::Active {
        tracing::info!(identity_id = identity.id, status = %identity.status, "login rejected: identity not active");
        return Err(AuthError::Inactive(identity.status).into());
    }

    let token = state.gate.codec().issue(&identity)?;
    tracing::info!(identity_id = identity.id, "login succeeded");
    Ok(Json(LoginResponse { token, identity: identity.public() }))
}

async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<Registration>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let problems = req.problems();
    if !problems.is_empty() {
        return Err(ApiError::BadRequest { message: "Invalid request data".into(), details: problems });
    }

    let password = req.password;
    let secret_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|_| AuthError::Hashing)??;

    let identity = state.store.create_identity(NewIdentity {
        name: req.name,
        email: req.email,
        mobile_no: req.mobile_no,
        secret_hash,
        status: IdentityStatus::Inactive,
        permissions: PermissionSet::new(),
    })?;
    tracing::info!(identity_id = identity.id, "registered new identity, awaiting activation");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse { message: "User Created Successfully".into(), id: identity.id }),
    ))
}

async fn list_permissions(State(state): State<AppState>) -> Result<Json<Vec<PermissionInfo>>, ApiError> {
    Ok(Json(state.store.vocabulary()?.entries()))
}

async fn list_users(State(state): State<AppState>, ctx: AuthContext) -> Result<Json<Vec<PublicIdentity>>, ApiError> {
    let users: Vec<_> = state.store.list_identities()?.iter().map(|i| i.public()).collect();
    tracing::debug!(identity_id = ctx.identity_id, count = users.len(), "listed identities");
    Ok(Json(users))
}

async fn me(State(state): State<AppState>, ctx: AuthContext) -> Result<Json<PublicIdentity>, ApiError> {
    let identity = state
        .store
        .find_by_id(ctx.identity_id)?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    Ok(Json(identity.public()))
}

async fn my_permissions(ctx: AuthContext) -> Json<PermissionSet> {
    Json(ctx.permissions)
}

async fn user_permissions(State(state): State<AppState>, Path(id): Path<u64>) -> Result<Json<PermissionSet>, ApiError> {
    let identity = state.store.find_by_id(id)?.ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    Ok(Json(identity.permissions))
}

/// Replace another identity's permission set with `permissionsToKeep`.
///
/// The granter's permissions are re-read from the store here, never taken
/// from the token snapshot. A granter who is no longer active cannot delegate.
async fn update_permissions(
    State(state): State<AppState>,
    ctx: AuthContext,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<PermissionsUpdated>, ApiError> {
    let Json(body) = body.map_err(|rejection| {
        tracing::debug!(identity_id = ctx.identity_id, reason = %rejection.body_text(), "unreadable delegation request");
        DelegationError::MalformedInput
    })?;
    let target_identifier = body
        .get("targetIdentifier")
        .or_else(|| body.get("userMobileNo"))
        .and_then(Value::as_str)
        .ok_or(DelegationError::MalformedInput)?
        .to_string();

    let granter = state.store.find_by_id(ctx.identity_id)?.ok_or(AuthError::InvalidToken)?;
    if granter.status != IdentityStatus::Active {
        tracing::warn!(identity_id = granter.id, status = %granter.status, "delegation attempt by non-active identity");
        return Err(ApiError::Forbidden(format!("Your account is {}", granter.status)));
    }
    if granter.is_identified_by(&target_identifier) {
        tracing::warn!(identity_id = granter.id, "attempt to update own permissions");
        return Err(DelegationError::SelfModification.into());
    }

    let target = state.store.find_by_identifier(&target_identifier)?.ok_or(DelegationError::TargetNotFound)?;
    let vocabulary = state.store.vocabulary()?;
    let requested = body.get("permissionsToKeep").unwrap_or(&Value::Null);

    let permissions = can_delegate(granter.id, &granter.permissions, target.id, requested, &vocabulary)
        .inspect_err(|e| tracing::info!(identity_id = granter.id, target_id = target.id, reason = %e, "delegation refused"))?;

    if !state.store.update_permissions(target.id, &permissions)? {
        return Err(DelegationError::TargetNotFound.into());
    }
    tracing::info!(
        identity_id = granter.id,
        target_id = target.id,
        permissions = ?permissions.to_vec(),
        "replaced permission set"
    );

    Ok(Json(PermissionsUpdated { success: true, target_identifier, permissions }))
}

async fn update_status(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<u64>,
    ApiJson(req): ApiJson<StatusRequest>,
) -> Result<Json<StatusUpdated>, ApiError> {
    if id == ctx.identity_id {
        tracing::warn!(identity_id = id, "attempt to change own status");
        return Err(ApiError::Forbidden("You cannot change your own status.".into()));
    }
    let status: IdentityStatus = req.status.parse().map_err(ApiError::bad_request)?;

    if !state.store.update_status(id, status)? {
        return Err(ApiError::NotFound("User to update not found".into()));
    }
    tracing::info!(identity_id = ctx.identity_id, target_id = id, %status, "updated identity status");
    Ok(Json(StatusUpdated { success: true, user_id: id, status }))
}

// ============================================================================
// Router
// ============================================================================

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/users", get(list_users).route_layer(RequirePermission::one(VIEW_USERS)))
        .route("/users/me", get(me))
        .route("/users/me/permissions", get(my_permissions))
        .route("/users/permissions", patch(update_permissions))
        .route("/users/:id/permissions", get(user_permissions).route_layer(RequirePermission::one(VIEW_USERS)))
        .route("/users/:id/status", patch(update_status).route_layer(RequirePermission::one(EDIT_USERS)))
        .route_layer(middleware::from_fn_with_state(state.gate.clone(), authenticate));

    Router::new()
        .route("/health", get(health))
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/permissions", get(list_permissions))
        .merge(protected)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
