//! Request gate: authenticate, then authorize.
//!
//! [`authenticate`] runs as middleware over every protected route. It turns the
//! `Authorization` header into an [`AuthContext`] stored in request extensions,
//! or answers 401. [`RequirePermission`] is a per-route layer that evaluates a
//! [`Requirement`] against that context and answers 403 naming what is missing.
//! Because it wraps the handler, a denial always comes before any not-found the
//! handler could produce.
//!
//! ```ignore
//! Router::new()
//!     .route("/users", get(list_users).route_layer(RequirePermission::one(VIEW_USERS)))
//!     .route_layer(middleware::from_fn_with_state(gate, authenticate));
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::async_trait;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tower::{Layer, Service};

use crate::api_error::ApiError;
use crate::error::AuthError;
use crate::evaluator::Requirement;
use crate::identity::IdentityStatus;
use crate::permissions::PermissionSet;
use crate::store::CredentialStore;
use crate::token::{extract_bearer, fingerprint, TokenCodec};

/// Where the gate takes the requester's permissions from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum PermissionSource {
    /// Snapshot embedded in the token, falling back to the store if absent
    #[default]
    Token,
    /// Always re-read from the credential store. Non-active identities are refused.
    Store,
}

/// Authenticated requester, attached to the request by [`authenticate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub identity_id: u64,
    pub identifier: String,
    pub permissions: PermissionSet,
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AuthContext {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<AuthContext>().cloned().ok_or(ApiError::Auth(AuthError::NoToken))
    }
}

#[derive(Clone)]
pub struct Gate {
    codec: Arc<TokenCodec>,
    store: Arc<dyn CredentialStore>,
    source: PermissionSource,
}

impl Gate {
    pub fn new(codec: TokenCodec, store: Arc<dyn CredentialStore>, source: PermissionSource) -> Self {
        Self { codec: Arc::new(codec), store, source }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Resolve an `Authorization` header value to a requester
    pub fn authenticate(&self, header: Option<&str>) -> Result<AuthContext, ApiError> {
        let token = extract_bearer(header)?;
        let claims = self.codec.verify(token).inspect_err(|e| {
            tracing::debug!(token = %fingerprint(token), reason = %e, "token rejected");
        })?;

        let permissions = match (self.source, claims.permissions) {
            (PermissionSource::Token, Some(snapshot)) => snapshot,
            _ => match self.store.find_by_id(claims.sub)? {
                Some(identity) if identity.status != IdentityStatus::Active => {
                    tracing::info!(identity_id = claims.sub, status = %identity.status, "token refers to a non-active identity");
                    return Err(AuthError::Inactive(identity.status).into());
                }
                Some(identity) => identity.permissions,
                None => {
                    tracing::info!(identity_id = claims.sub, "token refers to an unknown identity");
                    return Err(AuthError::InvalidToken.into());
                }
            },
        };

        Ok(AuthContext { identity_id: claims.sub, identifier: claims.identifier, permissions })
    }
}

/// Authentication middleware; use with `middleware::from_fn_with_state`.
pub async fn authenticate(State(gate): State<Gate>, mut req: Request, next: Next) -> Response {
    let result = match req.headers().get(AUTHORIZATION) {
        None => gate.authenticate(None),
        Some(value) => match value.to_str() {
            Ok(header) => gate.authenticate(Some(header)),
            Err(_) => Err(AuthError::InvalidToken.into()),
        },
    };
    match result {
        Ok(ctx) => {
            req.extensions_mut().insert(ctx);
            next.run(req).await
        }
        Err(e) => e.into_response(),
    }
}

/// Route layer enforcing a [`Requirement`] on the authenticated requester
#[derive(Debug, Clone)]
pub struct RequirePermission {
    requirement: Arc<Requirement>,
}

impl RequirePermission {
    pub fn new(requirement: Requirement) -> Self {
        Self { requirement: Arc::new(requirement) }
    }

    pub fn one(permission: impl Into<String>) -> Self {
        Self::new(Requirement::one(permission))
    }

    pub fn any_of<S: Into<String>>(permissions: impl IntoIterator<Item = S>) -> Self {
        Self::new(Requirement::any_of(permissions))
    }

    pub fn all_of<S: Into<String>>(permissions: impl IntoIterator<Item = S>) -> Self {
        Self::new(Requirement::all_of(permissions))
    }
}

impl<S> Layer<S> for RequirePermission {
    type Service = RequirePermissionService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequirePermissionService { inner, requirement: self.requirement.clone() }
    }
}

#[derive(Debug, Clone)]
pub struct RequirePermissionService<S> {
    inner: S,
    requirement: Arc<Requirement>,
}

impl<S> Service<Request> for RequirePermissionService<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let decision = match req.extensions().get::<AuthContext>() {
            None => Err(ApiError::Auth(AuthError::NoToken)),
            Some(ctx) => self.requirement.check(&ctx.permissions).map_err(|denied| {
                tracing::info!(
                    identity_id = ctx.identity_id,
                    missing = ?denied.missing,
                    "authorization denied"
                );
                ApiError::Denied(denied)
            }),
        };
        match decision {
            Ok(()) => Box::pin(self.inner.call(req)),
            Err(e) => {
                let resp = e.into_response();
                Box::pin(async move { Ok(resp) })
            }
        }
    }
}
