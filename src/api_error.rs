//! HTTP mapping for every failure the API can surface

use axum::async_trait;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use serde_json::json;
use thiserror::Error;

use crate::error::{AuthError, DelegationError, PermissionDenied, StoreError};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Denied(#[from] PermissionDenied),
    #[error(transparent)]
    Delegation(#[from] DelegationError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{message}")]
    BadRequest { message: String, details: Vec<String> },
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest { message: message.into(), details: Vec::new() }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Auth(AuthError::SigningUnavailable) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Auth(AuthError::Hashing) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::Denied(_) => StatusCode::FORBIDDEN,
            Self::Delegation(e) => match e {
                DelegationError::UnknownPermission(_) | DelegationError::MalformedInput => StatusCode::BAD_REQUEST,
                DelegationError::SelfModification
                | DelegationError::WildcardNotDelegable
                | DelegationError::InsufficientDelegationRights(_) => StatusCode::FORBIDDEN,
                DelegationError::TargetNotFound => StatusCode::NOT_FOUND,
            },
            Self::Store(StoreError::Conflict(_)) => StatusCode::CONFLICT,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            Self::Denied(d) => json!({ "error": self.to_string(), "missing": d.missing }),
            Self::Delegation(DelegationError::UnknownPermission(bad)) => {
                json!({ "error": "Invalid permissions provided", "invalidPermissions": bad })
            }
            Self::BadRequest { message, details } if !details.is_empty() => {
                json!({ "error": message, "details": details })
            }
            Self::Store(e @ StoreError::Conflict(_)) => json!({ "error": e.to_string() }),
            Self::Store(e) => {
                tracing::error!(error = %e, "credential store failure");
                json!({ "error": "Internal server error" })
            }
            _ => json!({ "error": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

/// `Json` extractor whose rejections answer in the API's own error format
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError::BadRequest {
                message: "Invalid request data".into(),
                details: vec![rejection.body_text()],
            }),
        }
    }
}
