//! Stateless session tokens
//!
//! HS256 JWTs binding one identity id, with an optional permission snapshot
//! taken at issue time. The snapshot goes stale as soon as permissions change,
//! so delegation never reads it.
//!
//! Without a signing secret the codec is disabled: every token is rejected and
//! nothing can be issued.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::constants::MIN_SECRET_LEN;
use crate::error::{AuthError, ConfigError};
use crate::identity::Identity;
use crate::permissions::PermissionSet;

/// Payload carried in a session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Identity id
    pub sub: u64,
    /// Mobile number the identity logged in with
    pub identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<PermissionSet>,
    pub iat: u64,
    pub exp: u64,
}

#[derive(Clone)]
struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

#[derive(Clone)]
pub struct TokenCodec {
    keys: Option<Keys>,
    ttl_secs: u64,
    embed_permissions: bool,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("enabled", &self.keys.is_some())
            .field("ttl_secs", &self.ttl_secs)
            .field("embed_permissions", &self.embed_permissions)
            .finish()
    }
}

fn now_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

impl TokenCodec {
    /// Codec signing with `secret`. Secrets shorter than 32 bytes are refused.
    pub fn new(secret: &str, ttl_secs: u64) -> Result<Self, ConfigError> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError(format!("JWT_SECRET must be at least {} characters", MIN_SECRET_LEN)));
        }
        Ok(Self {
            keys: Some(Keys {
                encoding: EncodingKey::from_secret(secret.as_bytes()),
                decoding: DecodingKey::from_secret(secret.as_bytes()),
            }),
            ttl_secs,
            embed_permissions: true,
        })
    }

    /// Codec that rejects every token and refuses to issue any
    pub fn disabled(ttl_secs: u64) -> Self {
        Self { keys: None, ttl_secs, embed_permissions: true }
    }

    /// `new` when a secret is present, `disabled` otherwise
    pub fn from_secret(secret: Option<&str>, ttl_secs: u64) -> Result<Self, ConfigError> {
        match secret {
            Some(s) => Self::new(s, ttl_secs),
            None => {
                tracing::warn!("no signing secret configured, all tokens will be rejected");
                Ok(Self::disabled(ttl_secs))
            }
        }
    }

    /// Whether issued tokens carry a permission snapshot
    pub fn with_permission_snapshot(mut self, embed: bool) -> Self {
        self.embed_permissions = embed;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.keys.is_some()
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    pub fn issue(&self, identity: &Identity) -> Result<String, AuthError> {
        self.issue_at(identity, now_secs())
    }

    /// Issue as if the current time were `issued_at` (seconds since the epoch)
    pub fn issue_at(&self, identity: &Identity, issued_at: u64) -> Result<String, AuthError> {
        let keys = self.keys.as_ref().ok_or(AuthError::SigningUnavailable)?;
        let claims = Claims {
            sub: identity.id,
            identifier: identity.mobile_no.clone(),
            permissions: self.embed_permissions.then(|| identity.permissions.clone()),
            iat: issued_at,
            exp: issued_at.saturating_add(self.ttl_secs),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding).map_err(|e| {
            tracing::error!(error = %e, identity_id = identity.id, "failed to sign token");
            AuthError::SigningUnavailable
        })
    }

    /// Check signature, shape and expiry
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let Some(keys) = self.keys.as_ref() else {
            return Err(AuthError::InvalidToken);
        };
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        match decode::<Claims>(token, &keys.decoding, &validation) {
            Ok(data) => Ok(data.claims),
            Err(e) => match e.kind() {
                ErrorKind::ExpiredSignature => Err(AuthError::ExpiredToken),
                _ => Err(AuthError::InvalidToken),
            },
        }
    }
}

/// Pull the token out of an `Authorization` header value.
///
/// Only the `Bearer` scheme is accepted.
pub fn extract_bearer(header: Option<&str>) -> Result<&str, AuthError> {
    let header = header.map(str::trim).filter(|h| !h.is_empty()).ok_or(AuthError::NoToken)?;
    match header.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => {
            let token = rest.trim();
            if token.is_empty() { Err(AuthError::NoToken) } else { Ok(token) }
        }
        Some(_) => Err(AuthError::InvalidToken),
        None if header.eq_ignore_ascii_case("bearer") => Err(AuthError::NoToken),
        None => Err(AuthError::InvalidToken),
    }
}

/// Short SHA-256 fingerprint for correlating a token in logs without recording it
pub fn fingerprint(token: &str) -> String {
    Sha256::digest(token.as_bytes())[..6].iter().map(|b| format!("{:02x}", b)).collect()
}
