//! Identity records held by the credential store

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{MOBILE_MAX_LEN, MOBILE_MIN_LEN, PASSWORD_MIN_LEN};
use crate::permissions::PermissionSet;

/// Account lifecycle state. New registrations start `Inactive`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityStatus {
    Active,
    #[default]
    Inactive,
    Suspended,
}

impl fmt::Display for IdentityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityStatus::Active => write!(f, "active"),
            IdentityStatus::Inactive => write!(f, "inactive"),
            IdentityStatus::Suspended => write!(f, "suspended"),
        }
    }
}

impl FromStr for IdentityStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            "suspended" => Ok(Self::Suspended),
            other => Err(format!("Unknown status '{}'", other)),
        }
    }
}

/// Stored identity, including the secret hash. Never serialize this into a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub mobile_no: String,
    pub secret_hash: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub status: IdentityStatus,
    #[serde(default)]
    pub permissions: PermissionSet,
    pub created_at: u64,
    pub updated_at: u64,
}

impl Identity {
    /// True if `identifier` is this identity's mobile number or email
    pub fn is_identified_by(&self, identifier: &str) -> bool {
        self.mobile_no == identifier || self.email.eq_ignore_ascii_case(identifier)
    }

    pub fn public(&self) -> PublicIdentity {
        PublicIdentity {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            mobile_no: self.mobile_no.clone(),
            image_url: self.image_url.clone(),
            status: self.status,
            permissions: self.permissions.clone(),
        }
    }
}

/// Identity as returned over the API, without the secret hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicIdentity {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub mobile_no: String,
    pub image_url: Option<String>,
    pub status: IdentityStatus,
    pub permissions: PermissionSet,
}

/// Mobile numbers are digits with an optional leading `+`, so they can never
/// collide with an email in the identifier index.
pub fn is_valid_mobile(mobile: &str) -> bool {
    let digits = mobile.strip_prefix('+').unwrap_or(mobile);
    let len = mobile.chars().count();
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) && (MOBILE_MIN_LEN..=MOBILE_MAX_LEN).contains(&len)
}

/// A registration request before hashing
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub mobile_no: String,
    pub password: String,
}

impl Registration {
    /// Field-level problems, empty when the registration is acceptable
    pub fn problems(&self) -> Vec<String> {
        let mut out = Vec::new();
        if self.name.trim().is_empty() {
            out.push("name: Name is required".to_string());
        }
        let email_ok = match self.email.split_once('@') {
            Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
            None => false,
        };
        if !email_ok {
            out.push("email: Email is not valid".to_string());
        }
        if !is_valid_mobile(&self.mobile_no) {
            out.push(format!(
                "mobileNo: Mobile number must be {} to {} digits, optionally starting with +",
                MOBILE_MIN_LEN, MOBILE_MAX_LEN
            ));
        }
        if self.password.chars().count() < PASSWORD_MIN_LEN {
            out.push(format!("password: Password must be at least {} characters", PASSWORD_MIN_LEN));
        }
        out
    }
}

/// Fields the store needs to create an identity
#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub name: String,
    pub email: String,
    pub mobile_no: String,
    pub secret_hash: String,
    pub status: IdentityStatus,
    pub permissions: PermissionSet,
}
