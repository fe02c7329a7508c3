//! Session token issue and verification

use std::time::{SystemTime, UNIX_EPOCH};

use assetgate::{AuthError, Identity, IdentityStatus, PermissionSet, TokenCodec};

const SECRET: &str = "0123456789abcdef0123456789abcdef";
const OTHER_SECRET: &str = "fedcba9876543210fedcba9876543210";

fn identity(permissions: &[&str]) -> Identity {
    Identity {
        id: 42,
        name: "Ravi".into(),
        email: "ravi@example.com".into(),
        mobile_no: "9123456780".into(),
        secret_hash: String::new(),
        image_url: None,
        status: IdentityStatus::Active,
        permissions: permissions.iter().copied().collect(),
        created_at: 0,
        updated_at: 0,
    }
}

fn now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs()
}

#[test]
fn issued_token_verifies() {
    let codec = TokenCodec::new(SECRET, 3600).unwrap();
    let token = codec.issue(&identity(&["view_users"])).unwrap();
    let claims = codec.verify(&token).unwrap();
    assert_eq!(claims.sub, 42);
    assert_eq!(claims.identifier, "9123456780");
    assert_eq!(claims.permissions, Some(["view_users"].into_iter().collect::<PermissionSet>()));
    assert_eq!(claims.exp - claims.iat, 3600);
}

#[test]
fn snapshot_can_be_left_out() {
    let codec = TokenCodec::new(SECRET, 3600).unwrap().with_permission_snapshot(false);
    let token = codec.issue(&identity(&["*"])).unwrap();
    assert_eq!(codec.verify(&token).unwrap().permissions, None);
}

#[test]
fn wrong_key_is_invalid() {
    let issuer = TokenCodec::new(OTHER_SECRET, 3600).unwrap();
    let verifier = TokenCodec::new(SECRET, 3600).unwrap();
    let token = issuer.issue(&identity(&[])).unwrap();
    assert_eq!(verifier.verify(&token), Err(AuthError::InvalidToken));
}

#[test]
fn tampered_token_is_invalid() {
    let codec = TokenCodec::new(SECRET, 3600).unwrap();
    let mut token = codec.issue(&identity(&[])).unwrap();
    token.push('x');
    assert_eq!(codec.verify(&token), Err(AuthError::InvalidToken));
    assert_eq!(codec.verify("not-a-jwt"), Err(AuthError::InvalidToken));
}

#[test]
fn expired_token_reported_as_expired() {
    let codec = TokenCodec::new(SECRET, 60).unwrap();
    let token = codec.issue_at(&identity(&[]), now() - 600).unwrap();
    assert_eq!(codec.verify(&token), Err(AuthError::ExpiredToken));
}

#[test]
fn disabled_codec_fails_closed() {
    let codec = TokenCodec::from_secret(None, 3600).unwrap();
    assert!(!codec.is_enabled());
    assert_eq!(codec.issue(&identity(&[])), Err(AuthError::SigningUnavailable));

    let token = TokenCodec::new(SECRET, 3600).unwrap().issue(&identity(&["*"])).unwrap();
    assert_eq!(codec.verify(&token), Err(AuthError::InvalidToken));
}

#[test]
fn short_secret_refused() {
    assert!(TokenCodec::new("too-short", 3600).is_err());
    assert!(TokenCodec::from_secret(Some("too-short"), 3600).is_err());
}
