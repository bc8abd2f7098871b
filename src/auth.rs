//! Authentication collaborator (A3) — out of scope for the rate-limiting
//! core (spec §1), but required for the service to run end to end. The
//! core only ever consumes the authenticated principal id this module
//! produces; it never touches passwords or tokens.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::http::HeaderMap;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{GatewayError, Result};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
}

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| GatewayError::Validation(format!("failed to hash password: {e}")))
}

pub fn verify_password(password: &str, hashed: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hashed) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Mints a bearer token for `user_id`, expiring `expire_minutes` from now.
pub fn create_access_token(user_id: &str, secret: &str, expire_minutes: i64) -> Result<String> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64;
    let claims = Claims {
        sub: user_id.to_string(),
        exp: now + expire_minutes * 60,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| GatewayError::Unauthorized(format!("failed to mint token: {e}")))
}

fn verify_access_token(token: &str, secret: &str) -> Result<Claims> {
    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &Validation::default())
        .map(|data| data.claims)
        .map_err(|_| GatewayError::Unauthorized("invalid or expired token".to_string()))
}

/// Extracts and verifies the bearer token in `Authorization`, returning the
/// authenticated principal id (the core's only view of "who is calling").
pub fn authenticate(headers: &HeaderMap, secret: &str) -> Result<String> {
    let raw = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| GatewayError::Unauthorized("missing authorization header".to_string()))?;

    let token = raw
        .strip_prefix("Bearer ")
        .ok_or_else(|| GatewayError::Unauthorized("authorization header must use Bearer scheme".to_string()))?;

    Ok(verify_access_token(token, secret)?.sub)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_roundtrips() {
        let hashed = hash_password("correct horse battery staple").unwrap();
        assert!(verify_password("correct horse battery staple", &hashed));
        assert!(!verify_password("wrong password", &hashed));
    }

    #[test]
    fn token_roundtrips_with_matching_secret() {
        let token = create_access_token("alice", "s3cr3t", 60).unwrap();
        let claims = verify_access_token(&token, "s3cr3t").unwrap();
        assert_eq!(claims.sub, "alice");
    }

    #[test]
    fn token_rejected_with_wrong_secret() {
        let token = create_access_token("alice", "s3cr3t", 60).unwrap();
        assert!(verify_access_token(&token, "other").is_err());
    }

    #[test]
    fn authenticate_rejects_missing_header() {
        let headers = HeaderMap::new();
        assert!(authenticate(&headers, "s3cr3t").is_err());
    }
}
