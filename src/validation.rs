//! Request validation helpers for the auth collaborator endpoints.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{GatewayError, Result};

static USERNAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_-]{3,32}$").unwrap());
static CLIENT_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_-]{1,64}$").unwrap());

pub fn validate_username(username: &str) -> Result<()> {
    if USERNAME_RE.is_match(username) {
        Ok(())
    } else {
        Err(GatewayError::Validation(
            "username must be 3-32 characters of letters, digits, '_' or '-'".to_string(),
        ))
    }
}

pub fn validate_password(password: &str) -> Result<()> {
    if password.len() >= 8 {
        Ok(())
    } else {
        Err(GatewayError::Validation("password must be at least 8 characters".to_string()))
    }
}

/// Validates an `X-Client-ID` override header before it is used as a
/// surrogate identity.
pub fn validate_client_id(client_id: &str) -> Result<()> {
    if CLIENT_ID_RE.is_match(client_id) {
        Ok(())
    } else {
        Err(GatewayError::Validation(
            "client id must be 1-64 characters of letters, digits, '_' or '-'".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_username() {
        assert!(validate_username("alice_01").is_ok());
    }

    #[test]
    fn rejects_short_username() {
        assert!(validate_username("ab").is_err());
    }

    #[test]
    fn rejects_password_too_short() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("longenough1").is_ok());
    }

    #[test]
    fn accepts_surrogate_client_id() {
        assert!(validate_client_id("premium_42").is_ok());
        assert!(validate_client_id("has a space").is_err());
    }
}
