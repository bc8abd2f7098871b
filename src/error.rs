//! # Error Types and Handling
//!
//! This module defines the gateway's error type and its conversion to HTTP
//! responses.
//!
//! ## Error to HTTP Status Mapping
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error → HTTP Status Mapping                          │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  GatewayError Variant        │  HTTP Status        │  Notes            │
//! │  ────────────────────────────┼─────────────────────┼───────────────────│
//! │  InvalidService              │  400 Bad Request    │                   │
//! │  InvalidPlan                 │  400 Bad Request    │                   │
//! │  RateLimited                 │  429 Too Many Reqs  │  recorded in      │
//! │                              │                      │  metrics          │
//! │  BackendUnavailable          │  500 Internal Error │  client may retry │
//! │  StoreUnavailable            │  500 Internal Error │  no partial write │
//! │  Unauthorized                │  401 Unauthorized   │                   │
//! │  UserExists                  │  400 Bad Request    │  register only    │
//! │  InvalidCredentials          │  401 Unauthorized   │  login only       │
//! │  Validation                  │  400 Bad Request    │                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Automatic Conversions
//!
//! - `redis::RedisError` → `GatewayError::StoreUnavailable`
//! - `serde_json::Error` → `GatewayError::StoreUnavailable`
//!
//! A store failure is fatal to the request in progress: the core never
//! retries a KV call locally, and no partial metrics are written once a
//! store error has been observed mid-pipeline.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::fmt;

/// All errors the gateway can return, core and collaborator alike.
///
/// `UserExists` and `InvalidCredentials` belong to the auth collaborator
/// (register/login), not the rate-limiting core; they live here so the
/// whole service has one `IntoResponse` impl.
#[derive(Debug, Clone)]
pub enum GatewayError {
    /// Requested service name isn't in the registry.
    /// Maps to: 400 Bad Request
    InvalidService,

    /// Requested plan name isn't in the plan registry.
    /// Maps to: 400 Bad Request
    InvalidPlan,

    /// Token bucket had insufficient tokens for this request.
    /// Maps to: 429 Too Many Requests
    RateLimited,

    /// Proxied backend did not respond (connection error, timeout).
    /// Maps to: 500 Internal Server Error
    BackendUnavailable(String),

    /// KV store call failed.
    /// Maps to: 500 Internal Server Error
    StoreUnavailable(String),

    /// Missing or invalid bearer token.
    /// Maps to: 401 Unauthorized
    Unauthorized(String),

    /// Registration attempted for a username that already exists.
    /// Maps to: 400 Bad Request
    UserExists,

    /// Login attempted with a wrong username/password pair.
    /// Maps to: 401 Unauthorized
    InvalidCredentials,

    /// Request body or parameters failed validation.
    /// Maps to: 400 Bad Request
    Validation(String),
}

impl std::error::Error for GatewayError {}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::InvalidService => write!(f, "Invalid service"),
            GatewayError::InvalidPlan => write!(f, "Invalid plan"),
            GatewayError::RateLimited => write!(f, "Too many requests"),
            GatewayError::BackendUnavailable(msg) => write!(f, "Backend unavailable: {}", msg),
            GatewayError::StoreUnavailable(msg) => write!(f, "Store unavailable: {}", msg),
            GatewayError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            GatewayError::UserExists => write!(f, "User already exists"),
            GatewayError::InvalidCredentials => write!(f, "Invalid credentials"),
            GatewayError::Validation(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            GatewayError::InvalidService | GatewayError::InvalidPlan => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({ "error": "invalid_request", "message": self.to_string() }),
            ),
            GatewayError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                serde_json::json!({ "error": "rate_limited", "message": self.to_string() }),
            ),
            GatewayError::BackendUnavailable(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({ "error": "backend_unavailable", "message": self.to_string() }),
            ),
            GatewayError::StoreUnavailable(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({ "error": "store_unavailable", "message": "An unexpected error occurred" }),
            ),
            GatewayError::Unauthorized(_) => (
                StatusCode::UNAUTHORIZED,
                serde_json::json!({ "error": "unauthorized", "message": self.to_string() }),
            ),
            GatewayError::UserExists => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({ "error": "user_exists", "message": self.to_string() }),
            ),
            GatewayError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                serde_json::json!({ "error": "invalid_credentials", "message": self.to_string() }),
            ),
            GatewayError::Validation(_) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({ "error": "validation_error", "message": self.to_string() }),
            ),
        };

        (status, Json(body)).into_response()
    }
}

impl From<redis::RedisError> for GatewayError {
    fn from(err: redis::RedisError) -> Self {
        GatewayError::StoreUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::StoreUnavailable(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
