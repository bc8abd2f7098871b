//! # HTTP Request Handlers
//!
//! Thin adapters between Axum extractors and the gateway pipeline / auth
//! collaborator. Handlers never touch the KV store directly — state
//! changes and admission decisions all go through [`AppState`]'s
//! collaborators.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth;
use crate::config::Config;
use crate::error::{GatewayError, Result};
use crate::gateway::GatewayPipeline;
use crate::kv::KvStore;
use crate::metrics::MetricsReport;
use crate::plan::PlanRegistry;
use crate::validation;

pub struct AppState {
    pub gateway: GatewayPipeline,
    pub kv: Arc<dyn KvStore>,
    pub plans: PlanRegistry,
    pub secret_key: String,
    pub access_token_expire_minutes: i64,
}

pub type SharedState = Arc<AppState>;

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
}

/// `POST /register` — creates a user with a `basic` plan assignment.
/// A day's TTL on both keys mirrors the original collaborator rather than
/// persisting accounts indefinitely (account persistence is out of scope).
pub async fn register(State(state): State<SharedState>, Json(body): Json<Credentials>) -> Result<Json<MessageResponse>> {
    validation::validate_username(&body.username)?;
    validation::validate_password(&body.password)?;

    let pass_key = format!("user:{}:password", body.username);
    if state.kv.exists(&pass_key).await? {
        return Err(GatewayError::UserExists);
    }

    let hashed = auth::hash_password(&body.password)?;
    let ttl = std::time::Duration::from_secs(86_400);
    state.kv.set(&pass_key, &hashed, Some(ttl)).await?;
    state.kv.set(&format!("user:{}:plan", body.username), "basic", Some(ttl)).await?;

    Ok(Json(MessageResponse {
        message: "User registered".to_string(),
    }))
}

/// `POST /login` — verifies the stored password hash and mints a bearer token.
pub async fn login(State(state): State<SharedState>, Json(body): Json<Credentials>) -> Result<Json<TokenResponse>> {
    let pass_key = format!("user:{}:password", body.username);
    let stored = state.kv.get(&pass_key).await?;

    let valid = match &stored {
        Some(hashed) => auth::verify_password(&body.password, hashed),
        None => false,
    };
    if !valid {
        return Err(GatewayError::InvalidCredentials);
    }

    let token = auth::create_access_token(&body.username, &state.secret_key, state.access_token_expire_minutes)?;
    Ok(Json(TokenResponse {
        access_token: token,
        token_type: "bearer",
    }))
}

/// `GET /request/{service}` — the core admission-and-dispatch pipeline.
pub async fn proxy_request(
    State(state): State<SharedState>,
    Path(service): Path<String>,
    headers: HeaderMap,
) -> Result<(StatusCode, Json<serde_json::Value>)> {
    let principal = auth::authenticate(&headers, &state.secret_key)?;

    let client_header = headers
        .get("X-Client-ID")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());
    if let Some(client_id) = &client_header {
        validation::validate_client_id(client_id)?;
    }

    let (status, body) = state
        .gateway
        .proxy(&service, &principal, client_header.as_deref())
        .await?;
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    Ok((status, Json(body)))
}

/// `PUT /user/plan/{plan}` — reassigns the authenticated principal's plan.
pub async fn update_plan(
    State(state): State<SharedState>,
    Path(plan): Path<String>,
    headers: HeaderMap,
) -> Result<Json<MessageResponse>> {
    let principal = auth::authenticate(&headers, &state.secret_key)?;

    if state.plans.get(&plan).is_none() {
        return Err(GatewayError::InvalidPlan);
    }

    state.gateway.set_plan(&principal, &plan).await?;
    Ok(Json(MessageResponse {
        message: format!("Plan updated to {plan}"),
    }))
}

/// `GET /metrics` — unauthenticated read of the aggregated counters.
pub async fn get_metrics(State(state): State<SharedState>) -> Result<Json<MetricsReport>> {
    let report = state
        .gateway
        .metrics()
        .report(&state.plans, state.gateway.services())
        .await?;
    Ok(Json(report))
}

/// `POST /metrics/clear` — resets every tracked counter to zero.
pub async fn clear_metrics(State(state): State<SharedState>) -> Result<Json<MessageResponse>> {
    state
        .gateway
        .metrics()
        .clear(&state.plans, state.gateway.services())
        .await?;
    Ok(Json(MessageResponse {
        message: "Metrics cleared".to_string(),
    }))
}

/// `GET /health` — liveness probe; does not touch the KV store.
pub async fn health_check() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "ok".to_string(),
    })
}

pub fn build_state(config: &Config, kv: Arc<dyn KvStore>, gateway: GatewayPipeline) -> SharedState {
    Arc::new(AppState {
        gateway,
        kv,
        plans: PlanRegistry::standard(),
        secret_key: config.secret_key.clone(),
        access_token_expire_minutes: config.access_token_expire_minutes,
    })
}
