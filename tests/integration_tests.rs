use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::{get, post, put};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use gateway::backend::BackendClient;
use gateway::clock::TestClock;
use gateway::config::Config;
use gateway::gateway::GatewayPipeline;
use gateway::handlers::{
    build_state, clear_metrics, get_metrics, health_check, login, proxy_request, register, update_plan,
};
use gateway::kv::{InMemoryKvStore, KvStore};
use gateway::metrics::MetricsRecorder;
use gateway::plan::PlanRegistry;
use gateway::rate_limiter::TokenBucketLimiter;
use gateway::round_robin::{RoundRobinSelector, ServiceRegistry};

fn test_config() -> Config {
    let mut services = HashMap::new();
    services.insert("light".to_string(), vec!["http://127.0.0.1:1".to_string()]);
    Config {
        redis_host: "unused".to_string(),
        redis_port: 0,
        bind_address: "127.0.0.1:0".to_string(),
        access_token_expire_minutes: 30,
        secret_key: "integration-test-secret".to_string(),
        backend_timeout_secs: 1,
        service_registry: services,
    }
}

/// Builds the router wired to in-memory collaborators instead of a live
/// Redis, the same way the unit tests in each module avoid a live store.
fn test_app(clock: Arc<TestClock>) -> Router {
    let config = test_config();
    let kv: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
    let metrics = MetricsRecorder::new(kv.clone());
    let plans = PlanRegistry::standard();
    let limiter = TokenBucketLimiter::new(kv.clone(), clock.clone(), metrics.clone(), plans);
    let selector = RoundRobinSelector::new(kv.clone(), ServiceRegistry::new(config.service_registry.clone()));
    let backend = BackendClient::new(Duration::from_secs(config.backend_timeout_secs)).unwrap();
    let pipeline = GatewayPipeline::new(kv.clone(), clock, limiter, selector, backend, metrics);
    let state = build_state(&config, kv, pipeline);

    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/request/:service", get(proxy_request))
        .route("/user/plan/:plan", put(update_plan))
        .route("/metrics", get(get_metrics))
        .route("/metrics/clear", post(clear_metrics))
        .route("/health", get(health_check))
        .with_state(state)
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_check_responds_ok() {
    let app = test_app(Arc::new(TestClock::new(0.0)));
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn register_then_login_then_request_without_auth_is_rejected() {
    let app = test_app(Arc::new(TestClock::new(0.0)));

    let register_resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/register")
                .header("content-type", "application/json")
                .body(Body::from(json!({"username": "alice", "password": "hunter2pass"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(register_resp.status(), StatusCode::OK);

    // Unauthenticated proxy call is rejected before anything else runs.
    let unauth_resp = app
        .clone()
        .oneshot(Request::builder().uri("/request/light").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(unauth_resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn duplicate_registration_is_rejected() {
    let app = test_app(Arc::new(TestClock::new(0.0)));

    let body = json!({"username": "bob", "password": "hunter2pass"}).to_string();
    let first = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/register")
                .header("content-type", "application/json")
                .body(Body::from(body.clone()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/register")
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_with_wrong_password_is_rejected() {
    let app = test_app(Arc::new(TestClock::new(0.0)));

    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/register")
                .header("content-type", "application/json")
                .body(Body::from(json!({"username": "carol", "password": "correcthorse"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let login_resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/login")
                .header("content-type", "application/json")
                .body(Body::from(json!({"username": "carol", "password": "wrongpass"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(login_resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn proxy_to_unknown_service_returns_400_and_leaves_metrics_untouched() {
    let app = test_app(Arc::new(TestClock::new(0.0)));

    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/register")
                .header("content-type", "application/json")
                .body(Body::from(json!({"username": "dave", "password": "correcthorse"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let login_resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/login")
                .header("content-type", "application/json")
                .body(Body::from(json!({"username": "dave", "password": "correcthorse"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let login_body = json_body(login_resp).await;
    let token = login_body["access_token"].as_str().unwrap();

    let proxy_resp = app
        .oneshot(
            Request::builder()
                .uri("/request/medium")
                .header("Authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(proxy_resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn plan_change_rejects_unknown_plan() {
    let app = test_app(Arc::new(TestClock::new(0.0)));

    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/register")
                .header("content-type", "application/json")
                .body(Body::from(json!({"username": "erin", "password": "correcthorse"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let login_resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/login")
                .header("content-type", "application/json")
                .body(Body::from(json!({"username": "erin", "password": "correcthorse"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let token = json_body(login_resp).await["access_token"].as_str().unwrap().to_string();

    let resp = app
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/user/plan/enterprise")
                .header("Authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn metrics_read_and_clear_round_trip() {
    let app = test_app(Arc::new(TestClock::new(0.0)));

    let metrics_resp = app
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(metrics_resp.status(), StatusCode::OK);

    let clear_resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/metrics/clear")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(clear_resp.status(), StatusCode::OK);
}
