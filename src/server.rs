//! # HTTP Server Module
//!
//! Wires the gateway's collaborators into an Axum router and runs it with
//! graceful shutdown on `SIGINT`/`SIGTERM`.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post, put};
use axum::Router;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::backend::BackendClient;
use crate::clock::SystemClock;
use crate::config::Config;
use crate::config_validator::ConfigValidator;
use crate::gateway::GatewayPipeline;
use crate::handlers::{
    build_state, clear_metrics, get_metrics, health_check, login, proxy_request, register, update_plan,
};
use crate::kv::{KvStore, RedisKvStore};
use crate::metrics::MetricsRecorder;
use crate::plan::PlanRegistry;
use crate::rate_limiter::TokenBucketLimiter;
use crate::round_robin::{RoundRobinSelector, ServiceRegistry};

pub struct Server {
    app: Router,
    bind_address: String,
}

/// Wires the collaborators together and builds the Axum router.
pub async fn create_app(config: Config) -> anyhow::Result<Router> {
    ConfigValidator::validate_bind_address(&config.bind_address)?;
    ConfigValidator::validate_redis_url(&config.redis_url())?;
    ConfigValidator::validate_service_registry(&config.service_registry)?;

    let kv: Arc<dyn KvStore> = Arc::new(RedisKvStore::connect(&config.redis_url()).await?);
    let clock = Arc::new(SystemClock);
    let metrics = MetricsRecorder::new(kv.clone());
    let plans = PlanRegistry::standard();
    let limiter = TokenBucketLimiter::new(kv.clone(), clock.clone(), metrics.clone(), plans.clone());

    let registry = ServiceRegistry::new(config.service_registry.clone());
    let selector = RoundRobinSelector::new(kv.clone(), registry);

    let backend = BackendClient::new(Duration::from_secs(config.backend_timeout_secs))?;
    let gateway = GatewayPipeline::new(kv.clone(), clock, limiter, selector, backend, metrics);

    let state = build_state(&config, kv, gateway);

    let app = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/request/:service", get(proxy_request))
        .route("/user/plan/:plan", put(update_plan))
        .route("/metrics", get(get_metrics))
        .route("/metrics/clear", post(clear_metrics))
        .route("/health", get(health_check))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        );

    Ok(app)
}

impl Server {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let bind_address = config.bind_address.clone();
        let app = create_app(config).await?;
        Ok(Self { app, bind_address })
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.bind_address).await?;
        tracing::info!("gateway listening on {}", self.bind_address);

        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

/// Waits for `SIGINT` or (Unix-only) `SIGTERM`, whichever arrives first.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
