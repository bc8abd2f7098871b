//! Demo backend: a "heavy" service instance that responds slowly, used to
//! exercise the gateway's latency metrics and backend timeout handling.

use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

async fn get_data() -> Json<Value> {
    tokio::time::sleep(std::time::Duration::from_secs(3)).await;
    Json(json!({ "service": "heavy", "message": "Slow response" }))
}

async fn get_health() -> Json<Value> {
    Json(json!({ "status": "available" }))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().init();

    let bind_address = std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:9003".to_string());
    let app = Router::new()
        .route("/data", get(get_data))
        .route("/health", get(get_health));

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("heavy service listening on {}", bind_address);
    axum::serve(listener, app).await?;
    Ok(())
}
