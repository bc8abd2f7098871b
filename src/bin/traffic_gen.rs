//! Synthetic traffic generator (A5).
//!
//! Fires concurrent `GET /request/{service}` calls against a running
//! gateway, each tagged with a distinct `X-Client-ID` surrogate so a
//! single authenticated bearer token can simulate many independent
//! callers — exercising the round-robin and rate-limit paths under load
//! without needing one real account per simulated client.

use std::time::Duration;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(about = "Fires simulated concurrent traffic at a running gateway")]
struct Args {
    /// Base URL of the gateway, e.g. http://localhost:8000
    #[arg(long, default_value = "http://localhost:8000")]
    gateway_url: String,

    /// Service class to request, e.g. light or heavy
    #[arg(long, default_value = "light")]
    service: String,

    /// Bearer token for an already-registered account
    #[arg(long)]
    token: String,

    /// Number of distinct simulated clients
    #[arg(long, default_value_t = 10)]
    clients: u32,

    /// Requests fired per simulated client
    #[arg(long, default_value_t = 5)]
    requests_per_client: u32,

    /// Fraction (0-100) of simulated clients classified as premium via
    /// the `premium_` id prefix; the rest are basic.
    #[arg(long, default_value_t = 20)]
    premium_percent: u32,
}

async fn fire(http: reqwest::Client, args_url: String, service: String, token: String, client_id: String, count: u32) {
    for i in 0..count {
        let result = http
            .get(format!("{args_url}/request/{service}"))
            .bearer_auth(&token)
            .header("X-Client-ID", &client_id)
            .send()
            .await;

        match result {
            Ok(resp) => tracing::info!(client_id, attempt = i, status = %resp.status(), "request completed"),
            Err(err) => tracing::warn!(client_id, attempt = i, error = %err, "request failed"),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().init();

    let args = Args::parse();
    let http = reqwest::Client::builder().timeout(Duration::from_secs(10)).build()?;

    let mut handles = Vec::new();
    for n in 0..args.clients {
        let client_id = if (n * 100 / args.clients.max(1)) < args.premium_percent {
            format!("premium_{n}")
        } else {
            format!("basic_{n}")
        };

        handles.push(tokio::spawn(fire(
            http.clone(),
            args.gateway_url.clone(),
            args.service.clone(),
            args.token.clone(),
            client_id,
            args.requests_per_client,
        )));
    }

    for handle in handles {
        handle.await?;
    }

    Ok(())
}
