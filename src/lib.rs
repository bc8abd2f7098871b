//! # API Gateway
//!
//! A rate-limited, round-robin API gateway. It authenticates callers,
//! enforces a per-client token-bucket rate limit, selects a backend
//! instance by round-robin, forwards the request, and records metrics —
//! all backed by a shared key/value store so multiple gateway processes
//! can run behind a load balancer.
//!
//! ## Module Organization
//!
//! - [`clock`] - injectable time source (production vs. deterministic test)
//! - [`kv`] - key/value store abstraction (Redis in production, in-memory for tests)
//! - [`error`] - gateway error type and its HTTP status mapping
//! - [`plan`] - the closed registry of rate-limit plans
//! - [`token_bucket`] - pure token-bucket refill/consume arithmetic
//! - [`rate_limiter`] - the admission decision built on [`token_bucket`] and [`kv`]
//! - [`round_robin`] - per-service instance selection
//! - [`metrics`] - counters recorded by the pipeline, and their read/reset API
//! - [`backend`] - the outbound HTTP client used to reach backend instances
//! - [`gateway`] - orchestrates the above into the end-to-end request pipeline
//! - [`auth`] - account registration/login and bearer token verification
//! - [`config`] - environment-driven configuration
//! - [`config_validator`] - startup validation of configuration values
//! - [`validation`] - request input validation
//! - [`handlers`] - HTTP request handlers
//! - [`server`] - router assembly and graceful shutdown

pub mod auth;
pub mod backend;
pub mod clock;
pub mod config;
pub mod config_validator;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod kv;
pub mod metrics;
pub mod plan;
pub mod rate_limiter;
pub mod round_robin;
pub mod server;
pub mod token_bucket;
pub mod validation;

pub use config::Config;
pub use error::GatewayError;
pub use server::Server;

pub type Result<T> = std::result::Result<T, GatewayError>;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
