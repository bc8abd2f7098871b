//! # Configuration
//!
//! Everything the gateway needs at startup, loaded through the `config`
//! crate's layered builder: defaults first, then the process environment
//! (optionally populated from a `.env` file in development) layered on top.
//! `SERVICE_REGISTRY_JSON` is read separately — it's a raw JSON blob, not a
//! value the flat environment source can deserialize field-by-field.

use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::config_validator::ConfigValidator;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_redis_host")]
    pub redis_host: String,
    #[serde(default = "default_redis_port")]
    pub redis_port: u16,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_access_token_expire_minutes")]
    pub access_token_expire_minutes: i64,
    pub secret_key: String,
    #[serde(default = "default_backend_timeout_secs")]
    pub backend_timeout_secs: u64,
    #[serde(skip, default = "default_service_registry")]
    pub service_registry: HashMap<String, Vec<String>>,
}

fn default_redis_host() -> String {
    "localhost".to_string()
}

fn default_redis_port() -> u16 {
    6379
}

fn default_bind_address() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_access_token_expire_minutes() -> i64 {
    60
}

fn default_backend_timeout_secs() -> u64 {
    5
}

/// Two demo services, each with two instances, matching the bundled
/// `light`/`heavy` backends started alongside the gateway in development.
fn default_service_registry() -> HashMap<String, Vec<String>> {
    let mut registry = HashMap::new();
    registry.insert(
        "light".to_string(),
        vec!["http://localhost:9001".to_string(), "http://localhost:9002".to_string()],
    );
    registry.insert(
        "heavy".to_string(),
        vec!["http://localhost:9003".to_string(), "http://localhost:9004".to_string()],
    );
    registry
}

impl Config {
    /// Loads configuration from the environment, falling back to `.env`
    /// in the current directory if present (a no-op in production, where
    /// no such file exists).
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let settings = config_crate::Config::builder()
            .add_source(config_crate::Environment::default())
            .build()
            .context("failed to build configuration")?;

        let mut config: Config = settings
            .try_deserialize()
            .context("SECRET_KEY must be set (used to sign bearer tokens)")?;

        config.service_registry = match std::env::var("SERVICE_REGISTRY_JSON") {
            Ok(raw) => serde_json::from_str(&raw).context("SERVICE_REGISTRY_JSON is not valid JSON")?,
            Err(_) => default_service_registry(),
        };

        ConfigValidator::validate_bind_address(&config.bind_address)?;
        ConfigValidator::validate_redis_url(&config.redis_url())?;
        ConfigValidator::validate_service_registry(&config.service_registry)?;

        Ok(config)
    }

    pub fn redis_url(&self) -> String {
        format!("redis://{}:{}", self.redis_host, self.redis_port)
    }
}
