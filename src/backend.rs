//! Backend Client (C7).
//!
//! Issues the outbound GET the gateway pipeline proxies each admitted
//! request to. Built on a single `reqwest::Client`, which pools
//! connections across the process — no per-request connection is opened.

use std::time::Duration;

use serde_json::Value;

use crate::error::{GatewayError, Result};

#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
}

impl BackendClient {
    /// `timeout` bounds the whole request; a timed-out or connection-
    /// refused call surfaces as [`GatewayError::BackendUnavailable`].
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::BackendUnavailable(e.to_string()))?;
        Ok(Self { http })
    }

    /// Issues `GET url` and returns the status code and decoded JSON body.
    /// The status is passed through verbatim regardless of its value —
    /// only a transport-level failure (refused connection, timeout, DNS)
    /// becomes an `Err`.
    pub async fn get(&self, url: &str) -> Result<(u16, Value)> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| GatewayError::BackendUnavailable(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response.json::<Value>().await.unwrap_or(Value::Null);
        Ok((status, body))
    }
}
