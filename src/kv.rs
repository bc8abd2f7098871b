//! # Key/Value Store Adapter
//!
//! This module provides the typed abstraction every other component in the
//! gateway uses to reach the shared external store. It enables multiple
//! gateway instances to share rate-limit state, round-robin counters, and
//! metrics.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                        Shared External Store                         │
//! ├──────────────────────────────────────────────────────────────────────┤
//! │                                                                      │
//! │   ┌──────────────┐    ┌──────────────┐    ┌──────────────┐           │
//! │   │ Gateway 1    │    │ Gateway 2    │    │ Gateway N    │           │
//! │   └──────┬───────┘    └──────┬───────┘    └──────┬───────┘           │
//! │          │                   │                   │                   │
//! │          └───────────────────┼───────────────────┘                   │
//! │                              ▼                                       │
//! │                     ┌─────────────────┐                              │
//! │                     │   KvStore impl   │                             │
//! │                     │                  │                             │
//! │                     │  <client>:bucket │ ← JSON-encoded Bucket        │
//! │                     │  lb:<svc>:counter│                              │
//! │                     │  metrics:*       │                              │
//! │                     └─────────────────┘                              │
//! │                                                                      │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Atomicity contract
//!
//! `incr`/`incr_float` are atomic read-modify-write across concurrent
//! callers; `get` followed by `set` is deliberately **not** atomic — the
//! bucket write-back in [`crate::rate_limiter`] uses last-writer-wins, and
//! the lost updates that implies are an accepted tradeoff (see module docs
//! there).
//!
//! Two implementations are provided: [`RedisKvStore`] for production, and
//! [`InMemoryKvStore`] for deterministic tests that would otherwise need a
//! live Redis instance.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::error::{GatewayError, Result};

/// Typed wrapper over the external key/value store.
///
/// `get`/`set`/`exists` operate on opaque string values (typically a JSON
/// blob the caller encodes/decodes itself). `incr`/`incr_float` are the
/// atomic primitives the rest of the gateway builds on for counters.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Reads a string value. Returns `None` if the key is absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Unconditionally writes `value`, resetting (or clearing, if `None`)
    /// the key's TTL.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()>;

    /// Checks whether `key` is present and unexpired.
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Atomically increments `key` by 1 and returns the new value. A key
    /// that doesn't exist is treated as 0 before the increment.
    async fn incr(&self, key: &str) -> Result<i64>;

    /// Atomically adds `delta` to `key` and returns the new value.
    async fn incr_float(&self, key: &str, delta: f64) -> Result<f64>;
}

/// Redis-backed implementation, used in production.
///
/// Built on `redis::aio::ConnectionManager`, which multiplexes a single
/// connection across concurrent callers and reconnects transparently on
/// drop — no per-request connection is opened.
pub struct RedisKvStore {
    conn: ConnectionManager,
}

impl RedisKvStore {
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| GatewayError::StoreUnavailable(format!("invalid redis url: {e}")))?;
        let conn = client.get_connection_manager().await?;
        Ok(Self { conn })
    }

    /// Issues a PING, used by the readiness probe.
    pub async fn ping(&self) -> Result<String> {
        let mut conn = self.conn.clone();
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(pong)
    }
}

#[async_trait]
impl KvStore for RedisKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.conn.clone();
        match ttl {
            Some(d) => {
                let _: () = conn.set_ex(key, value, d.as_secs().max(1)).await?;
            }
            None => {
                let _: () = conn.set(key, value).await?;
            }
        }
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let exists: bool = conn.exists(key).await?;
        Ok(exists)
    }

    async fn incr(&self, key: &str) -> Result<i64> {
        let mut conn = self.conn.clone();
        let value: i64 = conn.incr(key, 1).await?;
        Ok(value)
    }

    async fn incr_float(&self, key: &str, delta: f64) -> Result<f64> {
        let mut conn = self.conn.clone();
        let value: f64 = conn.incr(key, delta).await?;
        Ok(value)
    }
}

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

/// In-process implementation backed by a mutex-guarded map.
///
/// Used by the test suite so the testable properties in the core
/// (bucket bounds, refill arithmetic, round-robin fairness, metrics
/// conservation) are exercised deterministically without a live Redis.
#[derive(Default)]
pub struct InMemoryKvStore {
    data: Mutex<HashMap<String, Entry>>,
}

impl InMemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_live(entry: &Entry) -> bool {
        match entry.expires_at {
            Some(at) => Instant::now() < at,
            None => true,
        }
    }
}

#[async_trait]
impl KvStore for InMemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut data = self.data.lock().unwrap();
        if let Some(entry) = data.get(key) {
            if Self::is_live(entry) {
                return Ok(Some(entry.value.clone()));
            }
            data.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        let mut data = self.data.lock().unwrap();
        data.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: ttl.map(|d| Instant::now() + d),
            },
        );
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }

    async fn incr(&self, key: &str) -> Result<i64> {
        let mut data = self.data.lock().unwrap();
        let current = data
            .get(key)
            .filter(|e| Self::is_live(e))
            .and_then(|e| e.value.parse::<i64>().ok())
            .unwrap_or(0);
        let next = current + 1;
        data.insert(
            key.to_string(),
            Entry {
                value: next.to_string(),
                expires_at: None,
            },
        );
        Ok(next)
    }

    async fn incr_float(&self, key: &str, delta: f64) -> Result<f64> {
        let mut data = self.data.lock().unwrap();
        let current = data
            .get(key)
            .filter(|e| Self::is_live(e))
            .and_then(|e| e.value.parse::<f64>().ok())
            .unwrap_or(0.0);
        let next = current + delta;
        data.insert(
            key.to_string(),
            Entry {
                value: next.to_string(),
                expires_at: None,
            },
        );
        Ok(next)
    }
}
