//! Round-Robin Selector (C4).
//!
//! Instance lists are static at process start; dynamic reconfiguration of
//! the service registry is a non-goal. The selector's own state lives
//! entirely in the KV store (`lb:<service>:counter`) so that multiple
//! gateway processes share one sequence.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{GatewayError, Result};
use crate::kv::KvStore;

/// Static `service -> instance urls` mapping, loaded at startup.
#[derive(Debug, Clone)]
pub struct ServiceRegistry {
    services: HashMap<String, Vec<String>>,
}

impl ServiceRegistry {
    pub fn new(services: HashMap<String, Vec<String>>) -> Self {
        Self { services }
    }

    pub fn instances(&self, service: &str) -> Option<&[String]> {
        self.services.get(service).map(Vec::as_slice)
    }

    pub fn contains(&self, service: &str) -> bool {
        self.services
            .get(service)
            .is_some_and(|urls| !urls.is_empty())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.services.iter()
    }
}

/// Picks the next backend instance for a service class by atomic
/// pre-increment of a shared counter.
pub struct RoundRobinSelector {
    kv: Arc<dyn KvStore>,
    registry: ServiceRegistry,
}

impl RoundRobinSelector {
    pub fn new(kv: Arc<dyn KvStore>, registry: ServiceRegistry) -> Self {
        Self { kv, registry }
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    /// Atomically increments `lb:<service>:counter` and returns the
    /// instance at `counter mod n`.
    ///
    /// The counter is implicitly 0 before the first pick, so the first
    /// call returns index `1 mod n` rather than `0` — a known, preserved
    /// deviation from a strict zero-start; the sequence still visits
    /// every instance with equal long-run frequency.
    pub async fn pick(&self, service: &str) -> Result<(usize, String)> {
        let instances = self
            .registry
            .instances(service)
            .filter(|urls| !urls.is_empty())
            .ok_or(GatewayError::InvalidService)?;

        let counter = self.kv.incr(&format!("lb:{service}:counter")).await?;
        let idx = (counter.rem_euclid(instances.len() as i64)) as usize;
        Ok((idx, instances[idx].clone()))
    }
}
