//! Metrics Recorder (C5) and the read/reset API (C9).
//!
//! All increments go straight through [`crate::kv::KvStore::incr`] /
//! `incr_float`, so they are atomic and never lost — no read-modify-write
//! is performed here. The recorder is a leaf: it is called by the gateway
//! pipeline and the limiter, and never calls back into either.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::error::Result;
use crate::kv::KvStore;
use crate::plan::PlanRegistry;
use crate::round_robin::ServiceRegistry;

/// HTTP status codes the recorder tracks explicitly (spec: 200/400/429/500).
pub const TRACKED_STATUS_CODES: [u16; 4] = [200, 400, 429, 500];

#[derive(Debug, Clone)]
pub struct MetricsRecorder {
    kv: Arc<dyn KvStore>,
}

impl MetricsRecorder {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    pub async fn record_plan_allowed(&self, plan: &str) -> Result<()> {
        self.kv.incr(&format!("metrics:plan:{plan}:allowed")).await?;
        Ok(())
    }

    pub async fn record_plan_blocked(&self, plan: &str) -> Result<()> {
        self.kv.incr(&format!("metrics:plan:{plan}:blocked")).await?;
        Ok(())
    }

    pub async fn record_service(&self, service: &str) -> Result<()> {
        self.kv.incr(&format!("metrics:service:{service}")).await?;
        Ok(())
    }

    pub async fn record_status(&self, code: u16) -> Result<()> {
        self.kv.incr(&format!("metrics:status:{code}")).await?;
        Ok(())
    }

    pub async fn record_instance(&self, service: &str, idx: usize) -> Result<()> {
        self.kv.incr(&format!("metrics:instance:{service}-{idx}")).await?;
        Ok(())
    }

    /// Records one latency sample: bumps the sample count and adds
    /// `seconds` to the running sum.
    pub async fn record_latency(&self, service: &str, seconds: f64) -> Result<()> {
        self.kv.incr(&format!("metrics:latency:count:{service}")).await?;
        self.kv
            .incr_float(&format!("metrics:latency:sum:{service}"), seconds)
            .await?;
        Ok(())
    }

    async fn read_int(&self, key: &str) -> Result<i64> {
        Ok(self
            .kv
            .get(key)
            .await?
            .and_then(|v| v.parse().ok())
            .unwrap_or(0))
    }

    async fn read_float(&self, key: &str) -> Result<f64> {
        Ok(self
            .kv
            .get(key)
            .await?
            .and_then(|v| v.parse().ok())
            .unwrap_or(0.0))
    }

    /// Aggregates every tracked counter into the shape the `/metrics`
    /// endpoint returns. Needs the plan and service registries because
    /// the KV adapter has no key-enumeration primitive (spec §4.2) — the
    /// set of keys to read is exactly the closed set of plans/services/
    /// instances/status codes the process knows about.
    pub async fn report(&self, plans: &PlanRegistry, services: &ServiceRegistry) -> Result<MetricsReport> {
        let mut plan_counts = HashMap::new();
        for name in plans.names() {
            let allowed = self.read_int(&format!("metrics:plan:{name}:allowed")).await?;
            let blocked = self.read_int(&format!("metrics:plan:{name}:blocked")).await?;
            plan_counts.insert(name.to_string(), PlanCounts { allowed, blocked });
        }

        let mut service_counts = HashMap::new();
        let mut latency = HashMap::new();
        let mut instance_counts = HashMap::new();
        for (svc, instances) in services.iter() {
            service_counts.insert(svc.clone(), self.read_int(&format!("metrics:service:{svc}")).await?);

            let count = self.read_int(&format!("metrics:latency:count:{svc}")).await?;
            let sum = self.read_float(&format!("metrics:latency:sum:{svc}")).await?;
            let avg = if count == 0 { 0.0 } else { sum / count as f64 };
            latency.insert(svc.clone(), avg);

            for idx in 0..instances.len() {
                let instance_key = format!("{svc}-{idx}");
                let value = self.read_int(&format!("metrics:instance:{instance_key}")).await?;
                instance_counts.insert(instance_key, value);
            }
        }

        let mut status = HashMap::new();
        for code in TRACKED_STATUS_CODES {
            status.insert(code.to_string(), self.read_int(&format!("metrics:status:{code}")).await?);
        }

        Ok(MetricsReport {
            plans: plan_counts,
            services: service_counts,
            status,
            latency,
            instances: instance_counts,
        })
    }

    /// Resets every tracked counter to zero. Idempotent: calling this
    /// twice in a row leaves identical (all-zero) state.
    pub async fn clear(&self, plans: &PlanRegistry, services: &ServiceRegistry) -> Result<()> {
        for name in plans.names() {
            self.kv.set(&format!("metrics:plan:{name}:allowed"), "0", None).await?;
            self.kv.set(&format!("metrics:plan:{name}:blocked"), "0", None).await?;
        }

        for (svc, instances) in services.iter() {
            self.kv.set(&format!("metrics:service:{svc}"), "0", None).await?;
            self.kv.set(&format!("metrics:latency:count:{svc}"), "0", None).await?;
            self.kv.set(&format!("metrics:latency:sum:{svc}"), "0", None).await?;
            for idx in 0..instances.len() {
                self.kv.set(&format!("metrics:instance:{svc}-{idx}"), "0", None).await?;
            }
        }

        for code in TRACKED_STATUS_CODES {
            self.kv.set(&format!("metrics:status:{code}"), "0", None).await?;
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct PlanCounts {
    pub allowed: i64,
    pub blocked: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricsReport {
    pub plans: HashMap<String, PlanCounts>,
    pub services: HashMap<String, i64>,
    pub status: HashMap<String, i64>,
    pub latency: HashMap<String, f64>,
    pub instances: HashMap<String, i64>,
}
