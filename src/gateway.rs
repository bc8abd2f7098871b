//! Gateway Pipeline (C6).
//!
//! Orchestrates authenticate → classify-plan → admit → select → forward →
//! record for a single proxied request. Owns no state of its own beyond
//! handles to the collaborators it calls; step ordering below is
//! contractual (the side effects are observable in this order).

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::backend::BackendClient;
use crate::clock::Clock;
use crate::error::{GatewayError, Result};
use crate::kv::KvStore;
use crate::metrics::MetricsRecorder;
use crate::rate_limiter::TokenBucketLimiter;
use crate::round_robin::{RoundRobinSelector, ServiceRegistry};

/// Refresh TTL for the plan assignment read during plan resolution.
const PLAN_ASSIGNMENT_TTL: Duration = Duration::from_secs(86_400);

pub struct GatewayPipeline {
    kv: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
    limiter: TokenBucketLimiter,
    selector: RoundRobinSelector,
    backend: BackendClient,
    metrics: MetricsRecorder,
}

impl GatewayPipeline {
    pub fn new(
        kv: Arc<dyn KvStore>,
        clock: Arc<dyn Clock>,
        limiter: TokenBucketLimiter,
        selector: RoundRobinSelector,
        backend: BackendClient,
        metrics: MetricsRecorder,
    ) -> Self {
        Self {
            kv,
            clock,
            limiter,
            selector,
            backend,
            metrics,
        }
    }

    pub fn services(&self) -> &ServiceRegistry {
        self.selector.registry()
    }

    pub fn metrics(&self) -> &MetricsRecorder {
        &self.metrics
    }

    /// Resolves the bucket key and plan name for this request.
    ///
    /// An `X-Client-ID` header that differs from the authenticated
    /// principal is a surrogate id (used by the synthetic traffic
    /// generator): it is classified by prefix rather than looked up,
    /// deliberately bypassing the authenticated plan assignment. Anyone
    /// with a valid bearer token can set this header, so a hardened
    /// deployment should gate it behind an admin-scoped credential.
    async fn resolve_plan(&self, principal: &str, client_header: Option<&str>) -> Result<(String, String)> {
        match client_header {
            Some(client_id) if client_id != principal => {
                let plan = if client_id.starts_with("premium_") {
                    "premium"
                } else {
                    "basic"
                };
                Ok((client_id.to_string(), plan.to_string()))
            }
            _ => {
                let plan = self
                    .kv
                    .get(&format!("user:{principal}:plan"))
                    .await?
                    .unwrap_or_else(|| "basic".to_string());
                Ok((principal.to_string(), plan))
            }
        }
    }

    /// Runs the full admission-and-dispatch pipeline for one request.
    pub async fn proxy(
        &self,
        service: &str,
        principal: &str,
        client_header: Option<&str>,
    ) -> Result<(u16, serde_json::Value)> {
        let request_id = Uuid::new_v4();

        // Step 1: unknown service fails before anything else is touched —
        // no bucket is created, no plan/service/instance metric moves.
        if !self.selector.registry().contains(service) {
            return Err(GatewayError::InvalidService);
        }

        // Steps 2-3: resolve client id and plan.
        let (client_id, plan) = self.resolve_plan(principal, client_header).await?;
        let bucket_key = format!("{client_id}:bucket");

        tracing::debug!(%request_id, %service, %client_id, %plan, "admitting request");

        // Step 4: admission. A denial is charged for the attempt and
        // never refunded, even if the backend call that follows fails —
        // refunding would enable replay amplification.
        let admitted = self.limiter.admit(&bucket_key, &plan, 1).await?;
        if !admitted {
            self.metrics.record_status(429).await?;
            return Err(GatewayError::RateLimited);
        }

        // Step 5: pick an instance and record the pick regardless of
        // whether the backend call that follows succeeds.
        let (idx, url) = self.selector.pick(service).await?;
        self.metrics.record_instance(service, idx).await?;

        // Step 6: forward. No lock is held across this suspension point.
        let t0 = self.clock.now();
        let outcome = self.backend.get(&format!("{url}/data")).await;
        let latency = self.clock.now() - t0;

        // Step 7: record service/status/latency whether or not the
        // backend call succeeded — a connection failure still counts
        // against the service and instance it was attempted on.
        self.metrics.record_service(service).await?;
        self.metrics.record_latency(service, latency).await?;

        match outcome {
            Ok((status, body)) => {
                self.metrics.record_status(status).await?;
                Ok((status, body))
            }
            Err(err) => {
                self.metrics.record_status(500).await?;
                tracing::warn!(%request_id, %service, %url, error = %err, "backend call failed");
                Err(err)
            }
        }
    }

    /// Sets a principal's plan assignment (the `PUT /user/plan/{plan}`
    /// collaborator endpoint). Not itself part of the admission core, but
    /// lives here because it writes the same key [`GatewayPipeline::proxy`] reads.
    pub async fn set_plan(&self, principal: &str, plan: &str) -> Result<()> {
        self.kv
            .set(&format!("user:{principal}:plan"), plan, Some(PLAN_ASSIGNMENT_TTL))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::TestClock;
    use crate::kv::InMemoryKvStore;
    use crate::plan::PlanRegistry;
    use std::collections::HashMap;

    fn pipeline(clock: Arc<TestClock>) -> GatewayPipeline {
        let kv: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        let metrics = MetricsRecorder::new(kv.clone());
        let limiter = TokenBucketLimiter::new(kv.clone(), clock.clone(), metrics.clone(), PlanRegistry::standard());

        let mut services = HashMap::new();
        services.insert("light".to_string(), vec!["http://u1".to_string(), "http://u2".to_string()]);
        let selector = RoundRobinSelector::new(kv.clone(), ServiceRegistry::new(services));

        let backend = BackendClient::new(Duration::from_secs(1)).unwrap();
        GatewayPipeline::new(kv, clock, limiter, selector, backend, metrics)
    }

    #[tokio::test]
    async fn unknown_service_is_rejected_before_admission() {
        let clock = Arc::new(TestClock::new(0.0));
        let gw = pipeline(clock);
        let err = gw.proxy("medium", "alice", None).await.unwrap_err();
        assert!(matches!(err, GatewayError::InvalidService));

        let report = gw
            .metrics
            .report(&PlanRegistry::standard(), gw.services())
            .await
            .unwrap();
        let total_plan: i64 = report.plans.values().map(|c| c.allowed + c.blocked).sum();
        assert_eq!(total_plan, 0);
    }

    #[tokio::test]
    async fn header_override_uses_surrogate_plan_and_bucket() {
        // Scenario 4: alice (basic) overrides with X-Client-ID premium_42;
        // 10 rapid requests all succeed against a distinct bucket.
        let clock = Arc::new(TestClock::new(0.0));
        let gw = pipeline(clock.clone());

        gw.set_plan("alice", "basic").await.unwrap();

        for _ in 0..10 {
            let (client_id, plan) = gw.resolve_plan("alice", Some("premium_42")).await.unwrap();
            assert_eq!(client_id, "premium_42");
            assert_eq!(plan, "premium");
        }

        let admitted = gw.limiter.admit("premium_42:bucket", "premium", 1).await.unwrap();
        assert!(admitted);

        // alice's own bucket was never created.
        let alice_bucket: Arc<dyn KvStore> = gw.kv.clone();
        assert!(!alice_bucket.exists("alice:bucket").await.unwrap());
    }

    #[tokio::test]
    async fn backend_failure_is_reported_as_500_and_recorded() {
        let clock = Arc::new(TestClock::new(0.0));
        let kv: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        let metrics = MetricsRecorder::new(kv.clone());
        let limiter = TokenBucketLimiter::new(kv.clone(), clock.clone(), metrics.clone(), PlanRegistry::standard());

        let mut services = HashMap::new();
        // Port 1 is reserved and refuses connections, simulating a dead backend.
        services.insert("heavy".to_string(), vec!["http://127.0.0.1:1".to_string()]);
        let selector = RoundRobinSelector::new(kv.clone(), ServiceRegistry::new(services));
        let backend = BackendClient::new(Duration::from_millis(500)).unwrap();
        let gw = GatewayPipeline::new(kv, clock, limiter, selector, backend, metrics);

        let err = gw.proxy("heavy", "bob", None).await.unwrap_err();
        assert!(matches!(err, GatewayError::BackendUnavailable(_)));

        let report = gw.metrics.report(&PlanRegistry::standard(), gw.services()).await.unwrap();
        assert_eq!(report.status["500"], 1);
        assert_eq!(report.services["heavy"], 1);
        assert_eq!(report.instances["heavy-0"], 1);
    }
}
