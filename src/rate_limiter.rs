//! Token-Bucket Limiter (C3): the per-key admission decision.
//!
//! This is the core of the gateway. It composes the pure arithmetic in
//! [`crate::token_bucket`] with the KV store and clock to make an
//! admission decision, and records the outcome via the metrics recorder.
//!
//! ## Concurrency
//!
//! `admit` does not lock. Two concurrent calls for the same key can both
//! read the same pre-state and both write back, so one decrement can be
//! lost, or a late writer can observe a stale refill. Both anomalies are
//! conservative (favor the limiter, bounded by plan capacity) and are an
//! accepted tradeoff for not holding a lock across the KV round trips —
//! see the module docs on [`crate::kv`] for the underlying contract. The
//! plan-metrics counter itself never loses an update because `incr` is
//! atomic.

use std::sync::Arc;
use std::time::Duration;

use crate::clock::Clock;
use crate::error::{GatewayError, Result};
use crate::kv::KvStore;
use crate::metrics::MetricsRecorder;
use crate::plan::PlanRegistry;
use crate::token_bucket::Bucket;

/// Inactivity TTL for a bucket key (spec: 3600s), refreshed on every write.
const BUCKET_TTL: Duration = Duration::from_secs(3600);

pub struct TokenBucketLimiter {
    kv: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
    metrics: MetricsRecorder,
    plans: PlanRegistry,
}

impl TokenBucketLimiter {
    pub fn new(
        kv: Arc<dyn KvStore>,
        clock: Arc<dyn Clock>,
        metrics: MetricsRecorder,
        plans: PlanRegistry,
    ) -> Self {
        Self {
            kv,
            clock,
            metrics,
            plans,
        }
    }

    /// Decides whether `key` may proceed, consuming `tokens_required`
    /// tokens from its bucket if so.
    ///
    /// `key` is the fully-formed bucket key (e.g. `"<client_id>:bucket"`);
    /// this method does not add its own suffix. `plan` is resolved by name
    /// against the process-wide registry — an unrecognized plan is the
    /// caller's mistake and fails loudly rather than falling back to a
    /// default.
    pub async fn admit(&self, key: &str, plan: &str, tokens_required: i64) -> Result<bool> {
        let plan = self.plans.get(plan).ok_or(GatewayError::InvalidPlan)?;

        let now = self.clock.now();
        let mut bucket = match self.kv.get(key).await? {
            Some(raw) => serde_json::from_str(&raw).unwrap_or_else(|_| Bucket::new_full(plan.capacity, now)),
            None => Bucket::new_full(plan.capacity, now),
        };

        bucket.refill(plan.capacity, plan.refill_rate, now);
        let allowed = bucket.try_consume(tokens_required);

        let encoded = serde_json::to_string(&bucket)?;
        self.kv.set(key, &encoded, Some(BUCKET_TTL)).await?;

        if allowed {
            self.metrics.record_plan_allowed(plan.name).await?;
        } else {
            self.metrics.record_plan_blocked(plan.name).await?;
        }

        Ok(allowed)
    }
}
