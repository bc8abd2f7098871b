//! Token bucket state (part of the C3 data model) and the pure refill/
//! consume arithmetic spec'd for the limiter.
//!
//! This module only knows about numbers: storage, clock injection and
//! metrics recording belong to [`crate::rate_limiter`], which is the
//! thing that actually talks to the KV store.

use serde::{Deserialize, Serialize};

/// Per-key rate-limiter state: `tokens` and `last_refill`, both in
/// floating point so fractional-second elapsed time composes cleanly.
/// `tokens` is always integral in practice (capacities and
/// `tokens_required` are integers and refill is floored), but stored as
/// `f64` to avoid a cast at every call site.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Bucket {
    pub tokens: f64,
    pub last_refill: f64,
}

impl Bucket {
    /// A freshly observed key starts full.
    pub fn new_full(capacity: u64, now: f64) -> Self {
        Self {
            tokens: capacity as f64,
            last_refill: now,
        }
    }

    /// Applies elapsed-time refill in place.
    ///
    /// Replenishment is `floor(elapsed * refill_rate)` — tokens accrue in
    /// discrete units, and the fractional remainder is discarded because
    /// `last_refill` advances all the way to `now` regardless. This is a
    /// deliberate, slightly conservative bias, not a precision bug: a
    /// client cannot bank a fractional token by polling faster.
    ///
    /// `elapsed` is clamped to zero so a clock regression never produces
    /// negative replenishment.
    pub fn refill(&mut self, capacity: u64, refill_rate: f64, now: f64) {
        let elapsed = (now - self.last_refill).max(0.0);
        let replenished = (elapsed * refill_rate).floor();
        self.tokens = (self.tokens + replenished).min(capacity as f64);
        self.last_refill = now;
    }

    /// Attempts to consume `tokens_required`, assuming `refill` has
    /// already been applied for the current instant.
    ///
    /// A non-positive `tokens_required` always admits without consuming
    /// anything — the caller still gets the refreshed bucket written back.
    pub fn try_consume(&mut self, tokens_required: i64) -> bool {
        if tokens_required <= 0 {
            return true;
        }
        let required = tokens_required as f64;
        if self.tokens >= required {
            self.tokens -= required;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_bucket_starts_full() {
        let b = Bucket::new_full(5, 100.0);
        assert_eq!(b.tokens, 5.0);
        assert_eq!(b.last_refill, 100.0);
    }

    #[test]
    fn refill_floors_replenishment() {
        let mut b = Bucket {
            tokens: 0.0,
            last_refill: 0.0,
        };
        // 2.9s at rate 1/s -> floor(2.9) = 2 tokens, not 2.9.
        b.refill(5, 1.0, 2.9);
        assert_eq!(b.tokens, 2.0);
    }

    #[test]
    fn refill_caps_at_capacity() {
        let mut b = Bucket {
            tokens: 4.0,
            last_refill: 0.0,
        };
        b.refill(5, 1.0, 100.0);
        assert_eq!(b.tokens, 5.0);
    }

    #[test]
    fn clock_regression_is_treated_as_zero_elapsed() {
        let mut b = Bucket {
            tokens: 2.0,
            last_refill: 100.0,
        };
        b.refill(5, 1.0, 90.0);
        assert_eq!(b.tokens, 2.0);
        assert_eq!(b.last_refill, 90.0);
    }

    #[test]
    fn consume_denies_when_insufficient() {
        let mut b = Bucket {
            tokens: 0.5,
            last_refill: 0.0,
        };
        assert!(!b.try_consume(1));
        assert_eq!(b.tokens, 0.5);
    }

    #[test]
    fn non_positive_required_always_admits_without_consuming() {
        let mut b = Bucket {
            tokens: 0.0,
            last_refill: 0.0,
        };
        assert!(b.try_consume(0));
        assert_eq!(b.tokens, 0.0);
        assert!(b.try_consume(-3));
        assert_eq!(b.tokens, 0.0);
    }
}
