//! Injectable time source for the token-bucket limiter.
//!
//! The limiter never reads the wall clock directly; it goes through this
//! trait so tests can advance time deterministically instead of sleeping.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Monotonic-enough wall-clock source, in fractional seconds since epoch.
pub trait Clock: Send + Sync {
    fn now(&self) -> f64;
}

/// Production clock backed by `SystemTime`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64()
    }
}

/// Settable clock for deterministic property tests.
///
/// Stores seconds as fixed-point (micros) in an `AtomicU64` so the clock can
/// be shared across threads and advanced from outside the limiter.
pub struct TestClock {
    micros: AtomicU64,
}

impl TestClock {
    pub fn new(start_seconds: f64) -> Self {
        Self {
            micros: AtomicU64::new((start_seconds * 1_000_000.0) as u64),
        }
    }

    pub fn advance(&self, seconds: f64) {
        let delta = (seconds * 1_000_000.0) as u64;
        self.micros.fetch_add(delta, Ordering::SeqCst);
    }

    pub fn set(&self, seconds: f64) {
        self.micros
            .store((seconds * 1_000_000.0) as u64, Ordering::SeqCst);
    }
}

impl Clock for TestClock {
    fn now(&self) -> f64 {
        self.micros.load(Ordering::SeqCst) as f64 / 1_000_000.0
    }
}

impl Default for TestClock {
    fn default() -> Self {
        Self::new(0.0)
    }
}
