//! Plan Registry (C8).
//!
//! Plans are a closed set, loaded once at startup and never mutated. This
//! is a deliberate contrast to duck-typed lookups: an unrecognized plan
//! name is a hard error everywhere in the gateway, never a silent
//! fallback to a default.

use std::collections::HashMap;

/// Immutable `{name, capacity, refill_rate}` record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plan {
    pub name: &'static str,
    pub capacity: u64,
    pub refill_rate: f64,
}

/// Process-wide, read-only table of recognized plans.
#[derive(Debug, Clone)]
pub struct PlanRegistry {
    plans: HashMap<&'static str, Plan>,
}

impl PlanRegistry {
    /// The two plans the gateway ships with. `premium`'s capacity/rate
    /// match the surrogate-client scenario (10 rapid requests all admitted),
    /// which is more specific than the illustrative numbers the plan was
    /// originally sketched with.
    pub fn standard() -> Self {
        let mut plans = HashMap::new();
        plans.insert(
            "basic",
            Plan {
                name: "basic",
                capacity: 5,
                refill_rate: 1.0,
            },
        );
        plans.insert(
            "premium",
            Plan {
                name: "premium",
                capacity: 20,
                refill_rate: 5.0,
            },
        );
        Self { plans }
    }

    pub fn get(&self, name: &str) -> Option<Plan> {
        self.plans.get(name).copied()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.plans.keys().copied()
    }
}

impl Default for PlanRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
