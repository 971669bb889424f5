#![warn(clippy::unwrap_used)]

//! Turns scored arms into a budget allocation. Three families of strategy:
//! an external oracle (if configured), a set of bandit algorithms backed by
//! learned per-arm performance, and a deterministic proportional fallback
//! that needs no history at all.

pub mod bandits;
pub mod oracle;
pub mod performance;
pub mod proportional;

pub use bandits::BanditStrategy;
pub use oracle::{AllocatorOracle, NullOracle, OracleError};
pub use performance::{ArmPerformance, PerformanceTracker};
pub use proportional::proportional_fallback;

use adpilot_core::types::{Allocation, Arm, Goal};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AllocationStrategy {
    Proportional,
    Bandit(BanditStrategy),
}

#[derive(Debug, Clone, Copy)]
pub struct AllocatorConfig {
    pub goal: Goal,
    pub min_conversions: u64,
    pub max_change_ratio: f64,
    pub strategy: AllocationStrategy,
}

/// Owns the per-arm learning state and an optional external oracle. One
/// instance per account is enough — it has no notion of which account it
/// belongs to, that's the optimization loop's job.
pub struct Allocator {
    performance: PerformanceTracker,
    oracle: Option<Box<dyn AllocatorOracle>>,
}

impl Allocator {
    pub fn new() -> Self {
        Self {
            performance: PerformanceTracker::new(),
            oracle: None,
        }
    }

    pub fn with_oracle(oracle: Box<dyn AllocatorOracle>) -> Self {
        Self {
            performance: PerformanceTracker::new(),
            oracle: Some(oracle),
        }
    }

    /// Allocate `total_budget` across `arms`. Tries the oracle first if one
    /// is configured; an oracle failure or absence falls through to the
    /// locally configured strategy, it never surfaces as a cycle error.
    pub fn allocate(&self, arms: &[Arm], total_budget: f64, config: &AllocatorConfig) -> Vec<Allocation> {
        if let Some(oracle) = &self.oracle {
            match oracle.allocate(arms, total_budget, config.goal) {
                Ok(allocations) => return allocations,
                Err(err) => warn!(%err, "allocation oracle declined, falling back to local strategy"),
            }
        }

        match config.strategy {
            AllocationStrategy::Proportional => proportional_fallback(
                arms,
                total_budget,
                config.goal,
                config.min_conversions,
                config.max_change_ratio,
            ),
            AllocationStrategy::Bandit(strategy) => {
                bandits::allocate(&self.performance, arms, total_budget, config.goal, strategy)
            }
        }
    }

    pub fn performance_snapshot(&self, arm_id: &str) -> Option<ArmPerformance> {
        self.performance.get(arm_id)
    }

    /// Discard all learned per-arm state. Callers must hold the per-account
    /// lock while this runs, since a concurrent allocate() call would
    /// otherwise race a partially-cleared tracker.
    pub fn reset_performance(&self) {
        self.performance.reset();
    }
}

impl Default for Allocator {
    fn default() -> Self {
        Self::new()
    }
}
