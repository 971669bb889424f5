//! Per-arm learning state shared across allocation cycles.

use adpilot_core::types::{Arm, Goal};
use dashmap::DashMap;

/// Exponential-moving-average performance record for one arm, keyed by
/// arm id. Created on first observation, updated in place thereafter.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArmPerformance {
    pub mean_reward: f64,
    pub variance: f64,
    pub pulls: u64,
    pub confidence_interval: f64,
}

impl ArmPerformance {
    /// `sqrt(variance/pulls)`, or `+inf` when the arm has never been pulled.
    pub fn standard_error(&self) -> f64 {
        if self.pulls == 0 {
            f64::INFINITY
        } else if self.variance > 0.0 {
            (self.variance / self.pulls as f64).sqrt()
        } else {
            0.0
        }
    }
}

const LEARNING_RATE: f64 = 0.1;
const Z_SCORE_95: f64 = 1.96;

/// Concurrent map of arm id -> `ArmPerformance`. The only shared mutable
/// state owned by the allocator (besides the per-account mutex registry one
/// layer up, in the optimization loop).
pub struct PerformanceTracker {
    state: DashMap<String, ArmPerformance>,
}

impl PerformanceTracker {
    pub fn new() -> Self {
        Self {
            state: DashMap::new(),
        }
    }

    /// Update (or seed) the performance record for `arm` using the reward
    /// for `goal`, and return the updated record.
    pub fn update(&self, arm: &Arm, goal: Goal) -> ArmPerformance {
        let reward = arm.reward(goal);

        let mut entry = self.state.entry(arm.id.clone()).or_insert_with(|| ArmPerformance {
            mean_reward: reward,
            variance: 0.0,
            pulls: 0,
            confidence_interval: 0.0,
        });

        if entry.pulls == 0 {
            entry.mean_reward = reward;
            entry.pulls = 1;
            return *entry;
        }

        let old_mean = entry.mean_reward;
        let new_mean = old_mean + LEARNING_RATE * (reward - old_mean);

        if entry.pulls > 1 {
            let variance_update = (reward - old_mean) * (reward - new_mean);
            entry.variance = (entry.variance * (entry.pulls - 1) as f64 + variance_update)
                / entry.pulls as f64;
        }

        entry.mean_reward = new_mean;
        entry.pulls += 1;

        if entry.pulls > 1 {
            entry.confidence_interval = Z_SCORE_95 * entry.standard_error();
        }

        *entry
    }

    pub fn get(&self, arm_id: &str) -> Option<ArmPerformance> {
        self.state.get(arm_id).map(|r| *r)
    }

    /// Clear all performance state. Must run before any concurrent
    /// allocation call for correctness — callers hold the per-account
    /// mutex while invoking this.
    pub fn reset(&self) {
        self.state.clear();
    }
}

impl Default for PerformanceTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adpilot_core::types::Platform;

    fn arm_with_reward(id: &str, spend: f64, revenue: f64) -> Arm {
        Arm {
            platform: Platform::Social,
            id: id.to_string(),
            campaign_id: id.to_string(),
            campaign_name: "test".into(),
            date: None,
            spend,
            revenue,
            conversions: 10,
            clicks: 100,
            impressions: 2000,
            ltv: None,
            profit_margin: None,
            inventory_status: None,
            audience_quality_score: None,
            days_active: None,
            current_daily_budget: None,
        }
    }

    #[test]
    fn first_observation_seeds_mean_with_pulls_one() {
        let tracker = PerformanceTracker::new();
        let arm = arm_with_reward("a", 100.0, 300.0);
        let perf = tracker.update(&arm, Goal::Roas);
        assert_eq!(perf.pulls, 1);
        assert!((perf.mean_reward - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn second_observation_applies_ema() {
        let tracker = PerformanceTracker::new();
        let arm = arm_with_reward("a", 100.0, 300.0);
        tracker.update(&arm, Goal::Roas);
        let arm2 = arm_with_reward("a", 100.0, 500.0); // roas = 5.0
        let perf = tracker.update(&arm2, Goal::Roas);
        // new_mean = 3.0 + 0.1*(5.0-3.0) = 3.2
        assert!((perf.mean_reward - 3.2).abs() < 1e-9);
        assert_eq!(perf.pulls, 2);
    }

    #[test]
    fn reset_clears_state() {
        let tracker = PerformanceTracker::new();
        let arm = arm_with_reward("a", 100.0, 300.0);
        tracker.update(&arm, Goal::Roas);
        tracker.reset();
        assert!(tracker.get("a").is_none());
    }

    #[test]
    fn standard_error_is_infinite_with_no_pulls() {
        let perf = ArmPerformance::default();
        assert!(perf.standard_error().is_infinite());
    }
}
