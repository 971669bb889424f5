//! Deterministic score-proportional allocation. No RNG, no shared state —
//! the fallback path when a bandit strategy is not requested or not yet
//! warmed up.

use adpilot_core::types::{Allocation, Arm, Goal};
use adpilot_scoring::score_arm;

/// Allocate `total_budget` across `arms` in proportion to their score,
/// clamping each arm's change to `max_change_ratio` of its current budget.
///
/// 1. Score every arm.
/// 2. If every score is zero, split the budget evenly.
/// 3. Otherwise assign `total_budget * score / sum(scores)` to each arm.
/// 4. Clamp the proposed new budget to `current * (1 +/- max_change_ratio)`,
///    floored at 0. No renormalization afterwards — the clamp envelope is
///    the contract, not the total.
pub fn proportional_fallback(
    arms: &[Arm],
    total_budget: f64,
    goal: Goal,
    min_conversions: u64,
    max_change_ratio: f64,
) -> Vec<Allocation> {
    if arms.is_empty() {
        return Vec::new();
    }

    let scores: Vec<f64> = arms
        .iter()
        .map(|arm| score_arm(arm, goal, min_conversions))
        .collect();
    let score_sum: f64 = scores.iter().sum();

    allocate_by_weights(arms, total_budget, &scores, max_change_ratio, |score, hit_ceiling, hit_floor| {
        if hit_ceiling {
            format!("change capped at +{:.0}% of current budget", max_change_ratio * 100.0)
        } else if hit_floor {
            format!("change capped at -{:.0}% of current budget", max_change_ratio * 100.0)
        } else if score_sum <= 0.0 {
            "no arm has a positive score, splitting budget evenly".to_string()
        } else {
            format!("allocated proportional to score {:.3}", score)
        }
    })
}

/// Raw `total_budget * weight / sum(weights)` per arm, falling back to an
/// even split when every weight is non-positive. No clamping — this is the
/// share step shared by the clamped (proportional) and unclamped (bandit)
/// paths.
fn weighted_shares(arms_len: usize, total_budget: f64, weights: &[f64]) -> Vec<f64> {
    let weight_sum: f64 = weights.iter().sum();
    if weight_sum <= 0.0 {
        vec![total_budget / arms_len as f64; arms_len]
    } else {
        weights.iter().map(|w| total_budget * w / weight_sum).collect()
    }
}

/// Share `total_budget` by `weights`, then clamp each arm's share to
/// `current * (1 +/- max_change_ratio)`, floored at 0. Matches the
/// proportional fallback's four steps exactly: no renormalization after
/// the clamp, so the allocations no longer sum to `total_budget` once any
/// arm's clamp binds.
pub(crate) fn allocate_by_weights(
    arms: &[Arm],
    total_budget: f64,
    weights: &[f64],
    max_change_ratio: f64,
    reason_fn: impl Fn(f64, bool, bool) -> String,
) -> Vec<Allocation> {
    if arms.is_empty() {
        return Vec::new();
    }

    let raw_targets = weighted_shares(arms.len(), total_budget, weights);

    arms.iter()
        .zip(weights.iter())
        .zip(raw_targets.iter())
        .map(|((arm, &score), &target)| {
            let current = arm.effective_current_budget();
            let (new_budget, hit_ceiling, hit_floor) = if current <= 0.0 {
                (target.max(0.0), false, false)
            } else {
                let floor = (current * (1.0 - max_change_ratio)).max(0.0);
                let ceiling = current * (1.0 + max_change_ratio);
                (target.clamp(floor, ceiling), target > ceiling, target < floor)
            };
            let change_percentage = if current > 0.0 {
                100.0 * (new_budget - current) / current
            } else {
                0.0
            };

            Allocation {
                arm_id: arm.id.clone(),
                platform: arm.platform,
                current_budget: current,
                new_budget,
                change_percentage,
                score,
                reason: reason_fn(score, hit_ceiling, hit_floor),
            }
        })
        .collect()
}

/// Share `total_budget` by `weights` with no clamp at all. Every bandit
/// strategy routes through this — spec.md §4.C.2 has all bandit paths
/// bypass the change-ratio clamp by design, since they are expected to
/// produce exploration-capable swings; the proportional fallback above is
/// the only path that clamps.
pub(crate) fn allocate_unclamped_by_weights(
    arms: &[Arm],
    total_budget: f64,
    weights: &[f64],
    reason_fn: impl Fn(f64) -> String,
) -> Vec<Allocation> {
    if arms.is_empty() {
        return Vec::new();
    }

    let targets = weighted_shares(arms.len(), total_budget, weights);

    arms.iter()
        .zip(weights.iter())
        .zip(targets.iter())
        .map(|((arm, &score), &new_budget)| {
            let current = arm.effective_current_budget();
            let change_percentage = if current > 0.0 {
                100.0 * (new_budget - current) / current
            } else {
                0.0
            };

            Allocation {
                arm_id: arm.id.clone(),
                platform: arm.platform,
                current_budget: current,
                new_budget,
                change_percentage,
                score,
                reason: reason_fn(score),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use adpilot_core::types::Platform;

    fn arm(id: &str, current_budget: f64, spend: f64, revenue: f64, conversions: u64) -> Arm {
        Arm {
            platform: Platform::Social,
            id: id.to_string(),
            campaign_id: id.to_string(),
            campaign_name: "test".into(),
            date: None,
            spend,
            revenue,
            conversions,
            clicks: 100,
            impressions: 5000,
            ltv: None,
            profit_margin: None,
            inventory_status: None,
            audience_quality_score: None,
            days_active: None,
            current_daily_budget: Some(current_budget),
        }
    }

    #[test]
    fn two_equally_performing_arms_split_evenly() {
        let arms = vec![
            arm("a", 100.0, 100.0, 300.0, 20),
            arm("b", 100.0, 100.0, 300.0, 20),
        ];
        let allocations = proportional_fallback(&arms, 200.0, Goal::Roas, 10, 0.3);
        assert_eq!(allocations.len(), 2);
        for alloc in &allocations {
            assert!((alloc.new_budget - 100.0).abs() < 1e-6);
        }
    }

    #[test]
    fn raw_shares_sum_to_total_budget_when_no_clamp_binds() {
        // scores are close enough, and current budgets wide enough, that no
        // arm's +/-30% envelope binds -- this exercises the unclamped
        // conservation guarantee from step 3, not the clamp step.
        let arms = vec![
            arm("a", 100.0, 100.0, 110.0, 20),
            arm("b", 100.0, 100.0, 100.0, 20),
            arm("c", 100.0, 100.0, 105.0, 20),
        ];
        let allocations = proportional_fallback(&arms, 300.0, Goal::Roas, 10, 0.3);
        for alloc in &allocations {
            assert!(alloc.new_budget >= 70.0 && alloc.new_budget <= 130.0, "clamp should not have bound");
        }
        let total: f64 = allocations.iter().map(|a| a.new_budget).sum();
        assert!((total - 300.0).abs() < 1e-6);
    }

    #[test]
    fn change_ratio_clamps_to_the_true_envelope() {
        let arms = vec![
            arm("a", 100.0, 100.0, 5000.0, 20), // very high score, would want a big jump
            arm("b", 100.0, 100.0, 100.0, 20),
        ];
        let allocations = proportional_fallback(&arms, 200.0, Goal::Roas, 10, 0.3);
        let a = allocations.iter().find(|x| x.arm_id == "a").unwrap();
        // the raw share wants far more than the envelope allows, so the
        // clamp must land exactly on the ceiling -- no renormalization
        // afterwards to push it back out.
        assert!((a.new_budget - 130.0).abs() < 1e-9);
    }

    #[test]
    fn empty_arm_list_yields_no_allocations() {
        let allocations = proportional_fallback(&[], 100.0, Goal::Roas, 10, 0.3);
        assert!(allocations.is_empty());
    }

    #[test]
    fn all_zero_scores_split_evenly() {
        let arms = vec![
            arm("a", 100.0, 100.0, 0.0, 20),
            arm("b", 100.0, 100.0, 0.0, 20),
        ];
        let allocations = proportional_fallback(&arms, 200.0, Goal::Roas, 10, 0.3);
        for alloc in &allocations {
            assert!((alloc.new_budget - 100.0).abs() < 1e-6);
            assert!(alloc.reason.contains("evenly"));
        }
    }
}
