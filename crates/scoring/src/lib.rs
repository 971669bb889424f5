//! Pure scoring functions over arms. No I/O, no shared state — every
//! function here is a plain `(inputs) -> f64` that the allocator and
//! auditor both call.

use adpilot_core::types::{Arm, Goal, InventoryStatus};

/// Score an arm for a given optimization goal. Side-effect-free.
///
/// Under-sampled arms (fewer than `min_conversions`) always get an
/// exploration floor rather than a goal-based score — this is what keeps
/// new arms from being starved of budget before they have enough data to
/// judge.
pub fn score_arm(arm: &Arm, goal: Goal, min_conversions: u64) -> f64 {
    if arm.conversions < min_conversions {
        return if arm.impressions > 0 { 1.5 } else { 1.0 };
    }

    let base = match goal {
        Goal::Roas => arm.roas(),
        Goal::Profit => {
            if arm.profit_margin.is_some() {
                arm.profit_roas()
            } else {
                0.8 * arm.roas()
            }
        }
        Goal::Ltv => {
            if arm.ltv.is_some() {
                arm.ltv_roas()
            } else {
                1.2 * arm.roas()
            }
        }
        Goal::Cpa => {
            let cpa = arm.cpa();
            if cpa.is_finite() && cpa > 0.0 {
                1.0 / cpa
            } else {
                0.0
            }
        }
    };

    let mut score = base;
    match arm.inventory_status {
        Some(InventoryStatus::OutOfStock) => score *= 0.1,
        Some(InventoryStatus::LowStock) => score *= 0.7,
        _ => {}
    }
    if let Some(quality) = arm.audience_quality_score {
        score *= 0.5 + quality;
    }

    score.max(0.0)
}
