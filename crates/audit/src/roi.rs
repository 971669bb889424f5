//! Rule-based ROI audit. Runs a fixed battery of checks over the current
//! arm set and platform configuration, and rolls the findings up into a
//! single health score.

use adpilot_core::types::{Arm, Goal, InventoryStatus, Issue, IssueScope, Platform, Severity};

/// Whether each platform's higher-quality conversion tracking is turned on.
/// Missing either one is itself an issue, not just a data-quality footnote.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlatformTrackingConfig {
    pub social_capi_enabled: bool,
    pub search_enhanced_conversions_enabled: bool,
}

pub struct AuditReport {
    pub issues: Vec<Issue>,
    pub health_score: f64,
    pub critical_count: usize,
    pub recommendations: Vec<String>,
}

/// Run the full rule battery over `arms` for the given optimization `goal`.
pub fn run_audit(arms: &[Arm], goal: Goal, tracking: PlatformTrackingConfig) -> AuditReport {
    let mut issues = Vec::new();

    for arm in arms {
        if arm.spend > 0.0 && arm.conversions == 0 {
            issues.push(Issue {
                kind: "missing_conversions".to_string(),
                severity: Severity::Critical,
                description: format!("Arm {} has ${:.2} spend but zero conversions", arm.id, arm.spend),
                scope: IssueScope::Arms(vec![arm.id.clone()]),
                recommendation: "Check conversion tracking setup, verify pixels are firing".to_string(),
                estimated_impact: Some("High - smart bidding cannot optimize without conversion data".to_string()),
            });
        }

        if arm.conversions > 0 && arm.conversions < 10 && arm.spend > 100.0 {
            issues.push(Issue {
                kind: "low_conversion_volume".to_string(),
                severity: Severity::High,
                description: format!(
                    "Arm {} has only {} conversions with ${:.2} spend",
                    arm.id, arm.conversions, arm.spend
                ),
                scope: IssueScope::Arms(vec![arm.id.clone()]),
                recommendation: "Increase conversion volume or extend the time window for data collection".to_string(),
                estimated_impact: Some("Medium - bidding algorithms need more data for reliable optimization".to_string()),
            });
        }

        if arm.roas() < 0.5 && arm.spend > 500.0 {
            issues.push(Issue {
                kind: "negative_roas".to_string(),
                severity: Severity::High,
                description: format!("Arm {} has ROAS of {:.2} (spending ${:.2})", arm.id, arm.roas(), arm.spend),
                scope: IssueScope::Platform(arm.platform),
                recommendation: "Review campaign targeting, creatives, or consider pausing".to_string(),
                estimated_impact: Some("High - wasting ad spend".to_string()),
            });
        }

        if goal == Goal::Ltv && arm.ltv.is_none() {
            issues.push(Issue {
                kind: "missing_ltv_data".to_string(),
                severity: Severity::Medium,
                description: format!("Arm {} missing LTV data but optimizing for LTV", arm.id),
                scope: IssueScope::Platform(arm.platform),
                recommendation: "Set up LTV tracking or switch the optimization goal to ROAS".to_string(),
                estimated_impact: Some("Medium - cannot optimize for LTV without LTV data".to_string()),
            });
        }

        if goal == Goal::Profit && arm.profit_margin.is_none() {
            issues.push(Issue {
                kind: "missing_profit_margin".to_string(),
                severity: Severity::Medium,
                description: format!("Arm {} missing profit margin but optimizing for profit", arm.id),
                scope: IssueScope::Platform(arm.platform),
                recommendation: "Add profit margin data or switch the optimization goal to ROAS".to_string(),
                estimated_impact: Some("Medium - cannot optimize for profit without margin data".to_string()),
            });
        }

        if arm.inventory_status == Some(InventoryStatus::OutOfStock) && arm.spend > 0.0 {
            issues.push(Issue {
                kind: "out_of_stock_campaign".to_string(),
                severity: Severity::High,
                description: format!("Arm {} is out of stock but still spending", arm.id),
                scope: IssueScope::Platform(arm.platform),
                recommendation: "Pause the campaign or update its inventory status".to_string(),
                estimated_impact: Some("High - wasting spend on unavailable products".to_string()),
            });
        }
    }

    if !tracking.social_capi_enabled {
        issues.push(Issue {
            kind: "missing_capi".to_string(),
            severity: Severity::High,
            description: "Social Conversions API (CAPI) not enabled".to_string(),
            scope: IssueScope::Platform(Platform::Social),
            recommendation: "Set up the Conversions API for better tracking and optimization".to_string(),
            estimated_impact: Some("High - better conversion tracking improves bidding".to_string()),
        });
    }

    if !tracking.search_enhanced_conversions_enabled {
        issues.push(Issue {
            kind: "missing_enhanced_conversions".to_string(),
            severity: Severity::High,
            description: "Search Enhanced Conversions not enabled".to_string(),
            scope: IssueScope::Platform(Platform::Search),
            recommendation: "Enable Enhanced Conversions for better conversion matching".to_string(),
            estimated_impact: Some("High - better conversion matching improves bidding".to_string()),
        });
    }

    let critical_count = issues.iter().filter(|i| i.severity == Severity::Critical).count();
    let high_count = issues.iter().filter(|i| i.severity == Severity::High).count();
    let medium_count = issues.iter().filter(|i| i.severity == Severity::Medium).count();

    let health_score = (100.0 - (critical_count * 20 + high_count * 10 + medium_count * 5) as f64).max(0.0);

    let mut recommendations = Vec::new();
    if critical_count > 0 {
        recommendations.push(format!("Fix {critical_count} critical issue(s) immediately"));
    }
    if high_count > 0 {
        recommendations.push(format!("Address {high_count} high-priority issue(s)"));
    }
    if !tracking.social_capi_enabled {
        recommendations.push("Set up the social Conversions API for better tracking".to_string());
    }
    if !tracking.search_enhanced_conversions_enabled {
        recommendations.push("Enable search Enhanced Conversions".to_string());
    }

    AuditReport {
        issues,
        health_score,
        critical_count,
        recommendations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arm(id: &str, spend: f64, conversions: u64, revenue: f64) -> Arm {
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
            current_daily_budget: None,
        }
    }

    fn tracking_enabled() -> PlatformTrackingConfig {
        PlatformTrackingConfig {
            social_capi_enabled: true,
            search_enhanced_conversions_enabled: true,
        }
    }

    #[test]
    fn spend_with_zero_conversions_is_critical() {
        let arms = vec![arm("a", 200.0, 0, 0.0)];
        let report = run_audit(&arms, Goal::Roas, tracking_enabled());
        assert!(report.issues.iter().any(|i| i.kind == "missing_conversions" && i.severity == Severity::Critical));
        assert_eq!(report.critical_count, 1);
    }

    #[test]
    fn low_conversion_volume_requires_spend_over_100() {
        let arms = vec![arm("a", 50.0, 3, 100.0)];
        let report = run_audit(&arms, Goal::Roas, tracking_enabled());
        assert!(!report.issues.iter().any(|i| i.kind == "low_conversion_volume"));

        let arms = vec![arm("a", 150.0, 3, 100.0)];
        let report = run_audit(&arms, Goal::Roas, tracking_enabled());
        assert!(report.issues.iter().any(|i| i.kind == "low_conversion_volume"));
    }

    #[test]
    fn negative_roas_requires_spend_over_500() {
        let arms = vec![arm("a", 600.0, 20, 100.0)]; // roas = 0.167
        let report = run_audit(&arms, Goal::Roas, tracking_enabled());
        assert!(report.issues.iter().any(|i| i.kind == "negative_roas"));
    }

    #[test]
    fn missing_ltv_only_flagged_when_optimizing_for_ltv() {
        let arms = vec![arm("a", 600.0, 20, 2000.0)];
        let report = run_audit(&arms, Goal::Roas, tracking_enabled());
        assert!(!report.issues.iter().any(|i| i.kind == "missing_ltv_data"));

        let report = run_audit(&arms, Goal::Ltv, tracking_enabled());
        assert!(report.issues.iter().any(|i| i.kind == "missing_ltv_data"));
    }

    #[test]
    fn health_score_formula_matches_weighted_penalty() {
        // one critical (20), one high (10) -> 100 - 30 = 70
        let arms = vec![arm("a", 200.0, 0, 0.0), arm("b", 600.0, 20, 100.0)];
        let tracking = tracking_enabled();
        let report = run_audit(&arms, Goal::Roas, tracking);
        assert!((report.health_score - 70.0).abs() < 1e-9);
    }

    #[test]
    fn health_score_never_drops_below_zero() {
        let arms: Vec<Arm> = (0..20).map(|i| arm(&format!("a{i}"), 1000.0, 0, 0.0)).collect();
        let report = run_audit(&arms, Goal::Roas, tracking_enabled());
        assert!(report.health_score >= 0.0);
    }

    #[test]
    fn disabled_tracking_surfaces_platform_issues() {
        let report = run_audit(&[], Goal::Roas, PlatformTrackingConfig::default());
        assert!(report.issues.iter().any(|i| i.kind == "missing_capi"));
        assert!(report.issues.iter().any(|i| i.kind == "missing_enhanced_conversions"));
    }
}
