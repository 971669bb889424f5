//! Core data model: arms, allocations, audit issues, and business events.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Which platform an arm belongs to. The optimizer only ever knows these two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Social,
    Search,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Social => "social",
            Platform::Search => "search",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InventoryStatus {
    InStock,
    LowStock,
    OutOfStock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Campaign,
    Adset,
    Ad,
    Account,
}

/// A date range for fetching insights: either a named preset or an explicit
/// `[start, end]` pair of ISO dates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeWindow {
    Yesterday,
    Last7d,
    Last30d,
    Range { start: String, end: String },
}

impl TimeWindow {
    /// Resolve a preset (or an unrecognized value) to an explicit
    /// `[start, end]` date pair. `today` is injected by the caller so this
    /// stays a pure function.
    pub fn resolve(&self, today: chrono::NaiveDate) -> (String, String) {
        use chrono::Duration;
        match self {
            TimeWindow::Range { start, end } => (start.clone(), end.clone()),
            TimeWindow::Yesterday => {
                let d = (today - Duration::days(1)).format("%Y-%m-%d").to_string();
                (d.clone(), d)
            }
            TimeWindow::Last7d => (
                (today - Duration::days(7)).format("%Y-%m-%d").to_string(),
                today.format("%Y-%m-%d").to_string(),
            ),
            TimeWindow::Last30d => (
                (today - Duration::days(30)).format("%Y-%m-%d").to_string(),
                today.format("%Y-%m-%d").to_string(),
            ),
        }
    }
}

/// The goal an optimization cycle is maximizing for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    Roas,
    Profit,
    Ltv,
    Cpa,
}

/// The unit of optimization: a single campaign or adset on one platform.
/// Immutable within a single allocation cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Arm {
    pub platform: Platform,
    pub id: String,
    pub campaign_id: String,
    pub campaign_name: String,
    pub date: Option<String>,

    pub spend: f64,
    pub revenue: f64,
    pub conversions: u64,
    pub clicks: u64,
    pub impressions: u64,

    pub ltv: Option<f64>,
    pub profit_margin: Option<f64>,
    pub inventory_status: Option<InventoryStatus>,
    pub audience_quality_score: Option<f64>,
    pub days_active: Option<u32>,
    pub current_daily_budget: Option<f64>,
}

impl Arm {
    /// Return on ad spend. Zero when nothing was spent.
    pub fn roas(&self) -> f64 {
        if self.spend > 0.0 {
            self.revenue / self.spend
        } else {
            0.0
        }
    }

    /// Cost per acquisition. `+inf` when there were no conversions.
    pub fn cpa(&self) -> f64 {
        if self.conversions > 0 {
            self.spend / self.conversions as f64
        } else {
            f64::INFINITY
        }
    }

    /// Click-through rate, expressed as a percentage.
    pub fn ctr(&self) -> f64 {
        if self.impressions > 0 {
            100.0 * self.clicks as f64 / self.impressions as f64
        } else {
            0.0
        }
    }

    /// Revenue net of cost of goods, using `profit_margin` (default 0.2).
    pub fn profit(&self) -> f64 {
        self.revenue * self.profit_margin.unwrap_or(0.2) - self.spend
    }

    pub fn profit_roas(&self) -> f64 {
        if self.spend > 0.0 {
            self.profit() / self.spend
        } else {
            0.0
        }
    }

    /// LTV-weighted ROAS. Falls back to plain ROAS when LTV is unknown or
    /// there were no conversions to weight it by.
    pub fn ltv_roas(&self) -> f64 {
        match self.ltv {
            Some(ltv) if self.conversions > 0 && self.spend > 0.0 => {
                (ltv * self.conversions as f64) / self.spend
            }
            _ => self.roas(),
        }
    }

    /// Whether this arm has enough volume for bidding algorithms (and this
    /// optimizer) to trust its numbers.
    pub fn has_sufficient_data(&self) -> bool {
        self.conversions >= 10 && self.impressions >= 1000
    }

    /// The reward value bandits and the scoring engine use for a given goal.
    pub fn reward(&self, goal: Goal) -> f64 {
        match goal {
            Goal::Roas => self.roas(),
            Goal::Profit => self.profit_roas(),
            Goal::Ltv => self.ltv_roas(),
            Goal::Cpa => {
                let cpa = self.cpa();
                if cpa.is_finite() && cpa > 0.0 {
                    1.0 / cpa
                } else {
                    0.0
                }
            }
        }
    }

    /// The budget base the allocator clamps against when `current_daily_budget`
    /// is unknown.
    pub fn effective_current_budget(&self) -> f64 {
        self.current_daily_budget.unwrap_or(self.spend)
    }
}

/// A single allocator output: what an arm's budget should become, and why.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Allocation {
    pub arm_id: String,
    pub platform: Platform,
    pub current_budget: f64,
    pub new_budget: f64,
    pub change_percentage: f64,
    pub score: f64,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn weight(&self) -> u32 {
        match self {
            Severity::Critical => 20,
            Severity::High => 10,
            Severity::Medium => 5,
            Severity::Low => 0,
        }
    }
}

/// Where an audit issue applies: a set of arms, or a whole platform's config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueScope {
    Arms(Vec<String>),
    Platform(Platform),
}

/// A single audit finding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub kind: String,
    pub severity: Severity,
    pub description: String,
    pub scope: IssueScope,
    pub recommendation: String,
    pub estimated_impact: Option<String>,
}

/// A raw business event fed to the signal classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessEvent {
    pub event_type: String,
    pub event_id: String,
    pub user_id: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub revenue: Option<f64>,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub product_id: Option<String>,
    pub subscription_id: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

fn default_currency() -> String {
    "USD".to_string()
}

/// Which platforms a signal-generation request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformTarget {
    Social,
    Search,
    Both,
}

impl PlatformTarget {
    pub fn platforms(&self) -> Vec<Platform> {
        match self {
            PlatformTarget::Social => vec![Platform::Social],
            PlatformTarget::Search => vec![Platform::Search],
            PlatformTarget::Both => vec![Platform::Social, Platform::Search],
        }
    }
}

/// A classified conversion event ready to upload to one platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformSignal {
    pub platform: Platform,
    pub event_name: String,
    pub event_id: String,
    pub value: f64,
    pub currency: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub user_data: HashMap<String, String>,
    pub custom_data: HashMap<String, String>,
    pub classification: String,
    pub reasoning: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_arm() -> Arm {
        Arm {
            platform: Platform::Social,
            id: "a1".into(),
            campaign_id: "c1".into(),
            campaign_name: "Spring Sale".into(),
            date: None,
            spend: 0.0,
            revenue: 0.0,
            conversions: 0,
            clicks: 0,
            impressions: 0,
            ltv: None,
            profit_margin: None,
            inventory_status: None,
            audience_quality_score: None,
            days_active: None,
            current_daily_budget: None,
        }
    }

    #[test]
    fn zero_spend_yields_zero_roas_and_profit_roas() {
        let arm = base_arm();
        assert!((arm.roas() - 0.0).abs() < f64::EPSILON);
        assert!((arm.profit_roas() - 0.0).abs() < f64::EPSILON);
        assert!((arm.ltv_roas() - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_conversions_yields_infinite_cpa() {
        let arm = Arm {
            spend: 100.0,
            ..base_arm()
        };
        assert!(arm.cpa().is_infinite());
    }

    #[test]
    fn ltv_roas_falls_back_to_roas_without_ltv() {
        let arm = Arm {
            spend: 100.0,
            revenue: 300.0,
            conversions: 5,
            ..base_arm()
        };
        assert!((arm.ltv_roas() - arm.roas()).abs() < f64::EPSILON);
    }

    #[test]
    fn ltv_roas_weights_by_conversions_when_present() {
        let arm = Arm {
            spend: 100.0,
            revenue: 300.0,
            conversions: 5,
            ltv: Some(50.0),
            ..base_arm()
        };
        // (50 * 5) / 100 = 2.5
        assert!((arm.ltv_roas() - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn has_sufficient_data_requires_both_thresholds() {
        let arm = Arm {
            conversions: 10,
            impressions: 999,
            ..base_arm()
        };
        assert!(!arm.has_sufficient_data());

        let arm = Arm {
            conversions: 10,
            impressions: 1000,
            ..base_arm()
        };
        assert!(arm.has_sufficient_data());
    }

    #[test]
    fn profit_defaults_margin_to_point_two() {
        let arm = Arm {
            spend: 100.0,
            revenue: 1000.0,
            ..base_arm()
        };
        // 1000*0.2 - 100 = 100
        assert!((arm.profit() - 100.0).abs() < f64::EPSILON);
    }
}
