//! Pure translation from raw platform payloads to `Arm`. No I/O — these
//! are unit-tested directly against fixture JSON, separately from the
//! adapters that fetch the JSON over HTTP.

use adpilot_core::types::{Arm, Platform};
use serde_json::Value;

const SOCIAL_CONVERSION_TYPES: &[&str] = &["purchase", "lead", "complete_registration"];

/// Translate one Facebook-shaped insight row (cents/whole-dollar spend,
/// `actions`/`action_values` arrays) into an `Arm`.
pub fn normalize_social_insight(insight: &Value) -> Arm {
    let mut conversions: u64 = 0;
    let mut revenue: f64 = 0.0;

    if let Some(actions) = insight.get("actions").and_then(Value::as_array) {
        for action in actions {
            let action_type = action.get("action_type").and_then(Value::as_str).unwrap_or("");
            if SOCIAL_CONVERSION_TYPES.contains(&action_type) {
                conversions += action
                    .get("value")
                    .and_then(Value::as_str)
                    .and_then(|v| v.parse::<u64>().ok())
                    .or_else(|| action.get("value").and_then(Value::as_u64))
                    .unwrap_or(0);
            }
        }
    }

    if let Some(action_values) = insight.get("action_values").and_then(Value::as_array) {
        for av in action_values {
            let action_type = av.get("action_type").and_then(Value::as_str).unwrap_or("");
            if action_type == "purchase" {
                revenue += av
                    .get("value")
                    .and_then(Value::as_str)
                    .and_then(|v| v.parse::<f64>().ok())
                    .or_else(|| av.get("value").and_then(Value::as_f64))
                    .unwrap_or(0.0);
            }
        }
    }

    let campaign_id = insight
        .get("campaign_id")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();

    Arm {
        platform: Platform::Social,
        id: campaign_id.clone(),
        campaign_id,
        campaign_name: insight
            .get("campaign_name")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string(),
        date: insight.get("date_start").and_then(Value::as_str).map(str::to_string),
        spend: parse_f64(insight.get("spend")),
        revenue,
        conversions,
        clicks: parse_u64(insight.get("clicks")),
        impressions: parse_u64(insight.get("impressions")),
        ltv: None,
        profit_margin: None,
        inventory_status: None,
        audience_quality_score: None,
        days_active: None,
        current_daily_budget: None,
    }
}

/// Translate one Google Ads GAQL result row (`campaign`/`metrics` nested
/// objects, cost in micros) into an `Arm`.
pub fn normalize_search_insight(row: &Value) -> Arm {
    let campaign = row.get("campaign").cloned().unwrap_or(Value::Null);
    let metrics = row.get("metrics").cloned().unwrap_or(Value::Null);

    let campaign_id = campaign
        .get("id")
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .unwrap_or_default();

    let cost_micros = metrics.get("cost_micros").and_then(Value::as_f64).unwrap_or(0.0);

    Arm {
        platform: Platform::Search,
        id: campaign_id.clone(),
        campaign_id,
        campaign_name: campaign
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string(),
        date: row
            .get("segments")
            .and_then(|s| s.get("date"))
            .and_then(Value::as_str)
            .map(str::to_string),
        spend: cost_micros / 1_000_000.0,
        revenue: metrics.get("conversion_value").and_then(Value::as_f64).unwrap_or(0.0),
        conversions: metrics.get("conversions").and_then(Value::as_f64).unwrap_or(0.0) as u64,
        clicks: parse_u64(metrics.get("clicks")),
        impressions: parse_u64(metrics.get("impressions")),
        ltv: None,
        profit_margin: None,
        inventory_status: None,
        audience_quality_score: None,
        days_active: None,
        current_daily_budget: None,
    }
}

fn parse_f64(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn parse_u64(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(Value::String(s)) => s.parse().unwrap_or(0),
        _ => 0,
    }
}
