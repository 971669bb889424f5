//! Business-event classification into platform conversion signals.

use std::collections::HashMap;

use adpilot_core::types::{BusinessEvent, PlatformSignal, PlatformTarget};

pub struct SignalGenerationResult {
    pub signals: Vec<PlatformSignal>,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
    pub total_value: f64,
}

const DEFAULT_LEAD_VALUE: f64 = 10.0;
const DEFAULT_PROFIT_MARGIN: f64 = 0.2;

/// Classify `events` and fan each one out to every platform in `target`.
/// `ltv_by_user` and `profit_margins` are the optional enrichment inputs;
/// their absence degrades the classification quality but never fails it.
pub fn generate_signals(
    events: &[BusinessEvent],
    target: PlatformTarget,
    ltv_by_user: &HashMap<String, f64>,
    profit_margins: &HashMap<String, f64>,
) -> SignalGenerationResult {
    let mut signals = Vec::new();
    let mut issues = Vec::new();
    let mut total_value = 0.0;

    for event in events {
        let classified = match classify(event, ltv_by_user, profit_margins) {
            Ok(c) => c,
            Err(issue) => {
                issues.push(issue);
                continue;
            }
        };

        for platform in target.platforms() {
            let mut user_data = HashMap::new();
            if let Some(email) = event.metadata.get("email").filter(|v| !v.is_empty()) {
                user_data.insert("email".to_string(), email.clone());
            }
            if let Some(phone) = event.metadata.get("phone").filter(|v| !v.is_empty()) {
                user_data.insert("phone".to_string(), phone.clone());
            }

            signals.push(PlatformSignal {
                platform,
                event_name: classified.event_name.clone(),
                event_id: format!("{}_{}", event.event_id, platform.as_str()),
                value: classified.value,
                currency: event.currency.clone(),
                timestamp: event.timestamp,
                user_data,
                custom_data: event.metadata.clone(),
                classification: classified.classification.clone(),
                reasoning: format!(
                    "classified as {} based on event type and business rules",
                    classified.classification
                ),
            });
            total_value += classified.value;
        }
    }

    let recommendations = if ltv_by_user.is_empty() || profit_margins.is_empty() {
        vec![
            "Consider implementing LTV prediction for better high-value purchase classification".to_string(),
            "Set up CRM qualification rules for lead classification".to_string(),
            "Add profit margin data for accurate value calculation".to_string(),
        ]
    } else {
        Vec::new()
    };

    SignalGenerationResult {
        signals,
        issues,
        recommendations,
        total_value,
    }
}

struct Classified {
    classification: String,
    event_name: String,
    value: f64,
}

/// Returns `Err(issue)` only for a purchase event with no revenue — every
/// other event type always classifies to something, even if it's just a
/// pass-through of its own `event_type`.
fn classify(
    event: &BusinessEvent,
    ltv_by_user: &HashMap<String, f64>,
    profit_margins: &HashMap<String, f64>,
) -> Result<Classified, String> {
    match event.event_type.as_str() {
        "purchase" => {
            let Some(revenue) = event.revenue else {
                return Err(format!("Purchase event {} missing revenue", event.event_id));
            };

            let mut is_high_value = false;
            let mut value = revenue;

            if let Some(&predicted_ltv) = ltv_by_user.get(&event.user_id) {
                if predicted_ltv > revenue * 1.5 {
                    is_high_value = true;
                    value = predicted_ltv;
                }
            }

            if !profit_margins.is_empty() {
                if let Some(product_id) = event.product_id.as_ref().or_else(|| event.metadata.get("product_id")) {
                    let margin = profit_margins.get(product_id).copied().unwrap_or(DEFAULT_PROFIT_MARGIN);
                    value = revenue * margin;
                }
            }

            let classification = if is_high_value { "high_value_purchase" } else { "purchase" };
            Ok(Classified {
                classification: classification.to_string(),
                event_name: "Purchase".to_string(),
                value,
            })
        }
        "lead" => {
            let is_qualified = event.metadata.get("qualified").map(|v| v == "true").unwrap_or(false);
            Ok(Classified {
                classification: if is_qualified { "qualified_lead" } else { "lead" }.to_string(),
                event_name: "Lead".to_string(),
                value: event.revenue.unwrap_or(DEFAULT_LEAD_VALUE),
            })
        }
        "signup" | "trial_start" => Ok(Classified {
            classification: "trial_start".to_string(),
            event_name: "CompleteRegistration".to_string(),
            value: event.revenue.unwrap_or(0.0),
        }),
        other => Ok(Classified {
            classification: other.to_string(),
            event_name: other.to_string(),
            value: event.revenue.unwrap_or(0.0),
        }),
    }
}
