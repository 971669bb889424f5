//! Google-style adapter: GAQL insight queries, budget writes in micros, and
//! offline conversion uploads. Budget writes require a `budget_id` mapping
//! the caller supplies — without one, this adapter reports the write as
//! pending rather than failed, matching how the platform's own API surface
//! is unavailable without a separate OAuth/API-library setup.

use std::collections::HashMap;

use adpilot_core::types::{Arm, PlatformSignal, TimeWindow};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::AdapterError;
use crate::normalize::normalize_search_insight;
use crate::PlatformAdapter;

pub struct SearchAdapter {
    client: reqwest::Client,
    developer_token: String,
    base_url: String,
    api_version: String,
    customer_id: Option<String>,
    budget_ids: HashMap<String, String>,
}

impl SearchAdapter {
    pub fn new(
        developer_token: String,
        base_url: String,
        api_version: String,
        customer_id: Option<String>,
        timeout_ms: u64,
        budget_ids: HashMap<String, String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(timeout_ms))
            .build()
            .unwrap_or_default();
        Self {
            client,
            developer_token,
            base_url,
            api_version,
            customer_id,
            budget_ids,
        }
    }

    fn build_gaql_query(&self, start_date: &str, end_date: &str) -> String {
        format!(
            "SELECT campaign.id, campaign.name, metrics.impressions, metrics.clicks, \
             metrics.cost_micros, metrics.conversions, metrics.conversion_value, segments.date \
             FROM campaign \
             WHERE segments.date DURING '{start_date}' AND '{end_date}'"
        )
    }
}

#[async_trait]
impl PlatformAdapter for SearchAdapter {
    async fn fetch_insights(
        &self,
        account_id: &str,
        window: &TimeWindow,
        _level: &str,
    ) -> Result<Vec<Arm>, AdapterError> {
        let customer_id = if !account_id.is_empty() {
            account_id
        } else if let Some(default_id) = &self.customer_id {
            default_id.as_str()
        } else {
            warn!("search adapter has no customer_id configured, returning no arms");
            return Ok(Vec::new());
        };

        let (start, end) = window.resolve(chrono::Utc::now().date_naive());
        let query = self.build_gaql_query(&start, &end);
        debug!(customer_id, query, "querying search ads insights");

        let url = format!(
            "{}/{}/customers/{customer_id}/googleAds:search",
            self.base_url, self.api_version
        );

        let response = self
            .client
            .post(&url)
            .header("developer-token", &self.developer_token)
            .json(&serde_json::json!({ "query": query }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AdapterError::PlatformResponse(format!(
                "search insights request returned {}",
                response.status()
            )));
        }

        let body: serde_json::Value = response.json().await?;
        let rows = body
            .get("results")
            .and_then(serde_json::Value::as_array)
            .cloned()
            .unwrap_or_default();

        Ok(rows.iter().map(normalize_search_insight).collect())
    }

    async fn update_budget(&self, arm_id: &str, new_daily_budget: f64) -> Result<(), AdapterError> {
        let Some(budget_id) = self.budget_ids.get(arm_id) else {
            return Err(AdapterError::Pending(format!(
                "no budget_id mapping for campaign {arm_id}"
            )));
        };

        let amount_micros = (new_daily_budget * 1_000_000.0).round() as i64;
        debug!(arm_id, budget_id, amount_micros, "updating search campaign budget");

        let customer_id = self
            .customer_id
            .as_deref()
            .ok_or_else(|| AdapterError::Pending("no customer_id configured".to_string()))?;

        let url = format!(
            "{}/{}/customers/{customer_id}/campaignBudgets/{budget_id}",
            self.base_url, self.api_version
        );

        let response = self
            .client
            .post(&url)
            .header("developer-token", &self.developer_token)
            .json(&serde_json::json!({ "amount_micros": amount_micros }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AdapterError::PlatformResponse(format!(
                "search budget update for {arm_id} returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn upload_conversion(&self, signal: &PlatformSignal) -> Result<(), AdapterError> {
        let Some(customer_id) = &self.customer_id else {
            return Err(AdapterError::Pending("no customer_id configured".to_string()));
        };

        let url = format!(
            "{}/{}/customers/{customer_id}:uploadClickConversions",
            self.base_url, self.api_version
        );

        let response = self
            .client
            .post(&url)
            .header("developer-token", &self.developer_token)
            .json(&serde_json::json!({
                "conversions": [{
                    "gclid": signal.event_id,
                    "conversionValue": signal.value,
                    "currencyCode": signal.currency,
                }]
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AdapterError::PlatformResponse(format!(
                "search conversion upload returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}
