//! Facebook-style adapter: Marketing API insights, ad-set budget writes in
//! cents, and Conversions API (CAPI) uploads.

use adpilot_core::types::{Arm, PlatformSignal, TimeWindow};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tracing::{debug, warn};

use crate::error::AdapterError;
use crate::normalize::normalize_social_insight;
use crate::PlatformAdapter;

pub struct SocialAdapter {
    client: reqwest::Client,
    access_token: String,
    base_url: String,
    api_version: String,
    pixel_id: Option<String>,
}

impl SocialAdapter {
    pub fn new(access_token: String, base_url: String, api_version: String, pixel_id: Option<String>, timeout_ms: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(timeout_ms))
            .build()
            .unwrap_or_default();
        Self {
            client,
            access_token,
            base_url,
            api_version,
            pixel_id,
        }
    }

    fn versioned_url(&self, path: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.api_version, path)
    }
}

#[async_trait]
impl PlatformAdapter for SocialAdapter {
    /// `account_id` is used as given — callers that need the `act_`
    /// prefix the Marketing API expects must supply it already prefixed.
    async fn fetch_insights(
        &self,
        account_id: &str,
        window: &TimeWindow,
        level: &str,
    ) -> Result<Vec<Arm>, AdapterError> {
        let date_preset = match window {
            TimeWindow::Yesterday => "yesterday",
            TimeWindow::Last7d => "last_7d",
            TimeWindow::Last30d => "last_30d",
            TimeWindow::Range { .. } => "yesterday",
        };

        let url = self.versioned_url(&format!("{account_id}/insights"));
        let response = self
            .client
            .get(&url)
            .query(&[
                ("access_token", self.access_token.as_str()),
                ("date_preset", date_preset),
                ("level", level),
                ("time_increment", "1"),
                (
                    "fields",
                    "campaign_id,campaign_name,impressions,clicks,spend,actions,action_values",
                ),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AdapterError::PlatformResponse(format!(
                "social insights request returned {}",
                response.status()
            )));
        }

        let body: serde_json::Value = response.json().await?;
        let rows = body
            .get("data")
            .and_then(serde_json::Value::as_array)
            .cloned()
            .unwrap_or_default();

        Ok(rows.iter().map(normalize_social_insight).collect())
    }

    async fn update_budget(&self, arm_id: &str, new_daily_budget: f64) -> Result<(), AdapterError> {
        let url = self.versioned_url(arm_id);
        let daily_budget_cents = (new_daily_budget * 100.0).round() as i64;

        debug!(arm_id, daily_budget_cents, "updating social ad set budget");

        let response = self
            .client
            .post(&url)
            .query(&[
                ("access_token", self.access_token.clone()),
                ("daily_budget", daily_budget_cents.to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AdapterError::PlatformResponse(format!(
                "social budget update for {arm_id} returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn upload_conversion(&self, signal: &PlatformSignal) -> Result<(), AdapterError> {
        let Some(pixel_id) = &self.pixel_id else {
            warn!("social adapter has no pixel_id configured, skipping conversion upload");
            return Err(AdapterError::Pending("no pixel_id configured".to_string()));
        };

        let url = self.versioned_url(&format!("{pixel_id}/events"));

        let mut custom_data = serde_json::Map::new();
        for (key, value) in &signal.custom_data {
            custom_data.insert(key.clone(), json!(value));
        }
        custom_data.insert("value".to_string(), json!(signal.value));
        custom_data.insert("currency".to_string(), json!(signal.currency.to_uppercase()));

        let event = json!({
            "data": [{
                "event_name": signal.event_name,
                "event_id": signal.event_id,
                "event_time": Utc::now().timestamp(),
                "user_data": signal.user_data,
                "custom_data": custom_data,
            }]
        });

        let response = self
            .client
            .post(&url)
            .query(&[("access_token", self.access_token.as_str())])
            .json(&event)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AdapterError::PlatformResponse(format!(
                "social conversion upload returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}
