use serde::Deserialize;

/// Root application configuration. Loaded from environment variables with
/// the prefix `ADPILOT__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default)]
    pub social: SocialConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub oracle: OracleConfig,
    #[serde(default)]
    pub optimization: OptimizationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SocialConfig {
    #[serde(default)]
    pub access_token: String,
    #[serde(default = "default_social_api_version")]
    pub api_version: String,
    #[serde(default = "default_social_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub pixel_id: Option<String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub developer_token: String,
    #[serde(default = "default_search_api_version")]
    pub api_version: String,
    #[serde(default = "default_search_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// Configuration for the pluggable "intelligent" allocator. ADPilot ships no
/// real implementation of this — only the `NullOracle`, which always
/// declines — so this config exists to let operators point at a real
/// provider without changing the Optimization Loop.
#[derive(Debug, Clone, Deserialize)]
pub struct OracleConfig {
    #[serde(default)]
    pub provider: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OptimizationConfig {
    #[serde(default = "default_min_conversions")]
    pub min_conversions: u64,
    #[serde(default = "default_max_change_ratio")]
    pub max_change_ratio: f64,
    #[serde(default = "default_bandit_epsilon")]
    pub epsilon: f64,
    #[serde(default = "default_bandit_confidence")]
    pub ucb_confidence: f64,
}

fn default_environment() -> String {
    "development".to_string()
}
fn default_social_api_version() -> String {
    "v19.0".to_string()
}
fn default_social_base_url() -> String {
    "https://graph.facebook.com".to_string()
}
fn default_search_api_version() -> String {
    "v20".to_string()
}
fn default_search_base_url() -> String {
    "https://googleads.googleapis.com".to_string()
}
fn default_timeout_ms() -> u64 {
    60_000
}
fn default_min_conversions() -> u64 {
    10
}
fn default_max_change_ratio() -> f64 {
    0.3
}
fn default_bandit_epsilon() -> f64 {
    0.1
}
fn default_bandit_confidence() -> f64 {
    2.0
}

impl Default for SocialConfig {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            api_version: default_social_api_version(),
            base_url: default_social_base_url(),
            pixel_id: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            developer_token: String::new(),
            api_version: default_search_api_version(),
            base_url: default_search_base_url(),
            customer_id: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self { provider: None }
    }
}

impl Default for OptimizationConfig {
    fn default() -> Self {
        Self {
            min_conversions: default_min_conversions(),
            max_change_ratio: default_max_change_ratio(),
            epsilon: default_bandit_epsilon(),
            ucb_confidence: default_bandit_confidence(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            social: SocialConfig::default(),
            search: SearchConfig::default(),
            oracle: OracleConfig::default(),
            optimization: OptimizationConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables (prefix `ADPILOT__`,
    /// `__` as the nesting separator — e.g. `ADPILOT__SOCIAL__ACCESS_TOKEN`).
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("ADPILOT")
                .separator("__")
                .try_parsing(true)
                .list_separator(","),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
