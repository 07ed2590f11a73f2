use serde::{Deserialize, Serialize};

/// Periodic subscription maintenance
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpdatesConfig {
    /// Seconds between update checks (default: 3600)
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,

    /// Seconds between recommended subscription checks (default: 3600)
    #[serde(default = "default_recommendation_interval_secs")]
    pub recommendation_interval_secs: u64,

    /// Where the recommended subscription list is fetched from
    #[serde(default = "default_recommendation_url")]
    pub recommendation_url: String,

    /// Initial value of the auto-install flag on first run (default: true)
    #[serde(default = "default_auto_install")]
    pub auto_install_enabled: bool,
}

impl Default for UpdatesConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: default_check_interval_secs(),
            recommendation_interval_secs: default_recommendation_interval_secs(),
            recommendation_url: default_recommendation_url(),
            auto_install_enabled: default_auto_install(),
        }
    }
}

fn default_check_interval_secs() -> u64 {
    3600
}

fn default_recommendation_interval_secs() -> u64 {
    3600
}

fn default_recommendation_url() -> String {
    crate::known_subscriptions::RECOMMENDED_SUBSCRIPTIONS_URL.to_string()
}

fn default_auto_install() -> bool {
    true
}
