use serde::{Deserialize, Serialize};

/// Client metadata sent with every subscription request, plus retry tuning
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DownloaderConfig {
    #[serde(default = "default_application")]
    pub application: String,

    #[serde(default = "default_application_version")]
    pub application_version: String,

    #[serde(default = "default_platform")]
    pub platform: String,

    /// First retry delay in milliseconds (default: 1000)
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Upper bound for the retry delay in milliseconds (default: 300000)
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Per-request timeout in seconds (default: 60)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            application: default_application(),
            application_version: default_application_version(),
            platform: default_platform(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_application() -> String {
    "ferrous-adblock".to_string()
}

fn default_application_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_platform() -> String {
    std::env::consts::OS.to_string()
}

fn default_initial_backoff_ms() -> u64 {
    1000
}

fn default_max_backoff_ms() -> u64 {
    300_000
}

fn default_request_timeout_secs() -> u64 {
    60
}
