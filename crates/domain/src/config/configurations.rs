use serde::{Deserialize, Serialize};

/// A filtering configuration created on first run when nothing is persisted.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DefaultConfiguration {
    pub name: String,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub filter_lists: Vec<String>,

    #[serde(default)]
    pub allowed_domains: Vec<String>,

    #[serde(default)]
    pub custom_filters: Vec<String>,
}

impl DefaultConfiguration {
    /// The `"adblock"` configuration with the standard lists.
    pub fn adblock() -> Self {
        Self {
            name: crate::known_subscriptions::ADBLOCK_CONFIGURATION_NAME.to_string(),
            enabled: true,
            filter_lists: crate::known_subscriptions::default_filter_lists()
                .into_iter()
                .map(|u| u.to_string())
                .collect(),
            allowed_domains: vec![],
            custom_filters: vec![],
        }
    }
}

fn default_enabled() -> bool {
    true
}
