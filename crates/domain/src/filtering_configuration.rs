use serde::{Deserialize, Serialize};

/// Persisted form of one filtering configuration.
///
/// Missing fields are filled with defaults on read, so records written by
/// older versions or edited by hand keep whatever values they do carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilteringConfigurationRecord {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Filter list URLs, in insertion order.
    #[serde(default)]
    pub subscriptions: Vec<String>,

    /// Allowed domains, in insertion order.
    #[serde(default)]
    pub domains: Vec<String>,

    /// Custom filter strings, in insertion order.
    #[serde(default)]
    pub filters: Vec<String>,
}

impl Default for FilteringConfigurationRecord {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            subscriptions: vec![],
            domains: vec![],
            filters: vec![],
        }
    }
}

fn default_enabled() -> bool {
    true
}

/// Appends `value` unless already present. Returns whether the list changed.
pub fn insert_unique(list: &mut Vec<String>, value: &str) -> bool {
    if list.iter().any(|v| v == value) {
        return false;
    }
    list.push(value.to_string());
    true
}

/// Removes `value` if present. Returns whether the list changed.
pub fn remove_value(list: &mut Vec<String>, value: &str) -> bool {
    let before = list.len();
    list.retain(|v| v != value);
    list.len() != before
}
