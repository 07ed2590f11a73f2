use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// On-disk locations for preferences and converted subscriptions.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Root data directory (default: "./data")
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Preference file name inside `data_dir` (default: "preferences.json")
    #[serde(default = "default_preferences_file")]
    pub preferences_file: String,

    /// Directory inside `data_dir` holding one sub-directory per configuration
    #[serde(default = "default_subscriptions_dir")]
    pub subscriptions_dir: String,
}

impl StorageConfig {
    pub fn preferences_path(&self) -> PathBuf {
        self.data_dir.join(&self.preferences_file)
    }

    pub fn subscriptions_path(&self) -> PathBuf {
        self.data_dir.join(&self.subscriptions_dir)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            preferences_file: default_preferences_file(),
            subscriptions_dir: default_subscriptions_dir(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_preferences_file() -> String {
    "preferences.json".to_string()
}

fn default_subscriptions_dir() -> String {
    "subscriptions".to_string()
}
