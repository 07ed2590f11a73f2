use super::{
    ConfigError, DefaultConfiguration, DownloaderConfig, LoggingConfig, PreloadedSubscription,
    StorageConfig, UpdatesConfig,
};
use crate::validators;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

const DEFAULT_CONFIG_PATHS: &[&str] = &["ferrous-adblock.toml", "/etc/ferrous-adblock/config.toml"];

/// Main configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub updates: UpdatesConfig,

    #[serde(default)]
    pub downloader: DownloaderConfig,

    /// Bundled fallback lists
    #[serde(default)]
    pub preloaded: Vec<PreloadedSubscription>,

    /// Configurations created when no persisted configuration exists.
    /// An empty list falls back to the standard `"adblock"` configuration.
    #[serde(default)]
    pub configurations: Vec<DefaultConfiguration>,
}

/// Command-line values that take precedence over the file
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub data_dir: Option<PathBuf>,
    pub log_level: Option<String>,
}

impl Config {
    /// Loads `config_path`, or the first existing default location, or
    /// built-in defaults, then applies `overrides`.
    pub fn load(config_path: Option<&str>, overrides: CliOverrides) -> Result<Self, ConfigError> {
        let mut config = match config_path {
            Some(path) => Self::from_file(Path::new(path))?,
            None => match DEFAULT_CONFIG_PATHS.iter().map(Path::new).find(|p| p.exists()) {
                Some(path) => Self::from_file(path)?,
                None => Config::default(),
            },
        };
        config.apply_overrides(overrides);
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    fn apply_overrides(&mut self, overrides: CliOverrides) {
        if let Some(dir) = overrides.data_dir {
            self.storage.data_dir = dir;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
    }

    /// Configurations to create on first run.
    pub fn first_run_configurations(&self) -> Vec<DefaultConfiguration> {
        if self.configurations.is_empty() {
            vec![DefaultConfiguration::adblock()]
        } else {
            self.configurations.clone()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.updates.check_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "updates.check_interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.updates.recommendation_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "updates.recommendation_interval_secs must be greater than zero".to_string(),
            ));
        }
        Url::parse(&self.updates.recommendation_url).map_err(|e| {
            ConfigError::Validation(format!("updates.recommendation_url: {e}"))
        })?;
        if self.downloader.initial_backoff_ms > self.downloader.max_backoff_ms {
            return Err(ConfigError::Validation(
                "downloader.initial_backoff_ms cannot exceed max_backoff_ms".to_string(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for cfg in &self.configurations {
            validators::validate_configuration_name(&cfg.name)
                .map_err(|e| ConfigError::Validation(e.to_string()))?;
            if !seen.insert(cfg.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "Duplicate configuration name: {}",
                    cfg.name
                )));
            }
            for list in &cfg.filter_lists {
                let url = Url::parse(list)
                    .map_err(|e| ConfigError::Validation(format!("{list}: {e}")))?;
                validators::validate_filter_list_url(&url)
                    .map_err(|e| ConfigError::Validation(e.to_string()))?;
            }
            for domain in &cfg.allowed_domains {
                validators::validate_domain(domain)
                    .map_err(|e| ConfigError::Validation(e.to_string()))?;
            }
        }
        Ok(())
    }
}
