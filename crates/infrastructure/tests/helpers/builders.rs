#![allow(dead_code)]
use ferrous_adblock_application::ports::{PreferenceStore, SubscriptionPersistentMetadata};
use ferrous_adblock_domain::config::DownloaderConfig;
use ferrous_adblock_infrastructure::{InMemoryPreferenceStore, PrefsSubscriptionMetadata};
use std::sync::Arc;
use url::Url;

pub fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
}

/// Builds Adblock Plus list text with a valid header.
pub struct FilterListBuilder {
    lines: Vec<String>,
}

impl FilterListBuilder {
    pub fn new() -> Self {
        Self {
            lines: vec!["[Adblock Plus 2.0]".to_string()],
        }
    }

    pub fn title(self, title: &str) -> Self {
        self.line(&format!("! Title: {title}"))
    }

    pub fn version(self, version: &str) -> Self {
        self.line(&format!("! Version: {version}"))
    }

    pub fn expires(self, expires: &str) -> Self {
        self.line(&format!("! Expires: {expires}"))
    }

    pub fn redirect(self, target: &str) -> Self {
        self.line(&format!("! Redirect: {target}"))
    }

    pub fn filter(self, filter: &str) -> Self {
        self.line(filter)
    }

    pub fn filters(mut self, filters: &[&str]) -> Self {
        self.lines.extend(filters.iter().map(|f| f.to_string()));
        self
    }

    fn line(mut self, line: &str) -> Self {
        self.lines.push(line.to_string());
        self
    }

    pub fn build(&self) -> String {
        self.lines.join("\n")
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.build().into_bytes()
    }
}

impl Default for FilterListBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub struct PrefsBuilder;

impl PrefsBuilder {
    pub fn memory() -> Arc<dyn PreferenceStore> {
        Arc::new(InMemoryPreferenceStore::new())
    }

    pub fn metadata(prefs: &Arc<dyn PreferenceStore>) -> Arc<dyn SubscriptionPersistentMetadata> {
        Arc::new(PrefsSubscriptionMetadata::new(prefs.clone()))
    }
}

pub struct DownloaderConfigBuilder;

impl DownloaderConfigBuilder {
    /// Fast retries so failure paths finish within a test.
    pub fn fast() -> DownloaderConfig {
        DownloaderConfig {
            application: "test-app".to_string(),
            application_version: "2.5".to_string(),
            platform: "linux".to_string(),
            initial_backoff_ms: 10,
            max_backoff_ms: 40,
            request_timeout_secs: 5,
        }
    }
}
