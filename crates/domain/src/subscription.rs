use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use url::Url;

/// Where a subscription is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum InstallationState {
    /// Declared by a configuration but unknown to any maintainer.
    #[default]
    Unknown,
    /// Download or storage still in progress.
    Installing,
    /// Served from a bundled fallback while the real list downloads.
    Preloaded,
    /// Installed by the recommendation mechanism.
    AutoInstalled,
    Installed,
}

impl fmt::Display for InstallationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unknown => "unknown",
            Self::Installing => "installing",
            Self::Preloaded => "preloaded",
            Self::AutoInstalled => "auto-installed",
            Self::Installed => "installed",
        };
        f.write_str(s)
    }
}

/// Metadata view of one subscription, detached from its filters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionInfo {
    pub url: Url,
    pub title: String,
    pub current_version: String,
    pub installation_state: InstallationState,
    pub installation_time: Option<DateTime<Utc>>,
    pub expiration_interval: Duration,
}

impl SubscriptionInfo {
    /// Placeholder for a URL nothing is known about yet.
    pub fn placeholder(url: Url, installation_state: InstallationState) -> Self {
        Self {
            url,
            title: String::new(),
            current_version: String::new(),
            installation_state,
            installation_time: None,
            expiration_interval: Duration::ZERO,
        }
    }
}

/// A site key presented by the page, allowing `$sitekey=` exceptions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SiteKey(String);

impl SiteKey {
    pub fn new(key: impl Into<String>) -> Self {
        SiteKey(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SiteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether a failed download is retried or abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RetryPolicy {
    RetryUntilSucceeded,
    DoNotRetry,
}
