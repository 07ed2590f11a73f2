use chrono::{DateTime, Utc};
use std::time::Duration;
use url::Url;

/// Per-URL bookkeeping that survives restarts.
pub trait SubscriptionPersistentMetadata: Send + Sync {
    /// Records a successful installation now, valid for `interval`.
    fn set_expiration_interval(&self, url: &Url, interval: Duration);

    fn set_version(&self, url: &Url, version: &str);

    /// Flags `url` as auto-installed until now + `interval`.
    fn set_auto_installed_expiration_interval(&self, url: &Url, interval: Duration);

    fn increment_download_success_count(&self, url: &Url);

    fn increment_download_error_count(&self, url: &Url);

    /// True when nothing is recorded or the expiration has passed.
    fn is_expired(&self, url: &Url) -> bool;

    fn is_auto_installed(&self, url: &Url) -> bool;

    fn is_auto_installed_expired(&self, url: &Url) -> bool;

    fn last_installation_time(&self, url: &Url) -> Option<DateTime<Utc>>;

    fn version(&self, url: &Url) -> String;

    fn download_success_count(&self, url: &Url) -> u32;

    fn download_error_count(&self, url: &Url) -> u32;

    fn remove_metadata(&self, url: &Url);
}
