use chrono::{DateTime, Duration as ChronoDuration, Utc};
use ferrous_adblock_application::ports::{read_pref, write_pref, PreferenceStore, SubscriptionPersistentMetadata};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, error};
use url::Url;

pub const SUBSCRIPTION_METADATA_PREF: &str = "adblock.subscription_metadata";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct MetadataRecord {
    #[serde(default)]
    expiration_interval_secs: u64,
    #[serde(default)]
    last_installation_time: Option<DateTime<Utc>>,
    #[serde(default)]
    version: String,
    #[serde(default)]
    download_success_count: u32,
    #[serde(default)]
    download_error_count: u32,
    #[serde(default)]
    auto_installed_expiration_time: Option<DateTime<Utc>>,
}

fn after(start: DateTime<Utc>, interval: Duration) -> DateTime<Utc> {
    let interval = ChronoDuration::from_std(interval).unwrap_or(ChronoDuration::MAX);
    start.checked_add_signed(interval).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Subscription metadata kept in one preference, keyed by URL.
///
/// The map is cached in memory and written back after every change.
pub struct PrefsSubscriptionMetadata {
    prefs: Arc<dyn PreferenceStore>,
    records: Mutex<FxHashMap<String, MetadataRecord>>,
}

impl PrefsSubscriptionMetadata {
    pub fn new(prefs: Arc<dyn PreferenceStore>) -> Self {
        let records: FxHashMap<String, MetadataRecord> =
            read_pref(prefs.as_ref(), SUBSCRIPTION_METADATA_PREF).unwrap_or_default();
        debug!(entries = records.len(), "Subscription metadata loaded");
        Self {
            prefs,
            records: Mutex::new(records),
        }
    }

    fn records(&self) -> MutexGuard<'_, FxHashMap<String, MetadataRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read<T>(&self, url: &Url, f: impl FnOnce(&MetadataRecord) -> T) -> Option<T> {
        self.records().get(url.as_str()).map(f)
    }

    fn update(&self, url: &Url, f: impl FnOnce(&mut MetadataRecord)) {
        let mut records = self.records();
        f(records.entry(url.to_string()).or_default());
        self.persist(&records);
    }

    fn persist(&self, records: &FxHashMap<String, MetadataRecord>) {
        if let Err(e) = write_pref(self.prefs.as_ref(), SUBSCRIPTION_METADATA_PREF, records) {
            error!(error = %e, "Failed to persist subscription metadata");
        }
    }
}

impl SubscriptionPersistentMetadata for PrefsSubscriptionMetadata {
    fn set_expiration_interval(&self, url: &Url, interval: Duration) {
        self.update(url, |r| {
            r.expiration_interval_secs = interval.as_secs();
            r.last_installation_time = Some(Utc::now());
        });
    }

    fn set_version(&self, url: &Url, version: &str) {
        self.update(url, |r| r.version = version.to_string());
    }

    fn set_auto_installed_expiration_interval(&self, url: &Url, interval: Duration) {
        self.update(url, |r| {
            r.auto_installed_expiration_time = Some(after(Utc::now(), interval));
        });
    }

    fn increment_download_success_count(&self, url: &Url) {
        self.update(url, |r| {
            r.download_success_count = r.download_success_count.saturating_add(1);
        });
    }

    fn increment_download_error_count(&self, url: &Url) {
        self.update(url, |r| {
            r.download_error_count = r.download_error_count.saturating_add(1);
        });
    }

    fn is_expired(&self, url: &Url) -> bool {
        self.read(url, |r| match r.last_installation_time {
            Some(last) => {
                after(last, Duration::from_secs(r.expiration_interval_secs)) <= Utc::now()
            }
            None => true,
        })
        .unwrap_or(true)
    }

    fn is_auto_installed(&self, url: &Url) -> bool {
        self.read(url, |r| r.auto_installed_expiration_time.is_some())
            .unwrap_or(false)
    }

    fn is_auto_installed_expired(&self, url: &Url) -> bool {
        self.read(url, |r| {
            r.auto_installed_expiration_time
                .is_some_and(|expires| expires <= Utc::now())
        })
        .unwrap_or(false)
    }

    fn last_installation_time(&self, url: &Url) -> Option<DateTime<Utc>> {
        self.read(url, |r| r.last_installation_time).flatten()
    }

    fn version(&self, url: &Url) -> String {
        self.read(url, |r| r.version.clone()).unwrap_or_default()
    }

    fn download_success_count(&self, url: &Url) -> u32 {
        self.read(url, |r| r.download_success_count).unwrap_or(0)
    }

    fn download_error_count(&self, url: &Url) -> u32 {
        self.read(url, |r| r.download_error_count).unwrap_or(0)
    }

    fn remove_metadata(&self, url: &Url) {
        let mut records = self.records();
        if records.remove(url.as_str()).is_some() {
            self.persist(&records);
        }
    }
}
