use crate::filters::{deserialize_ruleset, RulesetSubscription};
use async_trait::async_trait;
use dashmap::DashMap;
use ferrous_adblock_application::ports::{
    read_pref, write_pref, InstalledSubscription, PreferenceStore, SubscriptionPersistentMetadata,
    SubscriptionPersistentStorage,
};
use ferrous_adblock_domain::{DomainError, InstallationState};
use rustc_hash::FxHashMap;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

pub const SUBSCRIPTION_SIGNATURES_PREF: &str = "adblock.subscription_signatures";

const SUBSCRIPTION_FILE_EXTENSION: &str = "json";

pub fn sha256_hex(data: &[u8]) -> String {
    Sha256::digest(data)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Directory holding the subscriptions of `configuration_name`.
///
/// Names are hashed so any configuration name maps to a valid file name.
pub fn configuration_directory(root: &Path, configuration_name: &str) -> PathBuf {
    root.join(sha256_hex(configuration_name.as_bytes()))
}

// ---------------------------------------------------------------------------
// Signatures
// ---------------------------------------------------------------------------

/// SHA-256 digests of stored subscription files, shared by every storage.
///
/// A file whose content no longer matches its recorded digest is treated as
/// corrupted and discarded at load.
pub struct SubscriptionSignatures {
    prefs: Arc<dyn PreferenceStore>,
    lock: Mutex<()>,
}

impl SubscriptionSignatures {
    pub fn new(prefs: Arc<dyn PreferenceStore>) -> Self {
        Self {
            prefs,
            lock: Mutex::new(()),
        }
    }

    fn modify(&self, f: impl FnOnce(&mut FxHashMap<String, String>)) -> Result<(), DomainError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut signatures: FxHashMap<String, String> =
            read_pref(self.prefs.as_ref(), SUBSCRIPTION_SIGNATURES_PREF).unwrap_or_default();
        f(&mut signatures);
        write_pref(self.prefs.as_ref(), SUBSCRIPTION_SIGNATURES_PREF, &signatures)
    }

    pub fn record(&self, key: &str, data: &[u8]) -> Result<(), DomainError> {
        let digest = sha256_hex(data);
        self.modify(|signatures| {
            signatures.insert(key.to_string(), digest);
        })
    }

    pub fn verify(&self, key: &str, data: &[u8]) -> bool {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let signatures: FxHashMap<String, String> =
            read_pref(self.prefs.as_ref(), SUBSCRIPTION_SIGNATURES_PREF).unwrap_or_default();
        signatures
            .get(key)
            .is_some_and(|expected| *expected == sha256_hex(data))
    }

    pub fn remove(&self, key: &str) {
        if let Err(e) = self.modify(|signatures| {
            signatures.remove(key);
        }) {
            error!(key = %key, error = %e, "Failed to drop subscription signature");
        }
    }

    /// Removes every signature under `prefix`.
    pub fn remove_prefixed(&self, prefix: &str) {
        if let Err(e) = self.modify(|signatures| signatures.retain(|key, _| !key.starts_with(prefix))) {
            error!(prefix = %prefix, error = %e, "Failed to drop subscription signatures");
        }
    }
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

struct TrackedFile {
    subscription: Weak<RulesetSubscription>,
    path: PathBuf,
}

/// Stores converted subscriptions of one configuration as `<random>.json`
/// files in its own directory.
pub struct DiskSubscriptionStorage {
    directory: PathBuf,
    signatures: Arc<SubscriptionSignatures>,
    metadata: Arc<dyn SubscriptionPersistentMetadata>,
    files: Arc<DashMap<Url, Vec<TrackedFile>>>,
}

impl DiskSubscriptionStorage {
    pub fn new(
        directory: PathBuf,
        signatures: Arc<SubscriptionSignatures>,
        metadata: Arc<dyn SubscriptionPersistentMetadata>,
    ) -> Self {
        Self {
            directory,
            signatures,
            metadata,
            files: Arc::new(DashMap::new()),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Signature key of a file: `<configuration dir>/<file name>`.
    fn signature_key(directory: &Path, path: &Path) -> String {
        let dir = directory
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("{dir}/{file}")
    }

    fn track(files: &DashMap<Url, Vec<TrackedFile>>, subscription: &Arc<RulesetSubscription>, path: PathBuf) {
        let mut tracked = files.entry(subscription.source_url().clone()).or_default();
        tracked.retain(|t| t.subscription.strong_count() > 0);
        tracked.push(TrackedFile {
            subscription: Arc::downgrade(subscription),
            path,
        });
    }

    fn discard(&self, path: &Path, reason: &str) {
        warn!(path = %path.display(), reason = %reason, "Discarding stored subscription");
        if let Err(e) = std::fs::remove_file(path) {
            warn!(path = %path.display(), error = %e, "Failed to delete stored subscription");
        }
        self.signatures
            .remove(&Self::signature_key(&self.directory, path));
    }

    fn load_blocking(&self) -> Vec<Arc<dyn InstalledSubscription>> {
        if let Err(e) = std::fs::create_dir_all(&self.directory) {
            error!(path = %self.directory.display(), error = %e, "Failed to create subscription directory");
            return Vec::new();
        }
        let entries = match std::fs::read_dir(&self.directory) {
            Ok(entries) => entries,
            Err(e) => {
                error!(path = %self.directory.display(), error = %e, "Failed to list subscription directory");
                return Vec::new();
            }
        };

        let mut loaded: Vec<Arc<dyn InstalledSubscription>> = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(SUBSCRIPTION_FILE_EXTENSION) {
                continue;
            }
            let data = match std::fs::read(&path) {
                Ok(data) => data,
                Err(e) => {
                    self.discard(&path, &e.to_string());
                    continue;
                }
            };
            if !self
                .signatures
                .verify(&Self::signature_key(&self.directory, &path), &data)
            {
                self.discard(&path, "signature mismatch");
                continue;
            }
            let ruleset = match deserialize_ruleset(&data) {
                Ok(ruleset) => ruleset,
                Err(e) => {
                    self.discard(&path, &e.to_string());
                    continue;
                }
            };

            let installation_time = self.metadata.last_installation_time(&ruleset.url);
            let subscription = Arc::new(
                RulesetSubscription::new(ruleset, InstallationState::Installed, installation_time)
                    .with_backing_file(path.clone()),
            );
            Self::track(&self.files, &subscription, path);
            loaded.push(subscription);
        }
        loaded
    }

    fn store_blocking(&self, data: Vec<u8>) -> Result<Arc<RulesetSubscription>, DomainError> {
        let ruleset = deserialize_ruleset(&data)?;
        std::fs::create_dir_all(&self.directory)?;

        let path = self.directory.join(format!(
            "{:016x}{:016x}.{SUBSCRIPTION_FILE_EXTENSION}",
            fastrand::u64(..),
            fastrand::u64(..)
        ));
        std::fs::write(&path, &data)?;
        if let Err(e) = self
            .signatures
            .record(&Self::signature_key(&self.directory, &path), &data)
        {
            let _ = std::fs::remove_file(&path);
            return Err(e);
        }

        let url = ruleset.url.clone();
        let expiration = Duration::from_secs(ruleset.expiration_interval_secs);
        let version = ruleset.version.clone();

        self.metadata.increment_download_success_count(&url);
        self.metadata.set_expiration_interval(&url, expiration);
        self.metadata.set_version(&url, &version);

        let subscription = Arc::new(
            RulesetSubscription::new(
                ruleset,
                InstallationState::Installed,
                self.metadata.last_installation_time(&url),
            )
            .with_backing_file(path.clone()),
        );
        Self::track(&self.files, &subscription, path);
        Ok(subscription)
    }

    fn clone_handle(&self) -> Self {
        Self {
            directory: self.directory.clone(),
            signatures: self.signatures.clone(),
            metadata: self.metadata.clone(),
            files: self.files.clone(),
        }
    }
}

#[async_trait]
impl SubscriptionPersistentStorage for DiskSubscriptionStorage {
    #[instrument(skip(self), fields(directory = %self.directory.display()))]
    async fn load_subscriptions(&self) -> Vec<Arc<dyn InstalledSubscription>> {
        let storage = self.clone_handle();
        match tokio::task::spawn_blocking(move || storage.load_blocking()).await {
            Ok(loaded) => {
                info!(count = loaded.len(), "Stored subscriptions loaded");
                loaded
            }
            Err(e) => {
                error!(error = %e, "Subscription load task failed");
                Vec::new()
            }
        }
    }

    #[instrument(skip(self, data), fields(bytes = data.len()))]
    async fn store_subscription(&self, data: Vec<u8>) -> Option<Arc<dyn InstalledSubscription>> {
        let storage = self.clone_handle();
        match tokio::task::spawn_blocking(move || storage.store_blocking(data)).await {
            Ok(Ok(subscription)) => {
                debug!(url = %subscription.source_url(), "Subscription stored");
                Some(subscription)
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Failed to store subscription");
                None
            }
            Err(e) => {
                error!(error = %e, "Subscription store task failed");
                None
            }
        }
    }

    async fn remove_subscription(&self, subscription: Arc<dyn InstalledSubscription>) {
        let target = Arc::as_ptr(&subscription) as *const ();
        let path = self
            .files
            .get_mut(subscription.source_url())
            .and_then(|mut tracked| {
                let idx = tracked
                    .iter()
                    .position(|t| t.subscription.as_ptr() as *const () == target)?;
                Some(tracked.swap_remove(idx).path)
            });

        match path {
            Some(path) => {
                debug!(url = %subscription.source_url(), path = %path.display(), "Removing stored subscription");
                self.signatures
                    .remove(&Self::signature_key(&self.directory, &path));
            }
            None => debug!(url = %subscription.source_url(), "Removing subscription without a backing file"),
        }
        subscription.mark_for_permanent_removal();
    }
}
