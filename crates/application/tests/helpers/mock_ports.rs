#![allow(dead_code)]

use super::fake_subscription::FakeSubscription;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ferrous_adblock_application::configuration::FilteringConfiguration;
use ferrous_adblock_application::ports::{
    ConversionExecutors, ConversionResult, FilteringConfigurationCleaner, InstalledSubscription,
    PreferenceStore, PreloadedSubscriptionProvider, SubscriptionDownloader,
    SubscriptionPersistentMetadata, SubscriptionPersistentStorage,
};
use ferrous_adblock_application::services::{
    FilteringConfigurationMaintainer, FilteringConfigurationMaintainerImpl, MaintainerDependencies,
    MaintainerEvent, MaintainerEventSink, MaintainerFactory,
};
use ferrous_adblock_domain::known_subscriptions::CUSTOM_FILTERS_URL;
use ferrous_adblock_domain::{DomainError, RetryPolicy};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use url::Url;

pub fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
}

// ============================================================================
// Mock PreferenceStore
// ============================================================================

#[derive(Default)]
pub struct MockPreferenceStore {
    values: Mutex<HashMap<String, Value>>,
    pub set_count: AtomicU64,
}

impl MockPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raw(&self, key: &str) -> Option<Value> {
        self.values.lock().unwrap().get(key).cloned()
    }
}

impl PreferenceStore for MockPreferenceStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.lock().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) -> Result<(), DomainError> {
        self.set_count.fetch_add(1, Ordering::SeqCst);
        self.values.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), DomainError> {
        self.values.lock().unwrap().remove(key);
        Ok(())
    }
}

// ============================================================================
// Mock SubscriptionPersistentStorage
// ============================================================================

/// Stores data by turning it into a [`FakeSubscription`].
#[derive(Default)]
pub struct MockStorage {
    initial: Mutex<Vec<Arc<dyn InstalledSubscription>>>,
    stored: Mutex<Vec<Url>>,
    removed: Mutex<Vec<Url>>,
    hold_store: AtomicBool,
    store_release: Notify,
    store_started: Notify,
    pub load_count: AtomicU64,
}

impl MockStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_subscriptions(subscriptions: Vec<Arc<dyn InstalledSubscription>>) -> Self {
        let storage = Self::default();
        *storage.initial.lock().unwrap() = subscriptions;
        storage
    }

    /// Makes `store_subscription` wait for [`Self::release_store`].
    pub fn hold_store(&self) {
        self.hold_store.store(true, Ordering::SeqCst);
    }

    pub fn release_store(&self) {
        self.hold_store.store(false, Ordering::SeqCst);
        self.store_release.notify_waiters();
    }

    pub async fn wait_store_started(&self) {
        self.store_started.notified().await;
    }

    pub fn stored(&self) -> Vec<Url> {
        self.stored.lock().unwrap().clone()
    }

    pub fn removed(&self) -> Vec<Url> {
        self.removed.lock().unwrap().clone()
    }
}

#[async_trait]
impl SubscriptionPersistentStorage for MockStorage {
    async fn load_subscriptions(&self) -> Vec<Arc<dyn InstalledSubscription>> {
        self.load_count.fetch_add(1, Ordering::SeqCst);
        self.initial.lock().unwrap().clone()
    }

    async fn store_subscription(&self, data: Vec<u8>) -> Option<Arc<dyn InstalledSubscription>> {
        let released = self.store_release.notified();
        if self.hold_store.load(Ordering::SeqCst) {
            self.store_started.notify_one();
            released.await;
        }
        let subscription = FakeSubscription::from_bytes(&data)?;
        self.stored
            .lock()
            .unwrap()
            .push(subscription.source_url().clone());
        Some(Arc::new(subscription))
    }

    async fn remove_subscription(&self, subscription: Arc<dyn InstalledSubscription>) {
        subscription.mark_for_permanent_removal();
        self.removed
            .lock()
            .unwrap()
            .push(subscription.source_url().clone());
    }
}

// ============================================================================
// Mock SubscriptionDownloader
// ============================================================================

#[derive(Default)]
pub struct MockDownloader {
    responses: Mutex<HashMap<Url, Vec<u8>>>,
    head_version: Mutex<Option<String>>,
    cancelled: Mutex<Vec<Url>>,
    requested: Mutex<Vec<(Url, RetryPolicy)>>,
    hold: AtomicBool,
    release: Notify,
    pub head_count: AtomicU64,
}

impl MockDownloader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `<url>\n<version>\n<filters...>` for `url`.
    pub fn serve(&self, url: &Url, version: &str, filters: &[&str]) {
        let mut body = format!("{url}\n{version}\n");
        for filter in filters {
            body.push_str(filter);
            body.push('\n');
        }
        self.serve_raw(url, body.into_bytes());
    }

    pub fn serve_raw(&self, url: &Url, body: Vec<u8>) {
        self.responses.lock().unwrap().insert(url.clone(), body);
    }

    pub fn set_head_version(&self, version: Option<&str>) {
        *self.head_version.lock().unwrap() = version.map(str::to_string);
    }

    /// Downloads block until [`Self::release`] is called.
    pub fn hold(&self) {
        self.hold.store(true, Ordering::SeqCst);
    }

    pub fn release(&self) {
        self.hold.store(false, Ordering::SeqCst);
        self.release.notify_waiters();
    }

    pub fn cancelled(&self) -> Vec<Url> {
        self.cancelled.lock().unwrap().clone()
    }

    pub fn requested(&self) -> Vec<(Url, RetryPolicy)> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl SubscriptionDownloader for MockDownloader {
    async fn download(&self, url: &Url, retry_policy: RetryPolicy) -> Option<Vec<u8>> {
        self.requested
            .lock()
            .unwrap()
            .push((url.clone(), retry_policy));
        let released = self.release.notified();
        if self.hold.load(Ordering::SeqCst) {
            released.await;
        }
        self.responses.lock().unwrap().get(url).cloned()
    }

    async fn head_request(&self, _url: &Url) -> Option<String> {
        self.head_count.fetch_add(1, Ordering::SeqCst);
        self.head_version.lock().unwrap().clone()
    }

    fn cancel_download(&self, url: &Url) {
        self.cancelled.lock().unwrap().push(url.clone());
    }
}

// ============================================================================
// Mock ConversionExecutors
// ============================================================================

/// Passes data through; bodies of the form `redirect <url>` redirect and
/// `garbage` fails.
#[derive(Default)]
pub struct MockConverter {
    pub custom_conversions: AtomicU64,
    last_custom_filters: Mutex<Vec<String>>,
}

impl MockConverter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_custom_filters(&self) -> Vec<String> {
        self.last_custom_filters.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConversionExecutors for MockConverter {
    fn convert_custom_filters(&self, filters: &[String]) -> Arc<dyn InstalledSubscription> {
        self.custom_conversions.fetch_add(1, Ordering::SeqCst);
        *self.last_custom_filters.lock().unwrap() = filters.to_vec();
        Arc::new(FakeSubscription::from_custom_filters(CUSTOM_FILTERS_URL, filters))
    }

    async fn convert_filter_list(&self, _url: &Url, content: Vec<u8>) -> ConversionResult {
        let text = String::from_utf8_lossy(&content);
        if let Some(target) = text.strip_prefix("redirect ") {
            return match Url::parse(target.trim()) {
                Ok(target) => ConversionResult::Redirect(target),
                Err(e) => ConversionResult::Error(e.to_string()),
            };
        }
        if text.starts_with("garbage") {
            return ConversionResult::Error("not a filter list".to_string());
        }
        ConversionResult::Ok(content)
    }
}

// ============================================================================
// Mock SubscriptionPersistentMetadata
// ============================================================================

#[derive(Default)]
pub struct MockMetadata {
    expired: Mutex<HashSet<Url>>,
    fresh: Mutex<HashSet<Url>>,
    auto_installed: Mutex<HashSet<Url>>,
    auto_installed_expired: Mutex<HashSet<Url>>,
    versions: Mutex<HashMap<Url, String>>,
    removed: Mutex<Vec<Url>>,
    pub error_count: AtomicU64,
}

impl MockMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_expired(&self, url: &Url) {
        self.fresh.lock().unwrap().remove(url);
        self.expired.lock().unwrap().insert(url.clone());
    }

    pub fn mark_auto_installed(&self, url: &Url, expired: bool) {
        self.auto_installed.lock().unwrap().insert(url.clone());
        if expired {
            self.auto_installed_expired.lock().unwrap().insert(url.clone());
        }
    }

    pub fn removed(&self) -> Vec<Url> {
        self.removed.lock().unwrap().clone()
    }
}

impl SubscriptionPersistentMetadata for MockMetadata {
    fn set_expiration_interval(&self, url: &Url, _interval: Duration) {
        self.expired.lock().unwrap().remove(url);
        self.fresh.lock().unwrap().insert(url.clone());
    }

    fn set_version(&self, url: &Url, version: &str) {
        self.versions
            .lock()
            .unwrap()
            .insert(url.clone(), version.to_string());
    }

    fn set_auto_installed_expiration_interval(&self, url: &Url, _interval: Duration) {
        self.auto_installed.lock().unwrap().insert(url.clone());
        self.auto_installed_expired.lock().unwrap().remove(url);
    }

    fn increment_download_success_count(&self, _url: &Url) {}

    fn increment_download_error_count(&self, _url: &Url) {
        self.error_count.fetch_add(1, Ordering::SeqCst);
    }

    /// Only URLs explicitly marked expired are expired.
    fn is_expired(&self, url: &Url) -> bool {
        self.expired.lock().unwrap().contains(url)
    }

    fn is_auto_installed(&self, url: &Url) -> bool {
        self.auto_installed.lock().unwrap().contains(url)
    }

    fn is_auto_installed_expired(&self, url: &Url) -> bool {
        self.auto_installed_expired.lock().unwrap().contains(url)
    }

    fn last_installation_time(&self, _url: &Url) -> Option<DateTime<Utc>> {
        None
    }

    fn version(&self, url: &Url) -> String {
        self.versions
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_default()
    }

    fn download_success_count(&self, _url: &Url) -> u32 {
        0
    }

    fn download_error_count(&self, _url: &Url) -> u32 {
        self.error_count.load(Ordering::SeqCst) as u32
    }

    fn remove_metadata(&self, url: &Url) {
        self.removed.lock().unwrap().push(url.clone());
    }
}

// ============================================================================
// Mock PreloadedSubscriptionProvider
// ============================================================================

#[derive(Default)]
pub struct MockPreloadedProvider {
    updates: Mutex<Vec<(Vec<Url>, Vec<Url>)>>,
}

impl MockPreloadedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_update(&self) -> Option<(Vec<Url>, Vec<Url>)> {
        self.updates.lock().unwrap().last().cloned()
    }
}

impl PreloadedSubscriptionProvider for MockPreloadedProvider {
    fn update_subscriptions(&self, installed: &[Url], pending: &[Url]) {
        self.updates
            .lock()
            .unwrap()
            .push((installed.to_vec(), pending.to_vec()));
    }

    fn current_preloaded_subscriptions(&self) -> Vec<Arc<dyn InstalledSubscription>> {
        Vec::new()
    }
}

// ============================================================================
// Mock FilteringConfigurationCleaner
// ============================================================================

#[derive(Default)]
pub struct MockCleaner {
    cleaned: Mutex<Vec<String>>,
    gate: Option<Arc<Notify>>,
}

impl MockCleaner {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cleaner whose `clean` waits for [`MockCleaner::release`].
    pub fn gated() -> Self {
        Self {
            cleaned: Mutex::new(Vec::new()),
            gate: Some(Arc::new(Notify::new())),
        }
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    pub fn cleaned(&self) -> Vec<String> {
        self.cleaned.lock().unwrap().clone()
    }
}

#[async_trait]
impl FilteringConfigurationCleaner for MockCleaner {
    async fn clean(&self, configuration_name: &str) {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.cleaned
            .lock()
            .unwrap()
            .push(configuration_name.to_string());
    }
}

// ============================================================================
// Wiring
// ============================================================================

/// All mocks a maintainer needs, with typed handles kept for assertions.
pub struct MockEnvironment {
    pub storage: Arc<MockStorage>,
    pub metadata: Arc<MockMetadata>,
    pub downloader: Arc<MockDownloader>,
    pub converter: Arc<MockConverter>,
    pub preloaded: Arc<MockPreloadedProvider>,
}

impl MockEnvironment {
    pub fn new() -> Self {
        Self::with_storage(MockStorage::new())
    }

    pub fn with_storage(storage: MockStorage) -> Self {
        Self {
            storage: Arc::new(storage),
            metadata: Arc::new(MockMetadata::new()),
            downloader: Arc::new(MockDownloader::new()),
            converter: Arc::new(MockConverter::new()),
            preloaded: Arc::new(MockPreloadedProvider::new()),
        }
    }

    pub fn dependencies(&self) -> MaintainerDependencies {
        MaintainerDependencies {
            storage: self.storage.clone(),
            metadata: self.metadata.clone(),
            downloader: self.downloader.clone(),
            converter: self.converter.clone(),
            preloaded: self.preloaded.clone(),
        }
    }
}

/// Creates real maintainers over a shared [`MockEnvironment`].
pub struct MockMaintainerFactory {
    dependencies: MaintainerDependencies,
    pub created: AtomicU64,
}

impl MockMaintainerFactory {
    pub fn new(env: &MockEnvironment) -> Self {
        Self {
            dependencies: env.dependencies(),
            created: AtomicU64::new(0),
        }
    }
}

impl MaintainerFactory for MockMaintainerFactory {
    fn create_maintainer(
        &self,
        configuration: Arc<dyn FilteringConfiguration>,
        events: MaintainerEventSink,
    ) -> Box<dyn FilteringConfigurationMaintainer> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Box::new(FilteringConfigurationMaintainerImpl::new(
            configuration,
            self.dependencies.clone(),
            events,
        ))
    }
}

/// Event sink feeding a channel the test drains by hand.
pub fn event_channel() -> (MaintainerEventSink, mpsc::UnboundedReceiver<MaintainerEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let sink: MaintainerEventSink = Arc::new(move |event: MaintainerEvent| {
        let _ = tx.send(event);
    });
    (sink, rx)
}

/// Feeds events to `maintainer` until none arrive for a short while.
///
/// # Returns
/// URLs reported as installed
pub async fn pump(
    maintainer: &mut dyn FilteringConfigurationMaintainer,
    events: &mut mpsc::UnboundedReceiver<MaintainerEvent>,
) -> Vec<Url> {
    let mut installed = Vec::new();
    while let Ok(Some(event)) =
        tokio::time::timeout(Duration::from_millis(100), events.recv()).await
    {
        if let Some(url) = maintainer.handle_event(event) {
            installed.push(url);
        }
    }
    installed
}

/// Polls `condition` until it holds or two seconds pass.
pub async fn eventually<F, Fut>(mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..200 {
        if condition().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
