#![allow(dead_code)]

use async_trait::async_trait;
use ferrous_adblock_application::configuration::FilteringConfiguration;
use ferrous_adblock_application::observer::{ObserverId, ObserverRegistry};
use ferrous_adblock_application::services::{Snapshot, SubscriptionObserver, SubscriptionService};
use ferrous_adblock_domain::SubscriptionInfo;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

// ============================================================================
// Mock SubscriptionService
// ============================================================================

/// Counts the calls the jobs make; every other method answers empty.
pub struct MockSubscriptionService {
    update_checks: Arc<AtomicU64>,
    configuration_lookups: Arc<AtomicU64>,
    auto_install: AtomicBool,
    observers: ObserverRegistry<dyn SubscriptionObserver>,
}

impl MockSubscriptionService {
    pub fn new() -> Self {
        Self {
            update_checks: Arc::new(AtomicU64::new(0)),
            configuration_lookups: Arc::new(AtomicU64::new(0)),
            auto_install: AtomicBool::new(true),
            observers: ObserverRegistry::new(),
        }
    }

    pub fn update_checks(&self) -> u64 {
        self.update_checks.load(Ordering::Relaxed)
    }

    pub fn configuration_lookups(&self) -> u64 {
        self.configuration_lookups.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl SubscriptionService for MockSubscriptionService {
    async fn install_filtering_configuration(
        &self,
        _configuration: Arc<dyn FilteringConfiguration>,
    ) -> bool {
        false
    }

    async fn uninstall_filtering_configuration(&self, _name: &str) -> bool {
        false
    }

    async fn current_snapshot(&self) -> Snapshot {
        Snapshot::new()
    }

    fn latest_snapshot(&self) -> Arc<Snapshot> {
        Arc::new(Snapshot::new())
    }

    async fn current_subscriptions(&self, _name: &str) -> Vec<SubscriptionInfo> {
        Vec::new()
    }

    async fn installed_filtering_configurations(&self) -> Vec<Arc<dyn FilteringConfiguration>> {
        Vec::new()
    }

    async fn filtering_configuration(&self, _name: &str) -> Option<Arc<dyn FilteringConfiguration>> {
        self.configuration_lookups.fetch_add(1, Ordering::Relaxed);
        None
    }

    async fn set_auto_install_enabled(&self, enabled: bool) {
        self.auto_install.store(enabled, Ordering::Relaxed);
    }

    fn is_auto_install_enabled(&self) -> bool {
        self.auto_install.load(Ordering::Relaxed)
    }

    async fn run_update_check(&self) {
        self.update_checks.fetch_add(1, Ordering::Relaxed);
    }

    fn add_observer(&self, observer: Arc<dyn SubscriptionObserver>) -> ObserverId {
        self.observers.add(observer)
    }

    fn remove_observer(&self, id: ObserverId) -> bool {
        self.observers.remove(id)
    }
}
