use super::ongoing_installation::{InstallationId, InstallationKind, OngoingInstallation};
use super::{
    FilteringConfigurationMaintainer, MaintainerDependencies, MaintainerEvent, MaintainerEventSink,
};
use crate::configuration::FilteringConfiguration;
use crate::ports::{
    ConversionExecutors, ConversionResult, InstalledSubscription, SubscriptionDownloader,
    SubscriptionPersistentMetadata,
};
use crate::services::SubscriptionCollection;
use ferrous_adblock_domain::known_subscriptions::{
    acceptable_ads_url, ACCEPTABLE_ADS_URL, ADBLOCK_CONFIGURATION_NAME, MAX_NUMBER_OF_REDIRECTS,
    PING_EXPIRATION_INTERVAL,
};
use ferrous_adblock_domain::{
    validators, InstallationState, RetryPolicy, SubscriptionInfo,
};
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StorageState {
    Uninitialized,
    Loading,
    Initialized,
}

pub struct FilteringConfigurationMaintainerImpl {
    configuration: Arc<dyn FilteringConfiguration>,
    deps: MaintainerDependencies,
    events: MaintainerEventSink,
    storage_state: StorageState,
    current_state: Vec<Arc<dyn InstalledSubscription>>,
    custom_filters: Option<Arc<dyn InstalledSubscription>>,
    ongoing: Vec<OngoingInstallation>,
    ping: Option<CancellationToken>,
    shutdown: CancellationToken,
}

impl FilteringConfigurationMaintainerImpl {
    /// Creates the maintainer, builds the custom filters subscription and
    /// starts loading storage. Must be called inside a Tokio runtime.
    pub fn new(
        configuration: Arc<dyn FilteringConfiguration>,
        deps: MaintainerDependencies,
        events: MaintainerEventSink,
    ) -> Self {
        let mut maintainer = Self {
            configuration,
            deps,
            events,
            storage_state: StorageState::Uninitialized,
            current_state: Vec::new(),
            custom_filters: None,
            ongoing: Vec::new(),
            ping: None,
            shutdown: CancellationToken::new(),
        };
        maintainer.set_custom_filters();
        maintainer.start_loading_storage();
        maintainer
    }

    fn name(&self) -> &str {
        self.configuration.name()
    }

    fn start_loading_storage(&mut self) {
        self.storage_state = StorageState::Loading;
        let storage = self.deps.storage.clone();
        let events = self.events.clone();
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown.cancelled() => {}
                loaded = storage.load_subscriptions() => events(MaintainerEvent::StorageLoaded(loaded)),
            }
        });
    }

    fn on_storage_loaded(&mut self, loaded: Vec<Arc<dyn InstalledSubscription>>) {
        if self.storage_state != StorageState::Loading {
            warn!(configuration = %self.name(), "Unexpected storage load result, ignoring");
            return;
        }
        self.storage_state = StorageState::Initialized;
        self.current_state = self.remove_duplicate_subscriptions(loaded);
        info!(
            configuration = %self.name(),
            subscriptions = self.current_state.len(),
            "Subscription storage initialized"
        );
        self.reconcile();
    }

    /// Keeps the first subscription per URL and removes the rest from storage.
    fn remove_duplicate_subscriptions(
        &self,
        loaded: Vec<Arc<dyn InstalledSubscription>>,
    ) -> Vec<Arc<dyn InstalledSubscription>> {
        let mut seen = HashSet::new();
        let mut unique = Vec::with_capacity(loaded.len());
        for subscription in loaded {
            if seen.insert(subscription.source_url().clone()) {
                unique.push(subscription);
            } else {
                warn!(
                    configuration = %self.name(),
                    url = %subscription.source_url(),
                    "Removing duplicate subscription from storage"
                );
                self.spawn_storage_removal(subscription);
            }
        }
        unique
    }

    fn reconcile(&mut self) {
        if self.storage_state != StorageState::Initialized {
            // Storage load finishes with a full reconciliation.
            debug!(configuration = %self.name(), "Reconciliation deferred until storage is loaded");
            return;
        }
        self.install_missing_subscriptions();
        self.remove_unneeded_subscriptions();
        self.update_preloaded_provider();
    }

    fn install_missing_subscriptions(&mut self) {
        for url in self.configuration.filter_lists() {
            if self.is_installed(&url) || self.is_pending(&url) {
                continue;
            }
            self.start_installation(url, InstallationKind::Initial);
        }
    }

    fn remove_unneeded_subscriptions(&mut self) {
        let desired: HashSet<Url> = self.configuration.filter_lists().into_iter().collect();

        let (keep, unneeded): (Vec<_>, Vec<_>) = std::mem::take(&mut self.current_state)
            .into_iter()
            .partition(|s| desired.contains(s.source_url()));
        self.current_state = keep;
        for subscription in unneeded {
            let url = subscription.source_url().clone();
            info!(configuration = %self.name(), url = %url, "Uninstalling subscription");
            self.spawn_storage_removal(subscription);
            self.forget_metadata(&url);
        }

        let (keep, cancelled): (Vec<_>, Vec<_>) = std::mem::take(&mut self.ongoing)
            .into_iter()
            .partition(|i| desired.contains(&i.url));
        self.ongoing = keep;
        for installation in cancelled {
            info!(configuration = %self.name(), url = %installation.url, "Cancelling installation");
            self.cancel_installation(&installation);
            self.forget_metadata(&installation.url);
        }
    }

    fn is_installed(&self, url: &Url) -> bool {
        self.current_state.iter().any(|s| s.source_url() == url)
    }

    fn is_pending(&self, url: &Url) -> bool {
        self.ongoing.iter().any(|i| &i.url == url)
    }

    fn forget_metadata(&self, url: &Url) {
        // Acceptable Ads metadata drives the HEAD ping even while the list
        // is not installed.
        if url.as_str() != ACCEPTABLE_ADS_URL {
            self.deps.metadata.remove_metadata(url);
        }
    }

    fn cancel_installation(&self, installation: &OngoingInstallation) {
        installation.token.cancel();
        self.deps.downloader.cancel_download(&installation.url);
    }

    fn spawn_storage_removal(&self, subscription: Arc<dyn InstalledSubscription>) {
        let storage = self.deps.storage.clone();
        tokio::spawn(async move {
            storage.remove_subscription(subscription).await;
        });
    }

    fn start_installation(&mut self, url: Url, kind: InstallationKind) {
        let installation = OngoingInstallation::new(url.clone(), kind, self.shutdown.child_token());
        info!(configuration = %self.name(), url = %url, ?kind, "Downloading subscription");

        let id = installation.id;
        let token = installation.token.clone();
        let downloader = self.deps.downloader.clone();
        let converter = self.deps.converter.clone();
        let metadata = self.deps.metadata.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                data = download_and_convert(
                    &url,
                    kind.retry_policy(),
                    downloader.as_ref(),
                    converter.as_ref(),
                    metadata.as_ref(),
                ) => events(MaintainerEvent::DownloadFinished { installation_id: id, data }),
            }
        });

        self.ongoing.push(installation);
    }

    fn on_download_finished(&mut self, id: InstallationId, data: Option<Vec<u8>>) {
        let Some(installation) = self.ongoing.iter().find(|i| i.id == id) else {
            debug!(configuration = %self.name(), "Download result discarded, installation was cancelled");
            return;
        };

        let Some(data) = data else {
            warn!(
                configuration = %self.name(),
                url = %installation.url,
                "Subscription download failed, will retry on next update check"
            );
            self.ongoing.retain(|i| i.id != id);
            self.update_preloaded_provider();
            return;
        };

        let storage = self.deps.storage.clone();
        let events = self.events.clone();
        let token = installation.token.clone();
        tokio::spawn(async move {
            let subscription = storage.store_subscription(data).await;
            if token.is_cancelled() {
                if let Some(subscription) = subscription {
                    storage.remove_subscription(subscription).await;
                }
                return;
            }
            events(MaintainerEvent::StoreFinished {
                installation_id: id,
                subscription,
            });
        });
    }

    fn on_store_finished(
        &mut self,
        id: InstallationId,
        subscription: Option<Arc<dyn InstalledSubscription>>,
    ) -> Option<Url> {
        let Some(position) = self.ongoing.iter().position(|i| i.id == id) else {
            if let Some(subscription) = subscription {
                debug!(
                    configuration = %self.name(),
                    url = %subscription.source_url(),
                    "Installation cancelled after storing, removing stored copy"
                );
                self.spawn_storage_removal(subscription);
            }
            return None;
        };
        let installation = self.ongoing.remove(position);

        let Some(subscription) = subscription else {
            warn!(configuration = %self.name(), url = %installation.url, "Failed to store subscription");
            self.update_preloaded_provider();
            return None;
        };

        let url = subscription.source_url().clone();
        if url != installation.url {
            warn!(
                configuration = %self.name(),
                expected = %installation.url,
                stored = %url,
                "Stored subscription URL differs from requested URL"
            );
        }

        let (replaced, keep): (Vec<_>, Vec<_>) = std::mem::take(&mut self.current_state)
            .into_iter()
            .partition(|s| s.source_url() == &url);
        self.current_state = keep;
        for old in replaced {
            self.spawn_storage_removal(old);
        }

        info!(
            configuration = %self.name(),
            url = %url,
            version = %subscription.current_version(),
            "Subscription installed"
        );
        self.current_state.push(subscription);
        self.update_preloaded_provider();
        Some(url)
    }

    fn maybe_ping_acceptable_ads(&mut self) {
        let aa = acceptable_ads_url();
        if self.ping.is_some()
            || self.is_installed(&aa)
            || self.is_pending(&aa)
            || !self.deps.metadata.is_expired(&aa)
        {
            return;
        }

        debug!(configuration = %self.name(), "Sending Acceptable Ads ping");
        let token = self.shutdown.child_token();
        self.ping = Some(token.clone());
        let downloader = self.deps.downloader.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                version = downloader.head_request(&aa) => events(MaintainerEvent::PingFinished { version }),
            }
        });
    }

    fn on_ping_finished(&mut self, version: Option<String>) {
        self.ping = None;
        match version.filter(|v| !v.is_empty()) {
            Some(version) => {
                let aa = acceptable_ads_url();
                self.deps.metadata.set_version(&aa, &version);
                self.deps
                    .metadata
                    .set_expiration_interval(&aa, PING_EXPIRATION_INTERVAL);
                debug!(version = %version, "Acceptable Ads ping succeeded");
            }
            None => debug!("Acceptable Ads ping failed, will retry on next update check"),
        }
    }

    fn set_custom_filters(&mut self) {
        let mut filters = self.configuration.custom_filters();
        filters.extend(
            self.configuration
                .allowed_domains()
                .iter()
                .map(|domain| allowed_domain_filter(domain)),
        );

        self.custom_filters = if filters.is_empty() {
            None
        } else {
            Some(self.deps.converter.convert_custom_filters(&filters))
        };
        debug!(configuration = %self.name(), filters = filters.len(), "Custom filters updated");
    }

    fn update_preloaded_provider(&self) {
        let installed: Vec<Url> = self
            .current_state
            .iter()
            .map(|s| s.source_url().clone())
            .collect();
        let pending: Vec<Url> = self.ongoing.iter().map(|i| i.url.clone()).collect();
        self.deps.preloaded.update_subscriptions(&installed, &pending);
    }

    fn subscription_info(&self, subscription: &dyn InstalledSubscription) -> SubscriptionInfo {
        let mut info = subscription.info();
        if info.installation_state == InstallationState::Installed
            && self.deps.metadata.is_auto_installed(&info.url)
        {
            info.installation_state = InstallationState::AutoInstalled;
        }
        info
    }
}

/// Document exception that disables filtering on `domain` and its subdomains.
pub(crate) fn allowed_domain_filter(domain: &str) -> String {
    format!("@@||{domain}^$document,domain={domain}")
}

async fn download_and_convert(
    url: &Url,
    retry_policy: RetryPolicy,
    downloader: &dyn SubscriptionDownloader,
    converter: &dyn ConversionExecutors,
    metadata: &dyn SubscriptionPersistentMetadata,
) -> Option<Vec<u8>> {
    let mut source = url.clone();
    let mut redirects = 0;
    loop {
        let content = downloader.download(&source, retry_policy).await?;
        match converter.convert_filter_list(url, content).await {
            ConversionResult::Ok(data) => return Some(data),
            ConversionResult::Redirect(target) => {
                if !validators::is_download_allowed(&target) {
                    warn!(url = %url, redirect = %target, "Redirect URL not allowed, aborting download");
                    return None;
                }
                if target == source {
                    warn!(url = %url, "Redirect to the same URL is not permitted, aborting download");
                    return None;
                }
                if redirects >= MAX_NUMBER_OF_REDIRECTS {
                    warn!(url = %url, "Maximum number of redirects exceeded, aborting download");
                    return None;
                }
                redirects += 1;
                debug!(url = %url, redirect = %target, "Following subscription redirect");
                source = target;
            }
            ConversionResult::Error(e) => {
                metadata.increment_download_error_count(url);
                warn!(url = %url, error = %e, "Subscription conversion failed");
                return None;
            }
        }
    }
}

impl FilteringConfigurationMaintainer for FilteringConfigurationMaintainerImpl {
    fn subscription_collection(&self) -> SubscriptionCollection {
        let mut subscriptions = self.current_state.clone();
        subscriptions.extend(self.custom_filters.iter().cloned());
        subscriptions.extend(self.deps.preloaded.current_preloaded_subscriptions());
        SubscriptionCollection::new(self.name(), subscriptions)
    }

    fn current_subscriptions(&self) -> Vec<SubscriptionInfo> {
        let mut infos: Vec<SubscriptionInfo> = self
            .current_state
            .iter()
            .map(|s| self.subscription_info(s.as_ref()))
            .collect();
        infos.extend(
            self.deps
                .preloaded
                .current_preloaded_subscriptions()
                .iter()
                .map(|s| s.info()),
        );
        for installation in &self.ongoing {
            if installation.kind == InstallationKind::Initial
                && !infos.iter().any(|i| i.url == installation.url)
            {
                infos.push(SubscriptionInfo::placeholder(
                    installation.url.clone(),
                    InstallationState::Installing,
                ));
            }
        }
        infos
    }

    #[instrument(skip(self), fields(configuration = %self.configuration.name()))]
    fn on_filter_lists_changed(&mut self) {
        self.reconcile();
    }

    #[instrument(skip(self), fields(configuration = %self.configuration.name()))]
    fn on_custom_filters_changed(&mut self) {
        self.set_custom_filters();
    }

    #[instrument(skip(self), fields(configuration = %self.configuration.name()))]
    fn run_update_check(&mut self) {
        if self.storage_state != StorageState::Initialized {
            debug!("Storage not loaded yet, skipping update check");
            return;
        }

        let expired: Vec<Url> = self
            .current_state
            .iter()
            .map(|s| s.source_url().clone())
            .filter(|url| !self.is_pending(url) && self.deps.metadata.is_expired(url))
            .collect();
        for url in expired {
            self.start_installation(url, InstallationKind::Update);
        }

        if self.name() == ADBLOCK_CONFIGURATION_NAME {
            self.maybe_ping_acceptable_ads();
        }
        self.update_preloaded_provider();
    }

    fn remove_auto_installed_subscriptions(&mut self) {
        for url in self.configuration.filter_lists() {
            if self.deps.metadata.is_auto_installed(&url) {
                info!(configuration = %self.name(), url = %url, "Removing auto-installed subscription");
                self.configuration.remove_filter_list(&url);
            }
        }
    }

    fn handle_event(&mut self, event: MaintainerEvent) -> Option<Url> {
        match event {
            MaintainerEvent::StorageLoaded(loaded) => {
                self.on_storage_loaded(loaded);
                None
            }
            MaintainerEvent::DownloadFinished {
                installation_id,
                data,
            } => {
                self.on_download_finished(installation_id, data);
                None
            }
            MaintainerEvent::StoreFinished {
                installation_id,
                subscription,
            } => self.on_store_finished(installation_id, subscription),
            MaintainerEvent::PingFinished { version } => {
                self.on_ping_finished(version);
                None
            }
        }
    }
}

impl Drop for FilteringConfigurationMaintainerImpl {
    fn drop(&mut self) {
        self.shutdown.cancel();
        for installation in &self.ongoing {
            self.deps.downloader.cancel_download(&installation.url);
        }
    }
}
