//! Wiring of the concrete adapters behind the application services.

use anyhow::Context;
use ferrous_adblock_application::configuration::{
    FilteringConfiguration, PersistentFilteringConfiguration,
};
use ferrous_adblock_application::ports::{
    read_pref, ConversionExecutors, PreferenceStore, SubscriptionPersistentMetadata,
};
use ferrous_adblock_application::services::{
    RecommendedSubscriptionInstaller, SubscriptionService, SubscriptionServiceImpl,
    AUTO_INSTALL_ENABLED_PREF,
};
use ferrous_adblock_domain::config::DefaultConfiguration;
use ferrous_adblock_domain::Config;
use ferrous_adblock_infrastructure::{
    DefaultMaintainerFactory, DirectoryConfigurationCleaner, HttpSubscriptionDownloader,
    JsonFilePreferenceStore, PrefsSubscriptionMetadata, SubscriptionSignatures,
    TextConversionExecutors,
};
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

/// Shared adapters for one data directory.
pub struct AdblockServices {
    pub config: Config,
    pub prefs: Arc<dyn PreferenceStore>,
    pub metadata: Arc<dyn SubscriptionPersistentMetadata>,
    pub downloader: Arc<HttpSubscriptionDownloader>,
    pub converter: Arc<dyn ConversionExecutors>,
    pub signatures: Arc<SubscriptionSignatures>,
    pub cleaner: Arc<DirectoryConfigurationCleaner>,
}

impl AdblockServices {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let preferences_path = config.storage.preferences_path();
        let prefs: Arc<dyn PreferenceStore> = Arc::new(
            JsonFilePreferenceStore::open(&preferences_path).with_context(|| {
                format!("opening preferences at {}", preferences_path.display())
            })?,
        );
        let metadata: Arc<dyn SubscriptionPersistentMetadata> =
            Arc::new(PrefsSubscriptionMetadata::new(prefs.clone()));
        let downloader = Arc::new(
            HttpSubscriptionDownloader::new(config.downloader.clone(), metadata.clone())?,
        );
        let signatures = Arc::new(SubscriptionSignatures::new(prefs.clone()));
        let cleaner = Arc::new(DirectoryConfigurationCleaner::new(
            config.storage.subscriptions_path(),
            prefs.clone(),
            signatures.clone(),
        ));

        Ok(Self {
            config,
            prefs,
            metadata,
            downloader,
            converter: Arc::new(TextConversionExecutors::new()),
            signatures,
            cleaner,
        })
    }

    /// Spawns the subscription service. Must run inside a Tokio runtime.
    pub async fn start_service(&self) -> SubscriptionServiceImpl {
        let factory = Arc::new(DefaultMaintainerFactory::new(
            self.config.storage.subscriptions_path(),
            self.signatures.clone(),
            self.metadata.clone(),
            self.downloader.clone(),
            self.converter.clone(),
            self.config.preloaded.clone(),
        ));
        let service =
            SubscriptionServiceImpl::start(factory, self.cleaner.clone(), self.prefs.clone());

        if read_pref::<bool>(self.prefs.as_ref(), AUTO_INSTALL_ENABLED_PREF).is_none() {
            service
                .set_auto_install_enabled(self.config.updates.auto_install_enabled)
                .await;
        }
        service
    }

    pub fn recommended_installer(
        &self,
        service: Arc<dyn SubscriptionService>,
    ) -> anyhow::Result<Arc<RecommendedSubscriptionInstaller>> {
        let url = Url::parse(&self.config.updates.recommendation_url)?;
        Ok(Arc::new(RecommendedSubscriptionInstaller::new(
            service,
            self.downloader.clone(),
            self.metadata.clone(),
            self.prefs.clone(),
            url,
        )))
    }

    /// Persisted configurations, or the first-run set when nothing is
    /// persisted yet.
    pub fn restore_configurations(&self) -> Vec<Arc<dyn FilteringConfiguration>> {
        let persisted = PersistentFilteringConfiguration::persisted_configurations(self.prefs.clone());
        if !persisted.is_empty() {
            info!(count = persisted.len(), "Restored filtering configurations");
            return persisted
                .into_iter()
                .map(|c| Arc::new(c) as Arc<dyn FilteringConfiguration>)
                .collect();
        }

        info!("No persisted configurations, creating defaults");
        self.config
            .first_run_configurations()
            .iter()
            .map(|defaults| self.create_configuration(defaults))
            .collect()
    }

    pub fn create_configuration(
        &self,
        defaults: &DefaultConfiguration,
    ) -> Arc<dyn FilteringConfiguration> {
        let configuration = PersistentFilteringConfiguration::new(self.prefs.clone(), &defaults.name);
        configuration.set_enabled(defaults.enabled);
        for list in &defaults.filter_lists {
            match Url::parse(list) {
                Ok(url) => {
                    configuration.add_filter_list(&url);
                }
                Err(e) => warn!(configuration = %defaults.name, list = %list, error = %e, "Skipping invalid filter list"),
            }
        }
        for domain in &defaults.allowed_domains {
            configuration.add_allowed_domain(domain);
        }
        for filter in &defaults.custom_filters {
            configuration.add_custom_filter(filter);
        }
        Arc::new(configuration)
    }

    /// Starts the service and installs every restored configuration.
    pub async fn start_with_configurations(&self) -> SubscriptionServiceImpl {
        let service = self.start_service().await;
        for configuration in self.restore_configurations() {
            let name = configuration.name().to_string();
            if !service.install_filtering_configuration(configuration).await {
                warn!(configuration = %name, "Configuration already installed");
            }
        }
        service
    }
}
