use super::downloader::HttpSubscriptionDownloader;
use super::preloaded::BundledPreloadedSubscriptionProvider;
use super::storage::{configuration_directory, DiskSubscriptionStorage, SubscriptionSignatures};
use ferrous_adblock_application::configuration::FilteringConfiguration;
use ferrous_adblock_application::ports::{ConversionExecutors, SubscriptionPersistentMetadata};
use ferrous_adblock_application::services::{
    FilteringConfigurationMaintainer, FilteringConfigurationMaintainerImpl, MaintainerDependencies,
    MaintainerEventSink, MaintainerFactory,
};
use ferrous_adblock_domain::config::PreloadedSubscription;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Builds maintainers backed by a per-configuration subscription directory,
/// downloader and preloaded provider. Metadata, converter and the HTTP client
/// are shared.
pub struct DefaultMaintainerFactory {
    subscriptions_root: PathBuf,
    signatures: Arc<SubscriptionSignatures>,
    metadata: Arc<dyn SubscriptionPersistentMetadata>,
    downloader: Arc<HttpSubscriptionDownloader>,
    converter: Arc<dyn ConversionExecutors>,
    preloaded: Vec<PreloadedSubscription>,
}

impl DefaultMaintainerFactory {
    pub fn new(
        subscriptions_root: PathBuf,
        signatures: Arc<SubscriptionSignatures>,
        metadata: Arc<dyn SubscriptionPersistentMetadata>,
        downloader: Arc<HttpSubscriptionDownloader>,
        converter: Arc<dyn ConversionExecutors>,
        preloaded: Vec<PreloadedSubscription>,
    ) -> Self {
        Self {
            subscriptions_root,
            signatures,
            metadata,
            downloader,
            converter,
            preloaded,
        }
    }
}

impl MaintainerFactory for DefaultMaintainerFactory {
    fn create_maintainer(
        &self,
        configuration: Arc<dyn FilteringConfiguration>,
        events: MaintainerEventSink,
    ) -> Box<dyn FilteringConfigurationMaintainer> {
        let directory = configuration_directory(&self.subscriptions_root, configuration.name());
        debug!(
            configuration = %configuration.name(),
            directory = %directory.display(),
            "Creating maintainer"
        );

        let dependencies = MaintainerDependencies {
            storage: Arc::new(DiskSubscriptionStorage::new(
                directory,
                self.signatures.clone(),
                self.metadata.clone(),
            )),
            metadata: self.metadata.clone(),
            downloader: Arc::new(self.downloader.for_maintainer()),
            converter: self.converter.clone(),
            preloaded: Arc::new(BundledPreloadedSubscriptionProvider::new(self.preloaded.clone())),
        };
        Box::new(FilteringConfigurationMaintainerImpl::new(
            configuration,
            dependencies,
            events,
        ))
    }
}
