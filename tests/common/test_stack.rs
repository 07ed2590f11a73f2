use ferrous_adblock_application::configuration::{
    FilteringConfiguration, PersistentFilteringConfiguration,
};
use ferrous_adblock_application::ports::{PreferenceStore, SubscriptionPersistentMetadata};
use ferrous_adblock_application::services::{
    ResourceClassifier, ResourceClassifierImpl, SubscriptionService, SubscriptionServiceImpl,
};
use ferrous_adblock_domain::config::DownloaderConfig;
use ferrous_adblock_domain::{ClassificationDecision, ClassificationResult, ContentType, SiteKey};
use ferrous_adblock_infrastructure::{
    DefaultMaintainerFactory, DirectoryConfigurationCleaner, HttpSubscriptionDownloader,
    JsonFilePreferenceStore, PrefsSubscriptionMetadata, SubscriptionSignatures,
    TextConversionExecutors,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// The full production wiring over a data directory.
pub struct TestStack {
    pub prefs: Arc<dyn PreferenceStore>,
    pub metadata: Arc<dyn SubscriptionPersistentMetadata>,
    pub service: SubscriptionServiceImpl,
}

impl TestStack {
    pub fn start(data_dir: &Path) -> Self {
        let prefs: Arc<dyn PreferenceStore> =
            Arc::new(JsonFilePreferenceStore::open(data_dir.join("preferences.json")).unwrap());
        let metadata: Arc<dyn SubscriptionPersistentMetadata> =
            Arc::new(PrefsSubscriptionMetadata::new(prefs.clone()));
        let signatures = Arc::new(SubscriptionSignatures::new(prefs.clone()));
        let downloader = Arc::new(
            HttpSubscriptionDownloader::new(DownloaderConfig::default(), metadata.clone()).unwrap(),
        );
        let subscriptions = data_dir.join("subscriptions");

        let factory = Arc::new(DefaultMaintainerFactory::new(
            subscriptions.clone(),
            signatures.clone(),
            metadata.clone(),
            downloader,
            Arc::new(TextConversionExecutors::new()),
            vec![],
        ));
        let cleaner = Arc::new(DirectoryConfigurationCleaner::new(
            subscriptions,
            prefs.clone(),
            signatures,
        ));
        let service = SubscriptionServiceImpl::start(factory, cleaner, prefs.clone());

        Self {
            prefs,
            metadata,
            service,
        }
    }

    /// Creates (or reopens) a persisted configuration and installs it.
    pub async fn install(&self, name: &str) -> Arc<PersistentFilteringConfiguration> {
        let configuration = Arc::new(PersistentFilteringConfiguration::new(self.prefs.clone(), name));
        self.service
            .install_filtering_configuration(configuration.clone())
            .await;
        configuration
    }

    /// Installs every persisted configuration, as a restart would.
    pub async fn restore(&self) -> Vec<Arc<dyn FilteringConfiguration>> {
        let mut restored: Vec<Arc<dyn FilteringConfiguration>> = Vec::new();
        for configuration in PersistentFilteringConfiguration::persisted_configurations(self.prefs.clone()) {
            let configuration: Arc<dyn FilteringConfiguration> = Arc::new(configuration);
            self.service
                .install_filtering_configuration(configuration.clone())
                .await;
            restored.push(configuration);
        }
        restored
    }

    pub fn classify(&self, request: &Url, page: &Url, content_type: ContentType) -> ClassificationResult {
        ResourceClassifierImpl::new().classify_request(
            &self.service.latest_snapshot(),
            request,
            std::slice::from_ref(page),
            content_type,
            &SiteKey::default(),
        )
    }

    /// Polls until the request classifies as `expected` or two seconds pass.
    pub async fn wait_for(
        &self,
        request: &Url,
        page: &Url,
        expected: ClassificationDecision,
    ) -> ClassificationResult {
        let mut result = self.classify(request, page, ContentType::OTHER);
        for _ in 0..200 {
            if result.decision == expected {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
            result = self.classify(request, page, ContentType::OTHER);
        }
        result
    }
}
