pub mod cleaner;
pub mod downloader;
pub mod maintainer_factory;
pub mod metadata;
pub mod preloaded;
pub mod storage;

pub use cleaner::DirectoryConfigurationCleaner;
pub use downloader::HttpSubscriptionDownloader;
pub use maintainer_factory::DefaultMaintainerFactory;
pub use metadata::{PrefsSubscriptionMetadata, SUBSCRIPTION_METADATA_PREF};
pub use preloaded::BundledPreloadedSubscriptionProvider;
pub use storage::{
    configuration_directory, DiskSubscriptionStorage, SubscriptionSignatures,
    SUBSCRIPTION_SIGNATURES_PREF,
};
