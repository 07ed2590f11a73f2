pub mod configuration_cleaner;
pub mod conversion_executors;
pub mod installed_subscription;
pub mod preference_store;
pub mod preloaded_subscription_provider;
pub mod subscription_downloader;
pub mod subscription_metadata;
pub mod subscription_storage;

pub use configuration_cleaner::FilteringConfigurationCleaner;
pub use conversion_executors::{ConversionExecutors, ConversionResult};
pub use installed_subscription::InstalledSubscription;
pub use preference_store::{read_pref, write_pref, PreferenceStore};
pub use preloaded_subscription_provider::PreloadedSubscriptionProvider;
pub use subscription_downloader::SubscriptionDownloader;
pub use subscription_metadata::SubscriptionPersistentMetadata;
pub use subscription_storage::SubscriptionPersistentStorage;
