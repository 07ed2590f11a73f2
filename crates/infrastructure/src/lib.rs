//! Ferrous Adblock Infrastructure Layer
//!
//! Concrete adapters behind the application ports:
//! - `preferences`: JSON file and in-memory preference stores
//! - `filters`: filter list parsing and the in-memory ruleset subscription
//! - `subscription`: metadata, downloader, disk storage, preloaded lists,
//!   configuration cleanup and the maintainer factory wiring them together

pub mod filters;
pub mod preferences;
pub mod subscription;

pub use filters::{RulesetSubscription, TextConversionExecutors};
pub use preferences::{InMemoryPreferenceStore, JsonFilePreferenceStore};
pub use subscription::{
    BundledPreloadedSubscriptionProvider, DefaultMaintainerFactory,
    DirectoryConfigurationCleaner, DiskSubscriptionStorage, HttpSubscriptionDownloader,
    PrefsSubscriptionMetadata, SubscriptionSignatures,
};
