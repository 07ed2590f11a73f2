//! Ferrous Adblock Application Layer
pub mod configuration;
pub mod observer;
pub mod ports;
pub mod services;

pub use configuration::{
    FilteringConfiguration, FilteringConfigurationObserver, InMemoryFilteringConfiguration,
    PersistentFilteringConfiguration,
};
pub use observer::{ObserverId, ObserverRegistry};
