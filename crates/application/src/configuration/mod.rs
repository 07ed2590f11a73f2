//! Filtering configurations: named, observable bundles of filter lists,
//! allowed domains and custom filters.

pub mod basic;
pub mod persistent;

pub use basic::{ConfigurationPersistence, GenericFilteringConfiguration, InMemoryFilteringConfiguration, NoPersistence};
pub use persistent::{PersistentFilteringConfiguration, PreferencePersistence, FILTERING_CONFIGURATIONS_PREF};

use crate::observer::ObserverId;
use std::sync::Arc;
use url::Url;

/// Which part of a configuration changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigurationChange {
    EnabledState,
    FilterLists,
    AllowedDomains,
    CustomFilters,
}

/// Receives change notifications from a [`FilteringConfiguration`].
///
/// Each callback fires once per effective mutation and never for no-ops.
pub trait FilteringConfigurationObserver: Send + Sync {
    fn on_enabled_state_changed(&self, _configuration_name: &str) {}
    fn on_filter_lists_changed(&self, _configuration_name: &str) {}
    fn on_allowed_domains_changed(&self, _configuration_name: &str) {}
    fn on_custom_filters_changed(&self, _configuration_name: &str) {}
}

/// A named set of filtering settings.
///
/// Mutators return whether the state changed. Adding a present element or
/// removing an absent one changes nothing and notifies nobody.
pub trait FilteringConfiguration: Send + Sync {
    fn name(&self) -> &str;

    fn set_enabled(&self, enabled: bool) -> bool;
    fn is_enabled(&self) -> bool;

    fn add_filter_list(&self, url: &Url) -> bool;
    fn remove_filter_list(&self, url: &Url) -> bool;
    /// Filter list URLs in insertion order.
    fn filter_lists(&self) -> Vec<Url>;
    fn is_filter_list_present(&self, url: &Url) -> bool {
        self.filter_lists().iter().any(|u| u == url)
    }

    fn add_allowed_domain(&self, domain: &str) -> bool;
    fn remove_allowed_domain(&self, domain: &str) -> bool;
    fn allowed_domains(&self) -> Vec<String>;

    fn add_custom_filter(&self, filter: &str) -> bool;
    fn remove_custom_filter(&self, filter: &str) -> bool;
    fn custom_filters(&self) -> Vec<String>;

    fn add_observer(&self, observer: Arc<dyn FilteringConfigurationObserver>) -> ObserverId;
    fn remove_observer(&self, id: ObserverId) -> bool;
}
