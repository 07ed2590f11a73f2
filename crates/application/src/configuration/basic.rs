use super::{ConfigurationChange, FilteringConfiguration, FilteringConfigurationObserver};
use crate::observer::{ObserverId, ObserverRegistry};
use ferrous_adblock_domain::filtering_configuration::{insert_unique, remove_value};
use ferrous_adblock_domain::{validators, FilteringConfigurationRecord};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};
use url::Url;

/// Where a configuration writes its record after each change.
pub trait ConfigurationPersistence: Send + Sync {
    fn save(&self, name: &str, record: &FilteringConfigurationRecord);
}

/// Keeps the record in memory only.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPersistence;

impl ConfigurationPersistence for NoPersistence {
    fn save(&self, _name: &str, _record: &FilteringConfigurationRecord) {}
}

/// [`FilteringConfiguration`] over a typed record and a persistence backend.
pub struct GenericFilteringConfiguration<P: ConfigurationPersistence> {
    name: String,
    record: Mutex<FilteringConfigurationRecord>,
    observers: ObserverRegistry<dyn FilteringConfigurationObserver>,
    persistence: P,
}

pub type InMemoryFilteringConfiguration = GenericFilteringConfiguration<NoPersistence>;

impl InMemoryFilteringConfiguration {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_record(name, FilteringConfigurationRecord::default(), NoPersistence)
    }
}

impl<P: ConfigurationPersistence> GenericFilteringConfiguration<P> {
    pub(crate) fn with_record(
        name: impl Into<String>,
        record: FilteringConfigurationRecord,
        persistence: P,
    ) -> Self {
        Self {
            name: name.into(),
            record: Mutex::new(record),
            observers: ObserverRegistry::new(),
            persistence,
        }
    }

    /// Copy of the current record.
    pub fn record(&self) -> FilteringConfigurationRecord {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, FilteringConfigurationRecord> {
        self.record.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies `f`; on change persists under the lock, then notifies with
    /// the lock released.
    fn mutate(
        &self,
        change: ConfigurationChange,
        f: impl FnOnce(&mut FilteringConfigurationRecord) -> bool,
    ) -> bool {
        let changed = {
            let mut record = self.lock();
            let changed = f(&mut record);
            if changed {
                self.persistence.save(&self.name, &record);
            }
            changed
        };
        if changed {
            debug!(configuration = %self.name, ?change, "Filtering configuration changed");
            self.notify(change);
        }
        changed
    }

    fn notify(&self, change: ConfigurationChange) {
        let name = self.name.as_str();
        self.observers.notify(|o| match change {
            ConfigurationChange::EnabledState => o.on_enabled_state_changed(name),
            ConfigurationChange::FilterLists => o.on_filter_lists_changed(name),
            ConfigurationChange::AllowedDomains => o.on_allowed_domains_changed(name),
            ConfigurationChange::CustomFilters => o.on_custom_filters_changed(name),
        });
    }
}

fn normalize_domain(domain: &str) -> String {
    domain.trim().trim_end_matches('.').to_ascii_lowercase()
}

impl<P: ConfigurationPersistence> FilteringConfiguration for GenericFilteringConfiguration<P> {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_enabled(&self, enabled: bool) -> bool {
        self.mutate(ConfigurationChange::EnabledState, |r| {
            let changed = r.enabled != enabled;
            r.enabled = enabled;
            changed
        })
    }

    fn is_enabled(&self) -> bool {
        self.lock().enabled
    }

    fn add_filter_list(&self, url: &Url) -> bool {
        if let Err(e) = validators::validate_filter_list_url(url) {
            warn!(configuration = %self.name, url = %url, error = %e, "Rejected filter list");
            return false;
        }
        self.mutate(ConfigurationChange::FilterLists, |r| {
            insert_unique(&mut r.subscriptions, url.as_str())
        })
    }

    fn remove_filter_list(&self, url: &Url) -> bool {
        self.mutate(ConfigurationChange::FilterLists, |r| {
            remove_value(&mut r.subscriptions, url.as_str())
        })
    }

    fn filter_lists(&self) -> Vec<Url> {
        self.lock()
            .subscriptions
            .iter()
            .filter_map(|s| match Url::parse(s) {
                Ok(url) => Some(url),
                Err(e) => {
                    warn!(configuration = %self.name, url = %s, error = %e, "Skipping unparsable filter list");
                    None
                }
            })
            .collect()
    }

    fn is_filter_list_present(&self, url: &Url) -> bool {
        self.lock().subscriptions.iter().any(|s| s == url.as_str())
    }

    fn add_allowed_domain(&self, domain: &str) -> bool {
        let domain = normalize_domain(domain);
        if let Err(e) = validators::validate_domain(&domain) {
            warn!(configuration = %self.name, error = %e, "Rejected allowed domain");
            return false;
        }
        self.mutate(ConfigurationChange::AllowedDomains, |r| {
            insert_unique(&mut r.domains, &domain)
        })
    }

    fn remove_allowed_domain(&self, domain: &str) -> bool {
        let domain = normalize_domain(domain);
        self.mutate(ConfigurationChange::AllowedDomains, |r| {
            remove_value(&mut r.domains, &domain)
        })
    }

    fn allowed_domains(&self) -> Vec<String> {
        self.lock().domains.clone()
    }

    fn add_custom_filter(&self, filter: &str) -> bool {
        let filter = filter.trim();
        if let Err(e) = validators::validate_custom_filter(filter) {
            warn!(configuration = %self.name, error = %e, "Rejected custom filter");
            return false;
        }
        self.mutate(ConfigurationChange::CustomFilters, |r| {
            insert_unique(&mut r.filters, filter)
        })
    }

    fn remove_custom_filter(&self, filter: &str) -> bool {
        let filter = filter.trim();
        self.mutate(ConfigurationChange::CustomFilters, |r| {
            remove_value(&mut r.filters, filter)
        })
    }

    fn custom_filters(&self) -> Vec<String> {
        self.lock().filters.clone()
    }

    fn add_observer(&self, observer: Arc<dyn FilteringConfigurationObserver>) -> ObserverId {
        self.observers.add(observer)
    }

    fn remove_observer(&self, id: ObserverId) -> bool {
        self.observers.remove(id)
    }
}
