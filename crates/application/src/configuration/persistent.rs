use super::basic::{ConfigurationPersistence, GenericFilteringConfiguration};
use crate::ports::PreferenceStore;
use ferrous_adblock_domain::{DomainError, FilteringConfigurationRecord};
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{error, info, warn};

/// Preference key holding every persisted configuration, keyed by name.
pub const FILTERING_CONFIGURATIONS_PREF: &str = "adblock.filtering_configurations";

// Serializes read-modify-write cycles on the shared root map.
static ROOT_LOCK: Mutex<()> = Mutex::new(());

/// Writes the configuration record into the shared preference map.
pub struct PreferencePersistence {
    store: Arc<dyn PreferenceStore>,
}

impl ConfigurationPersistence for PreferencePersistence {
    fn save(&self, name: &str, record: &FilteringConfigurationRecord) {
        if let Err(e) = save_record(self.store.as_ref(), name, record) {
            error!(configuration = %name, error = %e, "Failed to persist filtering configuration");
        }
    }
}

/// A filtering configuration whose every change is written to a
/// [`PreferenceStore`] immediately.
pub type PersistentFilteringConfiguration = GenericFilteringConfiguration<PreferencePersistence>;

impl PersistentFilteringConfiguration {
    /// Opens configuration `name`, creating it with defaults if absent.
    ///
    /// Fields already persisted are kept; missing ones are filled in and
    /// written back.
    pub fn new(store: Arc<dyn PreferenceStore>, name: impl Into<String>) -> Self {
        let name = name.into();
        let record = load_record(store.as_ref(), &name).unwrap_or_default();
        let persistence = PreferencePersistence { store };
        persistence.save(&name, &record);
        Self::with_record(name, record, persistence)
    }

    /// Names of all persisted configurations, sorted.
    pub fn persisted_names(store: &dyn PreferenceStore) -> Vec<String> {
        let mut names: Vec<String> = read_root(store).keys().cloned().collect();
        names.sort();
        names
    }

    /// Re-opens every persisted configuration.
    pub fn persisted_configurations(store: Arc<dyn PreferenceStore>) -> Vec<Self> {
        Self::persisted_names(store.as_ref())
            .into_iter()
            .map(|name| Self::new(store.clone(), name))
            .collect()
    }

    /// Erases the persisted record of `name`.
    pub fn remove_persisted_data(store: &dyn PreferenceStore, name: &str) -> Result<(), DomainError> {
        let _guard = ROOT_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        let mut root = read_root(store);
        if root.remove(name).is_some() {
            store.set(FILTERING_CONFIGURATIONS_PREF, Value::Object(root))?;
            info!(configuration = %name, "Removed persisted filtering configuration");
        }
        Ok(())
    }
}

fn read_root(store: &dyn PreferenceStore) -> Map<String, Value> {
    match store.get(FILTERING_CONFIGURATIONS_PREF) {
        Some(Value::Object(map)) => map,
        Some(_) => {
            warn!("Persisted filtering configurations are not a map, starting over");
            Map::new()
        }
        None => Map::new(),
    }
}

fn load_record(store: &dyn PreferenceStore, name: &str) -> Option<FilteringConfigurationRecord> {
    let value = read_root(store).remove(name)?;
    match serde_json::from_value(value) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!(configuration = %name, error = %e, "Malformed persisted configuration, using defaults");
            None
        }
    }
}

fn save_record(
    store: &dyn PreferenceStore,
    name: &str,
    record: &FilteringConfigurationRecord,
) -> Result<(), DomainError> {
    let fields = match serde_json::to_value(record) {
        Ok(Value::Object(fields)) => fields,
        Ok(_) => return Err(DomainError::SerializationError("record is not a map".to_string())),
        Err(e) => return Err(DomainError::SerializationError(e.to_string())),
    };

    let _guard = ROOT_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    let mut root = read_root(store);
    // Keys this version does not know about survive the rewrite.
    let entry = root
        .entry(name.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !entry.is_object() {
        *entry = Value::Object(Map::new());
    }
    if let Value::Object(existing) = entry {
        existing.extend(fields);
    }
    store.set(FILTERING_CONFIGURATIONS_PREF, Value::Object(root))
}
