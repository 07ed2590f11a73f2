use ferrous_adblock_domain::DomainError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

/// Persisted key-value store for small JSON documents.
pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;

    fn set(&self, key: &str, value: Value) -> Result<(), DomainError>;

    fn remove(&self, key: &str) -> Result<(), DomainError>;
}

/// Reads and deserializes `key`. Malformed values are logged and ignored.
pub fn read_pref<T: DeserializeOwned>(store: &dyn PreferenceStore, key: &str) -> Option<T> {
    let value = store.get(key)?;
    match serde_json::from_value(value) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(key = %key, error = %e, "Ignoring malformed preference");
            None
        }
    }
}

pub fn write_pref<T: Serialize>(
    store: &dyn PreferenceStore,
    key: &str,
    value: &T,
) -> Result<(), DomainError> {
    let value =
        serde_json::to_value(value).map_err(|e| DomainError::SerializationError(e.to_string()))?;
    store.set(key, value)
}
