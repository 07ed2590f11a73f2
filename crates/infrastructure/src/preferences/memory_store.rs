use dashmap::DashMap;
use ferrous_adblock_application::ports::PreferenceStore;
use ferrous_adblock_domain::DomainError;
use serde_json::Value;

/// Non-persistent store, used by tests and one-shot commands.
#[derive(Default)]
pub struct InMemoryPreferenceStore {
    values: DashMap<String, Value>,
}

impl InMemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for InMemoryPreferenceStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).map(|v| v.value().clone())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), DomainError> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), DomainError> {
        self.values.remove(key);
        Ok(())
    }
}
