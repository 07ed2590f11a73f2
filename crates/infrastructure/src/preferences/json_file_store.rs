use ferrous_adblock_application::ports::PreferenceStore;
use ferrous_adblock_domain::DomainError;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, error, warn};

/// Preference store persisted as one JSON object on disk.
///
/// Every write rewrites the whole file through a temporary file and a
/// rename, so a crash never leaves a truncated document behind.
pub struct JsonFilePreferenceStore {
    path: PathBuf,
    values: RwLock<Map<String, Value>>,
}

impl JsonFilePreferenceStore {
    /// Opens `path`, creating its parent directory when missing.
    ///
    /// A missing file starts an empty store. An unreadable document is
    /// logged and replaced on the next write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, DomainError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let values = match std::fs::read(&path) {
            Ok(content) => match serde_json::from_slice::<Map<String, Value>>(&content) {
                Ok(values) => {
                    debug!(path = %path.display(), keys = values.len(), "Preferences loaded");
                    values
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Discarding malformed preferences file");
                    Map::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, values: &Map<String, Value>) -> Result<(), DomainError> {
        let content = serde_json::to_vec_pretty(values)
            .map_err(|e| DomainError::SerializationError(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            error!(path = %self.path.display(), error = %e, "Failed to replace preferences file");
            DomainError::PreferenceError(e.to_string())
        })
    }

    fn update(&self, f: impl FnOnce(&mut Map<String, Value>)) -> Result<(), DomainError> {
        let mut values = self
            .values
            .write()
            .map_err(|_| DomainError::PreferenceError("preference lock poisoned".to_string()))?;
        f(&mut values);
        self.persist(&values)
    }
}

impl PreferenceStore for JsonFilePreferenceStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.read().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) -> Result<(), DomainError> {
        self.update(|values| {
            values.insert(key.to_string(), value);
        })
    }

    fn remove(&self, key: &str) -> Result<(), DomainError> {
        self.update(|values| {
            values.remove(key);
        })
    }
}
