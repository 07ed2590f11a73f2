use super::storage::{configuration_directory, SubscriptionSignatures};
use async_trait::async_trait;
use ferrous_adblock_application::configuration::PersistentFilteringConfiguration;
use ferrous_adblock_application::ports::{FilteringConfigurationCleaner, PreferenceStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, instrument};

/// Deletes the persisted record, signatures and subscription directory of an
/// uninstalled configuration.
pub struct DirectoryConfigurationCleaner {
    subscriptions_root: PathBuf,
    prefs: Arc<dyn PreferenceStore>,
    signatures: Arc<SubscriptionSignatures>,
}

impl DirectoryConfigurationCleaner {
    pub fn new(
        subscriptions_root: PathBuf,
        prefs: Arc<dyn PreferenceStore>,
        signatures: Arc<SubscriptionSignatures>,
    ) -> Self {
        Self {
            subscriptions_root,
            prefs,
            signatures,
        }
    }
}

#[async_trait]
impl FilteringConfigurationCleaner for DirectoryConfigurationCleaner {
    #[instrument(skip(self))]
    async fn clean(&self, configuration_name: &str) {
        if let Err(e) =
            PersistentFilteringConfiguration::remove_persisted_data(self.prefs.as_ref(), configuration_name)
        {
            error!(error = %e, "Failed to remove persisted configuration");
        }

        let directory = configuration_directory(&self.subscriptions_root, configuration_name);
        if let Some(name) = directory.file_name().and_then(|n| n.to_str()) {
            self.signatures.remove_prefixed(&format!("{name}/"));
        }

        match tokio::fs::remove_dir_all(&directory).await {
            Ok(()) => info!(path = %directory.display(), "Configuration data removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => error!(path = %directory.display(), error = %e, "Failed to remove configuration data"),
        }
    }
}
