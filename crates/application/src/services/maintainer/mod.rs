//! Per-configuration reconciliation of desired and installed subscriptions.

mod maintainer_impl;
mod ongoing_installation;

pub use maintainer_impl::FilteringConfigurationMaintainerImpl;
pub use ongoing_installation::{InstallationId, InstallationKind};

use crate::configuration::FilteringConfiguration;
use crate::ports::{
    ConversionExecutors, InstalledSubscription, PreloadedSubscriptionProvider,
    SubscriptionDownloader, SubscriptionPersistentMetadata, SubscriptionPersistentStorage,
};
use crate::services::SubscriptionCollection;
use ferrous_adblock_domain::SubscriptionInfo;
use std::sync::Arc;
use url::Url;

/// Completion of asynchronous maintainer work, delivered back to the owner
/// of the maintainer and fed to [`FilteringConfigurationMaintainer::handle_event`].
pub enum MaintainerEvent {
    StorageLoaded(Vec<Arc<dyn InstalledSubscription>>),
    DownloadFinished {
        installation_id: InstallationId,
        data: Option<Vec<u8>>,
    },
    StoreFinished {
        installation_id: InstallationId,
        subscription: Option<Arc<dyn InstalledSubscription>>,
    },
    PingFinished {
        version: Option<String>,
    },
}

impl std::fmt::Debug for MaintainerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StorageLoaded(subs) => write!(f, "StorageLoaded({} subscriptions)", subs.len()),
            Self::DownloadFinished { installation_id, data } => write!(
                f,
                "DownloadFinished({installation_id:?}, {} bytes)",
                data.as_ref().map(Vec::len).unwrap_or(0)
            ),
            Self::StoreFinished { installation_id, subscription } => write!(
                f,
                "StoreFinished({installation_id:?}, stored: {})",
                subscription.is_some()
            ),
            Self::PingFinished { version } => write!(f, "PingFinished({version:?})"),
        }
    }
}

/// Callback through which spawned tasks report back.
pub type MaintainerEventSink = Arc<dyn Fn(MaintainerEvent) + Send + Sync>;

/// Keeps one configuration's installed subscriptions in line with what it
/// declares.
///
/// All methods are called from a single owner. Long-running work runs in
/// spawned tasks whose results come back through [`MaintainerEvent`]s.
pub trait FilteringConfigurationMaintainer: Send {
    /// Installed subscriptions, the custom filters subscription and
    /// preloaded fallbacks, frozen into a collection.
    fn subscription_collection(&self) -> SubscriptionCollection;

    /// Metadata of installed, preloaded and installing subscriptions.
    fn current_subscriptions(&self) -> Vec<SubscriptionInfo>;

    fn on_filter_lists_changed(&mut self);

    /// Regenerates the custom filters subscription from custom filters and
    /// allowed domains.
    fn on_custom_filters_changed(&mut self);

    /// Re-downloads expired subscriptions.
    fn run_update_check(&mut self);

    /// Removes every auto-installed filter list from the configuration.
    fn remove_auto_installed_subscriptions(&mut self);

    /// Applies a completion event.
    ///
    /// # Returns
    /// The URL of a subscription that was just installed or updated
    fn handle_event(&mut self, event: MaintainerEvent) -> Option<Url>;
}

/// Collaborators a maintainer works with.
#[derive(Clone)]
pub struct MaintainerDependencies {
    pub storage: Arc<dyn SubscriptionPersistentStorage>,
    pub metadata: Arc<dyn SubscriptionPersistentMetadata>,
    pub downloader: Arc<dyn SubscriptionDownloader>,
    pub converter: Arc<dyn ConversionExecutors>,
    pub preloaded: Arc<dyn PreloadedSubscriptionProvider>,
}

/// Builds maintainers for configurations as they get enabled.
pub trait MaintainerFactory: Send + Sync {
    fn create_maintainer(
        &self,
        configuration: Arc<dyn FilteringConfiguration>,
        events: MaintainerEventSink,
    ) -> Box<dyn FilteringConfigurationMaintainer>;
}
