//! Registry of filtering configurations and their maintainers.

mod actor;

use crate::configuration::FilteringConfiguration;
use crate::observer::{ObserverId, ObserverRegistry};
use crate::ports::{read_pref, write_pref, FilteringConfigurationCleaner, PreferenceStore};
use crate::services::maintainer::MaintainerFactory;
use crate::services::subscription_collection::Snapshot;
use actor::{Command, ServiceActor};
use arc_swap::ArcSwap;
use async_trait::async_trait;
use ferrous_adblock_domain::SubscriptionInfo;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info};
use url::Url;

/// Preference key holding the auto-install flag.
pub const AUTO_INSTALL_ENABLED_PREF: &str = "adblock.auto_install_enabled";

/// Receives subscription lifecycle notifications.
pub trait SubscriptionObserver: Send + Sync {
    /// A subscription finished installing or updating.
    fn on_subscription_installed(&self, _url: &Url) {}
    fn on_configuration_uninstalled(&self, _configuration_name: &str) {}
}

#[async_trait]
pub trait SubscriptionService: Send + Sync {
    /// Registers `configuration`. A maintainer is created only while the
    /// configuration is enabled. While data of an uninstalled configuration
    /// with the same name is still being erased, registration waits for it.
    ///
    /// # Returns
    /// `false` if a configuration with the same name is already installed
    async fn install_filtering_configuration(
        &self,
        configuration: Arc<dyn FilteringConfiguration>,
    ) -> bool;

    /// Unregisters configuration `name`, cancels its work and erases its
    /// persisted data. Completes once the data is gone.
    ///
    /// # Returns
    /// `false` if no such configuration is installed
    async fn uninstall_filtering_configuration(&self, name: &str) -> bool;

    /// Collections of every enabled configuration, in registration order.
    async fn current_snapshot(&self) -> Snapshot;

    /// Snapshot published after the last processed change. Never blocks.
    fn latest_snapshot(&self) -> Arc<Snapshot>;

    /// Declared filter lists of `name` merged with what its maintainer
    /// knows about them.
    async fn current_subscriptions(&self, name: &str) -> Vec<SubscriptionInfo>;

    async fn installed_filtering_configurations(&self) -> Vec<Arc<dyn FilteringConfiguration>>;

    async fn filtering_configuration(&self, name: &str) -> Option<Arc<dyn FilteringConfiguration>>;

    async fn set_auto_install_enabled(&self, enabled: bool);

    fn is_auto_install_enabled(&self) -> bool;

    /// Asks every maintainer to refresh expired subscriptions.
    async fn run_update_check(&self);

    fn add_observer(&self, observer: Arc<dyn SubscriptionObserver>) -> ObserverId;

    fn remove_observer(&self, id: ObserverId) -> bool;
}

/// Cloneable handle to the service actor.
///
/// The actor task exits once every handle is dropped.
#[derive(Clone)]
pub struct SubscriptionServiceImpl {
    commands: mpsc::UnboundedSender<Command>,
    snapshot: Arc<ArcSwap<Snapshot>>,
    observers: Arc<ObserverRegistry<dyn SubscriptionObserver>>,
    prefs: Arc<dyn PreferenceStore>,
}

impl SubscriptionServiceImpl {
    /// Spawns the actor. Must be called inside a Tokio runtime.
    pub fn start(
        factory: Arc<dyn MaintainerFactory>,
        cleaner: Arc<dyn FilteringConfigurationCleaner>,
        prefs: Arc<dyn PreferenceStore>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let snapshot = Arc::new(ArcSwap::from_pointee(Snapshot::new()));
        let observers = Arc::new(ObserverRegistry::new());

        let actor = ServiceActor::new(
            tx.downgrade(),
            factory,
            cleaner,
            snapshot.clone(),
            observers.clone(),
        );
        tokio::spawn(actor.run(rx));
        info!("Subscription service started");

        Self {
            commands: tx,
            snapshot,
            observers,
            prefs,
        }
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            error!("Subscription service actor has stopped");
        }
    }

    async fn request<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> Command) -> Option<T> {
        let (reply, response) = oneshot::channel();
        self.send(command(reply));
        response.await.ok()
    }
}

#[async_trait]
impl SubscriptionService for SubscriptionServiceImpl {
    async fn install_filtering_configuration(
        &self,
        configuration: Arc<dyn FilteringConfiguration>,
    ) -> bool {
        self.request(|reply| Command::Install {
            configuration,
            reply,
        })
        .await
        .unwrap_or(false)
    }

    async fn uninstall_filtering_configuration(&self, name: &str) -> bool {
        let name = name.to_string();
        self.request(|reply| Command::Uninstall { name, reply })
            .await
            .unwrap_or(false)
    }

    async fn current_snapshot(&self) -> Snapshot {
        self.request(|reply| Command::Snapshot { reply })
            .await
            .unwrap_or_default()
    }

    fn latest_snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.load_full()
    }

    async fn current_subscriptions(&self, name: &str) -> Vec<SubscriptionInfo> {
        let name = name.to_string();
        self.request(|reply| Command::CurrentSubscriptions { name, reply })
            .await
            .unwrap_or_default()
    }

    async fn installed_filtering_configurations(&self) -> Vec<Arc<dyn FilteringConfiguration>> {
        self.request(|reply| Command::InstalledConfigurations { reply })
            .await
            .unwrap_or_default()
    }

    async fn filtering_configuration(&self, name: &str) -> Option<Arc<dyn FilteringConfiguration>> {
        self.installed_filtering_configurations()
            .await
            .into_iter()
            .find(|c| c.name() == name)
    }

    async fn set_auto_install_enabled(&self, enabled: bool) {
        if let Err(e) = write_pref(self.prefs.as_ref(), AUTO_INSTALL_ENABLED_PREF, &enabled) {
            error!(error = %e, "Failed to persist auto-install flag");
        }
        info!(enabled, "Auto-install of recommended subscriptions changed");
        if !enabled {
            self.request(|reply| Command::RemoveAutoInstalled { reply })
                .await;
        }
    }

    fn is_auto_install_enabled(&self) -> bool {
        read_pref(self.prefs.as_ref(), AUTO_INSTALL_ENABLED_PREF).unwrap_or(true)
    }

    async fn run_update_check(&self) {
        self.request(|reply| Command::RunUpdateCheck { reply }).await;
    }

    fn add_observer(&self, observer: Arc<dyn SubscriptionObserver>) -> ObserverId {
        self.observers.add(observer)
    }

    fn remove_observer(&self, id: ObserverId) -> bool {
        self.observers.remove(id)
    }
}
