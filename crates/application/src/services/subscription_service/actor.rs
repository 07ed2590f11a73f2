use super::SubscriptionObserver;
use crate::configuration::{ConfigurationChange, FilteringConfiguration, FilteringConfigurationObserver};
use crate::observer::{ObserverId, ObserverRegistry};
use crate::ports::FilteringConfigurationCleaner;
use crate::services::maintainer::{
    FilteringConfigurationMaintainer, MaintainerEvent, MaintainerEventSink, MaintainerFactory,
};
use crate::services::subscription_collection::Snapshot;
use arc_swap::ArcSwap;
use ferrous_adblock_domain::{InstallationState, SubscriptionInfo};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

pub(super) enum Command {
    Install {
        configuration: Arc<dyn FilteringConfiguration>,
        reply: oneshot::Sender<bool>,
    },
    Uninstall {
        name: String,
        reply: oneshot::Sender<bool>,
    },
    Snapshot {
        reply: oneshot::Sender<Snapshot>,
    },
    CurrentSubscriptions {
        name: String,
        reply: oneshot::Sender<Vec<SubscriptionInfo>>,
    },
    InstalledConfigurations {
        reply: oneshot::Sender<Vec<Arc<dyn FilteringConfiguration>>>,
    },
    RemoveAutoInstalled {
        reply: oneshot::Sender<()>,
    },
    RunUpdateCheck {
        reply: oneshot::Sender<()>,
    },
    ConfigurationChanged {
        name: String,
        change: ConfigurationChange,
    },
    Maintainer {
        name: String,
        generation: u64,
        event: MaintainerEvent,
    },
    CleanupFinished {
        name: String,
        reply: oneshot::Sender<bool>,
    },
}

/// Forwards configuration notifications into the actor's queue.
struct ConfigurationForwarder {
    commands: mpsc::WeakUnboundedSender<Command>,
}

impl ConfigurationForwarder {
    fn forward(&self, name: &str, change: ConfigurationChange) {
        if let Some(commands) = self.commands.upgrade() {
            let _ = commands.send(Command::ConfigurationChanged {
                name: name.to_string(),
                change,
            });
        }
    }
}

impl FilteringConfigurationObserver for ConfigurationForwarder {
    fn on_enabled_state_changed(&self, name: &str) {
        self.forward(name, ConfigurationChange::EnabledState);
    }

    fn on_filter_lists_changed(&self, name: &str) {
        self.forward(name, ConfigurationChange::FilterLists);
    }

    fn on_allowed_domains_changed(&self, name: &str) {
        self.forward(name, ConfigurationChange::AllowedDomains);
    }

    fn on_custom_filters_changed(&self, name: &str) {
        self.forward(name, ConfigurationChange::CustomFilters);
    }
}

struct Registration {
    configuration: Arc<dyn FilteringConfiguration>,
    observer_id: ObserverId,
    maintainer: Option<Box<dyn FilteringConfigurationMaintainer>>,
    // Identifies the current maintainer; events of a dropped one are stale.
    generation: u64,
}

pub(super) struct ServiceActor {
    commands: mpsc::WeakUnboundedSender<Command>,
    factory: Arc<dyn MaintainerFactory>,
    cleaner: Arc<dyn FilteringConfigurationCleaner>,
    snapshot: Arc<ArcSwap<Snapshot>>,
    observers: Arc<ObserverRegistry<dyn SubscriptionObserver>>,
    registrations: Vec<Registration>,
    next_generation: u64,
    // Names whose stored data is still being removed after an uninstall.
    cleaning: HashSet<String>,
    deferred_installs: Vec<(Arc<dyn FilteringConfiguration>, oneshot::Sender<bool>)>,
}

impl ServiceActor {
    pub(super) fn new(
        commands: mpsc::WeakUnboundedSender<Command>,
        factory: Arc<dyn MaintainerFactory>,
        cleaner: Arc<dyn FilteringConfigurationCleaner>,
        snapshot: Arc<ArcSwap<Snapshot>>,
        observers: Arc<ObserverRegistry<dyn SubscriptionObserver>>,
    ) -> Self {
        Self {
            commands,
            factory,
            cleaner,
            snapshot,
            observers,
            registrations: Vec::new(),
            next_generation: 0,
            cleaning: HashSet::new(),
            deferred_installs: Vec::new(),
        }
    }

    pub(super) async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        while let Some(command) = commands.recv().await {
            self.handle(command);
        }
        debug!("Subscription service actor stopped");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Install {
                configuration,
                reply,
            } => {
                if self.cleaning.contains(configuration.name()) {
                    debug!(
                        configuration = %configuration.name(),
                        "Installation deferred until previous data is cleaned up"
                    );
                    self.deferred_installs.push((configuration, reply));
                    return;
                }
                let installed = self.install(configuration);
                self.publish_snapshot();
                let _ = reply.send(installed);
            }
            Command::Uninstall { name, reply } => {
                self.uninstall(&name, reply);
                self.publish_snapshot();
            }
            Command::CleanupFinished { name, reply } => {
                self.on_cleanup_finished(&name);
                self.publish_snapshot();
                let _ = reply.send(true);
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.build_snapshot());
            }
            Command::CurrentSubscriptions { name, reply } => {
                let _ = reply.send(self.current_subscriptions(&name));
            }
            Command::InstalledConfigurations { reply } => {
                let configurations = self
                    .registrations
                    .iter()
                    .map(|r| r.configuration.clone())
                    .collect();
                let _ = reply.send(configurations);
            }
            Command::RemoveAutoInstalled { reply } => {
                for maintainer in self.maintainers() {
                    maintainer.remove_auto_installed_subscriptions();
                }
                let _ = reply.send(());
            }
            Command::RunUpdateCheck { reply } => {
                for maintainer in self.maintainers() {
                    maintainer.run_update_check();
                }
                self.publish_snapshot();
                let _ = reply.send(());
            }
            Command::ConfigurationChanged { name, change } => {
                self.on_configuration_changed(&name, change);
                self.publish_snapshot();
            }
            Command::Maintainer {
                name,
                generation,
                event,
            } => {
                self.on_maintainer_event(&name, generation, event);
                self.publish_snapshot();
            }
        }
    }

    fn install(&mut self, configuration: Arc<dyn FilteringConfiguration>) -> bool {
        let name = configuration.name().to_string();
        if self.registration(&name).is_some() {
            warn!(configuration = %name, "Filtering configuration already installed");
            return false;
        }

        let observer_id = configuration.add_observer(Arc::new(ConfigurationForwarder {
            commands: self.commands.clone(),
        }));
        let mut registration = Registration {
            configuration,
            observer_id,
            maintainer: None,
            generation: 0,
        };
        if registration.configuration.is_enabled() {
            self.create_maintainer(&mut registration);
        }
        info!(
            configuration = %name,
            enabled = registration.maintainer.is_some(),
            "Filtering configuration installed"
        );
        self.registrations.push(registration);
        true
    }

    /// Replies once the cleaner has removed the configuration's data.
    fn uninstall(&mut self, name: &str, reply: oneshot::Sender<bool>) {
        let Some(position) = self
            .registrations
            .iter()
            .position(|r| r.configuration.name() == name)
        else {
            warn!(configuration = %name, "Cannot uninstall unknown filtering configuration");
            let _ = reply.send(false);
            return;
        };

        let registration = self.registrations.remove(position);
        registration
            .configuration
            .remove_observer(registration.observer_id);
        // Dropping the maintainer cancels its in-flight work.
        drop(registration);

        self.cleaning.insert(name.to_string());
        let cleaner = self.cleaner.clone();
        let commands = self.commands.clone();
        let cleaned = name.to_string();
        tokio::spawn(async move {
            cleaner.clean(&cleaned).await;
            if let Some(commands) = commands.upgrade() {
                let _ = commands.send(Command::CleanupFinished {
                    name: cleaned,
                    reply,
                });
            }
        });

        info!(configuration = %name, "Filtering configuration uninstalled");
        self.observers
            .notify(|o| o.on_configuration_uninstalled(name));
    }

    fn on_cleanup_finished(&mut self, name: &str) {
        self.cleaning.remove(name);
        debug!(configuration = %name, "Configuration data cleaned up");

        let (ready, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.deferred_installs)
            .into_iter()
            .partition(|(configuration, _)| configuration.name() == name);
        self.deferred_installs = waiting;
        for (configuration, reply) in ready {
            let installed = self.install(configuration);
            let _ = reply.send(installed);
        }
    }

    fn create_maintainer(&mut self, registration: &mut Registration) {
        self.next_generation += 1;
        registration.generation = self.next_generation;
        let name = registration.configuration.name().to_string();
        let generation = registration.generation;
        let commands = self.commands.clone();
        let events: MaintainerEventSink = Arc::new(move |event: MaintainerEvent| {
            if let Some(commands) = commands.upgrade() {
                let _ = commands.send(Command::Maintainer {
                    name: name.clone(),
                    generation,
                    event,
                });
            }
        });
        registration.maintainer = Some(
            self.factory
                .create_maintainer(registration.configuration.clone(), events),
        );
    }

    fn on_configuration_changed(&mut self, name: &str, change: ConfigurationChange) {
        let Some(index) = self
            .registrations
            .iter()
            .position(|r| r.configuration.name() == name)
        else {
            debug!(configuration = %name, ?change, "Change for uninstalled configuration ignored");
            return;
        };

        match change {
            ConfigurationChange::EnabledState => {
                let enabled = self.registrations[index].configuration.is_enabled();
                let has_maintainer = self.registrations[index].maintainer.is_some();
                if enabled && !has_maintainer {
                    let mut registration = self.registrations.remove(index);
                    self.create_maintainer(&mut registration);
                    self.registrations.insert(index, registration);
                    info!(configuration = %name, "Filtering configuration enabled");
                } else if !enabled && has_maintainer {
                    self.registrations[index].maintainer = None;
                    info!(configuration = %name, "Filtering configuration disabled");
                }
            }
            ConfigurationChange::FilterLists => {
                if let Some(maintainer) = self.registrations[index].maintainer.as_mut() {
                    maintainer.on_filter_lists_changed();
                }
            }
            ConfigurationChange::AllowedDomains | ConfigurationChange::CustomFilters => {
                if let Some(maintainer) = self.registrations[index].maintainer.as_mut() {
                    maintainer.on_custom_filters_changed();
                }
            }
        }
    }

    fn on_maintainer_event(&mut self, name: &str, generation: u64, event: MaintainerEvent) {
        let installed = match self.registration_mut(name) {
            Some(Registration {
                maintainer: Some(maintainer),
                generation: current,
                ..
            }) if *current == generation => maintainer.handle_event(event),
            _ => {
                debug!(configuration = %name, ?event, "Dropping event of a stopped maintainer");
                return;
            }
        };

        if let Some(url) = installed {
            self.observers.notify(|o| o.on_subscription_installed(&url));
        }
    }

    fn current_subscriptions(&self, name: &str) -> Vec<SubscriptionInfo> {
        let Some(registration) = self.registration(name) else {
            warn!(configuration = %name, "Subscriptions requested for unknown configuration");
            return Vec::new();
        };

        let known = registration
            .maintainer
            .as_ref()
            .map(|m| m.current_subscriptions())
            .unwrap_or_default();
        registration
            .configuration
            .filter_lists()
            .into_iter()
            .map(|url| {
                known
                    .iter()
                    .find(|info| info.url == url)
                    .cloned()
                    .unwrap_or_else(|| SubscriptionInfo::placeholder(url, InstallationState::Unknown))
            })
            .collect()
    }

    fn build_snapshot(&self) -> Snapshot {
        self.registrations
            .iter()
            .filter_map(|r| r.maintainer.as_ref())
            .map(|m| m.subscription_collection())
            .collect()
    }

    fn publish_snapshot(&self) {
        self.snapshot.store(Arc::new(self.build_snapshot()));
    }

    fn maintainers(&mut self) -> impl Iterator<Item = &mut Box<dyn FilteringConfigurationMaintainer>> {
        self.registrations
            .iter_mut()
            .filter_map(|r| r.maintainer.as_mut())
    }

    fn registration(&self, name: &str) -> Option<&Registration> {
        self.registrations
            .iter()
            .find(|r| r.configuration.name() == name)
    }

    fn registration_mut(&mut self, name: &str) -> Option<&mut Registration> {
        self.registrations
            .iter_mut()
            .find(|r| r.configuration.name() == name)
    }
}
