pub mod maintainer;
pub mod recommended_installer;
pub mod resource_classifier;
pub mod subscription_collection;
pub mod subscription_service;

pub use maintainer::{
    FilteringConfigurationMaintainer, FilteringConfigurationMaintainerImpl, InstallationId,
    InstallationKind, MaintainerDependencies, MaintainerEvent, MaintainerEventSink,
    MaintainerFactory,
};
pub use recommended_installer::{
    parse_recommendations, RecommendationReport, RecommendedSubscriptionInstaller,
    RECOMMENDED_SUBSCRIPTIONS_NEXT_UPDATE_PREF,
};
pub use resource_classifier::{ResourceClassifier, ResourceClassifierImpl};
pub use subscription_collection::{document_domain, Snapshot, SubscriptionCollection};
pub use subscription_service::{
    SubscriptionObserver, SubscriptionService, SubscriptionServiceImpl, AUTO_INSTALL_ENABLED_PREF,
};
