use super::InstalledSubscription;
use std::sync::Arc;
use url::Url;

/// Serves bundled lists while their downloaded versions are missing.
pub trait PreloadedSubscriptionProvider: Send + Sync {
    /// Informs the provider which URLs are installed and which are pending.
    fn update_subscriptions(&self, installed: &[Url], pending: &[Url]);

    fn current_preloaded_subscriptions(&self) -> Vec<Arc<dyn InstalledSubscription>>;
}
