use super::InstalledSubscription;
use async_trait::async_trait;
use std::sync::Arc;

/// Disk-backed store of converted subscriptions for one configuration.
#[async_trait]
pub trait SubscriptionPersistentStorage: Send + Sync {
    /// Loads every valid stored subscription. Invalid files are discarded.
    async fn load_subscriptions(&self) -> Vec<Arc<dyn InstalledSubscription>>;

    /// Persists converted data and returns the resulting subscription.
    ///
    /// # Returns
    /// `None` if the data could not be written or read back
    async fn store_subscription(&self, data: Vec<u8>) -> Option<Arc<dyn InstalledSubscription>>;

    /// Forgets `subscription`; its file is deleted once unreferenced.
    async fn remove_subscription(&self, subscription: Arc<dyn InstalledSubscription>);
}
