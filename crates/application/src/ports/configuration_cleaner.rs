use async_trait::async_trait;

/// Erases everything persisted for an uninstalled configuration.
#[async_trait]
pub trait FilteringConfigurationCleaner: Send + Sync {
    async fn clean(&self, configuration_name: &str);
}
