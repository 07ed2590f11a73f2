use super::InstalledSubscription;
use async_trait::async_trait;
use std::sync::Arc;
use url::Url;

/// Outcome of converting a downloaded filter list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionResult {
    /// Converted data, ready to hand to storage.
    Ok(Vec<u8>),
    /// The list declared a new location (`! Redirect:`).
    Redirect(Url),
    Error(String),
}

/// Turns filter text into installable subscriptions.
#[async_trait]
pub trait ConversionExecutors: Send + Sync {
    /// Builds the in-memory custom filters subscription.
    ///
    /// Runs synchronously on the caller; custom filter sets are small.
    fn convert_custom_filters(&self, filters: &[String]) -> Arc<dyn InstalledSubscription>;

    /// Converts a downloaded list for `url`.
    ///
    /// # Returns
    /// `Ok` with the serialized subscription, `Redirect` or `Error`
    async fn convert_filter_list(&self, url: &Url, content: Vec<u8>) -> ConversionResult;
}
