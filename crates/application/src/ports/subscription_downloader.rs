use async_trait::async_trait;
use ferrous_adblock_domain::RetryPolicy;
use url::Url;

/// Fetches filter list content.
#[async_trait]
pub trait SubscriptionDownloader: Send + Sync {
    /// Downloads `url`.
    ///
    /// With [`RetryPolicy::RetryUntilSucceeded`] the future only resolves
    /// to `None` when the download is cancelled or the URL is not allowed.
    async fn download(&self, url: &Url, retry_policy: RetryPolicy) -> Option<Vec<u8>>;

    /// Sends a HEAD request and returns the server version stamp.
    async fn head_request(&self, url: &Url) -> Option<String>;

    /// Aborts any in-flight download of `url`.
    fn cancel_download(&self, url: &Url);
}
