use async_trait::async_trait;
use chrono::DateTime;
use dashmap::DashMap;
use data_url::DataUrl;
use ferrous_adblock_application::ports::{SubscriptionDownloader, SubscriptionPersistentMetadata};
use ferrous_adblock_domain::config::DownloaderConfig;
use ferrous_adblock_domain::validators::is_download_allowed;
use ferrous_adblock_domain::{DomainError, RetryPolicy};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use url::Url;

const ADDON_NAME: &str = "ferrous-adblock";
const ADDON_VERSION: &str = "1.0";
const PLATFORM_VERSION: &str = "1.0";

/// Download counts above this are reported as `"4+"`.
const MAX_REPORTED_DOWNLOAD_COUNT: u32 = 4;

fn clamped_download_count(count: u32) -> String {
    if count > MAX_REPORTED_DOWNLOAD_COUNT {
        format!("{MAX_REPORTED_DOWNLOAD_COUNT}+")
    } else {
        count.to_string()
    }
}

/// Filter list version stamp: `YYYYMMDDHHMM`.
pub fn version_from_date_header(value: &str) -> Option<String> {
    DateTime::parse_from_rfc2822(value)
        .ok()
        .map(|date| date.naive_utc().format("%Y%m%d%H%M").to_string())
}

struct OngoingDownload {
    id: u64,
    token: CancellationToken,
}

/// Fetches filter lists over HTTPS (or from `data:` URLs), tagging every
/// request with client metadata.
///
/// Ongoing downloads are tracked per instance and keyed by URL, so every
/// maintainer works with its own instance (see [`Self::for_maintainer`]).
pub struct HttpSubscriptionDownloader {
    client: reqwest::Client,
    config: DownloaderConfig,
    metadata: Arc<dyn SubscriptionPersistentMetadata>,
    ongoing: DashMap<Url, OngoingDownload>,
    next_id: AtomicU64,
}

impl HttpSubscriptionDownloader {
    pub fn new(
        config: DownloaderConfig,
        metadata: Arc<dyn SubscriptionPersistentMetadata>,
    ) -> Result<Self, DomainError> {
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(format!("{}/{}", config.application, config.application_version))
            .build()
            .map_err(|e| DomainError::DownloadFailed(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            config,
            metadata,
            ongoing: DashMap::new(),
            next_id: AtomicU64::new(0),
        })
    }

    /// A downloader sharing this one's HTTP client, settings and metadata but
    /// with its own set of ongoing downloads.
    pub fn for_maintainer(&self) -> Self {
        Self {
            client: self.client.clone(),
            config: self.config.clone(),
            metadata: self.metadata.clone(),
            ongoing: DashMap::new(),
            next_id: AtomicU64::new(0),
        }
    }

    /// `url` with its query replaced by the client metadata parameters.
    pub fn with_request_parameters(&self, url: &Url, disabled: bool) -> Url {
        let mut tagged = url.clone();
        tagged
            .query_pairs_mut()
            .clear()
            .append_pair("addonName", ADDON_NAME)
            .append_pair("addonVersion", ADDON_VERSION)
            .append_pair("application", &self.config.application)
            .append_pair("applicationVersion", &self.config.application_version)
            .append_pair("platform", &self.config.platform)
            .append_pair("platformVersion", PLATFORM_VERSION)
            .append_pair("lastVersion", &self.metadata.version(url))
            .append_pair("disabled", if disabled { "true" } else { "false" })
            .append_pair(
                "downloadCount",
                &clamped_download_count(self.metadata.download_success_count(url)),
            );
        tagged
    }

    /// Exponential delay with up to 25% jitter, capped at the configured maximum.
    fn backoff(&self, attempt: u32) -> Duration {
        let base = self
            .config
            .initial_backoff_ms
            .saturating_mul(1u64 << attempt.min(20))
            .min(self.config.max_backoff_ms);
        let jitter = fastrand::u64(0..=base / 4);
        Duration::from_millis(base.saturating_add(jitter).min(self.config.max_backoff_ms))
    }

    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, DomainError> {
        if url.scheme() == "data" {
            let data_url = DataUrl::process(url.as_str())
                .map_err(|e| DomainError::DownloadFailed(format!("Invalid data URL: {e:?}")))?;
            let (body, _) = data_url
                .decode_to_vec()
                .map_err(|e| DomainError::DownloadFailed(format!("Invalid data URL body: {e:?}")))?;
            return Ok(body);
        }

        let request_url = self.with_request_parameters(url, false);
        let response = self
            .client
            .get(request_url)
            .send()
            .await
            .map_err(|e| DomainError::DownloadFailed(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DomainError::DownloadFailed(format!(
                "{url} returned HTTP {}",
                status.as_u16()
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| DomainError::DownloadFailed(format!("{url}: {e}")))?;
        Ok(body.to_vec())
    }

    fn register(&self, url: &Url) -> (u64, CancellationToken) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        if let Some(previous) = self.ongoing.insert(
            url.clone(),
            OngoingDownload {
                id,
                token: token.clone(),
            },
        ) {
            debug!(url = %url, "Superseding ongoing download");
            previous.token.cancel();
        }
        (id, token)
    }

    fn unregister(&self, url: &Url, id: u64) {
        self.ongoing.remove_if(url, |_, ongoing| ongoing.id == id);
    }

    async fn download_with_retries(
        &self,
        url: &Url,
        retry_policy: RetryPolicy,
        token: &CancellationToken,
    ) -> Option<Vec<u8>> {
        let mut attempt = 0u32;
        loop {
            let result = tokio::select! {
                _ = token.cancelled() => {
                    debug!(url = %url, "Download cancelled");
                    return None;
                }
                result = self.fetch(url) => result,
            };

            match result {
                Ok(body) => {
                    info!(url = %url, bytes = body.len(), "Subscription downloaded");
                    return Some(body);
                }
                Err(e) => {
                    self.metadata.increment_download_error_count(url);
                    if retry_policy == RetryPolicy::DoNotRetry {
                        warn!(url = %url, error = %e, "Download failed, giving up");
                        return None;
                    }
                    let delay = self.backoff(attempt);
                    warn!(url = %url, error = %e, attempt, retry_in_ms = delay.as_millis() as u64, "Download failed, will retry");
                    attempt = attempt.saturating_add(1);
                    tokio::select! {
                        _ = token.cancelled() => {
                            debug!(url = %url, "Download cancelled while waiting to retry");
                            return None;
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }
}

#[async_trait]
impl SubscriptionDownloader for HttpSubscriptionDownloader {
    #[instrument(skip_all, fields(url = %url))]
    async fn download(&self, url: &Url, retry_policy: RetryPolicy) -> Option<Vec<u8>> {
        if !is_download_allowed(url) {
            warn!("Download from URL not allowed");
            return None;
        }

        let (id, token) = self.register(url);
        let result = self.download_with_retries(url, retry_policy, &token).await;
        self.unregister(url, id);
        result
    }

    #[instrument(skip_all, fields(url = %url))]
    async fn head_request(&self, url: &Url) -> Option<String> {
        if !is_download_allowed(url) || url.scheme() == "data" {
            return None;
        }

        let response = match self
            .client
            .head(self.with_request_parameters(url, true))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                debug!(error = %e, "HEAD request failed");
                return None;
            }
        };

        let version = response
            .headers()
            .get(reqwest::header::DATE)
            .and_then(|value| value.to_str().ok())
            .and_then(version_from_date_header);
        debug!(version = ?version, "HEAD request finished");
        version
    }

    fn cancel_download(&self, url: &Url) {
        if let Some((_, ongoing)) = self.ongoing.remove(url) {
            debug!(url = %url, "Cancelling download");
            ongoing.token.cancel();
        }
    }
}
