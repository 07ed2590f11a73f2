use crate::configuration::FilteringConfiguration;
use crate::ports::{
    read_pref, write_pref, PreferenceStore, SubscriptionDownloader, SubscriptionPersistentMetadata,
};
use crate::services::subscription_service::SubscriptionService;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use ferrous_adblock_domain::known_subscriptions::{
    ADBLOCK_CONFIGURATION_NAME, AUTO_INSTALLED_EXPIRATION_INTERVAL,
};
use ferrous_adblock_domain::RetryPolicy;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

/// Preference key holding the time of the next recommendations download.
pub const RECOMMENDED_SUBSCRIPTIONS_NEXT_UPDATE_PREF: &str =
    "adblock.recommended_subscriptions_next_update";

#[derive(Debug, Deserialize)]
struct Recommendation {
    url: String,
}

/// Outcome of one installer run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecommendationReport {
    pub installed: Vec<Url>,
    pub refreshed: Vec<Url>,
    pub removed: Vec<Url>,
}

/// Adds recommended filter lists to the `adblock` configuration and removes
/// them again once they stop being recommended.
pub struct RecommendedSubscriptionInstaller {
    service: Arc<dyn SubscriptionService>,
    downloader: Arc<dyn SubscriptionDownloader>,
    metadata: Arc<dyn SubscriptionPersistentMetadata>,
    prefs: Arc<dyn PreferenceStore>,
    recommendations_url: Url,
    update_interval: ChronoDuration,
}

impl RecommendedSubscriptionInstaller {
    pub fn new(
        service: Arc<dyn SubscriptionService>,
        downloader: Arc<dyn SubscriptionDownloader>,
        metadata: Arc<dyn SubscriptionPersistentMetadata>,
        prefs: Arc<dyn PreferenceStore>,
        recommendations_url: Url,
    ) -> Self {
        Self {
            service,
            downloader,
            metadata,
            prefs,
            recommendations_url,
            update_interval: ChronoDuration::days(1),
        }
    }

    /// Runs one cycle if auto-install is enabled and the next update is due.
    #[instrument(skip(self))]
    pub async fn run_update(&self) -> Option<RecommendationReport> {
        if !self.service.is_auto_install_enabled() {
            debug!("Auto-install disabled, skipping recommendations");
            return None;
        }
        let Some(configuration) = self
            .service
            .filtering_configuration(ADBLOCK_CONFIGURATION_NAME)
            .await
        else {
            debug!("No adblock configuration installed, skipping recommendations");
            return None;
        };

        let now = Utc::now();
        if let Some(next_update) = self.next_update() {
            if next_update > now {
                debug!(next_update = %next_update, "Recommendations not due yet");
                return None;
            }
        }

        let recommendations = match self
            .downloader
            .download(&self.recommendations_url, RetryPolicy::RetryUntilSucceeded)
            .await
        {
            Some(content) => parse_recommendations(&content),
            None => {
                warn!(url = %self.recommendations_url, "Failed to download recommendations");
                Vec::new()
            }
        };

        let report = self.apply(configuration.as_ref(), &recommendations);
        self.schedule_next_update(now + self.update_interval);
        info!(
            installed = report.installed.len(),
            refreshed = report.refreshed.len(),
            removed = report.removed.len(),
            "Recommended subscriptions processed"
        );
        Some(report)
    }

    fn apply(
        &self,
        configuration: &dyn FilteringConfiguration,
        recommendations: &[Url],
    ) -> RecommendationReport {
        let mut report = RecommendationReport::default();
        for url in recommendations {
            if !configuration.is_filter_list_present(url) {
                if !configuration.add_filter_list(url) {
                    warn!(url = %url, "Recommended list rejected by the configuration");
                    continue;
                }
                self.metadata
                    .set_auto_installed_expiration_interval(url, AUTO_INSTALLED_EXPIRATION_INTERVAL);
                report.installed.push(url.clone());
            } else if self.metadata.is_auto_installed(url) {
                self.metadata
                    .set_auto_installed_expiration_interval(url, AUTO_INSTALLED_EXPIRATION_INTERVAL);
                report.refreshed.push(url.clone());
            } else {
                debug!(url = %url, "Recommended list already added by the user");
            }
        }

        for url in configuration.filter_lists() {
            if self.metadata.is_auto_installed(&url) && self.metadata.is_auto_installed_expired(&url) {
                configuration.remove_filter_list(&url);
                report.removed.push(url);
            }
        }
        report
    }

    fn next_update(&self) -> Option<DateTime<Utc>> {
        read_pref(self.prefs.as_ref(), RECOMMENDED_SUBSCRIPTIONS_NEXT_UPDATE_PREF)
    }

    fn schedule_next_update(&self, at: DateTime<Utc>) {
        if let Err(e) = write_pref(
            self.prefs.as_ref(),
            RECOMMENDED_SUBSCRIPTIONS_NEXT_UPDATE_PREF,
            &at,
        ) {
            error!(error = %e, "Failed to persist next recommendations update time");
        }
    }
}

/// Parses `[{"url": "..."}, ...]`. Anything malformed yields no
/// recommendations; entries with unparsable URLs are skipped.
pub fn parse_recommendations(content: &[u8]) -> Vec<Url> {
    let entries: Vec<Recommendation> = match serde_json::from_slice(content) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(error = %e, "Malformed recommendations document");
            return Vec::new();
        }
    };
    entries
        .into_iter()
        .filter_map(|entry| match Url::parse(&entry.url) {
            Ok(url) => Some(url),
            Err(e) => {
                warn!(url = %entry.url, error = %e, "Skipping invalid recommended URL");
                None
            }
        })
        .collect()
}
