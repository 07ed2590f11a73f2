use ferrous_adblock_application::services::RecommendedSubscriptionInstaller;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Periodically runs the recommended subscription installer.
///
/// The installer keeps its own next-update schedule, so ticks that come
/// early are cheap no-ops.
pub struct RecommendedSubscriptionJob {
    installer: Arc<RecommendedSubscriptionInstaller>,
    interval_secs: u64,
    shutdown: CancellationToken,
}

impl RecommendedSubscriptionJob {
    pub fn new(installer: Arc<RecommendedSubscriptionInstaller>) -> Self {
        Self {
            installer,
            interval_secs: 3600,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_interval(mut self, interval_secs: u64) -> Self {
        self.interval_secs = interval_secs.max(1);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub async fn start(self: Arc<Self>) {
        info!(
            interval_secs = self.interval_secs,
            "Starting recommended subscriptions job"
        );

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
            loop {
                tokio::select! {
                    _ = self.shutdown.cancelled() => {
                        info!("RecommendedSubscriptionJob: shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        if let Some(report) = self.installer.run_update().await {
                            info!(
                                installed = report.installed.len(),
                                refreshed = report.refreshed.len(),
                                removed = report.removed.len(),
                                "Recommended subscriptions updated"
                            );
                        }
                    }
                }
            }
        });
    }
}
