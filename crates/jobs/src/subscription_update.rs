use ferrous_adblock_application::services::SubscriptionService;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Periodically asks every maintainer to re-download expired filter lists.
pub struct SubscriptionUpdateJob {
    service: Arc<dyn SubscriptionService>,
    interval_secs: u64,
    shutdown: CancellationToken,
}

impl SubscriptionUpdateJob {
    pub fn new(service: Arc<dyn SubscriptionService>) -> Self {
        Self {
            service,
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
            "Starting subscription update job"
        );

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
            loop {
                tokio::select! {
                    _ = self.shutdown.cancelled() => {
                        info!("SubscriptionUpdateJob: shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        debug!("Running subscription update check");
                        self.service.run_update_check().await;
                    }
                }
            }
        });
    }
}
