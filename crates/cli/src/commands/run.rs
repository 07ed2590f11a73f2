use crate::di::AdblockServices;
use ferrous_adblock_application::services::SubscriptionService;
use ferrous_adblock_jobs::{JobRunner, RecommendedSubscriptionJob, SubscriptionUpdateJob};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Keeps every configuration's subscriptions installed and up to date
/// until Ctrl-C.
pub async fn run(services: &AdblockServices) -> anyhow::Result<()> {
    let service: Arc<dyn SubscriptionService> =
        Arc::new(services.start_with_configurations().await);
    let installer = services.recommended_installer(service.clone())?;
    let shutdown = CancellationToken::new();
    let updates = &services.config.updates;

    JobRunner::new()
        .with_subscription_update(
            SubscriptionUpdateJob::new(service.clone())
                .with_interval(updates.check_interval_secs)
                .with_cancellation(shutdown.clone()),
        )
        .with_recommended_subscriptions(
            RecommendedSubscriptionJob::new(installer)
                .with_interval(updates.recommendation_interval_secs)
                .with_cancellation(shutdown.clone()),
        )
        .start()
        .await;

    info!("Ready, press Ctrl+C to stop");
    tokio::signal::ctrl_c().await?;

    info!("Shutting down");
    shutdown.cancel();
    Ok(())
}
