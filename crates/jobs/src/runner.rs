use crate::{RecommendedSubscriptionJob, SubscriptionUpdateJob};
use std::sync::Arc;
use tracing::info;

/// Central orchestrator for all background jobs.
///
/// Use the builder pattern to register jobs, then call `.start()` once.
///
/// # Example
///
/// ```rust,ignore
/// JobRunner::new()
///     .with_subscription_update(SubscriptionUpdateJob::new(service.clone()))
///     .with_recommended_subscriptions(RecommendedSubscriptionJob::new(installer))
///     .start()
///     .await;
/// ```
pub struct JobRunner {
    subscription_update: Option<SubscriptionUpdateJob>,
    recommended_subscriptions: Option<RecommendedSubscriptionJob>,
}

impl JobRunner {
    pub fn new() -> Self {
        Self {
            subscription_update: None,
            recommended_subscriptions: None,
        }
    }

    pub fn with_subscription_update(mut self, job: SubscriptionUpdateJob) -> Self {
        self.subscription_update = Some(job);
        self
    }

    pub fn with_recommended_subscriptions(mut self, job: RecommendedSubscriptionJob) -> Self {
        self.recommended_subscriptions = Some(job);
        self
    }

    /// Start all registered background jobs.
    pub async fn start(self) {
        info!("Starting background job runner");

        if let Some(job) = self.subscription_update {
            Arc::new(job).start().await;
        }

        if let Some(job) = self.recommended_subscriptions {
            Arc::new(job).start().await;
        }

        info!("All background jobs started");
    }
}

impl Default for JobRunner {
    fn default() -> Self {
        Self::new()
    }
}
