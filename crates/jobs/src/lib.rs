pub mod recommended_subscriptions;
pub mod runner;
pub mod subscription_update;

pub use recommended_subscriptions::RecommendedSubscriptionJob;
pub use runner::JobRunner;
pub use subscription_update::SubscriptionUpdateJob;
