//! Ferrous Adblock Domain Layer
pub mod classification;
pub mod config;
pub mod content_type;
pub mod errors;
pub mod filter;
pub mod filtering_configuration;
pub mod known_subscriptions;
pub mod subscription;
pub mod validators;

pub use classification::{ClassificationDecision, ClassificationResult, RewriteResult};
pub use config::{CliOverrides, Config, ConfigError};
pub use content_type::ContentType;
pub use errors::DomainError;
pub use filter::{
    ContentFiltersData, FilterCategory, HeaderFilterData, RewriteResource, Snippet,
    SpecialFilterType,
};
pub use filtering_configuration::FilteringConfigurationRecord;
pub use subscription::{InstallationState, RetryPolicy, SiteKey, SubscriptionInfo};
pub use url::Url;
