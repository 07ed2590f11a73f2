//! Configuration module for Ferrous Adblock
//!
//! - `root`: Main configuration and CLI overrides
//! - `storage`: Data directory layout
//! - `logging`: Logging settings
//! - `updates`: Update check and recommendation schedule
//! - `downloader`: Client metadata and retry tuning
//! - `preloaded`: Bundled fallback lists
//! - `configurations`: First-run filtering configurations
//! - `errors`: Configuration errors

pub mod configurations;
pub mod downloader;
pub mod errors;
pub mod logging;
pub mod preloaded;
pub mod root;
pub mod storage;
pub mod updates;

pub use configurations::DefaultConfiguration;
pub use downloader::DownloaderConfig;
pub use errors::ConfigError;
pub use logging::LoggingConfig;
pub use preloaded::PreloadedSubscription;
pub use root::{CliOverrides, Config};
pub use storage::StorageConfig;
pub use updates::UpdatesConfig;
