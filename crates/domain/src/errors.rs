use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Invalid configuration name: {0}")]
    InvalidConfigurationName(String),

    #[error("Invalid subscription URL: {0}")]
    InvalidSubscriptionUrl(String),

    #[error("Invalid domain: {0}")]
    InvalidDomain(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Preference store error: {0}")]
    PreferenceError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("I/O error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for DomainError {
    fn from(e: std::io::Error) -> Self {
        DomainError::IoError(e.to_string())
    }
}
