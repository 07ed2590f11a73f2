use crate::errors::DomainError;
use url::Url;

pub fn validate_configuration_name(name: &str) -> Result<(), DomainError> {
    let invalid = |reason: &str| Err(DomainError::InvalidConfigurationName(format!("{name:?} {reason}")));
    if name.trim().is_empty() {
        return invalid("cannot be empty");
    }
    if name.len() > 200 {
        return invalid("cannot exceed 200 characters");
    }
    if name.chars().any(|c| c.is_control()) {
        return invalid("cannot contain control characters");
    }
    Ok(())
}

/// Accepts URLs a configuration may declare as a filter list.
pub fn validate_filter_list_url(url: &Url) -> Result<(), DomainError> {
    if url.as_str().len() > 2048 {
        return Err(DomainError::InvalidSubscriptionUrl(
            "URL cannot exceed 2048 characters".to_string(),
        ));
    }
    if is_localhost(url) {
        return Ok(());
    }
    match url.scheme() {
        "http" | "https" | "data" => Ok(()),
        other => Err(DomainError::InvalidSubscriptionUrl(format!(
            "{url}: unsupported scheme {other}"
        ))),
    }
}

/// URLs the downloader is willing to fetch: https, data, or any localhost URL.
pub fn is_download_allowed(url: &Url) -> bool {
    is_localhost(url) || matches!(url.scheme(), "https" | "data")
}

pub fn is_localhost(url: &Url) -> bool {
    match url.host_str() {
        Some(host) => {
            let host = host.trim_start_matches('[').trim_end_matches(']');
            host.eq_ignore_ascii_case("localhost")
                || host.ends_with(".localhost")
                || host == "::1"
                || host.starts_with("127.")
        }
        None => false,
    }
}

pub fn validate_domain(domain: &str) -> Result<(), DomainError> {
    if domain.is_empty() {
        return Err(DomainError::InvalidDomain("domain cannot be empty".to_string()));
    }
    if domain.len() > 253 {
        return Err(DomainError::InvalidDomain(
            "domain cannot exceed 253 characters".to_string(),
        ));
    }
    if domain
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '/' | '^' | '$' | '|' | ','))
    {
        return Err(DomainError::InvalidDomain(domain.to_string()));
    }
    Ok(())
}

pub fn validate_custom_filter(filter: &str) -> Result<(), DomainError> {
    if filter.trim().is_empty() {
        return Err(DomainError::InvalidFilter("filter cannot be empty".to_string()));
    }
    if filter.contains('\n') || filter.contains('\r') {
        return Err(DomainError::InvalidFilter("filter must be a single line".to_string()));
    }
    Ok(())
}
