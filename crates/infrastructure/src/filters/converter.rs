use super::parser::{parse_filter_line, parse_list_metadata};
use super::ruleset::{Ruleset, RULESET_FORMAT_VERSION};
use super::ruleset_subscription::RulesetSubscription;
use async_trait::async_trait;
use ferrous_adblock_application::ports::{
    ConversionExecutors, ConversionResult, InstalledSubscription,
};
use ferrous_adblock_domain::known_subscriptions::{allow_privileged_filters, custom_filters_url};
use ferrous_adblock_domain::{DomainError, InstallationState};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Converts Adblock Plus filter text into serialized [`Ruleset`]s.
///
/// Parsing runs on the blocking thread pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextConversionExecutors;

impl TextConversionExecutors {
    pub fn new() -> Self {
        Self
    }
}

/// Parses a downloaded list for `url` into a ruleset.
///
/// # Returns
/// `Err` with the conversion outcome when the list redirects elsewhere or
/// is not a filter list
pub fn parse_filter_list(url: &Url, content: &[u8]) -> Result<Ruleset, ConversionResult> {
    let text = String::from_utf8_lossy(content);
    let metadata = match parse_list_metadata(&text) {
        Ok(metadata) => metadata,
        Err(e) => return Err(ConversionResult::Error(e)),
    };
    if let Some(redirect) = metadata.redirect {
        return Err(ConversionResult::Redirect(redirect));
    }

    let mut ruleset = Ruleset::new(url.clone());
    ruleset.title = metadata.title;
    ruleset.version = metadata.version;
    ruleset.expiration_interval_secs = metadata.expires.as_secs();

    let allow_privileged = allow_privileged_filters(url);
    let mut rejected = 0usize;
    for line in text.lines().skip(1) {
        if let Err(reason) = parse_filter_line(line, allow_privileged, &mut ruleset) {
            debug!(url = %url, filter = %line.trim(), reason = %reason, "Skipping filter");
            rejected += 1;
        }
    }

    info!(
        url = %url,
        url_filters = ruleset.url_filters.len(),
        content_filters = ruleset.content_filters.len(),
        snippets = ruleset.snippets.len(),
        rejected,
        "Filter list converted"
    );
    Ok(ruleset)
}

/// Converts `content` to the bytes handed to storage.
pub fn convert_filter_text(url: &Url, content: &[u8]) -> ConversionResult {
    let ruleset = match parse_filter_list(url, content) {
        Ok(ruleset) => ruleset,
        Err(result) => return result,
    };
    match serde_json::to_vec(&ruleset) {
        Ok(data) => ConversionResult::Ok(data),
        Err(e) => ConversionResult::Error(e.to_string()),
    }
}

/// Reads bytes produced by [`convert_filter_text`].
pub fn deserialize_ruleset(data: &[u8]) -> Result<Ruleset, DomainError> {
    let ruleset: Ruleset =
        serde_json::from_slice(data).map_err(|e| DomainError::SerializationError(e.to_string()))?;
    if ruleset.format_version != RULESET_FORMAT_VERSION {
        return Err(DomainError::SerializationError(format!(
            "Unsupported ruleset format {}",
            ruleset.format_version
        )));
    }
    Ok(ruleset)
}

#[async_trait]
impl ConversionExecutors for TextConversionExecutors {
    fn convert_custom_filters(&self, filters: &[String]) -> Arc<dyn InstalledSubscription> {
        let mut ruleset = Ruleset::new(custom_filters_url());
        for filter in filters {
            if let Err(reason) = parse_filter_line(filter, true, &mut ruleset) {
                warn!(filter = %filter, reason = %reason, "Ignoring custom filter");
            }
        }
        Arc::new(RulesetSubscription::new(
            ruleset,
            InstallationState::Installed,
            None,
        ))
    }

    #[instrument(skip(self, content), fields(bytes = content.len()))]
    async fn convert_filter_list(&self, url: &Url, content: Vec<u8>) -> ConversionResult {
        let url = url.clone();
        match tokio::task::spawn_blocking(move || convert_filter_text(&url, &content)).await {
            Ok(result) => result,
            Err(e) => ConversionResult::Error(format!("Conversion task failed: {e}")),
        }
    }
}
