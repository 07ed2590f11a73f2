use chrono::{DateTime, Utc};
use ferrous_adblock_domain::{
    ContentFiltersData, ContentType, FilterCategory, HeaderFilterData, InstallationState,
    SiteKey, Snippet, SpecialFilterType, SubscriptionInfo,
};
use std::collections::BTreeSet;
use std::time::Duration;
use url::Url;

/// One parsed filter list, queryable from any thread.
///
/// Implementations are immutable after construction and shared through
/// `Arc`, so a snapshot built while a subscription was current keeps
/// answering from it after the live state has moved on.
pub trait InstalledSubscription: Send + Sync {
    fn source_url(&self) -> &Url;

    fn title(&self) -> &str;

    fn current_version(&self) -> &str;

    fn installation_state(&self) -> InstallationState;

    fn installation_time(&self) -> Option<DateTime<Utc>>;

    fn expiration_interval(&self) -> Duration;

    /// Whether a URL filter of `category` matches the request.
    ///
    /// # Arguments
    /// * `url` - The request URL
    /// * `document_domain` - Host of the top-level document
    /// * `content_type` - Resource type of the request
    /// * `sitekey` - Site key presented by the page (may be empty)
    /// * `category` - Filter set to search
    fn has_url_filter(
        &self,
        url: &Url,
        document_domain: &str,
        content_type: ContentType,
        sitekey: &SiteKey,
        category: FilterCategory,
    ) -> bool;

    fn has_popup_filter(
        &self,
        url: &Url,
        document_domain: &str,
        sitekey: &SiteKey,
        category: FilterCategory,
    ) -> bool;

    fn has_special_filter(
        &self,
        filter_type: SpecialFilterType,
        url: &Url,
        document_domain: &str,
        sitekey: &SiteKey,
    ) -> bool;

    /// Adds the payloads of matching `$csp=` filters to `results`.
    fn find_csp_filters(
        &self,
        url: &Url,
        document_domain: &str,
        category: FilterCategory,
        results: &mut BTreeSet<String>,
    );

    /// Replacement URLs of matching `$rewrite=` filters.
    fn find_rewrite_filters(
        &self,
        url: &Url,
        document_domain: &str,
        category: FilterCategory,
    ) -> BTreeSet<String>;

    /// Adds the payloads of matching `$header=` filters to `results`.
    fn find_header_filters(
        &self,
        url: &Url,
        content_type: ContentType,
        document_domain: &str,
        category: FilterCategory,
        results: &mut BTreeSet<HeaderFilterData>,
    );

    /// Element hiding selectors and exceptions for a frame.
    ///
    /// With `domain_specific` set, generic selectors are left out.
    fn elemhide_data(&self, url: &Url, domain_specific: bool) -> ContentFiltersData;

    fn elemhide_emulation_data(&self, url: &Url) -> ContentFiltersData;

    fn match_snippets(&self, document_domain: &str) -> Vec<Snippet>;

    /// Deletes the backing data once the last reference is dropped.
    fn mark_for_permanent_removal(&self);

    fn info(&self) -> SubscriptionInfo {
        SubscriptionInfo {
            url: self.source_url().clone(),
            title: self.title().to_string(),
            current_version: self.current_version().to_string(),
            installation_state: self.installation_state(),
            installation_time: self.installation_time(),
            expiration_interval: self.expiration_interval(),
        }
    }
}

impl std::fmt::Debug for dyn InstalledSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstalledSubscription")
            .field("url", &self.source_url().as_str())
            .field("version", &self.current_version())
            .field("state", &self.installation_state())
            .finish()
    }
}
