#![allow(dead_code)]

use chrono::{DateTime, Utc};
use ferrous_adblock_application::ports::InstalledSubscription;
use ferrous_adblock_domain::{
    ContentFiltersData, ContentType, FilterCategory, HeaderFilterData, InstallationState,
    SiteKey, Snippet, SpecialFilterType,
};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use url::Url;

// ============================================================================
// FakeSubscription
// ============================================================================

/// Subscription whose filters are plain substrings of the request URL.
pub struct FakeSubscription {
    url: Url,
    version: String,
    state: InstallationState,
    url_filters: Vec<(FilterCategory, String)>,
    popup_filters: Vec<(FilterCategory, String)>,
    special_filters: Vec<(SpecialFilterType, String)>,
    header_filters: Vec<(FilterCategory, String, String)>,
    rewrite_filters: Vec<(FilterCategory, String, String)>,
    csp_filters: Vec<(FilterCategory, String, String)>,
    selectors: Vec<String>,
    removed: AtomicBool,
}

impl FakeSubscription {
    pub fn new(url: &str) -> Self {
        Self {
            url: Url::parse(url).unwrap(),
            version: "1".to_string(),
            state: InstallationState::Installed,
            url_filters: Vec::new(),
            popup_filters: Vec::new(),
            special_filters: Vec::new(),
            header_filters: Vec::new(),
            rewrite_filters: Vec::new(),
            csp_filters: Vec::new(),
            selectors: Vec::new(),
            removed: AtomicBool::new(false),
        }
    }

    /// Reads `url` from the first line, `version` from the second and
    /// `<category> <substring>` filter lines from the rest.
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        let text = std::str::from_utf8(data).ok()?;
        let mut lines = text.lines();
        let url = Url::parse(lines.next()?).ok()?;
        let version = lines.next().unwrap_or("1").to_string();
        let mut subscription = Self::new(url.as_str()).with_version(&version);
        for line in lines {
            subscription = match line.split_once(' ') {
                Some(("block", p)) => subscription.blocking(p),
                Some(("allow", p)) => subscription.allowing(p),
                Some(("document", p)) => subscription.special(SpecialFilterType::Document, p),
                _ => subscription,
            };
        }
        Some(subscription)
    }

    /// Custom filter syntax subset: `@@||d^$document,...`, `@@pattern` and
    /// blocking `pattern` with `|` and `*` stripped.
    pub fn from_custom_filters(url: &str, filters: &[String]) -> Self {
        let mut subscription = Self::new(url);
        for filter in filters {
            if let Some(rest) = filter.strip_prefix("@@||") {
                if let Some((domain, _)) = rest.split_once("^$document") {
                    subscription = subscription.special(SpecialFilterType::Document, domain);
                    continue;
                }
            }
            match filter.strip_prefix("@@") {
                Some(pattern) => subscription = subscription.allowing(&clean(pattern)),
                None => subscription = subscription.blocking(&clean(filter)),
            }
        }
        subscription
    }

    pub fn with_version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    pub fn with_state(mut self, state: InstallationState) -> Self {
        self.state = state;
        self
    }

    pub fn blocking(mut self, pattern: &str) -> Self {
        self.url_filters.push((FilterCategory::Blocking, pattern.to_string()));
        self
    }

    /// Blocking filter restricted to a domain; also matched as plain blocking.
    pub fn domain_specific_blocking(mut self, pattern: &str) -> Self {
        self.url_filters.push((FilterCategory::Blocking, pattern.to_string()));
        self.url_filters
            .push((FilterCategory::DomainSpecificBlocking, pattern.to_string()));
        self
    }

    pub fn allowing(mut self, pattern: &str) -> Self {
        self.url_filters.push((FilterCategory::Allowing, pattern.to_string()));
        self
    }

    pub fn popup(mut self, category: FilterCategory, pattern: &str) -> Self {
        self.popup_filters.push((category, pattern.to_string()));
        self
    }

    pub fn special(mut self, filter_type: SpecialFilterType, pattern: &str) -> Self {
        self.special_filters.push((filter_type, pattern.to_string()));
        self
    }

    pub fn header(mut self, category: FilterCategory, pattern: &str, header_filter: &str) -> Self {
        self.header_filters
            .push((category, pattern.to_string(), header_filter.to_string()));
        self
    }

    pub fn rewrite(mut self, category: FilterCategory, pattern: &str, target: &str) -> Self {
        self.rewrite_filters
            .push((category, pattern.to_string(), target.to_string()));
        self
    }

    pub fn csp(mut self, category: FilterCategory, pattern: &str, directive: &str) -> Self {
        self.csp_filters
            .push((category, pattern.to_string(), directive.to_string()));
        self
    }

    pub fn selector(mut self, selector: &str) -> Self {
        self.selectors.push(selector.to_string());
        self
    }

    pub fn is_marked_for_removal(&self) -> bool {
        self.removed.load(Ordering::SeqCst)
    }
}

fn clean(pattern: &str) -> String {
    pattern.trim_start_matches('|').replace('*', "")
}

fn matches(url: &Url, pattern: &str) -> bool {
    url.as_str().contains(pattern)
}

impl InstalledSubscription for FakeSubscription {
    fn source_url(&self) -> &Url {
        &self.url
    }

    fn title(&self) -> &str {
        "Fake"
    }

    fn current_version(&self) -> &str {
        &self.version
    }

    fn installation_state(&self) -> InstallationState {
        self.state
    }

    fn installation_time(&self) -> Option<DateTime<Utc>> {
        None
    }

    fn expiration_interval(&self) -> Duration {
        Duration::from_secs(86_400)
    }

    fn has_url_filter(
        &self,
        url: &Url,
        _document_domain: &str,
        _content_type: ContentType,
        _sitekey: &SiteKey,
        category: FilterCategory,
    ) -> bool {
        self.url_filters
            .iter()
            .any(|(c, p)| *c == category && matches(url, p))
    }

    fn has_popup_filter(
        &self,
        url: &Url,
        _document_domain: &str,
        _sitekey: &SiteKey,
        category: FilterCategory,
    ) -> bool {
        self.popup_filters
            .iter()
            .any(|(c, p)| *c == category && matches(url, p))
    }

    fn has_special_filter(
        &self,
        filter_type: SpecialFilterType,
        url: &Url,
        _document_domain: &str,
        _sitekey: &SiteKey,
    ) -> bool {
        self.special_filters
            .iter()
            .any(|(t, p)| *t == filter_type && matches(url, p))
    }

    fn find_csp_filters(
        &self,
        url: &Url,
        _document_domain: &str,
        category: FilterCategory,
        results: &mut BTreeSet<String>,
    ) {
        for (c, p, directive) in &self.csp_filters {
            if *c == category && matches(url, p) {
                results.insert(directive.clone());
            }
        }
    }

    fn find_rewrite_filters(
        &self,
        url: &Url,
        _document_domain: &str,
        category: FilterCategory,
    ) -> BTreeSet<String> {
        self.rewrite_filters
            .iter()
            .filter(|(c, p, _)| *c == category && matches(url, p))
            .map(|(_, _, target)| target.clone())
            .collect()
    }

    fn find_header_filters(
        &self,
        url: &Url,
        _content_type: ContentType,
        _document_domain: &str,
        category: FilterCategory,
        results: &mut BTreeSet<HeaderFilterData>,
    ) {
        for (c, p, header_filter) in &self.header_filters {
            if *c == category && matches(url, p) {
                results.insert(HeaderFilterData::new(header_filter.clone(), self.url.clone()));
            }
        }
    }

    fn elemhide_data(&self, _url: &Url, _domain_specific: bool) -> ContentFiltersData {
        ContentFiltersData {
            selectors: self.selectors.clone(),
            ..Default::default()
        }
    }

    fn elemhide_emulation_data(&self, _url: &Url) -> ContentFiltersData {
        ContentFiltersData::default()
    }

    fn match_snippets(&self, _document_domain: &str) -> Vec<Snippet> {
        Vec::new()
    }

    fn mark_for_permanent_removal(&self) {
        self.removed.store(true, Ordering::SeqCst);
    }
}
