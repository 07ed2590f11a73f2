use super::ruleset::{
    is_same_or_subdomain, ContentFilter, ContentFilterKind, ContentFilterStyle, Ruleset,
    SnippetFilter, UrlFilter, UrlFilterAction,
};
use chrono::{DateTime, Utc};
use fancy_regex::Regex;
use ferrous_adblock_application::ports::InstalledSubscription;
use ferrous_adblock_domain::{
    ContentFiltersData, ContentType, FilterCategory, HeaderFilterData, InstallationState,
    RewriteResource, SiteKey, Snippet, SpecialFilterType,
};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

struct CompiledUrlFilter {
    filter: UrlFilter,
    regex: Regex,
}

/// Where a URL filter query is looking from.
struct RequestContext<'a> {
    url: &'a Url,
    document_domain: &'a str,
    sitekey: &'a SiteKey,
}

/// [`InstalledSubscription`] answering queries from a parsed [`Ruleset`].
///
/// Patterns are compiled once at construction. When the subscription was
/// read from disk and later marked for permanent removal, the backing file
/// is deleted on drop.
pub struct RulesetSubscription {
    url: Url,
    title: String,
    version: String,
    state: InstallationState,
    installation_time: Option<DateTime<Utc>>,
    expiration_interval: Duration,
    url_filters: Vec<CompiledUrlFilter>,
    content_filters: Vec<ContentFilter>,
    snippets: Vec<SnippetFilter>,
    backing_file: Option<PathBuf>,
    marked_for_removal: AtomicBool,
}

impl RulesetSubscription {
    pub fn new(
        ruleset: Ruleset,
        state: InstallationState,
        installation_time: Option<DateTime<Utc>>,
    ) -> Self {
        let url_filters = ruleset
            .url_filters
            .into_iter()
            .filter_map(|filter| match Regex::new(&filter.regex) {
                Ok(regex) => Some(CompiledUrlFilter { filter, regex }),
                Err(e) => {
                    warn!(filter = %filter.text, error = %e, "Dropping filter with invalid pattern");
                    None
                }
            })
            .collect();

        Self {
            url: ruleset.url,
            title: ruleset.title,
            version: ruleset.version,
            state,
            installation_time,
            expiration_interval: Duration::from_secs(ruleset.expiration_interval_secs),
            url_filters,
            content_filters: ruleset.content_filters,
            snippets: ruleset.snippets,
            backing_file: None,
            marked_for_removal: AtomicBool::new(false),
        }
    }

    pub fn with_backing_file(mut self, path: PathBuf) -> Self {
        self.backing_file = Some(path);
        self
    }

    pub fn backing_file(&self) -> Option<&Path> {
        self.backing_file.as_deref()
    }

    pub fn is_marked_for_removal(&self) -> bool {
        self.marked_for_removal.load(Ordering::Acquire)
    }

    pub fn url_filter_count(&self) -> usize {
        self.url_filters.len()
    }

    fn url_filters_in(&self, category: FilterCategory) -> impl Iterator<Item = &CompiledUrlFilter> {
        self.url_filters.iter().filter(move |f| match category {
            FilterCategory::Allowing => f.filter.exception,
            FilterCategory::Blocking => !f.filter.exception,
            FilterCategory::DomainSpecificBlocking => {
                !f.filter.exception && !f.filter.domains.is_generic()
            }
        })
    }

    fn content_filters_for<'a>(
        &'a self,
        host: &'a str,
        kinds: &'a [ContentFilterKind],
    ) -> impl Iterator<Item = &'a ContentFilter> {
        self.content_filters
            .iter()
            .filter(move |f| kinds.contains(&f.kind) && f.domains.matches(host))
    }
}

fn is_third_party(request_host: &str, document_domain: &str) -> bool {
    if document_domain.is_empty() {
        return false;
    }
    !(is_same_or_subdomain(request_host, document_domain)
        || is_same_or_subdomain(document_domain, request_host))
}

fn matches_context(compiled: &CompiledUrlFilter, ctx: &RequestContext<'_>) -> bool {
    let filter = &compiled.filter;
    if !filter.domains.matches(ctx.document_domain) {
        return false;
    }
    if !filter.sitekeys.is_empty()
        && (ctx.sitekey.is_empty() || !filter.sitekeys.iter().any(|k| k == ctx.sitekey.as_str()))
    {
        return false;
    }
    if let Some(third_party) = filter.third_party {
        let host = ctx.url.host_str().unwrap_or_default();
        if is_third_party(host, ctx.document_domain) != third_party {
            return false;
        }
    }
    compiled.regex.is_match(ctx.url.as_str()).unwrap_or(false)
}

fn push_styled(data: &mut ContentFiltersData, filter: &ContentFilter) {
    match &filter.style {
        ContentFilterStyle::Hide => data.selectors.push(filter.selector.clone()),
        ContentFilterStyle::Remove => data.remove_selectors.push(filter.selector.clone()),
        ContentFilterStyle::InlineCss(css) => {
            data.selectors_to_inline_css
                .insert(filter.selector.clone(), css.clone());
        }
    }
}

impl InstalledSubscription for RulesetSubscription {
    fn source_url(&self) -> &Url {
        &self.url
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn current_version(&self) -> &str {
        &self.version
    }

    fn installation_state(&self) -> InstallationState {
        self.state
    }

    fn installation_time(&self) -> Option<DateTime<Utc>> {
        self.installation_time
    }

    fn expiration_interval(&self) -> Duration {
        self.expiration_interval
    }

    fn has_url_filter(
        &self,
        url: &Url,
        document_domain: &str,
        content_type: ContentType,
        sitekey: &SiteKey,
        category: FilterCategory,
    ) -> bool {
        let ctx = RequestContext {
            url,
            document_domain,
            sitekey,
        };
        self.url_filters_in(category).any(|f| {
            f.filter.action == UrlFilterAction::Request
                && f.filter.content_type.intersects(content_type)
                && matches_context(f, &ctx)
        })
    }

    fn has_popup_filter(
        &self,
        url: &Url,
        document_domain: &str,
        sitekey: &SiteKey,
        category: FilterCategory,
    ) -> bool {
        let ctx = RequestContext {
            url,
            document_domain,
            sitekey,
        };
        self.url_filters_in(category)
            .any(|f| f.filter.action == UrlFilterAction::Popup && matches_context(f, &ctx))
    }

    fn has_special_filter(
        &self,
        filter_type: SpecialFilterType,
        url: &Url,
        document_domain: &str,
        sitekey: &SiteKey,
    ) -> bool {
        let ctx = RequestContext {
            url,
            document_domain,
            sitekey,
        };
        self.url_filters_in(FilterCategory::Allowing).any(|f| {
            f.filter.action == UrlFilterAction::Special(filter_type) && matches_context(f, &ctx)
        })
    }

    fn find_csp_filters(
        &self,
        url: &Url,
        document_domain: &str,
        category: FilterCategory,
        results: &mut BTreeSet<String>,
    ) {
        let sitekey = SiteKey::default();
        let ctx = RequestContext {
            url,
            document_domain,
            sitekey: &sitekey,
        };
        for f in self.url_filters_in(category) {
            if let UrlFilterAction::Csp(payload) = &f.filter.action {
                if matches_context(f, &ctx) {
                    results.insert(payload.clone());
                }
            }
        }
    }

    fn find_rewrite_filters(
        &self,
        url: &Url,
        document_domain: &str,
        category: FilterCategory,
    ) -> BTreeSet<String> {
        let sitekey = SiteKey::default();
        let ctx = RequestContext {
            url,
            document_domain,
            sitekey: &sitekey,
        };
        self.url_filters_in(category)
            .filter_map(|f| match &f.filter.action {
                UrlFilterAction::Rewrite(value) if matches_context(f, &ctx) => {
                    RewriteResource::from_option_value(value).map(|r| r.data_url().to_string())
                }
                _ => None,
            })
            .collect()
    }

    fn find_header_filters(
        &self,
        url: &Url,
        content_type: ContentType,
        document_domain: &str,
        category: FilterCategory,
        results: &mut BTreeSet<HeaderFilterData>,
    ) {
        let sitekey = SiteKey::default();
        let ctx = RequestContext {
            url,
            document_domain,
            sitekey: &sitekey,
        };
        for f in self.url_filters_in(category) {
            if let UrlFilterAction::Header(payload) = &f.filter.action {
                if f.filter.content_type.intersects(content_type) && matches_context(f, &ctx) {
                    results.insert(HeaderFilterData::new(payload.clone(), self.url.clone()));
                }
            }
        }
    }

    fn elemhide_data(&self, url: &Url, domain_specific: bool) -> ContentFiltersData {
        let host = url.host_str().unwrap_or_default();
        let mut data = ContentFiltersData::default();
        let kinds = [
            ContentFilterKind::ElementHiding,
            ContentFilterKind::ElementHidingException,
        ];
        for filter in self.content_filters_for(host, &kinds) {
            match filter.kind {
                ContentFilterKind::ElementHidingException => {
                    data.exceptions.push(filter.selector.clone());
                }
                _ if domain_specific && filter.domains.is_generic() => {}
                _ => push_styled(&mut data, filter),
            }
        }
        data
    }

    fn elemhide_emulation_data(&self, url: &Url) -> ContentFiltersData {
        let host = url.host_str().unwrap_or_default();
        let mut data = ContentFiltersData::default();
        let kinds = [
            ContentFilterKind::ElementHidingEmulation,
            ContentFilterKind::ElementHidingException,
        ];
        for filter in self.content_filters_for(host, &kinds) {
            match filter.kind {
                ContentFilterKind::ElementHidingException => {
                    data.exceptions.push(filter.selector.clone());
                }
                _ => push_styled(&mut data, filter),
            }
        }
        data
    }

    fn match_snippets(&self, document_domain: &str) -> Vec<Snippet> {
        self.snippets
            .iter()
            .filter(|s| !s.domains.is_generic() && s.domains.matches(document_domain))
            .flat_map(|s| s.script.iter())
            .map(|call| Snippet {
                command: call.command.clone(),
                arguments: call.arguments.clone(),
            })
            .collect()
    }

    fn mark_for_permanent_removal(&self) {
        self.marked_for_removal.store(true, Ordering::Release);
    }
}

impl Drop for RulesetSubscription {
    fn drop(&mut self) {
        if !self.is_marked_for_removal() {
            return;
        }
        if let Some(path) = &self.backing_file {
            match std::fs::remove_file(path) {
                Ok(()) => debug!(url = %self.url, path = %path.display(), "Removed subscription file"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(url = %self.url, path = %path.display(), error = %e, "Failed to remove subscription file")
                }
            }
        }
    }
}
