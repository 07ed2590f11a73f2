use ferrous_adblock_domain::{ContentType, SpecialFilterType};
use serde::{Deserialize, Serialize};
use url::Url;

/// Current layout of serialized rulesets. Files with another version are
/// discarded at load.
pub const RULESET_FORMAT_VERSION: u32 = 1;

/// Converted filter list, the unit written to disk by storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ruleset {
    pub format_version: u32,
    pub url: Url,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub version: String,
    pub expiration_interval_secs: u64,
    #[serde(default)]
    pub url_filters: Vec<UrlFilter>,
    #[serde(default)]
    pub content_filters: Vec<ContentFilter>,
    #[serde(default)]
    pub snippets: Vec<SnippetFilter>,
}

impl Ruleset {
    pub fn new(url: Url) -> Self {
        Self {
            format_version: RULESET_FORMAT_VERSION,
            url,
            title: String::new(),
            version: String::new(),
            expiration_interval_secs: 0,
            url_filters: Vec::new(),
            content_filters: Vec::new(),
            snippets: Vec::new(),
        }
    }
}

/// Include and exclude domain lists of a filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainRestriction {
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl DomainRestriction {
    pub fn is_generic(&self) -> bool {
        self.include.is_empty()
    }

    /// An excluded domain always wins; otherwise any include (or none at
    /// all) admits the domain. Subdomains inherit their parent's entry.
    pub fn matches(&self, domain: &str) -> bool {
        if self.exclude.iter().any(|d| is_same_or_subdomain(domain, d)) {
            return false;
        }
        self.include.is_empty() || self.include.iter().any(|d| is_same_or_subdomain(domain, d))
    }
}

pub fn is_same_or_subdomain(domain: &str, parent: &str) -> bool {
    let domain = domain.trim_end_matches('.');
    let parent = parent.trim_end_matches('.');
    let Some(split) = domain.len().checked_sub(parent.len()) else {
        return false;
    };
    match domain.get(split..) {
        Some(tail) if tail.eq_ignore_ascii_case(parent) => {
            split == 0 || domain.as_bytes()[split - 1] == b'.'
        }
        _ => false,
    }
}

/// What a URL filter does once its pattern matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UrlFilterAction {
    /// Plain blocking or allowing of a resource.
    Request,
    Popup,
    Special(SpecialFilterType),
    Csp(String),
    Rewrite(String),
    Header(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlFilter {
    /// The filter line as written in the list.
    pub text: String,
    /// Regular expression source the pattern compiles to.
    pub regex: String,
    pub exception: bool,
    pub action: UrlFilterAction,
    pub content_type: ContentType,
    #[serde(default)]
    pub domains: DomainRestriction,
    #[serde(default)]
    pub sitekeys: Vec<String>,
    /// `Some(true)` for `$third-party`, `Some(false)` for `~third-party`.
    #[serde(default)]
    pub third_party: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentFilterKind {
    /// `##`
    ElementHiding,
    /// `#@#`
    ElementHidingException,
    /// `#?#`
    ElementHidingEmulation,
}

/// How a matched element is handled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentFilterStyle {
    Hide,
    Remove,
    InlineCss(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentFilter {
    pub kind: ContentFilterKind,
    pub selector: String,
    pub style: ContentFilterStyle,
    #[serde(default)]
    pub domains: DomainRestriction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnippetFilter {
    pub domains: DomainRestriction,
    pub script: Vec<SnippetCall>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnippetCall {
    pub command: String,
    pub arguments: Vec<String>,
}
