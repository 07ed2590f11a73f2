use super::subscription_collection::SubscriptionCollection;
use fancy_regex::Regex;
use ferrous_adblock_domain::{
    ClassificationResult, ContentType, FilterCategory, HeaderFilterData,
    RewriteResult, SiteKey, SpecialFilterType,
};
use http::HeaderMap;
use std::collections::BTreeSet;
use url::Url;

/// Decides whether requests, popups and responses are blocked.
///
/// Every entry point takes a whole snapshot. Collections are evaluated
/// independently and merged: the first `Blocked` verdict wins outright,
/// otherwise the last `Allowed` one, otherwise `Ignored`.
pub trait ResourceClassifier: Send + Sync {
    fn classify_request(
        &self,
        snapshot: &[SubscriptionCollection],
        request_url: &Url,
        frame_hierarchy: &[Url],
        content_type: ContentType,
        sitekey: &SiteKey,
    ) -> ClassificationResult;

    fn classify_popup(
        &self,
        snapshot: &[SubscriptionCollection],
        popup_url: &Url,
        opener_url: &Url,
        sitekey: &SiteKey,
    ) -> ClassificationResult;

    fn classify_response(
        &self,
        snapshot: &[SubscriptionCollection],
        request_url: &Url,
        frame_hierarchy: &[Url],
        content_type: ContentType,
        response_headers: &HeaderMap,
    ) -> ClassificationResult;

    /// Replacement URL for the request, if a `$rewrite` filter applies.
    fn check_rewrite(
        &self,
        snapshot: &[SubscriptionCollection],
        request_url: &Url,
        frame_hierarchy: &[Url],
    ) -> Option<RewriteResult>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceClassifierImpl;

impl ResourceClassifierImpl {
    pub fn new() -> Self {
        Self
    }

    fn merge(
        snapshot: &[SubscriptionCollection],
        classify: impl Fn(&SubscriptionCollection) -> Verdict,
    ) -> ClassificationResult {
        let mut result = ClassificationResult::ignored();
        for collection in snapshot {
            match classify(collection) {
                Verdict::Blocked(subscription) => {
                    return ClassificationResult::blocked(subscription, collection.configuration_name());
                }
                Verdict::Allowed(subscription) => {
                    result = ClassificationResult::allowed(subscription, collection.configuration_name());
                }
                Verdict::Ignored => {}
            }
        }
        result
    }

    fn classify_request_in(
        collection: &SubscriptionCollection,
        request_url: &Url,
        frame_hierarchy: &[Url],
        content_type: ContentType,
        sitekey: &SiteKey,
    ) -> Verdict {
        let Some(blocking) = collection.find_by_subresource_filter(
            request_url,
            frame_hierarchy,
            content_type,
            sitekey,
            FilterCategory::Blocking,
        ) else {
            return Verdict::Ignored;
        };

        if let Some(allowing) =
            collection.find_by_allow_filter(request_url, frame_hierarchy, content_type, sitekey)
        {
            return Verdict::Allowed(allowing);
        }

        if collection
            .find_by_special_filter(SpecialFilterType::Genericblock, request_url, frame_hierarchy, sitekey)
            .is_some()
        {
            // Only filters restricted to a domain survive $genericblock.
            return match collection.find_by_subresource_filter(
                request_url,
                frame_hierarchy,
                content_type,
                sitekey,
                FilterCategory::DomainSpecificBlocking,
            ) {
                Some(domain_specific) => Verdict::Blocked(domain_specific),
                None => Verdict::Ignored,
            };
        }

        Verdict::Blocked(blocking)
    }

    fn classify_popup_in(
        collection: &SubscriptionCollection,
        popup_url: &Url,
        opener_url: &Url,
        sitekey: &SiteKey,
    ) -> Verdict {
        let opener = std::slice::from_ref(opener_url);
        let Some(blocking) =
            collection.find_by_popup_filter(popup_url, opener, sitekey, FilterCategory::Blocking)
        else {
            return Verdict::Ignored;
        };

        if let Some(allowing) =
            collection.find_by_popup_filter(popup_url, opener, sitekey, FilterCategory::Allowing)
        {
            return Verdict::Allowed(allowing);
        }

        // An allow-listed opener page may open popups freely.
        if let Some(document) = collection.find_by_special_filter(
            SpecialFilterType::Document,
            opener_url,
            opener,
            sitekey,
        ) {
            return Verdict::Allowed(document);
        }

        Verdict::Blocked(blocking)
    }

    fn classify_response_in(
        collection: &SubscriptionCollection,
        request_url: &Url,
        frame_hierarchy: &[Url],
        content_type: ContentType,
        headers: &HeaderMap,
    ) -> Verdict {
        let blocking =
            collection.header_filters(request_url, frame_hierarchy, content_type, FilterCategory::Blocking);
        if blocking.is_empty() {
            return Verdict::Ignored;
        }

        let no_sitekey = SiteKey::default();
        if let Some(document) = collection.find_by_special_filter(
            SpecialFilterType::Document,
            request_url,
            frame_hierarchy,
            &no_sitekey,
        ) {
            return Verdict::Allowed(document);
        }

        if collection
            .find_by_special_filter(SpecialFilterType::Genericblock, request_url, frame_hierarchy, &no_sitekey)
            .is_some()
        {
            let domain_specific = collection.header_filters(
                request_url,
                frame_hierarchy,
                content_type,
                FilterCategory::DomainSpecificBlocking,
            );
            return match_header_filters(headers, &domain_specific, &BTreeSet::new());
        }

        let allowing =
            collection.header_filters(request_url, frame_hierarchy, content_type, FilterCategory::Allowing);
        match_header_filters(headers, &blocking, &allowing)
    }

    fn check_rewrite_in(
        collection: &SubscriptionCollection,
        request_url: &Url,
        frame_hierarchy: &[Url],
    ) -> Option<Url> {
        let mut blocking = collection.rewrite_filters(request_url, frame_hierarchy, FilterCategory::Blocking);
        if blocking.is_empty() {
            return None;
        }

        let no_sitekey = SiteKey::default();
        if collection
            .find_by_special_filter(SpecialFilterType::Document, request_url, frame_hierarchy, &no_sitekey)
            .is_some()
        {
            return None;
        }

        if collection
            .find_by_special_filter(SpecialFilterType::Genericblock, request_url, frame_hierarchy, &no_sitekey)
            .is_some()
        {
            blocking = collection.rewrite_filters(
                request_url,
                frame_hierarchy,
                FilterCategory::DomainSpecificBlocking,
            );
        }

        let allowing = collection.rewrite_filters(request_url, frame_hierarchy, FilterCategory::Allowing);
        blocking
            .iter()
            .filter(|target| !allowing.contains(*target))
            .find_map(|target| Url::parse(target).ok())
    }
}

impl ResourceClassifier for ResourceClassifierImpl {
    fn classify_request(
        &self,
        snapshot: &[SubscriptionCollection],
        request_url: &Url,
        frame_hierarchy: &[Url],
        content_type: ContentType,
        sitekey: &SiteKey,
    ) -> ClassificationResult {
        Self::merge(snapshot, |c| {
            Self::classify_request_in(c, request_url, frame_hierarchy, content_type, sitekey)
        })
    }

    fn classify_popup(
        &self,
        snapshot: &[SubscriptionCollection],
        popup_url: &Url,
        opener_url: &Url,
        sitekey: &SiteKey,
    ) -> ClassificationResult {
        Self::merge(snapshot, |c| Self::classify_popup_in(c, popup_url, opener_url, sitekey))
    }

    fn classify_response(
        &self,
        snapshot: &[SubscriptionCollection],
        request_url: &Url,
        frame_hierarchy: &[Url],
        content_type: ContentType,
        response_headers: &HeaderMap,
    ) -> ClassificationResult {
        Self::merge(snapshot, |c| {
            Self::classify_response_in(c, request_url, frame_hierarchy, content_type, response_headers)
        })
    }

    fn check_rewrite(
        &self,
        snapshot: &[SubscriptionCollection],
        request_url: &Url,
        frame_hierarchy: &[Url],
    ) -> Option<RewriteResult> {
        snapshot.iter().find_map(|collection| {
            Self::check_rewrite_in(collection, request_url, frame_hierarchy).map(|url| RewriteResult {
                url,
                configuration_name: collection.configuration_name().to_string(),
            })
        })
    }
}

/// Per-collection outcome, before the configuration name is attached.
enum Verdict {
    Blocked(Url),
    Allowed(Url),
    Ignored,
}

/// Tests blocking header filters against the response. The first match not
/// overruled by an allowing filter blocks; overruled matches allow.
fn match_header_filters(
    headers: &HeaderMap,
    blocking: &BTreeSet<HeaderFilterData>,
    allowing: &BTreeSet<HeaderFilterData>,
) -> Verdict {
    let mut verdict = Verdict::Ignored;
    for filter in blocking {
        if !header_filter_matches(headers, &filter.header_filter) {
            continue;
        }
        match overruling_filter(&filter.header_filter, allowing) {
            Some(allow) => verdict = Verdict::Allowed(allow.subscription_url.clone()),
            None => return Verdict::Blocked(filter.subscription_url.clone()),
        }
    }
    verdict
}

/// `name` matches header presence; `name=value` matches when the header
/// value contains `value`, ignoring case.
fn header_filter_matches(headers: &HeaderMap, header_filter: &str) -> bool {
    match header_filter.split_once('=') {
        Some((name, value)) if !value.is_empty() => {
            let needle = value.to_ascii_lowercase();
            headers.get_all(name.trim()).iter().any(|v| {
                v.to_str()
                    .map(|s| s.to_ascii_lowercase().contains(&needle))
                    .unwrap_or(false)
            })
        }
        Some((name, _)) => headers.contains_key(name.trim()),
        None => headers.contains_key(header_filter.trim()),
    }
}

fn overruling_filter<'a>(
    blocking_filter: &str,
    allowing: &'a BTreeSet<HeaderFilterData>,
) -> Option<&'a HeaderFilterData> {
    allowing.iter().find(|allow| {
        allow.header_filter.is_empty() || regex_matches(&allow.header_filter, blocking_filter)
    })
}

fn regex_matches(pattern: &str, input: &str) -> bool {
    Regex::new(&format!("(?i){pattern}"))
        .ok()
        .and_then(|re| re.is_match(input).ok())
        .unwrap_or(false)
}
