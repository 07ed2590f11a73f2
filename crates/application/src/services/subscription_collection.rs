use crate::ports::InstalledSubscription;
use ferrous_adblock_domain::{
    ContentFiltersData, ContentType, FilterCategory, HeaderFilterData, SiteKey, Snippet,
    SpecialFilterType,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use url::Url;

/// Immutable view over the subscriptions of one configuration.
///
/// Cloning is cheap. Query results only depend on the subscriptions
/// captured at construction.
#[derive(Clone)]
pub struct SubscriptionCollection {
    configuration_name: Arc<str>,
    subscriptions: Arc<[Arc<dyn InstalledSubscription>]>,
}

/// One collection per enabled configuration, in registration order.
pub type Snapshot = Vec<SubscriptionCollection>;

/// Host of the document issuing the request. Hierarchies are ordered from
/// the innermost frame outwards, so this is the first frame, or the request
/// itself when there is no hierarchy.
pub fn document_domain<'a>(request_url: &'a Url, frame_hierarchy: &'a [Url]) -> &'a str {
    frame_hierarchy
        .first()
        .unwrap_or(request_url)
        .host_str()
        .unwrap_or_default()
}

impl SubscriptionCollection {
    pub fn new(
        configuration_name: impl Into<Arc<str>>,
        subscriptions: Vec<Arc<dyn InstalledSubscription>>,
    ) -> Self {
        Self {
            configuration_name: configuration_name.into(),
            subscriptions: subscriptions.into(),
        }
    }

    pub fn configuration_name(&self) -> &str {
        &self.configuration_name
    }

    pub fn subscriptions(&self) -> &[Arc<dyn InstalledSubscription>] {
        &self.subscriptions
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// First subscription with a URL filter of `category` for the request.
    pub fn find_by_subresource_filter(
        &self,
        request_url: &Url,
        frame_hierarchy: &[Url],
        content_type: ContentType,
        sitekey: &SiteKey,
        category: FilterCategory,
    ) -> Option<Url> {
        let domain = document_domain(request_url, frame_hierarchy);
        self.subscriptions
            .iter()
            .find(|s| s.has_url_filter(request_url, domain, content_type, sitekey, category))
            .map(|s| s.source_url().clone())
    }

    pub fn find_by_popup_filter(
        &self,
        popup_url: &Url,
        frame_hierarchy: &[Url],
        sitekey: &SiteKey,
        category: FilterCategory,
    ) -> Option<Url> {
        let domain = document_domain(popup_url, frame_hierarchy);
        self.subscriptions
            .iter()
            .find(|s| s.has_popup_filter(popup_url, domain, sitekey, category))
            .map(|s| s.source_url().clone())
    }

    /// First subscription that allows the request, either through an
    /// allowing URL filter or a `$document` exception on any ancestor frame.
    pub fn find_by_allow_filter(
        &self,
        request_url: &Url,
        frame_hierarchy: &[Url],
        content_type: ContentType,
        sitekey: &SiteKey,
    ) -> Option<Url> {
        let domain = document_domain(request_url, frame_hierarchy);
        self.subscriptions
            .iter()
            .find(|s| {
                s.has_url_filter(request_url, domain, content_type, sitekey, FilterCategory::Allowing)
                    || hierarchy_has_special_filter(
                        s.as_ref(),
                        SpecialFilterType::Document,
                        frame_hierarchy,
                        sitekey,
                    )
            })
            .map(|s| s.source_url().clone())
    }

    /// First subscription with a special filter matching the request or any
    /// frame of its hierarchy.
    pub fn find_by_special_filter(
        &self,
        filter_type: SpecialFilterType,
        request_url: &Url,
        frame_hierarchy: &[Url],
        sitekey: &SiteKey,
    ) -> Option<Url> {
        self.subscriptions
            .iter()
            .find(|s| has_special_filter(s.as_ref(), filter_type, request_url, frame_hierarchy, sitekey))
            .map(|s| s.source_url().clone())
    }

    /// Element hiding selectors for a frame, minus `#@#` exceptions.
    /// `$generichide` restricts the result to domain-specific selectors.
    pub fn element_hide_data(
        &self,
        frame_url: &Url,
        frame_hierarchy: &[Url],
        sitekey: &SiteKey,
    ) -> ContentFiltersData {
        let domain_specific = self
            .find_by_special_filter(SpecialFilterType::Generichide, frame_url, frame_hierarchy, sitekey)
            .is_some();
        let mut combined = ContentFiltersData::default();
        for subscription in self.subscriptions.iter() {
            combined.append(subscription.elemhide_data(frame_url, domain_specific));
        }
        remove_excepted_selectors(combined)
    }

    pub fn element_hide_emulation_data(&self, frame_url: &Url) -> ContentFiltersData {
        let mut combined = ContentFiltersData::default();
        for subscription in self.subscriptions.iter() {
            combined.append(subscription.elemhide_emulation_data(frame_url));
        }
        remove_excepted_selectors(combined)
    }

    pub fn generate_snippets(&self, frame_url: &Url, frame_hierarchy: &[Url]) -> Vec<Snippet> {
        let domain = document_domain(frame_url, frame_hierarchy);
        self.subscriptions
            .iter()
            .flat_map(|s| s.match_snippets(domain))
            .collect()
    }

    /// CSP directives to inject into the response of `request_url`.
    pub fn csp_injections(&self, request_url: &Url, frame_hierarchy: &[Url]) -> BTreeSet<String> {
        let domain = document_domain(request_url, frame_hierarchy);
        let no_sitekey = SiteKey::default();

        let mut blocking = BTreeSet::new();
        for subscription in self.subscriptions.iter() {
            subscription.find_csp_filters(request_url, domain, FilterCategory::Blocking, &mut blocking);
        }
        if blocking.is_empty() {
            return BTreeSet::new();
        }

        let mut allowing = BTreeSet::new();
        for subscription in self.subscriptions.iter() {
            if has_special_filter(
                subscription.as_ref(),
                SpecialFilterType::Document,
                request_url,
                frame_hierarchy,
                &no_sitekey,
            ) {
                return BTreeSet::new();
            }
            subscription.find_csp_filters(request_url, domain, FilterCategory::Allowing, &mut allowing);
        }

        // An empty allowing payload allows every directive.
        if allowing.contains("") {
            return BTreeSet::new();
        }
        blocking.retain(|f| !allowing.contains(f));
        if blocking.is_empty() {
            return BTreeSet::new();
        }

        let genericblock = self.subscriptions.iter().any(|s| {
            has_special_filter(
                s.as_ref(),
                SpecialFilterType::Genericblock,
                request_url,
                frame_hierarchy,
                &no_sitekey,
            )
        });
        if genericblock {
            let mut domain_specific = BTreeSet::new();
            for subscription in self.subscriptions.iter() {
                subscription.find_csp_filters(
                    request_url,
                    domain,
                    FilterCategory::DomainSpecificBlocking,
                    &mut domain_specific,
                );
            }
            domain_specific.retain(|f| !allowing.contains(f));
            return domain_specific;
        }

        blocking
    }

    pub fn rewrite_filters(
        &self,
        request_url: &Url,
        frame_hierarchy: &[Url],
        category: FilterCategory,
    ) -> BTreeSet<String> {
        let domain = document_domain(request_url, frame_hierarchy);
        self.subscriptions
            .iter()
            .flat_map(|s| s.find_rewrite_filters(request_url, domain, category))
            .collect()
    }

    pub fn header_filters(
        &self,
        request_url: &Url,
        frame_hierarchy: &[Url],
        content_type: ContentType,
        category: FilterCategory,
    ) -> BTreeSet<HeaderFilterData> {
        let domain = document_domain(request_url, frame_hierarchy);
        let mut results = BTreeSet::new();
        for subscription in self.subscriptions.iter() {
            subscription.find_header_filters(request_url, content_type, domain, category, &mut results);
        }
        results
    }
}

impl std::fmt::Debug for SubscriptionCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionCollection")
            .field("configuration_name", &self.configuration_name)
            .field(
                "subscriptions",
                &self.subscriptions.iter().map(|s| s.source_url().as_str()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Checks every frame of the hierarchy, each judged against its parent's
/// host. The outermost frame is judged against its own host.
fn hierarchy_has_special_filter(
    subscription: &dyn InstalledSubscription,
    filter_type: SpecialFilterType,
    frame_hierarchy: &[Url],
    sitekey: &SiteKey,
) -> bool {
    frame_hierarchy.iter().enumerate().any(|(i, frame)| {
        let parent = frame_hierarchy.get(i + 1).unwrap_or(frame);
        let domain = parent.host_str().unwrap_or_default();
        subscription.has_special_filter(filter_type, frame, domain, sitekey)
    })
}

fn has_special_filter(
    subscription: &dyn InstalledSubscription,
    filter_type: SpecialFilterType,
    request_url: &Url,
    frame_hierarchy: &[Url],
    sitekey: &SiteKey,
) -> bool {
    subscription.has_special_filter(
        filter_type,
        request_url,
        document_domain(request_url, frame_hierarchy),
        sitekey,
    ) || hierarchy_has_special_filter(subscription, filter_type, frame_hierarchy, sitekey)
}

fn remove_excepted_selectors(mut data: ContentFiltersData) -> ContentFiltersData {
    if data.exceptions.is_empty() {
        return data;
    }
    let exceptions: BTreeSet<String> = std::mem::take(&mut data.exceptions).into_iter().collect();
    data.selectors.retain(|s| !exceptions.contains(s));
    data.remove_selectors.retain(|s| !exceptions.contains(s));
    data.selectors_to_inline_css
        .retain(|selector, _| !exceptions.contains(selector));
    data
}
