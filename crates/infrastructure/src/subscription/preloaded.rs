use crate::filters::{parse_filter_list, RulesetSubscription};
use ferrous_adblock_application::ports::{InstalledSubscription, PreloadedSubscriptionProvider};
use ferrous_adblock_application::ports::ConversionResult;
use ferrous_adblock_domain::config::PreloadedSubscription;
use ferrous_adblock_domain::InstallationState;
use rustc_hash::FxHashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};
use url::Url;

#[derive(Default)]
struct ProviderState {
    /// Preloaded subscriptions currently served, keyed by URL.
    active: FxHashMap<Url, Arc<dyn InstalledSubscription>>,
    order: Vec<Url>,
}

/// Serves bundled copies of filter lists until their downloads complete.
pub struct BundledPreloadedSubscriptionProvider {
    bundles: Vec<PreloadedSubscription>,
    state: Mutex<ProviderState>,
}

impl BundledPreloadedSubscriptionProvider {
    pub fn new(bundles: Vec<PreloadedSubscription>) -> Self {
        Self {
            bundles,
            state: Mutex::new(ProviderState::default()),
        }
    }

    fn bundle_for(&self, url: &Url) -> Option<&PreloadedSubscription> {
        self.bundles.iter().find(|b| b.matches(url.as_str()))
    }

    fn load_bundle(url: &Url, bundle: &PreloadedSubscription) -> Option<Arc<dyn InstalledSubscription>> {
        let content = match std::fs::read(&bundle.file) {
            Ok(content) => content,
            Err(e) => {
                warn!(url = %url, file = %bundle.file.display(), error = %e, "Failed to read bundled list");
                return None;
            }
        };
        match parse_filter_list(url, &content) {
            Ok(ruleset) => {
                info!(url = %url, file = %bundle.file.display(), "Serving preloaded subscription");
                Some(Arc::new(RulesetSubscription::new(
                    ruleset,
                    InstallationState::Preloaded,
                    None,
                )))
            }
            Err(ConversionResult::Redirect(target)) => {
                warn!(url = %url, redirect = %target, "Bundled list redirects, ignoring");
                None
            }
            Err(e) => {
                warn!(url = %url, result = ?e, "Bundled list could not be converted");
                None
            }
        }
    }
}

impl PreloadedSubscriptionProvider for BundledPreloadedSubscriptionProvider {
    fn update_subscriptions(&self, installed: &[Url], pending: &[Url]) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let wanted: Vec<&Url> = pending
            .iter()
            .filter(|url| !installed.contains(url))
            .filter(|url| self.bundle_for(url).is_some())
            .collect();

        let mut active = FxHashMap::default();
        let mut order = Vec::with_capacity(wanted.len());
        for url in wanted {
            let existing = state.active.remove(url);
            let subscription = match existing {
                Some(subscription) => Some(subscription),
                None => self
                    .bundle_for(url)
                    .and_then(|bundle| Self::load_bundle(url, bundle)),
            };
            if let Some(subscription) = subscription {
                active.insert(url.clone(), subscription);
                order.push(url.clone());
            }
        }

        for released in state.active.keys() {
            debug!(url = %released, "Releasing preloaded subscription");
        }
        state.active = active;
        state.order = order;
    }

    fn current_preloaded_subscriptions(&self) -> Vec<Arc<dyn InstalledSubscription>> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state
            .order
            .iter()
            .filter_map(|url| state.active.get(url).cloned())
            .collect()
    }
}
