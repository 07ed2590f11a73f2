//! Well-known subscription URLs and names.

use std::time::Duration;
use url::Url;

/// Name of the configuration created on first run. Acceptable Ads pings
/// and recommended subscriptions only apply to it.
pub const ADBLOCK_CONFIGURATION_NAME: &str = "adblock";

pub const DEFAULT_SUBSCRIPTION_URL: &str = "https://easylist-downloads.adblockplus.org/easylist.txt";

pub const ACCEPTABLE_ADS_URL: &str =
    "https://easylist-downloads.adblockplus.org/exceptionrules.txt";

pub const ANTI_CV_URL: &str =
    "https://easylist-downloads.adblockplus.org/abp-filters-anti-cv.txt";

/// Pseudo URL identifying the synthetic custom filters subscription.
pub const CUSTOM_FILTERS_URL: &str = "adblock:custom";

pub const RECOMMENDED_SUBSCRIPTIONS_URL: &str =
    "https://easylist-downloads.adblockplus.org/recommendations.json";

/// Fallback expiration used when a list does not declare `! Expires:`.
pub const DEFAULT_EXPIRATION_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Expiration used after a successful Acceptable Ads HEAD ping.
pub const PING_EXPIRATION_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// How long an auto-installed recommendation stays without being refreshed.
pub const AUTO_INSTALLED_EXPIRATION_INTERVAL: Duration = Duration::from_secs(14 * 24 * 60 * 60);

pub const MAX_NUMBER_OF_REDIRECTS: usize = 3;

fn parse(url: &str) -> Url {
    Url::parse(url).expect("built-in subscription URL")
}

pub fn default_subscription_url() -> Url {
    parse(DEFAULT_SUBSCRIPTION_URL)
}

pub fn acceptable_ads_url() -> Url {
    parse(ACCEPTABLE_ADS_URL)
}

pub fn anti_cv_url() -> Url {
    parse(ANTI_CV_URL)
}

pub fn custom_filters_url() -> Url {
    parse(CUSTOM_FILTERS_URL)
}

pub fn recommended_subscriptions_url() -> Url {
    parse(RECOMMENDED_SUBSCRIPTIONS_URL)
}

/// Lists allowed to carry privileged filters such as snippets.
pub fn allow_privileged_filters(url: &Url) -> bool {
    url.as_str() == ANTI_CV_URL || url.as_str() == CUSTOM_FILTERS_URL
}

/// Subscriptions a fresh `"adblock"` configuration starts with.
pub fn default_filter_lists() -> Vec<Url> {
    vec![default_subscription_url(), acceptable_ads_url(), anti_cv_url()]
}
