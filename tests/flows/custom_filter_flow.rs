//! Custom filters and allowed domains through the full stack:
//! configuration → service → maintainer → converter → classifier.

#[path = "../common/mod.rs"]
mod common;

use common::{url, TestStack};
use ferrous_adblock_application::configuration::FilteringConfiguration;
use ferrous_adblock_application::services::SubscriptionService;
use ferrous_adblock_domain::known_subscriptions::custom_filters_url;
use ferrous_adblock_domain::ClassificationDecision;
use tempfile::TempDir;

// ============================================================================
// Custom filter + allowed domain
// ============================================================================

#[tokio::test]
async fn test_custom_filter_blocks_then_allowed_domain_allows() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let stack = TestStack::start(dir.path());
    let configuration = stack.install("adblock").await;
    let request = url("https://x/resource.png");
    let page = url("https://x/");

    // Act: custom filter
    configuration.add_custom_filter("*resource.png");

    // Assert: blocked by the custom filters subscription
    let blocked = stack
        .wait_for(&request, &page, ClassificationDecision::Blocked)
        .await;
    assert_eq!(blocked.decision, ClassificationDecision::Blocked);
    assert_eq!(blocked.subscription, Some(custom_filters_url()));
    assert_eq!(blocked.configuration_name, "adblock");

    // Act: allow the domain
    configuration.add_allowed_domain("x");

    // Assert
    let allowed = stack
        .wait_for(&request, &page, ClassificationDecision::Allowed)
        .await;
    assert_eq!(allowed.decision, ClassificationDecision::Allowed);
    assert_eq!(allowed.configuration_name, "adblock");
}

#[tokio::test]
async fn test_removing_custom_filter_stops_blocking() {
    let dir = TempDir::new().unwrap();
    let stack = TestStack::start(dir.path());
    let configuration = stack.install("adblock").await;
    let request = url("https://x/resource.png");
    let page = url("https://x/");
    configuration.add_custom_filter("*resource.png");
    stack
        .wait_for(&request, &page, ClassificationDecision::Blocked)
        .await;

    configuration.remove_custom_filter("*resource.png");

    let result = stack
        .wait_for(&request, &page, ClassificationDecision::Ignored)
        .await;
    assert_eq!(result.decision, ClassificationDecision::Ignored);
}

#[tokio::test]
async fn test_disabled_configuration_does_not_classify() {
    let dir = TempDir::new().unwrap();
    let stack = TestStack::start(dir.path());
    let configuration = stack.install("adblock").await;
    let request = url("https://x/resource.png");
    let page = url("https://x/");
    configuration.add_custom_filter("*resource.png");
    stack
        .wait_for(&request, &page, ClassificationDecision::Blocked)
        .await;

    configuration.set_enabled(false);

    let result = stack
        .wait_for(&request, &page, ClassificationDecision::Ignored)
        .await;
    assert_eq!(result.decision, ClassificationDecision::Ignored);
    assert!(stack.service.current_snapshot().await.is_empty());
}
