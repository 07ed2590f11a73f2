//! Several configurations evaluated together.

#[path = "../common/mod.rs"]
mod common;

use common::{data_list, TestStack, TestUrls};
use ferrous_adblock_application::configuration::FilteringConfiguration;
use ferrous_adblock_application::services::SubscriptionService;
use ferrous_adblock_domain::{ClassificationDecision, ContentType, InstallationState};
use std::time::Duration;
use tempfile::TempDir;

async fn wait_installed(stack: &TestStack, name: &str, count: usize) -> bool {
    for _ in 0..200 {
        let installed = stack
            .service
            .current_subscriptions(name)
            .await
            .iter()
            .filter(|s| s.installation_state == InstallationState::Installed)
            .count();
        if installed >= count {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

// ============================================================================
// Downloaded lists
// ============================================================================

#[tokio::test]
async fn test_data_url_list_is_downloaded_and_applied() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let stack = TestStack::start(dir.path());
    let list = data_list(&["||ads.example^"]);
    let configuration = stack.install("adblock").await;

    // Act
    configuration.add_filter_list(&list);

    // Assert
    assert!(wait_installed(&stack, "adblock", 1).await);
    let result = stack.classify(&TestUrls::ad_script(), &TestUrls::page(), ContentType::SCRIPT);
    assert_eq!(result.decision, ClassificationDecision::Blocked);
    assert_eq!(result.subscription, Some(list.clone()));
    assert_eq!(stack.metadata.download_success_count(&list), 1);
}

#[tokio::test]
async fn test_blocking_in_one_configuration_wins_over_allowing_in_another() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let stack = TestStack::start(dir.path());
    let allowing = stack.install("allowing").await;
    let blocking = stack.install("blocking").await;
    allowing.add_filter_list(&data_list(&["||ads.example^", "@@||ads.example/banner.js"]));
    blocking.add_filter_list(&data_list(&["||ads.example^"]));

    // Act
    assert!(wait_installed(&stack, "allowing", 1).await);
    assert!(wait_installed(&stack, "blocking", 1).await);
    let result = stack.classify(&TestUrls::ad_script(), &TestUrls::page(), ContentType::SCRIPT);

    // Assert
    assert_eq!(result.decision, ClassificationDecision::Blocked);
    assert_eq!(result.configuration_name, "blocking");
}

#[tokio::test]
async fn test_snapshot_order_follows_registration() {
    let dir = TempDir::new().unwrap();
    let stack = TestStack::start(dir.path());
    stack.install("first").await;
    stack.install("second").await;
    stack.install("third").await;

    let names: Vec<String> = stack
        .service
        .current_snapshot()
        .await
        .iter()
        .map(|c| c.configuration_name().to_string())
        .collect();

    assert_eq!(names, vec!["first", "second", "third"]);
}

#[tokio::test]
async fn test_old_snapshot_is_unaffected_by_later_changes() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let stack = TestStack::start(dir.path());
    let configuration = stack.install("adblock").await;
    configuration.add_filter_list(&data_list(&["||tracker.example^"]));
    assert!(wait_installed(&stack, "adblock", 1).await);
    let before = stack.service.latest_snapshot();

    // Act
    assert!(stack.service.uninstall_filtering_configuration("adblock").await);

    // Assert
    assert_eq!(before.len(), 1);
    assert!(before[0]
        .subscriptions()
        .iter()
        .any(|s| s.installation_state() == InstallationState::Installed));
    assert!(stack.service.current_snapshot().await.is_empty());
}
