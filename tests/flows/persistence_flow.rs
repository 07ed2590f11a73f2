//! State that must survive a restart of the whole stack.

#[path = "../common/mod.rs"]
mod common;

use common::{data_list, url, TestStack, TestUrls};
use ferrous_adblock_application::configuration::{
    FilteringConfiguration, PersistentFilteringConfiguration,
};
use ferrous_adblock_application::services::SubscriptionService;
use ferrous_adblock_domain::{ClassificationDecision, ContentType, InstallationState};
use std::time::Duration;
use tempfile::TempDir;

async fn wait_state(stack: &TestStack, name: &str, state: InstallationState) -> bool {
    for _ in 0..200 {
        let subscriptions = stack.service.current_subscriptions(name).await;
        if !subscriptions.is_empty() && subscriptions.iter().all(|s| s.installation_state == state) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

#[tokio::test]
async fn test_configuration_and_lists_survive_restart() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let list = data_list(&["||tracker.example^"]);
    {
        let stack = TestStack::start(dir.path());
        let configuration = stack.install("adblock").await;
        configuration.add_filter_list(&list);
        configuration.add_allowed_domain("trusted.example");
        assert!(wait_state(&stack, "adblock", InstallationState::Installed).await);
        assert_eq!(stack.metadata.download_success_count(&list), 1);
    }

    // Act
    let stack = TestStack::start(dir.path());
    let restored = stack.restore().await;

    // Assert
    assert_eq!(restored.len(), 1);
    assert_eq!(restored[0].filter_lists(), vec![list.clone()]);
    assert_eq!(restored[0].allowed_domains(), vec!["trusted.example".to_string()]);
    assert!(wait_state(&stack, "adblock", InstallationState::Installed).await);
    let result = stack.classify(&TestUrls::tracker(), &TestUrls::page(), ContentType::SCRIPT);
    assert_eq!(result.decision, ClassificationDecision::Blocked);
    assert_eq!(
        stack.metadata.download_success_count(&list),
        1,
        "a fresh stored copy is loaded instead of downloaded again"
    );
}

#[tokio::test]
async fn test_uninstalled_configuration_is_gone_after_restart() {
    let dir = TempDir::new().unwrap();
    {
        let stack = TestStack::start(dir.path());
        let configuration = stack.install("temporary").await;
        configuration.add_custom_filter("*resource.png");
        stack
            .wait_for(&url("https://x/resource.png"), &url("https://x/"), ClassificationDecision::Blocked)
            .await;
        assert!(stack.service.uninstall_filtering_configuration("temporary").await);

        assert!(PersistentFilteringConfiguration::persisted_names(stack.prefs.as_ref()).is_empty());
    }

    let stack = TestStack::start(dir.path());
    let restored = stack.restore().await;

    assert!(restored.is_empty());
}
