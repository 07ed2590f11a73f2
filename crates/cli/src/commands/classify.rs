use crate::di::AdblockServices;
use anyhow::Context;
use clap::Args;
use ferrous_adblock_application::services::{
    ResourceClassifier, ResourceClassifierImpl, SubscriptionService, SubscriptionServiceImpl,
};
use ferrous_adblock_domain::{ContentType, InstallationState, SiteKey};
use serde_json::json;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};
use url::Url;

#[derive(Debug, Args)]
pub struct ClassifyArgs {
    /// Request URL
    pub url: String,

    /// Frame URLs from the requesting frame up to the top-level document (repeatable)
    #[arg(long = "frame")]
    pub frames: Vec<String>,

    /// Resource type: script, image, stylesheet, subdocument, ...
    #[arg(long, default_value = "other")]
    pub content_type: String,

    /// Site key presented by the page
    #[arg(long, default_value = "")]
    pub sitekey: String,

    /// Classify as a popup opened by the first frame
    #[arg(long)]
    pub popup: bool,

    /// How long to wait for filter lists to install
    #[arg(long, default_value = "30")]
    pub wait_secs: u64,
}

fn is_settled(state: InstallationState) -> bool {
    matches!(
        state,
        InstallationState::Installed | InstallationState::AutoInstalled
    )
}

/// Waits until every enabled configuration has its lists installed.
async fn wait_for_installation(service: &SubscriptionServiceImpl, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        let mut pending = 0usize;
        for configuration in service.installed_filtering_configurations().await {
            if !configuration.is_enabled() {
                continue;
            }
            pending += service
                .current_subscriptions(configuration.name())
                .await
                .iter()
                .filter(|info| !is_settled(info.installation_state))
                .count();
        }
        if pending == 0 {
            return true;
        }
        if Instant::now() >= deadline {
            warn!(pending, "Filter lists still installing, classifying with what is available");
            return false;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
}

pub async fn classify(services: &AdblockServices, args: ClassifyArgs) -> anyhow::Result<()> {
    let request_url = Url::parse(&args.url).context("invalid request URL")?;
    let frames = args
        .frames
        .iter()
        .map(|f| Url::parse(f).with_context(|| format!("invalid frame URL {f}")))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let content_type: ContentType = args
        .content_type
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;
    let sitekey = SiteKey::new(args.sitekey);

    let service = services.start_with_configurations().await;
    wait_for_installation(&service, Duration::from_secs(args.wait_secs)).await;

    let snapshot = service.latest_snapshot();
    let classifier = ResourceClassifierImpl::new();
    let result = if args.popup {
        let opener = frames.first().unwrap_or(&request_url);
        classifier.classify_popup(&snapshot, &request_url, opener, &sitekey)
    } else {
        classifier.classify_request(&snapshot, &request_url, &frames, content_type, &sitekey)
    };
    let rewrite = if args.popup {
        None
    } else {
        classifier
            .check_rewrite(&snapshot, &request_url, &frames)
            .map(|r| r.url.to_string())
    };
    info!(url = %request_url, decision = %result.decision, "Request classified");

    let output = json!({
        "url": request_url.as_str(),
        "decision": result.decision,
        "subscription": result.subscription.as_ref().map(Url::as_str),
        "configuration": result.configuration_name,
        "rewrite": rewrite,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
