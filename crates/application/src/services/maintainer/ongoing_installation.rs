use ferrous_adblock_domain::RetryPolicy;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio_util::sync::CancellationToken;
use url::Url;

static NEXT_INSTALLATION_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstallationId(u64);

impl InstallationId {
    fn next() -> Self {
        InstallationId(NEXT_INSTALLATION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallationKind {
    /// First installation of a newly declared list.
    Initial,
    /// Refresh of an installed list whose metadata expired.
    Update,
}

impl InstallationKind {
    pub fn retry_policy(self) -> RetryPolicy {
        match self {
            Self::Initial => RetryPolicy::RetryUntilSucceeded,
            Self::Update => RetryPolicy::DoNotRetry,
        }
    }
}

/// A download+store pipeline in flight. Cancelling the token makes every
/// later completion a no-op.
#[derive(Debug)]
pub(crate) struct OngoingInstallation {
    pub id: InstallationId,
    pub url: Url,
    pub kind: InstallationKind,
    pub token: CancellationToken,
}

impl OngoingInstallation {
    pub fn new(url: Url, kind: InstallationKind, token: CancellationToken) -> Self {
        Self {
            id: InstallationId::next(),
            url,
            kind,
            token,
        }
    }
}
