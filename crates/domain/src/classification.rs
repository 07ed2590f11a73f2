use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClassificationDecision {
    Allowed,
    Blocked,
    Ignored,
}

impl fmt::Display for ClassificationDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Allowed => "allowed",
            Self::Blocked => "blocked",
            Self::Ignored => "ignored",
        };
        f.write_str(s)
    }
}

/// Verdict for one request, popup or response.
///
/// `subscription` and `configuration_name` identify the filter list that
/// produced the decision; both are empty for [`ClassificationDecision::Ignored`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub decision: ClassificationDecision,
    pub subscription: Option<Url>,
    pub configuration_name: String,
}

impl ClassificationResult {
    pub fn ignored() -> Self {
        Self {
            decision: ClassificationDecision::Ignored,
            subscription: None,
            configuration_name: String::new(),
        }
    }

    pub fn allowed(subscription: Url, configuration_name: impl Into<String>) -> Self {
        Self {
            decision: ClassificationDecision::Allowed,
            subscription: Some(subscription),
            configuration_name: configuration_name.into(),
        }
    }

    pub fn blocked(subscription: Url, configuration_name: impl Into<String>) -> Self {
        Self {
            decision: ClassificationDecision::Blocked,
            subscription: Some(subscription),
            configuration_name: configuration_name.into(),
        }
    }

    pub fn is_blocked(&self) -> bool {
        self.decision == ClassificationDecision::Blocked
    }

    pub fn is_allowed(&self) -> bool {
        self.decision == ClassificationDecision::Allowed
    }
}

impl Default for ClassificationResult {
    fn default() -> Self {
        Self::ignored()
    }
}

/// Replacement URL chosen by a `$rewrite` filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteResult {
    pub url: Url,
    pub configuration_name: String,
}
