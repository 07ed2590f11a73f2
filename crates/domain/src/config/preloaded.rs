use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A bundled filter list served while the matching subscription downloads.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PreloadedSubscription {
    /// URL pattern; a leading `*` matches any prefix (e.g. "*easylist.txt")
    pub url_pattern: String,

    /// Path to the bundled list text
    pub file: PathBuf,
}

impl PreloadedSubscription {
    pub fn matches(&self, url: &str) -> bool {
        match self.url_pattern.strip_prefix('*') {
            Some(suffix) => url.ends_with(suffix),
            None => url == self.url_pattern,
        }
    }
}
