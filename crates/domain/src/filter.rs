use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

/// Which set of URL filters a query searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterCategory {
    Allowing,
    Blocking,
    /// Blocking filters that carry an include-domain restriction.
    DomainSpecificBlocking,
}

/// Exception filters that alter how other filters apply on a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpecialFilterType {
    /// Disables all blocking and hiding on the page.
    Document,
    /// Disables element hiding on the page.
    Elemhide,
    /// Disables generic blocking filters on the page.
    Genericblock,
    /// Disables generic element hiding filters on the page.
    Generichide,
}

impl SpecialFilterType {
    pub fn from_option_name(name: &str) -> Option<Self> {
        match name {
            "document" => Some(Self::Document),
            "elemhide" | "ehide" => Some(Self::Elemhide),
            "genericblock" => Some(Self::Genericblock),
            "generichide" | "ghide" => Some(Self::Generichide),
            _ => None,
        }
    }
}

/// A `$header=` filter payload together with the list it came from.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HeaderFilterData {
    pub header_filter: String,
    pub subscription_url: Url,
}

impl HeaderFilterData {
    pub fn new(header_filter: impl Into<String>, subscription_url: Url) -> Self {
        Self {
            header_filter: header_filter.into(),
            subscription_url,
        }
    }
}

/// Element hiding data for one page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentFiltersData {
    pub selectors: Vec<String>,
    /// `#@#` selectors that cancel matching `selectors` from any list.
    pub exceptions: Vec<String>,
    pub remove_selectors: Vec<String>,
    pub selectors_to_inline_css: BTreeMap<String, String>,
}

impl ContentFiltersData {
    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
            && self.exceptions.is_empty()
            && self.remove_selectors.is_empty()
            && self.selectors_to_inline_css.is_empty()
    }

    pub fn append(&mut self, other: ContentFiltersData) {
        self.selectors.extend(other.selectors);
        self.exceptions.extend(other.exceptions);
        self.remove_selectors.extend(other.remove_selectors);
        self.selectors_to_inline_css
            .extend(other.selectors_to_inline_css);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippet {
    pub command: String,
    pub arguments: Vec<String>,
}

/// Named replacement resources usable by `$rewrite=abp-resource:<name>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RewriteResource {
    BlankText,
    BlankCss,
    BlankJs,
    BlankHtml,
    BlankMp3,
    BlankMp4,
    TransparentGif1x1,
}

impl RewriteResource {
    pub const PREFIX: &'static str = "abp-resource:";

    pub fn from_option_value(value: &str) -> Option<Self> {
        let name = value.strip_prefix(Self::PREFIX)?;
        let resource = match name {
            "blank-text" => Self::BlankText,
            "blank-css" => Self::BlankCss,
            "blank-js" => Self::BlankJs,
            "blank-html" => Self::BlankHtml,
            "blank-mp3" => Self::BlankMp3,
            "blank-mp4" => Self::BlankMp4,
            "1x1-transparent-gif" => Self::TransparentGif1x1,
            _ => return None,
        };
        Some(resource)
    }

    pub fn data_url(self) -> &'static str {
        match self {
            Self::BlankText => "data:text/plain,",
            Self::BlankCss => "data:text/css,",
            Self::BlankJs => "data:application/javascript,",
            Self::BlankHtml => "data:text/html,<!DOCTYPE html>",
            Self::BlankMp3 => "data:audio/mpeg3,",
            Self::BlankMp4 => "data:video/mp4,",
            Self::TransparentGif1x1 => {
                "data:image/gif;base64,R0lGODlhAQABAIAAAAAAAP///yH5BAEAAAAALAAAAAABAAEAAAIBRAA7"
            }
        }
    }
}
