//! Adblock Plus filter lists: parsing, serialization and matching.

pub mod converter;
pub mod parser;
pub mod pattern;
pub mod ruleset;
pub mod ruleset_subscription;

pub use converter::{
    convert_filter_text, deserialize_ruleset, parse_filter_list, TextConversionExecutors,
};
pub use ruleset::Ruleset;
pub use ruleset_subscription::RulesetSubscription;
