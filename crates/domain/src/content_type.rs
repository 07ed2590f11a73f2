use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Bitmask of resource types a URL filter applies to.
///
/// A filter matches a request only when its mask overlaps the request's
/// content type. Filters without explicit type options apply to
/// [`ContentType::DEFAULT`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentType(u32);

impl ContentType {
    pub const UNKNOWN: ContentType = ContentType(0);
    pub const OTHER: ContentType = ContentType(1);
    pub const SCRIPT: ContentType = ContentType(1 << 1);
    pub const IMAGE: ContentType = ContentType(1 << 2);
    pub const STYLESHEET: ContentType = ContentType(1 << 3);
    pub const OBJECT: ContentType = ContentType(1 << 4);
    pub const SUBDOCUMENT: ContentType = ContentType(1 << 5);
    pub const WEBSOCKET: ContentType = ContentType(1 << 6);
    pub const WEBRTC: ContentType = ContentType(1 << 7);
    pub const PING: ContentType = ContentType(1 << 8);
    pub const XMLHTTPREQUEST: ContentType = ContentType(1 << 9);
    pub const MEDIA: ContentType = ContentType(1 << 10);
    pub const FONT: ContentType = ContentType(1 << 11);

    pub const DEFAULT: ContentType = ContentType((1 << 12) - 1);

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn from_bits(bits: u32) -> Self {
        ContentType(bits & Self::DEFAULT.0)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, other: ContentType) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn intersects(self, other: ContentType) -> bool {
        self.0 & other.0 != 0
    }

    pub const fn without(self, other: ContentType) -> Self {
        ContentType(self.0 & !other.0)
    }

    /// Maps a filter option name (`script`, `image`, ...) to its type.
    pub fn from_option_name(name: &str) -> Option<Self> {
        let ty = match name {
            "other" => Self::OTHER,
            "script" => Self::SCRIPT,
            "image" => Self::IMAGE,
            "stylesheet" => Self::STYLESHEET,
            "object" => Self::OBJECT,
            "subdocument" => Self::SUBDOCUMENT,
            "websocket" => Self::WEBSOCKET,
            "webrtc" => Self::WEBRTC,
            "ping" => Self::PING,
            "xmlhttprequest" => Self::XMLHTTPREQUEST,
            "media" => Self::MEDIA,
            "font" => Self::FONT,
            _ => return None,
        };
        Some(ty)
    }
}

impl BitOr for ContentType {
    type Output = ContentType;

    fn bitor(self, rhs: Self) -> Self::Output {
        ContentType(self.0 | rhs.0)
    }
}

impl BitOrAssign for ContentType {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl std::str::FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_option_name(&s.to_ascii_lowercase())
            .ok_or_else(|| format!("Unknown content type: {s}"))
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}
