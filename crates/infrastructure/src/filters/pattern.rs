//! Translation of filter patterns into regular expressions.
//!
//! - `/.../`  → the enclosed expression, verbatim
//! - `||`     → scheme plus any subdomain prefix
//! - `|`      → start or end anchor
//! - `*`      → any sequence
//! - `^`      → separator character or end of address

const DOMAIN_ANCHOR: &str = r"^[a-z][a-z0-9+.\-]*:/+(?:[^/]+\.)?";
const SEPARATOR: &str = r"(?:[\x00-\x24\x26-\x2C\x2F\x3A-\x40\x5B-\x5E\x60\x7B-\x7F]|$)";

/// Builds the regex source for `pattern`.
pub fn pattern_to_regex(pattern: &str, match_case: bool) -> String {
    let flags = if match_case { "" } else { "(?i)" };

    if let Some(regex) = literal_regex(pattern) {
        return format!("{flags}{regex}");
    }

    let mut rest = pattern;
    let mut out = String::with_capacity(pattern.len() * 2 + DOMAIN_ANCHOR.len());
    out.push_str(flags);

    if let Some(stripped) = rest.strip_prefix("||") {
        out.push_str(DOMAIN_ANCHOR);
        rest = stripped;
    } else if let Some(stripped) = rest.strip_prefix('|') {
        out.push('^');
        rest = stripped;
    }

    let end_anchor = rest.ends_with('|');
    if end_anchor {
        rest = &rest[..rest.len() - 1];
    }

    let mut previous_star = false;
    for c in rest.chars() {
        match c {
            '*' => {
                if !previous_star {
                    out.push_str(".*");
                }
                previous_star = true;
                continue;
            }
            '^' => out.push_str(SEPARATOR),
            c if c.is_ascii_alphanumeric() || c == '_' || !c.is_ascii() => out.push(c),
            c => {
                out.push('\\');
                out.push(c);
            }
        }
        previous_star = false;
    }

    if end_anchor {
        out.push('$');
    }
    out
}

/// `/expr/` filters carry a raw regular expression.
fn literal_regex(pattern: &str) -> Option<&str> {
    if pattern.len() > 2 && pattern.starts_with('/') && pattern.ends_with('/') {
        Some(&pattern[1..pattern.len() - 1])
    } else {
        None
    }
}
