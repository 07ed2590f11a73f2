use super::pattern::pattern_to_regex;
use super::ruleset::{
    ContentFilter, ContentFilterKind, ContentFilterStyle, DomainRestriction, Ruleset,
    SnippetCall, SnippetFilter, UrlFilter, UrlFilterAction,
};
use ferrous_adblock_domain::known_subscriptions::DEFAULT_EXPIRATION_INTERVAL;
use ferrous_adblock_domain::{ContentType, RewriteResource, SpecialFilterType};
use std::time::Duration;
use url::Url;

const LIST_HEADER: &str = "[Adblock Plus";
const MIN_EXPIRATION: Duration = Duration::from_secs(60 * 60);
const MAX_EXPIRATION: Duration = Duration::from_secs(14 * 24 * 60 * 60);

// ---------------------------------------------------------------------------
// List header
// ---------------------------------------------------------------------------

/// Values declared in the `!` comment block at the top of a list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListMetadata {
    pub title: String,
    pub version: String,
    pub expires: Duration,
    pub redirect: Option<Url>,
}

impl Default for ListMetadata {
    fn default() -> Self {
        Self {
            title: String::new(),
            version: String::new(),
            expires: DEFAULT_EXPIRATION_INTERVAL,
            redirect: None,
        }
    }
}

/// Reads the list header.
///
/// Supported keys:
/// - `! Title: <text>`
/// - `! Version: <text>`
/// - `! Expires: <n> days|hours` (clamped to one hour .. 14 days)
/// - `! Redirect: <url>`
///
/// # Returns
/// An error when the text does not start with `[Adblock Plus`
pub fn parse_list_metadata(text: &str) -> Result<ListMetadata, String> {
    let mut lines = text.trim_start_matches('\u{feff}').lines();
    match lines.next() {
        Some(first) if first.trim_start().starts_with(LIST_HEADER) => {}
        _ => return Err("Missing [Adblock Plus] header".to_string()),
    }

    let mut metadata = ListMetadata::default();
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some(comment) = line.strip_prefix('!') else {
            break;
        };
        let Some((key, value)) = comment.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key.trim().to_ascii_lowercase().as_str() {
            "title" => metadata.title = value.to_string(),
            "version" => metadata.version = value.to_string(),
            "expires" => {
                if let Some(expires) = parse_expires(value) {
                    metadata.expires = expires;
                }
            }
            "redirect" => metadata.redirect = Url::parse(value).ok(),
            _ => {}
        }
    }
    Ok(metadata)
}

/// `"4 days"`, `"12 hours"`, `"1 day (update frequency)"`.
pub fn parse_expires(value: &str) -> Option<Duration> {
    let mut tokens = value.split_whitespace();
    let amount: u64 = tokens.next()?.parse().ok()?;
    let unit_secs = match tokens.next() {
        Some(unit) if unit.starts_with("hour") => 60 * 60,
        Some(unit) if unit.starts_with("day") => 24 * 60 * 60,
        None => 24 * 60 * 60,
        Some(_) => return None,
    };
    let expires = Duration::from_secs(amount.saturating_mul(unit_secs));
    Some(expires.clamp(MIN_EXPIRATION, MAX_EXPIRATION))
}

// ---------------------------------------------------------------------------
// Filter lines
// ---------------------------------------------------------------------------

/// Adds the filter on `line` to `ruleset`.
///
/// Comments and blank lines are skipped silently.
///
/// # Arguments
/// * `line` - One trimmed line of list text
/// * `allow_privileged` - Whether `$header=` and `#$#` filters are accepted
/// * `ruleset` - Destination
///
/// # Returns
/// A reason when the line holds a filter that cannot be used
pub fn parse_filter_line(line: &str, allow_privileged: bool, ruleset: &mut Ruleset) -> Result<(), String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('!') || line.starts_with('[') {
        return Ok(());
    }

    if let Some((domains, kind, body)) = split_content_filter(line) {
        return parse_content_filter(domains, kind, body, allow_privileged, ruleset);
    }

    let filter = parse_url_filter(line, allow_privileged)?;
    ruleset.url_filters.push(filter);
    Ok(())
}

enum ContentSeparator {
    Hide,
    Exception,
    Emulation,
    Snippet,
}

/// Splits `domains##selector` style lines. The domain part may not contain
/// characters that only occur in URL filters.
fn split_content_filter(line: &str) -> Option<(&str, ContentSeparator, &str)> {
    for (idx, _) in line.match_indices('#') {
        let domains = &line[..idx];
        if domains.contains(['/', '*', '|', '@', '"', '!', '$']) {
            return None;
        }
        let rest = &line[idx..];
        let (kind, len) = if rest.starts_with("#@#") {
            (ContentSeparator::Exception, 3)
        } else if rest.starts_with("#?#") {
            (ContentSeparator::Emulation, 3)
        } else if rest.starts_with("#$#") {
            (ContentSeparator::Snippet, 3)
        } else if rest.starts_with("##") {
            (ContentSeparator::Hide, 2)
        } else {
            continue;
        };
        return Some((domains, kind, &rest[len..]));
    }
    None
}

fn parse_domain_list(value: &str, separator: char) -> DomainRestriction {
    let mut restriction = DomainRestriction::default();
    for domain in value.split(separator).map(str::trim).filter(|d| !d.is_empty()) {
        match domain.strip_prefix('~') {
            Some(excluded) => restriction.exclude.push(excluded.to_ascii_lowercase()),
            None => restriction.include.push(domain.to_ascii_lowercase()),
        }
    }
    restriction
}

fn parse_content_filter(
    domains: &str,
    kind: ContentSeparator,
    body: &str,
    allow_privileged: bool,
    ruleset: &mut Ruleset,
) -> Result<(), String> {
    let body = body.trim();
    if body.is_empty() {
        return Err("Empty selector".to_string());
    }
    let domains = parse_domain_list(domains, ',');

    let kind = match kind {
        ContentSeparator::Snippet => {
            if domains.is_generic() {
                return Err("Snippet filters require include domains".to_string());
            }
            if !allow_privileged {
                return Err("Snippet filters are not allowed in this list".to_string());
            }
            let script = parse_snippet_script(body);
            if script.is_empty() {
                return Err("Empty snippet script".to_string());
            }
            ruleset.snippets.push(SnippetFilter { domains, script });
            return Ok(());
        }
        ContentSeparator::Emulation => {
            if domains.is_generic() {
                return Err("Element hiding emulation requires include domains".to_string());
            }
            ContentFilterKind::ElementHidingEmulation
        }
        ContentSeparator::Exception => ContentFilterKind::ElementHidingException,
        ContentSeparator::Hide => ContentFilterKind::ElementHiding,
    };

    let (selector, style) = split_selector_style(body);
    ruleset.content_filters.push(ContentFilter {
        kind,
        selector,
        style,
        domains,
    });
    Ok(())
}

/// `.ad {remove: true;}` and `.ad {display: none !important;}`.
fn split_selector_style(body: &str) -> (String, ContentFilterStyle) {
    if body.ends_with('}') {
        if let Some(open) = body.rfind(" {") {
            let selector = body[..open].trim();
            let declaration = body[open + 2..body.len() - 1].trim();
            if !selector.is_empty() {
                let compact: String = declaration.chars().filter(|c| !c.is_whitespace()).collect();
                let style = if compact.trim_end_matches(';') == "remove:true" {
                    ContentFilterStyle::Remove
                } else {
                    ContentFilterStyle::InlineCss(declaration.to_string())
                };
                return (selector.to_string(), style);
            }
        }
    }
    (body.to_string(), ContentFilterStyle::Hide)
}

/// `cmd1 arg 'quoted arg'; cmd2 arg`.
fn parse_snippet_script(script: &str) -> Vec<SnippetCall> {
    script
        .split(';')
        .filter_map(|call| {
            let mut tokens = tokenize_snippet(call).into_iter();
            let command = tokens.next()?;
            Some(SnippetCall {
                command,
                arguments: tokens.collect(),
            })
        })
        .collect()
}

fn tokenize_snippet(call: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut escaped = false;
    let mut has_token = false;
    for c in call.chars() {
        if escaped {
            current.push(c);
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '\'' => {
                quoted = !quoted;
                has_token = true;
            }
            c if c.is_whitespace() && !quoted => {
                if has_token || !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
                has_token = false;
            }
            c => current.push(c),
        }
    }
    if has_token || !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

#[derive(Default)]
struct ParsedOptions {
    include_types: ContentType,
    exclude_types: ContentType,
    action: Option<UrlFilterAction>,
    domains: DomainRestriction,
    sitekeys: Vec<String>,
    third_party: Option<bool>,
    match_case: bool,
}

fn set_action(options: &mut ParsedOptions, action: UrlFilterAction) -> Result<(), String> {
    if options.action.is_some() {
        return Err("Conflicting filter type options".to_string());
    }
    options.action = Some(action);
    Ok(())
}

fn parse_options(
    options_text: &str,
    exception: bool,
    allow_privileged: bool,
) -> Result<ParsedOptions, String> {
    let mut options = ParsedOptions::default();
    for option in options_text.split(',').map(str::trim).filter(|o| !o.is_empty()) {
        let (name, value) = match option.split_once('=') {
            Some((name, value)) => (name.trim(), Some(value.trim())),
            None => (option, None),
        };
        let (inverse, name) = match name.strip_prefix('~') {
            Some(name) => (true, name),
            None => (false, name),
        };
        let name = name.to_ascii_lowercase();

        match (name.as_str(), value) {
            ("domain", Some(value)) => options.domains = parse_domain_list(value, '|'),
            ("sitekey", Some(value)) => {
                options.sitekeys = value.split('|').map(str::to_string).collect();
            }
            ("third-party", None) => options.third_party = Some(!inverse),
            ("match-case", None) => options.match_case = true,
            ("popup", None) => set_action(&mut options, UrlFilterAction::Popup)?,
            ("csp", value) => {
                let payload = value.unwrap_or_default();
                if payload.is_empty() && !exception {
                    return Err("Blocking $csp filters need a directive".to_string());
                }
                set_action(&mut options, UrlFilterAction::Csp(payload.to_string()))?;
            }
            ("rewrite", Some(value)) => {
                if RewriteResource::from_option_value(value).is_none() {
                    return Err(format!("Unknown rewrite resource: {value}"));
                }
                set_action(&mut options, UrlFilterAction::Rewrite(value.to_string()))?;
            }
            ("header", value) => {
                if !allow_privileged {
                    return Err("$header filters are not allowed in this list".to_string());
                }
                let payload = value.unwrap_or_default();
                if payload.is_empty() && !exception {
                    return Err("Blocking $header filters need a header".to_string());
                }
                set_action(&mut options, UrlFilterAction::Header(payload.to_string()))?;
            }
            (name, None) => {
                if let Some(special) = SpecialFilterType::from_option_name(name) {
                    if !exception {
                        return Err(format!("${name} is only valid on exception filters"));
                    }
                    set_action(&mut options, UrlFilterAction::Special(special))?;
                } else if let Some(ty) = ContentType::from_option_name(name) {
                    if inverse {
                        options.exclude_types |= ty;
                    } else {
                        options.include_types |= ty;
                    }
                } else {
                    return Err(format!("Unknown option: {name}"));
                }
            }
            (name, Some(_)) => return Err(format!("Unknown option: {name}")),
        }
    }
    Ok(options)
}

/// Splits `pattern$options`. Regex patterns (`/.../`) carry no options
/// unless a `$` follows the closing slash.
fn split_options(text: &str) -> (&str, Option<&str>) {
    if text.starts_with('/') && text.ends_with('/') && text.len() > 2 {
        return (text, None);
    }
    match text.rfind('$') {
        Some(idx) => (&text[..idx], Some(&text[idx + 1..])),
        None => (text, None),
    }
}

fn parse_url_filter(line: &str, allow_privileged: bool) -> Result<UrlFilter, String> {
    let (exception, text) = match line.strip_prefix("@@") {
        Some(rest) => (true, rest),
        None => (false, line),
    };
    let (pattern, options_text) = split_options(text);
    let options = match options_text {
        Some(options_text) => parse_options(options_text, exception, allow_privileged)?,
        None => ParsedOptions::default(),
    };

    let action = options.action.unwrap_or(UrlFilterAction::Request);
    if matches!(action, UrlFilterAction::Rewrite(_)) && options.domains.is_generic() {
        return Err("$rewrite filters require a domain restriction".to_string());
    }
    if pattern.is_empty() && options.domains.is_generic() && matches!(action, UrlFilterAction::Request) {
        return Err("Filter would match every request".to_string());
    }

    let mut content_type = if options.include_types.is_empty() {
        ContentType::DEFAULT
    } else {
        options.include_types
    };
    content_type = content_type.without(options.exclude_types);

    Ok(UrlFilter {
        text: line.to_string(),
        regex: pattern_to_regex(pattern, options.match_case),
        exception,
        action,
        content_type,
        domains: options.domains,
        sitekeys: options.sitekeys,
        third_party: options.third_party,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_ruleset() -> Ruleset {
        Ruleset::new(Url::parse("https://lists.example/list.txt").unwrap())
    }

    fn parse(line: &str) -> Ruleset {
        let mut ruleset = empty_ruleset();
        parse_filter_line(line, false, &mut ruleset).unwrap();
        ruleset
    }

    #[test]
    fn test_list_metadata() {
        let text = "[Adblock Plus 2.0]\n! Title: EasyList\n! Version: 202401011200\n! Expires: 4 days (update frequency)\n||ads.example^\n! Title: ignored";

        let metadata = parse_list_metadata(text).unwrap();

        assert_eq!(metadata.title, "EasyList");
        assert_eq!(metadata.version, "202401011200");
        assert_eq!(metadata.expires, Duration::from_secs(4 * 24 * 3600));
        assert!(metadata.redirect.is_none());
    }

    #[test]
    fn test_missing_header_is_rejected() {
        assert!(parse_list_metadata("||ads.example^").is_err());
        assert!(parse_list_metadata("").is_err());
    }

    #[test]
    fn test_expires_is_clamped() {
        assert_eq!(parse_expires("30 days"), Some(MAX_EXPIRATION));
        assert_eq!(parse_expires("0 hours"), Some(MIN_EXPIRATION));
        assert_eq!(parse_expires("6 hours"), Some(Duration::from_secs(6 * 3600)));
        assert_eq!(parse_expires("soon"), None);
    }

    #[test]
    fn test_redirect_header() {
        let metadata =
            parse_list_metadata("[Adblock Plus 2.0]\n! Redirect: https://mirror.example/list.txt")
                .unwrap();
        assert_eq!(
            metadata.redirect.unwrap().as_str(),
            "https://mirror.example/list.txt"
        );
    }

    #[test]
    fn test_url_filter_options() {
        let ruleset = parse("||ads.example^$script,image,domain=news.example|~safe.news.example,third-party");
        let filter = &ruleset.url_filters[0];

        assert!(!filter.exception);
        assert_eq!(filter.action, UrlFilterAction::Request);
        assert_eq!(filter.content_type, ContentType::SCRIPT | ContentType::IMAGE);
        assert_eq!(filter.domains.include, vec!["news.example".to_string()]);
        assert_eq!(filter.domains.exclude, vec!["safe.news.example".to_string()]);
        assert_eq!(filter.third_party, Some(true));
    }

    #[test]
    fn test_inverse_content_type() {
        let ruleset = parse("ads$~image");
        let filter = &ruleset.url_filters[0];

        assert!(!filter.content_type.intersects(ContentType::IMAGE));
        assert!(filter.content_type.intersects(ContentType::SCRIPT));
    }

    #[test]
    fn test_special_filters_require_exception() {
        let ruleset = parse("@@||example.com^$document");
        assert_eq!(
            ruleset.url_filters[0].action,
            UrlFilterAction::Special(SpecialFilterType::Document)
        );

        let mut ruleset = empty_ruleset();
        assert!(parse_filter_line("||example.com^$genericblock", false, &mut ruleset).is_err());
    }

    #[test]
    fn test_privileged_filters() {
        let mut ruleset = empty_ruleset();
        assert!(parse_filter_line("||a.example^$header=x-ad", false, &mut ruleset).is_err());
        assert!(parse_filter_line("example.com#$#log hello", false, &mut ruleset).is_err());
        assert!(parse_filter_line("||a.example^$header=x-ad", true, &mut ruleset).is_ok());
        assert!(parse_filter_line("example.com#$#log 'hello world'; trace", true, &mut ruleset).is_ok());

        assert_eq!(ruleset.snippets.len(), 1);
        assert_eq!(ruleset.snippets[0].script[0].arguments, vec!["hello world".to_string()]);
        assert_eq!(ruleset.snippets[0].script[1].command, "trace");
    }

    #[test]
    fn test_rewrite_needs_domain_and_known_resource() {
        let mut ruleset = empty_ruleset();
        assert!(parse_filter_line("||a.example/ad.js$rewrite=abp-resource:blank-js", false, &mut ruleset).is_err());
        assert!(parse_filter_line("||a.example/ad.js$rewrite=https://evil.example/,domain=b.example", false, &mut ruleset).is_err());
        assert!(parse_filter_line("||a.example/ad.js$rewrite=abp-resource:blank-js,domain=b.example", false, &mut ruleset).is_ok());
    }

    #[test]
    fn test_content_filters() {
        let mut ruleset = empty_ruleset();
        for line in [
            "##.banner",
            "example.com,~shop.example.com##.sidebar-ad",
            "example.com#@#.banner",
            "example.com#?#div:-abp-has(.ad)",
            "##.overlay {remove: true;}",
            "##.sticky {position: static !important;}",
        ] {
            parse_filter_line(line, false, &mut ruleset).unwrap();
        }

        let filters = &ruleset.content_filters;
        assert_eq!(filters.len(), 6);
        assert!(filters[0].domains.is_generic());
        assert_eq!(filters[1].domains.exclude, vec!["shop.example.com".to_string()]);
        assert_eq!(filters[2].kind, ContentFilterKind::ElementHidingException);
        assert_eq!(filters[3].kind, ContentFilterKind::ElementHidingEmulation);
        assert_eq!(filters[4].style, ContentFilterStyle::Remove);
        assert_eq!(filters[4].selector, ".overlay");
        assert_eq!(
            filters[5].style,
            ContentFilterStyle::InlineCss("position: static !important;".to_string())
        );
    }

    #[test]
    fn test_generic_emulation_is_rejected() {
        let mut ruleset = empty_ruleset();
        assert!(parse_filter_line("#?#div:-abp-has(.ad)", false, &mut ruleset).is_err());
    }

    #[test]
    fn test_url_with_fragment_is_not_a_content_filter() {
        let ruleset = parse("||example.com/page##anchor");

        assert!(ruleset.content_filters.is_empty());
        assert_eq!(ruleset.url_filters.len(), 1);
    }

    #[test]
    fn test_unknown_option_rejects_filter() {
        let mut ruleset = empty_ruleset();
        assert!(parse_filter_line("ads$nonsense", false, &mut ruleset).is_err());
        assert!(ruleset.url_filters.is_empty());
    }

    #[test]
    fn test_comments_are_skipped() {
        let ruleset = parse("! a comment");
        assert!(ruleset.url_filters.is_empty());
    }
}
