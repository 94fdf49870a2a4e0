//! Shared sanitization and filtering primitives used by every source
//! adapter. Every function here fails closed: malformed input degrades to
//! an empty/neutral value, never an error.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static SCRIPT_STYLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</(script|style)>").unwrap());
static TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)</?([a-zA-Z][a-zA-Z0-9]*)\b[^>]*>").unwrap());
static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static NUMERIC_ENTITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&#([xX][0-9a-fA-F]+|[0-9]+);").unwrap());

/// Titles that indicate placeholder/test entries rather than real events.
const DEFAULT_SKIP_TITLES: &[&str] = &[
    "tba",
    "tbd",
    "test",
    "test event",
    "placeholder",
    "private event",
    "cancelled",
    "canceled",
    "postponed",
];

fn decode_entities(text: &str) -> String {
    let numeric = NUMERIC_ENTITY_RE.replace_all(text, |caps: &Captures| {
        let body = &caps[1];
        let code = if let Some(hex_part) = body.strip_prefix('x').or_else(|| body.strip_prefix('X'))
        {
            u32::from_str_radix(hex_part, 16).ok()
        } else {
            body.parse::<u32>().ok()
        };
        code.and_then(char::from_u32)
            .map(|c| c.to_string())
            .unwrap_or_default()
    });
    numeric
        .replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Trims, strips markup and collapses whitespace. Empty in, empty out.
pub fn sanitize_text(text: &str) -> String {
    if text.trim().is_empty() {
        return String::new();
    }
    let without_blocks = SCRIPT_STYLE_RE.replace_all(text, "");
    let without_tags = TAG_RE.replace_all(&without_blocks, " ");
    let decoded = decode_entities(&without_tags);
    let printable: String = decoded
        .chars()
        .filter(|c| !c.is_control() || *c == '\n')
        .collect();
    WS_RE.replace_all(printable.trim(), " ").to_string()
}

/// Trims and validates a URL; a bare host gets an `https://` prefix. Returns
/// an empty string when the result is not a valid http(s) URL, so malformed
/// URLs never travel downstream.
pub fn sanitize_url(url: &str) -> String {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };
    match reqwest::Url::parse(&candidate) {
        Ok(parsed)
            if (parsed.scheme() == "http" || parsed.scheme() == "https")
                && parsed.host_str().is_some() =>
        {
            candidate
        }
        _ => String::new(),
    }
}

/// Decodes entities and strips all tags except a small safelist
/// (`a`, `br`, `p`).
pub fn clean_html(html: &str) -> String {
    if html.trim().is_empty() {
        return String::new();
    }
    let without_blocks = SCRIPT_STYLE_RE.replace_all(html, "");
    let kept = TAG_RE.replace_all(&without_blocks, |caps: &Captures| {
        let name = caps[1].to_ascii_lowercase();
        if matches!(name.as_str(), "a" | "br" | "p") {
            caps[0].to_string()
        } else {
            String::new()
        }
    });
    decode_entities(kept.trim())
}

/// Parses `"lat,lng"`. The single validation gate for all coordinate input:
/// exactly two comma-separated numeric tokens, lat in [-90,90],
/// lng in [-180,180].
pub fn parse_coordinates(location: &str) -> Option<(f64, f64)> {
    let tokens: Vec<&str> = location.split(',').map(str::trim).collect();
    if tokens.len() != 2 {
        return None;
    }
    let lat: f64 = tokens[0].parse().ok()?;
    let lng: f64 = tokens[1].parse().ok()?;
    if !lat.is_finite() || !lng.is_finite() {
        return None;
    }
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        return None;
    }
    Some((lat, lng))
}

fn parse_keywords(csv: &str) -> Vec<String> {
    csv.split(',')
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}

/// Include filter: an empty list passes everything, otherwise the text must
/// contain at least one keyword (case-insensitive OR).
pub fn keyword_match(text: &str, include_csv: &str) -> bool {
    let keywords = parse_keywords(include_csv);
    if keywords.is_empty() {
        return true;
    }
    let haystack = text.to_lowercase();
    keywords.iter().any(|k| haystack.contains(k.as_str()))
}

/// Exclude filter: returns true (= should be excluded) when the text
/// contains any listed keyword.
pub fn keyword_excluded(text: &str, exclude_csv: &str) -> bool {
    let keywords = parse_keywords(exclude_csv);
    let haystack = text.to_lowercase();
    keywords.iter().any(|k| haystack.contains(k.as_str()))
}

/// Whether the event date falls strictly before today. Events today are
/// retained; unparseable or missing dates are retained as well.
pub fn is_past_event(start_date: &str, today: NaiveDate) -> bool {
    match NaiveDate::parse_from_str(start_date.trim(), "%Y-%m-%d") {
        Ok(date) => date < today,
        Err(_) => false,
    }
}

/// Whether the title matches the placeholder/test skip-list.
pub fn is_skip_title(title: &str, extra: &[String]) -> bool {
    let normalized = title.trim().to_lowercase();
    DEFAULT_SKIP_TITLES.iter().any(|s| *s == normalized)
        || extra.iter().any(|s| s.trim().to_lowercase() == normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_text_strips_markup_and_entities() {
        assert_eq!(
            sanitize_text("  <b>Jazz &amp; Blues</b>\n Night  "),
            "Jazz & Blues Night"
        );
        assert_eq!(sanitize_text(""), "");
        assert_eq!(sanitize_text("   "), "");
    }

    #[test]
    fn sanitize_url_prefixes_scheme_and_fails_closed() {
        assert_eq!(
            sanitize_url("example.com/tickets"),
            "https://example.com/tickets"
        );
        assert_eq!(
            sanitize_url(" https://example.com/a "),
            "https://example.com/a"
        );
        assert_eq!(sanitize_url("not a url"), "");
        assert_eq!(sanitize_url("ftp://example.com"), "");
        assert_eq!(sanitize_url(""), "");
    }

    #[test]
    fn clean_html_keeps_safelist_only() {
        let cleaned = clean_html("<div><p>Doors at 8</p><script>bad()</script><a href=\"x\">more</a></div>");
        assert_eq!(cleaned, "<p>Doors at 8</p><a href=\"x\">more</a>");
    }

    #[test]
    fn coordinates_validate_range_and_shape() {
        assert_eq!(parse_coordinates("45.0,-122.5"), Some((45.0, -122.5)));
        assert_eq!(parse_coordinates(" 47.6 , -122.3 "), Some((47.6, -122.3)));
        assert!(parse_coordinates("91,0").is_none());
        assert!(parse_coordinates("0,181").is_none());
        assert!(parse_coordinates("47.6").is_none());
        assert!(parse_coordinates("47.6,-122.3,10").is_none());
        assert!(parse_coordinates("abc,def").is_none());
        assert!(parse_coordinates("nan,0").is_none());
    }

    #[test]
    fn include_filter_or_semantics() {
        assert!(keyword_match("Jazz night downtown", ""));
        assert!(keyword_match("Jazz night downtown", "jazz, blues"));
        assert!(keyword_match("BLUES brunch", "jazz, blues"));
        assert!(!keyword_match("Metal show", "jazz, blues"));
    }

    #[test]
    fn exclude_filter_matches_any_keyword() {
        assert!(!keyword_excluded("Jazz night", ""));
        assert!(keyword_excluded("Jazz Karaoke night", "karaoke"));
        assert!(!keyword_excluded("Jazz night", "karaoke, trivia"));
    }

    #[test]
    fn past_event_boundary_is_inclusive_of_today() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        assert!(is_past_event("2026-03-09", today));
        assert!(!is_past_event("2026-03-10", today));
        assert!(!is_past_event("2026-03-11", today));
        assert!(!is_past_event("", today));
        assert!(!is_past_event("not-a-date", today));
    }

    #[test]
    fn skip_titles_match_builtin_and_configured() {
        assert!(is_skip_title("TBA", &[]));
        assert!(is_skip_title("  Test Event ", &[]));
        assert!(!is_skip_title("Real Show", &[]));
        assert!(is_skip_title("Weekly Hold", &["weekly hold".to_string()]));
    }
}
