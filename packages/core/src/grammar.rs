//! Token-level grammar shared by the agents.txt and ai.txt text forms.
//!
//! Everything here is line- or token-scoped and knows nothing about blocks:
//! the line scanner, the output sanitizer, and the small value grammars
//! (`N/window` rate limits, `Param` descriptors, comma lists).

use std::sync::LazyLock;

use regex::Regex;

use crate::types::{Location, ParameterDef, RateLimit, Window};

/// Upper bound applied to every free-text value on output.
pub const MAX_FIELD_LEN: usize = 1000;

/// HTTP verbs recognised without a warning.
pub const HTTP_METHODS: &[&str] = &["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS"];

// --- line scanner ------------------------------------------------------------

/// What a single physical line contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind<'a> {
    Blank,
    /// Text after the leading `#`, trimmed.
    Comment(&'a str),
    /// `Key: Value`, split at the first colon, both sides trimmed.
    Field {
        key: &'a str,
        value: &'a str,
        indented: bool,
    },
    /// Non-blank line with no colon.
    Malformed { text: &'a str, indented: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line<'a> {
    /// 1-based.
    pub number: usize,
    pub kind: LineKind<'a>,
}

/// Split `input` on `\r?\n` and classify each line.
pub fn scan_lines(input: &str) -> impl Iterator<Item = Line<'_>> {
    input.split('\n').enumerate().map(|(i, raw)| {
        let raw = raw.strip_suffix('\r').unwrap_or(raw);
        Line {
            number: i + 1,
            kind: classify(raw),
        }
    })
}

fn classify(raw: &str) -> LineKind<'_> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return LineKind::Blank;
    }
    if let Some(comment) = trimmed.strip_prefix('#') {
        return LineKind::Comment(comment.trim());
    }
    let indented = is_indented(raw);
    match trimmed.split_once(':') {
        Some((key, value)) => LineKind::Field {
            key: key.trim(),
            value: value.trim(),
            indented,
        },
        None => LineKind::Malformed {
            text: trimmed,
            indented,
        },
    }
}

/// Two or more leading spaces, or one or more leading tabs.
pub fn is_indented(raw: &str) -> bool {
    raw.starts_with("  ") || raw.starts_with('\t')
}

/// Recognise the `# Generated: <timestamp>` header comment.
pub fn generated_comment(comment: &str) -> Option<&str> {
    let (key, value) = comment.split_once(':')?;
    if key.trim().eq_ignore_ascii_case("generated") && !value.trim().is_empty() {
        Some(value.trim())
    } else {
        None
    }
}

// --- sanitizer ---------------------------------------------------------------

/// Make a free-text value safe to emit on a single manifest line.
///
/// CR and LF each become one space, every other ASCII control character is
/// dropped, the result is trimmed and cut to `max_len` characters. A
/// sanitized value can never start a new line when re-parsed.
pub fn sanitize_value(s: &str, max_len: usize) -> String {
    let cleaned: String = s
        .chars()
        .filter_map(|c| match c {
            '\r' | '\n' => Some(' '),
            c if c.is_ascii_control() => None,
            c => Some(c),
        })
        .collect();
    let truncated: String = cleaned.trim().chars().take(max_len).collect();
    truncated.trim_end().to_string()
}

/// Reduce a metadata key to `[A-Za-z0-9._-]`, so it cannot contain the
/// key/value separator or whitespace.
pub fn sanitize_key(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        .take(100)
        .collect()
}

// --- value grammars ----------------------------------------------------------

/// `^(\d+)/(second|minute|hour|day)$`
static RATE_LIMIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)/(second|minute|hour|day)$").expect("invalid rate-limit regex")
});

/// `name (location, type[, required]) [— description]`, with `--` accepted
/// in place of the em-dash. The type may contain spaces (`array of string`)
/// but not commas or parentheses.
static PARAM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<name>[A-Za-z0-9_][A-Za-z0-9_.\-]*)\s*\(\s*(?P<loc>[A-Za-z]+)\s*,\s*(?P<ty>[^,()\s](?:[^,()]*[^,()\s])?)\s*(?:,\s*(?P<req>required|optional)\s*)?\)\s*(?:(?:—|--)\s*(?P<desc>.*))?$",
    )
    .expect("invalid param regex")
});

/// `^[a-z0-9][a-z0-9-]*$`
static CAPABILITY_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9][a-z0-9-]*$").expect("invalid capability id regex")
});

/// `^\d+\.\d+$`
static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\d+$").expect("invalid version regex"));

/// Parse `<N>/<window>` with a strictly positive `N`.
pub fn parse_rate_limit(s: &str) -> Result<RateLimit, String> {
    let caps = RATE_LIMIT_RE
        .captures(s)
        .ok_or_else(|| format!("rate limit {s:?} must look like <N>/second|minute|hour|day"))?;
    let requests: u32 = caps[1]
        .parse()
        .map_err(|_| format!("rate limit count in {s:?} is out of range"))?;
    if requests == 0 {
        return Err(format!("rate limit {s:?} must allow at least one request"));
    }
    let window: Window = caps[2].parse()?;
    Ok(RateLimit::new(requests, window))
}

/// Parse a `Param` descriptor.
///
/// ```text
/// q (query, string, required) — Search terms
/// since (query, date-time) -- Lower bound
/// content-type (header, string)
/// ```
pub fn parse_param(s: &str) -> Result<ParameterDef, String> {
    let caps = PARAM_RE.captures(s).ok_or_else(|| {
        format!("param {s:?} must look like: name (location, type[, required]) [— description]")
    })?;
    let location: Location = caps["loc"].to_ascii_lowercase().parse()?;
    let description = caps
        .name("desc")
        .map(|m| m.as_str().trim())
        .filter(|d| !d.is_empty())
        .map(str::to_string);
    Ok(ParameterDef {
        name: caps["name"].to_string(),
        location,
        param_type: caps["ty"].to_string(),
        required: caps.name("req").is_some_and(|m| m.as_str() == "required"),
        description,
        min: None,
        max: None,
    })
}

/// Format a parameter back into its descriptor form.
pub fn format_param(p: &ParameterDef) -> String {
    let mut out = format!(
        "{} ({}, {}",
        sanitize_value(&p.name, MAX_FIELD_LEN),
        p.location,
        param_type(&p.param_type)
    );
    if p.required {
        out.push_str(", required");
    }
    out.push(')');
    if let Some(desc) = &p.description {
        let desc = sanitize_value(desc, MAX_FIELD_LEN);
        if !desc.is_empty() {
            out.push_str(" — ");
            out.push_str(&desc);
        }
    }
    out
}

/// The descriptor delimiters can't appear inside a type; the schema rejects
/// them in JSON, this covers documents built in code.
fn param_type(ty: &str) -> String {
    sanitize_value(ty, MAX_FIELD_LEN)
        .chars()
        .filter(|c| !matches!(c, ',' | '(' | ')'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Split a comma-separated list, trimming items and dropping empties.
pub fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn is_valid_capability_id(id: &str) -> bool {
    CAPABILITY_ID_RE.is_match(id)
}

pub fn is_valid_version(v: &str) -> bool {
    VERSION_RE.is_match(v)
}

pub fn is_known_method(m: &str) -> bool {
    HTTP_METHODS.contains(&m)
}

/// An absolute URL with a host (`https://x`, `wss://x`; not `mailto:x`).
pub fn is_absolute_url(s: &str) -> bool {
    url::Url::parse(s).is_ok_and(|u| u.has_host())
}

/// A parseable URL whose scheme is neither `https` nor `wss`.
pub fn is_insecure_url(s: &str) -> bool {
    url::Url::parse(s).is_ok_and(|u| !matches!(u.scheme(), "https" | "wss"))
}

pub fn is_valid_timestamp(s: &str) -> bool {
    chrono::DateTime::parse_from_rfc3339(s).is_ok()
}

// --- tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scanner_accepts_crlf_and_lf() {
        let lines: Vec<_> = scan_lines("A: 1\r\nB: 2\n").collect();
        assert_eq!(
            lines[0].kind,
            LineKind::Field {
                key: "A",
                value: "1",
                indented: false
            }
        );
        assert_eq!(
            lines[1].kind,
            LineKind::Field {
                key: "B",
                value: "2",
                indented: false
            }
        );
        assert_eq!(lines[2].kind, LineKind::Blank);
    }

    #[test]
    fn scanner_splits_at_first_colon() {
        let line = scan_lines("Site-URL: https://example.com:8443/x").next().unwrap();
        assert_eq!(
            line.kind,
            LineKind::Field {
                key: "Site-URL",
                value: "https://example.com:8443/x",
                indented: false
            }
        );
    }

    #[test]
    fn indentation_rules() {
        assert!(is_indented("  Endpoint: x"));
        assert!(is_indented("\tEndpoint: x"));
        assert!(!is_indented(" Endpoint: x"));
        assert!(!is_indented("Endpoint: x"));
    }

    #[test]
    fn comments_and_malformed_lines() {
        let kinds: Vec<_> = scan_lines("# hello\nno colon here").map(|l| l.kind).collect();
        assert_eq!(kinds[0], LineKind::Comment("hello"));
        assert_eq!(
            kinds[1],
            LineKind::Malformed {
                text: "no colon here",
                indented: false
            }
        );
    }

    #[test]
    fn generated_header() {
        assert_eq!(
            generated_comment("Generated: 2026-01-01T00:00:00Z"),
            Some("2026-01-01T00:00:00Z")
        );
        assert_eq!(generated_comment("agents.txt"), None);
    }

    #[test]
    fn sanitize_strips_newlines_and_controls() {
        assert_eq!(
            sanitize_value("Evil\nSite-URL: https://x", 100),
            "Evil Site-URL: https://x"
        );
        assert_eq!(sanitize_value("  a\r\nb\u{0007}c\u{7f} ", 100), "a  bc");
        assert_eq!(sanitize_value("abcdef", 3), "abc");
        assert_eq!(sanitize_value("héllo", 2), "hé");
    }

    #[test]
    fn sanitize_key_keeps_token_chars() {
        assert_eq!(sanitize_key("X-Owner: evil\n"), "X-Ownerevil");
    }

    #[test]
    fn rate_limit_grammar() {
        assert_eq!(
            parse_rate_limit("100/minute"),
            Ok(RateLimit::new(100, Window::Minute))
        );
        assert!(parse_rate_limit("0/minute").is_err());
        assert!(parse_rate_limit("10/week").is_err());
        assert!(parse_rate_limit("ten/minute").is_err());
        assert!(parse_rate_limit("99999999999/day").is_err());
        assert!(parse_rate_limit("10 / minute").is_err());
    }

    #[test]
    fn param_with_em_dash_description() {
        let p = parse_param("q (query, string, required) — Search terms").unwrap();
        assert_eq!(p.name, "q");
        assert_eq!(p.location, Location::Query);
        assert_eq!(p.param_type, "string");
        assert!(p.required);
        assert_eq!(p.description.as_deref(), Some("Search terms"));
    }

    #[test]
    fn param_with_double_hyphen_and_hyphenated_tokens() {
        let p = parse_param("content-type (header, date-time) -- When it changed").unwrap();
        assert_eq!(p.name, "content-type");
        assert_eq!(p.location, Location::Header);
        assert_eq!(p.param_type, "date-time");
        assert!(!p.required);
        assert_eq!(p.description.as_deref(), Some("When it changed"));
    }

    #[test]
    fn param_without_description() {
        let p = parse_param("id (path, integer, required)").unwrap();
        assert_eq!(p.location, Location::Path);
        assert!(p.description.is_none());
    }

    #[test]
    fn param_rejects_bad_location_and_shape() {
        assert!(parse_param("q (cookie, string)").is_err());
        assert!(parse_param("q query string").is_err());
    }

    #[test]
    fn param_format_round_trips() {
        let src = "limit (query, integer, required) — Max results";
        let p = parse_param(src).unwrap();
        assert_eq!(format_param(&p), src);
        assert_eq!(parse_param(&format_param(&p)).unwrap(), p);
    }

    #[test]
    fn param_type_may_contain_spaces() {
        let p = parse_param("tags (body, array of string, required) -- Labels").unwrap();
        assert_eq!(p.param_type, "array of string");
        assert!(p.required);
        assert_eq!(p.description.as_deref(), Some("Labels"));

        let p = parse_param("ids (query,  list of id  )").unwrap();
        assert_eq!(p.param_type, "list of id");
        assert!(!p.required);
    }

    #[test]
    fn param_format_drops_descriptor_delimiters_from_type() {
        let mut p = parse_param("q (query, string)").unwrap();
        p.param_type = "map(string, int)".to_string();
        let line = format_param(&p);
        assert_eq!(line, "q (query, mapstring int)");
        assert_eq!(parse_param(&line).unwrap().param_type, "mapstring int");
    }

    #[test]
    fn list_splitting() {
        assert_eq!(split_list(" a, b ,,c "), vec!["a", "b", "c"]);
        assert!(split_list("").is_empty());
    }

    #[test]
    fn url_helpers() {
        assert!(is_absolute_url("https://example.com/api"));
        assert!(is_absolute_url("wss://example.com/socket"));
        assert!(!is_absolute_url("/relative/path"));
        assert!(!is_absolute_url("mailto:ops@example.com"));
        assert!(is_insecure_url("http://example.com"));
        assert!(!is_insecure_url("https://example.com"));
        assert!(!is_insecure_url("wss://example.com"));
        assert!(is_insecure_url("ws://example.com"));
    }

    #[test]
    fn id_and_version_patterns() {
        assert!(is_valid_capability_id("search-v2"));
        assert!(!is_valid_capability_id("-search"));
        assert!(!is_valid_capability_id("Search"));
        assert!(is_valid_version("1.0"));
        assert!(!is_valid_version("1"));
    }
}
