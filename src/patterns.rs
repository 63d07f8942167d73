//! Compiled regex patterns shared by the guard, normalizer and serializer.
//!
//! All patterns are compiled once at first use via `LazyLock`.

#![allow(clippy::expect_used)]

use std::sync::LazyLock;

use regex::Regex;

// =============================================================================
// Guard Patterns
// =============================================================================

/// Matches an `http(s)://` run, optionally opened by `[`.
///
/// The run ends on a non-punctuation character, `/`, `}` or `]`, so trailing
/// sentence punctuation and closing quotes stay outside the span while
/// `{{placeholder}}` and `[[placeholder]]` tails stay inside.
pub static URL_SPAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\[?\bhttps?://[^\s()<>]+(?:\([\w\d]+\)|[^[:punct:]\s]|/|\}|\])")
        .expect("URL_SPAN regex")
});

/// Matches a guard sentinel and captures its name (`amp`, `square_bracket_left`).
///
/// Name segments are separated by single underscores so two adjacent
/// sentinels never merge into one match.
pub static GUARD_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"____domwright_guard_([a-z]+(?:_[a-z]+)*)____").expect("GUARD_TOKEN regex")
});

// =============================================================================
// Normalizer Patterns
// =============================================================================

/// Matches a fence token and captures its slot number.
pub static FENCE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"____domwright_fence_(\d+)____").expect("FENCE_TOKEN regex")
});

/// Matches `type` values that declare non-markup template content.
pub static TEMPLATE_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*text/(?:html|template|x-[a-z0-9._-]+)\s*$").expect("TEMPLATE_TYPE regex")
});

/// Matches the keyword part of a doctype declaration (`<!doctype`, `<!DocType`).
pub static DOCTYPE_KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^<!doctype").expect("DOCTYPE_KEYWORD regex"));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_span_stops_before_closing_quote() {
        let text = r#"<a href="http://foobar.de[[foo]]&{{foobar}}&lall=1">foo</a>"#;
        let m = URL_SPAN.find(text).unwrap();
        assert_eq!(m.as_str(), "http://foobar.de[[foo]]&{{foobar}}&lall=1");
    }

    #[test]
    fn url_span_includes_leading_bracket() {
        let m = URL_SPAN.find("see [https://example.org/x#bar] now").unwrap();
        assert_eq!(m.as_str(), "[https://example.org/x#bar]");
    }

    #[test]
    fn url_span_ignores_plain_text() {
        assert!(URL_SPAN.find("www.domain.de/foo.php?a=1&b=2").is_none());
    }

    #[test]
    fn guard_token_does_not_merge_neighbours() {
        let text = "____domwright_guard_amp________domwright_guard_at____";
        let names: Vec<_> = GUARD_TOKEN
            .captures_iter(text)
            .map(|c| c[1].to_string())
            .collect();
        assert_eq!(names, vec!["amp", "at"]);
    }

    #[test]
    fn template_type_matches_only_templates() {
        assert!(TEMPLATE_TYPE.is_match("text/html"));
        assert!(TEMPLATE_TYPE.is_match("text/x-handlebars-template"));
        assert!(!TEMPLATE_TYPE.is_match("text/javascript"));
        assert!(!TEMPLATE_TYPE.is_match("application/ld+json"));
    }
}
