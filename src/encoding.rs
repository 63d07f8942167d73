//! Character encoding detection and transcoding.
//!
//! Byte and file input is decoded to UTF-8 before it enters the pipeline.
//! Detection order: byte order mark, `<meta>` charset declaration, UTF-8
//! validity, then the configured legacy fallback.

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

/// Match `<meta charset="...">` tag
#[allow(clippy::expect_used)]
static CHARSET_META_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta[^>]+charset\s*=\s*["']?([^"'\s>;/]+)"#).expect("valid regex")
});

/// Match `<meta http-equiv="Content-Type" content="...; charset=...">` tag
#[allow(clippy::expect_used)]
static CONTENT_TYPE_CHARSET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta[^>]+http-equiv\s*=\s*["']?content-type["']?[^>]+content\s*=\s*["']?[^"'>]*;\s*charset\s*=\s*([^"'\s>]+)"#).expect("valid regex")
});

/// Detect a charset declared in the first 1024 bytes.
///
/// Checks `<meta http-equiv="Content-Type">` first, since its `content`
/// attribute would otherwise be picked up by the plain `charset=` pattern.
#[must_use]
pub fn declared_encoding(html: &[u8]) -> Option<&'static Encoding> {
    let head = &html[..html.len().min(1024)];
    let head_str = String::from_utf8_lossy(head);

    extract_content_type_charset(&head_str)
        .or_else(|| extract_charset(&head_str))
        .and_then(|label| Encoding::for_label(label.as_bytes()))
}

/// Detect the encoding of HTML bytes.
///
/// 1. Byte order mark
/// 2. Declared charset (`<meta charset>` or `http-equiv`)
/// 3. UTF-8, when the bytes are valid UTF-8
/// 4. `fallback` (an encoding label such as `windows-1252`), or windows-1252
///    when the label is unknown
#[must_use]
pub fn detect_encoding(html: &[u8], fallback: &str) -> &'static Encoding {
    if let Some((encoding, _)) = Encoding::for_bom(html) {
        return encoding;
    }

    if let Some(encoding) = declared_encoding(html) {
        return encoding;
    }

    if std::str::from_utf8(html).is_ok() {
        return UTF_8;
    }

    Encoding::for_label(fallback.as_bytes()).unwrap_or(WINDOWS_1252)
}

/// Extract charset from `<meta charset="...">` tag.
fn extract_charset(html: &str) -> Option<String> {
    CHARSET_META_RE
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Extract charset from `<meta http-equiv="Content-Type" content="...; charset=...">` tag.
fn extract_content_type_charset(html: &str) -> Option<String> {
    CONTENT_TYPE_CHARSET_RE
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Transcode HTML bytes to a UTF-8 string.
///
/// Invalid sequences are replaced with U+FFFD. A leading byte order mark is
/// removed.
///
/// # Examples
///
/// ```
/// use domwright::encoding::transcode_to_utf8;
///
/// let html = b"<p>Caf\xE9</p>";
/// assert_eq!(transcode_to_utf8(html, "windows-1252"), "<p>Caf\u{e9}</p>");
/// ```
#[must_use]
pub fn transcode_to_utf8(html: &[u8], fallback: &str) -> String {
    let encoding = detect_encoding(html, fallback);
    let (decoded, used, had_errors) = encoding.decode(html);

    if used != UTF_8 || had_errors {
        debug!(encoding = used.name(), had_errors, "transcoded input to UTF-8");
    }

    decoded.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_utf8_from_meta_charset() {
        let html = br#"<html><head><meta charset="utf-8"></head><body>Test</body></html>"#;
        assert_eq!(detect_encoding(html, "windows-1252"), UTF_8);
    }

    #[test]
    fn detect_iso88591_from_meta_charset() {
        let html = br#"<html><head><meta charset="ISO-8859-1"></head><body>Test</body></html>"#;
        // encoding_rs maps ISO-8859-1 to windows-1252 per WHATWG
        assert_eq!(detect_encoding(html, "utf-8").name(), "windows-1252");
    }

    #[test]
    fn detect_charset_from_content_type() {
        let html = br#"<meta http-equiv="Content-Type" content="text/html; charset=ISO-8859-2">"#;
        assert_eq!(detect_encoding(html, "utf-8").name(), "ISO-8859-2");
    }

    #[test]
    fn bom_wins_over_declaration() {
        let html = b"\xEF\xBB\xBF<meta charset=\"windows-1252\"><p>x</p>";
        assert_eq!(detect_encoding(html, "windows-1252"), UTF_8);
        assert_eq!(transcode_to_utf8(html, "windows-1252"), "<meta charset=\"windows-1252\"><p>x</p>");
    }

    #[test]
    fn valid_utf8_without_declaration() {
        let html = "<p>Grüße</p>".as_bytes();
        assert_eq!(detect_encoding(html, "windows-1252"), UTF_8);
    }

    #[test]
    fn undeclared_legacy_bytes_use_fallback() {
        let html = b"<p>Gr\xFC\xDFe \x93x\x94</p>";
        assert_eq!(detect_encoding(html, "windows-1252").name(), "windows-1252");
        assert_eq!(transcode_to_utf8(html, "windows-1252"), "<p>Grüße \u{201C}x\u{201D}</p>");
    }

    #[test]
    fn unknown_fallback_label_uses_windows1252() {
        let html = b"<p>Caf\xE9</p>";
        assert_eq!(detect_encoding(html, "no-such-charset"), WINDOWS_1252);
    }

    #[test]
    fn extract_charset_case_insensitive() {
        let html = "<HTML><HEAD><META CHARSET=\"UTF-8\"></HEAD></HTML>";
        assert_eq!(extract_charset(html), Some("UTF-8".to_string()));
    }

    #[test]
    fn extract_charset_without_quotes() {
        assert_eq!(extract_charset("<meta charset=utf-8>"), Some("utf-8".to_string()));
    }

    #[test]
    fn extract_content_type_charset_case_insensitive() {
        let html = r#"<META HTTP-EQUIV="content-type" CONTENT="text/html; CHARSET=UTF-8">"#;
        assert_eq!(extract_content_type_charset(html), Some("UTF-8".to_string()));
    }
}
