//! Entity/Token Guard
//!
//! Reversible sentinel substitution run on raw input before the tree engine
//! sees it, and on serialized output before it reaches the caller.
//!
//! html5ever treats `&` as the start of a character reference and re-escapes
//! it on output, which rewrites URL query strings (`?a=1&b=2`) and entity
//! text the caller wanted kept verbatim. Hiding the fragile characters behind
//! plain-word sentinels keeps them out of the engine's reach entirely.
//!
//! The table is fixed and immutable. Sentinels use only lowercase ASCII and
//! underscores, so name lowercasing in the engine leaves them intact.

use crate::patterns::{GUARD_TOKEN, URL_SPAN};

/// Sentinel table entry.
struct Guarded {
    ch: char,
    name: &'static str,
    token: &'static str,
}

macro_rules! guarded {
    ($ch:literal, $name:literal) => {
        Guarded {
            ch: $ch,
            name: $name,
            token: concat!("____domwright_guard_", $name, "____"),
        }
    };
}

/// Characters replaced everywhere.
static BASE: [Guarded; 5] = [
    guarded!('&', "amp"),
    guarded!('|', "pipe"),
    guarded!('+', "plus"),
    guarded!('%', "percent"),
    guarded!('@', "at"),
];

/// Characters replaced only inside URL spans.
static URL_ONLY: [Guarded; 4] = [
    guarded!('[', "square_bracket_left"),
    guarded!(']', "square_bracket_right"),
    guarded!('{', "bracket_left"),
    guarded!('}', "bracket_right"),
];

/// Characters replaced only in text content, by the normalizer.
///
/// [`encode`] never produces these; [`decode`] restores them.
static TEXT_ONLY: [Guarded; 2] = [guarded!('<', "lt"), guarded!('>', "gt")];

fn token_for(ch: char, in_url: bool) -> Option<&'static str> {
    let hit = BASE.iter().find(|g| g.ch == ch).or_else(|| {
        if in_url {
            URL_ONLY.iter().find(|g| g.ch == ch)
        } else {
            None
        }
    });
    hit.map(|g| g.token)
}

fn char_for(name: &str) -> Option<char> {
    BASE.iter()
        .chain(URL_ONLY.iter())
        .chain(TEXT_ONLY.iter())
        .find(|g| g.name == name)
        .map(|g| g.ch)
}

/// Returns the sentinel for a guarded character, if it has one.
///
/// URL-only characters (`[ ] { }`) are reported as well.
#[must_use]
pub fn sentinel(ch: char) -> Option<&'static str> {
    token_for(ch, true)
}

/// Replaces every guarded character with its sentinel.
///
/// `& | + % @` are replaced everywhere; `[ ] { }` only inside `http(s)://`
/// spans. Everything else is copied unchanged.
///
/// # Example
///
/// ```rust
/// use domwright::guard;
///
/// let encoded = guard::encode("a=1&b=2");
/// assert!(!encoded.contains('&'));
/// assert_eq!(guard::decode(&encoded), "a=1&b=2");
/// ```
#[must_use]
pub fn encode(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 4);
    let mut last = 0;

    for span in URL_SPAN.find_iter(text) {
        push_encoded(&mut out, &text[last..span.start()], false);
        push_encoded(&mut out, span.as_str(), true);
        last = span.end();
    }
    push_encoded(&mut out, &text[last..], false);

    out
}

fn push_encoded(out: &mut String, text: &str, in_url: bool) {
    for ch in text.chars() {
        match token_for(ch, in_url) {
            Some(token) => out.push_str(token),
            None => out.push(ch),
        }
    }
}

/// Replaces `<` and `>` in a run of text content with sentinels.
///
/// The engine then never sees them, so it cannot escape them on output.
/// Only for text between tags: markup passed through here stops being markup.
#[must_use]
pub fn encode_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match TEXT_ONLY.iter().find(|g| g.ch == ch) {
            Some(g) => out.push_str(g.token),
            None => out.push(ch),
        }
    }
    out
}

/// Turns the sentinels of [`encode_text`] into `&lt;` and `&gt;`.
///
/// For output that has to stay well-formed XML.
#[must_use]
pub fn escape_text(text: &str) -> String {
    TEXT_ONLY.iter().fold(text.to_string(), |acc, g| {
        let entity = if g.ch == '<' { "&lt;" } else { "&gt;" };
        acc.replace(g.token, entity)
    })
}

/// Restores every sentinel produced by [`encode`] and [`encode_text`].
///
/// Sentinel-shaped text with an unknown name is left as is.
#[must_use]
pub fn decode(text: &str) -> String {
    if !text.contains("____domwright_guard_") {
        return text.to_string();
    }

    GUARD_TOKEN
        .replace_all(text, |caps: &regex::Captures| match char_for(&caps[1]) {
            Some(ch) => ch.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_untouched() {
        for text in ["", " ", "abc", "öäü", "`?/=()=$\"?#![{`", "{{foo}}"] {
            assert_eq!(encode(text), text);
        }
    }

    #[test]
    fn test_base_set_encoded() {
        let encoded = encode("`?/=()=$&,|,+,%\"?#![{@`");
        assert_eq!(
            encoded,
            "`?/=()=$____domwright_guard_amp____,____domwright_guard_pipe____,\
             ____domwright_guard_plus____,____domwright_guard_percent____\"?#![{\
             ____domwright_guard_at____`"
        );
    }

    #[test]
    fn test_brackets_encoded_only_in_urls() {
        let outside = encode("x&{{foo}}");
        assert!(outside.contains("{{foo}}"));

        let inside = encode("https://a.de/?x=1&{{foo}}#foo");
        assert!(!inside.contains('{'));
        assert!(inside.contains("____domwright_guard_bracket_left________domwright_guard_bracket_left____foo"));
        assert!(inside.ends_with("#foo"));
    }

    #[test]
    fn test_sentinels_are_distinct() {
        let all: Vec<_> = BASE
            .iter()
            .chain(URL_ONLY.iter())
            .chain(TEXT_ONLY.iter())
            .map(|g| g.token)
            .collect();
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert!(!a.contains(b) && !b.contains(a), "{a} overlaps {b}");
            }
        }
    }

    #[test]
    fn test_sentinels_survive_lowercasing() {
        for g in BASE.iter().chain(URL_ONLY.iter()).chain(TEXT_ONLY.iter()) {
            assert_eq!(g.token, g.token.to_lowercase());
        }
    }

    #[test]
    fn test_decode_leaves_unknown_names() {
        let text = "____domwright_guard_nope____";
        assert_eq!(decode(text), text);
    }

    #[test]
    fn test_sentinel_lookup() {
        assert_eq!(sentinel('&'), Some("____domwright_guard_amp____"));
        assert_eq!(sentinel('{'), Some("____domwright_guard_bracket_left____"));
        assert_eq!(sentinel('a'), None);
    }

    #[test]
    fn test_text_brackets_only_from_encode_text() {
        assert_eq!(encode("a < b > c"), "a < b > c");

        let encoded = encode_text("a < b > c");
        assert_eq!(
            encoded,
            "a ____domwright_guard_lt____ b ____domwright_guard_gt____ c"
        );
        assert_eq!(decode(&encoded), "a < b > c");
        assert_eq!(escape_text(&encoded), "a &lt; b &gt; c");
    }
}
