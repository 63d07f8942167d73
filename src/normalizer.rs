//! Markup Normalizer
//!
//! A single forward pass over guard-encoded markup that runs before the text
//! reaches html5ever. It does three things:
//!
//! - **Canonicalizes start tags**: collapses stray whitespace, quotes
//!   attribute values, drops the self-closing slash on void elements and
//!   gives bare attributes (`<div ui-view>`) a boolean sentinel value so they
//!   can be rendered bare again after serialization.
//! - **Fences opaque content**: the bodies of `script`, `style` and
//!   template-typed elements are moved into a [`FenceTable`] and replaced by
//!   a numbered token, so the engine never re-enters them as markup.
//! - **Repairs broken tags**: orphan closing tags, start tags cut short by a
//!   stray `<`, and incomplete trailing tags are dropped, or fenced verbatim
//!   when [`Options::keep_broken_html`] is set.
//!
//! `<` and `>` in text content are swapped for guard sentinels, so the
//! engine has nothing to escape there. Comments, doctypes and processing
//! instructions are copied untouched.

use tracing::trace;

use crate::dom::is_void_tag;
use crate::guard;
use crate::options::Options;
use crate::patterns::{DOCTYPE_KEYWORD, FENCE_TOKEN, TEMPLATE_TYPE};

/// Value given to attributes written without one.
///
/// Serialization turns `name="____domwright_boolean____"` back into `name`.
pub const BOOLEAN_VALUE: &str = "____domwright_boolean____";

/// Elements whose content is always opaque.
const RAW_TEXT_TAGS: &[&str] = &["script", "style"];

// === Fence Table ===

/// Per-document store of opaque text fragments.
///
/// Each fragment is replaced in the markup by `____domwright_fence_N____`,
/// where `N` is its slot. Released slots are handed out again.
#[derive(Debug, Default, Clone)]
pub struct FenceTable {
    slots: Vec<Option<String>>,
    free: Vec<usize>,
}

impl FenceTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `content` and returns the token that stands in for it.
    pub fn fence(&mut self, content: &str) -> String {
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(content.to_string());
                slot
            }
            None => {
                self.slots.push(Some(content.to_string()));
                self.slots.len() - 1
            }
        };
        format!("____domwright_fence_{slot}____")
    }

    /// Replaces every fence token in `text` with its stored content.
    #[must_use]
    pub fn restore(&self, text: &str) -> String {
        if self.is_empty() || !text.contains("____domwright_fence_") {
            return text.to_string();
        }

        FENCE_TOKEN
            .replace_all(text, |caps: &regex::Captures| {
                self.slot(&caps[1])
                    .and_then(|slot| self.slots[slot].clone())
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }

    /// Frees the slot of every fence token in `text`.
    ///
    /// For markup that is about to leave the tree.
    pub fn release_in(&mut self, text: &str) {
        if !text.contains("____domwright_fence_") {
            return;
        }
        for caps in FENCE_TOKEN.captures_iter(text) {
            let Some(slot) = self.slot(&caps[1]) else {
                continue;
            };
            if self.slots[slot].take().is_some() {
                self.free.push(slot);
            }
        }
    }

    fn slot(&self, digits: &str) -> Option<usize> {
        digits.parse::<usize>().ok().filter(|&slot| slot < self.slots.len())
    }

    /// Number of stored fragments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Whether nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every stored fragment.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
    }
}

// === Source Info ===

/// Facts about the source markup that the tree engine does not keep.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SourceInfo {
    /// First doctype declaration, keyword uppercased (`<!DOCTYPE html>`).
    pub doctype: Option<String>,
    /// An `<html>` start tag was written in the source.
    pub explicit_html: bool,
    /// A `<head>` start tag was written in the source.
    pub explicit_head: bool,
    /// A `<body>` start tag was written in the source.
    pub explicit_body: bool,
}

impl SourceInfo {
    /// Whether the given wrapper element was written in the source.
    ///
    /// Non-wrapper tags always count as explicit.
    #[must_use]
    pub fn is_explicit(&self, tag: &str) -> bool {
        match tag {
            "html" => self.explicit_html,
            "head" => self.explicit_head,
            "body" => self.explicit_body,
            _ => true,
        }
    }
}

/// Output of [`normalize`].
#[derive(Debug, Clone)]
pub struct Normalized {
    /// Markup ready for the tree engine.
    pub markup: String,
    /// Facts recorded while scanning.
    pub source: SourceInfo,
}

// === Scanner ===

/// Normalizes guard-encoded markup for the tree engine.
///
/// Fenced fragments are appended to `fences`.
///
/// # Example
///
/// ```rust
/// use domwright::normalizer::{normalize, FenceTable};
/// use domwright::Options;
///
/// let mut fences = FenceTable::new();
/// let out = normalize("<p>a</b></p>", &Options::default(), &mut fences);
/// assert_eq!(out.markup, "<p>a</p>");
/// ```
#[must_use]
pub fn normalize(text: &str, options: &Options, fences: &mut FenceTable) -> Normalized {
    let mut scanner = Scanner {
        text,
        lower: text.to_ascii_lowercase(),
        pos: 0,
        out: String::with_capacity(text.len() + 64),
        open: Vec::new(),
        source: SourceInfo::default(),
        options,
        fences,
    };
    scanner.run();

    Normalized {
        markup: scanner.out,
        source: scanner.source,
    }
}

struct Scanner<'a> {
    text: &'a str,
    /// ASCII-lowercased copy with identical byte offsets, for searching.
    lower: String,
    pos: usize,
    out: String,
    /// Names of elements opened so far and not yet closed.
    open: Vec<String>,
    source: SourceInfo,
    options: &'a Options,
    fences: &'a mut FenceTable,
}

/// One parsed attribute of a start tag.
struct Attr<'a> {
    name: &'a str,
    value: Option<&'a str>,
    quote: Option<u8>,
}

enum StartTag<'a> {
    Complete {
        name: &'a str,
        attrs: Vec<Attr<'a>>,
        self_closing: bool,
        end: usize,
    },
    /// A `<` appeared before the closing `>`; the tag ends at that offset.
    Interrupted(usize),
    /// Input ended inside the tag.
    Unterminated,
}

impl<'a> Scanner<'a> {
    fn bytes(&self) -> &[u8] {
        self.text.as_bytes()
    }

    fn byte(&self, at: usize) -> Option<u8> {
        self.bytes().get(at).copied()
    }

    fn find_from(&self, from: usize, needle: &str) -> Option<usize> {
        self.lower[from..].find(needle).map(|i| i + from)
    }

    fn run(&mut self) {
        while self.pos < self.text.len() {
            let Some(lt) = self.text[self.pos..].find('<').map(|i| i + self.pos) else {
                self.push_text(self.pos, self.text.len());
                break;
            };
            self.push_text(self.pos, lt);
            self.pos = lt;

            match self.byte(lt + 1) {
                Some(b'!') => self.markup_declaration(),
                Some(b'?') => self.copy_through_gt(),
                Some(b'/') => self.end_tag(),
                Some(b) if b.is_ascii_alphabetic() => self.start_tag(),
                Some(b'>') => {
                    self.broken(lt, lt + 2, "empty tag");
                }
                None => {
                    self.broken(lt, lt + 1, "trailing `<`");
                }
                Some(_) => {
                    // `< ` or `<3`: plain text to the engine as well
                    self.push_text(lt, lt + 1);
                    self.pos = lt + 1;
                }
            }
        }
    }

    /// Copies `text[start..end]`, a run of text content, with `<` and `>`
    /// hidden from the engine's escaping.
    fn push_text(&mut self, start: usize, end: usize) {
        let run = &self.text[start..end];
        if run.contains(['<', '>']) {
            self.out.push_str(&guard::encode_text(run));
        } else {
            self.out.push_str(run);
        }
    }

    /// Drops or fences `text[start..end]` and continues after it.
    fn broken(&mut self, start: usize, end: usize, what: &str) {
        let text = self.text;
        let end = end.min(text.len());
        let raw = &text[start..end];
        if self.options.keep_broken_html {
            trace!(fragment = raw, "keeping broken markup: {what}");
            let token = self.fences.fence(raw);
            self.out.push_str(&token);
        } else {
            trace!(fragment = raw, "dropping broken markup: {what}");
        }
        self.pos = end;
    }

    fn copy_through_gt(&mut self) {
        let end = self
            .text[self.pos..]
            .find('>')
            .map_or(self.text.len(), |i| self.pos + i + 1);
        self.out.push_str(&self.text[self.pos..end]);
        self.pos = end;
    }

    fn markup_declaration(&mut self) {
        let start = self.pos;

        if self.lower[start..].starts_with("<!--") {
            let end = self
                .find_from(start + 4, "-->")
                .map_or(self.text.len(), |i| i + 3);
            self.out.push_str(&self.text[start..end]);
            self.pos = end;
            return;
        }

        if DOCTYPE_KEYWORD.is_match(&self.text[start..]) {
            let Some(gt) = self.text[start..].find('>').map(|i| start + i) else {
                self.broken(start, self.text.len(), "unterminated doctype");
                return;
            };
            if self.source.doctype.is_none() {
                let rest = &self.text[start + "<!doctype".len()..gt];
                self.source.doctype = Some(format!("<!DOCTYPE{rest}>"));
            }
            self.out.push_str(&self.text[start..=gt]);
            self.pos = gt + 1;
            return;
        }

        self.copy_through_gt();
    }

    fn end_tag(&mut self) {
        let start = self.pos;
        let name_start = start + 2;

        match self.byte(name_start) {
            Some(b) if b.is_ascii_alphabetic() => {}
            Some(b'>') => {
                self.broken(start, name_start + 1, "empty closing tag");
                return;
            }
            Some(_) => {
                // `</ x>` is a bogus comment to the engine
                self.copy_through_gt();
                return;
            }
            None => {
                self.broken(start, self.text.len(), "trailing `</`");
                return;
            }
        }

        let name_end = self.bytes()[name_start..]
            .iter()
            .position(|b| b.is_ascii_whitespace() || matches!(b, b'/' | b'>' | b'<'))
            .map_or(self.text.len(), |i| name_start + i);

        let Some(gt) = self.text[name_end..].find('>').map(|i| name_end + i) else {
            self.broken(start, self.text.len(), "unterminated closing tag");
            return;
        };
        if let Some(lt) = self.text[name_end..gt].find('<') {
            self.broken(start, name_end + lt, "closing tag interrupted by `<`");
            return;
        }

        let name = self.lower[name_start..name_end].to_string();
        match self.open.iter().rposition(|open| *open == name) {
            Some(depth) if !is_void_tag(&name) => {
                self.open.truncate(depth);
                self.out.push_str(&self.text[start..=gt]);
                self.pos = gt + 1;
            }
            _ => self.broken(start, gt + 1, "closing tag without opener"),
        }
    }

    fn start_tag(&mut self) {
        let start = self.pos;

        match self.parse_start_tag(start) {
            StartTag::Interrupted(at) => self.broken(start, at, "start tag interrupted by `<`"),
            StartTag::Unterminated => self.broken(start, self.text.len(), "incomplete trailing tag"),
            StartTag::Complete {
                name,
                attrs,
                self_closing,
                end,
            } => {
                let lower_name = name.to_ascii_lowercase();
                let out_mark = self.out.len();
                self.emit_start_tag(name, &attrs, self_closing && !is_void_tag(&lower_name));
                self.pos = end;

                match lower_name.as_str() {
                    "html" => self.source.explicit_html = true,
                    "head" => self.source.explicit_head = true,
                    "body" => self.source.explicit_body = true,
                    _ => {}
                }

                if is_void_tag(&lower_name) || self_closing {
                    return;
                }

                if RAW_TEXT_TAGS.contains(&lower_name.as_str()) {
                    self.fence_raw_text(&lower_name, false, start, out_mark);
                } else if self.options.fence_template_types && has_template_type(&attrs) {
                    self.fence_raw_text(&lower_name, true, start, out_mark);
                } else {
                    self.open.push(lower_name);
                }
            }
        }
    }

    fn parse_start_tag(&self, start: usize) -> StartTag<'a> {
        let text = self.text;
        let bytes = text.as_bytes();
        let len = bytes.len();
        let is_name_end = |b: u8| b.is_ascii_whitespace() || matches!(b, b'/' | b'>' | b'<');

        let name_start = start + 1;
        let mut i = name_start;
        while i < len && !is_name_end(bytes[i]) {
            i += 1;
        }
        let name = &text[name_start..i];

        let mut attrs = Vec::new();
        let mut self_closing = false;

        loop {
            while i < len && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            let Some(&b) = bytes.get(i) else {
                return StartTag::Unterminated;
            };

            match b {
                b'>' => {
                    return StartTag::Complete {
                        name,
                        attrs,
                        self_closing,
                        end: i + 1,
                    };
                }
                b'<' => return StartTag::Interrupted(i),
                b'/' => {
                    self_closing = bytes.get(i + 1) == Some(&b'>');
                    i += 1;
                    continue;
                }
                _ => {}
            }
            self_closing = false;

            // stray `=` with no name in front of it
            if b == b'=' {
                i += 1;
                continue;
            }

            let attr_start = i;
            while i < len && !is_name_end(bytes[i]) && bytes[i] != b'=' {
                i += 1;
            }
            let attr_name = &text[attr_start..i];

            let mut j = i;
            while j < len && bytes[j].is_ascii_whitespace() {
                j += 1;
            }
            if bytes.get(j) != Some(&b'=') {
                attrs.push(Attr {
                    name: attr_name,
                    value: None,
                    quote: None,
                });
                continue;
            }

            j += 1;
            while j < len && bytes[j].is_ascii_whitespace() {
                j += 1;
            }
            match bytes.get(j) {
                None => return StartTag::Unterminated,
                Some(&q @ (b'"' | b'\'')) => {
                    let Some(close) = text[j + 1..].find(q as char).map(|k| j + 1 + k) else {
                        return StartTag::Unterminated;
                    };
                    attrs.push(Attr {
                        name: attr_name,
                        value: Some(&text[j + 1..close]),
                        quote: Some(q),
                    });
                    i = close + 1;
                }
                Some(_) => {
                    let value_start = j;
                    while j < len && !bytes[j].is_ascii_whitespace() && bytes[j] != b'>' {
                        j += 1;
                    }
                    attrs.push(Attr {
                        name: attr_name,
                        value: Some(&text[value_start..j]),
                        quote: None,
                    });
                    i = j;
                }
            }
        }
    }

    fn emit_start_tag(&mut self, name: &str, attrs: &[Attr<'_>], keep_slash: bool) {
        self.out.push('<');
        self.out.push_str(name);

        for attr in attrs {
            self.out.push(' ');
            self.out.push_str(attr.name);
            self.out.push('=');
            match attr.value {
                None => {
                    self.out.push('"');
                    self.out.push_str(BOOLEAN_VALUE);
                    self.out.push('"');
                }
                Some(value) => {
                    match attr.quote {
                        Some(q) => {
                            self.out.push(q as char);
                            self.out.push_str(value);
                            self.out.push(q as char);
                        }
                        None => {
                            // source `&` is already guarded; the engine decodes this one
                            self.out.push('"');
                            self.out.push_str(&value.replace('"', "&quot;"));
                            self.out.push('"');
                        }
                    }
                }
            }
        }

        if keep_slash {
            self.out.push_str("/>");
        } else {
            self.out.push('>');
        }
    }

    /// Fences everything up to the matching closing tag of `name`.
    ///
    /// With `nested`, same-name start tags inside the content are counted so
    /// the outermost closing tag is found. Without a closing tag, the start
    /// tag (at `tag_start` in the input, `out_mark` in the output) and the
    /// rest of the input are fenced as one verbatim run.
    fn fence_raw_text(&mut self, name: &str, nested: bool, tag_start: usize, out_mark: usize) {
        let text = self.text;
        let content_start = self.pos;

        let Some((close, after)) = self.find_closing(content_start, name, nested) else {
            trace!(tag = name, "raw text element never closed, keeping it verbatim");
            self.out.truncate(out_mark);
            let token = self.fences.fence(&text[tag_start..]);
            self.out.push_str(&token);
            self.pos = text.len();
            return;
        };

        let content = &text[content_start..close];
        if !content.is_empty() {
            let token = self.fences.fence(content);
            self.out.push_str(&token);
        }
        self.out.push_str(&text[close..after]);
        self.pos = after;
    }

    /// Returns `(start of closing tag, offset after its '>')`.
    fn find_closing(&self, from: usize, name: &str, nested: bool) -> Option<(usize, usize)> {
        let close_pat = format!("</{name}");
        let open_pat = format!("<{name}");
        let mut depth = 0usize;
        let mut at = from;

        loop {
            let close = self.find_tag_boundary(at, &close_pat)?;
            if nested {
                let mut scan = at;
                while let Some(open) = self.find_tag_boundary(scan, &open_pat) {
                    if open >= close {
                        break;
                    }
                    depth += 1;
                    scan = open + open_pat.len();
                }
            }
            let after = self.text[close..].find('>').map_or(self.text.len(), |i| close + i + 1);
            if depth == 0 {
                return Some((close, after));
            }
            depth -= 1;
            at = after;
        }
    }

    /// Finds `pat` followed by whitespace, `/`, `>` or end of input.
    fn find_tag_boundary(&self, from: usize, pat: &str) -> Option<usize> {
        let mut at = from;
        loop {
            let hit = self.find_from(at, pat)?;
            match self.byte(hit + pat.len()) {
                None => return Some(hit),
                Some(b) if b.is_ascii_whitespace() || b == b'/' || b == b'>' => return Some(hit),
                Some(_) => at = hit + pat.len(),
            }
        }
    }
}

fn has_template_type(attrs: &[Attr<'_>]) -> bool {
    attrs.iter().any(|attr| {
        attr.name.eq_ignore_ascii_case("type") && attr.value.is_some_and(|v| TEMPLATE_TYPE.is_match(v))
    })
}
