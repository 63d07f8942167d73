//! Document: owns the tree and runs the load/serialize pipeline.
//!
//! ```text
//! text ─ guard::encode ─ normalize ─ dom_query ─┬─ selector ─ Node/Nodes
//!                                                └─ serialize ─ unfence ─ guard::decode ─ text
//! ```

use std::cell::RefCell;
use std::fmt;
use std::path::Path;

use tracing::debug;

use crate::dom::{self, NodeKind, NodeRef};
use crate::encoding;
use crate::error::{Error, Result};
use crate::guard;
use crate::node::{Node, Nodes};
use crate::normalizer::{self, FenceTable, SourceInfo, BOOLEAN_VALUE};
use crate::options::Options;
use crate::selector::Selector;

/// Wrapper elements the engine inserts when the source omits them.
const WRAPPERS: &[&str] = &["html", "head", "body"];

/// A parsed HTML document.
///
/// Starts unloaded; every query on an unloaded document returns an empty
/// result and serialization returns `""`.
///
/// # Example
///
/// ```rust
/// use domwright::Document;
///
/// let mut doc = Document::new();
/// doc.load(r#"<div><a href="/x?a=1&b=2">link</a></div>"#);
///
/// let link = doc.find_one("a");
/// assert_eq!(link.attribute("href"), "/x?a=1&b=2");
/// assert_eq!(doc.html(), r#"<div><a href="/x?a=1&b=2">link</a></div>"#);
/// ```
pub struct Document {
    tree: Option<dom_query::Document>,
    options: Options,
    source: SourceInfo,
    fences: RefCell<FenceTable>,
}

impl Default for Document {
    fn default() -> Self {
        Self::with_options(Options::default())
    }
}

impl Document {
    /// Creates an unloaded document with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an unloaded document.
    #[must_use]
    pub fn with_options(options: Options) -> Self {
        Self {
            tree: None,
            options,
            source: SourceInfo::default(),
            fences: RefCell::new(FenceTable::new()),
        }
    }

    /// Creates a document loaded from `html`.
    #[must_use]
    pub fn parse(html: &str) -> Self {
        let mut doc = Self::new();
        doc.load(html);
        doc
    }

    /// Creates a document loaded from a file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read.
    pub fn parse_file(path: impl AsRef<Path>) -> Result<Self> {
        let mut doc = Self::new();
        doc.load_file(path)?;
        Ok(doc)
    }

    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Toggle keep-broken mode for subsequent loads and markup setters.
    pub fn set_keep_broken_html(&mut self, keep: bool) {
        self.options.keep_broken_html = keep;
    }

    // === Loading ===

    /// Parse `text`, replacing any previously loaded tree.
    pub fn load(&mut self, text: &str) -> &mut Self {
        let mut fences = FenceTable::new();
        let normalized = normalizer::normalize(&guard::encode(text), &self.options, &mut fences);

        debug!(
            bytes = text.len(),
            fenced = fences.len(),
            keep_broken = self.options.keep_broken_html,
            "loading document"
        );

        self.tree = Some(dom_query::Document::from(normalized.markup.as_str()));
        self.source = normalized.source;
        self.fences = RefCell::new(fences);
        self
    }

    /// Decode `bytes` (see [`encoding::detect_encoding`]) and parse them.
    pub fn load_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        let text = encoding::transcode_to_utf8(bytes, &self.options.fallback_encoding);
        self.load(&text)
    }

    /// Read a file, decode it and parse it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read. The loaded tree is
    /// left untouched in that case.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<&mut Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "read file");
        Ok(self.load_bytes(&bytes))
    }

    /// Reset to the unloaded state.
    pub fn clear(&mut self) {
        debug!("clearing document");
        self.tree = None;
        self.source = SourceInfo::default();
        self.fences.get_mut().clear();
    }

    /// Whether a tree is loaded.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.tree.is_some()
    }

    pub(crate) fn root(&self) -> Option<NodeRef<'_>> {
        self.tree.as_ref().map(dom_query::Document::root)
    }

    // === Queries ===

    /// All nodes matching `selector`, in document order.
    ///
    /// A selector that cannot be compiled matches nothing.
    #[must_use]
    pub fn find(&self, selector: &str) -> Nodes<'_> {
        match self.root() {
            Some(root) => self.select_in(&root, selector),
            None => Nodes::empty(self),
        }
    }

    /// The `index`-th match; `-1` is the last one. Out of range yields the
    /// not-found sentinel.
    #[must_use]
    pub fn find_at(&self, selector: &str, index: isize) -> Node<'_> {
        self.find(selector).at(index)
    }

    /// The first match, or the not-found sentinel.
    #[must_use]
    pub fn find_one(&self, selector: &str) -> Node<'_> {
        let Some(root) = self.root() else {
            return Node::not_found(self);
        };
        compile_or_log(selector)
            .and_then(|s| s.select_first(&root))
            .map_or_else(|| Node::not_found(self), |n| Node::new(self, n))
    }

    /// Always a collection, possibly empty.
    #[must_use]
    pub fn find_multi(&self, selector: &str) -> Nodes<'_> {
        self.find(selector)
    }

    /// The first element whose `id` is `id`.
    #[must_use]
    pub fn get_element_by_id(&self, id: &str) -> Node<'_> {
        self.find_by(|n| {
            dom::get_attribute(n, "id").is_some_and(|v| v == guard::encode(id))
        })
        .first()
    }

    /// All elements named `tag`.
    #[must_use]
    pub fn get_elements_by_tag_name(&self, tag: &str) -> Nodes<'_> {
        self.find_by(|n| dom::has_tag(n, tag))
    }

    /// The `index`-th element named `tag`; negative indexes count from the end.
    #[must_use]
    pub fn get_elements_by_tag_name_at(&self, tag: &str, index: isize) -> Node<'_> {
        self.get_elements_by_tag_name(tag).at(index)
    }

    /// The first element named `tag`.
    #[must_use]
    pub fn get_element_by_tag_name(&self, tag: &str) -> Node<'_> {
        self.get_elements_by_tag_name(tag).first()
    }

    fn find_by(&self, rule: impl Fn(&NodeRef) -> bool) -> Nodes<'_> {
        let nodes = self
            .root()
            .map(|root| crate::selector::query_all(&root, &rule))
            .unwrap_or_default();
        Nodes::new(self, nodes)
    }

    pub(crate) fn select_in<'a>(&'a self, scope: &NodeRef<'a>, selector: &str) -> Nodes<'a> {
        let nodes = compile_or_log(selector)
            .map(|s| s.select(scope))
            .unwrap_or_default();
        Nodes::new(self, nodes)
    }

    // === Serialization ===

    /// The whole document as HTML.
    ///
    /// `html`, `head` and `body` elements appear only when the source wrote
    /// them; the doctype is reproduced as written, with `DOCTYPE` uppercased.
    #[must_use]
    pub fn html(&self) -> String {
        self.serialize_document(false, false)
    }

    /// Alias of [`Document::html`].
    #[must_use]
    pub fn save(&self) -> String {
        self.html()
    }

    /// Markup inside the `html` element.
    #[must_use]
    pub fn inner_html(&self) -> String {
        self.serialize_document(false, true)
    }

    /// The whole document in XML syntax.
    #[must_use]
    pub fn xml(&self) -> String {
        self.serialize_document(true, false)
    }

    /// Decoded text of every text node.
    #[must_use]
    pub fn text(&self) -> String {
        match self.root() {
            Some(root) => self.finish_text(&dom::Selection::from(root).text()),
            None => String::new(),
        }
    }

    /// Document-level virtual property by name; `None` for unknown names.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<String> {
        let folded = name.replace('_', "").to_ascii_lowercase();
        match folded.as_str() {
            "outertext" | "outerhtml" | "html" => Some(self.html()),
            "innertext" | "innerhtml" => Some(self.inner_html()),
            "plaintext" | "text" => Some(self.text()),
            "xml" => Some(self.xml()),
            _ => None,
        }
    }

    fn serialize_document(&self, xml: bool, inner: bool) -> String {
        let Some(root) = self.root() else {
            return String::new();
        };

        let start = if inner {
            dom::children(&root)
                .into_iter()
                .find(|n| dom::has_tag(n, "html"))
                .unwrap_or(root)
        } else {
            root
        };

        let mut out = String::new();
        self.write_children(&start, xml, &mut out);
        self.finish_markup(&out, xml)
    }

    fn write_children(&self, parent: &NodeRef, xml: bool, out: &mut String) {
        for child in dom::children(parent) {
            match dom::node_kind(&child) {
                NodeKind::Other => match &self.source.doctype {
                    Some(doctype) => out.push_str(doctype),
                    None => out.push_str(&dom::serialize(&child, false)),
                },
                NodeKind::Element => match dom::tag_name(&child) {
                    Some(tag) if WRAPPERS.contains(&tag.as_str()) => {
                        if self.source.is_explicit(&tag) {
                            dom::serialize::write_start_tag(&child, out);
                            self.write_children(&child, xml, out);
                            out.push_str("</");
                            out.push_str(&tag);
                            out.push('>');
                        } else {
                            self.write_children(&child, xml, out);
                        }
                    }
                    _ => out.push_str(&dom::serialize(&child, xml)),
                },
                NodeKind::Text | NodeKind::Comment => out.push_str(&dom::serialize(&child, xml)),
            }
        }
    }

    // === Pipeline helpers ===

    /// Guard and normalize markup headed for a setter. Fenced fragments join
    /// this document's fence table.
    pub(crate) fn prepare_fragment(&self, markup: &str) -> String {
        let mut fences = self.fences.borrow_mut();
        normalizer::normalize(&guard::encode(markup), &self.options, &mut fences).markup
    }

    /// Free the fenced fragments referenced by raw markup leaving the tree.
    pub(crate) fn release_fragment(&self, raw: &str) {
        self.fences.borrow_mut().release_in(raw);
    }

    /// Turn engine markup back into caller markup.
    pub(crate) fn finish_markup(&self, raw: &str, xml: bool) -> String {
        let boolean = format!("=\"{BOOLEAN_VALUE}\"");
        let mut text = if xml {
            guard::escape_text(&raw.replace(&boolean, "=\"\""))
        } else {
            // every `&` in the source was guarded, so this came from a raw U+00A0
            raw.replace(&boolean, "").replace("&nbsp;", "\u{a0}")
        };
        text = self.fences.borrow().restore(&text);
        guard::decode(&text)
    }

    /// Turn engine text back into caller text.
    pub(crate) fn finish_text(&self, raw: &str) -> String {
        guard::decode(&self.fences.borrow().restore(raw))
    }
}

fn compile_or_log(selector: &str) -> Option<Selector> {
    match Selector::parse(selector) {
        Ok(compiled) => Some(compiled),
        Err(err) => {
            tracing::trace!(%err, "selector matches nothing");
            None
        }
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.html())
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("loaded", &self.is_loaded())
            .field("options", &self.options)
            .field("source", &self.source)
            .field("fenced", &self.fences.borrow().len())
            .finish()
    }
}
