//! Node Wrapper & Mutation Layer
//!
//! [`Node`] is a handle to one tree node (or the not-found sentinel) with
//! read/write virtual properties. [`Nodes`] is an ordered collection that
//! broadcasts property reads lazily and attribute writes eagerly.
//!
//! Every string crossing this layer is converted between its caller form
//! and its tree form: guard sentinels and fence tokens never leak out, and
//! values going in are guarded the same way loaded markup is.

use std::collections::HashSet;
use std::fmt;

use tracing::debug;

use crate::document::Document;
use crate::dom::{self, NodeKind, NodeRef, Selection};
use crate::guard;
use crate::normalizer::BOOLEAN_VALUE;

// === Property ===

/// A named virtual property of a node.
///
/// Names are matched case-insensitively, with or without underscores, so
/// `outerHtml`, `outer_html` and `outerhtml` are the same property. Any other
/// name is an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Property<'n> {
    /// `outertext`, `outerhtml`: markup including the node itself.
    OuterMarkup,
    /// `innertext`, `innerhtml`: markup of the children.
    InnerMarkup,
    /// `plaintext`, `text`: decoded text of all descendant text nodes.
    PlainText,
    /// `tag`: element name.
    Tag,
    /// Any other name.
    Attribute(&'n str),
}

impl<'n> Property<'n> {
    /// Map a property name to its accessor.
    #[must_use]
    pub fn parse(name: &'n str) -> Self {
        let folded: String = name
            .chars()
            .filter(|c| *c != '_')
            .map(|c| c.to_ascii_lowercase())
            .collect();

        match folded.as_str() {
            "outertext" | "outerhtml" | "outermarkup" | "html" => Self::OuterMarkup,
            "innertext" | "innerhtml" | "innermarkup" => Self::InnerMarkup,
            "plaintext" | "text" => Self::PlainText,
            "tag" | "tagname" => Self::Tag,
            _ => Self::Attribute(name),
        }
    }
}

/// Resolve a possibly negative index against a length.
///
/// Non-negative indexes count from the start, negative ones from the end
/// (`-1` is the last element).
pub(crate) fn resolve_index(len: usize, index: isize) -> Option<usize> {
    if index >= 0 {
        usize::try_from(index).ok().filter(|&i| i < len)
    } else {
        len.checked_sub(index.unsigned_abs())
    }
}

// === Node ===

/// A handle to one node of a [`Document`], or the not-found sentinel.
///
/// Every getter on the sentinel returns an empty value and every setter is a
/// no-op, so query chains never need to check for a match.
#[derive(Clone, Copy)]
pub struct Node<'a> {
    doc: &'a Document,
    node: Option<NodeRef<'a>>,
}

impl<'a> Node<'a> {
    pub(crate) fn new(doc: &'a Document, node: NodeRef<'a>) -> Self {
        Self { doc, node: Some(node) }
    }

    pub(crate) fn not_found(doc: &'a Document) -> Self {
        Self { doc, node: None }
    }

    /// The underlying tree node, `None` for the not-found sentinel.
    #[must_use]
    pub fn node_ref(&self) -> Option<NodeRef<'a>> {
        self.node
    }

    /// Whether this handle refers to a node.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.node.is_some()
    }

    /// Whether this is the not-found sentinel.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.node.is_none()
    }

    /// Node kind, `None` for the not-found sentinel.
    #[must_use]
    pub fn kind(&self) -> Option<NodeKind> {
        self.node.as_ref().map(dom::node_kind)
    }

    /// Element name in lowercase; empty for other nodes.
    #[must_use]
    pub fn tag(&self) -> String {
        self.node.as_ref().and_then(dom::tag_name).unwrap_or_default()
    }

    // --- markup ---

    /// Markup including the node itself.
    #[must_use]
    pub fn outer_markup(&self) -> String {
        self.serialized(false, true)
    }

    /// Alias of [`Node::outer_markup`].
    #[must_use]
    pub fn html(&self) -> String {
        self.outer_markup()
    }

    /// Markup including the node itself, in XML syntax.
    #[must_use]
    pub fn xml(&self) -> String {
        self.serialized(true, true)
    }

    /// Markup of the children.
    ///
    /// Text and comment nodes have no children; they return their own markup.
    #[must_use]
    pub fn inner_markup(&self) -> String {
        let include_self = !matches!(self.kind(), Some(NodeKind::Element | NodeKind::Other));
        self.serialized(false, include_self)
    }

    /// Alias of [`Node::inner_markup`].
    #[must_use]
    pub fn inner_text(&self) -> String {
        self.inner_markup()
    }

    fn serialized(&self, xml: bool, include_self: bool) -> String {
        let Some(node) = &self.node else {
            return String::new();
        };
        let raw = if include_self {
            dom::serialize(node, xml)
        } else {
            dom::serialize_children(node, xml)
        };
        self.doc.finish_markup(&raw, xml)
    }

    /// Replace the node with `markup`. Empty markup removes the node.
    ///
    /// The handle keeps pointing at the detached old node. Its scripts and
    /// other fenced content are released and read back as tokens.
    pub fn set_outer_markup(&self, markup: &str) {
        let Some(node) = &self.node else {
            return;
        };
        debug!(tag = %self.tag(), len = markup.len(), "replacing node");
        self.doc.release_fragment(&dom::serialize(node, false));
        let prepared = self.doc.prepare_fragment(markup);
        dom::replace_subtree(node, &prepared);
    }

    /// Replace the children with `markup`.
    pub fn set_inner_markup(&self, markup: &str) {
        let Some(node) = &self.node else {
            return;
        };
        if dom::node_kind(node) != NodeKind::Element {
            self.set_outer_markup(markup);
            return;
        }
        debug!(tag = %self.tag(), len = markup.len(), "replacing children");
        self.doc.release_fragment(&dom::serialize_children(node, false));
        let prepared = self.doc.prepare_fragment(markup);
        dom::set_children_markup(node, &prepared);
    }

    // --- text ---

    /// Decoded text of all descendant text nodes, or the node's own text for
    /// text and comment nodes.
    #[must_use]
    pub fn plain_text(&self) -> String {
        let Some(node) = &self.node else {
            return String::new();
        };
        let raw = match dom::node_kind(node) {
            NodeKind::Text | NodeKind::Comment => dom::text_of(node),
            _ => Selection::from(*node).text().to_string(),
        };
        self.doc.finish_text(&raw)
    }

    /// Alias of [`Node::plain_text`].
    #[must_use]
    pub fn text(&self) -> String {
        self.plain_text()
    }

    /// Replace the children with a single text node holding `text`.
    ///
    /// `<` and `>` in `text` stay text; they never become markup.
    pub fn set_plain_text(&self, text: &str) {
        let Some(node) = &self.node else {
            return;
        };
        let escaped = guard::encode(text).replace('<', "&lt;").replace('>', "&gt;");
        if dom::node_kind(node) == NodeKind::Element {
            self.doc.release_fragment(&dom::serialize_children(node, false));
            dom::set_children_markup(node, &escaped);
        } else {
            self.doc.release_fragment(&dom::serialize(node, false));
            dom::replace_subtree(node, &escaped);
        }
    }

    // --- attributes ---

    /// Attribute value, or `""` when absent. Bare attributes read as `""`.
    #[must_use]
    pub fn attribute(&self, name: &str) -> String {
        self.node
            .as_ref()
            .and_then(|node| dom::get_attribute(node, &attribute_key(name)))
            .map(|value| decode_attribute(&value))
            .unwrap_or_default()
    }

    /// Whether the attribute is present.
    #[must_use]
    pub fn has_attribute(&self, name: &str) -> bool {
        self.node
            .as_ref()
            .is_some_and(|node| dom::has_attribute(node, &attribute_key(name)))
    }

    /// Upsert (`Some`) or remove (`None`) an attribute.
    ///
    /// An existing attribute keeps its position among its neighbours.
    pub fn set_attribute(&self, name: &str, value: Option<&str>) {
        let Some(node) = &self.node else {
            return;
        };
        if dom::node_kind(node) != NodeKind::Element {
            return;
        }
        let key = attribute_key(name);
        match value {
            Some(value) => dom::set_attribute(node, &key, &guard::encode(value)),
            None => dom::remove_attribute(node, &key),
        }
    }

    /// Remove an attribute.
    pub fn remove_attribute(&self, name: &str) {
        self.set_attribute(name, None);
    }

    /// All attributes in element order.
    #[must_use]
    pub fn attributes(&self) -> Vec<(String, String)> {
        self.node
            .as_ref()
            .map(dom::attributes)
            .unwrap_or_default()
            .into_iter()
            .map(|(name, value)| (guard::decode(&name), decode_attribute(&value)))
            .collect()
    }

    // --- string-keyed access ---

    /// Read a property by name. Unknown attributes read as `""`.
    #[must_use]
    pub fn get(&self, name: &str) -> String {
        match Property::parse(name) {
            Property::OuterMarkup => self.outer_markup(),
            Property::InnerMarkup => self.inner_markup(),
            Property::PlainText => self.plain_text(),
            Property::Tag => self.tag(),
            Property::Attribute(attr) => self.attribute(attr),
        }
    }

    /// Write a property by name. `None` removes an attribute and empties
    /// markup and text properties.
    pub fn set(&self, name: &str, value: Option<&str>) {
        match Property::parse(name) {
            Property::OuterMarkup => self.set_outer_markup(value.unwrap_or_default()),
            Property::InnerMarkup => self.set_inner_markup(value.unwrap_or_default()),
            Property::PlainText => self.set_plain_text(value.unwrap_or_default()),
            Property::Tag => {
                if let (Some(node), Some(tag)) = (&self.node, value.filter(|t| !t.is_empty())) {
                    if dom::node_kind(node) == NodeKind::Element {
                        Selection::from(*node).rename(tag);
                    }
                }
            }
            Property::Attribute(attr) => self.set_attribute(attr, value),
        }
    }

    // --- navigation and queries ---

    /// Parent node, or the sentinel at the top of the tree.
    #[must_use]
    pub fn parent(&self) -> Node<'a> {
        self.node
            .as_ref()
            .and_then(dom::parent)
            .filter(|p| dom::node_kind(p) == NodeKind::Element)
            .map_or_else(|| Node::not_found(self.doc), |p| Node::new(self.doc, p))
    }

    /// All child nodes, text and comments included.
    #[must_use]
    pub fn children(&self) -> Nodes<'a> {
        let nodes = self.node.as_ref().map(dom::children).unwrap_or_default();
        Nodes::new(self.doc, nodes)
    }

    /// Descendants matching `selector`.
    #[must_use]
    pub fn find(&self, selector: &str) -> Nodes<'a> {
        match &self.node {
            Some(node) => self.doc.select_in(node, selector),
            None => Nodes::empty(self.doc),
        }
    }

    /// The `index`-th descendant matching `selector`; negative indexes count
    /// from the end.
    #[must_use]
    pub fn find_at(&self, selector: &str, index: isize) -> Node<'a> {
        self.find(selector).at(index)
    }

    /// The first descendant matching `selector`.
    #[must_use]
    pub fn find_one(&self, selector: &str) -> Node<'a> {
        self.find_at(selector, 0)
    }
}

/// Engine-side attribute name. Lookups ignore ASCII case, so the caller's
/// spelling is kept for new attributes.
fn attribute_key(name: &str) -> String {
    guard::encode(name)
}

fn decode_attribute(value: &str) -> String {
    if value == BOOLEAN_VALUE {
        String::new()
    } else {
        guard::decode(value)
    }
}

impl fmt::Display for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.outer_markup())
    }
}

impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.node {
            Some(node) => f
                .debug_struct("Node")
                .field("kind", &dom::node_kind(node))
                .field("tag", &self.tag())
                .finish(),
            None => f.write_str("Node(not found)"),
        }
    }
}

impl PartialEq for Node<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.doc, other.doc) && self.node.map(|n| n.id) == other.node.map(|n| n.id)
    }
}

// === Nodes ===

/// An ordered collection of nodes from one document.
///
/// Empty, never absent, when nothing matched.
#[derive(Clone)]
pub struct Nodes<'a> {
    doc: &'a Document,
    nodes: Vec<NodeRef<'a>>,
}

impl<'a> Nodes<'a> {
    pub(crate) fn new(doc: &'a Document, nodes: Vec<NodeRef<'a>>) -> Self {
        Self { doc, nodes }
    }

    pub(crate) fn empty(doc: &'a Document) -> Self {
        Self::new(doc, Vec::new())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The node at `index`, or the not-found sentinel.
    #[must_use]
    pub fn get(&self, index: usize) -> Node<'a> {
        self.nodes
            .get(index)
            .map_or_else(|| Node::not_found(self.doc), |n| Node::new(self.doc, *n))
    }

    /// Like [`Nodes::get`], with negative indexes counting from the end.
    #[must_use]
    pub fn at(&self, index: isize) -> Node<'a> {
        match resolve_index(self.nodes.len(), index) {
            Some(i) => self.get(i),
            None => Node::not_found(self.doc),
        }
    }

    #[must_use]
    pub fn first(&self) -> Node<'a> {
        self.at(0)
    }

    #[must_use]
    pub fn last(&self) -> Node<'a> {
        self.at(-1)
    }

    /// Iterate over the nodes in order.
    pub fn iter(&self) -> impl Iterator<Item = Node<'a>> + '_ {
        self.nodes.iter().map(|n| Node::new(self.doc, *n))
    }

    /// Apply `f` to every node, lazily and in order.
    pub fn map<T, F>(&self, f: F) -> impl Iterator<Item = T> + use<'_, 'a, T, F>
    where
        F: Fn(Node<'a>) -> T + 'a,
        T: 'a,
    {
        self.iter().map(f)
    }

    /// Plain text of every node.
    pub fn texts(&self) -> impl Iterator<Item = String> + '_ {
        self.iter().map(|n| n.plain_text())
    }

    /// Outer markup of every node.
    pub fn outer_markups(&self) -> impl Iterator<Item = String> + '_ {
        self.iter().map(|n| n.outer_markup())
    }

    /// Inner markup of every node.
    pub fn inner_markups(&self) -> impl Iterator<Item = String> + '_ {
        self.iter().map(|n| n.inner_markup())
    }

    /// Value of attribute `name` on every node (`""` where absent).
    pub fn attributes_named<'s>(&'s self, name: &'s str) -> impl Iterator<Item = String> + 's {
        self.iter().map(move |n| n.attribute(name))
    }

    /// Upsert or remove an attribute on every node.
    pub fn set_attribute(&self, name: &str, value: Option<&str>) {
        for node in self.iter() {
            node.set_attribute(name, value);
        }
    }

    /// Descendants of any node in the collection matching `selector`, in
    /// collection order and without duplicates.
    #[must_use]
    pub fn find(&self, selector: &str) -> Nodes<'a> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for node in &self.nodes {
            for hit in self.doc.select_in(node, selector).nodes {
                if seen.insert(hit.id) {
                    out.push(hit);
                }
            }
        }
        Nodes::new(self.doc, out)
    }
}

impl<'a> IntoIterator for Nodes<'a> {
    type Item = Node<'a>;
    type IntoIter = std::vec::IntoIter<Node<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        let doc = self.doc;
        self.nodes
            .into_iter()
            .map(|n| Node::new(doc, n))
            .collect::<Vec<_>>()
            .into_iter()
    }
}

impl<'a, 'b> IntoIterator for &'b Nodes<'a> {
    type Item = Node<'a>;
    type IntoIter = Box<dyn Iterator<Item = Node<'a>> + 'b>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

impl fmt::Display for Nodes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for markup in self.outer_markups() {
            f.write_str(&markup)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Nodes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
