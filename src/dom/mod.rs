//! Tree Adapter
//!
//! Thin function-style layer over `dom_query::NodeRef`. Everything above this
//! module talks to the tree through these functions, so the engine's API
//! shape stays in one place.
//!
//! Values read here are raw engine values: guard sentinels and fence tokens
//! are still in place. Decoding happens in the node layer.

pub mod serialize;
pub mod xpath;

pub use dom_query::{NodeData, NodeId, NodeRef, Selection};

// Re-export StrTendril for external use
pub use tendril::StrTendril;

pub use serialize::{serialize, serialize_children};

/// Elements that never have content or a closing tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "keygen", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Elements whose text content is serialized without escaping.
pub const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Check if a tag name is a void element.
#[must_use]
pub fn is_void_tag(tag: &str) -> bool {
    VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(tag))
}

// === Node Information ===

/// The node kinds the rest of the crate distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Element,
    Text,
    Comment,
    /// Document, doctype, processing instruction.
    Other,
}

/// Get the kind of a node.
#[must_use]
pub fn node_kind(node: &NodeRef) -> NodeKind {
    node.query(|n| match n.data {
        NodeData::Element(_) => NodeKind::Element,
        NodeData::Text { .. } => NodeKind::Text,
        NodeData::Comment { .. } => NodeKind::Comment,
        _ => NodeKind::Other,
    })
    .unwrap_or(NodeKind::Other)
}

/// Get tag name (lowercase) of an element.
///
/// Returns `None` for non-element nodes.
#[must_use]
pub fn tag_name(node: &NodeRef) -> Option<String> {
    if node_kind(node) != NodeKind::Element {
        return None;
    }
    node.node_name().map(|t| t.to_ascii_lowercase())
}

/// Check the tag name of an element without allocating.
#[must_use]
pub fn has_tag(node: &NodeRef, tag: &str) -> bool {
    node.is_element() && node.node_name().is_some_and(|t| t.eq_ignore_ascii_case(tag))
}

/// Get the contents of a text or comment node.
///
/// Elements and other nodes yield an empty string.
#[must_use]
pub fn text_of(node: &NodeRef) -> String {
    node.query(|n| match &n.data {
        NodeData::Text { contents } | NodeData::Comment { contents } => contents.to_string(),
        _ => String::new(),
    })
    .unwrap_or_default()
}

// === Attribute Operations ===

/// Get all attributes as name/value pairs, in element order.
///
/// Returns an empty vector for non-element nodes.
#[must_use]
pub fn attributes(node: &NodeRef) -> Vec<(String, String)> {
    node.attrs()
        .iter()
        .map(|attr| (attr.name.local.to_string(), attr.value.to_string()))
        .collect()
}

/// Name of the attribute stored under `name`, compared ASCII
/// case-insensitively.
fn stored_attribute_name(node: &NodeRef, name: &str) -> Option<String> {
    node.attrs()
        .iter()
        .find(|attr| attr.name.local.as_ref().eq_ignore_ascii_case(name))
        .map(|attr| attr.name.local.to_string())
}

/// Get an attribute value. Names compare ASCII case-insensitively.
#[must_use]
pub fn get_attribute(node: &NodeRef, name: &str) -> Option<String> {
    node.attrs()
        .iter()
        .find(|attr| attr.name.local.as_ref().eq_ignore_ascii_case(name))
        .map(|attr| attr.value.to_string())
}

/// Check if an attribute exists. Names compare ASCII case-insensitively.
#[must_use]
pub fn has_attribute(node: &NodeRef, name: &str) -> bool {
    node.attrs()
        .iter()
        .any(|attr| attr.name.local.as_ref().eq_ignore_ascii_case(name))
}

/// Set an attribute value.
///
/// An existing attribute keeps its position and the spelling of its name;
/// a new one is appended under `name` as given.
pub fn set_attribute(node: &NodeRef, name: &str, value: &str) {
    let stored = stored_attribute_name(node, name);
    Selection::from(*node).set_attr(stored.as_deref().unwrap_or(name), value);
}

/// Remove an attribute, whatever the case of its stored name.
pub fn remove_attribute(node: &NodeRef, name: &str) {
    if let Some(stored) = stored_attribute_name(node, name) {
        Selection::from(*node).remove_attr(&stored);
    }
}

// === Tree Navigation ===

/// Get the parent node.
#[inline]
#[must_use]
pub fn parent<'a>(node: &NodeRef<'a>) -> Option<NodeRef<'a>> {
    node.parent()
}

/// Get all child nodes, text and comments included.
#[inline]
#[must_use]
pub fn children<'a>(node: &NodeRef<'a>) -> Vec<NodeRef<'a>> {
    node.children()
}

/// Get all proper descendants in pre-order (document order).
#[must_use]
pub fn descendants<'a>(node: &NodeRef<'a>) -> Vec<NodeRef<'a>> {
    let mut out = Vec::new();
    let mut stack: Vec<NodeRef<'a>> = node.children().into_iter().rev().collect();

    while let Some(current) = stack.pop() {
        stack.extend(current.children().into_iter().rev());
        out.push(current);
    }

    out
}

/// Check whether `ancestor` is a proper ancestor of `node`.
#[must_use]
pub fn is_ancestor(ancestor: &NodeRef, node: &NodeRef) -> bool {
    let mut current = node.parent();
    while let Some(n) = current {
        if n.id == ancestor.id {
            return true;
        }
        current = n.parent();
    }
    false
}

/// Find the first `html`, `head` or `body` element below the root.
#[must_use]
pub fn find_wrapper<'a>(root: &NodeRef<'a>, tag: &str) -> Option<NodeRef<'a>> {
    descendants(root).into_iter().find(|n| has_tag(n, tag))
}

// === Tree Manipulation ===

/// Replace a node (and its subtree) with parsed markup.
///
/// Empty markup removes the node from its parent.
pub fn replace_subtree(node: &NodeRef, markup: &str) {
    let sel = Selection::from(*node);
    if markup.is_empty() {
        sel.remove();
    } else {
        sel.replace_with_html(markup);
    }
}

/// Replace all children of a node with parsed markup.
///
/// Empty markup leaves the node without children.
pub fn set_children_markup(node: &NodeRef, markup: &str) {
    if markup.is_empty() {
        for child in node.children() {
            Selection::from(child).remove();
        }
    } else {
        Selection::from(*node).set_html(markup);
    }
}

/// Remove a node from the tree.
#[inline]
pub fn remove(node: &NodeRef) {
    Selection::from(*node).remove();
}

#[cfg(test)]
mod tests {
    use super::*;
    use dom_query::Document;

    fn first<'a>(doc: &'a Document, tag: &str) -> NodeRef<'a> {
        descendants(&doc.root())
            .into_iter()
            .find(|n| has_tag(n, tag))
            .unwrap()
    }

    #[test]
    fn test_void_tags() {
        assert!(is_void_tag("br"));
        assert!(is_void_tag("IMG"));
        assert!(!is_void_tag("div"));
        assert!(!is_void_tag("script"));
    }

    #[test]
    fn test_node_kinds() {
        let doc = Document::from("<div>text<!-- note --></div>");
        let div = first(&doc, "div");
        let kids = children(&div);

        assert_eq!(node_kind(&div), NodeKind::Element);
        assert_eq!(node_kind(&kids[0]), NodeKind::Text);
        assert_eq!(node_kind(&kids[1]), NodeKind::Comment);
        assert_eq!(node_kind(&doc.root()), NodeKind::Other);
        assert_eq!(text_of(&kids[0]), "text");
        assert_eq!(text_of(&kids[1]), " note ");
        assert_eq!(text_of(&div), "");
    }

    #[test]
    fn test_tag_name() {
        let doc = Document::from("<article><section>content</section></article>");
        assert_eq!(tag_name(&first(&doc, "section")), Some("section".to_string()));

        let text = children(&first(&doc, "section"))[0];
        assert_eq!(tag_name(&text), None);
    }

    #[test]
    fn test_descendants_in_document_order() {
        let doc = Document::from("<div><p>1</p><span>2<b>3</b></span></div>");
        let div = first(&doc, "div");

        let order: Vec<String> = descendants(&div)
            .iter()
            .map(|n| tag_name(n).unwrap_or_else(|| text_of(n)))
            .collect();
        assert_eq!(order, vec!["p", "1", "span", "2", "b", "3"]);
    }

    #[test]
    fn test_attributes_keep_order() {
        let doc = Document::from(r#"<a href="/x" class="link" title="T">x</a>"#);
        let a = first(&doc, "a");

        let names: Vec<String> = attributes(&a).into_iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["href", "class", "title"]);
    }

    #[test]
    fn test_set_attribute_keeps_position() {
        let doc = Document::from(r#"<a href="/x" class="link">x</a>"#);
        let a = first(&doc, "a");

        set_attribute(&a, "href", "/y");
        set_attribute(&a, "id", "new");
        remove_attribute(&a, "class");

        assert_eq!(
            attributes(&a),
            vec![
                ("href".to_string(), "/y".to_string()),
                ("id".to_string(), "new".to_string())
            ]
        );
        assert!(has_attribute(&a, "id"));
        assert_eq!(get_attribute(&a, "class"), None);
    }

    #[test]
    fn test_is_ancestor() {
        let doc = Document::from("<div><p><b>x</b></p></div><span></span>");
        let div = first(&doc, "div");

        assert!(is_ancestor(&div, &first(&doc, "b")));
        assert!(!is_ancestor(&div, &first(&doc, "span")));
        assert!(!is_ancestor(&div, &div));
    }

    #[test]
    fn test_replace_subtree_with_empty_markup_removes() {
        let doc = Document::from("<div><p>1</p><p id=\"two\">2</p></div>");
        let div = first(&doc, "div");
        let second = children(&div)[1];

        replace_subtree(&second, "");
        assert_eq!(children(&div).len(), 1);

        replace_subtree(&children(&div)[0], "<span>new</span>");
        assert_eq!(tag_name(&children(&div)[0]), Some("span".to_string()));
    }

    #[test]
    fn test_set_children_markup() {
        let doc = Document::from("<div><p>1</p>text</div>");
        let div = first(&doc, "div");

        set_children_markup(&div, "<b>x</b>");
        assert_eq!(children(&div).len(), 1);

        set_children_markup(&div, "");
        assert!(children(&div).is_empty());
    }

    #[test]
    fn test_find_wrapper() {
        let doc = Document::from("<p>x</p>");
        assert!(find_wrapper(&doc.root(), "body").is_some());
        assert!(find_wrapper(&doc.root(), "article").is_none());
    }
}
