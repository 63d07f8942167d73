//! Node serialization.
//!
//! HTML output comes straight from the engine's html5ever serializer. XML
//! output is written here: the engine has no XML mode.

use dom_query::{NodeRef, Selection};

use super::{attributes, children, has_tag, is_void_tag, node_kind, tag_name, text_of, NodeKind};
use super::RAW_TEXT_ELEMENTS;

/// Serialize a node including itself.
#[must_use]
pub fn serialize(node: &NodeRef, xml: bool) -> String {
    if xml {
        let mut out = String::new();
        write_xml(node, &mut out);
        out
    } else {
        Selection::from(*node).html().to_string()
    }
}

/// Serialize the children of a node.
#[must_use]
pub fn serialize_children(node: &NodeRef, xml: bool) -> String {
    if xml {
        let mut out = String::new();
        for child in children(node) {
            write_xml(&child, &mut out);
        }
        out
    } else {
        Selection::from(*node).inner_html().to_string()
    }
}

/// Write the start tag of an element, `<name attr="value">`.
///
/// Used for wrapper elements whose children are written one by one.
pub fn write_start_tag(node: &NodeRef, out: &mut String) {
    let Some(name) = tag_name(node) else {
        return;
    };
    out.push('<');
    out.push_str(&name);
    push_attributes(node, out);
    out.push('>');
}

fn push_attributes(node: &NodeRef, out: &mut String) {
    for (key, value) in attributes(node) {
        out.push(' ');
        out.push_str(&key);
        out.push_str("=\"");
        push_escaped(out, &value, true);
        out.push('"');
    }
}

fn write_xml(node: &NodeRef, out: &mut String) {
    match node_kind(node) {
        NodeKind::Element => {
            let Some(name) = tag_name(node) else {
                return;
            };
            out.push('<');
            out.push_str(&name);
            push_attributes(node, out);

            if is_void_tag(&name) {
                out.push_str("/>");
                return;
            }

            out.push('>');
            for child in children(node) {
                write_xml(&child, out);
            }
            out.push_str("</");
            out.push_str(&name);
            out.push('>');
        }
        NodeKind::Text => {
            let text = text_of(node);
            let raw = node
                .parent()
                .is_some_and(|p| RAW_TEXT_ELEMENTS.iter().any(|t| has_tag(&p, t)));
            if raw {
                out.push_str(&text);
            } else {
                push_escaped(out, &text, false);
            }
        }
        NodeKind::Comment => {
            out.push_str("<!--");
            out.push_str(&text_of(node));
            out.push_str("-->");
        }
        NodeKind::Other => out.push_str(&Selection::from(*node).html()),
    }
}

fn push_escaped(out: &mut String, text: &str, attr: bool) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attr => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::find_wrapper;
    use dom_query::Document;

    fn body(doc: &Document) -> NodeRef<'_> {
        find_wrapper(&doc.root(), "body").unwrap()
    }

    #[test]
    fn test_html_void_without_slash() {
        let doc = Document::from(r#"<div><br class="x"><img src="a.png"></div>"#);
        assert_eq!(
            serialize_children(&body(&doc), false),
            r#"<div><br class="x"><img src="a.png"></div>"#
        );
    }

    #[test]
    fn test_xml_void_self_closes() {
        let doc = Document::from(r#"<div><br class="x">a</div>"#);
        assert_eq!(
            serialize_children(&body(&doc), true),
            r#"<div><br class="x"/>a</div>"#
        );
    }

    #[test]
    fn test_xml_escapes_text_and_attributes() {
        let doc = Document::from(r#"<p title='say "hi"'>1 &lt; 2</p>"#);
        assert_eq!(
            serialize_children(&body(&doc), true),
            r#"<p title="say &quot;hi&quot;">1 &lt; 2</p>"#
        );
    }

    #[test]
    fn test_xml_keeps_script_raw() {
        let doc = Document::from("<div><script>a < b</script><!--c--></div>");
        assert_eq!(
            serialize_children(&body(&doc), true),
            "<div><script>a < b</script><!--c--></div>"
        );
    }

    #[test]
    fn test_start_tag() {
        let doc = Document::from(r#"<html lang="en"><body>x</body></html>"#);
        let html = children(&doc.root())[0];
        let mut out = String::new();
        write_start_tag(&html, &mut out);
        assert_eq!(out, r#"<html lang="en">"#);
    }

    #[test]
    fn test_serialize_includes_node() {
        let doc = Document::from("<div><span>x</span></div>");
        let div = children(&body(&doc))[0];
        assert_eq!(serialize(&div, false), "<div><span>x</span></div>");
        assert_eq!(serialize(&div, true), "<div><span>x</span></div>");
    }
}
