//! Selector matcher.
//!
//! Each candidate is tested right to left: the last part against the node,
//! then earlier parts against its ancestors, backtracking across descendant
//! combinators. Ancestors outside the query scope never take part.

use crate::dom::{self, NodeKind, NodeRef};
use crate::normalizer::BOOLEAN_VALUE;

use super::parser::{
    AttributeOp, AttributeSelector, Combinator, PseudoKind, SelectorGroup, SelectorPart,
    SimpleSelector,
};

/// Whether `node` matches the whole chain of `group`, with `scope` as the
/// outermost boundary.
pub(crate) fn matches_group(group: &SelectorGroup, node: &NodeRef, scope: &NodeRef) -> bool {
    match group.parts.len() {
        0 => false,
        n => matches_from(&group.parts, n - 1, node, scope),
    }
}

fn matches_from(parts: &[SelectorPart], idx: usize, node: &NodeRef, scope: &NodeRef) -> bool {
    let part = &parts[idx];
    if !matches_simple(&part.simple, node) {
        return false;
    }
    if idx == 0 {
        return true;
    }

    match part.combinator {
        Combinator::None => true,
        Combinator::Child => {
            parent_in_scope(node, scope).is_some_and(|p| matches_from(parts, idx - 1, &p, scope))
        }
        Combinator::Descendant => {
            let mut current = parent_in_scope(node, scope);
            while let Some(ancestor) = current {
                if matches_from(parts, idx - 1, &ancestor, scope) {
                    return true;
                }
                current = parent_in_scope(&ancestor, scope);
            }
            false
        }
    }
}

fn parent_in_scope<'a>(node: &NodeRef<'a>, scope: &NodeRef) -> Option<NodeRef<'a>> {
    dom::parent(node).filter(|p| p.id != scope.id)
}

pub(crate) fn matches_simple(simple: &SimpleSelector, node: &NodeRef) -> bool {
    let kind = dom::node_kind(node);

    if let Some(pseudo) = simple.pseudo {
        return match pseudo {
            PseudoKind::Text => kind == NodeKind::Text,
            PseudoKind::Comment => kind == NodeKind::Comment,
        };
    }
    if kind != NodeKind::Element {
        return false;
    }

    if let Some(tag) = &simple.tag {
        if !dom::has_tag(node, tag) {
            return false;
        }
    }
    if simple.id.is_none() && simple.classes.is_empty() && simple.attributes.is_empty() {
        return true;
    }

    let attrs = dom::attributes(node);
    let value_of = |name: &str| {
        attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| if v == BOOLEAN_VALUE { "" } else { v.as_str() })
    };

    if let Some(id) = &simple.id {
        if value_of("id") != Some(id.as_str()) {
            return false;
        }
    }

    if !simple.classes.is_empty() {
        let Some(class) = value_of("class") else {
            return false;
        };
        let tokens: Vec<&str> = class.split_whitespace().collect();
        if !simple.classes.iter().all(|c| tokens.contains(&c.as_str())) {
            return false;
        }
    }

    simple
        .attributes
        .iter()
        .all(|attr| value_of(&attr.name).is_some_and(|v| matches_attribute(attr, v)))
}

fn matches_attribute(attr: &AttributeSelector, actual: &str) -> bool {
    let expected = attr.value.as_str();
    match attr.op {
        AttributeOp::Exists => true,
        AttributeOp::Equals => actual == expected,
        AttributeOp::Includes => actual.split_whitespace().any(|w| w == expected),
        AttributeOp::StartsWith => !expected.is_empty() && actual.starts_with(expected),
        AttributeOp::EndsWith => !expected.is_empty() && actual.ends_with(expected),
        AttributeOp::Substring => !expected.is_empty() && actual.contains(expected),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::find_wrapper;
    use crate::selector::compile;
    use dom_query::Document;

    fn count(html: &str, selector: &str) -> usize {
        let doc = Document::from(html);
        compile(selector).unwrap().select(&doc.root()).len()
    }

    #[test]
    fn test_tag_is_case_insensitive() {
        assert_eq!(count("<DIV>a</DIV><div>b</div>", "DiV"), 2);
    }

    #[test]
    fn test_class_is_token_match() {
        let html = r#"<p class="a big">1</p><p class="bigger">2</p>"#;
        assert_eq!(count(html, ".big"), 1);
        assert_eq!(count(html, "p.a.big"), 1);
        assert_eq!(count(html, ".a.bigger"), 0);
    }

    #[test]
    fn test_attribute_operators() {
        let html = r#"<a href="https://x.org/a.pdf" lang="en us">1</a><a href="/b">2</a><a>3</a>"#;
        assert_eq!(count(html, "a[href]"), 2);
        assert_eq!(count(html, "a[href=/b]"), 1);
        assert_eq!(count(html, "a[href^=https]"), 1);
        assert_eq!(count(html, "a[href$='.pdf']"), 1);
        assert_eq!(count(html, "a[href*=x.org]"), 1);
        assert_eq!(count(html, "a[lang~=us]"), 1);
        assert_eq!(count(html, "a[lang~=e]"), 0);
    }

    #[test]
    fn test_descendant_and_child() {
        let html = "<div><section><p>1</p></section><p>2</p></div>";
        assert_eq!(count(html, "div p"), 2);
        assert_eq!(count(html, "div > p"), 1);
        assert_eq!(count(html, "section > p"), 1);
        assert_eq!(count(html, "div > section > p"), 1);
    }

    #[test]
    fn test_descendant_backtracks() {
        let html = r#"<div class="x"><div><span><b>1</b></span></div></div>"#;
        assert_eq!(count(html, ".x div b"), 1);
        assert_eq!(count(html, ".x span b"), 1);
        assert_eq!(count(html, "span .x b"), 0);
    }

    #[test]
    fn test_scope_bounds_ancestors() {
        let doc = Document::from("<div id=\"outer\"><section><p>1</p></section></div>");
        let body = find_wrapper(&doc.root(), "body").unwrap();
        let section = dom::descendants(&body)
            .into_iter()
            .find(|n| dom::has_tag(n, "section"))
            .unwrap();

        assert_eq!(compile("p").unwrap().select(&section).len(), 1);
        assert_eq!(compile("div p").unwrap().select(&section).len(), 0);
        assert_eq!(compile("section p").unwrap().select(&section).len(), 0);
    }

    #[test]
    fn test_text_and_comment_kinds() {
        let html = "<div>a<!--b--><p>c</p> </div>";
        assert_eq!(count(html, "div text"), 3);
        assert_eq!(count(html, "comment"), 1);
        assert_eq!(count(html, "p text"), 1);
    }

    #[test]
    fn test_universal() {
        assert_eq!(count("<div><p>1</p><span>2</span></div>", "div *"), 2);
    }

    #[test]
    fn test_boolean_attribute_reads_empty() {
        let html = format!(r#"<div ui-view="{BOOLEAN_VALUE}">x</div>"#);
        assert_eq!(count(&html, "[ui-view]"), 1);
        assert_eq!(count(&html, "[ui-view='']"), 1);
    }
}
