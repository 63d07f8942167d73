//! Native path-query evaluator for `//`-prefixed selectors.
//!
//! Supports the location-path subset that appears in practice:
//!
//! - steps joined by `/` (child) and `//` (descendant-or-self, then child);
//! - node tests `name`, `*`, `text()`, `comment()`, `node()`;
//! - predicates `[@attr]`, `[@attr='v']`, `[@attr="v"]` and `[n]`.
//!
//! Paths are evaluated relative to the scope node. An expression outside the
//! subset matches nothing.

use std::collections::HashSet;

use tracing::trace;

use super::{attributes, children, descendants, has_tag, node_kind, NodeId, NodeKind, NodeRef};
use crate::guard;

/// A parsed location path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    deep: bool,
    test: NodeTest,
    predicates: Vec<Predicate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum NodeTest {
    Name(String),
    AnyElement,
    Text,
    Comment,
    AnyNode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Predicate {
    HasAttr(String),
    /// Value is stored guard-encoded, the way the tree holds it.
    AttrEquals(String, String),
    /// 1-based position among the nodes that passed so far.
    Position(usize),
}

/// Parse a location path. Returns `None` outside the supported subset.
#[must_use]
pub fn parse(expr: &str) -> Option<Path> {
    let mut rest = expr.trim();
    let mut steps = Vec::new();

    while !rest.is_empty() {
        let deep = if let Some(r) = rest.strip_prefix("//") {
            rest = r;
            true
        } else if let Some(r) = rest.strip_prefix('/') {
            rest = r;
            false
        } else {
            return None;
        };

        let name_end = rest.find(['/', '[']).unwrap_or(rest.len());
        let test = parse_node_test(rest[..name_end].trim())?;
        rest = &rest[name_end..];

        let mut predicates = Vec::new();
        while rest.starts_with('[') {
            let close = predicate_end(rest)?;
            predicates.push(parse_predicate(rest[1..close].trim())?);
            rest = &rest[close + 1..];
        }

        steps.push(Step {
            deep,
            test,
            predicates,
        });
    }

    if steps.is_empty() {
        None
    } else {
        Some(Path { steps })
    }
}

fn parse_node_test(name: &str) -> Option<NodeTest> {
    match name {
        "" => None,
        "*" => Some(NodeTest::AnyElement),
        "text()" => Some(NodeTest::Text),
        "comment()" => Some(NodeTest::Comment),
        "node()" => Some(NodeTest::AnyNode),
        _ if name
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | ':' | '.')) =>
        {
            Some(NodeTest::Name(name.to_ascii_lowercase()))
        }
        _ => None,
    }
}

/// Offset of the `]` closing the predicate that `text` starts with.
fn predicate_end(text: &str) -> Option<usize> {
    let mut quote = None;
    for (i, ch) in text.char_indices().skip(1) {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(ch),
            (None, ']') => return Some(i),
            (None, _) => {}
        }
    }
    None
}

fn parse_predicate(body: &str) -> Option<Predicate> {
    if let Some(attr) = body.strip_prefix('@') {
        let Some((name, value)) = attr.split_once('=') else {
            return Some(Predicate::HasAttr(attr.trim().to_ascii_lowercase()));
        };
        let value = value.trim();
        let unquoted = value
            .strip_prefix('\'')
            .and_then(|v| v.strip_suffix('\''))
            .or_else(|| value.strip_prefix('"').and_then(|v| v.strip_suffix('"')))?;
        return Some(Predicate::AttrEquals(
            name.trim().to_ascii_lowercase(),
            guard::encode(unquoted),
        ));
    }

    match body.parse::<usize>() {
        Ok(n) if n >= 1 => Some(Predicate::Position(n)),
        _ => None,
    }
}

impl NodeTest {
    fn matches(&self, node: &NodeRef) -> bool {
        match self {
            Self::Name(name) => has_tag(node, name),
            Self::AnyElement => node_kind(node) == NodeKind::Element,
            Self::Text => node_kind(node) == NodeKind::Text,
            Self::Comment => node_kind(node) == NodeKind::Comment,
            Self::AnyNode => node_kind(node) != NodeKind::Other,
        }
    }
}

impl Predicate {
    fn apply<'a>(&self, nodes: Vec<NodeRef<'a>>) -> Vec<NodeRef<'a>> {
        match self {
            Self::Position(n) => nodes.into_iter().nth(n - 1).into_iter().collect(),
            Self::HasAttr(name) => nodes
                .into_iter()
                .filter(|node| attributes(node).iter().any(|(k, _)| k.eq_ignore_ascii_case(name)))
                .collect(),
            Self::AttrEquals(name, value) => nodes
                .into_iter()
                .filter(|node| attributes(node).iter().any(|(k, v)| k.eq_ignore_ascii_case(name) && v == value))
                .collect(),
        }
    }
}

impl Path {
    /// Evaluate against `scope`, returning matches in document order.
    #[must_use]
    pub fn evaluate<'a>(&self, scope: &NodeRef<'a>) -> Vec<NodeRef<'a>> {
        let mut context = vec![*scope];

        for step in &self.steps {
            let origins = if step.deep {
                with_descendants(&context)
            } else {
                context
            };

            let mut seen = HashSet::new();
            let mut next = Vec::new();
            for origin in &origins {
                let mut hits: Vec<NodeRef<'a>> = children(origin)
                    .into_iter()
                    .filter(|n| step.test.matches(n))
                    .collect();
                for predicate in &step.predicates {
                    hits = predicate.apply(hits);
                }
                next.extend(hits.into_iter().filter(|n| seen.insert(n.id)));
            }
            context = next;
        }

        let matched: HashSet<NodeId> = context.iter().map(|n| n.id).collect();
        descendants(scope)
            .into_iter()
            .filter(|n| matched.contains(&n.id))
            .collect()
    }
}

fn with_descendants<'a>(nodes: &[NodeRef<'a>]) -> Vec<NodeRef<'a>> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for node in nodes {
        if seen.insert(node.id) {
            out.push(*node);
        }
        for d in descendants(node) {
            if seen.insert(d.id) {
                out.push(d);
            }
        }
    }
    out
}

/// Parse and evaluate `expr` in one go.
#[must_use]
pub fn evaluate<'a>(scope: &NodeRef<'a>, expr: &str) -> Vec<NodeRef<'a>> {
    match parse(expr) {
        Some(path) => path.evaluate(scope),
        None => {
            trace!(expr, "unsupported path query, matching nothing");
            Vec::new()
        }
    }
}
