//! Selector Infrastructure
//!
//! Compiles selector text and evaluates it against the tree. Matching never
//! uses the engine's own selector support: text and comment nodes need to be
//! selectable, and attribute values are compared in their guarded form.

use dom_query::NodeRef;

use crate::dom;

mod matcher;
pub mod parser;

pub use parser::{compile, Selector};

use parser::SelectorKind;

/// A predicate over tree nodes.
pub type Rule<'r> = &'r dyn Fn(&NodeRef) -> bool;

/// Query for the first descendant matching the rule.
///
/// Iterates all proper descendants of `root` in document order, text and
/// comment nodes included.
#[must_use]
pub fn query<'a>(root: &NodeRef<'a>, rule: Rule) -> Option<NodeRef<'a>> {
    dom::descendants(root).into_iter().find(|n| rule(n))
}

/// Query for all descendants matching the rule, in document order.
///
/// # Example
///
/// ```rust
/// use dom_query::Document;
/// use domwright::{dom, selector};
///
/// let doc = Document::from(r#"<div><p class="item">1</p><p class="item">2</p></div>"#);
/// let items = selector::query_all(&doc.root(), &|n| {
///     dom::get_attribute(n, "class").as_deref() == Some("item")
/// });
/// assert_eq!(items.len(), 2);
/// ```
#[must_use]
pub fn query_all<'a>(root: &NodeRef<'a>, rule: Rule) -> Vec<NodeRef<'a>> {
    dom::descendants(root).into_iter().filter(|n| rule(n)).collect()
}

impl Selector {
    /// Compile selector text. See [`compile`].
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::SelectorSyntax`] when the text cannot be tokenized.
    pub fn parse(text: &str) -> crate::Result<Self> {
        compile(text)
    }

    /// The selector text as given.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether this is a raw `//` path query.
    #[must_use]
    pub fn is_path(&self) -> bool {
        matches!(self.kind, SelectorKind::Path(_))
    }

    /// Every proper descendant of `scope` matched by any group, in document
    /// order and without duplicates.
    #[must_use]
    pub fn select<'a>(&self, scope: &NodeRef<'a>) -> Vec<NodeRef<'a>> {
        match &self.kind {
            SelectorKind::Path(Some(path)) => path.evaluate(scope),
            SelectorKind::Path(None) => Vec::new(),
            SelectorKind::Groups(groups) => query_all(scope, &|node| {
                groups.iter().any(|g| matcher::matches_group(g, node, scope))
            }),
        }
    }

    /// The first match in document order.
    #[must_use]
    pub fn select_first<'a>(&self, scope: &NodeRef<'a>) -> Option<NodeRef<'a>> {
        match &self.kind {
            SelectorKind::Groups(groups) => query(scope, &|node| {
                groups.iter().any(|g| matcher::matches_group(g, node, scope))
            }),
            SelectorKind::Path(_) => self.select(scope).into_iter().next(),
        }
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

impl std::str::FromStr for Selector {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        compile(s)
    }
}
