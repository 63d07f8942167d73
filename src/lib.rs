//! # domwright
//!
//! Load messy HTML, query it with CSS selectors, edit it, and write it back
//! out without the tree builder mangling what it does not understand.
//!
//! ## Quick Start
//!
//! ```rust
//! use domwright::Document;
//!
//! let mut doc = Document::new();
//! doc.load(r#"<div class="content"><div ui-view class="grid">{{ title }}</div></div>"#);
//!
//! let grid = doc.find_one(".grid");
//! assert_eq!(grid.plain_text(), "{{ title }}");
//!
//! grid.set_attribute("data-id", Some("7"));
//! assert_eq!(
//!     doc.html(),
//!     r#"<div class="content"><div ui-view class="grid" data-id="7">{{ title }}</div></div>"#
//! );
//! ```
//!
//! ## Pipeline
//!
//! - **Guard** ([`guard`]): fragile characters (`&`, `|`, `+`, `%`, `@`, and
//!   brackets inside URLs) are swapped for sentinels before parsing and
//!   swapped back after serializing.
//! - **Normalizer** ([`normalizer`]): repairs broken tags, marks bare
//!   attributes and fences `script`/`style`/template bodies away from the
//!   tree builder.
//! - **Tree** ([`dom`]): `dom_query` builds the tree; the adapter serializes
//!   it and evaluates raw `//` path queries.
//! - **Selectors** ([`selector`]): tag, `*`, `.class`, `#id`, `[attr]`,
//!   `[attr=v]` (plus `~= ^= $= *=`), descendant and child combinators,
//!   comma groups, and the `text`/`comment` node kinds.
//! - **Nodes** ([`Node`], [`Nodes`]): virtual properties with explicit
//!   getters and setters.

mod error;
mod options;
mod patterns;

/// Tree adapter over `dom_query`: navigation, serialization, path queries.
pub mod dom;

/// Reversible sentinel substitution for fragile characters.
pub mod guard;

/// Pre-parse repair and opaque-content fencing.
pub mod normalizer;

/// Selector compiler and matcher.
pub mod selector;

/// Character encoding detection and transcoding.
pub mod encoding;

/// Named operation dispatch.
pub mod dispatch;

mod document;
mod node;

// Public API - re-exports
pub use document::Document;
pub use dom::NodeKind;
pub use error::{Error, Result};
pub use node::{Node, Nodes, Property};
pub use options::Options;
pub use selector::Selector;

/// Parse `html` into a new document.
///
/// # Example
///
/// ```rust
/// let doc = domwright::str_get_html("<p>hi</p>");
/// assert_eq!(doc.find_one("p").plain_text(), "hi");
/// ```
#[must_use]
pub fn str_get_html(html: &str) -> Document {
    Document::parse(html)
}

/// Read and parse a file into a new document.
///
/// # Errors
///
/// Returns [`Error::Io`] if the file cannot be read.
pub fn file_get_html(path: impl AsRef<std::path::Path>) -> Result<Document> {
    Document::parse_file(path)
}
