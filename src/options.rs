//! Configuration options for loading documents.
//!
//! The `Options` struct controls how aggressively broken markup is repaired
//! and how undeclared byte input is decoded.

use serde::{Deserialize, Serialize};

/// Configuration options for a [`Document`](crate::Document).
///
/// All fields are public for easy configuration. Use `Default::default()`
/// for standard settings.
///
/// # Example
///
/// ```rust
/// use domwright::{Document, Options};
///
/// let options = Options {
///     keep_broken_html: true,
///     ..Options::default()
/// };
/// let mut doc = Document::with_options(options);
/// doc.load("</script><p>text</p>");
/// assert_eq!(doc.inner_html(), "</script><p>text</p>");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Keep broken markup verbatim instead of repairing it.
    ///
    /// When enabled, closing tags without a matching opener, start tags cut
    /// short by another `<`, and incomplete trailing tags are carried through
    /// to the output exactly as written. When disabled they are dropped.
    ///
    /// Default: `false`
    pub keep_broken_html: bool,

    /// Treat elements with a template `type` (`text/html`, `text/template`,
    /// `text/x-*`) as opaque, like `script` and `style`.
    ///
    /// Default: `true`
    pub fence_template_types: bool,

    /// Encoding label used for byte input that declares no charset and is not
    /// valid UTF-8.
    ///
    /// Default: `"windows-1252"`
    pub fallback_encoding: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            keep_broken_html: false,
            fence_template_types: true,
            fallback_encoding: "windows-1252".to_string(),
        }
    }
}

impl Options {
    /// Creates options with broken-markup preservation enabled.
    #[must_use]
    pub fn keep_broken() -> Self {
        Self {
            keep_broken_html: true,
            ..Self::default()
        }
    }
}
