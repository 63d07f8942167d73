//! Error types for domwright.
//!
//! Only two failure classes surface to callers: caller-contract violations
//! (unknown operations, wrong argument shapes) and resource failures while
//! loading. Malformed markup and malformed selectors degrade instead.

use std::path::PathBuf;

/// Error type for document operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The source could not be read (missing file, unreachable location).
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// Path that was passed to the load call.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A selector could not be tokenized at all.
    #[error("invalid selector `{selector}`: {reason}")]
    SelectorSyntax {
        /// The selector text as given.
        selector: String,
        /// What the tokenizer tripped on.
        reason: String,
    },

    /// An operation name that is not in the dispatch table.
    #[error("no such operation: {0}")]
    NoSuchOperation(String),

    /// An operation was called with arguments of the wrong shape.
    #[error("invalid argument for `{operation}`: {reason}")]
    InvalidArgument {
        /// Canonical name of the operation.
        operation: &'static str,
        /// Description of the mismatch.
        reason: String,
    },
}

/// Result type alias for document operations.
pub type Result<T> = std::result::Result<T, Error>;
