//! Error types for markdeck-core.

use thiserror::Error;

/// Errors raised while validating a [`crate::config::Config`].
///
/// All of these are reported eagerly, before any document is parsed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("flashcards tag must not be empty")]
    EmptyTag,

    #[error("flashcards tag must not contain whitespace: {0:?}")]
    TagContainsWhitespace(String),

    #[error("default deck name must not be empty")]
    EmptyDeck,

    #[error("inline separator must not be empty")]
    EmptySeparator,

    #[error("inline separators must differ, both are {0:?}")]
    EqualSeparators(String),

    #[error("default tag must not contain whitespace: {0:?}")]
    DefaultTagContainsWhitespace(String),
}

/// Errors raised while applying a [`crate::rewrite::Patch`] to a document.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RewriteError {
    #[error("edit at offset {offset} is behind the previous edit end {previous}")]
    OutOfOrder { offset: usize, previous: usize },

    #[error("edit at offset {offset} is outside the document (len {len})")]
    OutOfBounds { offset: usize, len: usize },

    #[error("edit offset {offset} is not a character boundary")]
    NotACharBoundary { offset: usize },
}
