//! Core flashcard engine shared by the markdeck applications.
//!
//! Provides:
//! - Pattern grammar recognizing the four card shapes (tagged, inline,
//!   spaced, cloze) and the code/math exclusion zones
//! - Heading-context resolution
//! - The extraction pipeline producing rendered, ordered cards
//! - Reconciliation of extracted cards against a remote snapshot
//! - The document rewriter persisting identifier anchors
//!
//! The crate is pure: it performs no I/O and talks to no store. Callers feed
//! it document text, a remote snapshot and a configuration, and get back
//! cards, decisions and a mutated document.

pub mod card;
pub mod config;
pub mod error;
pub mod extract;
pub mod grammar;
pub mod headings;
pub mod rewrite;
pub mod sync;
pub mod transform;

pub use card::{Card, CardKind, Identity, FRAMEWORK_TAG};
pub use config::Config;
pub use error::{ConfigError, RewriteError};
pub use extract::Extractor;
pub use grammar::{AnchorBlock, Grammar, Span};
pub use headings::{resolve_context, HeadingNode};
pub use rewrite::{deck_declaration_edit, frontmatter_deck, Edit, Patch};
pub use sync::{reconcile, tag_delta, RemoteNote, SyncDecision};
