//! Applying identifier insertions and block deletions back to a document.
//!
//! Every edit is expressed in original-document byte offsets. [`Patch::apply`]
//! walks the immutable original buffer once, left to right, emitting
//! untouched stretches and edits in order; a later edit therefore never
//! invalidates the offsets of an earlier one, and an out-of-order edit list
//! is rejected instead of silently corrupting the output.

use crate::error::RewriteError;
use crate::grammar::Span;

/// A single edit in original-document coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    Insert { offset: usize, text: String },
    Delete { span: Span },
    Replace { span: Span, text: String },
}

impl Edit {
    fn start(&self) -> usize {
        match self {
            Edit::Insert { offset, .. } => *offset,
            Edit::Delete { span } | Edit::Replace { span, .. } => span.start,
        }
    }

    fn end(&self) -> usize {
        match self {
            Edit::Insert { offset, .. } => *offset,
            Edit::Delete { span } | Edit::Replace { span, .. } => span.end,
        }
    }
}

/// An ordered edit plan over one document.
#[derive(Debug, Default)]
pub struct Patch {
    edits: Vec<Edit>,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn insert(&mut self, offset: usize, text: impl Into<String>) {
        self.edits.push(Edit::Insert {
            offset,
            text: text.into(),
        });
    }

    pub fn delete(&mut self, span: Span) {
        self.edits.push(Edit::Delete { span });
    }

    pub fn replace(&mut self, span: Span, text: impl Into<String>) {
        self.edits.push(Edit::Replace {
            span,
            text: text.into(),
        });
    }

    pub fn push(&mut self, edit: Edit) {
        self.edits.push(edit);
    }

    /// Reorder edits by ascending original offset. Callers assembling edits
    /// from independent scans (creations and deletions) use this before
    /// [`Patch::apply`]; a plan that is still out of order afterwards is a
    /// caller bug and is rejected by `apply`.
    pub fn sorted(mut self) -> Self {
        self.edits.sort_by_key(Edit::start);
        self
    }

    /// Apply all edits, producing the mutated document.
    pub fn apply(&self, document: &str) -> Result<String, RewriteError> {
        let mut out = String::with_capacity(document.len() + 64);
        let mut cursor = 0usize;

        for edit in &self.edits {
            let (start, end) = (edit.start(), edit.end());
            if start < cursor {
                return Err(RewriteError::OutOfOrder {
                    offset: start,
                    previous: cursor,
                });
            }
            if end > document.len() {
                return Err(RewriteError::OutOfBounds {
                    offset: end,
                    len: document.len(),
                });
            }
            if !document.is_char_boundary(start) || !document.is_char_boundary(end) {
                return Err(RewriteError::NotACharBoundary { offset: start });
            }

            out.push_str(&document[cursor..start]);
            match edit {
                Edit::Insert { text, .. } => out.push_str(text),
                Edit::Delete { .. } => {}
                Edit::Replace { text, .. } => out.push_str(text),
            }
            cursor = end;
        }

        out.push_str(&document[cursor..]);
        Ok(out)
    }
}

/// The span of a leading front-matter block: `---` fences included, the
/// closing fence's newline excluded.
pub fn frontmatter_span(document: &str) -> Option<Span> {
    let body = document.strip_prefix("---\n")?;
    if let Some(close) = body.find("\n---\n") {
        return Some(Span::new(0, 4 + close + 4));
    }
    if let Some(stripped) = body.strip_suffix("\n---") {
        return Some(Span::new(0, 4 + stripped.len() + 4));
    }
    None
}

/// The `cards-deck:` value recorded in the front-matter block, if any.
pub fn frontmatter_deck(document: &str) -> Option<String> {
    let span = frontmatter_span(document)?;
    deck_line(document, span).map(|(_, value)| value)
}

/// The edit keeping the front-matter deck declaration in sync with `deck`:
/// the whole block is created when absent, a `cards-deck:` line is added to
/// an existing block, a differing recorded deck is replaced, and a matching
/// one needs no edit at all.
pub fn deck_declaration_edit(document: &str, deck: &str) -> Option<Edit> {
    match frontmatter_span(document) {
        None => Some(Edit::Insert {
            offset: 0,
            text: format!("---\ncards-deck: {deck}\n---\n\n"),
        }),
        Some(span) => match deck_line(document, span) {
            Some((_, value)) if value == deck => None,
            Some((line, _)) => Some(Edit::Replace {
                span: line,
                text: format!("cards-deck: {deck}"),
            }),
            None => Some(Edit::Insert {
                offset: span.end - 3,
                text: format!("cards-deck: {deck}\n"),
            }),
        },
    }
}

fn deck_line(document: &str, frontmatter: Span) -> Option<(Span, String)> {
    let mut offset = 0usize;
    for line in document[..frontmatter.end].split_inclusive('\n') {
        let text = line.strip_suffix('\n').unwrap_or(line);
        if let Some(rest) = text.strip_prefix("cards-deck:") {
            return Some((
                Span::new(offset, offset + text.len()),
                rest.trim().to_string(),
            ));
        }
        offset += line.len();
    }
    None
}
