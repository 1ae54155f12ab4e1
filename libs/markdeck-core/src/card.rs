//! The card entity shared by the four shapes.

use crate::config::Config;
use crate::grammar::Span;
use crate::sync::RemoteNote;

/// Tag carried by every card produced by this tool.
pub const FRAMEWORK_TAG: &str = "markdeck";

/// Model name prefix in the remote store.
pub const MODEL_PREFIX: &str = "Markdeck";

/// Suffix of model variants carrying a `Source` field.
pub const SOURCE_MODEL_SUFFIX: &str = "-source";

/// Suffix of model variants with code-highlight support.
pub const CODE_MODEL_SUFFIX: &str = "-code";

/// Binding between a card and its remote record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Identity {
    /// Newly authored, no identifier written yet.
    Pending,
    /// A 13-digit identifier anchored in the document.
    Anchored(u64),
}

impl Identity {
    pub fn is_anchored(&self) -> bool {
        matches!(self, Identity::Anchored(_))
    }

    pub fn id(&self) -> Option<u64> {
        match self {
            Identity::Anchored(id) => Some(*id),
            Identity::Pending => None,
        }
    }
}

/// The four card shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardKind {
    Tagged,
    Inline,
    Spaced,
    Cloze,
}

impl CardKind {
    /// Fixed field keys of the shape, `Source` excluded.
    pub fn field_keys(&self) -> &'static [&'static str] {
        match self {
            CardKind::Tagged | CardKind::Inline => &["Front", "Back"],
            CardKind::Spaced => &["Prompt"],
            CardKind::Cloze => &["Text", "Extra"],
        }
    }
}

/// One extracted flashcard.
#[derive(Debug, Clone)]
pub struct Card {
    pub kind: CardKind,
    pub identity: Identity,
    /// Target collection, never empty.
    pub deck: String,
    /// Field name to rendered HTML, in the shape's fixed key order.
    pub fields: Vec<(String, String)>,
    /// Ordered tags; [`FRAMEWORK_TAG`] always first. Duplicates are kept,
    /// matching the remote add/remove tag semantics.
    pub tags: Vec<String>,
    /// Reverse marker was used (two-sided shapes only).
    pub reversed: bool,
    /// A rendered field contains a code element.
    pub contains_code: bool,
    /// Span of the match in the original document.
    pub span: Span,
    /// Untransformed question text, for diagnostics.
    pub raw_source: String,
    /// Remote tag set read back at reconcile time.
    pub old_tags: Vec<String>,
    /// Image and audio link targets collected from the raw text.
    pub media: Vec<String>,
}

impl Card {
    /// Name of the remote model this card binds to.
    pub fn model_name(&self) -> String {
        let base = match self.kind {
            CardKind::Tagged | CardKind::Inline => {
                if self.reversed {
                    "basic-reversed"
                } else {
                    "basic"
                }
            }
            CardKind::Spaced => "spaced",
            CardKind::Cloze => "cloze",
        };
        let mut name = format!("{MODEL_PREFIX}-{base}");
        if self.fields.iter().any(|(key, _)| key == "Source") {
            name.push_str(SOURCE_MODEL_SUFFIX);
        }
        if self.contains_code {
            name.push_str(CODE_MODEL_SUFFIX);
        }
        name
    }

    /// The anchor token written after the span end for a fresh identifier.
    ///
    /// Formats are bit-exact: tagged cards get a plain `^id` (the span always
    /// ends before a newline or at end of file), spaced cards get `^id`
    /// followed by a newline, cloze and next-line inline anchors are pushed
    /// onto their own line, and same-line inline anchors get a leading space.
    pub fn anchor_text(&self, id: u64, config: &Config) -> String {
        match self.kind {
            CardKind::Tagged => format!("^{id}"),
            CardKind::Spaced => format!("^{id}\n"),
            CardKind::Cloze => format!("\n^{id}"),
            CardKind::Inline => {
                let token = if config.hidden_id {
                    format!("<!--^{id}-->")
                } else {
                    format!("^{id}")
                };
                if config.inline_id {
                    format!(" {token}")
                } else {
                    format!("\n{token}")
                }
            }
        }
    }

    /// Equality predicate against the remote snapshot.
    ///
    /// A differing field cardinality means the model schema changed under the
    /// card (for example the source field was toggled); such cards cannot be
    /// reconciled automatically and are reported equal so no update is sent.
    /// Tags compare as an order-independent multiset.
    pub fn matches_remote(&self, remote: &RemoteNote) -> bool {
        if remote.fields.len() != self.fields.len() {
            return true;
        }
        for (key, value) in &self.fields {
            if remote.fields.get(key) != Some(value) {
                return false;
            }
        }
        let mut local = self.tags.clone();
        let mut seen = remote.tags.clone();
        local.sort();
        seen.sort();
        local == seen
    }

    /// Short human-readable label used in notifications.
    pub fn describe(&self) -> &str {
        &self.raw_source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn card(kind: CardKind, fields: &[(&str, &str)], tags: &[&str]) -> Card {
        Card {
            kind,
            identity: Identity::Pending,
            deck: "Default".to_string(),
            fields: fields
                .iter()
                .map(|&(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            reversed: false,
            contains_code: false,
            span: Span::new(0, 0),
            raw_source: String::new(),
            old_tags: Vec::new(),
            media: Vec::new(),
        }
    }

    fn remote(id: u64, fields: &[(&str, &str)], tags: &[&str]) -> RemoteNote {
        RemoteNote {
            id,
            fields: fields
                .iter()
                .map(|&(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[test]
    fn model_name_variants() {
        let mut c = card(CardKind::Tagged, &[("Front", ""), ("Back", "")], &[]);
        assert_eq!(c.model_name(), "Markdeck-basic");
        c.reversed = true;
        assert_eq!(c.model_name(), "Markdeck-basic-reversed");
        c.contains_code = true;
        assert_eq!(c.model_name(), "Markdeck-basic-reversed-code");

        let c = card(CardKind::Spaced, &[("Prompt", ""), ("Source", "x")], &[]);
        assert_eq!(c.model_name(), "Markdeck-spaced-source");
    }

    #[test]
    fn anchor_formats() {
        let config = Config::default();
        let c = card(CardKind::Tagged, &[], &[]);
        assert_eq!(c.anchor_text(1694012345678, &config), "^1694012345678");

        let c = card(CardKind::Spaced, &[], &[]);
        assert_eq!(c.anchor_text(1694012345678, &config), "^1694012345678\n");

        let c = card(CardKind::Cloze, &[], &[]);
        assert_eq!(c.anchor_text(1694012345678, &config), "\n^1694012345678");

        let c = card(CardKind::Inline, &[], &[]);
        assert_eq!(c.anchor_text(1694012345678, &config), "\n^1694012345678");

        let same_line = Config {
            inline_id: true,
            ..Config::default()
        };
        assert_eq!(c.anchor_text(1694012345678, &same_line), " ^1694012345678");

        let hidden = Config {
            inline_id: true,
            hidden_id: true,
            ..Config::default()
        };
        assert_eq!(
            c.anchor_text(1694012345678, &hidden),
            " <!--^1694012345678-->"
        );
    }

    #[test]
    fn matching_fields_and_tags_are_equal() {
        let c = card(
            CardKind::Tagged,
            &[("Front", "<p>Q</p>"), ("Back", "<p>A</p>")],
            &["markdeck", "a"],
        );
        let r = remote(
            1,
            &[("Front", "<p>Q</p>"), ("Back", "<p>A</p>")],
            &["a", "markdeck"],
        );
        assert!(c.matches_remote(&r));
    }

    #[test]
    fn field_drift_is_unequal() {
        let c = card(
            CardKind::Tagged,
            &[("Front", "<p>Q</p>"), ("Back", "<p>new</p>")],
            &[],
        );
        let r = remote(1, &[("Front", "<p>Q</p>"), ("Back", "<p>old</p>")], &[]);
        assert!(!c.matches_remote(&r));
    }

    #[test]
    fn tag_drift_is_unequal() {
        let c = card(CardKind::Tagged, &[("Front", "x"), ("Back", "y")], &["a"]);
        let r = remote(1, &[("Front", "x"), ("Back", "y")], &["b"]);
        assert!(!c.matches_remote(&r));
    }

    #[test]
    fn field_count_mismatch_is_treated_equal() {
        // Schema drift: the remote model has three fields, the local card
        // two. No automatic reconciliation is possible, so no update.
        let c = card(CardKind::Tagged, &[("Front", "x"), ("Back", "CHANGED")], &[]);
        let r = remote(
            1,
            &[("Front", "x"), ("Back", "old"), ("Source", "s")],
            &[],
        );
        assert!(c.matches_remote(&r));
    }
}
