//! The extraction pipeline: grammar matches to typed, rendered, ordered
//! cards.

use crate::card::{Card, CardKind, Identity, FRAMEWORK_TAG};
use crate::config::Config;
use crate::error::ConfigError;
use crate::grammar::{AnchorBlock, Grammar, Span};
use crate::headings::{resolve_context, HeadingNode};
use crate::transform;

/// Extraction order when matches overlap: block shapes win over line shapes.
const KIND_PRIORITY: [CardKind; 4] = [
    CardKind::Tagged,
    CardKind::Spaced,
    CardKind::Inline,
    CardKind::Cloze,
];

/// One validated configuration with its compiled grammar.
pub struct Extractor {
    config: Config,
    grammar: Grammar,
}

impl Extractor {
    /// Validate the configuration and compile the grammar.
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        config.validate()?;
        let grammar = Grammar::new(&config);
        Ok(Self { config, grammar })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    /// Extract every card of the document, ordered by ascending end offset
    /// (the order the document rewriter requires).
    ///
    /// `vault` and `note` identify the containing vault and note for deep
    /// links and the optional `Source` field; `global_tags` are the tags
    /// declared on the document's metadata line.
    pub fn extract(
        &self,
        document: &str,
        deck: &str,
        vault: &str,
        note: &str,
        global_tags: &[String],
    ) -> Vec<Card> {
        let headings = if self.config.context_aware_mode {
            self.grammar.headings(document)
        } else {
            Vec::new()
        };
        let math = self.grammar.math_zones(document);

        let mut cards: Vec<Card> = Vec::new();
        for m in self.grammar.tagged_matches(document) {
            let question = self.with_context(&headings, m.span.start, m.heading_level, &m.question);
            cards.push(self.build_card(
                CardKind::Tagged,
                deck,
                vault,
                note,
                &[&question, &m.answer],
                &[("Front", &question), ("Back", &m.answer)],
                m.reversed,
                m.span,
                m.question.clone(),
                m.tags,
                m.id,
                global_tags,
            ));
        }
        for m in self.grammar.inline_matches(document) {
            let question = self.with_context(&headings, m.span.start, m.heading_level, &m.question);
            cards.push(self.build_card(
                CardKind::Inline,
                deck,
                vault,
                note,
                &[&question, &m.answer],
                &[("Front", &question), ("Back", &m.answer)],
                m.reversed,
                m.span,
                m.question.clone(),
                m.tags,
                m.id,
                global_tags,
            ));
        }
        for m in self.grammar.spaced_matches(document) {
            let prompt = self.with_context(&headings, m.span.start, m.heading_level, &m.prompt);
            cards.push(self.build_card(
                CardKind::Spaced,
                deck,
                vault,
                note,
                &[&prompt],
                &[("Prompt", &prompt)],
                false,
                m.span,
                m.prompt.clone(),
                m.tags,
                m.id,
                global_tags,
            ));
        }
        for m in self.grammar.cloze_matches(document, &math) {
            let text = self.with_context(&headings, m.span.start, m.heading_level, &m.text);
            cards.push(self.build_card(
                CardKind::Cloze,
                deck,
                vault,
                note,
                &[&text],
                &[("Text", &text), ("Extra", "")],
                false,
                m.span,
                m.raw.clone(),
                m.tags,
                m.id,
                global_tags,
            ));
        }

        let zones = self.grammar.exclusion_zones(document);
        cards.retain(|card| !zones.iter().any(|zone| zone.contains(card.span)));

        cards = drop_overlaps(cards);
        cards.sort_by_key(|card| card.span.end);

        if !self.config.default_tag.is_empty() {
            for card in &mut cards {
                card.tags.push(self.config.default_tag.clone());
            }
        }

        cards
    }

    /// Every anchored identifier token in the document.
    pub fn anchored_ids(&self, document: &str) -> Vec<AnchorBlock> {
        self.grammar.anchors(document)
    }

    /// Anchors whose block was emptied out; their spans are what deletion
    /// removes from the document.
    pub fn deleted_anchors(&self, document: &str) -> Vec<AnchorBlock> {
        self.grammar.deleted_anchors(document)
    }

    /// Tags declared on the document's `tags:` metadata line.
    pub fn global_tags(&self, document: &str) -> Vec<String> {
        self.grammar.global_tags(document)
    }

    fn with_context(
        &self,
        headings: &[HeadingNode],
        start: usize,
        own_level: Option<u8>,
        question: &str,
    ) -> String {
        if !self.config.context_aware_mode {
            return question.to_string();
        }
        // One before the match start, so a card on a heading line does not
        // find itself.
        let chain = resolve_context(headings, start.saturating_sub(1), own_level);
        if chain.is_empty() {
            return question.to_string();
        }
        let mut parts = chain;
        parts.push(question.to_string());
        parts.join(&self.config.context_separator)
    }

    #[allow(clippy::too_many_arguments)]
    fn build_card(
        &self,
        kind: CardKind,
        deck: &str,
        vault: &str,
        note: &str,
        raw_fields: &[&str],
        fields: &[(&str, &str)],
        reversed: bool,
        span: Span,
        raw_source: String,
        match_tags: Vec<String>,
        id: Option<u64>,
        global_tags: &[String],
    ) -> Card {
        let media: Vec<String> = raw_fields
            .iter()
            .flat_map(|raw| transform::media_links(&self.grammar, raw))
            .collect();

        let mut rendered: Vec<(String, String)> = fields
            .iter()
            .map(|&(key, value)| {
                (
                    key.to_string(),
                    transform::render_field(&self.grammar, value, vault),
                )
            })
            .collect();
        if self.config.source_support {
            let link = transform::substitute_note_links(
                &self.grammar,
                &format!("[[{note}]]"),
                vault,
            );
            rendered.push(("Source".to_string(), link));
        }

        let contains_code =
            transform::contains_code(&self.grammar, rendered.iter().map(|(_, v)| v.as_str()));

        let mut tags = Vec::with_capacity(1 + global_tags.len() + match_tags.len());
        tags.push(FRAMEWORK_TAG.to_string());
        tags.extend(global_tags.iter().cloned());
        tags.extend(match_tags);

        Card {
            kind,
            identity: id.map_or(Identity::Pending, Identity::Anchored),
            deck: deck.to_string(),
            fields: rendered,
            tags,
            reversed,
            contains_code,
            span,
            raw_source,
            old_tags: Vec::new(),
            media,
        }
    }
}

/// Drop matches overlapping an already-kept one; block shapes take priority
/// at equal start positions. A match is removed whole, never truncated.
fn drop_overlaps(cards: Vec<Card>) -> Vec<Card> {
    let mut indexed: Vec<Card> = cards;
    indexed.sort_by_key(|card| {
        let priority = KIND_PRIORITY
            .iter()
            .position(|&k| k == card.kind)
            .unwrap_or(KIND_PRIORITY.len());
        (card.span.start, priority)
    });

    let mut kept: Vec<Card> = Vec::new();
    for card in indexed {
        if kept.iter().any(|k| k.span.overlaps(card.span)) {
            continue;
        }
        kept.push(card);
    }
    kept
}
