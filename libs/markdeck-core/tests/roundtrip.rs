//! End-to-end properties of the extract / rewrite cycle.

use markdeck_core::{reconcile, Card, Config, Extractor, Identity, Patch};
use pretty_assertions::assert_eq;

fn extractor() -> Extractor {
    Extractor::new(Config::default()).unwrap()
}

fn extract(document: &str) -> Vec<Card> {
    extractor().extract(document, "Default", "Vault", "Note", &[])
}

/// Structural identity of two extraction passes.
fn shape(cards: &[Card]) -> Vec<(Identity, Vec<(String, String)>, Vec<String>)> {
    cards
        .iter()
        .map(|c| (c.identity, c.fields.clone(), c.tags.clone()))
        .collect()
}

#[test]
fn extraction_is_idempotent_through_an_empty_rewrite() {
    let docs = [
        "What is Rust? #card\nA language.\n",
        "Q :: A\n\nPrompt #card/spaced\n\nThe {x} case\n",
        "# H1\n\n## H2\n\nQ #card #tag\nA\n^1694012345678\n",
    ];
    for doc in docs {
        let first = extract(doc);
        let rewritten = Patch::new().apply(doc).unwrap();
        assert_eq!(doc, rewritten);
        let second = extract(&rewritten);
        assert_eq!(shape(&first), shape(&second), "document: {doc:?}");
    }
}

#[test]
fn created_card_round_trips_to_anchored() {
    let extractor = extractor();
    let doc = "#card\nQ\n#card\nA\n";
    let cards = extractor.extract(doc, "Default", "Vault", "Note", &[]);
    assert_eq!(cards.len(), 1);
    let card = &cards[0];
    assert_eq!(card.identity, Identity::Pending);
    assert!(card.fields[0].1.contains('Q'));
    assert!(card.fields[1].1.contains('A'));

    // No anchored ids, no snapshot: everything is a create.
    let decision = reconcile(cards.clone(), None, Vec::new());
    assert_eq!(decision.to_create.len(), 1);

    // The store assigned an id; write the anchor after the span end.
    let id = 1694012345678u64;
    let mut patch = Patch::new();
    patch.insert(
        card.span.end,
        card.anchor_text(id, extractor.config()),
    );
    let rewritten = patch.apply(doc).unwrap();

    let again = extractor.extract(&rewritten, "Default", "Vault", "Note", &[]);
    assert_eq!(again.len(), 1);
    assert_eq!(again[0].identity, Identity::Anchored(id));
    assert_eq!(again[0].fields, card.fields);
}

#[test]
fn every_variant_round_trips_to_anchored() {
    let extractor = extractor();
    let id = 1700000000000u64;
    let docs = [
        "Q #card\nA\n",
        "Q :: A\n",
        "Prompt #card/spaced\n",
        "The {x} case\n",
    ];
    for doc in docs {
        let cards = extractor.extract(doc, "Default", "V", "N", &[]);
        assert_eq!(cards.len(), 1, "document: {doc:?}");
        let card = &cards[0];
        assert_eq!(card.identity, Identity::Pending);

        let mut patch = Patch::new();
        patch.insert(card.span.end, card.anchor_text(id, extractor.config()));
        let rewritten = patch.apply(doc).unwrap();

        let again = extractor.extract(&rewritten, "Default", "V", "N", &[]);
        assert_eq!(again.len(), 1, "rewritten: {rewritten:?}");
        assert_eq!(
            again[0].identity,
            Identity::Anchored(id),
            "rewritten: {rewritten:?}"
        );
    }
}

#[test]
fn emptied_block_is_deleted_and_disappears() {
    let extractor = extractor();
    let doc = "Q\n\n^1694012345678\nrest\n";
    let deleted = extractor.deleted_anchors(doc);
    assert_eq!(deleted.len(), 1);

    let mut patch = Patch::new();
    patch.delete(deleted[0].span);
    let rewritten = patch.apply(doc).unwrap();
    assert_eq!(rewritten, "Q\nrest\n");
    assert!(extractor.deleted_anchors(&rewritten).is_empty());
    assert!(extractor.anchored_ids(&rewritten).is_empty());
}

#[test]
fn create_and_delete_compose_in_one_pass() {
    // One pending card before an emptied anchor block: both edits apply in
    // ascending original offsets.
    let extractor = extractor();
    let doc = "Q :: A\n\n^1111111111111\ntail\n";
    let cards = extractor.extract(doc, "Default", "V", "N", &[]);
    assert_eq!(cards.len(), 1);
    let deleted = extractor.deleted_anchors(doc);
    assert_eq!(deleted.len(), 1);

    let mut patch = Patch::new();
    patch.insert(
        cards[0].span.end,
        cards[0].anchor_text(1694012345678, extractor.config()),
    );
    patch.delete(deleted[0].span);
    let rewritten = patch.sorted().apply(doc).unwrap();
    assert_eq!(rewritten, "Q :: A\n^1694012345678\ntail\n");

    let again = extractor.extract(&rewritten, "Default", "V", "N", &[]);
    assert_eq!(again.len(), 1);
    assert_eq!(again[0].identity, Identity::Anchored(1694012345678));
}
