//! Reconciliation of extracted cards against a remote snapshot.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::card::{Card, Identity};
use crate::grammar::AnchorBlock;

/// The remote snapshot of one note, decoupled from the wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteNote {
    pub id: u64,
    /// Field name to stored value.
    pub fields: HashMap<String, String>,
    pub tags: Vec<String>,
}

/// Partition of one extraction pass into remote actions.
///
/// `to_delete` is derived from the document's orphan-anchor scan, not from
/// card entities, and is intentionally independent of the other three groups:
/// an id can appear both here and in the reconcile paths.
#[derive(Debug, Default)]
pub struct SyncDecision {
    pub to_create: Vec<Card>,
    pub to_update: Vec<Card>,
    /// Anchored locally but absent remotely; a consistency warning.
    pub not_found: Vec<Card>,
    /// Emptied anchor blocks, by document span.
    pub to_delete: Vec<AnchorBlock>,
}

/// Classify extracted cards against the remote snapshot.
///
/// With no snapshot at all (no anchored ids were present to query) every
/// card is a create. An anchored card missing from the snapshot is reported,
/// not recreated: its remote copy was deleted out of band.
pub fn reconcile(
    cards: Vec<Card>,
    snapshot: Option<&HashMap<u64, RemoteNote>>,
    deleted: Vec<AnchorBlock>,
) -> SyncDecision {
    let mut decision = SyncDecision {
        to_delete: deleted,
        ..SyncDecision::default()
    };

    let Some(snapshot) = snapshot else {
        decision.to_create = cards;
        return decision;
    };

    for mut card in cards {
        match card.identity {
            Identity::Pending => decision.to_create.push(card),
            Identity::Anchored(id) => match snapshot.get(&id) {
                None => decision.not_found.push(card),
                Some(remote) => {
                    if !card.matches_remote(remote) {
                        card.old_tags = remote.tags.clone();
                        decision.to_update.push(card);
                    }
                }
            },
        }
    }

    decision
}

/// Tag operations needed to move the remote tag set from `old` to `new`.
///
/// The remote API only exposes additive and subtractive tag calls, so the
/// whole set is never replaced. Multiset semantics: each old occurrence
/// cancels one new occurrence.
pub fn tag_delta(old: &[String], new: &[String]) -> (Vec<String>, Vec<String>) {
    let mut remaining: Vec<&String> = old.iter().collect();
    let mut additions = Vec::new();

    for tag in new {
        if let Some(pos) = remaining.iter().position(|t| *t == tag) {
            remaining.remove(pos);
        } else {
            additions.push(tag.clone());
        }
    }

    let removals = remaining.into_iter().cloned().collect();
    (additions, removals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::CardKind;
    use crate::grammar::Span;

    fn card(identity: Identity, front: &str) -> Card {
        Card {
            kind: CardKind::Tagged,
            identity,
            deck: "Default".to_string(),
            fields: vec![
                ("Front".to_string(), front.to_string()),
                ("Back".to_string(), "<p>A</p>".to_string()),
            ],
            tags: vec!["markdeck".to_string()],
            reversed: false,
            contains_code: false,
            span: Span::new(0, 0),
            raw_source: front.to_string(),
            old_tags: Vec::new(),
            media: Vec::new(),
        }
    }

    fn remote(id: u64, front: &str, tags: &[&str]) -> RemoteNote {
        RemoteNote {
            id,
            fields: [
                ("Front".to_string(), front.to_string()),
                ("Back".to_string(), "<p>A</p>".to_string()),
            ]
            .into_iter()
            .collect(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn strings(tags: &[&str]) -> Vec<String> {
        tags.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn no_snapshot_creates_everything() {
        let cards = vec![
            card(Identity::Pending, "a"),
            card(Identity::Anchored(1), "b"),
        ];
        let decision = reconcile(cards, None, Vec::new());
        assert_eq!(decision.to_create.len(), 2);
        assert!(decision.to_update.is_empty());
        assert!(decision.not_found.is_empty());
    }

    #[test]
    fn pending_cards_are_created() {
        let snapshot = HashMap::new();
        let decision = reconcile(
            vec![card(Identity::Pending, "a")],
            Some(&snapshot),
            Vec::new(),
        );
        assert_eq!(decision.to_create.len(), 1);
    }

    #[test]
    fn anchored_missing_remotely_is_a_warning() {
        let snapshot = HashMap::new();
        let decision = reconcile(
            vec![card(Identity::Anchored(7), "a")],
            Some(&snapshot),
            Vec::new(),
        );
        assert!(decision.to_create.is_empty());
        assert!(decision.to_update.is_empty());
        assert_eq!(decision.not_found.len(), 1);
    }

    #[test]
    fn drifted_card_is_updated_and_keeps_old_tags() {
        let mut snapshot = HashMap::new();
        snapshot.insert(5, remote(5, "<p>old</p>", &["markdeck", "stale"]));
        let decision = reconcile(
            vec![card(Identity::Anchored(5), "<p>new</p>")],
            Some(&snapshot),
            Vec::new(),
        );
        assert_eq!(decision.to_update.len(), 1);
        assert_eq!(decision.to_update[0].old_tags, strings(&["markdeck", "stale"]));
    }

    #[test]
    fn unchanged_card_is_skipped() {
        let mut snapshot = HashMap::new();
        snapshot.insert(5, remote(5, "<p>same</p>", &["markdeck"]));
        let decision = reconcile(
            vec![card(Identity::Anchored(5), "<p>same</p>")],
            Some(&snapshot),
            Vec::new(),
        );
        assert!(decision.to_create.is_empty());
        assert!(decision.to_update.is_empty());
        assert!(decision.not_found.is_empty());
    }

    #[test]
    fn deletion_scan_is_independent() {
        // The same id can be flagged for deletion and also reconcile as
        // not-found; neither scan suppresses the other.
        let snapshot = HashMap::new();
        let deleted = vec![AnchorBlock {
            id: 9,
            span: Span::new(0, 16),
        }];
        let decision = reconcile(
            vec![card(Identity::Anchored(9), "a")],
            Some(&snapshot),
            deleted,
        );
        assert_eq!(decision.not_found.len(), 1);
        assert_eq!(decision.to_delete.len(), 1);
        assert_eq!(decision.to_delete[0].id, 9);
    }

    #[test]
    fn tag_delta_adds_and_removes() {
        let (add, remove) = tag_delta(&strings(&["a", "b"]), &strings(&["b", "c"]));
        assert_eq!(add, strings(&["c"]));
        assert_eq!(remove, strings(&["a"]));
    }

    #[test]
    fn tag_delta_multiset_semantics() {
        let (add, remove) = tag_delta(&strings(&["a", "a"]), &strings(&["a"]));
        assert!(add.is_empty());
        assert_eq!(remove, strings(&["a"]));
    }

    #[test]
    fn tag_delta_equal_sets_are_noops() {
        let (add, remove) = tag_delta(&strings(&["x", "y"]), &strings(&["y", "x"]));
        assert!(add.is_empty());
        assert!(remove.is_empty());
    }
}
