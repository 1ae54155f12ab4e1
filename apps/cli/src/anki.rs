//! AnkiConnect v6 client.
//!
//! Every call posts an `{action, version, params}` envelope and gets back a
//! `{result, error}` pair; a non-null error is surfaced as
//! [`AnkiError::Remote`]. Batched work (media, model provisioning, updates)
//! goes through the `multi` action so one round trip carries many edits, and
//! per-action failures inside a batch do not abort the rest.

use std::collections::HashMap;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

use markdeck_core::card::Card;
use markdeck_core::{tag_delta, RemoteNote};

use crate::templates;

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8765";

#[derive(Debug, Error)]
pub enum AnkiError {
    #[error("cannot reach AnkiConnect: {0}")]
    Network(#[from] reqwest::Error),

    #[error("AnkiConnect reported: {0}")]
    Remote(String),

    #[error("malformed AnkiConnect response: {0}")]
    Protocol(String),
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    result: Option<T>,
    error: Option<String>,
}

/// A note as `notesInfo` returns it. Unknown ids come back as empty objects,
/// which deserialize with `note_id: None` and get filtered out.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireNote {
    note_id: Option<u64>,
    #[serde(default)]
    fields: HashMap<String, WireField>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    cards: Vec<u64>,
}

#[derive(Debug, Deserialize)]
struct WireField {
    value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireCardInfo {
    pub deck_name: String,
}

/// The remote snapshot of one queried note plus its card ids.
#[derive(Debug)]
pub struct SnapshotNote {
    pub note: RemoteNote,
    pub cards: Vec<u64>,
}

pub struct AnkiClient {
    client: Client,
    endpoint: String,
}

impl AnkiClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
        }
    }

    async fn invoke<T: DeserializeOwned>(
        &self,
        action: &str,
        params: Option<Value>,
    ) -> Result<Option<T>, AnkiError> {
        let mut body = serde_json::Map::new();
        body.insert("action".to_string(), Value::String(action.to_string()));
        body.insert("version".to_string(), json!(6));
        if let Some(params) = params {
            body.insert("params".to_string(), params);
        }

        let response: ApiResponse<T> = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        if let Some(error) = response.error {
            return Err(AnkiError::Remote(error));
        }
        Ok(response.result)
    }

    async fn invoke_required<T: DeserializeOwned>(
        &self,
        action: &str,
        params: Option<Value>,
    ) -> Result<T, AnkiError> {
        self.invoke(action, params)
            .await?
            .ok_or_else(|| AnkiError::Protocol(format!("{action}: missing result")))
    }

    /// Protocol version handshake; `true` when the expected version answers.
    pub async fn ping(&self) -> Result<bool, AnkiError> {
        let version: u32 = self.invoke_required("version", None).await?;
        Ok(version == 6)
    }

    pub async fn request_permission(&self) -> Result<(), AnkiError> {
        let _: Option<Value> = self.invoke("requestPermission", None).await?;
        Ok(())
    }

    pub async fn create_deck(&self, deck: &str) -> Result<(), AnkiError> {
        let _: Option<Value> = self.invoke("createDeck", Some(json!({ "deck": deck }))).await?;
        Ok(())
    }

    /// Provision the note models this tool binds cards to. Runs as one
    /// `multi` batch; models that already exist fail individually and are
    /// ignored.
    pub async fn create_models(
        &self,
        source_support: bool,
        code_highlight_support: bool,
    ) -> Result<(), AnkiError> {
        let mut actions = templates::model_actions(source_support, false);
        if code_highlight_support {
            actions.extend(templates::model_actions(source_support, true));
        }
        let _: Option<Value> = self
            .invoke("multi", Some(json!({ "actions": actions })))
            .await?;
        Ok(())
    }

    /// Remote snapshot for the given note ids, keyed by id. Ids unknown to
    /// the store are simply absent from the result.
    pub async fn notes_info(&self, ids: &[u64]) -> Result<HashMap<u64, SnapshotNote>, AnkiError> {
        let notes: Vec<WireNote> = self
            .invoke_required("notesInfo", Some(json!({ "notes": ids })))
            .await?;
        let mut snapshot = HashMap::with_capacity(notes.len());
        for wire in notes {
            let Some(id) = wire.note_id else { continue };
            snapshot.insert(
                id,
                SnapshotNote {
                    note: RemoteNote {
                        id,
                        fields: wire
                            .fields
                            .into_iter()
                            .map(|(name, field)| (name, field.value))
                            .collect(),
                        tags: wire.tags,
                    },
                    cards: wire.cards,
                },
            );
        }
        Ok(snapshot)
    }

    pub async fn cards_info(&self, ids: &[u64]) -> Result<Vec<WireCardInfo>, AnkiError> {
        self.invoke_required("cardsInfo", Some(json!({ "cards": ids })))
            .await
    }

    /// Create notes; the returned vector corresponds positionally to the
    /// input and carries `None` for cards the store refused.
    pub async fn add_notes(&self, cards: &[Card]) -> Result<Vec<Option<u64>>, AnkiError> {
        let notes: Vec<Value> = cards.iter().map(|card| note_payload(card, None)).collect();
        self.invoke_required("addNotes", Some(json!({ "notes": notes })))
            .await
    }

    /// Push field updates, tag deltas and the deck move for already-anchored
    /// cards, bundled into one `multi` call.
    ///
    /// The store only exposes additive and subtractive tag operations, so
    /// the delta between the remembered remote tags and the new ones is sent
    /// instead of a replacement set.
    pub async fn update_cards(&self, cards: &[Card]) -> Result<(), AnkiError> {
        if cards.is_empty() {
            return Ok(());
        }

        let mut actions: Vec<Value> = Vec::new();
        let mut ids: Vec<u64> = Vec::new();

        for card in cards {
            let Some(id) = card.identity.id() else { continue };
            actions.push(json!({
                "action": "updateNoteFields",
                "params": { "note": note_payload(card, Some(id)) },
            }));

            let (additions, removals) = tag_delta(&card.old_tags, &card.tags);
            for tag in additions {
                actions.push(json!({
                    "action": "addTags",
                    "params": { "notes": [id], "tags": tag },
                }));
            }
            for tag in removals {
                actions.push(json!({
                    "action": "removeTags",
                    "params": { "notes": [id], "tags": tag },
                }));
            }
            ids.push(id);
        }

        if let Some(first) = cards.first() {
            actions.push(json!({
                "action": "changeDeck",
                "params": { "cards": ids, "deck": first.deck },
            }));
        }

        let _: Option<Value> = self
            .invoke("multi", Some(json!({ "actions": actions })))
            .await?;
        Ok(())
    }

    pub async fn change_deck(&self, ids: &[u64], deck: &str) -> Result<(), AnkiError> {
        let _: Option<Value> = self
            .invoke("changeDeck", Some(json!({ "cards": ids, "deck": deck })))
            .await?;
        Ok(())
    }

    pub async fn delete_notes(&self, ids: &[u64]) -> Result<(), AnkiError> {
        let _: Option<Value> = self
            .invoke("deleteNotes", Some(json!({ "notes": ids })))
            .await?;
        Ok(())
    }

    /// Store media files (name, base64 payload) in one batch. Existing files
    /// are overwritten, which keeps re-runs simple.
    pub async fn store_media_files(&self, files: &[(String, String)]) -> Result<(), AnkiError> {
        if files.is_empty() {
            return Ok(());
        }
        let actions: Vec<Value> = files
            .iter()
            .map(|(filename, data)| {
                json!({
                    "action": "storeMediaFile",
                    "params": { "filename": filename, "data": data },
                })
            })
            .collect();
        let _: Option<Value> = self
            .invoke("multi", Some(json!({ "actions": actions })))
            .await?;
        Ok(())
    }

    /// Store the code-highlight support media once; guarded by a probe so
    /// user-modified copies are not clobbered on every run.
    pub async fn ensure_code_highlight_assets(&self) -> Result<(), AnkiError> {
        let existing: Option<Value> = self
            .invoke(
                "retrieveMediaFile",
                Some(json!({ "filename": templates::HIGHLIGHT_INIT_NAME })),
            )
            .await?;
        if matches!(existing, Some(Value::String(_))) {
            return Ok(());
        }
        self.store_media_files(&templates::highlight_assets()).await
    }
}

fn note_payload(card: &Card, id: Option<u64>) -> Value {
    let fields: serde_json::Map<String, Value> = card
        .fields
        .iter()
        .map(|(name, value)| (name.clone(), Value::String(value.clone())))
        .collect();
    let mut note = json!({
        "deckName": card.deck,
        "modelName": card.model_name(),
        "fields": fields,
        "tags": card.tags,
    });
    if let Some(id) = id {
        note["id"] = json!(id);
    }
    note
}

#[cfg(test)]
mod tests {
    use super::*;
    use markdeck_core::card::{CardKind, Identity};
    use markdeck_core::Span;

    fn card() -> Card {
        Card {
            kind: CardKind::Tagged,
            identity: Identity::Anchored(1694012345678),
            deck: "Default".to_string(),
            fields: vec![
                ("Front".to_string(), "<p>Q</p>".to_string()),
                ("Back".to_string(), "<p>A</p>".to_string()),
            ],
            tags: vec!["markdeck".to_string()],
            reversed: false,
            contains_code: false,
            span: Span::new(0, 0),
            raw_source: "Q".to_string(),
            old_tags: Vec::new(),
            media: Vec::new(),
        }
    }

    #[test]
    fn note_payload_shape() {
        let payload = note_payload(&card(), None);
        assert_eq!(payload["deckName"], "Default");
        assert_eq!(payload["modelName"], "Markdeck-basic");
        assert_eq!(payload["fields"]["Front"], "<p>Q</p>");
        assert!(payload.get("id").is_none());
    }

    #[test]
    fn update_payload_carries_id() {
        let payload = note_payload(&card(), Some(1694012345678));
        assert_eq!(payload["id"], 1694012345678u64);
    }

    #[test]
    fn empty_response_notes_are_skipped() {
        let wire: Vec<WireNote> = serde_json::from_str(
            r#"[{}, {"noteId": 5, "fields": {"Front": {"value": "x", "order": 0}}, "tags": ["t"], "cards": [9]}]"#,
        )
        .unwrap();
        assert_eq!(wire.len(), 2);
        assert!(wire[0].note_id.is_none());
        assert_eq!(wire[1].note_id, Some(5));
        assert_eq!(wire[1].fields["Front"].value, "x");
    }
}
