//! One synchronization pass over one document.
//!
//! The pass is a single logical unit: extraction, reconciliation, remote
//! edits and the write-back either complete together or the error says
//! exactly which side is now ahead. Remote card operations are best-effort
//! (one refused card does not abort the rest); a failed local write after
//! successful remote edits is the one error treated as more severe than the
//! rest, because it leaves the note and the store out of sync.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use thiserror::Error;
use tracing::{debug, info, warn};

use markdeck_core::card::Card;
use markdeck_core::{
    deck_declaration_edit, frontmatter_deck, reconcile, Config, ConfigError, Extractor, Patch,
    RemoteNote, RewriteError,
};

use crate::anki::{AnkiClient, AnkiError};
use crate::vault;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Anki is not reachable; is it running with AnkiConnect installed? ({0})")]
    Connectivity(AnkiError),

    #[error("AnkiConnect answered with an unsupported protocol version")]
    Version,

    #[error("could not read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("remote snapshot query failed: {0}")]
    Snapshot(AnkiError),

    #[error("rewrite failed: {0}")]
    Rewrite(#[from] RewriteError),

    #[error(
        "remote edits for {path} succeeded but the document could not be \
         written back; the note and Anki are now out of sync: {source}"
    )]
    LocalWrite { path: PathBuf, source: io::Error },
}

/// Outcome of one pass, counted in remote cards (a reversed note counts
/// twice, the way the store materializes it).
#[derive(Debug, Default)]
pub struct PassReport {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    /// Ids anchored locally but missing remotely.
    pub not_found: Vec<u64>,
    pub notifications: Vec<String>,
    /// The document was rewritten on disk.
    pub changed: bool,
}

pub struct SyncSession {
    anki: AnkiClient,
    extractor: Extractor,
}

impl SyncSession {
    pub fn new(config: Config, endpoint: impl Into<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            anki: AnkiClient::new(endpoint),
            extractor: Extractor::new(config)?,
        })
    }

    pub fn config(&self) -> &Config {
        self.extractor.config()
    }

    /// Connectivity check and one-time provisioning. Aborts the whole run
    /// before any document is parsed when the store is unreachable.
    pub async fn prepare(&self) -> Result<(), SessionError> {
        match self.anki.ping().await {
            Ok(true) => {}
            Ok(false) => return Err(SessionError::Version),
            Err(err) => return Err(SessionError::Connectivity(err)),
        }

        if let Err(err) = self.anki.request_permission().await {
            debug!(error = %err, "permission request failed");
        }

        let config = self.config();
        if let Err(err) = self
            .anki
            .create_models(config.source_support, config.code_highlight_support)
            .await
        {
            warn!(error = %err, "model provisioning failed");
        }
        if config.code_highlight_support {
            if let Err(err) = self.anki.ensure_code_highlight_assets().await {
                warn!(error = %err, "could not store code highlight media");
            }
        }
        Ok(())
    }

    /// Synchronize one note. `vault_root` scopes deck derivation and media
    /// resolution; `dry_run` stops before any remote or local mutation.
    pub async fn sync_file(
        &self,
        vault_root: &Path,
        file: &Path,
        dry_run: bool,
    ) -> Result<PassReport, SessionError> {
        let mut report = PassReport::default();

        let mut document = fs::read_to_string(file).map_err(|source| SessionError::Read {
            path: file.to_path_buf(),
            source,
        })?;
        if !document.ends_with('\n') {
            document.push('\n');
        }

        let config = self.config();
        let deck = frontmatter_deck(&document)
            .or_else(|| {
                if config.folder_based_deck {
                    vault::folder_deck(vault_root, file)
                } else {
                    None
                }
            })
            .unwrap_or_else(|| config.deck.clone());
        let vault = vault::vault_name(vault_root);
        let note = vault::note_name(file);

        let global_tags = self.extractor.global_tags(&document);
        let cards = self
            .extractor
            .extract(&document, &deck, &vault, &note, &global_tags);
        let anchors = self.extractor.anchored_ids(&document);
        let deleted = self.extractor.deleted_anchors(&document);
        debug!(
            file = %file.display(),
            cards = cards.len(),
            anchors = anchors.len(),
            deleted = deleted.len(),
            "extraction finished"
        );

        if dry_run {
            let pending = cards.iter().filter(|c| !c.identity.is_anchored()).count();
            report.notifications.push(format!(
                "{}: {} cards ({} pending, {} anchored), {} emptied blocks",
                file.display(),
                cards.len(),
                pending,
                cards.len() - pending,
                deleted.len(),
            ));
            return Ok(report);
        }

        if let Err(err) = self.anki.create_deck(&deck).await {
            warn!(deck = %deck, error = %err, "could not ensure deck");
        }

        // Media are re-stored on every run; the store overwrites by filename.
        self.upload_media(vault_root, &cards, &mut report).await;

        // Snapshot only exists when anchored ids were present to query.
        let mut ids: Vec<u64> = anchors.iter().map(|a| a.id).collect();
        ids.sort_unstable();
        ids.dedup();
        let snapshot = if ids.is_empty() {
            None
        } else {
            Some(
                self.anki
                    .notes_info(&ids)
                    .await
                    .map_err(SessionError::Snapshot)?,
            )
        };

        // Remote card ids of our anchored cards, for the deck-move check.
        let note_card_ids: Vec<u64> = match &snapshot {
            Some(snapshot) => cards
                .iter()
                .filter_map(|c| c.identity.id())
                .filter_map(|id| snapshot.get(&id))
                .flat_map(|entry| entry.cards.iter().copied())
                .collect(),
            None => Vec::new(),
        };

        let remote_notes: Option<HashMap<u64, RemoteNote>> = snapshot.map(|s| {
            s.into_iter()
                .map(|(id, entry)| (id, entry.note))
                .collect()
        });

        let decision = reconcile(cards, remote_notes.as_ref(), deleted);
        for card in &decision.not_found {
            if let Some(id) = card.identity.id() {
                report.not_found.push(id);
                report
                    .notifications
                    .push(format!("Error: card with ID {id} is not in Anki!"));
            }
        }

        let mut patch = Patch::new();

        // Deletions, updates, then creations, all best-effort.
        if !decision.to_delete.is_empty() {
            let ids: Vec<u64> = decision.to_delete.iter().map(|a| a.id).collect();
            match self.anki.delete_notes(&ids).await {
                Ok(()) => {
                    for anchor in &decision.to_delete {
                        patch.delete(anchor.span);
                    }
                    report.deleted = ids.len();
                    report
                        .notifications
                        .push(format!("Deleted {} emptied cards.", ids.len()));
                }
                Err(err) => report
                    .notifications
                    .push(format!("Error: could not delete cards: {err}")),
            }
        }

        if !decision.to_update.is_empty() {
            match self.anki.update_cards(&decision.to_update).await {
                Ok(()) => {
                    report.updated = decision.to_update.len();
                    report.notifications.push(format!(
                        "Updated {0}/{0} cards.",
                        decision.to_update.len()
                    ));
                }
                Err(err) => report
                    .notifications
                    .push(format!("Error: could not update cards: {err}")),
            }
        }

        let mut created_any = false;
        if !decision.to_create.is_empty() {
            match self.anki.add_notes(&decision.to_create).await {
                Ok(assigned) => {
                    let mut inserted = 0usize;
                    let mut total = 0usize;
                    for (card, id) in decision.to_create.iter().zip(assigned) {
                        let weight = if card.reversed { 2 } else { 1 };
                        total += weight;
                        match id {
                            Some(id) => {
                                inserted += weight;
                                created_any = true;
                                // Cards that already carry an anchor keep it;
                                // only fresh ones get the token written.
                                if !card.identity.is_anchored() {
                                    patch.insert(card.span.end, card.anchor_text(id, config));
                                }
                            }
                            None => report.notifications.push(format!(
                                "Error: could not add card '{}'",
                                card.describe()
                            )),
                        }
                    }
                    report.created = inserted;
                    report
                        .notifications
                        .push(format!("Inserted {inserted}/{total} cards."));
                }
                Err(err) => report
                    .notifications
                    .push(format!("Error: could not create cards: {err}")),
            }
        }

        // Keep the front-matter deck declaration in step once cards exist.
        if created_any {
            if let Some(edit) = deck_declaration_edit(&document, &deck) {
                patch.push(edit);
            }
        }

        // Move remote cards when the recorded deck changed under them.
        if !note_card_ids.is_empty() {
            match self.anki.cards_info(&note_card_ids).await {
                Ok(infos) => {
                    if infos.first().is_some_and(|info| info.deck_name != deck) {
                        match self.anki.change_deck(&note_card_ids, &deck).await {
                            Ok(()) => report
                                .notifications
                                .push(format!("Moved cards to deck '{deck}'.")),
                            Err(err) => report
                                .notifications
                                .push(format!("Error: could not move cards: {err}")),
                        }
                    }
                }
                Err(err) => debug!(error = %err, "deck check failed"),
            }
        }

        if !patch.is_empty() {
            let rewritten = patch.sorted().apply(&document)?;
            fs::write(file, &rewritten).map_err(|source| SessionError::LocalWrite {
                path: file.to_path_buf(),
                source,
            })?;
            report.changed = true;
        }

        if report.notifications.is_empty() {
            report
                .notifications
                .push("Nothing to do. Everything is up to date.".to_string());
        }
        info!(
            file = %file.display(),
            created = report.created,
            updated = report.updated,
            deleted = report.deleted,
            "pass finished"
        );
        Ok(report)
    }

    async fn upload_media(&self, vault_root: &Path, cards: &[Card], report: &mut PassReport) {
        let mut files: Vec<(String, String)> = Vec::new();
        for card in cards {
            for name in &card.media {
                let Some(path) = vault::resolve_media(vault_root, name) else {
                    report
                        .notifications
                        .push(format!("Error: could not find media '{name}'"));
                    continue;
                };
                match fs::read(&path) {
                    // Stored under the referenced name verbatim, so the
                    // rendered <img>/[sound:] references resolve.
                    Ok(bytes) => files.push((name.clone(), BASE64.encode(bytes))),
                    Err(err) => report
                        .notifications
                        .push(format!("Error: could not read media '{name}': {err}")),
                }
            }
        }
        if let Err(err) = self.anki.store_media_files(&files).await {
            report
                .notifications
                .push(format!("Error: could not upload media: {err}"));
        }
    }
}
