//! In-memory deck collection with whole-state persistence via a blob store.

use crate::error::FlashdeckError;
use flashdeck_rs_protocol::{BlobStore, Card, CardDraft, CardId, Deck, DeckId};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// Fixed logical name of the persisted deck collection.
pub const DECKS_KEY: &str = "decks";
/// Current on-disk schema version.
const SCHEMA_VERSION: u32 = 1;

#[derive(Serialize)]
struct SnapshotRef<'a> {
    version: u32,
    decks: &'a [Deck],
}

#[derive(Deserialize)]
struct Snapshot {
    version: u32,
    decks: Vec<Deck>,
}

/// Owner of every deck and card. All mutations go through this type.
///
/// Each mutation is applied in memory first and then persisted. A failed
/// save returns `FlashdeckError::Io` but keeps the mutation; `is_dirty`
/// reports that the in-memory state has not been saved.
pub struct CardStore {
    decks: Vec<Deck>,
    blobs: Arc<dyn BlobStore>,
    dirty: bool,
}

impl CardStore {
    /// Create an empty store over the given blob store without loading.
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            decks: Vec::new(),
            blobs,
            dirty: false,
        }
    }

    /// Create a store and load any previously saved state.
    pub fn open(blobs: Arc<dyn BlobStore>) -> Result<Self, FlashdeckError> {
        let mut store = Self::new(blobs);
        store.load_all()?;
        Ok(store)
    }

    /// All decks in creation order.
    pub fn decks(&self) -> &[Deck] {
        &self.decks
    }

    /// Look up a deck by id.
    pub fn deck(&self, deck_id: DeckId) -> Option<&Deck> {
        self.decks.iter().find(|deck| deck.id == deck_id)
    }

    /// Look up a card in any deck.
    pub fn card(&self, card_id: CardId) -> Option<&Card> {
        self.decks.iter().find_map(|deck| deck.card(card_id))
    }

    /// Id of the deck that owns the card, if any.
    pub fn deck_containing(&self, card_id: CardId) -> Option<DeckId> {
        self.decks
            .iter()
            .find(|deck| deck.contains(card_id))
            .map(|deck| deck.id)
    }

    /// Whether in-memory state differs from the last successful save.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Append a new empty deck and persist.
    ///
    /// On a save failure the deck stays in `decks()` and the error is
    /// returned.
    pub fn create_deck(&mut self, name: impl Into<String>) -> Result<Deck, FlashdeckError> {
        let deck = Deck::new(name);
        info!("created deck (deck_id={}, name_len={})", deck.id, deck.name.len());
        self.decks.push(deck.clone());
        self.dirty = true;
        self.persist()?;
        Ok(deck)
    }

    /// Append one card to a deck and persist.
    pub fn append_card(
        &mut self,
        deck_id: DeckId,
        front: impl Into<String>,
        back: impl Into<String>,
    ) -> Result<Card, FlashdeckError> {
        let deck = self.deck_mut(deck_id)?;
        let card = Card::new(front, back);
        deck.cards.push(card.clone());
        debug!("appended card (deck_id={}, card_id={})", deck_id, card.id);
        self.dirty = true;
        self.persist()?;
        Ok(card)
    }

    /// Append a batch of cards to a deck and persist.
    ///
    /// The batch is applied in a single extend, so either every card lands
    /// or none does. An empty batch changes nothing but still saves.
    pub fn append_cards(
        &mut self,
        deck_id: DeckId,
        drafts: Vec<CardDraft>,
    ) -> Result<Vec<Card>, FlashdeckError> {
        let deck = self.deck_mut(deck_id)?;
        let cards: Vec<Card> = drafts.into_iter().map(CardDraft::into_card).collect();
        deck.cards.extend(cards.iter().cloned());
        info!(
            "appended card batch (deck_id={}, count={})",
            deck_id,
            cards.len()
        );
        self.dirty = true;
        self.persist()?;
        Ok(cards)
    }

    /// Replace both sides of a card and persist.
    pub fn update_card(
        &mut self,
        deck_id: DeckId,
        card_id: CardId,
        front: impl Into<String>,
        back: impl Into<String>,
    ) -> Result<Card, FlashdeckError> {
        let deck = self.deck_mut(deck_id)?;
        let card = deck
            .cards
            .iter_mut()
            .find(|card| card.id == card_id)
            .ok_or(FlashdeckError::CardNotFound(card_id))?;
        card.front = front.into();
        card.back = back.into();
        let updated = card.clone();
        debug!(
            "updated card (deck_id={}, card_id={}, front_len={}, back_len={})",
            deck_id,
            card_id,
            updated.front.len(),
            updated.back.len()
        );
        self.dirty = true;
        self.persist()?;
        Ok(updated)
    }

    /// Replace in-memory state with the persisted collection.
    ///
    /// A missing blob loads as an empty collection. On read or decode
    /// failure the current state is left untouched.
    pub fn load_all(&mut self) -> Result<&[Deck], FlashdeckError> {
        match self.read_snapshot() {
            Ok(decks) => {
                info!("loaded decks (count={})", decks.len());
                self.decks = decks;
                self.dirty = false;
                Ok(&self.decks)
            }
            Err(err) => {
                warn!("failed to load decks, keeping current state: {err}");
                Err(err)
            }
        }
    }

    /// Serialize and save the full collection.
    pub fn persist(&mut self) -> Result<(), FlashdeckError> {
        let snapshot = SnapshotRef {
            version: SCHEMA_VERSION,
            decks: &self.decks,
        };
        let bytes = serde_json::to_vec_pretty(&snapshot)
            .map_err(|err| FlashdeckError::Parse(err.to_string()))?;
        if let Err(err) = self.blobs.write(DECKS_KEY, &bytes) {
            warn!("failed to persist decks (decks={}): {err}", self.decks.len());
            return Err(err.into());
        }
        self.dirty = false;
        Ok(())
    }

    fn deck_mut(&mut self, deck_id: DeckId) -> Result<&mut Deck, FlashdeckError> {
        self.decks
            .iter_mut()
            .find(|deck| deck.id == deck_id)
            .ok_or(FlashdeckError::DeckNotFound(deck_id))
    }

    fn read_snapshot(&self) -> Result<Vec<Deck>, FlashdeckError> {
        let Some(bytes) = self.blobs.read(DECKS_KEY)? else {
            return Ok(Vec::new());
        };
        let snapshot: Snapshot = serde_json::from_slice(&bytes)
            .map_err(|err| FlashdeckError::Parse(format!("invalid deck state: {err}")))?;
        if snapshot.version > SCHEMA_VERSION {
            return Err(FlashdeckError::Parse(format!(
                "unsupported schema version: {}",
                snapshot.version
            )));
        }
        validate_identities(&snapshot.decks)?;
        Ok(snapshot.decks)
    }
}

/// Deck ids and card ids must each be unique across the whole collection.
fn validate_identities(decks: &[Deck]) -> Result<(), FlashdeckError> {
    let mut deck_ids = HashSet::new();
    let mut card_ids = HashSet::new();
    for deck in decks {
        if !deck_ids.insert(deck.id) {
            return Err(FlashdeckError::Parse(format!("duplicate deck id: {}", deck.id)));
        }
        for card in &deck.cards {
            if !card_ids.insert(card.id) {
                return Err(FlashdeckError::Parse(format!("duplicate card id: {}", card.id)));
            }
        }
    }
    Ok(())
}
