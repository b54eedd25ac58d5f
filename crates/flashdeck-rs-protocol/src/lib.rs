//! Shared data model and wire types for Flashdeck decks, cards, and chats.

mod blob;
mod chat;

pub use blob::{BlobError, BlobStore};
pub use chat::{
    ApiError, ChatChoice, ChatCompletionResponse, ChatMessage, ChatRequest, ChatTransport,
    ChoiceMessage, FunctionCallDirective, FunctionCallPayload, FunctionSpec, RequestProfile,
    TransportError,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a deck.
pub type DeckId = Uuid;
/// Unique identifier for a card.
pub type CardId = Uuid;
/// Unique identifier for a conversation message.
pub type MessageId = Uuid;

/// A front/back pair, the atomic unit of study.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Card {
    /// Card identifier, fixed for the card's lifetime.
    pub id: CardId,
    /// Question side.
    pub front: String,
    /// Answer side.
    pub back: String,
}

impl Card {
    /// Create a card with a fresh identifier.
    pub fn new(front: impl Into<String>, back: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            front: front.into(),
            back: back.into(),
        }
    }
}

/// Card content without an identity, used for batch appends and generation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CardDraft {
    pub front: String,
    pub back: String,
}

impl CardDraft {
    pub fn new(front: impl Into<String>, back: impl Into<String>) -> Self {
        Self {
            front: front.into(),
            back: back.into(),
        }
    }

    /// Assign a fresh identifier to this draft.
    pub fn into_card(self) -> Card {
        Card::new(self.front, self.back)
    }
}

/// Named, ordered collection of cards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Deck {
    /// Deck identifier.
    pub id: DeckId,
    /// Display name.
    pub name: String,
    /// Cards in insertion order.
    pub cards: Vec<Card>,
}

impl Deck {
    /// Create an empty deck with a fresh identifier.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            cards: Vec::new(),
        }
    }

    /// Look up a card in this deck.
    pub fn card(&self, card_id: CardId) -> Option<&Card> {
        self.cards.iter().find(|card| card.id == card_id)
    }

    /// Whether this deck owns the given card.
    pub fn contains(&self, card_id: CardId) -> bool {
        self.card(card_id).is_some()
    }
}

/// Speaker role for a conversation message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions for the assistant.
    System,
    /// User-authored message.
    User,
    /// Assistant-authored message.
    Assistant,
}

impl Role {
    /// Return the role as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// Message stored in a study-session transcript.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Message identifier.
    pub id: MessageId,
    /// Role that produced the message.
    pub role: Role,
    /// Message content as shown to the user.
    pub content: String,
    /// Timestamp for the message.
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Create a message stamped with the current time.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    /// Convert to the wire shape sent to the completion endpoint.
    pub fn to_chat(&self) -> ChatMessage {
        ChatMessage::new(self.role, self.content.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::{Card, CardDraft, Deck, Message, Role};
    use pretty_assertions::assert_eq;

    #[test]
    fn role_string_matches_wire_name() {
        for role in [Role::System, Role::User, Role::Assistant] {
            let value = serde_json::to_value(role).expect("serialize");
            assert_eq!(value, role.as_str());
        }
    }

    #[test]
    fn deck_finds_owned_cards() {
        let mut deck = Deck::new("Physics");
        let card = Card::new("F = ?", "$F = ma$");
        deck.cards.push(card.clone());

        assert_eq!(deck.card(card.id), Some(&card));
        assert!(deck.contains(card.id));
        assert!(!deck.contains(Card::new("a", "b").id));
    }

    #[test]
    fn drafts_get_distinct_ids() {
        let first = CardDraft::new("a", "b").into_card();
        let second = CardDraft::new("a", "b").into_card();
        assert_ne!(first.id, second.id);
        assert_eq!(first.front, second.front);
    }

    #[test]
    fn message_serializes_lowercase_role() {
        let message = Message::new(Role::Assistant, "hello");
        let value = serde_json::to_value(&message).expect("serialize");
        assert_eq!(value["role"], "assistant");
        assert_eq!(message.to_chat().content, "hello");
    }
}
