//! Card-integration pipeline: compose, complete, parse, apply.
//!
//! The pipeline is split in two so the store owner never waits on the
//! network. [`IntegrationOrchestrator::prepare`] runs every step that needs
//! only the card and transcript and yields a [`CardRevision`];
//! [`IntegrationOrchestrator::apply`] writes that revision into a
//! [`CardStore`]. Nothing touches the store before the apply step, so any
//! earlier failure leaves persisted state as it was.

use crate::completion::CompletionClient;
use crate::conversation::prior_user_query;
use crate::error::FlashdeckError;
use crate::parser::{Extraction, extract_card};
use crate::prompt::{IntegrationPrompt, integration_prompt, integration_system_prompt};
use crate::store::CardStore;
use flashdeck_rs_protocol::{Card, CardId, ChatMessage, Message, MessageId, Role};
use log::{debug, info, warn};
use tokio::sync::mpsc::UnboundedSender;

/// Pipeline phase, emitted on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrationPhase {
    Composing,
    AwaitingResponse,
    Parsing,
    Applying,
    Succeeded,
    Failed,
}

impl IntegrationPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntegrationPhase::Composing => "composing",
            IntegrationPhase::AwaitingResponse => "awaiting_response",
            IntegrationPhase::Parsing => "parsing",
            IntegrationPhase::Applying => "applying",
            IntegrationPhase::Succeeded => "succeeded",
            IntegrationPhase::Failed => "failed",
        }
    }
}

/// Phase transition for one card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrationEvent {
    pub card_id: CardId,
    pub phase: IntegrationPhase,
    /// Error text for `Failed`.
    pub detail: Option<String>,
}

/// Sink for phase transitions.
pub type IntegrationEvents = UnboundedSender<IntegrationEvent>;

/// Everything needed to integrate one assistant answer into a card.
#[derive(Debug, Clone)]
pub struct IntegrationRequest {
    /// Card as currently shown to the user.
    pub card: Card,
    /// Study transcript containing the selected assistant message.
    pub transcript: Vec<Message>,
    pub assistant_message_id: MessageId,
    /// Optional free-text instructions from the user.
    pub instructions: Option<String>,
}

/// New card content produced by a successful prepare step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardRevision {
    pub card_id: CardId,
    /// Card sides the revision was composed from.
    pub base_front: String,
    pub base_back: String,
    pub front: String,
    pub back: String,
    pub extraction: Extraction,
}

#[derive(Clone)]
pub struct IntegrationOrchestrator {
    client: CompletionClient,
    temperature: f32,
    events: Option<IntegrationEvents>,
}

impl IntegrationOrchestrator {
    pub fn new(client: CompletionClient, temperature: f32) -> Self {
        Self {
            client,
            temperature,
            events: None,
        }
    }

    /// Report phase transitions to `events`.
    pub fn with_events(mut self, events: IntegrationEvents) -> Self {
        self.events = Some(events);
        self
    }

    /// Compose the prompt, call the model, and parse its answer.
    pub async fn prepare(
        &self,
        request: &IntegrationRequest,
    ) -> Result<CardRevision, FlashdeckError> {
        let card_id = request.card.id;
        match self.prepare_inner(request).await {
            Ok(revision) => Ok(revision),
            Err(err) => {
                self.fail(card_id, &err);
                Err(err)
            }
        }
    }

    /// Write a prepared revision into the deck that owns the card.
    ///
    /// Fails with [`FlashdeckError::CardChanged`] when the stored card no
    /// longer matches the sides the revision was composed from.
    pub fn apply(
        &self,
        store: &mut CardStore,
        revision: &CardRevision,
    ) -> Result<Card, FlashdeckError> {
        self.emit(revision.card_id, IntegrationPhase::Applying);
        let result = match store.deck_containing(revision.card_id) {
            Some(deck_id) => {
                let unchanged = store.card(revision.card_id).is_some_and(|card| {
                    card.front == revision.base_front && card.back == revision.base_back
                });
                if unchanged {
                    store.update_card(
                        deck_id,
                        revision.card_id,
                        revision.front.clone(),
                        revision.back.clone(),
                    )
                } else {
                    Err(FlashdeckError::CardChanged(revision.card_id))
                }
            }
            None => Err(FlashdeckError::CardNotFound(revision.card_id)),
        };
        match result {
            Ok(card) => {
                info!(
                    "integrated card (card_id={}, front={:?}, back={:?})",
                    card.id, revision.extraction.front_source, revision.extraction.back_source
                );
                self.emit(card.id, IntegrationPhase::Succeeded);
                Ok(card)
            }
            Err(err) => {
                self.fail(revision.card_id, &err);
                Err(err)
            }
        }
    }

    /// Run the whole pipeline against `store`.
    pub async fn integrate(
        &self,
        store: &mut CardStore,
        request: &IntegrationRequest,
    ) -> Result<Card, FlashdeckError> {
        let revision = self.prepare(request).await?;
        self.apply(store, &revision)
    }

    async fn prepare_inner(
        &self,
        request: &IntegrationRequest,
    ) -> Result<CardRevision, FlashdeckError> {
        let card = &request.card;
        self.emit(card.id, IntegrationPhase::Composing);
        let assistant = request
            .transcript
            .iter()
            .find(|message| message.id == request.assistant_message_id)
            .filter(|message| message.role == Role::Assistant)
            .ok_or_else(|| {
                FlashdeckError::InvalidInput(format!(
                    "no assistant message {} in transcript",
                    request.assistant_message_id
                ))
            })?;
        let question = prior_user_query(&request.transcript, assistant.id);
        let prompt = integration_prompt(&IntegrationPrompt {
            front: &card.front,
            back: &card.back,
            question: &question,
            response: &assistant.content,
            instructions: request.instructions.as_deref(),
        });
        debug!(
            "composed integration prompt (card_id={}, question_len={}, prompt_len={})",
            card.id,
            question.len(),
            prompt.len()
        );

        self.emit(card.id, IntegrationPhase::AwaitingResponse);
        let messages = vec![
            ChatMessage::system(integration_system_prompt()),
            ChatMessage::user(prompt),
        ];
        let response = self
            .client
            .complete_integration(messages, self.temperature)
            .await?;

        self.emit(card.id, IntegrationPhase::Parsing);
        let extraction = extract_card(&response, &card.front, &card.back);
        if extraction.is_unchanged() {
            warn!(
                "integration response had no card block (card_id={}, response_len={})",
                card.id,
                response.len()
            );
        }
        Ok(CardRevision {
            card_id: card.id,
            base_front: card.front.clone(),
            base_back: card.back.clone(),
            front: extraction.front.clone(),
            back: extraction.back.clone(),
            extraction,
        })
    }

    fn emit(&self, card_id: CardId, phase: IntegrationPhase) {
        debug!("integration phase (card_id={card_id}, phase={})", phase.as_str());
        self.send(IntegrationEvent {
            card_id,
            phase,
            detail: None,
        });
    }

    fn fail(&self, card_id: CardId, err: &FlashdeckError) {
        warn!("integration failed (card_id={}): {err}", card_id);
        self.send(IntegrationEvent {
            card_id,
            phase: IntegrationPhase::Failed,
            detail: Some(err.to_string()),
        });
    }

    fn send(&self, event: IntegrationEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{IntegrationOrchestrator, IntegrationPhase, IntegrationRequest};
    use crate::completion::{CompletionClient, CompletionSettings};
    use crate::conversation::Conversation;
    use crate::error::FlashdeckError;
    use crate::parser::FieldSource;
    use crate::state::MemoryBlobStore;
    use crate::store::CardStore;
    use flashdeck_rs_protocol::{Card, TransportError};
    use flashdeck_rs_test_utils::{ScriptedTransport, chat_body};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    fn orchestrator(transport: Arc<ScriptedTransport>) -> IntegrationOrchestrator {
        let client = CompletionClient::new(
            transport,
            Some("sk-test".to_string()),
            CompletionSettings::immediate("m", 2),
        );
        IntegrationOrchestrator::new(client, 0.2)
    }

    fn fixture() -> (CardStore, Card, IntegrationRequest) {
        let mut store = CardStore::new(Arc::new(MemoryBlobStore::new()));
        let deck = store.create_deck("Math").expect("deck");
        let card = store.append_card(deck.id, "A", "B").expect("card");
        let mut conversation = Conversation::for_card(&card);
        conversation.push_user("Q1");
        let answer = conversation.push_assistant("A1").id;
        let request = IntegrationRequest {
            card: card.clone(),
            transcript: conversation.messages().to_vec(),
            assistant_message_id: answer,
            instructions: None,
        };
        (store, card, request)
    }

    fn network() -> Result<String, TransportError> {
        Err(TransportError::Network("reset".to_string()))
    }

    #[tokio::test]
    async fn retries_are_transparent() {
        let (mut store, card, request) = fixture();
        let transport = Arc::new(ScriptedTransport::new(vec![
            network(),
            network(),
            Ok(chat_body("<CARD><FRONT>A+</FRONT><BACK>B+</BACK></CARD>")),
        ]));
        let updated = orchestrator(transport.clone())
            .integrate(&mut store, &request)
            .await
            .expect("integrated");
        assert_eq!((updated.front.as_str(), updated.back.as_str()), ("A+", "B+"));
        assert_eq!(store.card(card.id), Some(&updated));
        assert_eq!(transport.attempts(), 3);

        let prompt = &transport.requests()[2].messages[1].content;
        assert!(prompt.contains("Student question:\nQ1"));
        assert!(prompt.contains("Tutor answer:\nA1"));
    }

    #[tokio::test]
    async fn exhausted_retries_leave_store_untouched() {
        let (mut store, card, request) = fixture();
        let before = store.decks().to_vec();
        let transport = Arc::new(ScriptedTransport::new(vec![network(), network(), network()]));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let err = orchestrator(transport)
            .with_events(tx)
            .integrate(&mut store, &request)
            .await
            .expect_err("network");
        assert_eq!(err, FlashdeckError::Network("reset".to_string()));
        assert_eq!(store.decks(), before.as_slice());

        let mut phases = Vec::new();
        while let Ok(event) = rx.try_recv() {
            assert_eq!(event.card_id, card.id);
            phases.push(event.phase);
        }
        assert_eq!(
            phases,
            vec![
                IntegrationPhase::Composing,
                IntegrationPhase::AwaitingResponse,
                IntegrationPhase::Failed
            ]
        );
    }

    #[tokio::test]
    async fn partial_response_keeps_original_back() {
        let (mut store, _card, request) = fixture();
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(chat_body(
            "<CARD><FRONT>A, expanded</FRONT></CARD>",
        ))]));
        let orchestrator = orchestrator(transport);
        let revision = orchestrator.prepare(&request).await.expect("revision");
        assert_eq!(revision.extraction.back_source, FieldSource::Retained);
        let updated = orchestrator.apply(&mut store, &revision).expect("apply");
        assert_eq!(updated.back, "B");
    }

    #[tokio::test]
    async fn card_outside_every_deck_is_not_found() {
        let (_store, _card, mut request) = fixture();
        let mut empty = CardStore::new(Arc::new(MemoryBlobStore::new()));
        let orphan = Card::new("A", "B");
        request.card = orphan.clone();
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(chat_body(
            "<CARD><FRONT>X</FRONT><BACK>Y</BACK></CARD>",
        ))]));
        let err = orchestrator(transport)
            .integrate(&mut empty, &request)
            .await
            .expect_err("orphan");
        assert_eq!(err, FlashdeckError::CardNotFound(orphan.id));
        assert!(empty.decks().is_empty());
    }

    #[tokio::test]
    async fn unknown_assistant_message_is_rejected_before_sending() {
        let (mut store, _card, mut request) = fixture();
        request.assistant_message_id = request.transcript[1].id;
        let transport = Arc::new(ScriptedTransport::new(Vec::new()));
        let err = orchestrator(transport.clone())
            .integrate(&mut store, &request)
            .await
            .expect_err("user message selected");
        assert!(matches!(err, FlashdeckError::InvalidInput(_)));
        assert_eq!(transport.attempts(), 0);
    }

    #[tokio::test]
    async fn edit_between_prepare_and_apply_is_kept() {
        let (mut store, card, request) = fixture();
        let deck_id = store.deck_containing(card.id).expect("deck");
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(chat_body(
            "<CARD><FRONT>A+</FRONT><BACK>B+</BACK></CARD>",
        ))]));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let orchestrator = orchestrator(transport).with_events(tx);
        let revision = orchestrator.prepare(&request).await.expect("revision");
        store
            .update_card(deck_id, card.id, "A", "B, edited by hand")
            .expect("manual edit");

        let err = orchestrator
            .apply(&mut store, &revision)
            .expect_err("stale revision");
        assert_eq!(err, FlashdeckError::CardChanged(card.id));
        let stored = store.card(card.id).expect("card");
        assert_eq!(
            (stored.front.as_str(), stored.back.as_str()),
            ("A", "B, edited by hand")
        );
        let last = std::iter::from_fn(|| rx.try_recv().ok()).last();
        assert_eq!(last.map(|event| event.phase), Some(IntegrationPhase::Failed));
    }
}
