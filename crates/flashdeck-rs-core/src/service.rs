//! Single-owner deck service.
//!
//! The [`CardStore`] lives inside one task. Callers talk to it through a
//! cloneable [`DeckHandle`] that sends [`Command`]s and awaits replies on
//! oneshot channels. Remote work (integration, generation) runs on
//! separate tasks whose results come back through the same command
//! channel, so only the owner task ever mutates the store. A result whose
//! caller has stopped waiting is dropped without touching the store.

use crate::error::FlashdeckError;
use crate::generation::CardGenerator;
use crate::orchestrator::{CardRevision, IntegrationOrchestrator, IntegrationRequest};
use crate::store::CardStore;
use flashdeck_rs_protocol::{Card, CardDraft, CardId, Deck, DeckId};
use log::{debug, info};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Capacity of the command channel.
const COMMAND_BUFFER: usize = 64;

type Reply<T> = oneshot::Sender<Result<T, FlashdeckError>>;

/// Requests handled by the owner task.
enum Command {
    CreateDeck {
        name: String,
        reply: Reply<Deck>,
    },
    AppendCard {
        deck_id: DeckId,
        front: String,
        back: String,
        reply: Reply<Card>,
    },
    AppendCards {
        deck_id: DeckId,
        drafts: Vec<CardDraft>,
        reply: Reply<Vec<Card>>,
    },
    UpdateCard {
        deck_id: DeckId,
        card_id: CardId,
        front: String,
        back: String,
        reply: Reply<Card>,
    },
    LoadAll {
        reply: Reply<Vec<Deck>>,
    },
    ListDecks {
        reply: oneshot::Sender<Vec<Deck>>,
    },
    GetCard {
        card_id: CardId,
        reply: oneshot::Sender<Option<Card>>,
    },
    Integrate {
        request: IntegrationRequest,
        reply: Reply<Card>,
    },
    ApplyRevision {
        revision: CardRevision,
        reply: Reply<Card>,
    },
    Generate {
        deck_id: DeckId,
        text: String,
        reply: Reply<Vec<Card>>,
    },
}

pub struct DeckService {
    store: CardStore,
    orchestrator: IntegrationOrchestrator,
    generator: CardGenerator,
    commands: mpsc::Receiver<Command>,
    loopback: mpsc::WeakSender<Command>,
}

impl DeckService {
    /// Move `store` into a new owner task.
    ///
    /// The task exits once every handle and in-flight remote call is gone,
    /// returning the store.
    pub fn spawn(
        store: CardStore,
        orchestrator: IntegrationOrchestrator,
        generator: CardGenerator,
    ) -> (DeckHandle, JoinHandle<CardStore>) {
        let (sender, commands) = mpsc::channel(COMMAND_BUFFER);
        let service = Self {
            store,
            orchestrator,
            generator,
            commands,
            loopback: sender.downgrade(),
        };
        let task = tokio::spawn(service.run());
        (DeckHandle { sender }, task)
    }

    async fn run(mut self) -> CardStore {
        info!("deck service started (decks={})", self.store.decks().len());
        while let Some(command) = self.commands.recv().await {
            self.handle(command);
        }
        info!("deck service stopped (dirty={})", self.store.is_dirty());
        self.store
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::CreateDeck { name, reply } => {
                let _ = reply.send(self.store.create_deck(name));
            }
            Command::AppendCard {
                deck_id,
                front,
                back,
                reply,
            } => {
                let _ = reply.send(self.store.append_card(deck_id, front, back));
            }
            Command::AppendCards {
                deck_id,
                drafts,
                reply,
            } => {
                let _ = reply.send(self.store.append_cards(deck_id, drafts));
            }
            Command::UpdateCard {
                deck_id,
                card_id,
                front,
                back,
                reply,
            } => {
                let _ = reply.send(self.store.update_card(deck_id, card_id, front, back));
            }
            Command::LoadAll { reply } => {
                let _ = reply.send(self.store.load_all().map(<[Deck]>::to_vec));
            }
            Command::ListDecks { reply } => {
                let _ = reply.send(self.store.decks().to_vec());
            }
            Command::GetCard { card_id, reply } => {
                let _ = reply.send(self.store.card(card_id).cloned());
            }
            Command::Integrate { request, reply } => self.start_integration(request, reply),
            Command::ApplyRevision { revision, reply } => {
                if reply.is_closed() {
                    debug!("dropping abandoned revision (card_id={})", revision.card_id);
                    return;
                }
                let _ = reply.send(self.orchestrator.apply(&mut self.store, &revision));
            }
            Command::Generate {
                deck_id,
                text,
                reply,
            } => self.start_generation(deck_id, text, reply),
        }
    }

    fn start_integration(&self, mut request: IntegrationRequest, reply: Reply<Card>) {
        let Some(card) = self.store.card(request.card.id) else {
            let _ = reply.send(Err(FlashdeckError::CardNotFound(request.card.id)));
            return;
        };
        request.card = card.clone();
        let Some(loopback) = self.loopback.upgrade() else {
            let _ = reply.send(Err(FlashdeckError::ServiceClosed));
            return;
        };
        let orchestrator = self.orchestrator.clone();
        debug!("spawning integration (card_id={})", request.card.id);
        tokio::spawn(async move {
            match orchestrator.prepare(&request).await {
                Ok(revision) if reply.is_closed() => {
                    debug!("integration abandoned (card_id={})", revision.card_id);
                }
                Ok(revision) => {
                    let _ = loopback
                        .send(Command::ApplyRevision { revision, reply })
                        .await;
                }
                Err(err) => {
                    let _ = reply.send(Err(err));
                }
            }
        });
    }

    fn start_generation(&self, deck_id: DeckId, text: String, reply: Reply<Vec<Card>>) {
        if self.store.deck(deck_id).is_none() {
            let _ = reply.send(Err(FlashdeckError::DeckNotFound(deck_id)));
            return;
        }
        let Some(loopback) = self.loopback.upgrade() else {
            let _ = reply.send(Err(FlashdeckError::ServiceClosed));
            return;
        };
        let generator = self.generator.clone();
        debug!("spawning generation (deck_id={}, text_len={})", deck_id, text.len());
        tokio::spawn(async move {
            match generator.generate(&text).await {
                Ok(drafts) if reply.is_closed() => {
                    debug!("generation abandoned (deck_id={}, drafts={})", deck_id, drafts.len());
                }
                Ok(drafts) => {
                    let _ = loopback
                        .send(Command::AppendCards {
                            deck_id,
                            drafts,
                            reply,
                        })
                        .await;
                }
                Err(err) => {
                    let _ = reply.send(Err(err));
                }
            }
        });
    }
}

/// Cloneable front door to the deck service.
#[derive(Clone)]
pub struct DeckHandle {
    sender: mpsc::Sender<Command>,
}

impl DeckHandle {
    pub async fn create_deck(&self, name: impl Into<String>) -> Result<Deck, FlashdeckError> {
        let name = name.into();
        self.request(|reply| Command::CreateDeck { name, reply })
            .await
    }

    pub async fn append_card(
        &self,
        deck_id: DeckId,
        front: impl Into<String>,
        back: impl Into<String>,
    ) -> Result<Card, FlashdeckError> {
        let (front, back) = (front.into(), back.into());
        self.request(|reply| Command::AppendCard {
            deck_id,
            front,
            back,
            reply,
        })
        .await
    }

    pub async fn append_cards(
        &self,
        deck_id: DeckId,
        drafts: Vec<CardDraft>,
    ) -> Result<Vec<Card>, FlashdeckError> {
        self.request(|reply| Command::AppendCards {
            deck_id,
            drafts,
            reply,
        })
        .await
    }

    pub async fn update_card(
        &self,
        deck_id: DeckId,
        card_id: CardId,
        front: impl Into<String>,
        back: impl Into<String>,
    ) -> Result<Card, FlashdeckError> {
        let (front, back) = (front.into(), back.into());
        self.request(|reply| Command::UpdateCard {
            deck_id,
            card_id,
            front,
            back,
            reply,
        })
        .await
    }

    /// Reload from persistence and return the resulting decks.
    pub async fn load_all(&self) -> Result<Vec<Deck>, FlashdeckError> {
        self.request(|reply| Command::LoadAll { reply }).await
    }

    pub async fn decks(&self) -> Result<Vec<Deck>, FlashdeckError> {
        self.query(|reply| Command::ListDecks { reply }).await
    }

    pub async fn card(&self, card_id: CardId) -> Result<Option<Card>, FlashdeckError> {
        self.query(|reply| Command::GetCard { card_id, reply }).await
    }

    /// Integrate an assistant answer into its card. The remote call runs off
    /// the owner task; the returned card is the persisted result.
    pub async fn integrate(&self, request: IntegrationRequest) -> Result<Card, FlashdeckError> {
        self.request(|reply| Command::Integrate { request, reply })
            .await
    }

    /// Generate cards from `text` and append them to the deck.
    pub async fn generate(
        &self,
        deck_id: DeckId,
        text: impl Into<String>,
    ) -> Result<Vec<Card>, FlashdeckError> {
        let text = text.into();
        self.request(|reply| Command::Generate {
            deck_id,
            text,
            reply,
        })
        .await
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> Command,
    ) -> Result<T, FlashdeckError> {
        self.query(build).await?
    }

    async fn query<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, FlashdeckError> {
        let (reply, receiver) = oneshot::channel();
        self.sender
            .send(build(reply))
            .await
            .map_err(|_| FlashdeckError::ServiceClosed)?;
        receiver.await.map_err(|_| FlashdeckError::ServiceClosed)
    }
}
