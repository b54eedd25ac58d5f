//! Core flashcard engine: deck storage, the completion client, study chat,
//! card generation, and the card-integration pipeline.
//!
//! The pipeline takes an assistant answer from a study chat, asks the model
//! to merge it into the card, extracts the tagged card block from the reply,
//! and writes the result through the [`CardStore`]. [`DeckService`] owns the
//! store on a single task and exposes it through cloneable handles.

pub mod completion;
pub mod conversation;
pub mod error;
pub mod generation;
pub mod orchestrator;
pub mod parser;
pub mod prompt;
pub mod service;
pub mod state;
pub mod store;
pub mod surface;

pub use completion::{
    CompletionClient, CompletionSettings, FunctionReply, HttpTransport, RetryPolicy,
};
pub use conversation::{Conversation, prior_user_query};
pub use error::FlashdeckError;
pub use generation::CardGenerator;
pub use orchestrator::{
    CardRevision, IntegrationEvent, IntegrationEvents, IntegrationOrchestrator, IntegrationPhase,
    IntegrationRequest,
};
pub use parser::{Extraction, FieldSource, extract_card};
pub use service::{DeckHandle, DeckService};
pub use state::{FileBlobStore, MemoryBlobStore};
pub use store::CardStore;
pub use surface::{IntegrationSurface, IntegrationTicket, Notice, NoticeKind, Outcome};
