//! Public SDK surface for Flashdeck.
//!
//! Re-exports the building blocks and wires them together the way the
//! `flashdeck` binary does, so embedders get the same setup.

/// Re-export for convenience.
pub use flashdeck_rs_config as config;
pub use flashdeck_rs_core as core;
/// Re-export for convenience.
pub use flashdeck_rs_protocol as protocol;

use anyhow::Context;
use flashdeck_rs_config::FlashdeckConfig;
use flashdeck_rs_core::{
    CardGenerator, CardStore, CompletionClient, DeckHandle, DeckService, FileBlobStore,
    IntegrationOrchestrator,
};
use flashdeck_rs_protocol::Deck;
use log::info;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Initialize env_logger with millisecond timestamps and `RUST_LOG` filters.
pub fn init_logging() {
    let _ = env_logger::builder()
        .format_timestamp_millis()
        .parse_default_env()
        .try_init();
}

/// Running deck service plus the client used for study chat.
pub struct Session {
    pub handle: DeckHandle,
    pub client: CompletionClient,
    pub task: JoinHandle<CardStore>,
}

/// Open the store under `data_dir` (or the configured location) and start
/// the deck service.
pub fn start_session(
    config: &FlashdeckConfig,
    data_dir: Option<PathBuf>,
) -> anyhow::Result<Session> {
    let data_dir = data_dir
        .or_else(|| config.storage.resolve_path())
        .context("no data directory available; set storage.path or pass --data-dir")?;
    info!("opening deck store (path={})", data_dir.display());
    let blobs = Arc::new(FileBlobStore::new(&data_dir).context("failed to open data directory")?);
    let store = CardStore::open(blobs).context("failed to load decks")?;

    let client = CompletionClient::from_config(config).context("failed to build API client")?;
    if !client.has_credential() {
        info!(
            "no API credential configured (env={}); remote features are disabled",
            config.api.api_key_env
        );
    }
    let orchestrator =
        IntegrationOrchestrator::new(client.clone(), config.integration.temperature);
    let generator = CardGenerator::from_config(client.clone(), &config.generation);
    let (handle, task) = DeckService::spawn(store, orchestrator, generator);
    Ok(Session {
        handle,
        client,
        task,
    })
}

/// Resolve a deck by exact name, then by id prefix.
pub fn select_deck<'a>(decks: &'a [Deck], selector: &str) -> Option<&'a Deck> {
    let selector = selector.trim();
    if selector.is_empty() {
        return None;
    }
    if let Some(deck) = decks.iter().find(|deck| deck.name == selector) {
        return Some(deck);
    }
    let mut matches = decks
        .iter()
        .filter(|deck| deck.id.to_string().starts_with(selector));
    match (matches.next(), matches.next()) {
        (Some(deck), None) => Some(deck),
        _ => None,
    }
}
