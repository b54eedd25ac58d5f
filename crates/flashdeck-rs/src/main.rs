//! Command-line shell for Flashdeck.

mod study;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use flashdeck_rs::config::FlashdeckConfig;
use flashdeck_rs::config::LayeredConfigOptions;
use flashdeck_rs::core::DeckHandle;
use flashdeck_rs::protocol::Deck;
use flashdeck_rs::{init_logging, select_deck, start_session};
use log::{debug, info};
use std::path::PathBuf;
use tokio::io::AsyncReadExt;

/// Command-line options for the flashdeck binary.
#[derive(Parser)]
#[command(name = "flashdeck", version)]
struct Cli {
    /// Optional path to a flashdeck.json5 config layered over the defaults
    #[arg(long)]
    config: Option<PathBuf>,
    /// Directory holding deck state
    #[arg(long)]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List decks
    Decks,
    /// Create a deck
    NewDeck { name: String },
    /// Append a card to a deck
    Add {
        deck: String,
        front: String,
        back: String,
    },
    /// Print every card in a deck
    Show { deck: String },
    /// Generate cards from text (a file, or stdin when omitted)
    Generate {
        deck: String,
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Study a deck and chat about its cards
    Study { deck: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let cli = Cli::parse();
    info!(
        "starting flashdeck (config_set={}, data_dir_set={})",
        cli.config.is_some(),
        cli.data_dir.is_some()
    );
    let cwd = std::env::current_dir().context("failed to resolve current working directory")?;
    let mut options = LayeredConfigOptions::new(&cwd);
    if let Some(path) = cli.config.as_ref() {
        options = options.with_runtime_path(path);
    }
    let layered =
        FlashdeckConfig::load_layered_with_options(options).context("failed to load config")?;
    debug!("layered config loaded (layers={})", layered.layers.len());
    let config = layered.config;

    let session = start_session(&config, cli.data_dir)?;
    let handle = session.handle.clone();
    match cli.command {
        Command::Decks => {
            for deck in handle.decks().await? {
                println!("{}  {} ({} cards)", short_id(&deck), deck.name, deck.cards.len());
            }
        }
        Command::NewDeck { name } => {
            let deck = handle.create_deck(name).await?;
            println!("created {} {}", short_id(&deck), deck.name);
        }
        Command::Add { deck, front, back } => {
            let deck = resolve_deck(&handle, &deck).await?;
            let card = handle.append_card(deck.id, front, back).await?;
            println!("added card {} to {}", card.id, deck.name);
        }
        Command::Show { deck } => {
            let deck = resolve_deck(&handle, &deck).await?;
            for (index, card) in deck.cards.iter().enumerate() {
                println!("{}. {}\n   {}", index + 1, card.front, card.back);
            }
        }
        Command::Generate { deck, file } => {
            let deck = resolve_deck(&handle, &deck).await?;
            let text = match file {
                Some(path) => tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("failed to read {}", path.display()))?,
                None => {
                    let mut text = String::new();
                    tokio::io::stdin()
                        .read_to_string(&mut text)
                        .await
                        .context("failed to read stdin")?;
                    text
                }
            };
            let cards = handle.generate(deck.id, text).await?;
            println!("generated {} cards into {}", cards.len(), deck.name);
        }
        Command::Study { deck } => {
            let deck = resolve_deck(&handle, &deck).await?;
            study::run(&handle, &session.client, &config, deck).await?;
        }
    }

    drop(handle);
    drop(session.handle);
    let store = session.task.await.context("deck service panicked")?;
    if store.is_dirty() {
        bail!("some changes could not be saved");
    }
    Ok(())
}

async fn resolve_deck(handle: &DeckHandle, selector: &str) -> anyhow::Result<Deck> {
    let decks = handle.decks().await?;
    match select_deck(&decks, selector) {
        Some(deck) => Ok(deck.clone()),
        None => bail!("no deck matches {selector:?}"),
    }
}

fn short_id(deck: &Deck) -> String {
    deck.id.to_string()[..8].to_string()
}
