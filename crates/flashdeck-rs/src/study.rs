//! Line-oriented study session: show a card, chat about it, integrate an
//! answer back into the card.

use anyhow::Context;
use flashdeck_rs::config::FlashdeckConfig;
use flashdeck_rs::core::{
    CompletionClient, Conversation, DeckHandle, IntegrationRequest, IntegrationSurface,
};
use flashdeck_rs::protocol::{Card, Deck};
use log::debug;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "commands: ask <question> | integrate [instructions] | flip | next | quit";

/// Run the study loop over every card in `deck`.
pub async fn run(
    handle: &DeckHandle,
    client: &CompletionClient,
    config: &FlashdeckConfig,
    deck: Deck,
) -> anyhow::Result<()> {
    if deck.cards.is_empty() {
        println!("{} has no cards", deck.name);
        return Ok(());
    }
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut surface = IntegrationSurface::from_config(&config.surface);
    println!("{HELP}");

    for card_id in deck.cards.iter().map(|card| card.id) {
        let Some(mut card) = handle.card(card_id).await? else {
            continue;
        };
        let mut conversation = Conversation::for_card(&card);
        println!("\nQ: {}", card.front);
        loop {
            let Some(line) = lines.next_line().await.context("failed to read stdin")? else {
                return Ok(());
            };
            let (command, rest) = split_command(&line);
            match command {
                "" => continue,
                "quit" | "q" => return Ok(()),
                "next" | "n" => break,
                "flip" | "f" => println!("A: {}", card.back),
                "integrate" | "i" => {
                    let Some(answer) = conversation.last_assistant().map(|message| message.id)
                    else {
                        println!("ask something first");
                        continue;
                    };
                    surface.open();
                    let ticket = surface.begin();
                    let request = IntegrationRequest {
                        card: card.clone(),
                        transcript: conversation.messages().to_vec(),
                        assistant_message_id: answer,
                        instructions: (!rest.is_empty()).then(|| rest.to_string()),
                    };
                    let result = handle.integrate(request).await;
                    surface.finish(ticket, &result, Instant::now());
                    if let Ok(updated) = &result {
                        card = updated.clone();
                        conversation.refresh_card(&card);
                        println!("Q: {}\nA: {}", card.front, card.back);
                    }
                    if let Some(notice) = surface.notice(Instant::now()) {
                        println!("[{}]", notice.text);
                    }
                }
                "ask" | "a" => ask(&mut conversation, client, config, &card, rest).await,
                _ => ask(&mut conversation, client, config, &card, line.trim()).await,
            }
        }
    }
    debug!("study session finished (deck_id={})", deck.id);
    Ok(())
}

async fn ask(
    conversation: &mut Conversation,
    client: &CompletionClient,
    config: &FlashdeckConfig,
    card: &Card,
    question: &str,
) {
    match conversation
        .ask(client, card, question, config.chat.temperature)
        .await
    {
        Ok(reply) => println!("{}", reply.content),
        Err(err) => println!("[{err}]"),
    }
}

fn split_command(line: &str) -> (&str, &str) {
    let line = line.trim();
    match line.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    }
}
