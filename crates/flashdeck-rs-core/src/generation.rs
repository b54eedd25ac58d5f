//! Card generation from pasted study material.

use crate::completion::{CompletionClient, FunctionReply};
use crate::error::FlashdeckError;
use crate::prompt::{generation_function, generation_prompt};
use flashdeck_rs_config::GenerationConfig;
use flashdeck_rs_protocol::{CardDraft, ChatMessage};
use log::{debug, info};
use serde::Deserialize;
use serde_json::Value;

#[derive(Clone)]
pub struct CardGenerator {
    client: CompletionClient,
    temperature: f32,
    max_cards: usize,
}

#[derive(Deserialize)]
struct CardsArguments {
    cards: Vec<CardDraft>,
}

impl CardGenerator {
    pub fn new(client: CompletionClient, temperature: f32, max_cards: usize) -> Self {
        Self {
            client,
            temperature,
            max_cards,
        }
    }

    pub fn from_config(client: CompletionClient, config: &GenerationConfig) -> Self {
        Self::new(client, config.temperature, config.max_cards)
    }

    /// Ask the model for drafts covering `text`.
    pub async fn generate(&self, text: &str) -> Result<Vec<CardDraft>, FlashdeckError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(FlashdeckError::InvalidInput(
                "no text to generate cards from".to_string(),
            ));
        }
        let messages = vec![ChatMessage::user(generation_prompt(text, self.max_cards))];
        let reply = self
            .client
            .call_function(messages, generation_function(), self.temperature)
            .await?;
        let drafts = drafts_from_reply(reply, self.max_cards)?;
        info!(
            "generated cards (count={}, text_len={})",
            drafts.len(),
            text.len()
        );
        Ok(drafts)
    }
}

/// Decode drafts from a function reply, dropping blank cards.
pub fn drafts_from_reply(
    reply: FunctionReply,
    max_cards: usize,
) -> Result<Vec<CardDraft>, FlashdeckError> {
    let drafts = match reply {
        FunctionReply::Arguments(value) => drafts_from_value(value)?,
        FunctionReply::Content(content) => {
            debug!("function call missing, parsing content (len={})", content.len());
            let value: Value = serde_json::from_str(strip_code_fence(&content)).map_err(|err| {
                FlashdeckError::Parse(format!("generated cards are not JSON: {err}"))
            })?;
            drafts_from_value(value)?
        }
    };
    Ok(drafts
        .into_iter()
        .map(|draft| CardDraft::new(draft.front.trim(), draft.back.trim()))
        .filter(|draft| !draft.front.is_empty() && !draft.back.is_empty())
        .take(max_cards)
        .collect())
}

fn drafts_from_value(value: Value) -> Result<Vec<CardDraft>, FlashdeckError> {
    let decoded = if value.is_array() {
        serde_json::from_value::<Vec<CardDraft>>(value)
    } else {
        serde_json::from_value::<CardsArguments>(value).map(|arguments| arguments.cards)
    };
    decoded.map_err(|err| FlashdeckError::Parse(format!("unexpected card shape: {err}")))
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.strip_suffix("```").unwrap_or(body).trim()
}
