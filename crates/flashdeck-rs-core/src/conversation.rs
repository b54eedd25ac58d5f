//! Study-session transcript bound to a single card.

use crate::completion::CompletionClient;
use crate::error::FlashdeckError;
use crate::prompt::{chat_system_prompt, chat_user_prompt};
use flashdeck_rs_protocol::{Card, CardId, ChatMessage, Message, MessageId, Role};
use log::debug;

/// Find the user message that precedes `assistant_id`.
///
/// Scans backward from the assistant message; returns an empty string when
/// the id is unknown or no user message comes before it.
pub fn prior_user_query(messages: &[Message], assistant_id: MessageId) -> String {
    let Some(position) = messages.iter().position(|message| message.id == assistant_id) else {
        return String::new();
    };
    messages[..position]
        .iter()
        .rev()
        .find(|message| message.role == Role::User)
        .map(|message| message.content.clone())
        .unwrap_or_default()
}

/// Append-only transcript. The first message is always the system prompt
/// of the bound card.
#[derive(Debug, Clone)]
pub struct Conversation {
    card_id: CardId,
    messages: Vec<Message>,
}

impl Conversation {
    /// Start a conversation bound to `card`.
    pub fn for_card(card: &Card) -> Self {
        Self {
            card_id: card.id,
            messages: vec![Message::new(Role::System, chat_system_prompt(card))],
        }
    }

    /// Card this transcript is about.
    pub fn card_id(&self) -> CardId {
        self.card_id
    }

    /// Switch the transcript to `card`.
    ///
    /// Binding to the same card again is a no-op; binding to a different
    /// card clears the transcript.
    pub fn bind(&mut self, card: &Card) {
        if self.card_id == card.id {
            return;
        }
        debug!("rebinding conversation (from={}, to={})", self.card_id, card.id);
        *self = Self::for_card(card);
    }

    /// Replace the system prompt after the bound card was edited.
    pub fn refresh_card(&mut self, card: &Card) {
        if self.card_id != card.id {
            return;
        }
        if let Some(system) = self
            .messages
            .first_mut()
            .filter(|message| message.role == Role::System)
        {
            system.content = chat_system_prompt(card);
        }
    }

    pub fn push_user(&mut self, content: impl Into<String>) -> &Message {
        self.push(Role::User, content)
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) -> &Message {
        self.push(Role::Assistant, content)
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn message(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|message| message.id == id)
    }

    /// Most recent assistant message.
    pub fn last_assistant(&self) -> Option<&Message> {
        self.messages
            .iter()
            .rev()
            .find(|message| message.role == Role::Assistant)
    }

    pub fn prior_user_query(&self, assistant_id: MessageId) -> String {
        prior_user_query(&self.messages, assistant_id)
    }

    /// Request messages for the next completion. The last user message is
    /// sent with card context; the transcript keeps the bare question.
    pub fn outbound(&self, card: &Card) -> Vec<ChatMessage> {
        let last_user = self
            .messages
            .iter()
            .rposition(|message| message.role == Role::User);
        self.messages
            .iter()
            .enumerate()
            .map(|(index, message)| {
                if Some(index) == last_user {
                    ChatMessage::user(chat_user_prompt(card, &message.content))
                } else {
                    message.to_chat()
                }
            })
            .collect()
    }

    /// Ask a question about `card` and append the assistant's answer.
    ///
    /// On failure the question is removed again and the error returned.
    pub async fn ask(
        &mut self,
        client: &CompletionClient,
        card: &Card,
        question: &str,
        temperature: f32,
    ) -> Result<Message, FlashdeckError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(FlashdeckError::InvalidInput("question is empty".to_string()));
        }
        self.bind(card);
        self.push_user(question);
        match client.chat(self.outbound(card), temperature).await {
            Ok(reply) => Ok(self.push_assistant(reply).clone()),
            Err(err) => {
                self.messages.pop();
                Err(err)
            }
        }
    }

    fn push(&mut self, role: Role, content: impl Into<String>) -> &Message {
        debug!("appended message (card_id={}, role={})", self.card_id, role.as_str());
        self.messages.push(Message::new(role, content));
        &self.messages[self.messages.len() - 1]
    }
}
