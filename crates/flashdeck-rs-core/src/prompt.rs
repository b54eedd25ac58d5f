//! Prompt templates for chat, integration, and card generation.
//!
//! Every function here is pure: the same inputs always produce the same text.

use flashdeck_rs_protocol::{Card, FunctionSpec};
use serde_json::json;

const MATH_RULES: &str = "Format all mathematics with LaTeX: use $...$ for inline math and \
$$...$$ for display math. Never use \\( \\) or \\[ \\] delimiters.";

/// Name of the function used for card generation.
pub const GENERATION_FUNCTION: &str = "create_flashcards";

/// System message that anchors a study chat to one card.
pub fn chat_system_prompt(card: &Card) -> String {
    format!(
        "You are a patient tutor helping a student study a flashcard.\n\
         Front of the card: {front}\n\
         Back of the card: {back}\n\
         Answer questions about this card concisely and accurately. {MATH_RULES}",
        front = card.front,
        back = card.back,
    )
}

/// Context-enriched version of a user question, used only on the wire.
pub fn chat_user_prompt(card: &Card, question: &str) -> String {
    format!(
        "Flashcard front: {front}\n\
         Flashcard back: {back}\n\n\
         Question: {question}\n\n\
         Remember: {MATH_RULES}",
        front = card.front,
        back = card.back,
    )
}

/// Short role statement for the integration request.
pub fn integration_system_prompt() -> String {
    "You are an editor that refines flashcards. You preserve existing content and respond \
only with the requested card block."
        .to_string()
}

/// Inputs for an integration prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrationPrompt<'a> {
    pub front: &'a str,
    pub back: &'a str,
    /// User question that produced the response; may be empty.
    pub question: &'a str,
    /// Assistant answer being merged into the card.
    pub response: &'a str,
    /// Free-text user instructions replacing the default directive.
    pub instructions: Option<&'a str>,
}

/// Build the integration request text.
pub fn integration_prompt(input: &IntegrationPrompt<'_>) -> String {
    let directive = match input.instructions.map(str::trim) {
        Some(instructions) if !instructions.is_empty() => {
            format!("Apply these instructions from the student: {instructions}")
        }
        _ => "Integrate the useful information from the conversation into the card naturally."
            .to_string(),
    };
    let question = if input.question.trim().is_empty() {
        "(none)"
    } else {
        input.question
    };
    format!(
        "Update this flashcard using the conversation below.\n\n\
         Current front:\n{front}\n\n\
         Current back:\n{back}\n\n\
         Student question:\n{question}\n\n\
         Tutor answer:\n{response}\n\n\
         {directive}\n\n\
         Unless the instructions say otherwise, only ADD information. Do not remove or \
         rewrite existing content on either side of the card.\n\
         {MATH_RULES}\n\n\
         Respond with exactly this format and nothing else:\n\
         <CARD><FRONT>new front</FRONT><BACK>new back</BACK></CARD>",
        front = input.front,
        back = input.back,
        response = input.response,
    )
}

/// Prompt asking the model to turn source text into cards.
pub fn generation_prompt(text: &str, max_cards: usize) -> String {
    format!(
        "Create at most {max_cards} flashcards from the text below. Each card has a concise \
         question on the front and a complete answer on the back. {MATH_RULES}\n\n\
         Text:\n{text}"
    )
}

/// Function schema the model must call when generating cards.
pub fn generation_function() -> FunctionSpec {
    FunctionSpec {
        name: GENERATION_FUNCTION.to_string(),
        description: "Create flashcards from study material.".to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "cards": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "front": { "type": "string", "description": "Question side" },
                            "back": { "type": "string", "description": "Answer side" }
                        },
                        "required": ["front", "back"]
                    }
                }
            },
            "required": ["cards"]
        }),
    }
}
