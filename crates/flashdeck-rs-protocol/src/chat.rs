//! Chat-completion wire types and the transport seam.

use crate::Role;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One role/content pair in a completion request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }
}

/// Declared function the model may be asked to call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionSpec {
    /// Function name.
    pub name: String,
    /// Human-readable purpose shown to the model.
    pub description: String,
    /// JSON Schema of the arguments object.
    pub parameters: Value,
}

/// Forces the model to call the named function.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FunctionCallDirective {
    pub name: String,
}

/// Request body for the chat-completion endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatRequest {
    /// Model identifier.
    pub model: String,
    /// Ordered conversation.
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Declared functions for function-invocation chat.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub functions: Option<Vec<FunctionSpec>>,
    /// Forced function call directive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCallDirective>,
}

impl ChatRequest {
    /// Build a plain chat request.
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: None,
            functions: None,
            function_call: None,
        }
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Declare a function and force the model to call it.
    pub fn with_forced_function(mut self, function: FunctionSpec) -> Self {
        self.function_call = Some(FunctionCallDirective {
            name: function.name.clone(),
        });
        self.functions = Some(vec![function]);
        self
    }
}

/// Successful response body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatChoice {
    pub message: ChoiceMessage,
}

/// Assistant message inside a choice.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub function_call: Option<FunctionCallPayload>,
}

/// Function call emitted by the model; `arguments` is a JSON-encoded string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionCallPayload {
    #[serde(default)]
    pub name: Option<String>,
    pub arguments: String,
}

/// Body of the `error` object reported by the API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiError {
    #[serde(default)]
    pub message: Option<String>,
}

/// Timeout profile for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestProfile {
    /// Interactive chat with default transport timeouts.
    Chat,
    /// Long prompts (integration, generation) with extended timeouts.
    Extended,
}

impl RequestProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestProfile::Chat => "chat",
            RequestProfile::Extended => "extended",
        }
    }
}

/// Transport-level failures. Everything above the socket is reported
/// through the response body instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Connection, TLS, or timeout failure.
    #[error("network error: {0}")]
    Network(String),
}

/// Sends one completion request and returns the raw response body.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// POST the request with the given bearer credential.
    ///
    /// Returns the body regardless of HTTP status so API-reported errors can
    /// be decoded by the caller.
    async fn send(
        &self,
        api_key: &str,
        request: &ChatRequest,
        profile: RequestProfile,
    ) -> Result<String, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::{ChatCompletionResponse, ChatMessage, ChatRequest, FunctionSpec};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn plain_request_omits_optional_fields() {
        let request = ChatRequest::new("gpt-4o-mini", vec![ChatMessage::user("hi")]);
        let value = serde_json::to_value(&request).expect("serialize");
        assert_eq!(
            value,
            json!({
                "model": "gpt-4o-mini",
                "messages": [{ "role": "user", "content": "hi" }],
            })
        );
    }

    #[test]
    fn forced_function_sets_directive() {
        let request = ChatRequest::new("m", Vec::new())
            .with_temperature(0.5)
            .with_forced_function(FunctionSpec {
                name: "create_flashcards".to_string(),
                description: "d".to_string(),
                parameters: json!({ "type": "object" }),
            });
        let value = serde_json::to_value(&request).expect("serialize");
        assert_eq!(value["function_call"], json!({ "name": "create_flashcards" }));
        assert_eq!(value["functions"][0]["name"], "create_flashcards");
        assert_eq!(value["temperature"], 0.5);
    }

    #[test]
    fn response_tolerates_missing_content() {
        let body = json!({
            "choices": [{ "message": { "function_call": { "arguments": "{}" } } }]
        });
        let response: ChatCompletionResponse = serde_json::from_value(body).expect("decode");
        assert_eq!(response.choices[0].message.content, None);
        assert_eq!(
            response.choices[0]
                .message
                .function_call
                .as_ref()
                .map(|call| call.arguments.as_str()),
            Some("{}")
        );
    }
}
