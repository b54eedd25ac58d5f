//! Remote completion client: credentials, retry policy, and response decoding.

mod http;

pub use http::HttpTransport;

use crate::error::FlashdeckError;
use flashdeck_rs_config::FlashdeckConfig;
use flashdeck_rs_protocol::{
    ApiError, ChatCompletionResponse, ChatMessage, ChatRequest, ChatTransport,
    ChoiceMessage, FunctionSpec, RequestProfile,
};
use log::{debug, warn};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// Fixed-delay retry policy for transport failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts after the first one.
    pub extra_attempts: u32,
    /// Delay between attempts.
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(extra_attempts: u32, delay: Duration) -> Self {
        Self {
            extra_attempts,
            delay,
        }
    }

    /// Total attempts including the first.
    pub fn max_attempts(&self) -> u32 {
        self.extra_attempts.saturating_add(1)
    }
}

/// Run `attempt` until it succeeds, fails with a non-retryable error, or the
/// policy is exhausted. Attempts are strictly sequential.
pub async fn retry_transport<T, F, Fut>(
    policy: RetryPolicy,
    label: &str,
    mut attempt: F,
) -> Result<T, FlashdeckError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FlashdeckError>>,
{
    let max_attempts = policy.max_attempts();
    let mut tries = 0;
    loop {
        tries += 1;
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && tries < max_attempts => {
                warn!(
                    "{label} request failed, retrying (attempt={}, max_attempts={}): {err}",
                    tries, max_attempts
                );
                sleep(policy.delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Result of a function-invocation chat.
#[derive(Debug, Clone, PartialEq)]
pub enum FunctionReply {
    /// Decoded `function_call.arguments`.
    Arguments(Value),
    /// Plain content returned instead of a function call.
    Content(String),
}

/// Model and per-flow retry settings.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionSettings {
    pub model: String,
    pub chat_retry: RetryPolicy,
    pub integration_retry: RetryPolicy,
    pub generation_retry: RetryPolicy,
}

impl CompletionSettings {
    pub fn from_config(config: &FlashdeckConfig) -> Self {
        Self {
            model: config.api.model.clone(),
            chat_retry: RetryPolicy::new(config.chat.extra_attempts, config.chat.retry_delay()),
            integration_retry: RetryPolicy::new(
                config.integration.extra_attempts,
                config.integration.retry_delay(),
            ),
            generation_retry: RetryPolicy::new(
                config.generation.extra_attempts,
                config.generation.retry_delay(),
            ),
        }
    }

    /// Same model for every flow, no delay between attempts.
    pub fn immediate(model: impl Into<String>, extra_attempts: u32) -> Self {
        let policy = RetryPolicy::new(extra_attempts, Duration::ZERO);
        Self {
            model: model.into(),
            chat_retry: policy,
            integration_retry: policy,
            generation_retry: policy,
        }
    }
}

/// Client for the chat-completion endpoint.
#[derive(Clone)]
pub struct CompletionClient {
    transport: Arc<dyn ChatTransport>,
    api_key: Option<String>,
    settings: CompletionSettings,
}

impl CompletionClient {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        api_key: Option<String>,
        settings: CompletionSettings,
    ) -> Self {
        Self {
            transport,
            api_key,
            settings,
        }
    }

    /// Build an HTTP-backed client from configuration.
    pub fn from_config(config: &FlashdeckConfig) -> Result<Self, FlashdeckError> {
        let transport = HttpTransport::from_config(config)?;
        Ok(Self::new(
            Arc::new(transport),
            config.api.resolve_api_key(),
            CompletionSettings::from_config(config),
        ))
    }

    /// Whether a non-blank credential is configured.
    pub fn has_credential(&self) -> bool {
        self.credential().is_ok()
    }

    /// Freeform chat returning the assistant's text.
    pub async fn chat(
        &self,
        messages: Vec<ChatMessage>,
        temperature: f32,
    ) -> Result<String, FlashdeckError> {
        let request =
            ChatRequest::new(&self.settings.model, messages).with_temperature(temperature);
        let message = self
            .send(&request, RequestProfile::Chat, self.settings.chat_retry, "chat")
            .await?;
        decode_content(message)
    }

    /// Chat that forces the model to call `function`.
    pub async fn call_function(
        &self,
        messages: Vec<ChatMessage>,
        function: FunctionSpec,
        temperature: f32,
    ) -> Result<FunctionReply, FlashdeckError> {
        let request = ChatRequest::new(&self.settings.model, messages)
            .with_temperature(temperature)
            .with_forced_function(function);
        let message = self
            .send(
                &request,
                RequestProfile::Extended,
                self.settings.generation_retry,
                "function",
            )
            .await?;
        decode_function_reply(message)
    }

    /// Plain-text chat on the extended timeout profile.
    pub async fn complete_integration(
        &self,
        messages: Vec<ChatMessage>,
        temperature: f32,
    ) -> Result<String, FlashdeckError> {
        let request =
            ChatRequest::new(&self.settings.model, messages).with_temperature(temperature);
        let message = self
            .send(
                &request,
                RequestProfile::Extended,
                self.settings.integration_retry,
                "integration",
            )
            .await?;
        decode_content(message)
    }

    fn credential(&self) -> Result<&str, FlashdeckError> {
        match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(FlashdeckError::MissingCredential),
        }
    }

    async fn send(
        &self,
        request: &ChatRequest,
        profile: RequestProfile,
        policy: RetryPolicy,
        label: &str,
    ) -> Result<ChoiceMessage, FlashdeckError> {
        let api_key = self.credential()?;
        debug!(
            "sending completion (flow={}, profile={}, messages={})",
            label,
            profile.as_str(),
            request.messages.len()
        );
        let transport = &self.transport;
        let body = retry_transport(policy, label, || async move {
            transport
                .send(api_key, request, profile)
                .await
                .map_err(FlashdeckError::from)
        })
        .await?;
        decode_envelope(&body)
    }
}

/// Decode a raw body into the first choice's message.
fn decode_envelope(body: &str) -> Result<ChoiceMessage, FlashdeckError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|err| FlashdeckError::Parse(format!("malformed response body: {err}")))?;
    if let Some(error) = value.get("error").filter(|error| !error.is_null()) {
        let message = serde_json::from_value::<ApiError>(error.clone())
            .ok()
            .and_then(|error| error.message);
        return match message {
            Some(message) => Err(FlashdeckError::Response(message)),
            None => Err(FlashdeckError::Parse(
                "error response without a message".to_string(),
            )),
        };
    }
    let response: ChatCompletionResponse = serde_json::from_value(value)
        .map_err(|err| FlashdeckError::Parse(format!("unexpected response shape: {err}")))?;
    response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message)
        .ok_or_else(|| FlashdeckError::Parse("response has no choices".to_string()))
}

fn decode_content(message: ChoiceMessage) -> Result<String, FlashdeckError> {
    message
        .content
        .ok_or_else(|| FlashdeckError::Parse("response message has no content".to_string()))
}

fn decode_function_reply(message: ChoiceMessage) -> Result<FunctionReply, FlashdeckError> {
    if let Some(call) = message.function_call {
        let arguments = serde_json::from_str(&call.arguments).map_err(|err| {
            FlashdeckError::Parse(format!("function arguments are not JSON: {err}"))
        })?;
        return Ok(FunctionReply::Arguments(arguments));
    }
    decode_content(message).map(FunctionReply::Content)
}
