use async_trait::async_trait;
use flashdeck_rs_protocol::{ChatRequest, ChatTransport, RequestProfile, TransportError};
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::time::Duration;

/// Transport that replays a fixed script and records every request.
///
/// Once the script is exhausted every call fails with a network error.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<String, TransportError>>>,
    requests: Mutex<Vec<(ChatRequest, RequestProfile)>>,
    delay: Duration,
}

impl ScriptedTransport {
    pub fn new(script: Vec<Result<String, TransportError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
        }
    }

    /// Hold every response for `delay` before returning it.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Number of send calls observed.
    pub fn attempts(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .iter()
            .map(|(request, _)| request.clone())
            .collect()
    }

    pub fn profiles(&self) -> Vec<RequestProfile> {
        self.requests
            .lock()
            .iter()
            .map(|(_, profile)| *profile)
            .collect()
    }
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    async fn send(
        &self,
        _api_key: &str,
        request: &ChatRequest,
        profile: RequestProfile,
    ) -> Result<String, TransportError> {
        self.requests.lock().push((request.clone(), profile));
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Network("script exhausted".to_string())))
    }
}

/// Successful body whose first choice carries `content`.
pub fn chat_body(content: &str) -> String {
    json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }]
    })
    .to_string()
}

/// Successful body whose first choice calls `name` with `arguments`.
pub fn function_body(name: &str, arguments: &Value) -> String {
    json!({
        "choices": [{
            "message": {
                "role": "assistant",
                "content": null,
                "function_call": { "name": name, "arguments": arguments.to_string() }
            }
        }]
    })
    .to_string()
}

/// API-reported error body.
pub fn api_error_body(message: &str) -> String {
    json!({ "error": { "message": message, "type": "invalid_request_error" } }).to_string()
}
