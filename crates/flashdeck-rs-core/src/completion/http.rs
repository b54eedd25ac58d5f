//! reqwest-backed chat transport.

use crate::error::FlashdeckError;
use async_trait::async_trait;
use flashdeck_rs_config::FlashdeckConfig;
use flashdeck_rs_protocol::{ChatRequest, ChatTransport, RequestProfile, TransportError};
use log::debug;
use std::time::Duration;

/// HTTPS transport with separate clients for chat and extended requests.
pub struct HttpTransport {
    endpoint: String,
    chat_client: reqwest::Client,
    extended_client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(
        endpoint: impl Into<String>,
        read_timeout: Duration,
        total_timeout: Duration,
    ) -> Result<Self, FlashdeckError> {
        let extended_client = reqwest::Client::builder()
            .read_timeout(read_timeout)
            .timeout(total_timeout)
            .build()
            .map_err(|err| FlashdeckError::Network(format!("failed to build client: {err}")))?;
        Ok(Self {
            endpoint: endpoint.into(),
            chat_client: reqwest::Client::new(),
            extended_client,
        })
    }

    pub fn from_config(config: &FlashdeckConfig) -> Result<Self, FlashdeckError> {
        Self::new(
            config.api.endpoint.clone(),
            config.integration.request_timeout(),
            config.integration.resource_timeout(),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn client(&self, profile: RequestProfile) -> &reqwest::Client {
        match profile {
            RequestProfile::Chat => &self.chat_client,
            RequestProfile::Extended => &self.extended_client,
        }
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn send(
        &self,
        api_key: &str,
        request: &ChatRequest,
        profile: RequestProfile,
    ) -> Result<String, TransportError> {
        let response = self
            .client(profile)
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await
            .map_err(|err| TransportError::Network(err.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| TransportError::Network(err.to_string()))?;
        debug!(
            "completion response (status={}, profile={}, bytes={})",
            status.as_u16(),
            profile.as_str(),
            body.len()
        );
        Ok(body)
    }
}
