//! Configuration schema for Flashdeck.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root config for Flashdeck.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FlashdeckConfig {
    #[serde(default, rename = "$schema")]
    pub schema: Option<String>,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub integration: IntegrationConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub surface: SurfaceConfig,
}

impl FlashdeckConfig {
    /// Start building a config programmatically with defaults applied.
    pub fn builder() -> FlashdeckConfigBuilder {
        FlashdeckConfigBuilder::new()
    }
}

/// Builder for assembling a `FlashdeckConfig` in code.
#[derive(Debug, Default, Clone)]
pub struct FlashdeckConfigBuilder {
    config: FlashdeckConfig,
}

impl FlashdeckConfigBuilder {
    /// Create a new builder seeded with default config values.
    pub fn new() -> Self {
        Self {
            config: FlashdeckConfig::default(),
        }
    }

    /// Replace the completion API configuration.
    pub fn api(mut self, api: ApiConfig) -> Self {
        self.config.api = api;
        self
    }

    /// Replace the chat configuration.
    pub fn chat(mut self, chat: ChatConfig) -> Self {
        self.config.chat = chat;
        self
    }

    /// Replace the card-integration configuration.
    pub fn integration(mut self, integration: IntegrationConfig) -> Self {
        self.config.integration = integration;
        self
    }

    /// Replace the card-generation configuration.
    pub fn generation(mut self, generation: GenerationConfig) -> Self {
        self.config.generation = generation;
        self
    }

    /// Replace the storage configuration.
    pub fn storage(mut self, storage: StorageConfig) -> Self {
        self.config.storage = storage;
        self
    }

    /// Replace the notice timing configuration.
    pub fn surface(mut self, surface: SurfaceConfig) -> Self {
        self.config.surface = surface;
        self
    }

    /// Finalize and return the built `FlashdeckConfig`.
    pub fn build(self) -> FlashdeckConfig {
        self.config
    }
}

/// Chat-completion endpoint and credential settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Inline API key; takes precedence over `api_key_env`.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Environment variable consulted when `api_key` is unset.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            api_key: None,
            api_key_env: default_api_key_env(),
        }
    }
}

impl ApiConfig {
    /// Resolve the credential from config or environment. Blank values count
    /// as missing.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| std::env::var(&self.api_key_env).ok())
            .filter(|key| !key.trim().is_empty())
    }
}

fn default_endpoint() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

/// Settings for free-form chat about a card.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_chat_temperature")]
    pub temperature: f32,
    #[serde(default = "default_extra_attempts")]
    pub extra_attempts: u32,
    #[serde(default = "default_chat_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            temperature: default_chat_temperature(),
            extra_attempts: default_extra_attempts(),
            retry_delay_ms: default_chat_retry_delay_ms(),
        }
    }
}

impl ChatConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

fn default_chat_temperature() -> f32 {
    0.7
}

/// Additional attempts after the first failed transport call.
fn default_extra_attempts() -> u32 {
    2
}

fn default_chat_retry_delay_ms() -> u64 {
    1500
}

/// Settings for merging an assistant answer into a card.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationConfig {
    #[serde(default = "default_integration_temperature")]
    pub temperature: f32,
    #[serde(default = "default_extra_attempts")]
    pub extra_attempts: u32,
    #[serde(default = "default_long_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Idle timeout while waiting for response bytes.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Upper bound on the whole request.
    #[serde(default = "default_resource_timeout_secs")]
    pub resource_timeout_secs: u64,
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            temperature: default_integration_temperature(),
            extra_attempts: default_extra_attempts(),
            retry_delay_ms: default_long_retry_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            resource_timeout_secs: default_resource_timeout_secs(),
        }
    }
}

impl IntegrationConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn resource_timeout(&self) -> Duration {
        Duration::from_secs(self.resource_timeout_secs)
    }
}

fn default_integration_temperature() -> f32 {
    0.2
}

fn default_long_retry_delay_ms() -> u64 {
    2000
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_resource_timeout_secs() -> u64 {
    90
}

/// Settings for generating cards from pasted text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_generation_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_cards")]
    pub max_cards: usize,
    #[serde(default = "default_extra_attempts")]
    pub extra_attempts: u32,
    #[serde(default = "default_long_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: default_generation_temperature(),
            max_cards: default_max_cards(),
            extra_attempts: default_extra_attempts(),
            retry_delay_ms: default_long_retry_delay_ms(),
        }
    }
}

impl GenerationConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

fn default_generation_temperature() -> f32 {
    0.3
}

fn default_max_cards() -> usize {
    20
}

/// Where deck state is persisted.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub path: Option<String>,
}

impl StorageConfig {
    /// Resolve the data directory, falling back to the platform data dir.
    pub fn resolve_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.path {
            return Some(PathBuf::from(path));
        }
        ProjectDirs::from("ai", "liquidos", "flashdeck").map(|dirs| dirs.data_dir().to_path_buf())
    }
}

/// How long transient notices stay visible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurfaceConfig {
    #[serde(default = "default_success_notice_ms")]
    pub success_notice_ms: u64,
    #[serde(default = "default_error_notice_ms")]
    pub error_notice_ms: u64,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            success_notice_ms: default_success_notice_ms(),
            error_notice_ms: default_error_notice_ms(),
        }
    }
}

impl SurfaceConfig {
    pub fn success_notice(&self) -> Duration {
        Duration::from_millis(self.success_notice_ms)
    }

    pub fn error_notice(&self) -> Duration {
        Duration::from_millis(self.error_notice_ms)
    }
}

fn default_success_notice_ms() -> u64 {
    1500
}

fn default_error_notice_ms() -> u64 {
    3000
}

#[cfg(test)]
mod tests {
    use super::{ApiConfig, FlashdeckConfig, StorageConfig};
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    #[test]
    fn defaults_match_documented_values() {
        let config = FlashdeckConfig::default();
        assert_eq!(config.chat.extra_attempts, 2);
        assert_eq!(config.chat.retry_delay_ms, 1500);
        assert_eq!(config.integration.retry_delay_ms, 2000);
        assert_eq!(config.integration.request_timeout_secs, 60);
        assert_eq!(config.integration.resource_timeout_secs, 90);
        assert_eq!(config.surface.success_notice_ms, 1500);
        assert_eq!(config.surface.error_notice_ms, 3000);
    }

    #[test]
    fn inline_api_key_wins_and_blank_is_missing() {
        let api = ApiConfig {
            api_key: Some("sk-inline".to_string()),
            api_key_env: "FLASHDECK_TEST_UNSET_KEY_A".to_string(),
            ..ApiConfig::default()
        };
        assert_eq!(api.resolve_api_key(), Some("sk-inline".to_string()));

        let blank = ApiConfig {
            api_key: Some("   ".to_string()),
            api_key_env: "FLASHDECK_TEST_UNSET_KEY_B".to_string(),
            ..ApiConfig::default()
        };
        assert_eq!(blank.resolve_api_key(), None);
    }

    #[test]
    fn explicit_storage_path_is_used() {
        let storage = StorageConfig {
            path: Some("/tmp/flashdeck".to_string()),
        };
        assert_eq!(storage.resolve_path(), Some(PathBuf::from("/tmp/flashdeck")));
    }
}
