//! Layered configuration loader.
//!
//! Discovers configuration layers (user, cwd, runtime overrides), validates
//! their schema, merges them, and produces a final `FlashdeckConfig`.

mod layer_io;
mod merge;
mod schema;

#[cfg(test)]
mod tests;

use crate::{ConfigError, FlashdeckConfig};
use log::{debug, info};
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Default config filename in local layers.
const DEFAULT_CONFIG_FILE: &str = "flashdeck.json5";
/// Default config directory under the user's home.
const DEFAULT_CONFIG_DIR: &str = ".flashdeck";

/// Effective config plus metadata about which layers were loaded.
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    /// The merged, validated config.
    pub config: FlashdeckConfig,
    /// Metadata for each layer that contributed.
    pub layers: Vec<ConfigLayer>,
}

/// Origin for a single config layer in the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayerSource {
    /// User-specific configuration.
    User,
    /// Current working directory configuration.
    Cwd,
    /// Runtime overrides (highest precedence).
    Runtime,
}

/// Metadata about a loaded config layer.
#[derive(Debug, Clone)]
pub struct ConfigLayer {
    /// Layer origin.
    pub source: ConfigLayerSource,
    /// Location on disk.
    pub path: PathBuf,
}

/// Options controlling layered config discovery and overrides.
#[derive(Debug, Clone)]
pub struct LayeredConfigOptions {
    /// Working directory searched for a local `flashdeck.json5`.
    pub cwd: PathBuf,
    /// Optional user config path (defaults to `~/.flashdeck/flashdeck.json5`).
    pub user_config_path: Option<PathBuf>,
    /// Runtime override config paths applied last.
    pub runtime_paths: Vec<PathBuf>,
}

impl LayeredConfigOptions {
    /// Create options with default layer locations for the provided cwd.
    pub fn new(cwd: impl AsRef<Path>) -> Self {
        Self {
            cwd: cwd.as_ref().to_path_buf(),
            user_config_path: layer_io::default_user_config_path(),
            runtime_paths: Vec::new(),
        }
    }

    /// Add a runtime override config path that is applied last.
    pub fn with_runtime_path(mut self, path: impl AsRef<Path>) -> Self {
        self.runtime_paths.push(path.as_ref().to_path_buf());
        self
    }
}

impl FlashdeckConfig {
    /// Load a single config from a path (no layering).
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        info!("loading config from path: {}", path.as_ref().display());
        let contents = fs::read_to_string(path)?;
        let value: Value = json5::from_str(&contents)?;
        config_from_value(value, "config")
    }

    /// Load a single config from JSON5 contents (no layering).
    pub fn load_from_str(contents: &str) -> Result<Self, ConfigError> {
        debug!("loading config from raw contents (len={})", contents.len());
        let value: Value = json5::from_str(contents)?;
        config_from_value(value, "config")
    }

    /// Load a layered config stack using the default layer locations.
    pub fn load_layered(cwd: impl AsRef<Path>) -> Result<LayeredConfig, ConfigError> {
        info!(
            "loading layered config with defaults (cwd={})",
            cwd.as_ref().display()
        );
        Self::load_layered_with_options(LayeredConfigOptions::new(cwd))
    }

    /// Load a layered config stack using explicit layer locations.
    ///
    /// Layer precedence (low -> high): user, cwd, runtime overrides.
    pub fn load_layered_with_options(
        options: LayeredConfigOptions,
    ) -> Result<LayeredConfig, ConfigError> {
        let mut layers = Vec::new();
        let mut seen_paths = HashSet::new();
        let mut merged = Value::Object(serde_json::Map::new());

        let mut candidates = vec![
            (ConfigLayerSource::User, options.user_config_path.clone()),
            (
                ConfigLayerSource::Cwd,
                Some(options.cwd.join(DEFAULT_CONFIG_FILE)),
            ),
        ];
        for path in &options.runtime_paths {
            candidates.push((ConfigLayerSource::Runtime, Some(path.clone())));
        }

        for (source, path) in candidates {
            let loaded = if source == ConfigLayerSource::Runtime {
                path.as_deref()
                    .map(|path| layer_io::load_required_layer(source, path))
                    .transpose()?
            } else {
                layer_io::load_optional_layer(source, path.as_deref())?
            };
            let Some(loaded) = loaded else {
                continue;
            };
            let unique = loaded
                .meta
                .path
                .canonicalize()
                .unwrap_or_else(|_| loaded.meta.path.clone());
            if !seen_paths.insert(unique) {
                debug!(
                    "skipping duplicate layer (source={:?}, path={})",
                    source,
                    loaded.meta.path.display()
                );
                continue;
            }
            merge::overlay_layer(&mut merged, &loaded.value);
            layers.push(loaded.meta);
        }

        let config = config_from_value(merged, "effective")?;
        info!("layered config loaded (layers={})", layers.len());
        Ok(LayeredConfig { config, layers })
    }

    /// Validate configuration invariants that cannot be expressed in serde.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid("api.endpoint cannot be empty".to_string()));
        }
        if self.api.model.trim().is_empty() {
            return Err(ConfigError::Invalid("api.model cannot be empty".to_string()));
        }
        for (path, temperature) in [
            ("chat.temperature", self.chat.temperature),
            ("integration.temperature", self.integration.temperature),
            ("generation.temperature", self.generation.temperature),
        ] {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(ConfigError::InvalidField {
                    path: path.to_string(),
                    message: "expected a value between 0 and 2".to_string(),
                });
            }
        }
        if self.generation.max_cards == 0 {
            return Err(ConfigError::Invalid(
                "generation.max_cards must be at least 1".to_string(),
            ));
        }
        if self.integration.resource_timeout_secs < self.integration.request_timeout_secs {
            return Err(ConfigError::Invalid(
                "integration.resource_timeout_secs must not be shorter than request_timeout_secs"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

/// Internal representation of a loaded config layer.
#[derive(Debug, Clone)]
struct LoadedLayer {
    meta: ConfigLayer,
    value: Value,
}

fn config_from_value(value: Value, label: &str) -> Result<FlashdeckConfig, ConfigError> {
    schema::validate_layer_schema(&value, label)?;
    let config: FlashdeckConfig = serde_json::from_value(value)?;
    config.validate()?;
    Ok(config)
}
