//! Tests for layered configuration loading.

use super::*;
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Write JSON5 contents to a path, creating parent directories if needed.
fn write_json5(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("dir");
    }
    fs::write(path, contents).expect("write");
}

/// Verify that a minimal config parses with defaults.
#[test]
fn parse_minimal_config() {
    let config = FlashdeckConfig::load_from_str("{}").expect("config");
    assert_eq!(config.api.model, "gpt-4o-mini");
    assert_eq!(config.integration.temperature, 0.2);
}

/// Reject unexpected top-level config keys.
#[test]
fn rejects_unknown_top_level_key() {
    let err = FlashdeckConfig::load_from_str(r#"{ unexpected: true }"#).unwrap_err();
    let msg = format!("{err}");
    assert!(msg.contains("unknown key"));
}

/// Reject wrongly typed nested values with a dotted path.
#[test]
fn rejects_wrong_type_with_path() {
    let err =
        FlashdeckConfig::load_from_str(r#"{ integration: { retry_delay_ms: "soon" } }"#)
            .unwrap_err();
    let msg = format!("{err}");
    assert!(msg.contains("integration.retry_delay_ms"));
}

/// Reject endpoints that are not URLs.
#[test]
fn rejects_non_http_endpoint() {
    let err = FlashdeckConfig::load_from_str(r#"{ api: { endpoint: "api.openai.com" } }"#)
        .unwrap_err();
    assert!(format!("{err}").contains("api.endpoint"));
}

/// Out-of-range temperatures fail validation.
#[test]
fn rejects_out_of_range_temperature() {
    let err = FlashdeckConfig::load_from_str(r#"{ chat: { temperature: 3.5 } }"#).unwrap_err();
    match err {
        ConfigError::InvalidField { path, .. } => assert_eq!(path, "chat.temperature"),
        other => panic!("unexpected error: {other:?}"),
    }
}

/// Runtime layers override cwd layers, which override user layers.
#[test]
fn layered_config_precedence() {
    let temp = TempDir::new().expect("tmp");
    let root = temp.path();
    let cwd = root.join("work");
    fs::create_dir_all(&cwd).expect("cwd");

    let user_config = root.join("home").join(".flashdeck").join("flashdeck.json5");
    write_json5(
        &user_config,
        r#"{ api: { model: "user-model", api_key: "sk-user" }, chat: { temperature: 0.9 } }"#,
    );
    write_json5(
        &cwd.join("flashdeck.json5"),
        r#"{ api: { model: "cwd-model" } }"#,
    );
    let runtime = root.join("runtime.json5");
    write_json5(&runtime, r#"{ api: { api_key: null }, chat: { temperature: 0.1 } }"#);

    let mut options = LayeredConfigOptions::new(&cwd).with_runtime_path(&runtime);
    options.user_config_path = Some(user_config);
    let layered = FlashdeckConfig::load_layered_with_options(options).expect("layered");

    assert_eq!(layered.config.api.model, "cwd-model");
    assert_eq!(layered.config.api.api_key, None);
    assert_eq!(layered.config.chat.temperature, 0.1);
    let sources: Vec<ConfigLayerSource> =
        layered.layers.iter().map(|layer| layer.source).collect();
    assert_eq!(
        sources,
        vec![
            ConfigLayerSource::User,
            ConfigLayerSource::Cwd,
            ConfigLayerSource::Runtime
        ]
    );
}

/// Missing optional layers are skipped, missing runtime layers fail.
#[test]
fn missing_runtime_layer_is_an_error() {
    let temp = TempDir::new().expect("tmp");
    let mut options = LayeredConfigOptions::new(temp.path());
    options.user_config_path = Some(temp.path().join("absent.json5"));
    let layered = FlashdeckConfig::load_layered_with_options(options.clone()).expect("layered");
    assert!(layered.layers.is_empty());

    let options = options.with_runtime_path(temp.path().join("missing.json5"));
    let err = FlashdeckConfig::load_layered_with_options(options).unwrap_err();
    assert!(matches!(err, ConfigError::ReadFailed(_)));
}
