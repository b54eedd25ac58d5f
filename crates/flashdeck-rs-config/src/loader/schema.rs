//! Schema validation helpers for Flashdeck JSON5 configuration.

use crate::ConfigError;
use serde_json::{Map, Value};

/// Validate a single config layer against the schema.
pub(super) fn validate_layer_schema(value: &Value, layer: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, "")?;
    let allowed = [
        "$schema",
        "api",
        "chat",
        "integration",
        "generation",
        "storage",
        "surface",
    ];
    ensure_allowed_keys(map, &allowed, layer, "")?;

    if let Some(value) = map.get("$schema") {
        expect_string(value, layer, "$schema")?;
    }
    if let Some(value) = map.get("api") {
        validate_api(value, layer, "api")?;
    }
    if let Some(value) = map.get("chat") {
        validate_section(
            value,
            layer,
            "chat",
            &[
                ("temperature", FieldKind::Number),
                ("extra_attempts", FieldKind::Integer),
                ("retry_delay_ms", FieldKind::Integer),
            ],
        )?;
    }
    if let Some(value) = map.get("integration") {
        validate_section(
            value,
            layer,
            "integration",
            &[
                ("temperature", FieldKind::Number),
                ("extra_attempts", FieldKind::Integer),
                ("retry_delay_ms", FieldKind::Integer),
                ("request_timeout_secs", FieldKind::Integer),
                ("resource_timeout_secs", FieldKind::Integer),
            ],
        )?;
    }
    if let Some(value) = map.get("generation") {
        validate_section(
            value,
            layer,
            "generation",
            &[
                ("temperature", FieldKind::Number),
                ("max_cards", FieldKind::Integer),
                ("extra_attempts", FieldKind::Integer),
                ("retry_delay_ms", FieldKind::Integer),
            ],
        )?;
    }
    if let Some(value) = map.get("storage") {
        validate_section(
            value,
            layer,
            "storage",
            &[("path", FieldKind::OptionalString)],
        )?;
    }
    if let Some(value) = map.get("surface") {
        validate_section(
            value,
            layer,
            "surface",
            &[
                ("success_notice_ms", FieldKind::Integer),
                ("error_notice_ms", FieldKind::Integer),
            ],
        )?;
    }

    Ok(())
}

/// Expected JSON shape of a leaf field.
#[derive(Debug, Clone, Copy)]
enum FieldKind {
    String,
    OptionalString,
    Integer,
    Number,
}

/// Validate the "api" block.
fn validate_api(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    validate_section(
        value,
        layer,
        path,
        &[
            ("endpoint", FieldKind::String),
            ("model", FieldKind::String),
            ("api_key", FieldKind::OptionalString),
            ("api_key_env", FieldKind::String),
        ],
    )?;
    if let Some(Value::String(endpoint)) = value.get("endpoint")
        && !endpoint.starts_with("http://")
        && !endpoint.starts_with("https://")
    {
        return Err(invalid_field(
            layer,
            &join_path(path, "endpoint"),
            "expected an http(s) URL",
        ));
    }
    Ok(())
}

/// Validate a flat section whose keys map to leaf values.
fn validate_section(
    value: &Value,
    layer: &str,
    path: &str,
    fields: &[(&str, FieldKind)],
) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    let allowed: Vec<&str> = fields.iter().map(|(name, _)| *name).collect();
    ensure_allowed_keys(map, &allowed, layer, path)?;

    for (name, kind) in fields {
        let Some(value) = map.get(*name) else {
            continue;
        };
        let field_path = join_path(path, name);
        match kind {
            FieldKind::String => expect_string(value, layer, &field_path)?,
            FieldKind::OptionalString => {
                if !value.is_null() {
                    expect_string(value, layer, &field_path)?;
                }
            }
            FieldKind::Integer => expect_u64(value, layer, &field_path)?,
            FieldKind::Number => expect_f64(value, layer, &field_path)?,
        }
    }
    Ok(())
}

/// Expect a JSON object or return a typed error.
fn expect_object<'a>(
    value: &'a Value,
    layer: &str,
    path: &str,
) -> Result<&'a Map<String, Value>, ConfigError> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(invalid_field(layer, path, "expected object")),
    }
}

/// Expect a JSON string or return a typed error.
fn expect_string(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if value.as_str().is_some() {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected string"))
    }
}

/// Expect a non-negative JSON integer or return a typed error.
fn expect_u64(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if value.is_u64() {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected non-negative integer"))
    }
}

/// Expect a JSON number or return a typed error.
fn expect_f64(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if value.is_number() {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected number"))
    }
}

/// Ensure an object contains only allowed keys.
fn ensure_allowed_keys(
    map: &Map<String, Value>,
    allowed: &[&str],
    layer: &str,
    path: &str,
) -> Result<(), ConfigError> {
    for key in map.keys() {
        if !allowed.contains(&key.as_str()) {
            return Err(invalid_field(layer, &join_path(path, key), "unknown key"));
        }
    }
    Ok(())
}

/// Join nested paths for better error messages.
fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

/// Build a structured invalid-field error.
fn invalid_field(layer: &str, path: &str, message: &str) -> ConfigError {
    let normalized_path = if path.is_empty() { "root" } else { path };
    ConfigError::InvalidField {
        path: format!("{layer}:{normalized_path}"),
        message: message.to_string(),
    }
}
