//! JSON merge helper for layered configuration.

use serde_json::Value;

/// Overlay one layer onto the accumulated config.
///
/// Objects merge key by key; any other value replaces the base. An explicit
/// `null` in a higher layer removes the key so that a lower layer's value
/// (for example an inline `api_key`) can be unset.
pub(super) fn overlay_layer(base: &mut Value, overlay: &Value) {
    let (Value::Object(base_map), Value::Object(overlay_map)) = (&mut *base, overlay) else {
        *base = overlay.clone();
        return;
    };
    for (key, value) in overlay_map {
        if value.is_null() {
            base_map.remove(key);
            continue;
        }
        match base_map.get_mut(key) {
            Some(existing) if existing.is_object() && value.is_object() => {
                overlay_layer(existing, value)
            }
            _ => {
                base_map.insert(key.clone(), value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::overlay_layer;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn nested_objects_merge_and_scalars_replace() {
        let mut base = json!({
            "api": { "model": "a", "endpoint": "e" },
            "chat": { "temperature": 0.7 },
        });
        let overlay = json!({ "api": { "model": "b" }, "chat": { "temperature": 0.1 } });
        overlay_layer(&mut base, &overlay);
        assert_eq!(
            base,
            json!({ "api": { "model": "b", "endpoint": "e" }, "chat": { "temperature": 0.1 } })
        );
    }

    #[test]
    fn null_removes_lower_layer_value() {
        let mut base = json!({ "api": { "api_key": "sk-user" } });
        overlay_layer(&mut base, &json!({ "api": { "api_key": null } }));
        assert_eq!(base, json!({ "api": {} }));
    }
}
