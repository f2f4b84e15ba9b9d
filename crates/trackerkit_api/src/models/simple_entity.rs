use serde::de::Deserializer;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

/// Loosely typed `{id, key, name}` reference used by status and destination fields.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SimpleEntityRaw {
    #[serde(default, deserialize_with = "deserialize_string_field")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_string_field")]
    pub key: Option<String>,
    #[serde(default)]
    pub name: Option<Value>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl SimpleEntityRaw {
    /// Returns the human-readable name, falling back to key then id.
    pub fn display_name(&self) -> Option<String> {
        self.name
            .as_ref()
            .and_then(coerce_display_value)
            .or_else(|| self.key.clone())
            .or_else(|| self.id.clone())
    }
}

/// Accepts ids delivered as strings, numbers or booleans and normalizes blanks to `None`.
pub fn deserialize_string_field<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|val| match val {
        Value::String(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null => None,
        other => serde_json::to_string(&other).ok(),
    }))
}

/// Extracts a display string from a name that may be plain text or a localized object.
pub(crate) fn coerce_display_value(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Object(map) => {
            for key in ["display", "name", "value", "en"] {
                if let Some(text) = map.get(key).and_then(coerce_display_value) {
                    return Some(text);
                }
            }
            map.values().find_map(coerce_display_value)
        }
        Value::Array(items) => items.iter().find_map(coerce_display_value),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(_) | Value::Null => None,
    }
}
