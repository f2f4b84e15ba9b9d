use serde::Deserialize;
use serde_json::Value;

use super::simple_entity::{coerce_display_value, deserialize_string_field, SimpleEntityRaw};

/// Envelope returned by `GET issue/{key}/transitions`.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct TransitionList {
    #[serde(default)]
    pub transitions: Vec<Transition>,
}

/// One workflow edge available from the issue's current status.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Transition {
    #[serde(default, deserialize_with = "deserialize_string_field")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<Value>,
    #[serde(default)]
    pub to: Option<TransitionDestination>,
    #[serde(default)]
    pub has_screen: Option<bool>,
}

pub type TransitionDestination = SimpleEntityRaw;

impl Transition {
    /// Display name of the transition, if the payload carried one.
    pub fn display_name(&self) -> Option<String> {
        self.name.as_ref().and_then(coerce_display_value)
    }

    /// Name of the status the transition leads to.
    pub fn destination_name(&self) -> Option<String> {
        self.to.as_ref().and_then(SimpleEntityRaw::display_name)
    }
}
