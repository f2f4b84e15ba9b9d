use serde::Deserialize;
use serde_json::Value;

use super::simple_entity::{deserialize_string_field, SimpleEntityRaw};

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub key: String,
    #[serde(default, deserialize_with = "deserialize_string_field")]
    pub id: Option<String>,
    #[serde(default)]
    pub fields: IssueFields,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct IssueFields {
    pub summary: Option<String>,
    /// Rich-text description in the service's document format.
    #[serde(default)]
    pub description: Option<Value>,
    #[serde(default)]
    pub status: Option<SimpleEntityRaw>,
    #[serde(default)]
    pub priority: Option<SimpleEntityRaw>,
}
