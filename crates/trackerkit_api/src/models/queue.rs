use serde::{Deserialize, Serialize};

use super::simple_entity::deserialize_string_field;

/// Paged envelope used by the service desk API.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct QueuePage {
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub start: u64,
    #[serde(default)]
    pub limit: u64,
    #[serde(default = "default_last_page")]
    pub is_last_page: bool,
    #[serde(default)]
    pub values: Vec<Queue>,
}

fn default_last_page() -> bool {
    true
}

/// A service desk queue: a named saved search over the desk's requests.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Queue {
    #[serde(default, deserialize_with = "deserialize_string_field")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jql: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_count: Option<u64>,
}
