use serde::Deserialize;
use serde_json::Value;

use super::simple_entity::deserialize_string_field;

/// Page envelope returned by `GET issue/{key}/comment`.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct CommentPage {
    #[serde(default)]
    pub comments: Vec<Comment>,
    pub start_at: Option<u64>,
    pub max_results: Option<u64>,
    pub total: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(default, deserialize_with = "deserialize_string_field")]
    pub id: Option<String>,
    /// Rich-text body in the service's document format, kept opaque at this layer.
    #[serde(default)]
    pub body: Option<Value>,
    pub created: Option<String>,
    pub updated: Option<String>,
    pub author: Option<CommentAuthor>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CommentAuthor {
    pub account_id: Option<String>,
    pub display_name: Option<String>,
    pub email_address: Option<String>,
}

impl CommentAuthor {
    pub fn label(&self) -> String {
        self.display_name
            .clone()
            .or_else(|| self.email_address.clone())
            .or_else(|| self.account_id.clone())
            .unwrap_or_else(|| "Unknown".to_string())
    }
}
