//! Issue mutations composed from the converter, the cache and the resolver.
//!
//! Every call follows the same shape: free text is converted to a document
//! before it is sent, reads consult the cache first, state changes resolve a
//! transition id from the issue's current options, and each mutation
//! invalidates the cache namespace it touched.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use trackerkit_api::{
    Comment, Issue, Queue, TrackerClient, TrackerConfig, TrackerError, Transition,
};

use crate::cache::{CacheKey, ResponseCache};
use crate::config::{ConfigError, Settings, SettingsManager};
use crate::doc::{doc_to_markdown, doc_to_text, markdown_to_doc, text_to_doc, Doc};
use crate::transition::{resolve_intent, Intent, TransitionDescriptor};

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("no transition for '{intent}' on {issue}; available: {}", .available.join(", "))]
    NoTransition {
        issue: String,
        intent: String,
        available: Vec<String>,
    },
    #[error(transparent)]
    Api(#[from] TrackerError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, WorkflowError>;

/// Remote operations the workflow needs. [`TrackerClient`] is the production
/// implementation.
#[allow(async_fn_in_trait)]
pub trait TrackerApi {
    async fn get_issue(&self, issue_key: &str) -> trackerkit_api::Result<Issue>;
    async fn update_description(&self, issue_key: &str, description: &Doc)
        -> trackerkit_api::Result<()>;
    async fn get_comments(&self, issue_key: &str) -> trackerkit_api::Result<Vec<Comment>>;
    async fn add_comment(&self, issue_key: &str, body: &Doc) -> trackerkit_api::Result<Comment>;
    async fn get_transitions(&self, issue_key: &str) -> trackerkit_api::Result<Vec<Transition>>;
    async fn execute_transition(
        &self,
        issue_key: &str,
        transition_id: &str,
        comment: Option<&Doc>,
    ) -> trackerkit_api::Result<()>;
    async fn get_queues(&self, service_desk_id: &str) -> trackerkit_api::Result<Vec<Queue>>;
    async fn create_queue(
        &self,
        service_desk_id: &str,
        name: &str,
        jql: &str,
    ) -> trackerkit_api::Result<Queue>;
    async fn delete_queue(&self, service_desk_id: &str, queue_id: &str)
        -> trackerkit_api::Result<()>;
}

impl TrackerApi for TrackerClient {
    async fn get_issue(&self, issue_key: &str) -> trackerkit_api::Result<Issue> {
        TrackerClient::get_issue(self, issue_key).await
    }

    async fn update_description(
        &self,
        issue_key: &str,
        description: &Doc,
    ) -> trackerkit_api::Result<()> {
        TrackerClient::update_description(self, issue_key, description).await
    }

    async fn get_comments(&self, issue_key: &str) -> trackerkit_api::Result<Vec<Comment>> {
        TrackerClient::get_comments(self, issue_key).await
    }

    async fn add_comment(&self, issue_key: &str, body: &Doc) -> trackerkit_api::Result<Comment> {
        TrackerClient::add_comment(self, issue_key, body).await
    }

    async fn get_transitions(&self, issue_key: &str) -> trackerkit_api::Result<Vec<Transition>> {
        TrackerClient::get_transitions(self, issue_key).await
    }

    async fn execute_transition(
        &self,
        issue_key: &str,
        transition_id: &str,
        comment: Option<&Doc>,
    ) -> trackerkit_api::Result<()> {
        TrackerClient::execute_transition(self, issue_key, transition_id, comment).await
    }

    async fn get_queues(&self, service_desk_id: &str) -> trackerkit_api::Result<Vec<Queue>> {
        TrackerClient::get_queues(self, service_desk_id).await
    }

    async fn create_queue(
        &self,
        service_desk_id: &str,
        name: &str,
        jql: &str,
    ) -> trackerkit_api::Result<Queue> {
        TrackerClient::create_queue(self, service_desk_id, name, jql).await
    }

    async fn delete_queue(
        &self,
        service_desk_id: &str,
        queue_id: &str,
    ) -> trackerkit_api::Result<()> {
        TrackerClient::delete_queue(self, service_desk_id, queue_id).await
    }
}

/// A comment flattened for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentView {
    pub id: Option<String>,
    pub author: String,
    pub created: Option<String>,
    pub text: String,
}

impl CommentView {
    fn from_remote(comment: &Comment) -> Self {
        Self {
            id: comment.id.clone(),
            author: comment
                .author
                .as_ref()
                .map(|author| author.label())
                .unwrap_or_else(|| "Unknown".to_string()),
            created: comment.created.clone(),
            text: comment
                .body
                .as_ref()
                .map(|body| doc_to_text(&decode_doc(body)))
                .unwrap_or_default(),
        }
    }
}

/// Remote documents that fail to decode are shown as empty rather than failing the read.
fn decode_doc(value: &serde_json::Value) -> Doc {
    Doc::from_value(value.clone()).unwrap_or_else(|err| {
        debug!("unreadable document payload: {}", err);
        Doc::empty()
    })
}

fn issue_namespace(issue_key: &str) -> String {
    format!("{}:", CacheKey::new("issue").segment(issue_key).namespace())
}

fn queue_namespace(service_desk_id: &str) -> String {
    format!("{}:", CacheKey::new("queue").segment(service_desk_id).namespace())
}

/// Issue operations against one API handle and one cache.
pub struct IssueWorkflow<A> {
    api: A,
    cache: ResponseCache,
    default_ttl: Duration,
    queue_ttl: Duration,
}

impl IssueWorkflow<TrackerClient> {
    /// [`IssueWorkflow::connect_with`] using the platform settings location.
    pub fn connect(config: TrackerConfig) -> Result<Self> {
        let settings = SettingsManager::new()?;
        Self::connect_with(config, &settings)
    }

    /// Builds an HTTP client for `config` and a cache in the directory the
    /// persisted settings point at.
    pub fn connect_with(config: TrackerConfig, settings: &SettingsManager) -> Result<Self> {
        let loaded = settings.load();
        let cache = ResponseCache::open(settings.cache_dir(&loaded));
        let client = TrackerClient::new(config)?;
        debug!("response cache at {}", cache.dir().display());
        Ok(Self::with_settings(client, cache, &loaded))
    }
}

impl<A: TrackerApi> IssueWorkflow<A> {
    pub fn new(api: A, cache: ResponseCache) -> Self {
        Self::with_settings(api, cache, &Settings::default())
    }

    pub fn with_settings(api: A, cache: ResponseCache, settings: &Settings) -> Self {
        Self {
            api,
            cache,
            default_ttl: settings.default_ttl(),
            queue_ttl: settings.queue_ttl(),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Issue description rendered as Markdown; `None` when the issue has none.
    pub async fn description_markdown(&self, issue_key: &str) -> Result<Option<String>> {
        let issue = self.api.get_issue(issue_key).await?;
        Ok(issue
            .fields
            .description
            .as_ref()
            .filter(|value| !value.is_null())
            .map(|value| doc_to_markdown(&decode_doc(value))))
    }

    pub async fn set_description_markdown(&self, issue_key: &str, markdown: &str) -> Result<()> {
        let doc = markdown_to_doc(markdown);
        self.api.update_description(issue_key, &doc).await?;
        self.cache.invalidate(&issue_namespace(issue_key));
        info!("updated description of {}", issue_key);
        Ok(())
    }

    /// Comments of an issue as plain text, served from the cache while fresh.
    pub async fn comments(&self, issue_key: &str) -> Result<Vec<CommentView>> {
        let key = CacheKey::new("issue")
            .segment(issue_key)
            .segment("comments")
            .to_string();
        if let Some(cached) = self.cache.get_as::<Vec<CommentView>>(&key) {
            return Ok(cached);
        }
        let comments = self.api.get_comments(issue_key).await?;
        let views: Vec<CommentView> = comments.iter().map(CommentView::from_remote).collect();
        if let Ok(value) = serde_json::to_value(&views) {
            self.cache.put(&key, &value, self.default_ttl);
        }
        Ok(views)
    }

    pub async fn comment_markdown(&self, issue_key: &str, markdown: &str) -> Result<Comment> {
        self.post_comment(issue_key, markdown_to_doc(markdown)).await
    }

    /// Posts text verbatim, without Markdown interpretation.
    pub async fn comment_text(&self, issue_key: &str, text: &str) -> Result<Comment> {
        self.post_comment(issue_key, text_to_doc(text)).await
    }

    async fn post_comment(&self, issue_key: &str, doc: Doc) -> Result<Comment> {
        let comment = self.api.add_comment(issue_key, &doc).await?;
        self.cache.invalidate(&issue_namespace(issue_key));
        info!("commented on {}", issue_key);
        Ok(comment)
    }

    /// Moves an issue along the transition matching `intent`, optionally with
    /// a Markdown comment, and returns the transition taken.
    pub async fn transition(
        &self,
        issue_key: &str,
        intent: &Intent,
        comment_markdown: Option<&str>,
    ) -> Result<TransitionDescriptor> {
        let remote = self.api.get_transitions(issue_key).await?;
        let available = TransitionDescriptor::from_remote_list(&remote);
        let chosen = resolve_intent(&available, intent)
            .cloned()
            .ok_or_else(|| WorkflowError::NoTransition {
                issue: issue_key.to_string(),
                intent: intent.to_string(),
                available: available.iter().map(|t| t.name.clone()).collect(),
            })?;

        let comment = comment_markdown
            .filter(|text| !text.trim().is_empty())
            .map(markdown_to_doc);
        self.api
            .execute_transition(issue_key, &chosen.id, comment.as_ref())
            .await?;
        self.cache.invalidate(&issue_namespace(issue_key));
        info!(
            "moved {} via '{}' (transition {})",
            issue_key, chosen.name, chosen.id
        );
        Ok(chosen)
    }

    /// Queues of a service desk, served from the cache while fresh.
    pub async fn queues(&self, service_desk_id: &str) -> Result<Vec<Queue>> {
        let key = CacheKey::new("queue")
            .segment(service_desk_id)
            .segment("list")
            .to_string();
        if let Some(cached) = self.cache.get_as::<Vec<Queue>>(&key) {
            return Ok(cached);
        }
        let queues = self.api.get_queues(service_desk_id).await?;
        if let Ok(value) = serde_json::to_value(&queues) {
            self.cache.put(&key, &value, self.queue_ttl);
        }
        Ok(queues)
    }

    pub async fn create_queue(&self, service_desk_id: &str, name: &str, jql: &str) -> Result<Queue> {
        let queue = self.api.create_queue(service_desk_id, name, jql).await?;
        self.cache.invalidate(&queue_namespace(service_desk_id));
        info!("created queue '{}' in service desk {}", name, service_desk_id);
        Ok(queue)
    }

    pub async fn delete_queue(&self, service_desk_id: &str, queue_id: &str) -> Result<()> {
        self.api.delete_queue(service_desk_id, queue_id).await?;
        self.cache.invalidate(&queue_namespace(service_desk_id));
        info!("deleted queue {} from service desk {}", queue_id, service_desk_id);
        Ok(())
    }

    /// Closes the cache; further reads go to the API.
    pub fn close(&self) {
        self.cache.close();
    }
}
