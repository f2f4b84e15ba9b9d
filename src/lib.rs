//! Issue tracker automation core.
//!
//! - [`doc`]: Markdown / plain text to and from the tracker's rich-text tree.
//! - [`cache`]: file-backed response cache with TTL expiry.
//! - [`transition`]: picks a workflow transition for an intent.
//! - [`workflow`]: issue operations composed from the three above.

pub mod cache;
pub mod config;
pub mod doc;
pub mod transition;
pub mod workflow;

pub use cache::{CacheError, CacheKey, ResponseCache};
pub use config::{ConfigError, Settings, SettingsManager};
pub use doc::{doc_to_markdown, doc_to_text, markdown_to_doc, text_to_doc, Doc, Mark, Node};
pub use transition::{find_transition, resolve_intent, Intent, TransitionDescriptor};
pub use workflow::{CommentView, IssueWorkflow, TrackerApi, WorkflowError};

pub use trackerkit_api as api;

/// Installs the process-wide logger. `RUST_LOG` overrides the default `info`
/// level; calling this more than once is harmless.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}
