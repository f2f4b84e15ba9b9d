//! Typed issue tracker API client crate used by the trackerkit core.

pub mod client;
pub mod config;
pub mod error;
pub mod models;

pub use client::TrackerClient;
pub use config::{AuthMethod, TrackerConfig};
pub use error::{Result, TrackerError};
pub use models::{
    Comment, CommentAuthor, CommentPage, Issue, IssueFields, Queue, QueuePage, SimpleEntityRaw,
    Transition, TransitionDestination, TransitionList,
};
