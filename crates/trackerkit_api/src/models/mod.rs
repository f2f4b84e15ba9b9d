mod comment;
mod issue;
mod queue;
mod simple_entity;
mod transition;

pub use comment::{Comment, CommentAuthor, CommentPage};
pub use issue::{Issue, IssueFields};
pub use queue::{Queue, QueuePage};
pub use simple_entity::{deserialize_string_field, SimpleEntityRaw};
pub use transition::{Transition, TransitionDestination, TransitionList};
