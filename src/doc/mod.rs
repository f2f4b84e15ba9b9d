//! Conversion between Markdown, plain text and the tracker's rich-text tree.
//!
//! Every conversion is total: malformed input degrades to literal text and
//! never produces an error.

mod inline;
mod markdown;
mod node;
mod render;
mod text;

pub use markdown::{markdown_to_doc, MAX_LIST_DEPTH};
pub use node::{Attrs, Doc, Mark, Node, RawMark, RawNode, UnknownNode, DOC_VERSION};
pub use render::{doc_to_markdown, doc_to_text};
pub use text::text_to_doc;
