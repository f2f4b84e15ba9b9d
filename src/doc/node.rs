//! Typed document tree and its JSON wire shape.
//!
//! The remote service exchanges rich text as a nested node tree
//! (`{type, attrs?, content?, text?, marks?}`). [`RawNode`] mirrors that
//! shape one-to-one; [`Doc`], [`Node`] and [`Mark`] are the typed view the
//! converter works on. Node kinds the converter does not know are kept in
//! [`Node::Unknown`] together with their decoded children, so newer documents
//! still render and re-serialize. Known kinds keep any attrs they do not
//! interpret in `extra`, which is written back on encode.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::text::text_to_doc;

/// Format version written on every document root.
pub const DOC_VERSION: u64 = 1;
pub const MIN_HEADING_LEVEL: u8 = 1;
pub const MAX_HEADING_LEVEL: u8 = 6;

/// Node and mark attributes as carried on the wire.
pub type Attrs = Map<String, Value>;

/// Root of a rich-text document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawNode", into = "RawNode")]
pub struct Doc {
    pub version: u64,
    pub content: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawNode", into = "RawNode")]
pub enum Node {
    Paragraph {
        content: Vec<Node>,
        extra: Attrs,
    },
    Heading {
        level: u8,
        content: Vec<Node>,
        extra: Attrs,
    },
    BulletList {
        content: Vec<Node>,
        extra: Attrs,
    },
    OrderedList {
        order: Option<u64>,
        content: Vec<Node>,
        extra: Attrs,
    },
    ListItem {
        content: Vec<Node>,
        extra: Attrs,
    },
    CodeBlock {
        language: Option<String>,
        text: String,
        extra: Attrs,
    },
    Blockquote {
        content: Vec<Node>,
        extra: Attrs,
    },
    Rule {
        extra: Attrs,
    },
    HardBreak {
        extra: Attrs,
    },
    Text {
        text: String,
        marks: Vec<Mark>,
        extra: Attrs,
    },
    Unknown(UnknownNode),
}

/// A node whose `type` the converter does not recognise.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UnknownNode {
    pub kind: String,
    pub attrs: Option<Attrs>,
    pub content: Option<Vec<Node>>,
    pub text: Option<String>,
    pub marks: Vec<Mark>,
}

/// Inline styling applied to a text run.
///
/// Styling marks that arrive with attrs are kept as [`Mark::Unknown`] so the
/// attrs survive re-encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawMark", into = "RawMark")]
pub enum Mark {
    Strong,
    Em,
    Code,
    Strike,
    Link {
        href: String,
        title: Option<String>,
        extra: Attrs,
    },
    Unknown {
        kind: String,
        attrs: Option<Attrs>,
    },
}

/// Wire representation of a node, field-for-field with the service schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawNode {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<Attrs>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<RawNode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marks: Option<Vec<RawMark>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMark {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<Attrs>,
}

impl Doc {
    /// Builds a document, substituting one empty paragraph for empty content.
    ///
    /// The service rejects documents without blocks, so a `Doc` built here
    /// always has at least one.
    pub fn new(content: Vec<Node>) -> Self {
        let content = if content.is_empty() {
            vec![Node::paragraph(Vec::new())]
        } else {
            content
        };
        Self {
            version: DOC_VERSION,
            content,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Decodes a document received as opaque JSON.
    ///
    /// Older API versions send rich-text fields as plain strings; those are
    /// wrapped as text paragraphs.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        match value {
            Value::String(text) => Ok(text_to_doc(&text)),
            other => serde_json::from_value(other),
        }
    }

    pub fn to_value(&self) -> Value {
        Value::from(RawNode::from(self.clone()))
    }
}

impl Default for Doc {
    fn default() -> Self {
        Self::empty()
    }
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Self::styled(text, Vec::new())
    }

    pub fn styled(text: impl Into<String>, marks: Vec<Mark>) -> Self {
        Node::Text {
            text: text.into(),
            marks,
            extra: Attrs::new(),
        }
    }

    pub fn paragraph(content: Vec<Node>) -> Self {
        Node::Paragraph {
            content,
            extra: Attrs::new(),
        }
    }

    /// Builds a heading with its level clamped into the schema's range.
    pub fn heading(level: usize, content: Vec<Node>) -> Self {
        Node::Heading {
            level: clamp_heading_level(level as u64),
            content,
            extra: Attrs::new(),
        }
    }

    pub fn bullet_list(items: Vec<Node>) -> Self {
        Node::BulletList {
            content: items,
            extra: Attrs::new(),
        }
    }

    pub fn ordered_list(order: Option<u64>, items: Vec<Node>) -> Self {
        Node::OrderedList {
            order,
            content: items,
            extra: Attrs::new(),
        }
    }

    pub fn list_item(content: Vec<Node>) -> Self {
        Node::ListItem {
            content,
            extra: Attrs::new(),
        }
    }

    pub fn code_block(language: Option<String>, text: impl Into<String>) -> Self {
        Node::CodeBlock {
            language,
            text: text.into(),
            extra: Attrs::new(),
        }
    }

    pub fn blockquote(content: Vec<Node>) -> Self {
        Node::Blockquote {
            content,
            extra: Attrs::new(),
        }
    }

    pub fn rule() -> Self {
        Node::Rule {
            extra: Attrs::new(),
        }
    }

    pub fn hard_break() -> Self {
        Node::HardBreak {
            extra: Attrs::new(),
        }
    }

    /// Inline nodes live inside paragraphs and headings rather than at block level.
    pub fn is_inline(&self) -> bool {
        match self {
            Node::Text { .. } | Node::HardBreak { .. } => true,
            Node::Unknown(unknown) => {
                unknown.text.is_some()
                    || unknown
                        .content
                        .as_ref()
                        .map_or(true, |children| children.iter().all(Node::is_inline))
            }
            _ => false,
        }
    }

    /// Wire `type` string of the node.
    pub fn kind(&self) -> &str {
        match self {
            Node::Paragraph { .. } => "paragraph",
            Node::Heading { .. } => "heading",
            Node::BulletList { .. } => "bulletList",
            Node::OrderedList { .. } => "orderedList",
            Node::ListItem { .. } => "listItem",
            Node::CodeBlock { .. } => "codeBlock",
            Node::Blockquote { .. } => "blockquote",
            Node::Rule { .. } => "rule",
            Node::HardBreak { .. } => "hardBreak",
            Node::Text { .. } => "text",
            Node::Unknown(unknown) => &unknown.kind,
        }
    }
}

impl Mark {
    pub fn link(href: impl Into<String>, title: Option<String>) -> Self {
        Mark::Link {
            href: href.into(),
            title,
            extra: Attrs::new(),
        }
    }
}

fn clamp_heading_level(level: u64) -> u8 {
    level.clamp(MIN_HEADING_LEVEL as u64, MAX_HEADING_LEVEL as u64) as u8
}

fn decode_children(content: Option<Vec<RawNode>>) -> Vec<Node> {
    content
        .unwrap_or_default()
        .into_iter()
        .map(Node::from)
        .collect()
}

fn decode_marks(marks: Option<Vec<RawMark>>) -> Vec<Mark> {
    marks
        .unwrap_or_default()
        .into_iter()
        .map(Mark::from)
        .collect()
}

/// Code block text is carried as text children; hard breaks become newlines.
fn collect_code_text(content: Option<Vec<RawNode>>) -> String {
    let mut text = String::new();
    for child in content.unwrap_or_default() {
        match child.kind.as_str() {
            "hardBreak" => text.push('\n'),
            _ => {
                if let Some(value) = child.text {
                    text.push_str(&value);
                }
            }
        }
    }
    text
}

impl From<RawNode> for Doc {
    fn from(raw: RawNode) -> Self {
        if raw.kind == "doc" {
            Doc {
                version: raw.version.unwrap_or(DOC_VERSION),
                content: decode_children(raw.content),
            }
        } else {
            Doc {
                version: DOC_VERSION,
                content: vec![Node::from(raw)],
            }
        }
    }
}

impl From<Doc> for RawNode {
    fn from(doc: Doc) -> Self {
        RawNode {
            kind: "doc".to_string(),
            version: Some(doc.version),
            content: Some(doc.content.into_iter().map(RawNode::from).collect()),
            ..RawNode::default()
        }
    }
}

impl From<RawNode> for Node {
    fn from(raw: RawNode) -> Self {
        if !matches!(
            raw.kind.as_str(),
            "paragraph"
                | "heading"
                | "bulletList"
                | "orderedList"
                | "listItem"
                | "codeBlock"
                | "blockquote"
                | "rule"
                | "hardBreak"
                | "text"
        ) {
            return Node::Unknown(UnknownNode {
                kind: raw.kind,
                attrs: raw.attrs,
                content: raw
                    .content
                    .map(|children| children.into_iter().map(Node::from).collect()),
                text: raw.text,
                marks: decode_marks(raw.marks),
            });
        }

        let mut extra = raw.attrs.unwrap_or_default();
        match raw.kind.as_str() {
            "paragraph" => Node::Paragraph {
                content: decode_children(raw.content),
                extra,
            },
            "heading" => {
                let level = extra
                    .remove("level")
                    .and_then(|value| value.as_u64())
                    .unwrap_or(MIN_HEADING_LEVEL as u64);
                Node::Heading {
                    level: clamp_heading_level(level),
                    content: decode_children(raw.content),
                    extra,
                }
            }
            "bulletList" => Node::BulletList {
                content: decode_children(raw.content),
                extra,
            },
            "orderedList" => Node::OrderedList {
                order: extra.remove("order").and_then(|value| value.as_u64()),
                content: decode_children(raw.content),
                extra,
            },
            "listItem" => Node::ListItem {
                content: decode_children(raw.content),
                extra,
            },
            "codeBlock" => Node::CodeBlock {
                language: extra
                    .remove("language")
                    .and_then(|value| value.as_str().map(str::to_string))
                    .filter(|language| !language.is_empty()),
                text: collect_code_text(raw.content),
                extra,
            },
            "blockquote" => Node::Blockquote {
                content: decode_children(raw.content),
                extra,
            },
            "rule" => Node::Rule { extra },
            "hardBreak" => Node::HardBreak { extra },
            _ => Node::Text {
                text: raw.text.unwrap_or_default(),
                marks: decode_marks(raw.marks),
                extra,
            },
        }
    }
}

fn encode_children(content: Vec<Node>) -> Option<Vec<RawNode>> {
    Some(content.into_iter().map(RawNode::from).collect())
}

fn encode_marks(marks: Vec<Mark>) -> Option<Vec<RawMark>> {
    if marks.is_empty() {
        None
    } else {
        Some(marks.into_iter().map(RawMark::from).collect())
    }
}

/// Typed attrs are written over the preserved ones; an empty map is omitted.
fn merge_attrs(mut extra: Attrs, typed: &[(&str, Option<Value>)]) -> Option<Attrs> {
    for (name, value) in typed {
        if let Some(value) = value {
            extra.insert(name.to_string(), value.clone());
        }
    }
    if extra.is_empty() {
        None
    } else {
        Some(extra)
    }
}

impl From<Node> for RawNode {
    fn from(node: Node) -> Self {
        let kind = node.kind().to_string();
        let mut raw = RawNode {
            kind,
            ..RawNode::default()
        };
        match node {
            Node::Paragraph { content, extra }
            | Node::BulletList { content, extra }
            | Node::ListItem { content, extra }
            | Node::Blockquote { content, extra } => {
                raw.attrs = merge_attrs(extra, &[]);
                raw.content = encode_children(content);
            }
            Node::Heading {
                level,
                content,
                extra,
            } => {
                raw.attrs = merge_attrs(extra, &[("level", Some(Value::from(level)))]);
                raw.content = encode_children(content);
            }
            Node::OrderedList {
                order,
                content,
                extra,
            } => {
                raw.attrs = merge_attrs(extra, &[("order", order.map(Value::from))]);
                raw.content = encode_children(content);
            }
            Node::CodeBlock {
                language,
                text,
                extra,
            } => {
                raw.attrs = merge_attrs(extra, &[("language", language.map(Value::from))]);
                raw.content = if text.is_empty() {
                    Some(Vec::new())
                } else {
                    encode_children(vec![Node::text(text)])
                };
            }
            Node::Rule { extra } | Node::HardBreak { extra } => {
                raw.attrs = merge_attrs(extra, &[]);
            }
            Node::Text { text, marks, extra } => {
                raw.attrs = merge_attrs(extra, &[]);
                raw.text = Some(text);
                raw.marks = encode_marks(marks);
            }
            Node::Unknown(unknown) => {
                raw.attrs = unknown.attrs;
                raw.content = unknown.content.map(|children| {
                    children.into_iter().map(RawNode::from).collect()
                });
                raw.text = unknown.text;
                raw.marks = encode_marks(unknown.marks);
            }
        }
        raw
    }
}

impl From<RawNode> for Value {
    fn from(raw: RawNode) -> Self {
        // RawNode only holds strings, numbers, maps and sequences.
        serde_json::to_value(raw).unwrap_or(Value::Null)
    }
}

impl From<RawMark> for Mark {
    fn from(raw: RawMark) -> Self {
        let has_attrs = raw.attrs.as_ref().is_some_and(|attrs| !attrs.is_empty());
        match raw.kind.as_str() {
            "strong" if !has_attrs => Mark::Strong,
            "em" if !has_attrs => Mark::Em,
            "code" if !has_attrs => Mark::Code,
            "strike" if !has_attrs => Mark::Strike,
            "link" => {
                let mut extra = raw.attrs.clone().unwrap_or_default();
                match extra.remove("href").as_ref().and_then(Value::as_str) {
                    Some(href) => {
                        let href = href.to_string();
                        let title = match extra.remove("title") {
                            Some(Value::String(title)) => Some(title),
                            Some(other) => {
                                extra.insert("title".to_string(), other);
                                None
                            }
                            None => None,
                        };
                        Mark::Link { href, title, extra }
                    }
                    None => Mark::Unknown {
                        kind: raw.kind,
                        attrs: raw.attrs,
                    },
                }
            }
            _ => Mark::Unknown {
                kind: raw.kind,
                attrs: raw.attrs,
            },
        }
    }
}

impl From<Mark> for RawMark {
    fn from(mark: Mark) -> Self {
        let (kind, attrs) = match mark {
            Mark::Strong => ("strong".to_string(), None),
            Mark::Em => ("em".to_string(), None),
            Mark::Code => ("code".to_string(), None),
            Mark::Strike => ("strike".to_string(), None),
            Mark::Link { href, title, extra } => (
                "link".to_string(),
                merge_attrs(
                    extra,
                    &[
                        ("href", Some(Value::from(href))),
                        ("title", title.map(Value::from)),
                    ],
                ),
            ),
            Mark::Unknown { kind, attrs } => (kind, attrs),
        };
        RawMark { kind, attrs }
    }
}
