//! Document tree to plain text and Markdown.

use super::node::{Doc, Mark, Node};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Style {
    Plain,
    Markdown,
}

/// Flattens a document to plain text for display.
///
/// Blocks are separated by blank lines, list items become `- ` lines,
/// headings keep a `#` marker per level and inline marks are dropped.
/// Unknown nodes contribute their children.
pub fn doc_to_text(doc: &Doc) -> String {
    render_blocks(&doc.content, Style::Plain).join("\n\n")
}

/// Renders a document back to the Markdown subset understood by
/// [`super::markdown_to_doc`].
pub fn doc_to_markdown(doc: &Doc) -> String {
    render_blocks(&doc.content, Style::Markdown).join("\n\n")
}

/// Renders a sequence of sibling nodes into non-empty block chunks.
/// Consecutive inline nodes are grouped into one chunk.
fn render_blocks(nodes: &[Node], style: Style) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut run_start = None;

    for (index, node) in nodes.iter().enumerate() {
        if node.is_inline() {
            run_start.get_or_insert(index);
            continue;
        }
        if let Some(start) = run_start.take() {
            push_chunk(&mut chunks, render_inline(&nodes[start..index], style));
        }
        push_chunk(&mut chunks, render_node(node, style));
    }
    if let Some(start) = run_start {
        push_chunk(&mut chunks, render_inline(&nodes[start..], style));
    }
    chunks
}

fn push_chunk(chunks: &mut Vec<String>, chunk: String) {
    if !chunk.is_empty() {
        chunks.push(chunk);
    }
}

fn render_node(node: &Node, style: Style) -> String {
    match node {
        Node::Paragraph { content, .. } => render_inline(content, style),
        Node::Heading { level, content, .. } => {
            let text = render_inline(content, style);
            let marker = "#".repeat(usize::from(*level));
            if text.is_empty() {
                marker
            } else {
                format!("{} {}", marker, text)
            }
        }
        Node::BulletList { content, .. } => render_list(content, None, style, 0),
        Node::OrderedList { order, content, .. } => {
            render_list(content, Some(order.unwrap_or(1)), style, 0)
        }
        Node::ListItem { .. } => render_list(std::slice::from_ref(node), None, style, 0),
        Node::CodeBlock { language, text, .. } => match style {
            Style::Plain => text.clone(),
            Style::Markdown => render_fence(language.as_deref(), text),
        },
        Node::Blockquote { content, .. } => {
            let inner = render_blocks(content, style).join("\n\n");
            quote_lines(&inner)
        }
        Node::Rule { .. } => "---".to_string(),
        Node::Text { .. } | Node::HardBreak { .. } => render_inline(std::slice::from_ref(node), style),
        Node::Unknown(unknown) => {
            if node.is_inline() {
                render_inline(std::slice::from_ref(node), style)
            } else {
                let children = unknown.content.as_deref().unwrap_or_default();
                render_blocks(children, style).join("\n\n")
            }
        }
    }
}

fn render_inline(nodes: &[Node], style: Style) -> String {
    let mut out = String::new();
    for node in nodes {
        match node {
            Node::Text { text, marks, .. } => match style {
                Style::Plain => out.push_str(text),
                Style::Markdown => out.push_str(&apply_marks(text, marks)),
            },
            Node::HardBreak { .. } => match style {
                Style::Plain => out.push('\n'),
                Style::Markdown => out.push_str("\\\n"),
            },
            Node::Unknown(unknown) if node.is_inline() => {
                if let Some(text) = &unknown.text {
                    match style {
                        Style::Plain => out.push_str(text),
                        Style::Markdown => out.push_str(&apply_marks(text, &unknown.marks)),
                    }
                }
                if let Some(children) = &unknown.content {
                    out.push_str(&render_inline(children, style));
                }
            }
            other => out.push_str(&render_node(other, style)),
        }
    }
    out
}

/// Wraps a text run in Markdown delimiters; the first mark is outermost.
fn apply_marks(text: &str, marks: &[Mark]) -> String {
    let mut rendered = text.to_string();
    for mark in marks.iter().rev() {
        rendered = match mark {
            Mark::Strong => format!("**{}**", rendered),
            Mark::Em => format!("*{}*", rendered),
            Mark::Strike => format!("~~{}~~", rendered),
            Mark::Code => {
                let fence = "`".repeat(longest_run(&rendered, '`') + 1);
                if rendered.starts_with('`') || rendered.ends_with('`') {
                    format!("{fence} {rendered} {fence}")
                } else {
                    format!("{fence}{rendered}{fence}")
                }
            }
            Mark::Link { href, title, .. } => match title {
                Some(title) => format!("[{}]({} \"{}\")", rendered, href, title),
                None => format!("[{}]({})", rendered, href),
            },
            Mark::Unknown { .. } => rendered,
        };
    }
    rendered
}

fn longest_run(text: &str, target: char) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for ch in text.chars() {
        if ch == target {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

fn render_fence(language: Option<&str>, text: &str) -> String {
    let fence = "`".repeat(longest_run(text, '`').max(2) + 1);
    format!("{}{}\n{}\n{}", fence, language.unwrap_or_default(), text, fence)
}

fn quote_lines(text: &str) -> String {
    text.lines()
        .map(|line| {
            if line.is_empty() {
                ">".to_string()
            } else {
                format!("> {}", line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Renders list items one per line, nested lists indented two spaces per level.
fn render_list(items: &[Node], start: Option<u64>, style: Style, depth: usize) -> String {
    let pad = "  ".repeat(depth);
    let continuation = format!("\n{}  ", pad);
    let mut lines = Vec::new();

    for (offset, item) in items.iter().enumerate() {
        let marker = match (style, start) {
            (Style::Markdown, Some(first)) => format!("{}.", first + offset as u64),
            _ => "-".to_string(),
        };
        let children = match item {
            Node::ListItem { content, .. } => content.as_slice(),
            other => std::slice::from_ref(other),
        };

        let mut item_lines: Vec<String> = Vec::new();
        let mut has_head = false;
        for child in children {
            let rendered = match child {
                Node::BulletList { content, .. } => render_list(content, None, style, depth + 1),
                Node::OrderedList { order, content, .. } => {
                    render_list(content, Some(order.unwrap_or(1)), style, depth + 1)
                }
                other => {
                    let text = render_node(other, style);
                    if text.is_empty() {
                        continue;
                    }
                    let text = text.replace('\n', &continuation);
                    if has_head {
                        format!("{}  {}", pad, text)
                    } else {
                        has_head = true;
                        format!("{}{} {}", pad, marker, text)
                    }
                }
            };
            if !rendered.is_empty() {
                item_lines.push(rendered);
            }
        }
        if !has_head {
            item_lines.insert(0, format!("{}{}", pad, marker));
        }
        lines.extend(item_lines);
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc::markdown::markdown_to_doc;
    use crate::doc::node::UnknownNode;
    use crate::doc::text::text_to_doc;

    #[test]
    fn plain_text_layout() {
        let doc = markdown_to_doc(
            "# Title\n\nSome **bold** and `code`.\n\n- one\n  - nested\n- two\n\n1. first\n\n> quoted\n\n---\n\n```sh\nls -la\n```",
        );
        assert_eq!(
            doc_to_text(&doc),
            "# Title\n\nSome bold and code.\n\n- one\n  - nested\n- two\n\n- first\n\n> quoted\n\n---\n\nls -la"
        );
    }

    #[test]
    fn markdown_rendering_keeps_marks() {
        let source = "## Plan\n\nShip **fast** with *care*, see [docs](https://example.test).\n\n3. three\n4. four\n\n```rust\nlet x = 1;\n```";
        let doc = markdown_to_doc(source);
        assert_eq!(doc_to_markdown(&doc), source);
        assert_eq!(markdown_to_doc(&doc_to_markdown(&doc)), doc);
    }

    #[test]
    fn hard_breaks_inside_list_items_are_indented() {
        let doc = Doc::new(vec![Node::bullet_list(vec![Node::list_item(vec![Node::paragraph(
            vec![Node::text("a"), Node::hard_break(), Node::text("b")],
        )])])]);
        assert_eq!(doc_to_text(&doc), "- a\n  b");
    }

    #[test]
    fn unknown_nodes_are_skipped_but_children_rendered() {
        let doc = Doc::new(vec![
            Node::Unknown(UnknownNode {
                kind: "panel".to_string(),
                content: Some(vec![
                    Node::paragraph(vec![Node::text("inside panel")]),
                    Node::paragraph(vec![Node::text("second")]),
                ]),
                ..UnknownNode::default()
            }),
            Node::paragraph(vec![
                Node::text("hi "),
                Node::Unknown(UnknownNode {
                    kind: "emoji".to_string(),
                    ..UnknownNode::default()
                }),
                Node::text("there"),
            ]),
        ]);
        assert_eq!(doc_to_text(&doc), "inside panel\n\nsecond\n\nhi there");
    }

    #[test]
    fn empty_blocks_produce_no_output() {
        assert_eq!(doc_to_text(&Doc::empty()), "");
        let doc = Doc::new(vec![
            Node::paragraph(Vec::new()),
            Node::paragraph(vec![Node::text("only")]),
            Node::bullet_list(Vec::new()),
        ]);
        assert_eq!(doc_to_text(&doc), "only");
    }

    #[test]
    fn every_word_survives_markdown_to_text() {
        let source = "# Release *notes*\n\nFixed **crash** in `parser` and ~~old~~ [link text](http://x.test)\n\n* alpha\n    * beta\n        * gamma\n\n> wise _words_\n\n```\nraw **code**\n```";
        let text = doc_to_text(&markdown_to_doc(source));
        for word in [
            "Release", "notes", "Fixed", "crash", "parser", "old", "link", "text", "alpha",
            "beta", "gamma", "wise", "words", "raw", "**code**",
        ] {
            assert!(text.contains(word), "missing {word:?} in {text:?}");
        }
    }

    #[test]
    fn text_round_trip_is_stable() {
        for input in [
            "plain",
            "line one\nline two\n\nsecond paragraph",
            "  leading spaces\n\n\n\ttabbed",
            "- not a list\n# not a heading",
            "",
        ] {
            let first = text_to_doc(input);
            let again = text_to_doc(&doc_to_text(&first));
            assert_eq!(again, first, "{input:?}");
        }
    }

    #[test]
    fn code_marks_use_longer_fences_around_backticks() {
        assert_eq!(apply_marks("a`b", &[Mark::Code]), "``a`b``");
        assert_eq!(apply_marks("x", &[Mark::Strong, Mark::Code]), "**`x`**");
    }
}
