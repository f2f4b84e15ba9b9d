//! Markdown to document tree parsing.
//!
//! Only a constrained subset is recognised: ATX headings, fenced code,
//! bullet and ordered lists, blockquotes, thematic breaks, paragraphs with
//! hard breaks, and the inline marks handled by [`super::inline`].
//! Everything else is carried as paragraph text.

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use super::inline::parse_inline;
use super::node::{Doc, Node};

/// Deepest list nesting emitted; deeper items are attached at this depth.
pub const MAX_LIST_DEPTH: usize = 2;
/// Blockquote nesting beyond this is kept as literal text.
const MAX_QUOTE_DEPTH: usize = 8;
const TAB_WIDTH: usize = 4;

static HEADING_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ {0,3}(#+)(?:[ \t]+(.*?))?[ \t]*$").expect("invalid heading regex"));
static RULE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^ {0,3}(?:(?:-[ \t]*){3,}|(?:\*[ \t]*){3,}|(?:_[ \t]*){3,})$")
        .expect("invalid rule regex")
});
static FENCE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^( {0,3})(`{3,}|~{3,})(.*)$").expect("invalid fence regex"));
static QUOTE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ {0,3}> ?(.*)$").expect("invalid blockquote regex"));
static LIST_ITEM_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([ \t]*)([-*+]|\d{1,9}[.)])(?:[ \t]+(.*))?$").expect("invalid list item regex")
});

/// Parses Markdown into a document. Never fails: input that does not form
/// a recognised construct is kept as paragraph text, and empty input yields
/// a single empty paragraph.
pub fn markdown_to_doc(markdown: &str) -> Doc {
    let lines: Vec<&str> = markdown.lines().collect();
    Doc::new(parse_blocks(&lines, 0))
}

fn parse_blocks(lines: &[&str], quote_depth: usize) -> Vec<Node> {
    let mut blocks = Vec::new();
    let mut paragraph: Vec<&str> = Vec::new();
    let mut index = 0;

    while index < lines.len() {
        let line = lines[index];

        if line.trim().is_empty() {
            flush_paragraph(&mut paragraph, &mut blocks);
            index += 1;
            continue;
        }

        if let Some(fence) = Fence::open(line) {
            flush_paragraph(&mut paragraph, &mut blocks);
            let (node, next) = parse_code_block(lines, index, &fence);
            blocks.push(node);
            index = next;
            continue;
        }

        if let Some(heading) = parse_heading(line) {
            flush_paragraph(&mut paragraph, &mut blocks);
            blocks.push(heading);
            index += 1;
            continue;
        }

        if RULE_REGEX.is_match(line) {
            flush_paragraph(&mut paragraph, &mut blocks);
            blocks.push(Node::rule());
            index += 1;
            continue;
        }

        if quote_depth < MAX_QUOTE_DEPTH && QUOTE_REGEX.is_match(line) {
            flush_paragraph(&mut paragraph, &mut blocks);
            let mut quoted = Vec::new();
            while let Some(captures) = lines.get(index).and_then(|line| QUOTE_REGEX.captures(line)) {
                quoted.push(captures.get(1).map_or("", |m| m.as_str()));
                index += 1;
            }
            blocks.push(Node::blockquote(parse_blocks(&quoted, quote_depth + 1)));
            continue;
        }

        if ListLine::parse(line).is_some() {
            flush_paragraph(&mut paragraph, &mut blocks);
            let (lists, next) = parse_list(lines, index);
            blocks.extend(lists);
            index = next;
            continue;
        }

        paragraph.push(line);
        index += 1;
    }

    flush_paragraph(&mut paragraph, &mut blocks);
    blocks
}

/// Joins paragraph lines: a trailing backslash or two trailing spaces make a
/// hard break, any other line ending is a soft break rendered as a space.
fn flush_paragraph(paragraph: &mut Vec<&str>, blocks: &mut Vec<Node>) {
    if paragraph.is_empty() {
        return;
    }
    let mut text = String::new();
    let last = paragraph.len() - 1;
    for (position, raw) in paragraph.iter().enumerate() {
        let line = raw.trim_start();
        if position == last {
            text.push_str(line.trim_end());
        } else if let Some(stripped) = line.strip_suffix('\\') {
            text.push_str(stripped);
            text.push('\n');
        } else if line.ends_with("  ") {
            text.push_str(line.trim_end());
            text.push('\n');
        } else {
            text.push_str(line.trim_end());
            text.push(' ');
        }
    }
    paragraph.clear();
    blocks.push(Node::paragraph(parse_inline(&text)));
}

fn parse_heading(line: &str) -> Option<Node> {
    let captures = HEADING_REGEX.captures(line)?;
    let level = captures.get(1).map_or(1, |m| m.as_str().len());
    let mut text = captures.get(2).map_or("", |m| m.as_str());
    // Optional closing sequence: `## Title ##`.
    let without_closing = text.trim_end_matches('#');
    if without_closing.len() < text.len()
        && (without_closing.is_empty() || without_closing.ends_with(|c: char| c == ' ' || c == '\t'))
    {
        text = without_closing.trim_end();
    }
    if level > 6 {
        debug!("clamping heading level {} to 6", level);
    }
    Some(Node::heading(level, parse_inline(text)))
}

struct Fence {
    indent: usize,
    marker: u8,
    width: usize,
    language: Option<String>,
}

impl Fence {
    fn open(line: &str) -> Option<Self> {
        let captures = FENCE_REGEX.captures(line)?;
        let indent = captures.get(1).map_or(0, |m| m.as_str().len());
        let run = captures.get(2)?.as_str();
        let info = captures.get(3).map_or("", |m| m.as_str()).trim();
        let marker = run.as_bytes()[0];
        if marker == b'`' && info.contains('`') {
            return None;
        }
        let language = info
            .split_whitespace()
            .next()
            .map(str::to_string);
        Some(Self {
            indent,
            marker,
            width: run.len(),
            language,
        })
    }

    fn closes(&self, line: &str) -> bool {
        let trimmed = line.trim();
        let run = trimmed.bytes().take_while(|&b| b == self.marker).count();
        run >= self.width && run == trimmed.len()
    }
}

/// Collects a fenced block. An unterminated fence runs to the end of input.
fn parse_code_block(lines: &[&str], start: usize, fence: &Fence) -> (Node, usize) {
    let mut body = Vec::new();
    let mut index = start + 1;
    let mut terminated = false;
    while index < lines.len() {
        let line = lines[index];
        index += 1;
        if fence.closes(line) {
            terminated = true;
            break;
        }
        body.push(strip_indent(line, fence.indent));
    }
    if !terminated {
        debug!("unterminated code fence opened on line {}", start + 1);
    }
    let node = Node::code_block(fence.language.clone(), body.join("\n"));
    (node, index)
}

fn strip_indent(line: &str, indent: usize) -> &str {
    let leading = line.bytes().take(indent).take_while(|&b| b == b' ').count();
    &line[leading..]
}

fn leading_columns(line: &str) -> usize {
    line.chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { TAB_WIDTH } else { 1 })
        .sum()
}

struct ListLine<'a> {
    indent: usize,
    ordered: bool,
    number: u64,
    text: &'a str,
}

impl<'a> ListLine<'a> {
    fn parse(line: &'a str) -> Option<Self> {
        let captures = LIST_ITEM_REGEX.captures(line)?;
        let marker = captures.get(2)?.as_str();
        let ordered = marker.ends_with(|c: char| c == '.' || c == ')');
        let number = if ordered {
            marker[..marker.len() - 1].parse().unwrap_or(1)
        } else {
            0
        };
        Some(Self {
            indent: leading_columns(line),
            ordered,
            number,
            text: captures.get(3).map_or("", |m| m.as_str()),
        })
    }
}

struct ListEntry {
    depth: usize,
    ordered: bool,
    number: u64,
    text: String,
}

/// Parses a run of list lines starting at `start` into one or more list nodes.
fn parse_list(lines: &[&str], start: usize) -> (Vec<Node>, usize) {
    let mut items: Vec<(usize, bool, u64, String)> = Vec::new();
    let mut index = start;

    while index < lines.len() {
        let line = lines[index];
        if RULE_REGEX.is_match(line) || Fence::open(line).is_some() {
            break;
        }
        if let Some(item) = ListLine::parse(line) {
            items.push((item.indent, item.ordered, item.number, item.text.trim_end().to_string()));
            index += 1;
            continue;
        }
        if line.trim().is_empty() {
            // A blank line keeps the list open only when another item follows.
            let next = lines[index..]
                .iter()
                .position(|candidate| !candidate.trim().is_empty())
                .map(|offset| index + offset);
            match next {
                Some(next) if ListLine::parse(lines[next]).is_some() => {
                    index = next;
                    continue;
                }
                _ => break,
            }
        }
        if leading_columns(line) >= 2 {
            if let Some(last) = items.last_mut() {
                if !last.3.is_empty() {
                    last.3.push(' ');
                }
                last.3.push_str(line.trim());
                index += 1;
                continue;
            }
        }
        break;
    }

    let entries = assign_depths(items);
    (build_lists(&entries, 1), index)
}

/// Turns indentation into nesting depth, clamping at [`MAX_LIST_DEPTH`].
/// Items that would sit deeper keep two spaces per extra level in their text.
fn assign_depths(items: Vec<(usize, bool, u64, String)>) -> Vec<ListEntry> {
    let mut indents: Vec<usize> = Vec::new();
    let mut entries = Vec::with_capacity(items.len());
    for (indent, ordered, number, text) in items {
        while indents.last().is_some_and(|&top| indent < top) {
            indents.pop();
        }
        if indents.last().map_or(true, |&top| indent > top) {
            indents.push(indent);
        }
        let depth = indents.len();
        let (depth, text) = if depth > MAX_LIST_DEPTH {
            let extra = depth - MAX_LIST_DEPTH;
            (MAX_LIST_DEPTH, format!("{}{}", "  ".repeat(extra), text))
        } else {
            (depth, text)
        };
        entries.push(ListEntry {
            depth,
            ordered,
            number,
            text,
        });
    }
    entries
}

fn build_lists(entries: &[ListEntry], depth: usize) -> Vec<Node> {
    let mut lists = Vec::new();
    let mut index = 0;
    while index < entries.len() {
        let ordered = entries[index].ordered;
        let start_number = entries[index].number;
        let mut items = Vec::new();
        while index < entries.len() && entries[index].ordered == ordered {
            let entry = &entries[index];
            index += 1;
            let children_start = index;
            while index < entries.len() && entries[index].depth > depth {
                index += 1;
            }
            let mut content = Vec::new();
            let inline = parse_inline(&entry.text);
            content.push(Node::paragraph(inline));
            if children_start < index {
                content.extend(build_lists(&entries[children_start..index], depth + 1));
            }
            items.push(Node::list_item(content));
        }
        lists.push(if ordered {
            Node::ordered_list(Some(start_number).filter(|&number| number != 1), items)
        } else {
            Node::bullet_list(items)
        });
    }
    lists
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc::node::Mark;

    fn blocks(markdown: &str) -> Vec<Node> {
        markdown_to_doc(markdown).content
    }

    fn para(text: &str) -> Node {
        Node::paragraph(vec![Node::text(text)])
    }

    fn item(text: &str) -> Node {
        Node::list_item(vec![para(text)])
    }

    #[test]
    fn empty_and_blank_input_yield_one_empty_paragraph() {
        for input in ["", "   ", "\n\n\t\n"] {
            assert_eq!(blocks(input), vec![Node::paragraph(Vec::new())], "{input:?}");
        }
    }

    #[test]
    fn headings_clamp_to_six() {
        assert_eq!(
            blocks("####### Too Deep"),
            vec![Node::heading(6, vec![Node::text("Too Deep")])]
        );
        assert_eq!(
            blocks("## Title ##"),
            vec![Node::heading(2, vec![Node::text("Title")])]
        );
    }

    #[test]
    fn hash_without_space_is_paragraph_text() {
        assert_eq!(blocks("#hashtag"), vec![para("#hashtag")]);
    }

    #[test]
    fn paragraphs_soft_and_hard_breaks() {
        assert_eq!(
            blocks("one\ntwo  \nthree\\\nfour\n\nnext"),
            vec![
                Node::paragraph(vec![
                    Node::text("one two"),
                    Node::hard_break(),
                    Node::text("three"),
                    Node::hard_break(),
                    Node::text("four"),
                ]),
                para("next"),
            ]
        );
    }

    #[test]
    fn fenced_code_keeps_language_and_body() {
        assert_eq!(
            blocks("```rust\nfn main() {\n    **not bold**\n}\n```\nafter"),
            vec![
                Node::code_block(
                    Some("rust".to_string()),
                    "fn main() {\n    **not bold**\n}",
                ),
                para("after"),
            ]
        );
    }

    #[test]
    fn unterminated_fence_runs_to_end() {
        assert_eq!(
            blocks("text\n~~~\nline one\n\nline two"),
            vec![
                para("text"),
                Node::code_block(None, "line one\n\nline two"),
            ]
        );
        assert_eq!(
            blocks("```"),
            vec![Node::code_block(None, "")]
        );
    }

    #[test]
    fn rules_and_quotes() {
        assert_eq!(
            blocks("> quoted *text*\n> > inner\n\n---"),
            vec![
                Node::blockquote(vec![
                    Node::paragraph(vec![
                        Node::text("quoted "),
                        Node::styled("text", vec![Mark::Em]),
                    ]),
                    Node::blockquote(vec![para("inner")]),
                ]),
                Node::rule(),
            ]
        );
    }

    #[test]
    fn bullet_and_ordered_lists() {
        assert_eq!(
            blocks("- a\n* b\n\n3. c\n4. d"),
            vec![
                Node::bullet_list(vec![item("a"), item("b")]),
                Node::ordered_list(Some(3), vec![item("c"), item("d")]),
            ]
        );
    }

    #[test]
    fn nested_lists_and_continuations() {
        assert_eq!(
            blocks("- parent\n  continued\n  1. child\n- sibling"),
            vec![Node::bullet_list(vec![
                Node::list_item(vec![
                    para("parent continued"),
                    Node::ordered_list(None, vec![item("child")]),
                ]),
                item("sibling"),
            ])]
        );
    }

    #[test]
    fn lists_deeper_than_two_are_flattened() {
        assert_eq!(
            blocks("- one\n  - two\n    - three\n      - four"),
            vec![Node::bullet_list(vec![Node::list_item(vec![
                para("one"),
                Node::bullet_list(vec![item("two"), item("  three"), item("    four")]),
            ])])]
        );
    }

    #[test]
    fn list_ends_at_plain_paragraph() {
        assert_eq!(
            blocks("- a\n\nplain"),
            vec![Node::bullet_list(vec![item("a")]), para("plain")]
        );
    }

    #[test]
    fn malformed_input_never_panics() {
        let inputs = [
            "```",
            "````\n```",
            "> ",
            ">>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>> deep",
            "- ",
            "1.",
            "**",
            "[](",
            "  -   \n    -\n\t\t- x",
            "# ",
            "\u{1F600} *emoji* _über_",
        ];
        for input in inputs {
            let doc = markdown_to_doc(input);
            assert!(!doc.content.is_empty(), "{input:?}");
        }
    }
}
