//! Plain text to document tree.

use super::node::{Doc, Node};

/// Wraps literal text as paragraphs.
///
/// Blank (whitespace-only) lines separate paragraphs; the remaining lines of
/// a paragraph are joined by hard breaks. Nothing is interpreted as markup.
pub fn text_to_doc(text: &str) -> Doc {
    let mut blocks = Vec::new();
    let mut current: Vec<Node> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(Node::paragraph(std::mem::take(&mut current)));
            }
            continue;
        }
        if !current.is_empty() {
            current.push(Node::hard_break());
        }
        current.push(Node::text(line));
    }
    if !current.is_empty() {
        blocks.push(Node::paragraph(current));
    }

    Doc::new(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_lines_split_paragraphs() {
        let doc = text_to_doc("first line\nsecond line\n\n  \n**third**");
        assert_eq!(
            doc.content,
            vec![
                Node::paragraph(vec![
                    Node::text("first line"),
                    Node::hard_break(),
                    Node::text("second line"),
                ]),
                Node::paragraph(vec![Node::text("**third**")]),
            ]
        );
    }

    #[test]
    fn empty_text_yields_one_empty_paragraph() {
        assert_eq!(text_to_doc("").content, vec![Node::paragraph(Vec::new())]);
        assert_eq!(text_to_doc("\n \n").content, vec![Node::paragraph(Vec::new())]);
    }

    #[test]
    fn leading_whitespace_is_kept_verbatim() {
        assert_eq!(
            text_to_doc("  indented # not a heading").content,
            vec![Node::paragraph(vec![Node::text("  indented # not a heading")])]
        );
    }
}
