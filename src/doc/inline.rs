//! Inline Markdown: emphasis, strong, strike, code spans, links and escapes.

use super::node::{Mark, Node};

/// Nesting limit for inline marks; deeper delimiters are kept as literal text.
const MAX_INLINE_DEPTH: usize = 16;

/// Parses inline Markdown. Newlines in `text` are hard breaks.
pub(crate) fn parse_inline(text: &str) -> Vec<Node> {
    let mut nodes = Vec::new();
    for (index, segment) in text.split('\n').enumerate() {
        if index > 0 {
            nodes.push(Node::hard_break());
        }
        parse_spans(segment, &[], &mut nodes, 0);
    }
    nodes
}

/// Appends a text run, merging with the previous run when the marks match.
pub(crate) fn push_text(out: &mut Vec<Node>, text: &str, marks: &[Mark]) {
    if text.is_empty() {
        return;
    }
    if let Some(Node::Text {
        text: previous,
        marks: previous_marks,
        extra,
    }) = out.last_mut()
    {
        if extra.is_empty() && previous_marks.as_slice() == marks {
            previous.push_str(text);
            return;
        }
    }
    out.push(Node::styled(text, marks.to_vec()));
}

fn with_mark(marks: &[Mark], mark: Mark) -> Vec<Mark> {
    let mut next = marks.to_vec();
    if !next.contains(&mark) {
        next.push(mark);
    }
    next
}

fn parse_spans(input: &str, marks: &[Mark], out: &mut Vec<Node>, depth: usize) {
    let mut plain = String::new();
    let mut pos = 0;

    while let Some(ch) = input[pos..].chars().next() {
        let rest = &input[pos..];
        match ch {
            '\\' => {
                if let Some(escaped) = rest[1..].chars().next().filter(char::is_ascii_punctuation) {
                    plain.push(escaped);
                    pos += 1 + escaped.len_utf8();
                    continue;
                }
            }
            '`' => {
                let run = run_length(rest.as_bytes(), 0, b'`');
                match code_span(rest, run) {
                    Some((code, consumed)) => {
                        push_text(out, &plain, marks);
                        plain.clear();
                        push_text(out, code, &with_mark(marks, Mark::Code));
                        pos += consumed;
                    }
                    None => {
                        plain.push_str(&rest[..run]);
                        pos += run;
                    }
                }
                continue;
            }
            '[' if depth < MAX_INLINE_DEPTH => {
                if let Some(link) = link_span(rest) {
                    push_text(out, &plain, marks);
                    plain.clear();
                    let mark = Mark::link(link.href, link.title.map(str::to_string));
                    parse_spans(link.label, &with_mark(marks, mark), out, depth + 1);
                    pos += link.consumed;
                    continue;
                }
            }
            '*' | '_' | '~' if depth < MAX_INLINE_DEPTH => {
                if let Some(span) = delimited_span(input, pos) {
                    push_text(out, &plain, marks);
                    plain.clear();
                    let mut inner_marks = marks.to_vec();
                    for mark in span.marks {
                        inner_marks = with_mark(&inner_marks, mark);
                    }
                    parse_spans(span.inner, &inner_marks, out, depth + 1);
                    pos += span.consumed;
                    continue;
                }
            }
            _ => {}
        }
        plain.push(ch);
        pos += ch.len_utf8();
    }

    push_text(out, &plain, marks);
}

fn run_length(bytes: &[u8], start: usize, byte: u8) -> usize {
    bytes[start..].iter().take_while(|&&b| b == byte).count()
}

/// Matches a code span opened by `run` backticks; returns content and bytes consumed.
fn code_span(rest: &str, run: usize) -> Option<(&str, usize)> {
    let bytes = rest.as_bytes();
    let mut index = run;
    while index < bytes.len() {
        if bytes[index] == b'`' {
            let closing = run_length(bytes, index, b'`');
            if closing == run {
                let mut content = &rest[run..index];
                if content.len() >= 2
                    && content.starts_with(' ')
                    && content.ends_with(' ')
                    && !content.trim().is_empty()
                {
                    content = &content[1..content.len() - 1];
                }
                if content.is_empty() {
                    return None;
                }
                return Some((content, index + closing));
            }
            index += closing;
        } else {
            index += 1;
        }
    }
    None
}

struct LinkSpan<'a> {
    label: &'a str,
    href: &'a str,
    title: Option<&'a str>,
    consumed: usize,
}

/// Matches `[label](href "title")` at the start of `rest`.
fn link_span(rest: &str) -> Option<LinkSpan<'_>> {
    let bytes = rest.as_bytes();
    let mut nesting = 0usize;
    let mut close = None;
    let mut index = 0;
    while index < bytes.len() {
        match bytes[index] {
            b'\\' => index += 1,
            b'[' => nesting += 1,
            b']' => {
                nesting -= 1;
                if nesting == 0 {
                    close = Some(index);
                    break;
                }
            }
            _ => {}
        }
        index += 1;
    }
    let close = close?;
    let label = &rest[1..close];
    if label.trim().is_empty() || bytes.get(close + 1) != Some(&b'(') {
        return None;
    }
    let target_start = close + 2;
    let target_end = target_start + rest[target_start..].find(')')?;
    let target = rest[target_start..target_end].trim();
    let (href, title) = match target.split_once(char::is_whitespace) {
        Some((href, title)) => {
            let title = title.trim().trim_matches('"');
            (href, Some(title).filter(|title| !title.is_empty()))
        }
        None => (target, None),
    };
    if href.is_empty() {
        return None;
    }
    let href = href.trim_start_matches('<').trim_end_matches('>');
    Some(LinkSpan {
        label,
        href,
        title,
        consumed: target_end + 1,
    })
}

struct DelimitedSpan<'a> {
    inner: &'a str,
    marks: Vec<Mark>,
    consumed: usize,
}

/// Matches emphasis (`*x*`, `_x_`), strong (`**x**`, `__x__`), strong
/// emphasis (`***x***`) or strike (`~~x~~`) opening at byte `pos`.
fn delimited_span(input: &str, pos: usize) -> Option<DelimitedSpan<'_>> {
    let bytes = input.as_bytes();
    let delimiter = bytes[pos];
    let run = run_length(bytes, pos, delimiter);

    if delimiter == b'_' && pos > 0 && is_word_byte(bytes[pos - 1]) {
        return None;
    }

    let widths: &[usize] = match delimiter {
        b'~' => &[2],
        _ if run >= 3 => &[3, 2, 1],
        _ if run == 2 => &[2, 1],
        _ => &[1],
    };

    for &width in widths {
        if width > run {
            continue;
        }
        let content_start = pos + width;
        match bytes.get(content_start) {
            Some(next) if !next.is_ascii_whitespace() => {}
            _ => continue,
        }
        if let Some(close) = find_closer(bytes, content_start, delimiter, width) {
            return Some(DelimitedSpan {
                inner: &input[content_start..close],
                marks: marks_for(delimiter, width),
                consumed: close + width - pos,
            });
        }
    }
    None
}

fn marks_for(delimiter: u8, width: usize) -> Vec<Mark> {
    match (delimiter, width) {
        (b'~', _) => vec![Mark::Strike],
        (_, 3) => vec![Mark::Strong, Mark::Em],
        (_, 2) => vec![Mark::Strong],
        _ => vec![Mark::Em],
    }
}

/// Finds a closing run of exactly `width` delimiters after at least one content byte.
fn find_closer(bytes: &[u8], content_start: usize, delimiter: u8, width: usize) -> Option<usize> {
    let mut index = content_start + 1;
    while index < bytes.len() {
        if bytes[index] == b'`' {
            // Delimiters inside code spans do not close emphasis.
            let run = run_length(bytes, index, b'`');
            index += run;
            while index < bytes.len() && bytes[index] != b'`' {
                index += 1;
            }
            index += run_length(bytes, index.min(bytes.len()), b'`');
            continue;
        }
        if bytes[index] != delimiter {
            index += 1;
            continue;
        }
        let run = run_length(bytes, index, delimiter);
        let preceded_by_space = bytes[index - 1].is_ascii_whitespace();
        let followed_by_word = delimiter == b'_'
            && bytes
                .get(index + run)
                .is_some_and(|&next| is_word_byte(next));
        if run == width && !preceded_by_space && !followed_by_word {
            return Some(index);
        }
        index += run;
    }
    None
}

fn is_word_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte >= 0x80
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_a_single_run() {
        assert_eq!(parse_inline("just words"), vec![Node::text("just words")]);
    }

    #[test]
    fn strong_emphasis_and_code() {
        assert_eq!(
            parse_inline("a **b** *c* `d`"),
            vec![
                Node::text("a "),
                Node::styled("b", vec![Mark::Strong]),
                Node::text(" "),
                Node::styled("c", vec![Mark::Em]),
                Node::text(" "),
                Node::styled("d", vec![Mark::Code]),
            ]
        );
    }

    #[test]
    fn nested_marks_are_ordered_outer_first() {
        assert_eq!(
            parse_inline("**bold _both_**"),
            vec![
                Node::styled("bold ", vec![Mark::Strong]),
                Node::styled("both", vec![Mark::Strong, Mark::Em]),
            ]
        );
        assert_eq!(
            parse_inline("***all***"),
            vec![Node::styled("all", vec![Mark::Strong, Mark::Em])]
        );
    }

    #[test]
    fn links_carry_href_and_title() {
        assert_eq!(
            parse_inline(r#"see [the docs](https://example.test/x "Docs")!"#),
            vec![
                Node::text("see "),
                Node::styled(
                    "the docs",
                    vec![Mark::link("https://example.test/x", Some("Docs".to_string()))]
                ),
                Node::text("!"),
            ]
        );
    }

    #[test]
    fn unmatched_delimiters_stay_literal() {
        assert_eq!(
            parse_inline("2 * 3 = 6 and **open"),
            vec![Node::text("2 * 3 = 6 and **open")]
        );
        assert_eq!(parse_inline("``x`"), vec![Node::text("``x`")]);
        assert_eq!(parse_inline("[label](no-close"), vec![Node::text("[label](no-close")]);
    }

    #[test]
    fn intraword_underscores_are_not_emphasis() {
        assert_eq!(
            parse_inline("snake_case_name"),
            vec![Node::text("snake_case_name")]
        );
    }

    #[test]
    fn escapes_and_strike() {
        assert_eq!(
            parse_inline(r"\*not em\* ~~gone~~"),
            vec![Node::text("*not em* "), Node::styled("gone", vec![Mark::Strike])]
        );
    }

    #[test]
    fn newlines_become_hard_breaks() {
        assert_eq!(
            parse_inline("one\ntwo"),
            vec![Node::text("one"), Node::hard_break(), Node::text("two")]
        );
    }

    #[test]
    fn deep_nesting_is_bounded() {
        let input = format!("{}x{}", "[".repeat(5000), "]".repeat(5000));
        let nodes = parse_inline(&input);
        assert!(!nodes.is_empty());
    }
}
