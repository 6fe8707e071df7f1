//! Inline markup parsing with leftmost-candidate disambiguation.
//!
//! `parse_block` is a pure function from text plus an enabled-style set to an
//! inline node tree. Link targets are stored literally; resolution against
//! the anchor table is a read performed by consumers after assembly.

use chrono::Local;

use crate::error::MarkupError;
use crate::node::{Node, Style, StyleSet};
use crate::symbols::{expand_macro, lookup_symbol};

/// Parse one block of text into an inline node tree.
///
/// When `List` is enabled and the trimmed text begins with `-`, the block is
/// split into bullets first; each bullet is re-parsed without `List`, so
/// lists do not nest. Otherwise whitespace runs collapse to a single space
/// (surrounding whitespace is kept; trimming is the caller's business) and
/// the text is scanned for links, style spans, and symbols.
pub fn parse_block(text: &str, styles: StyleSet) -> Result<Node, MarkupError> {
    if styles.contains(Style::List) && text.trim_start().starts_with('-') {
        return parse_list(text, styles.without(Style::List));
    }

    let collapsed = collapse_whitespace(text);
    let mut nodes = parse_inline(&collapsed, styles)?;
    Ok(match nodes.len() {
        0 => Node::Text(String::new()),
        1 => nodes.remove(0),
        _ => Node::Element {
            style: Style::Normal,
            children: nodes,
        },
    })
}

/// Split a bullet block into items.
///
/// A line starting with `-` begins a new bullet; other lines are
/// continuations, space-joined onto the current bullet. A literal leading
/// `-` is written `\-`, which the escape pass later restores.
fn parse_list(text: &str, item_styles: StyleSet) -> Result<Node, MarkupError> {
    let mut bullets: Vec<String> = Vec::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix('-') {
            bullets.push(rest.trim().to_string());
        } else if let Some(current) = bullets.last_mut() {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(trimmed);
        } else {
            bullets.push(trimmed.to_string());
        }
    }

    let mut items = Vec::with_capacity(bullets.len());
    for bullet in &bullets {
        items.push(parse_block(bullet, item_styles)?);
    }
    Ok(Node::List(items))
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_run = false;
    for ch in text.chars() {
        if ch.is_whitespace() {
            if !in_run {
                out.push(' ');
                in_run = true;
            }
        } else {
            out.push(ch);
            in_run = false;
        }
    }
    out
}

/// One match found by a candidate scan, with byte offsets into the text
enum Candidate<'a> {
    Link {
        start: usize,
        end: usize,
        target: &'a str,
        display: Option<&'a str>,
    },
    Span {
        start: usize,
        end: usize,
        style: Style,
        inner: &'a str,
    },
    Symbol {
        start: usize,
        end: usize,
        name: &'a str,
        is_macro: bool,
    },
}

impl Candidate<'_> {
    fn start(&self) -> usize {
        match self {
            Candidate::Link { start, .. } => *start,
            Candidate::Span { start, .. } => *start,
            Candidate::Symbol { start, .. } => *start,
        }
    }

    fn end(&self) -> usize {
        match self {
            Candidate::Link { end, .. } => *end,
            Candidate::Span { end, .. } => *end,
            Candidate::Symbol { end, .. } => *end,
        }
    }
}

fn parse_inline(text: &str, styles: StyleSet) -> Result<Vec<Node>, MarkupError> {
    if text.is_empty() {
        return Ok(Vec::new());
    }

    // Leftmost candidate wins; ties fall to the earlier scan (link before
    // span before symbol).
    let mut winner: Option<Candidate> = None;
    for candidate in [find_link(text), find_span(text, styles)?, find_symbol(text)]
        .into_iter()
        .flatten()
    {
        if winner.as_ref().map_or(true, |w| candidate.start() < w.start()) {
            winner = Some(candidate);
        }
    }

    let Some(candidate) = winner else {
        return Ok(vec![Node::Text(unescape(text)?)]);
    };

    let mut nodes = parse_inline(&text[..candidate.start()], styles)?;
    nodes.push(build_node(&candidate, styles)?);
    nodes.extend(parse_inline(&text[candidate.end()..], styles)?);
    Ok(nodes)
}

fn build_node(candidate: &Candidate<'_>, styles: StyleSet) -> Result<Node, MarkupError> {
    match candidate {
        Candidate::Link {
            target, display, ..
        } => {
            let children = match display {
                Some(text) => parse_inline(text, styles)?,
                None => Vec::new(),
            };
            Ok(Node::link(*target, children))
        }
        Candidate::Span { style, inner, .. } => {
            Ok(Node::element(*style, parse_inline(inner, styles)?))
        }
        Candidate::Symbol { name, is_macro, .. } => {
            if *is_macro {
                let expanded = expand_macro(name, Local::now())
                    .ok_or_else(|| MarkupError::UnknownMacro(name.to_string()))?;
                Ok(Node::Text(expanded))
            } else {
                let value = lookup_symbol(name)
                    .ok_or_else(|| MarkupError::UnknownSymbol(name.to_string()))?;
                Ok(Node::text(value))
            }
        }
    }
}

/// Earliest link match: `[[target]]` or `[display](target)`
fn find_link(text: &str) -> Option<Candidate<'_>> {
    let bare = find_bare_link(text);
    let inline = find_inline_link(text);
    match (bare, inline) {
        (Some(b), Some(i)) => Some(if b.start() <= i.start() { b } else { i }),
        (bare, inline) => bare.or(inline),
    }
}

fn find_bare_link(text: &str) -> Option<Candidate<'_>> {
    let bytes = text.as_bytes();
    let mut from = 0;
    while let Some(offset) = text[from..].find("[[") {
        let start = from + offset;
        // the target runs to the first ']', which must start a ']]' pair
        if let Some(offset) = text[start + 2..].find(']') {
            let close = start + 2 + offset;
            if bytes.get(close + 1) == Some(&b']') {
                return Some(Candidate::Link {
                    start,
                    end: close + 2,
                    target: &text[start + 2..close],
                    display: None,
                });
            }
        }
        from = start + 1;
    }
    None
}

fn find_inline_link(text: &str) -> Option<Candidate<'_>> {
    let mut from = 0;
    while let Some(offset) = text[from..].find('[') {
        let start = from + offset;
        if let Some(offset) = text[start + 1..].find(']') {
            let bracket = start + 1 + offset;
            if text[bracket + 1..].starts_with('(') {
                if let Some(offset) = text[bracket + 2..].find(')') {
                    let close = bracket + 2 + offset;
                    return Some(Candidate::Link {
                        start,
                        end: close + 1,
                        target: &text[bracket + 2..close],
                        display: Some(&text[start + 1..bracket]),
                    });
                }
            }
        }
        from = start + 1;
    }
    None
}

/// Earliest enabled style span.
///
/// The span is the first occurrence of any enabled delimiter pair; its close
/// is the next occurrence of the same pair. An opening delimiter without a
/// close is fatal.
fn find_span(text: &str, styles: StyleSet) -> Result<Option<Candidate<'_>>, MarkupError> {
    let mut earliest: Option<(usize, Style)> = None;
    for style in styles.spans() {
        let delimiter = match style.delimiter() {
            Some(d) => d,
            None => continue,
        };
        if let Some(pos) = text.find(delimiter) {
            if earliest.map_or(true, |(p, _)| pos < p) {
                earliest = Some((pos, style));
            }
        }
    }

    let Some((start, style)) = earliest else {
        return Ok(None);
    };
    let delimiter = style.delimiter().unwrap_or_default();
    let close = text[start + 2..]
        .find(delimiter)
        .map(|p| p + start + 2)
        .ok_or_else(|| MarkupError::MissingClosing(delimiter.to_string()))?;

    Ok(Some(Candidate::Span {
        start,
        end: close + 2,
        style,
        inner: &text[start + 2..close],
    }))
}

/// Earliest `&name;` symbol or `&$name;` macro
fn find_symbol(text: &str) -> Option<Candidate<'_>> {
    let bytes = text.as_bytes();
    let mut from = 0;
    while let Some(offset) = text[from..].find('&') {
        let start = from + offset;
        let mut cursor = start + 1;
        let is_macro = bytes.get(cursor) == Some(&b'$');
        if is_macro {
            cursor += 1;
        }
        let name_start = cursor;
        while cursor < bytes.len()
            && (bytes[cursor].is_ascii_lowercase() || bytes[cursor].is_ascii_digit())
        {
            cursor += 1;
        }
        if cursor > name_start && bytes.get(cursor) == Some(&b';') {
            return Some(Candidate::Symbol {
                start,
                end: cursor + 1,
                name: &text[name_start..cursor],
                is_macro,
            });
        }
        from = start + 1;
    }
    None
}

/// Resolve `\X` escapes; a trailing unescaped backslash is fatal
fn unescape(text: &str) -> Result<String, MarkupError> {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some(escaped) => out.push(escaped),
                None => return Err(MarkupError::StrayBackslash),
            }
        } else {
            out.push(ch);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(text: &str) -> Node {
        parse_block(text, StyleSet::BODY).unwrap()
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(body("hello world"), Node::text("hello world"));
    }

    #[test]
    fn test_bold_and_italic_sequence() {
        let node = body("**bold** and //italic//");
        let Node::Element { style, children } = node else {
            panic!("expected a container element");
        };
        assert_eq!(style, Style::Normal);
        assert_eq!(
            children,
            vec![
                Node::element(Style::Bold, vec![Node::text("bold")]),
                Node::text(" and "),
                Node::element(Style::Italic, vec![Node::text("italic")]),
            ]
        );
    }

    #[test]
    fn test_single_span_is_unwrapped() {
        assert_eq!(
            body("``code``"),
            Node::element(Style::Code, vec![Node::text("code")])
        );
    }

    #[test]
    fn test_nested_spans() {
        let node = body("**bold //both//**");
        assert_eq!(
            node,
            Node::element(
                Style::Bold,
                vec![
                    Node::text("bold "),
                    Node::element(Style::Italic, vec![Node::text("both")]),
                ]
            )
        );
    }

    #[test]
    fn test_leftmost_link_before_style() {
        let node = body("[[foo]] and **bar**");
        let Node::Element { children, .. } = node else {
            panic!("expected a container element");
        };
        assert_eq!(children[0], Node::link("foo", vec![]));
        assert_eq!(
            children[2],
            Node::element(Style::Bold, vec![Node::text("bar")])
        );
    }

    #[test]
    fn test_link_with_display_text() {
        let node = body("[the **docs**](https://example.org)");
        let Node::Link { target, children } = node else {
            panic!("expected a link");
        };
        assert_eq!(target, "https://example.org");
        assert_eq!(children.len(), 2);
        assert_eq!(children[0], Node::text("the "));
    }

    #[test]
    fn test_disabled_style_is_literal() {
        // param spans only exist where SIGNATURE styles are enabled
        assert_eq!(body("%%value%%"), Node::text("%%value%%"));
        let node = parse_block("%%value%%", StyleSet::SIGNATURE).unwrap();
        assert_eq!(node, Node::element(Style::Param, vec![Node::text("value")]));
    }

    #[test]
    fn test_list_with_continuation() {
        let node = body("- item one\n  continued\n- item two");
        let Node::List(items) = node else {
            panic!("expected a list");
        };
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].text_content(), "item one continued");
        assert_eq!(items[1].text_content(), "item two");
    }

    #[test]
    fn test_list_items_support_spans() {
        let node = body("- **bold** item\n- plain");
        let Node::List(items) = node else {
            panic!("expected a list");
        };
        assert_eq!(
            items[0],
            Node::element(
                Style::Normal,
                vec![
                    Node::element(Style::Bold, vec![Node::text("bold")]),
                    Node::text(" item"),
                ]
            )
        );
    }

    #[test]
    fn test_no_nested_lists() {
        // an escaped dash keeps a literal '-' from opening a nested list
        let node = body("- \\- not a nested bullet");
        let Node::List(items) = node else {
            panic!("expected a list");
        };
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].text_content(), "- not a nested bullet");
    }

    #[test]
    fn test_whitespace_collapses_but_is_not_trimmed() {
        assert_eq!(body("a   b\t\tc"), Node::text("a b c"));
        assert_eq!(body(" padded "), Node::text(" padded "));
    }

    #[test]
    fn test_escaped_delimiters_are_literal() {
        assert_eq!(body("\\*\\*not bold\\*\\*"), Node::text("**not bold**"));
    }

    #[test]
    fn test_stray_backslash_is_fatal() {
        assert_eq!(body_err("dangling\\"), MarkupError::StrayBackslash);
    }

    #[test]
    fn test_missing_closing_delimiter() {
        assert_eq!(
            body_err("**unterminated"),
            MarkupError::MissingClosing("**".to_string())
        );
    }

    #[test]
    fn test_symbol_expansion() {
        assert_eq!(body("a &mdash; b"), Node::text("a \u{2014} b"));
    }

    #[test]
    fn test_unknown_symbol() {
        assert_eq!(
            body_err("&bogus;"),
            MarkupError::UnknownSymbol("bogus".to_string())
        );
    }

    #[test]
    fn test_unknown_macro() {
        assert_eq!(
            body_err("&$century;"),
            MarkupError::UnknownMacro("century".to_string())
        );
    }

    #[test]
    fn test_year_macro_expands() {
        use chrono::Datelike;
        let node = body("&$year;");
        assert_eq!(node, Node::text(Local::now().year().to_string()));
    }

    #[test]
    fn test_symbol_inside_span() {
        let node = body("**3 &times; 4**");
        assert_eq!(node.text_content(), "3 \u{d7} 4");
    }

    fn body_err(text: &str) -> MarkupError {
        parse_block(text, StyleSet::BODY).unwrap_err()
    }
}
