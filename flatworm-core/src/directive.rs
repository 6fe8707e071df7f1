//! Directive registry, file tokenizer, and trailing-clause extraction.
//!
//! A directive line `_tag: value` begins a new fragment; following lines are
//! its pending body. The value may carry trailing `@name<payload>` clauses
//! (an empty name marks the fragment's anchor), which are peeled off right
//! to left before the remaining text becomes the title.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{PageError, PageErrorKind};

/// The closed set of directive tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Directive {
    Section,
    Subsection,
    Heading,
    Definition,
    Property,
    Note,
    Warning,
    Code,
    Toc,
    Null,
}

/// How a directive's remaining value is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleKind {
    /// Inline markup with title styles
    Markup,
    /// Inline markup with signature styles (param spans enabled)
    Signature,
    /// Verbatim text, no markup
    Plain,
    /// The directive carries no title
    None,
}

impl Directive {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "section" => Some(Directive::Section),
            "subsection" => Some(Directive::Subsection),
            "heading" => Some(Directive::Heading),
            "definition" => Some(Directive::Definition),
            "property" => Some(Directive::Property),
            "note" => Some(Directive::Note),
            "warning" => Some(Directive::Warning),
            "code" => Some(Directive::Code),
            "toc" => Some(Directive::Toc),
            "null" => Some(Directive::Null),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Directive::Section => "section",
            Directive::Subsection => "subsection",
            Directive::Heading => "heading",
            Directive::Definition => "definition",
            Directive::Property => "property",
            Directive::Note => "note",
            Directive::Warning => "warning",
            Directive::Code => "code",
            Directive::Toc => "toc",
            Directive::Null => "null",
        }
    }

    pub fn title_kind(&self) -> TitleKind {
        match self {
            Directive::Section
            | Directive::Subsection
            | Directive::Heading
            | Directive::Definition
            | Directive::Note
            | Directive::Warning => TitleKind::Markup,
            Directive::Property => TitleKind::Signature,
            Directive::Code => TitleKind::Plain,
            Directive::Toc | Directive::Null => TitleKind::None,
        }
    }

    /// Extension names this directive's value may carry
    pub fn allowed_extensions(&self) -> &'static [&'static str] {
        match self {
            Directive::Section => &["src", "nav", "priority"],
            Directive::Subsection => &["src"],
            Directive::Heading => &["src"],
            Directive::Property => &["src"],
            Directive::Code => &["lang"],
            Directive::Definition
            | Directive::Note
            | Directive::Warning
            | Directive::Toc
            | Directive::Null => &[],
        }
    }
}

/// A raw `(tag, value, body)` triple produced by the tokenizer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFragment {
    pub directive: Directive,
    pub value: String,
    pub body: Vec<String>,
    /// 1-indexed line of the directive in the source file
    pub line: usize,
}

static DIRECTIVE_REGEX: OnceLock<Regex> = OnceLock::new();

fn directive_regex() -> &'static Regex {
    DIRECTIVE_REGEX.get_or_init(|| Regex::new(r"(?i)^_([a-z]*)\s*:(.*)$").unwrap())
}

/// Split one file's text into raw fragments.
///
/// Returns the free-text preamble (lines before the first directive) and the
/// fragment sequence. Inside a `code` fragment body lines are kept verbatim
/// apart from unescaping a leading `\_`; elsewhere body lines are trimmed.
pub fn tokenize(path: &str, text: &str) -> Result<(Vec<String>, Vec<RawFragment>), PageError> {
    let mut preamble = Vec::new();
    let mut fragments: Vec<RawFragment> = Vec::new();

    for (index, line) in text.lines().enumerate() {
        let number = index + 1;
        if let Some(captures) = directive_regex().captures(line) {
            let tag = captures[1].to_lowercase();
            let directive = Directive::from_tag(&tag).ok_or_else(|| {
                PageError::new(path, number, PageErrorKind::UnknownDirective(tag.clone()))
            })?;
            fragments.push(RawFragment {
                directive,
                value: captures[2].trim().to_string(),
                body: Vec::new(),
                line: number,
            });
            continue;
        }

        match fragments.last_mut() {
            Some(fragment) if fragment.directive == Directive::Code => {
                let unescaped = line.strip_prefix("\\_").map(|rest| format!("_{rest}"));
                fragment.body.push(unescaped.unwrap_or_else(|| line.to_string()));
            }
            Some(fragment) => fragment.body.push(line.trim().to_string()),
            None => preamble.push(line.to_string()),
        }
    }

    Ok((preamble, fragments))
}

/// One trailing `@name<payload>` clause (empty name marks an anchor)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    pub name: String,
    pub payload: String,
}

/// Peel trailing `@name<payload>` clauses off a directive value.
///
/// The scan runs right to left, so clauses come back rightmost first; the
/// remaining text is the clean title. Payload escapes `\<` and `\>` are
/// resolved here.
pub fn split_clauses(value: &str) -> (String, Vec<Clause>) {
    let mut rest = value;
    let mut clauses = Vec::new();
    while let Some((prefix, name, payload)) = peel_clause(rest) {
        clauses.push(Clause {
            name: name.to_string(),
            payload: unescape_payload(payload),
        });
        rest = prefix;
    }
    (rest.trim().to_string(), clauses)
}

/// Match one trailing clause: the rightmost `@name<` whose payload reaches
/// the final `>` without an unescaped `>` in between.
fn peel_clause(value: &str) -> Option<(&str, &str, &str)> {
    let trimmed = value.trim_end();
    if !trimmed.ends_with('>') {
        return None;
    }
    let bytes = trimmed.as_bytes();
    let close = trimmed.len() - 1;

    let mut cursor = close;
    while cursor > 0 {
        cursor -= 1;
        match bytes[cursor] {
            b'>' => {
                // an unescaped '>' here would sit inside any payload opened
                // further left, so no clause can match
                if cursor == 0 || bytes[cursor - 1] != b'\\' {
                    return None;
                }
            }
            b'<' => {
                let mut name_start = cursor;
                while name_start > 0 && is_name_byte(bytes[name_start - 1]) {
                    name_start -= 1;
                }
                if name_start > 0 && bytes[name_start - 1] == b'@' {
                    return Some((
                        &trimmed[..name_start - 1],
                        &trimmed[name_start..cursor],
                        &trimmed[cursor + 1..close],
                    ));
                }
            }
            _ => {}
        }
    }
    None
}

fn is_name_byte(byte: u8) -> bool {
    byte.is_ascii_lowercase() || byte.is_ascii_digit() || byte == b'_'
}

fn unescape_payload(payload: &str) -> String {
    let mut out = String::with_capacity(payload.len());
    let mut chars = payload.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\\' && matches!(chars.peek(), Some('<') | Some('>')) {
            // the peeked bracket becomes the literal character
            if let Some(bracket) = chars.next() {
                out.push(bracket);
            }
        } else {
            out.push(ch);
        }
    }
    out
}

/// Metadata lifted off a directive value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueParts {
    pub title: String,
    pub anchor: Option<String>,
    pub extensions: HashMap<String, String>,
}

/// Split a value into title, anchor, and extensions, validated against the
/// directive's allow-list. A second anchor clause is rejected rather than
/// silently overwriting the first.
pub fn parse_value(directive: Directive, value: &str) -> Result<ValueParts, PageErrorKind> {
    let (title, clauses) = split_clauses(value);
    let mut parts = ValueParts {
        title,
        ..ValueParts::default()
    };

    for clause in clauses {
        if clause.name.is_empty() {
            if parts.anchor.is_some() {
                return Err(PageErrorKind::DuplicateAnchorClause(
                    directive.as_str().to_string(),
                ));
            }
            parts.anchor = Some(clause.payload);
        } else {
            if !directive
                .allowed_extensions()
                .contains(&clause.name.as_str())
            {
                return Err(PageErrorKind::UnsupportedExtension {
                    tag: directive.as_str().to_string(),
                    name: clause.name.to_uppercase(),
                });
            }
            // clauses peel right to left, so the leftmost occurrence of a
            // repeated name lands last and wins
            parts.extensions.insert(clause.name, clause.payload);
        }
    }
    Ok(parts)
}
