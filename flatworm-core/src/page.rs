//! Block assembly: one source file's token stream into a Section.

use std::collections::HashMap;

use crate::directive::{parse_value, tokenize, Directive, RawFragment, TitleKind};
use crate::error::{MarkupError, PageError, PageErrorKind};
use crate::fragment::{Content, ContentKind, Section, Subsection};
use crate::markup::parse_block;
use crate::node::{Node, StyleSet};

/// One input page: output key, originating file, and full text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSource {
    pub path: String,
    pub source: String,
    pub text: String,
}

impl PageSource {
    pub fn new(
        path: impl Into<String>,
        source: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            source: source.into(),
            text: text.into(),
        }
    }
}

/// Parse one source file into its Section.
///
/// `path` becomes the page's output key; `source` is the originating file
/// name used in error messages. Exactly one `_section` directive must be
/// present, and it must precede all other content.
pub fn parse_page(path: &str, source: &str, text: &str) -> Result<Section, PageError> {
    let (preamble, fragments) = tokenize(source, text)?;

    if let Some(index) = preamble.iter().position(|line| !line.trim().is_empty()) {
        return Err(PageError::new(
            source,
            index + 1,
            PageErrorKind::MissingSection,
        ));
    }

    let mut section: Option<Section> = None;
    let mut subsection: Option<Subsection> = None;
    let mut last_line = 1;

    for fragment in &fragments {
        last_line = fragment.line;
        let located = |kind: PageErrorKind| PageError::new(source, fragment.line, kind);

        match fragment.directive {
            Directive::Section => {
                if section.is_some() {
                    return Err(located(PageErrorKind::DuplicateSection));
                }
                section = Some(build_section(path, source, fragment).map_err(located)?);
            }
            Directive::Subsection => {
                if section.is_none() {
                    return Err(located(PageErrorKind::SubsectionWithoutSection));
                }
                let next = build_subsection(fragment).map_err(located)?;
                if let (Some(open), Some(sec)) = (subsection.take(), section.as_mut()) {
                    sec.attach_child(open);
                }
                subsection = Some(next);
            }
            Directive::Heading => {
                let Some(open) = subsection.as_mut() else {
                    return Err(located(PageErrorKind::HeadingWithoutSubsection));
                };
                open.attach_content(build_content(fragment).map_err(located)?);
            }
            _ => {
                let content = build_content(fragment).map_err(located)?;
                if let Some(open) = subsection.as_mut() {
                    open.attach_content(content);
                } else if let Some(sec) = section.as_mut() {
                    sec.attach_content(content);
                } else {
                    return Err(located(PageErrorKind::MissingSection));
                }
            }
        }
    }

    let Some(mut section) = section else {
        return Err(PageError::new(source, last_line, PageErrorKind::MissingSection));
    };
    if let Some(open) = subsection.take() {
        section.attach_child(open);
    }

    tracing::debug!(
        "Parsed page {} ({} body fragments, {} subsections)",
        path,
        section.body.len(),
        section.children.len()
    );
    Ok(section)
}

fn build_section(
    path: &str,
    source: &str,
    fragment: &RawFragment,
) -> Result<Section, PageErrorKind> {
    let parts = parse_value(Directive::Section, &fragment.value)?;
    let title = parse_block(&parts.title, StyleSet::TITLE)?;

    let priority = match parts.extensions.get("priority") {
        Some(payload) => payload
            .trim()
            .parse::<i32>()
            .map_err(|_| PageErrorKind::InvalidPriority(payload.clone()))?,
        None => 0,
    };

    let mut section = Section {
        path: path.to_string(),
        value: fragment.value.clone(),
        title,
        anchor: parts.anchor,
        sid: None,
        nav_title: parts.extensions.get("nav").cloned(),
        priority,
        extensions: parts.extensions,
        dependencies: vec![source.to_string()],
        mtime: None,
        source: Some(source.to_string()),
        body: Vec::new(),
        children: Vec::new(),
    };

    // free text following the directive becomes a null-tag body fragment
    if fragment.body.iter().any(|line| !line.trim().is_empty()) {
        section.attach_content(Content {
            directive: Directive::Null,
            value: String::new(),
            anchor: None,
            extensions: HashMap::new(),
            title: None,
            kind: ContentKind::Body {
                nodes: parse_paragraphs(&fragment.body)?,
            },
        });
    }
    Ok(section)
}

fn build_subsection(fragment: &RawFragment) -> Result<Subsection, PageErrorKind> {
    let parts = parse_value(Directive::Subsection, &fragment.value)?;
    let mut subsection = Subsection {
        value: fragment.value.clone(),
        title: parse_block(&parts.title, StyleSet::TITLE)?,
        anchor: parts.anchor,
        sid: None,
        extensions: parts.extensions,
        path: String::new(),
        body: Vec::new(),
    };
    if fragment.body.iter().any(|line| !line.trim().is_empty()) {
        subsection.attach_content(Content {
            directive: Directive::Null,
            value: String::new(),
            anchor: None,
            extensions: HashMap::new(),
            title: None,
            kind: ContentKind::Body {
                nodes: parse_paragraphs(&fragment.body)?,
            },
        });
    }
    Ok(subsection)
}

fn build_content(fragment: &RawFragment) -> Result<Content, PageErrorKind> {
    let parts = parse_value(fragment.directive, &fragment.value)?;

    let title = match fragment.directive.title_kind() {
        TitleKind::Markup => parse_title(&parts.title, StyleSet::TITLE)?,
        TitleKind::Signature => parse_title(&parts.title, StyleSet::SIGNATURE)?,
        TitleKind::Plain => {
            (!parts.title.is_empty()).then(|| Node::text(parts.title.clone()))
        }
        TitleKind::None => None,
    };

    let kind = match fragment.directive {
        Directive::Code => ContentKind::Code {
            source: code_source(&fragment.body),
            language: parts.extensions.get("lang").cloned(),
        },
        // toc bodies are page references, one per line, never markup
        Directive::Toc => ContentKind::Body {
            nodes: fragment
                .body
                .iter()
                .map(|line| line.trim())
                .filter(|line| !line.is_empty())
                .map(Node::text)
                .collect(),
        },
        _ => ContentKind::Body {
            nodes: parse_paragraphs(&fragment.body)?,
        },
    };

    Ok(Content {
        directive: fragment.directive,
        value: fragment.value.clone(),
        anchor: parts.anchor,
        extensions: parts.extensions,
        title,
        kind,
    })
}

fn parse_title(title: &str, styles: StyleSet) -> Result<Option<Node>, MarkupError> {
    if title.is_empty() {
        return Ok(None);
    }
    Ok(Some(parse_block(title, styles)?))
}

/// Split pending body lines on blank-line runs and parse each paragraph
fn parse_paragraphs(lines: &[String]) -> Result<Vec<Node>, MarkupError> {
    let mut nodes = Vec::new();
    let mut paragraph: Vec<&str> = Vec::new();
    for line in lines {
        if line.trim().is_empty() {
            if !paragraph.is_empty() {
                nodes.push(parse_block(&paragraph.join("\n"), StyleSet::BODY)?);
                paragraph.clear();
            }
        } else {
            paragraph.push(line);
        }
    }
    if !paragraph.is_empty() {
        nodes.push(parse_block(&paragraph.join("\n"), StyleSet::BODY)?);
    }
    Ok(nodes)
}

/// Code source keeps internal formatting; only blank edges are stripped
fn code_source(lines: &[String]) -> String {
    let Some(start) = lines.iter().position(|line| !line.trim().is_empty()) else {
        return String::new();
    };
    let end = lines
        .iter()
        .rposition(|line| !line.trim().is_empty())
        .unwrap_or(start);
    lines[start..=end].join("\n")
}
