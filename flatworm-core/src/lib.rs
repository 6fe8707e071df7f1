//! # flatworm-core
//!
//! Core library for the flatworm documentation compiler.
//!
//! This crate turns flatworm markup source files (`_tag: value` directive
//! lines with inline-markup bodies) into typed fragments, assembles each
//! file into a Section tree, and merges all pages (plus extractor-supplied
//! API sections) into a single document graph with a global anchor table and
//! a table of contents. Rendering, code evaluation, and file I/O live in
//! external collaborators; assembly here is the strict first phase of the
//! two-phase build protocol.

pub mod directive;
pub mod document;
pub mod error;
pub mod fragment;
pub mod markup;
pub mod node;
pub mod page;
pub mod symbols;

pub use directive::{
    parse_value, split_clauses, tokenize, Clause, Directive, RawFragment, TitleKind, ValueParts,
};
pub use document::{AnchorEntry, Document, TocEntry};
pub use error::{DocumentError, FlatwormError, MarkupError, PageError, PageErrorKind};
pub use fragment::{AnchorStyle, Content, ContentKind, ScriptEvaluator, Section, Subsection};
pub use markup::parse_block;
pub use node::{Node, Style, StyleSet};
pub use page::{parse_page, PageSource};

// Re-export shared types from flatworm-types
pub use flatworm_types::{Sid, SidAllocator};

/// Parse every page and assemble the full document.
///
/// Fails fast: the first page or graph error aborts the build with no
/// partial document.
pub fn build_document(pages: &[PageSource]) -> Result<Document, FlatwormError> {
    let mut sections = Vec::with_capacity(pages.len());
    for page in pages {
        sections.push(parse_page(&page.path, &page.source, &page.text)?);
    }
    Ok(Document::assemble(sections)?)
}
