//! Error taxonomy for parsing and document assembly.
//!
//! Every error here is fatal: a failing parse aborts the whole build and no
//! partial document is produced. Parsing is a pure, deterministic transform,
//! so there is no retry or recovery path.

use thiserror::Error;

/// Grammar errors raised by the inline markup parser
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MarkupError {
    #[error("missing closing \"{0}\"")]
    MissingClosing(String),

    #[error("unknown symbol {0}")]
    UnknownSymbol(String),

    #[error("unknown macro {0}")]
    UnknownMacro(String),

    #[error("stray backslash")]
    StrayBackslash,
}

/// Error kinds produced while tokenizing and assembling one page
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PageErrorKind {
    #[error("unknown directive: {0}")]
    UnknownDirective(String),

    /// The extension name is stored uppercased, as it is reported
    #[error("_{tag}: does not support {name} extension")]
    UnsupportedExtension { tag: String, name: String },

    #[error("_{0}: duplicate anchor clause")]
    DuplicateAnchorClause(String),

    #[error("invalid priority: {0}")]
    InvalidPriority(String),

    #[error("duplicate section")]
    DuplicateSection,

    #[error("subsection without section")]
    SubsectionWithoutSection,

    #[error("heading without subsection")]
    HeadingWithoutSubsection,

    #[error("missing section")]
    MissingSection,

    #[error(transparent)]
    Markup(#[from] MarkupError),
}

/// A page-level error located at its source file and line
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{path}:{line}: {kind}")]
pub struct PageError {
    /// Source file the page was read from
    pub path: String,
    /// 1-indexed line of the offending directive
    pub line: usize,
    pub kind: PageErrorKind,
}

impl PageError {
    pub fn new(path: impl Into<String>, line: usize, kind: PageErrorKind) -> Self {
        Self {
            path: path.into(),
            line,
            kind,
        }
    }
}

/// Errors raised while merging pages into the document graph
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    #[error("duplicate anchor {anchor}: defined in {first} and {second}")]
    DuplicateAnchor {
        anchor: String,
        first: String,
        second: String,
    },

    #[error("unknown toc entry {entry} (referenced from {path})")]
    UnknownTocEntry { entry: String, path: String },
}

/// Top-level build error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlatwormError {
    #[error(transparent)]
    Page(#[from] PageError),

    #[error(transparent)]
    Document(#[from] DocumentError),
}
