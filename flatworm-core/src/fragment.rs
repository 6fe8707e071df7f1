//! Document fragments: sections, subsections, and leaf content.
//!
//! Ownership is strictly tree-shaped: attaching a child moves it into its
//! parent, so a fragment can never end up under two parents. Synthetic ids
//! and subsection paths are filled in by the graph assembler.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use flatworm_types::Sid;
use serde::{Deserialize, Serialize};

use crate::directive::Directive;
use crate::node::Node;

/// Style hint recorded for a linkable fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorStyle {
    Normal,
    Code,
}

/// Leaf payload of a content fragment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ContentKind {
    /// Prose: one parsed inline tree per paragraph
    Body { nodes: Vec<Node> },
    /// Verbatim source, evaluated later by the external evaluator
    Code {
        source: String,
        language: Option<String>,
    },
}

/// A leaf fragment inside a section or subsection body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub directive: Directive,
    /// The directive's raw value, before clause extraction
    pub value: String,
    pub anchor: Option<String>,
    pub extensions: HashMap<String, String>,
    pub title: Option<Node>,
    pub kind: ContentKind,
}

impl Content {
    pub fn is_toc(&self) -> bool {
        self.directive == Directive::Toc
    }

    /// Page references listed by a toc marker fragment
    pub fn toc_refs(&self) -> Vec<String> {
        match &self.kind {
            ContentKind::Body { nodes } => nodes
                .iter()
                .map(|n| n.text_content())
                .filter(|text| !text.trim().is_empty())
                .collect(),
            ContentKind::Code { .. } => Vec::new(),
        }
    }

    /// Style hint for the anchor table
    pub fn anchor_style(&self) -> AnchorStyle {
        match self.directive {
            Directive::Property | Directive::Code => AnchorStyle::Code,
            _ => AnchorStyle::Normal,
        }
    }

    /// Title text for the anchor table, falling back to the anchor itself
    pub fn anchor_title(&self) -> Option<String> {
        let title = self
            .title
            .as_ref()
            .map(|t| t.text_content())
            .filter(|t| !t.trim().is_empty());
        title.or_else(|| self.anchor.clone())
    }
}

/// A nested grouping under a section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subsection {
    pub value: String,
    pub title: Node,
    pub anchor: Option<String>,
    /// Synthetic id, assigned during assembly when no anchor is present
    pub sid: Option<Sid>,
    pub extensions: HashMap<String, String>,
    /// Computed during assembly: `parent-path + "/#" + (anchor or sid)`
    pub path: String,
    pub body: Vec<Content>,
}

impl Subsection {
    /// Move a content fragment into this subsection's body
    pub fn attach_content(&mut self, content: Content) {
        self.body.push(content);
    }
}

/// Top of one page's fragment hierarchy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// The page's output key, relative; doubles as the page anchor
    pub path: String,
    pub value: String,
    pub title: Node,
    pub anchor: Option<String>,
    pub sid: Option<Sid>,
    pub extensions: HashMap<String, String>,
    /// Navigation label override, from `@nav<…>`
    pub nav_title: Option<String>,
    /// Sort hint from `@priority<…>`; higher sorts earlier
    pub priority: i32,
    /// Source files this page was derived from, for staleness tracking
    pub dependencies: Vec<String>,
    pub mtime: Option<DateTime<Utc>>,
    /// Originating file, used to locate errors
    pub source: Option<String>,
    pub body: Vec<Content>,
    pub children: Vec<Subsection>,
}

impl Section {
    /// Move a content fragment into this section's body
    pub fn attach_content(&mut self, content: Content) {
        self.body.push(content);
    }

    /// Move a subsection under this section
    pub fn attach_child(&mut self, child: Subsection) {
        self.children.push(child);
    }

    /// Navigation label: the nav override, or the title text
    pub fn nav_label(&self) -> String {
        self.nav_title
            .clone()
            .unwrap_or_else(|| self.title.text_content())
    }

    /// The toc marker fragment on this page, if any
    pub fn toc_fragment(&self) -> Option<&Content> {
        self.body.iter().find(|content| content.is_toc())
    }

    /// Where errors about this page should point
    pub fn location(&self) -> String {
        self.source.clone().unwrap_or_else(|| self.path.clone())
    }

    /// Back-fill the nav title; returns false if it was already set
    pub fn backfill_nav_title(&mut self, nav: impl Into<String>) -> bool {
        if self.nav_title.is_none() {
            self.nav_title = Some(nav.into());
            true
        } else {
            false
        }
    }

    /// Back-fill an extension value; returns false if the key already exists
    pub fn backfill_extension(&mut self, name: impl Into<String>, value: impl Into<String>) -> bool {
        match self.extensions.entry(name.into()) {
            Entry::Vacant(slot) => {
                slot.insert(value.into());
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// Record the page timestamp; returns false if it was already set
    pub fn set_mtime(&mut self, mtime: DateTime<Utc>) -> bool {
        if self.mtime.is_none() {
            self.mtime = Some(mtime);
            true
        } else {
            false
        }
    }
}

/// Deferred evaluation of code fragments.
///
/// Implemented by the external sandboxed evaluator and invoked by consumers
/// strictly after assembly completes, one section at a time in document
/// order, never during parsing.
pub trait ScriptEvaluator {
    type Error;

    /// Evaluate one code fragment, returning annotated output lines
    fn evaluate(&mut self, language: Option<&str>, source: &str)
        -> Result<Vec<String>, Self::Error>;
}
