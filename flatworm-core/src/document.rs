//! Document-graph assembly: anchors, ordering, and the table of contents.
//!
//! Assembly is the second phase of the strict two-phase protocol: every page
//! (hand-written or extractor-supplied) is parsed first, then merged here.
//! Only once the full anchor table exists may consumers resolve links or
//! evaluate code fragments.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use flatworm_types::SidAllocator;
use serde::{Deserialize, Serialize};

use crate::error::DocumentError;
use crate::fragment::{AnchorStyle, Content, Section, Subsection};

/// Resolved link-table entry for one anchor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorEntry {
    pub link: String,
    pub title: String,
    pub style: AnchorStyle,
}

/// One row of the navigation outline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    pub depth: usize,
    pub title: String,
    pub path: String,
}

/// The assembled, immutable document graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Every page, in final sibling order
    pub sections: Vec<Section>,
    /// Global anchor table: anchor name to resolved link
    pub anchors: HashMap<String, AnchorEntry>,
    /// Ordered, depth-tagged navigation outline
    pub toc: Vec<TocEntry>,
}

impl Document {
    /// Merge parsed and extractor-supplied sections into one document.
    ///
    /// Numbers anchorless fragments, computes subsection paths, registers
    /// every anchor (duplicates are fatal), sorts siblings, and builds the
    /// table of contents.
    pub fn assemble(mut sections: Vec<Section>) -> Result<Document, DocumentError> {
        number_fragments(&mut sections);
        let anchors = register_anchors(&sections)?;
        sort_sections(&mut sections);
        let toc = build_toc(&sections)?;

        tracing::info!(
            "Assembled document: {} sections, {} anchors, {} toc entries",
            sections.len(),
            anchors.len(),
            toc.len()
        );
        Ok(Document {
            sections,
            anchors,
            toc,
        })
    }

    /// Look up an anchor in the global table
    pub fn anchor(&self, name: &str) -> Option<&AnchorEntry> {
        self.anchors.get(name)
    }

    /// Find a page by its output path
    pub fn section_by_path(&self, path: &str) -> Option<&Section> {
        self.sections.iter().find(|section| section.path == path)
    }

    /// Every code fragment with its owning page path, in document order.
    ///
    /// This is the sequence handed to the external script evaluator.
    pub fn code_fragments(&self) -> Vec<(&str, &Content)> {
        let mut out = Vec::new();
        for section in &self.sections {
            for content in &section.body {
                if matches!(content.kind, crate::fragment::ContentKind::Code { .. }) {
                    out.push((section.path.as_str(), content));
                }
            }
            for child in &section.children {
                for content in &child.body {
                    if matches!(content.kind, crate::fragment::ContentKind::Code { .. }) {
                        out.push((section.path.as_str(), content));
                    }
                }
            }
        }
        out
    }
}

/// Assign synthetic ids to anchorless sections and subsections, then compute
/// subsection paths from them
fn number_fragments(sections: &mut [Section]) {
    let mut allocator = SidAllocator::new();
    for section in sections.iter_mut() {
        if section.anchor.is_none() {
            section.sid = Some(allocator.allocate());
        }
        let parent_path = section.path.clone();
        for child in &mut section.children {
            if child.anchor.is_none() {
                child.sid = Some(allocator.allocate());
            }
            child.path = subsection_path(&parent_path, child);
        }
    }
}

fn subsection_path(parent: &str, child: &Subsection) -> String {
    let key = match (&child.anchor, child.sid) {
        (Some(anchor), _) => anchor.clone(),
        (None, Some(sid)) => sid.to_string(),
        (None, None) => String::new(),
    };
    format!("{parent}/#{key}")
}

fn register_anchors(sections: &[Section]) -> Result<HashMap<String, AnchorEntry>, DocumentError> {
    let mut anchors = HashMap::new();
    let mut locations: HashMap<String, String> = HashMap::new();

    for section in sections {
        let location = section.location();

        if let Some(anchor) = &section.anchor {
            let entry = AnchorEntry {
                link: section.path.clone(),
                title: section.title.text_content(),
                style: AnchorStyle::Normal,
            };
            insert_anchor(&mut anchors, &mut locations, anchor, entry, &location)?;
        }

        for content in &section.body {
            register_content(&mut anchors, &mut locations, &section.path, content, &location)?;
        }
        for child in &section.children {
            if let Some(anchor) = &child.anchor {
                let entry = AnchorEntry {
                    link: format!("{}#{}", section.path, anchor),
                    title: child.title.text_content(),
                    style: AnchorStyle::Normal,
                };
                insert_anchor(&mut anchors, &mut locations, anchor, entry, &location)?;
            }
            for content in &child.body {
                register_content(
                    &mut anchors,
                    &mut locations,
                    &section.path,
                    content,
                    &location,
                )?;
            }
        }
    }

    tracing::debug!("Registered {} anchors", anchors.len());
    Ok(anchors)
}

fn register_content(
    anchors: &mut HashMap<String, AnchorEntry>,
    locations: &mut HashMap<String, String>,
    page_path: &str,
    content: &Content,
    location: &str,
) -> Result<(), DocumentError> {
    let Some(anchor) = &content.anchor else {
        return Ok(());
    };
    let entry = AnchorEntry {
        link: format!("{page_path}#{anchor}"),
        title: content.anchor_title().unwrap_or_else(|| anchor.clone()),
        style: content.anchor_style(),
    };
    insert_anchor(anchors, locations, anchor, entry, location)
}

fn insert_anchor(
    anchors: &mut HashMap<String, AnchorEntry>,
    locations: &mut HashMap<String, String>,
    anchor: &str,
    entry: AnchorEntry,
    location: &str,
) -> Result<(), DocumentError> {
    if let Some(first) = locations.get(anchor) {
        return Err(DocumentError::DuplicateAnchor {
            anchor: anchor.to_string(),
            first: first.clone(),
            second: location.to_string(),
        });
    }
    locations.insert(anchor.to_string(), location.to_string());
    anchors.insert(anchor.to_string(), entry);
    Ok(())
}

/// Sort pages: root first, then component-wise with priority taking
/// precedence over name at the first differing component
fn sort_sections(sections: &mut [Section]) {
    let mut priorities: HashMap<String, i32> = HashMap::new();
    for section in sections.iter() {
        if priorities
            .insert(section.path.clone(), section.priority)
            .is_some()
        {
            tracing::warn!("Duplicate page path: {}", section.path);
        }
    }
    sections.sort_by(|a, b| compare_paths(&a.path, &b.path, &priorities));
}

fn compare_paths(a: &str, b: &str, priorities: &HashMap<String, i32>) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }
    // the root page always sorts first
    if a.is_empty() {
        return Ordering::Less;
    }
    if b.is_empty() {
        return Ordering::Greater;
    }

    let left: Vec<&str> = a.split('/').collect();
    let right: Vec<&str> = b.split('/').collect();
    for index in 0..left.len().min(right.len()) {
        if left[index] == right[index] {
            continue;
        }
        let left_priority = priorities
            .get(&left[..=index].join("/"))
            .copied()
            .unwrap_or(0);
        let right_priority = priorities
            .get(&right[..=index].join("/"))
            .copied()
            .unwrap_or(0);
        if left_priority != right_priority {
            // higher priority sorts earlier
            return right_priority.cmp(&left_priority);
        }
        return left[index].cmp(right[index]);
    }
    left.len().cmp(&right.len())
}

/// Build the navigation outline over the sorted pages.
///
/// A page carrying a toc marker inlines each referenced sub-page's outline
/// at `depth + 1`; other pages emit themselves at depth 0 and their
/// subsections at depth 1. Pages already inlined by an ancestor are not
/// re-emitted by the top-level walk.
fn build_toc(sections: &[Section]) -> Result<Vec<TocEntry>, DocumentError> {
    let by_path: HashMap<&str, &Section> = sections
        .iter()
        .map(|section| (section.path.as_str(), section))
        .collect();

    let mut covered: HashSet<&str> = HashSet::new();
    let mut toc = Vec::new();
    for section in sections {
        if covered.contains(section.path.as_str()) {
            continue;
        }
        emit_toc(section, 0, &by_path, &mut covered, &mut toc)?;
    }
    Ok(toc)
}

fn emit_toc<'a>(
    section: &'a Section,
    depth: usize,
    by_path: &HashMap<&'a str, &'a Section>,
    covered: &mut HashSet<&'a str>,
    toc: &mut Vec<TocEntry>,
) -> Result<(), DocumentError> {
    if !covered.insert(section.path.as_str()) {
        return Ok(());
    }
    toc.push(TocEntry {
        depth,
        title: section.nav_label(),
        path: section.path.clone(),
    });

    if let Some(marker) = section.toc_fragment() {
        for entry in marker.toc_refs() {
            let target = resolve_toc_ref(&section.path, &entry);
            let Some(child) = by_path.get(target.as_str()).copied() else {
                return Err(DocumentError::UnknownTocEntry {
                    entry,
                    path: section.location(),
                });
            };
            emit_toc(child, depth + 1, by_path, covered, toc)?;
        }
    } else {
        for child in &section.children {
            toc.push(TocEntry {
                depth: depth + 1,
                title: child.title.text_content(),
                path: child.path.clone(),
            });
        }
    }
    Ok(())
}

/// Toc references are relative to the owning page's directory
fn resolve_toc_ref(parent: &str, entry: &str) -> String {
    let entry = entry.trim().trim_matches('/');
    if parent.is_empty() {
        entry.to_string()
    } else {
        format!("{parent}/{entry}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directive::Directive;
    use crate::fragment::ContentKind;
    use crate::node::Node;
    use std::collections::HashMap as Map;

    fn section(path: &str, title: &str) -> Section {
        Section {
            path: path.to_string(),
            value: title.to_string(),
            title: Node::text(title),
            anchor: None,
            sid: None,
            extensions: Map::new(),
            nav_title: None,
            priority: 0,
            dependencies: Vec::new(),
            mtime: None,
            source: Some(format!("{path}.wrm")),
            body: Vec::new(),
            children: Vec::new(),
        }
    }

    fn subsection(title: &str, anchor: Option<&str>) -> Subsection {
        Subsection {
            value: title.to_string(),
            title: Node::text(title),
            anchor: anchor.map(str::to_string),
            sid: None,
            extensions: Map::new(),
            path: String::new(),
            body: Vec::new(),
        }
    }

    fn anchored_note(anchor: &str) -> Content {
        Content {
            directive: Directive::Note,
            value: String::new(),
            anchor: Some(anchor.to_string()),
            extensions: Map::new(),
            title: Some(Node::text(anchor)),
            kind: ContentKind::Body { nodes: Vec::new() },
        }
    }

    fn toc_marker(refs: &[&str]) -> Content {
        Content {
            directive: Directive::Toc,
            value: String::new(),
            anchor: None,
            extensions: Map::new(),
            title: None,
            kind: ContentKind::Body {
                nodes: refs.iter().map(|r| Node::text(*r)).collect(),
            },
        }
    }

    #[test]
    fn test_anchor_registration_links() {
        let mut page = section("api", "API");
        page.anchor = Some("api-top".to_string());
        page.attach_content(anchored_note("deep"));
        let mut sub = subsection("Events", Some("events"));
        sub.attach_content(anchored_note("nested"));
        page.attach_child(sub);

        let document = Document::assemble(vec![page]).unwrap();
        assert_eq!(document.anchor("api-top").unwrap().link, "api");
        assert_eq!(document.anchor("deep").unwrap().link, "api#deep");
        assert_eq!(document.anchor("events").unwrap().link, "api#events");
        assert_eq!(document.anchor("nested").unwrap().link, "api#nested");
        assert_eq!(document.anchors.len(), 4);
    }

    #[test]
    fn test_duplicate_anchor_names_both_locations() {
        let mut one = section("a", "A");
        one.attach_content(anchored_note("shared"));
        let mut two = section("b", "B");
        two.attach_content(anchored_note("shared"));

        let err = Document::assemble(vec![one, two]).unwrap_err();
        let DocumentError::DuplicateAnchor {
            anchor,
            first,
            second,
        } = err
        else {
            panic!("expected a duplicate anchor error");
        };
        assert_eq!(anchor, "shared");
        assert_eq!(first, "a.wrm");
        assert_eq!(second, "b.wrm");
    }

    #[test]
    fn test_subsection_paths_use_anchor_or_sid() {
        let mut page = section("api", "API");
        page.attach_child(subsection("Named", Some("named")));
        page.attach_child(subsection("Unnamed", None));

        let document = Document::assemble(vec![page]).unwrap();
        let children = &document.sections[0].children;
        assert_eq!(children[0].path, "api/#named");
        // the page takes sid 0, the anchorless subsection sid 1
        assert_eq!(children[1].path, "api/#1");
    }

    #[test]
    fn test_root_sorts_first() {
        let sections = vec![section("api", "API"), section("", "Home")];
        let document = Document::assemble(sections).unwrap();
        assert_eq!(document.sections[0].path, "");
        assert_eq!(document.sections[1].path, "api");
    }

    #[test]
    fn test_priority_beats_name() {
        let mut b = section("guide/b", "B");
        b.priority = 5;
        let a = section("guide/a", "A");
        let document =
            Document::assemble(vec![a, b, section("guide", "Guide")]).unwrap();
        let paths: Vec<&str> = document.sections.iter().map(|s| s.path.as_str()).collect();
        assert_eq!(paths, vec!["guide", "guide/b", "guide/a"]);
    }

    #[test]
    fn test_equal_priority_is_lexicographic() {
        let document = Document::assemble(vec![
            section("guide/z", "Z"),
            section("guide/a", "A"),
        ])
        .unwrap();
        let paths: Vec<&str> = document.sections.iter().map(|s| s.path.as_str()).collect();
        assert_eq!(paths, vec!["guide/a", "guide/z"]);
    }

    #[test]
    fn test_shorter_path_sorts_first() {
        let document = Document::assemble(vec![
            section("guide/deep", "Deep"),
            section("guide", "Guide"),
        ])
        .unwrap();
        assert_eq!(document.sections[0].path, "guide");
    }

    #[test]
    fn test_parent_priority_governs_whole_subtree() {
        // priority only matters at the first differing component
        let mut beta = section("beta", "Beta");
        beta.priority = 9;
        let document = Document::assemble(vec![
            section("alpha/page", "Alpha page"),
            beta,
            section("alpha", "Alpha"),
        ])
        .unwrap();
        let paths: Vec<&str> = document.sections.iter().map(|s| s.path.as_str()).collect();
        assert_eq!(paths, vec!["beta", "alpha", "alpha/page"]);
    }

    #[test]
    fn test_toc_from_subsections() {
        let mut page = section("guide", "Guide");
        page.attach_child(subsection("One", Some("one")));
        page.attach_child(subsection("Two", Some("two")));

        let document = Document::assemble(vec![page]).unwrap();
        assert_eq!(document.toc.len(), 3);
        assert_eq!(document.toc[0].depth, 0);
        assert_eq!(document.toc[1].depth, 1);
        assert_eq!(document.toc[1].path, "guide/#one");
        assert_eq!(document.toc[2].title, "Two");
    }

    #[test]
    fn test_toc_marker_inlines_subpages() {
        let mut root = section("", "Home");
        root.attach_content(toc_marker(&["guide", "api"]));
        let mut guide = section("guide", "Guide");
        guide.attach_child(subsection("Basics", Some("basics")));
        let api = section("api", "API");

        let document = Document::assemble(vec![api, guide, root]).unwrap();
        let entries: Vec<(usize, &str)> = document
            .toc
            .iter()
            .map(|e| (e.depth, e.path.as_str()))
            .collect();
        assert_eq!(
            entries,
            vec![
                (0, ""),
                (1, "guide"),
                (2, "guide/#basics"),
                (1, "api"),
            ]
        );
    }

    #[test]
    fn test_toc_marker_unknown_target() {
        let mut root = section("", "Home");
        root.attach_content(toc_marker(&["missing"]));
        let err = Document::assemble(vec![root]).unwrap_err();
        assert!(matches!(err, DocumentError::UnknownTocEntry { .. }));
    }

    #[test]
    fn test_toc_uses_nav_title() {
        let mut page = section("guide", "A Very Long Guide Title");
        page.nav_title = Some("Guide".to_string());
        let document = Document::assemble(vec![page]).unwrap();
        assert_eq!(document.toc[0].title, "Guide");
    }

    #[test]
    fn test_numbering_is_deterministic() {
        let build = || {
            let mut page = section("api", "API");
            page.attach_child(subsection("One", None));
            page.attach_child(subsection("Two", None));
            Document::assemble(vec![page]).unwrap()
        };
        let first = build();
        let second = build();
        let paths = |d: &Document| -> Vec<String> {
            d.sections[0]
                .children
                .iter()
                .map(|c| c.path.clone())
                .collect()
        };
        assert_eq!(paths(&first), paths(&second));
    }
}
