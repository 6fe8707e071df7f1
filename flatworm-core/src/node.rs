//! Inline node tree and style flags.

use serde::{Deserialize, Serialize};

/// Inline span styles
///
/// `Normal` is the unstyled container used when a parse yields more than one
/// sibling node; the remaining variants correspond to delimiter pairs (or,
/// for `List`, to the bullet pre-pass).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    Normal,
    Bold,
    Italic,
    Underline,
    Super,
    Strike,
    Code,
    Param,
    List,
}

/// Span styles in scan order, i.e. every style with a delimiter pair
const SPAN_STYLES: [Style; 7] = [
    Style::Bold,
    Style::Italic,
    Style::Underline,
    Style::Super,
    Style::Strike,
    Style::Code,
    Style::Param,
];

impl Style {
    /// The two-character delimiter pair, for span styles
    pub fn delimiter(&self) -> Option<&'static str> {
        match self {
            Style::Bold => Some("**"),
            Style::Italic => Some("//"),
            Style::Underline => Some("__"),
            Style::Super => Some("^^"),
            Style::Strike => Some("~~"),
            Style::Code => Some("``"),
            Style::Param => Some("%%"),
            Style::Normal | Style::List => None,
        }
    }
}

const fn bit(style: Style) -> u16 {
    match style {
        Style::Normal => 0,
        Style::Bold => 1 << 0,
        Style::Italic => 1 << 1,
        Style::Underline => 1 << 2,
        Style::Super => 1 << 3,
        Style::Strike => 1 << 4,
        Style::Code => 1 << 5,
        Style::Param => 1 << 6,
        Style::List => 1 << 7,
    }
}

/// A copyable set of enabled styles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StyleSet(u16);

impl StyleSet {
    pub const EMPTY: StyleSet = StyleSet(0);

    /// Spans allowed in titles: every delimiter pair except param
    pub const TITLE: StyleSet = StyleSet(
        bit(Style::Bold)
            | bit(Style::Italic)
            | bit(Style::Underline)
            | bit(Style::Super)
            | bit(Style::Strike)
            | bit(Style::Code),
    );

    /// Body text: titles plus bullet lists
    pub const BODY: StyleSet = StyleSet(Self::TITLE.0 | bit(Style::List));

    /// Property signatures: titles plus `%%param%%` spans
    pub const SIGNATURE: StyleSet = StyleSet(Self::TITLE.0 | bit(Style::Param));

    pub fn contains(&self, style: Style) -> bool {
        self.0 & bit(style) != 0
    }

    pub fn insert(&mut self, style: Style) {
        self.0 |= bit(style);
    }

    /// A copy of this set with `style` removed
    pub fn without(&self, style: Style) -> StyleSet {
        StyleSet(self.0 & !bit(style))
    }

    /// Enabled span styles, in scan order
    pub fn spans(&self) -> impl Iterator<Item = Style> + '_ {
        SPAN_STYLES.into_iter().filter(|s| self.contains(*s))
    }
}

/// Inline AST node
///
/// A `Link` with no children renders its display text lazily from the anchor
/// table; the target string is stored literally and never resolved at parse
/// time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Text(String),
    Element { style: Style, children: Vec<Node> },
    Link { target: String, children: Vec<Node> },
    List(Vec<Node>),
}

impl Node {
    pub fn text<S: Into<String>>(s: S) -> Self {
        Node::Text(s.into())
    }

    pub fn element(style: Style, children: Vec<Node>) -> Self {
        Node::Element { style, children }
    }

    pub fn link<S: Into<String>>(target: S, children: Vec<Node>) -> Self {
        Node::Link {
            target: target.into(),
            children,
        }
    }

    /// Flattened plain text of the subtree
    ///
    /// A childless link falls back to its target; list items are joined with
    /// single spaces.
    pub fn text_content(&self) -> String {
        match self {
            Node::Text(text) => text.clone(),
            Node::Element { children, .. } => {
                children.iter().map(|c| c.text_content()).collect()
            }
            Node::Link { target, children } => {
                if children.is_empty() {
                    target.clone()
                } else {
                    children.iter().map(|c| c.text_content()).collect()
                }
            }
            Node::List(items) => items
                .iter()
                .map(|i| i.text_content())
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_set_contains() {
        assert!(StyleSet::TITLE.contains(Style::Bold));
        assert!(StyleSet::TITLE.contains(Style::Code));
        assert!(!StyleSet::TITLE.contains(Style::List));
        assert!(!StyleSet::TITLE.contains(Style::Param));
        assert!(StyleSet::BODY.contains(Style::List));
        assert!(StyleSet::SIGNATURE.contains(Style::Param));
    }

    #[test]
    fn test_style_set_without() {
        let set = StyleSet::BODY.without(Style::List);
        assert!(!set.contains(Style::List));
        assert!(set.contains(Style::Bold));
        // the original is unchanged
        assert!(StyleSet::BODY.contains(Style::List));
    }

    #[test]
    fn test_spans_skips_list() {
        let spans: Vec<Style> = StyleSet::BODY.spans().collect();
        assert!(!spans.contains(&Style::List));
        assert!(spans.contains(&Style::Italic));
    }

    #[test]
    fn test_text_content_flattens() {
        let node = Node::element(
            Style::Normal,
            vec![
                Node::element(Style::Bold, vec![Node::text("bold")]),
                Node::text(" and plain"),
            ],
        );
        assert_eq!(node.text_content(), "bold and plain");
    }

    #[test]
    fn test_text_content_link_fallback() {
        let bare = Node::link("some-anchor", vec![]);
        assert_eq!(bare.text_content(), "some-anchor");

        let display = Node::link("some-anchor", vec![Node::text("Click here")]);
        assert_eq!(display.text_content(), "Click here");
    }
}
