//! Static registry of named symbols and date/time macros.

use chrono::{DateTime, Local};

/// Named HTML-entity symbols and the characters they expand to
const SYMBOLS: &[(&str, &str)] = &[
    ("amp", "&"),
    ("bull", "\u{2022}"),
    ("copy", "\u{a9}"),
    ("darr", "\u{2193}"),
    ("deg", "\u{b0}"),
    ("div", "\u{f7}"),
    ("eacute", "\u{e9}"),
    ("ge", "\u{2265}"),
    ("gt", ">"),
    ("hellip", "\u{2026}"),
    ("infin", "\u{221e}"),
    ("larr", "\u{2190}"),
    ("le", "\u{2264}"),
    ("lt", "<"),
    ("mdash", "\u{2014}"),
    ("nbsp", "\u{a0}"),
    ("ndash", "\u{2013}"),
    ("pi", "\u{3c0}"),
    ("plusmn", "\u{b1}"),
    ("rarr", "\u{2192}"),
    ("reg", "\u{ae}"),
    ("times", "\u{d7}"),
    ("uarr", "\u{2191}"),
];

/// Look up a named symbol (`&mdash;` style, without the delimiters)
pub fn lookup_symbol(name: &str) -> Option<&'static str> {
    SYMBOLS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, value)| *value)
}

/// Expand a date/time macro (`&$year;` style) against the given instant
///
/// The instant is captured once by the caller at node construction, so
/// repeated reads of the expanded node are stable.
pub fn expand_macro(name: &str, now: DateTime<Local>) -> Option<String> {
    let expanded = match name {
        "year" => now.format("%Y").to_string(),
        "month" => now.format("%B").to_string(),
        "day" => now.format("%-d").to_string(),
        "date" => now.format("%Y-%m-%d").to_string(),
        "time" => now.format("%H:%M").to_string(),
        "timestamp" => now.to_rfc3339(),
        _ => return None,
    };
    Some(expanded)
}
