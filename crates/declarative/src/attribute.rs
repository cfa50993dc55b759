//! Attribute-level comparison between two states of the same resource
//!
//! A resource type declares a static table of `(name, accessor)` pairs.
//! Diffing walks that table and compares the typed values; every entry
//! that differs becomes an [`AttributeChange`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// A comparable attribute value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttrValue {
    /// Optional text; `None` means unset
    Text(Option<String>),
    /// Boolean flag
    Flag(bool),
}

impl AttrValue {
    /// Text value from a required string
    pub fn text(value: &str) -> Self {
        Self::Text(Some(value.to_string()))
    }

    /// Text value from an optional string
    pub fn opt_text(value: Option<&str>) -> Self {
        Self::Text(value.map(str::to_string))
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(Some(s)) => write!(f, "{s}"),
            Self::Text(None) => Ok(()),
            Self::Flag(b) => write!(f, "{b}"),
        }
    }
}

/// One entry of a resource type's attribute table
pub struct Attribute<T> {
    /// Attribute name as shown to operators
    pub name: &'static str,
    /// Reads the attribute from a value of the resource type
    pub get: fn(&T) -> AttrValue,
}

impl<T> fmt::Debug for Attribute<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attribute").field("name", &self.name).finish()
    }
}

/// A single attribute that differs between current and desired state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeChange {
    pub name: String,
    pub from: AttrValue,
    pub to: AttrValue,
}

impl fmt::Display for AttributeChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "value of {} will change from '{}' to '{}'",
            self.name, self.from, self.to
        )
    }
}

/// Compare `current` against `desired` over every attribute in `table`
///
/// Returns the differing attributes in table order; an empty result means
/// the two values are equivalent.
pub fn diff_attributes<T>(
    table: &[Attribute<T>],
    current: &T,
    desired: &T,
) -> Vec<AttributeChange> {
    table
        .iter()
        .filter_map(|attr| {
            let from = (attr.get)(current);
            let to = (attr.get)(desired);
            (from != to).then(|| AttributeChange {
                name: attr.name.to_string(),
                from,
                to,
            })
        })
        .collect()
}

/// Render changes one per line, each terminated by a newline
pub fn describe_changes(changes: &[AttributeChange]) -> String {
    changes.iter().map(|c| format!("{c}\n")).collect()
}
