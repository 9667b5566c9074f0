#![forbid(unsafe_code)]

//! Flattened hierarchical row model.
//!
//! Grouped data arrives as a flat, pre-order sequence: every group root is
//! followed by its descendants before the next sibling. Hierarchy is carried
//! per row through reserved fields rather than nesting:
//!
//! | Field | Wire name | Meaning |
//! |-------|-----------|---------|
//! | `parent_id` | `$parent_id` | ancestor ids, root first, immediate parent last |
//! | `group_by` | `$group_by` | column grouped on at this level |
//! | `group_level` | `$group_level` | depth, 0 at root |
//! | `is_group_root` | `$is_group_root` | row heads a group |
//!
//! # Invariants
//!
//! 1. Every id in a `parent_id` chain names a row with `is_group_root = true`.
//! 2. A group root's descendants appear contiguously after it.
//!
//! Consumers must tolerate violations of (1): a chain naming an absent root
//! is treated as if the row were top-level once the whole data set is loaded.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Unique row identifier: a string or an integer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RowId {
    /// Numeric id.
    Num(i64),
    /// String id.
    Str(String),
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Num(n) => write!(f, "{n}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RowId {
    fn from(n: i64) -> Self {
        Self::Num(n)
    }
}

impl From<i32> for RowId {
    fn from(n: i32) -> Self {
        Self::Num(i64::from(n))
    }
}

impl From<u32> for RowId {
    fn from(n: u32) -> Self {
        Self::Num(i64::from(n))
    }
}

impl From<&str> for RowId {
    fn from(s: &str) -> Self {
        Self::Str(s.to_owned())
    }
}

impl From<String> for RowId {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

/// A single cell value.
///
/// Deserializes from plain JSON scalars.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    /// Absent or explicit null.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// Any number.
    Number(f64),
    /// Text.
    Text(String),
}

impl CellValue {
    /// Borrow the text payload, if this is text.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric coercion used for ordering and loose comparison.
    ///
    /// Null is 0, booleans are 0/1, text parses after trimming (empty text
    /// is 0). Returns `None` for text that is not a number.
    #[must_use]
    pub fn to_number(&self) -> Option<f64> {
        match self {
            Self::Null => Some(0.0),
            Self::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Self::Number(n) => Some(*n),
            Self::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    Some(0.0)
                } else {
                    trimmed.parse::<f64>().ok()
                }
            }
        }
    }

    /// Whether the value is null.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<&RowId> for CellValue {
    fn from(id: &RowId) -> Self {
        match id {
            RowId::Num(n) => Self::Number(*n as f64),
            RowId::Str(s) => Self::Text(s.clone()),
        }
    }
}

fn nullable_chain<'de, D>(deserializer: D) -> Result<Vec<RowId>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Vec<RowId>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// One row of grid data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Unique key.
    pub id: RowId,
    /// Ancestor chain, root first. Empty for top-level rows.
    #[serde(
        rename = "$parent_id",
        default,
        deserialize_with = "nullable_chain",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub parent_id: Vec<RowId>,
    /// Column this row is grouped by at its level.
    #[serde(rename = "$group_by", default, skip_serializing_if = "Option::is_none")]
    pub group_by: Option<String>,
    /// Depth in the group forest.
    #[serde(rename = "$group_level", default)]
    pub group_level: u32,
    /// Whether this row heads a group.
    #[serde(rename = "$is_group_root", default)]
    pub is_group_root: bool,
    /// Column values.
    #[serde(flatten)]
    pub values: BTreeMap<String, CellValue>,
}

impl Row {
    /// Create a top-level row with no values.
    #[must_use]
    pub fn new(id: impl Into<RowId>) -> Self {
        Self {
            id: id.into(),
            parent_id: Vec::new(),
            group_by: None,
            group_level: 0,
            is_group_root: false,
            values: BTreeMap::new(),
        }
    }

    /// Set a column value.
    #[must_use]
    pub fn with(mut self, column: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.values.insert(column.into(), value.into());
        self
    }

    /// Set the ancestor chain. The group level follows the chain length.
    #[must_use]
    pub fn with_parents<I, T>(mut self, chain: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<RowId>,
    {
        self.parent_id = chain.into_iter().map(Into::into).collect();
        self.group_level = self.parent_id.len() as u32;
        self
    }

    /// Mark this row as the root of a group on `column`.
    #[must_use]
    pub fn group_root(mut self, column: impl Into<String>) -> Self {
        self.is_group_root = true;
        self.group_by = Some(column.into());
        self
    }

    /// Value of `column`. The reserved `id` column falls back to the row id.
    #[must_use]
    pub fn value(&self, column: &str) -> Option<Cow<'_, CellValue>> {
        match self.values.get(column) {
            Some(v) => Some(Cow::Borrowed(v)),
            None if column == "id" => Some(Cow::Owned(CellValue::from(&self.id))),
            None => None,
        }
    }

    /// Immediate parent id, if any.
    #[must_use]
    pub fn immediate_parent(&self) -> Option<&RowId> {
        self.parent_id.last()
    }

    /// Whether the row has no ancestor chain.
    #[must_use]
    pub fn is_top_level(&self) -> bool {
        self.parent_id.is_empty()
    }

    /// Whether `id` appears anywhere in the ancestor chain.
    #[must_use]
    pub fn has_ancestor(&self, id: &RowId) -> bool {
        self.parent_id.iter().any(|p| p == id)
    }
}

/// Which field identifies a row for selection, expansion and height overrides.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RowKey {
    /// The reserved `id` field.
    #[default]
    Id,
    /// A data column.
    Column(String),
}

impl RowKey {
    /// Resolve the key column.
    ///
    /// Order: the explicit identifier when it is one of `columns`, then `id`
    /// when present, then the first column. An empty column list resolves to
    /// [`RowKey::Id`].
    #[must_use]
    pub fn resolve<S: AsRef<str>>(columns: &[S], explicit: Option<&str>) -> Self {
        let has = |name: &str| columns.iter().any(|c| c.as_ref() == name);
        if let Some(explicit) = explicit
            && has(explicit)
        {
            return Self::from_column(explicit);
        }
        if has("id") {
            return Self::Id;
        }
        match columns.first() {
            Some(first) => Self::from_column(first.as_ref()),
            None => Self::Id,
        }
    }

    fn from_column(name: &str) -> Self {
        if name == "id" {
            Self::Id
        } else {
            Self::Column(name.to_owned())
        }
    }

    /// Extract the key of `row`, falling back to its id when the key column
    /// is missing or null.
    #[must_use]
    pub fn key_of(&self, row: &Row) -> RowId {
        let Self::Column(column) = self else {
            return row.id.clone();
        };
        match row.values.get(column) {
            Some(CellValue::Text(s)) => RowId::Str(s.clone()),
            Some(CellValue::Number(n)) if n.fract() == 0.0 => RowId::Num(*n as i64),
            Some(CellValue::Null) | None => row.id.clone(),
            Some(other) => RowId::Str(other.to_string()),
        }
    }
}
