//! Value types carried by the table store.
//!
//! These are the payloads of store commands and the inputs of the widget
//! algorithms. They live here so the widgets crate does not depend on the
//! runtime crate.

use serde::{Deserialize, Serialize};

use crate::format::ConditionOperator;
use crate::row::{CellValue, Row, RowId};

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending.
    #[default]
    Asc,
    /// Descending.
    Desc,
}

impl SortDirection {
    /// The opposite direction.
    #[must_use]
    pub fn flipped(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

/// Ordering for one level of rows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortState {
    /// Column to sort on.
    pub column: String,
    /// Direction.
    pub sort: SortDirection,
}

impl SortState {
    /// Ascending sort on `column`.
    #[must_use]
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            sort: SortDirection::Asc,
        }
    }

    /// Descending sort on `column`.
    #[must_use]
    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            sort: SortDirection::Desc,
        }
    }

    /// Sort produced by clicking the header of `column`.
    ///
    /// Clicking the active column flips its direction; any other column
    /// starts ascending.
    #[must_use]
    pub fn cycle(current: Option<&SortState>, column: &str) -> Self {
        match current {
            Some(s) if s.column == column => Self {
                column: s.column.clone(),
                sort: s.sort.flipped(),
            },
            _ => Self::asc(column),
        }
    }
}

/// Edge a column is pinned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StickyPosition {
    /// Pinned to the left edge.
    Left,
    /// Pinned to the right edge.
    Right,
    /// Scrolls normally.
    #[default]
    None,
}

/// Keyboard-focused cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FocusedCell {
    /// Index into the displayed row sequence.
    pub row_index: usize,
    /// Tab stop within the row, counting fixed leading columns.
    pub tab_index: usize,
}

impl FocusedCell {
    /// Create a focused-cell coordinate.
    #[must_use]
    pub const fn new(row_index: usize, tab_index: usize) -> Self {
        Self {
            row_index,
            tab_index,
        }
    }
}

/// In-flight resize of a column or row, not yet committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResizePreview<K> {
    /// What is being resized.
    pub key: K,
    /// Preview size in pixels.
    pub size: u32,
}

/// Column resize preview, keyed by column name.
pub type ColumnResize = ResizePreview<String>;

/// Row resize preview, keyed by row key.
pub type RowResize = ResizePreview<RowId>;

/// Column predicate applied before sorting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    /// Column tested.
    pub column: String,
    /// Comparison.
    pub operator: ConditionOperator,
    /// Right-hand operand.
    pub value: CellValue,
}

impl Filter {
    /// Create a filter.
    #[must_use]
    pub fn new(
        column: impl Into<String>,
        operator: ConditionOperator,
        value: impl Into<CellValue>,
    ) -> Self {
        Self {
            column: column.into(),
            operator,
            value: value.into(),
        }
    }

    /// Whether `row` passes. A missing column compares as null.
    #[must_use]
    pub fn matches(&self, row: &Row) -> bool {
        let lhs = row.value(&self.column).unwrap_or_default();
        self.operator.evaluate(&lhs, &self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_cycle_flips_active_column() {
        let asc = SortState::asc("name");
        assert_eq!(SortState::cycle(Some(&asc), "name"), SortState::desc("name"));
        assert_eq!(SortState::cycle(Some(&asc), "age"), SortState::asc("age"));
        assert_eq!(SortState::cycle(None, "age"), SortState::asc("age"));
    }

    #[test]
    fn sort_state_wire_format() {
        let json = serde_json::to_string(&SortState::desc("x")).unwrap();
        assert_eq!(json, r#"{"column":"x","sort":"desc"}"#);
    }

    #[test]
    fn filter_matches_missing_column_as_null() {
        let f = Filter::new("qty", ConditionOperator::Equals, CellValue::Null);
        assert!(f.matches(&Row::new(1)));
        let f = Filter::new("qty", ConditionOperator::GreaterThan, 3);
        assert!(f.matches(&Row::new(1).with("qty", 5)));
        assert!(!f.matches(&Row::new(1).with("qty", 2)));
    }
}
