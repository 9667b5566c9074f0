//! Sticky group headers.
//!
//! When a drilled-down group scrolls past the top of the viewport its header
//! row is pinned there until the group's last row scrolls out. One header is
//! pinned per group level, up to `max_level`.
//!
//! Row tops and group extents are derived once per visible-row change by
//! [`StickyHeaderTracker::set_rows`]; each scroll tick is then a linear pass
//! over the group roots only.

use std::borrow::Borrow;
use std::collections::{BTreeMap, HashSet};

use vgrid_core::{Row, RowId};

use crate::fenwick::HeightIndex;

/// Sticky header configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StickyConfig {
    /// Group levels below this value may pin.
    pub max_level: u32,
}

impl Default for StickyConfig {
    fn default() -> Self {
        Self { max_level: 2 }
    }
}

impl StickyConfig {
    /// Set the level cutoff.
    #[must_use]
    pub fn with_max_level(mut self, max_level: u32) -> Self {
        self.max_level = max_level;
        self
    }
}

/// A pinned header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StickyHeader {
    /// Index into the visible rows.
    pub index: usize,
    /// Id of the group root.
    pub row_id: RowId,
    /// Group level.
    pub level: u32,
}

#[derive(Debug, Clone)]
struct GroupSpan {
    index: usize,
    row_id: RowId,
    level: u32,
    top: u32,
    bottom: u32,
}

/// Tracks which group headers pin to the viewport top.
#[derive(Debug, Clone, Default)]
pub struct StickyHeaderTracker {
    config: StickyConfig,
    groups: Vec<GroupSpan>,
}

impl StickyHeaderTracker {
    /// Create a tracker with no rows.
    #[must_use]
    pub fn new(config: StickyConfig) -> Self {
        Self {
            config,
            groups: Vec::new(),
        }
    }

    /// Rebuild group extents for the visible rows.
    ///
    /// Only open group roots shallower than `max_level` are candidates. A
    /// group extends over the contiguous run of following rows whose chain
    /// names it.
    pub fn set_rows<R: Borrow<Row>>(
        &mut self,
        rows: &[R],
        heights: &HeightIndex,
        open: &HashSet<RowId>,
    ) {
        self.groups.clear();
        // Open groups enclosing the current row, outermost first.
        let mut stack: Vec<(usize, &RowId)> = Vec::new();
        let mut ends: Vec<(usize, usize)> = Vec::new();

        for (i, row) in rows.iter().enumerate() {
            let row: &Row = row.borrow();
            while let Some(&(start, id)) = stack.last() {
                if row.has_ancestor(id) {
                    break;
                }
                ends.push((start, i - 1));
                stack.pop();
            }
            if row.is_group_root {
                stack.push((i, &row.id));
            }
        }
        let last = rows.len().saturating_sub(1);
        ends.extend(stack.drain(..).map(|(start, _)| (start, last)));
        ends.sort_unstable();

        for (start, end) in ends {
            let row: &Row = rows[start].borrow();
            if row.group_level >= self.config.max_level || !open.contains(&row.id) {
                continue;
            }
            self.groups.push(GroupSpan {
                index: start,
                row_id: row.id.clone(),
                level: row.group_level,
                top: heights.offset_of(start),
                bottom: heights.bottom_of(end),
            });
        }
    }

    /// Headers to pin at `scroll_top`, ordered by level.
    #[must_use]
    pub fn on_scroll(&self, scroll_top: u32) -> Vec<StickyHeader> {
        let mut by_level: BTreeMap<u32, &GroupSpan> = BTreeMap::new();
        for group in &self.groups {
            if group.top < scroll_top && group.bottom > scroll_top {
                by_level
                    .entry(group.level)
                    .and_modify(|g| {
                        if group.index > g.index {
                            *g = group;
                        }
                    })
                    .or_insert(group);
            }
        }
        by_level
            .into_values()
            .map(|g| StickyHeader {
                index: g.index,
                row_id: g.row_id.clone(),
                level: g.level,
            })
            .collect()
    }
}
