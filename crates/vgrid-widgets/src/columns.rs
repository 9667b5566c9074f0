//! Column layout: order, visibility, widths, sticky offsets and resizing.
//!
//! Layout is a pure function of the natural column list and the table
//! state. Unknown column ids anywhere in the state are ignored rather than
//! reported.

use std::collections::BTreeMap;

use vgrid_core::{ColumnResize, ResizePreview, StickyPosition};

/// Committed widths keyed by column.
pub type ColumnWidths = BTreeMap<String, u32>;
/// Visibility flags keyed by column. Missing means visible.
pub type ColumnVisibility = BTreeMap<String, bool>;
/// Sticky placement keyed by column. Missing means [`StickyPosition::None`].
pub type StickyColumns = BTreeMap<String, StickyPosition>;

/// Synthetic column that carries the group label in grouped views.
pub const GROUP_BY_COLUMN: &str = "$group_by";

/// Column layout configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnConfig {
    /// Width of a column without a committed width.
    pub default_width: u32,
    /// Smallest width a column resize may produce.
    pub min_width: u32,
    /// Combined width of fixed leading columns (selection, expander, addon).
    pub leading_width: u32,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            default_width: 250,
            min_width: 50,
            leading_width: 0,
        }
    }
}

impl ColumnConfig {
    /// Set the default column width.
    #[must_use]
    pub fn with_default_width(mut self, width: u32) -> Self {
        self.default_width = width;
        self
    }

    /// Set the resize floor.
    #[must_use]
    pub fn with_min_width(mut self, width: u32) -> Self {
        self.min_width = width;
        self
    }

    /// Set the width of the fixed leading columns.
    #[must_use]
    pub fn with_leading_width(mut self, width: u32) -> Self {
        self.leading_width = width;
        self
    }
}

/// Pixel offsets of sticky columns from their edge.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StickyOffsets {
    /// Distance from the left edge for left-sticky columns.
    pub left: BTreeMap<String, u32>,
    /// Distance from the right edge for right-sticky columns.
    pub right: BTreeMap<String, u32>,
}

impl StickyOffsets {
    /// Offset and edge for `column`, if it is sticky.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<(StickyPosition, u32)> {
        if let Some(&x) = self.left.get(column) {
            return Some((StickyPosition::Left, x));
        }
        self.right
            .get(column)
            .map(|&x| (StickyPosition::Right, x))
    }
}

/// Layout over a fixed natural column list.
#[derive(Debug, Clone, Default)]
pub struct ColumnLayout {
    natural: Vec<String>,
    config: ColumnConfig,
}

impl ColumnLayout {
    /// Create a layout for `columns` in their natural order.
    #[must_use]
    pub fn new<I, S>(columns: I, config: ColumnConfig) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            natural: columns.into_iter().map(Into::into).collect(),
            config,
        }
    }

    /// Natural column order.
    #[must_use]
    pub fn natural(&self) -> &[String] {
        &self.natural
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &ColumnConfig {
        &self.config
    }

    fn is_known(&self, column: &str) -> bool {
        self.natural.iter().any(|c| c == column)
    }

    /// Explicit order first, then natural columns it does not mention.
    ///
    /// Stale and duplicate ids in `order` are dropped.
    #[must_use]
    pub fn ordered_columns(&self, order: &[String]) -> Vec<String> {
        let mut out: Vec<String> = Vec::with_capacity(self.natural.len());
        for col in order {
            if self.is_known(col) && !out.contains(col) {
                out.push(col.clone());
            }
        }
        for col in &self.natural {
            if !out.contains(col) {
                out.push(col.clone());
            }
        }
        out
    }

    /// Ordered columns minus hidden ones.
    #[must_use]
    pub fn displayed_columns(&self, order: &[String], visibility: &ColumnVisibility) -> Vec<String> {
        let mut cols = self.ordered_columns(order);
        cols.retain(|c| visibility.get(c).copied().unwrap_or(true));
        cols
    }

    /// Width of `column`: the resize preview while it is being dragged,
    /// else the committed width, else the default.
    #[must_use]
    pub fn column_width(
        &self,
        column: &str,
        widths: &ColumnWidths,
        preview: Option<&ColumnResize>,
    ) -> u32 {
        match preview {
            Some(p) if p.key == column => p.size,
            _ => widths
                .get(column)
                .copied()
                .unwrap_or(self.config.default_width),
        }
    }

    /// Sum of `columns` widths plus the fixed leading columns.
    #[must_use]
    pub fn total_width(
        &self,
        columns: &[String],
        widths: &ColumnWidths,
        preview: Option<&ColumnResize>,
    ) -> u32 {
        columns
            .iter()
            .map(|c| self.column_width(c, widths, preview))
            .fold(self.config.leading_width, u32::saturating_add)
    }

    /// Width map with defaults filled in for every natural column and
    /// [`GROUP_BY_COLUMN`], and stale entries removed.
    ///
    /// Returns `None` when `widths` is already reconciled.
    #[must_use]
    pub fn reconcile_widths(&self, widths: &ColumnWidths) -> Option<ColumnWidths> {
        let wanted = || {
            self.natural
                .iter()
                .map(String::as_str)
                .chain(std::iter::once(GROUP_BY_COLUMN))
        };
        let mut next = widths.clone();
        next.retain(|c, _| wanted().any(|w| w == c.as_str()));
        for col in wanted() {
            next.entry(col.to_owned())
                .or_insert(self.config.default_width);
        }
        (next != *widths).then_some(next)
    }
}

/// Offsets for sticky columns in display order.
///
/// Left-sticky columns stack from the left edge in display order;
/// right-sticky columns stack from the right edge, last column outermost.
#[must_use]
pub fn sticky_offsets<F>(columns: &[String], sticky: &StickyColumns, width: F) -> StickyOffsets
where
    F: Fn(&str) -> u32,
{
    let position = |c: &str| sticky.get(c).copied().unwrap_or_default();
    let mut offsets = StickyOffsets::default();

    let mut x = 0u32;
    for col in columns {
        if position(col.as_str()) == StickyPosition::Left {
            offsets.left.insert(col.clone(), x);
            x = x.saturating_add(width(col.as_str()));
        }
    }

    let mut x = 0u32;
    for col in columns.iter().rev() {
        if position(col.as_str()) == StickyPosition::Right {
            offsets.right.insert(col.clone(), x);
            x = x.saturating_add(width(col.as_str()));
        }
    }
    offsets
}

/// Move `dragged` to the position currently held by `target`.
///
/// `dragged` is spliced out and reinserted at `target`'s index. Returns
/// `None` when either id is missing or they are the same column.
#[must_use]
pub fn reorder(order: &[String], dragged: &str, target: &str) -> Option<Vec<String>> {
    if dragged == target {
        return None;
    }
    let from = order.iter().position(|c| c == dragged)?;
    let to = order.iter().position(|c| c == target)?;
    let mut next = order.to_vec();
    let moved = next.remove(from);
    next.insert(to, moved);
    Some(next)
}

/// Pointer-driven resize of one column or row.
///
/// `begin` captures the pointer position and the current size; `update`
/// yields a floored preview; `finish` yields the value to commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizeDrag<K> {
    min_size: u32,
    session: Option<DragSession<K>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct DragSession<K> {
    key: K,
    start_pos: i32,
    start_size: u32,
    size: u32,
}

impl<K: Clone + PartialEq> ResizeDrag<K> {
    /// Create an idle drag with a size floor.
    #[must_use]
    pub fn new(min_size: u32) -> Self {
        Self {
            min_size,
            session: None,
        }
    }

    /// Whether a drag is in progress.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Start dragging `key` from pointer position `pos`.
    pub fn begin(&mut self, key: K, pos: i32, current_size: u32) -> ResizePreview<K> {
        let size = current_size.max(self.min_size);
        self.session = Some(DragSession {
            key: key.clone(),
            start_pos: pos,
            start_size: size,
            size,
        });
        ResizePreview { key, size }
    }

    /// Pointer moved to `pos`. Returns the new preview, or `None` when idle.
    pub fn update(&mut self, pos: i32) -> Option<ResizePreview<K>> {
        let min = self.min_size;
        let s = self.session.as_mut()?;
        let delta = i64::from(pos) - i64::from(s.start_pos);
        let raw = i64::from(s.start_size) + delta;
        s.size = raw.clamp(i64::from(min), i64::from(u32::MAX)) as u32;
        Some(ResizePreview {
            key: s.key.clone(),
            size: s.size,
        })
    }

    /// Pointer released. Returns the size to commit.
    pub fn finish(&mut self) -> Option<ResizePreview<K>> {
        self.session.take().map(|s| ResizePreview {
            key: s.key,
            size: s.size,
        })
    }

    /// Abandon the drag without committing.
    pub fn cancel(&mut self) {
        self.session = None;
    }
}
