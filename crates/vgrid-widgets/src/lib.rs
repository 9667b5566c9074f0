#![forbid(unsafe_code)]

//! Grid algorithms for vgrid.
//!
//! Everything here is a pure function of rows, table state and viewport
//! metrics, or a small state machine driven by caller-supplied instants.
//! The typical pipeline is:
//!
//! 1. [`filter`] drops leaf rows failing the column filters,
//! 2. [`sort`] orders siblings at every group level,
//! 3. [`visible`] keeps rows whose ancestors are drilled into,
//! 4. [`heights`] resolves a height per visible row,
//! 5. [`virtualizer`] picks the rows to mount for the viewport,
//! 6. [`sticky`] and [`focus`] track pinned headers and keyboard focus.
//!
//! [`columns`] handles horizontal layout independently.

pub mod columns;
pub mod fenwick;
pub mod filter;
pub mod focus;
pub mod heights;
pub mod sort;
pub mod sticky;
pub mod virtualizer;
pub mod visible;

pub use columns::{
    ColumnConfig, ColumnLayout, ColumnVisibility, ColumnWidths, GROUP_BY_COLUMN, ResizeDrag,
    StickyColumns, StickyOffsets, reorder, sticky_offsets,
};
pub use fenwick::HeightIndex;
pub use filter::{apply_filters, filter_indices};
pub use focus::{FocusChange, FocusConfig, FocusContext, FocusNavigator, NavState};
pub use heights::{HeightInputs, RowHeightConfig, RowHeightResolver};
pub use sort::{LeafSorts, SortCache, compare_values, sort_order, sort_rows};
pub use sticky::{StickyConfig, StickyHeader, StickyHeaderTracker};
pub use virtualizer::{
    StaticViewport, VariableVirtualizer, ViewportMetrics, VirtualRange, VirtualizerConfig,
    compute_range,
};
pub use visible::{visible_indices, visible_indices_partial, visible_rows};
