#![forbid(unsafe_code)]

//! Core: row model, shared table-state types, cell formatting and key events.
//!
//! Everything in this crate is plain data plus pure functions. The widgets
//! crate builds the grid algorithms on top of these types and the runtime
//! crate owns the mutable table store.

pub mod error;
pub mod event;
pub mod format;
pub mod logging;
pub mod row;
pub mod state;

// Re-export tracing macros at crate root for ergonomic use.
#[cfg(feature = "tracing")]
pub use logging::{debug, debug_span, error, info, trace, trace_span, warn};

pub use error::{GridError, Result};
pub use event::{KeyCode, KeyEvent, KeyEventKind, Modifiers};
pub use format::{
    CellFormatting, CellStyle, ConditionOperator, FormattedCell, NumberFormatting, format_cell,
};
pub use row::{CellValue, Row, RowId, RowKey};
pub use state::{
    ColumnResize, Filter, FocusedCell, ResizePreview, RowResize, SortDirection, SortState,
    StickyPosition,
};
