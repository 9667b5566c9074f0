#![forbid(unsafe_code)]

//! vgrid public facade crate.
//!
//! A headless, virtualized data grid: [`GridView`] streams rows from a
//! [`DataSource`], filters, sorts and groups them, resolves row heights,
//! picks the rows to mount and hands the host a [`RenderWindow`] to paint.
//! This crate re-exports the common types of the internal crates and offers
//! a prelude for day-to-day usage.

pub mod config;
pub mod view;

pub use config::GridConfig;
pub use view::{GridView, RenderColumn, RenderRow, RenderWindow};

// --- Core re-exports -------------------------------------------------------

pub use vgrid_core::{
    CellFormatting, CellStyle, CellValue, ConditionOperator, Filter, FocusedCell, FormattedCell,
    KeyCode, KeyEvent, KeyEventKind, Modifiers, NumberFormatting, Row, RowId, RowKey,
    SortDirection, SortState, StickyPosition,
};

// --- Widget re-exports -----------------------------------------------------

pub use vgrid_widgets::{
    ColumnConfig, FocusChange, FocusConfig, RowHeightConfig, StickyConfig, StickyHeader,
    VirtualRange, VirtualizerConfig,
};

// --- Runtime re-exports ----------------------------------------------------

#[cfg(feature = "state-persistence")]
pub use vgrid_runtime::FileStorage;
pub use vgrid_runtime::{
    Command, Concern, DataSource, FetchError, LoadError, LoaderConfig, MemoryStorage, Page,
    PageRequest, StorageBackend, StorageError, StoreConfig, TableState,
};

// --- Errors ---------------------------------------------------------------

/// Top-level error type for grid hosts.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A page fetch failed.
    #[error(transparent)]
    Load(#[from] LoadError),
    /// Saved state could not be read or written.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Standard result type for vgrid APIs.
pub type Result<T> = std::result::Result<T, Error>;

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        CellValue, Command, DataSource, Error, FetchError, GridConfig, GridView, KeyCode,
        KeyEvent, Page, PageRequest, RenderWindow, Result, Row, RowId, SortState,
    };

    pub use crate::{core, runtime, widgets};
}

pub use vgrid_core as core;
pub use vgrid_runtime as runtime;
pub use vgrid_widgets as widgets;
