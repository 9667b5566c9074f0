//! Aggregated grid configuration.

use vgrid_runtime::{LoaderConfig, StoreConfig};
use vgrid_widgets::{
    ColumnConfig, FocusConfig, RowHeightConfig, StickyConfig, VirtualizerConfig,
};

/// Configuration for a [`GridView`](crate::GridView).
///
/// Every part defaults to the values of its own config type.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GridConfig {
    /// Virtualizer buffer and suppression window.
    pub virtualizer: VirtualizerConfig,
    /// Column widths.
    pub columns: ColumnConfig,
    /// Row heights.
    pub heights: RowHeightConfig,
    /// Sticky group headers.
    pub sticky: StickyConfig,
    /// Keyboard focus.
    pub focus: FocusConfig,
    /// Page loading.
    pub loader: LoaderConfig,
    /// Table store.
    pub store: StoreConfig,
    /// Column holding the row key. Falls back to `id`, then the first column.
    pub id_column: Option<String>,
    /// Tab stops ahead of the data columns (selection box, expander).
    pub fixed_tab_stops: usize,
}

impl GridConfig {
    /// Set the virtualizer configuration.
    #[must_use]
    pub fn with_virtualizer(mut self, config: VirtualizerConfig) -> Self {
        self.virtualizer = config;
        self
    }

    /// Set the column configuration.
    #[must_use]
    pub fn with_columns(mut self, config: ColumnConfig) -> Self {
        self.columns = config;
        self
    }

    /// Set the row height configuration.
    #[must_use]
    pub fn with_heights(mut self, config: RowHeightConfig) -> Self {
        self.heights = config;
        self
    }

    /// Set the sticky header configuration.
    #[must_use]
    pub fn with_sticky(mut self, config: StickyConfig) -> Self {
        self.sticky = config;
        self
    }

    /// Set the focus configuration.
    #[must_use]
    pub fn with_focus(mut self, config: FocusConfig) -> Self {
        self.focus = config;
        self
    }

    /// Set the loader configuration.
    #[must_use]
    pub fn with_loader(mut self, config: LoaderConfig) -> Self {
        self.loader = config;
        self
    }

    /// Set the store configuration.
    #[must_use]
    pub fn with_store(mut self, config: StoreConfig) -> Self {
        self.store = config;
        self
    }

    /// Use `column` as the row key.
    #[must_use]
    pub fn with_id_column(mut self, column: impl Into<String>) -> Self {
        self.id_column = Some(column.into());
        self
    }

    /// Set the number of fixed leading tab stops.
    #[must_use]
    pub fn with_fixed_tab_stops(mut self, stops: usize) -> Self {
        self.fixed_tab_stops = stops;
        self
    }
}
