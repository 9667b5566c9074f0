//! Table state store.
//!
//! All table state lives in one [`TableState`] value mutated exclusively by
//! [`Command`]s passed to [`TableStore::dispatch`]. Each applied command
//!
//! 1. bumps the global revision and the revision of every touched concern,
//! 2. is appended to a bounded history,
//! 3. notifies listeners with the touched [`Concern`]s,
//! 4. writes the persisted subset to storage when a persisted field changed.
//!
//! A command that leaves the state untouched is dropped: no revision bump, no
//! history entry, no notification.
//!
//! Per-concern revisions are the cache keys of downstream derivations; the
//! sort cache, for example, keys on `(rows_version, sort_revision)`.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;
use vgrid_core::{
    CellFormatting, ColumnResize, Filter, FocusedCell, RowId, RowResize, SortState,
    StickyPosition,
};
use vgrid_widgets::{ColumnVisibility, ColumnWidths, LeafSorts, StickyColumns};

use crate::state_persistence::{PersistedTableState, StorageBackend, StorageResult, storage_key};

/// Complete state of one table.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableState {
    /// Open group ids.
    pub drilldowns: HashSet<RowId>,
    /// Group ids whose header is toggled open. Pins sticky headers
    /// alongside `drilldowns` but does not reveal children.
    pub expanded_levels: HashSet<RowId>,
    /// Column filters.
    pub filters: Vec<Filter>,
    /// Root sort.
    pub sort: Option<SortState>,
    /// Sorts for the children of individual groups.
    pub leaf_sorts: LeafSorts,
    /// Explicit column order.
    pub column_order: Vec<String>,
    /// Column visibility; missing columns are visible.
    pub column_visibility: ColumnVisibility,
    /// Sticky positions.
    pub sticky_columns: StickyColumns,
    /// Committed column widths.
    pub column_widths: ColumnWidths,
    /// Committed row height overrides keyed by row key.
    pub row_heights: HashMap<RowId, u32>,
    /// Column resize in progress.
    pub column_resize: Option<ColumnResize>,
    /// Row resize in progress.
    pub row_resize: Option<RowResize>,
    /// Selected row keys.
    pub selected_rows: HashSet<RowId>,
    /// Rows showing their detail panel.
    pub expanded_rows: HashSet<RowId>,
    /// Per-column cell formatting.
    pub cell_formatting: BTreeMap<String, CellFormatting>,
    /// Whether a page fetch is in flight.
    pub loading: bool,
    /// Keyboard-focused cell.
    pub focused_cell: Option<FocusedCell>,
}

bitflags! {
    /// Parts of the table state touched by a command.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Concern: u16 {
        /// Root or leaf sort.
        const SORT = 1 << 0;
        /// Drilldowns or expanded levels.
        const GROUPS = 1 << 1;
        /// Anything feeding row heights.
        const HEIGHTS = 1 << 2;
        /// Column order, visibility, committed widths or sticky positions.
        const COLUMNS = 1 << 3;
        /// Filters.
        const FILTERS = 1 << 4;
        /// Selection.
        const SELECTION = 1 << 5;
        /// Loading flag.
        const LOADING = 1 << 6;
        /// Focused cell.
        const FOCUS = 1 << 7;
        /// Cell formatting.
        const FORMATTING = 1 << 8;
        /// Column or row resize preview.
        const PREVIEW = 1 << 9;
    }
}

/// A state mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Replace the open group set.
    SetDrilldowns(HashSet<RowId>),
    /// Open a closed group or close an open one.
    ToggleDrilldown(RowId),
    /// Replace the expanded group ids.
    SetExpandedLevels(HashSet<RowId>),
    /// Replace the filters.
    SetFilters(Vec<Filter>),
    /// Set or clear the root sort.
    SetSort(Option<SortState>),
    /// Set or clear the sort of one group's children.
    SetLeafSort {
        /// Group whose children are ordered.
        parent: RowId,
        /// New sort, or `None` to restore input order.
        sort: Option<SortState>,
    },
    /// Replace the explicit column order.
    SetColumnOrder(Vec<String>),
    /// Replace column visibility.
    SetColumnVisibility(ColumnVisibility),
    /// Replace committed column widths.
    SetColumnWidths(ColumnWidths),
    /// Commit one column width and clear the column resize preview.
    CommitColumnWidth {
        /// Column resized.
        column: String,
        /// Committed width.
        width: u32,
    },
    /// Pin or unpin a column.
    SetColumnSticky {
        /// Column.
        column: String,
        /// New position; [`StickyPosition::None`] unpins.
        position: StickyPosition,
    },
    /// Set the loading flag.
    SetLoading(bool),
    /// Replace the selection.
    SetSelectedRows(HashSet<RowId>),
    /// Replace the expanded rows.
    SetExpandedRows(HashSet<RowId>),
    /// Expand a collapsed row or collapse an expanded one.
    ToggleRowExpansion(RowId),
    /// Set or clear the formatting of one column.
    SetCellFormatting {
        /// Column.
        column: String,
        /// New formatting, or `None` to clear.
        formatting: Option<CellFormatting>,
    },
    /// Set or clear the column resize preview.
    SetColumnResize(Option<ColumnResize>),
    /// Set or clear the row resize preview.
    SetRowResize(Option<RowResize>),
    /// Merge row height overrides and clear the row resize preview.
    ///
    /// A height of 0 removes the override for that row.
    CommitRowHeights(HashMap<RowId, u32>),
    /// Move keyboard focus.
    SetFocusedCell(Option<FocusedCell>),
}

impl Command {
    /// Short name for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::SetDrilldowns(_) => "SetDrilldowns",
            Self::ToggleDrilldown(_) => "ToggleDrilldown",
            Self::SetExpandedLevels(_) => "SetExpandedLevels",
            Self::SetFilters(_) => "SetFilters",
            Self::SetSort(_) => "SetSort",
            Self::SetLeafSort { .. } => "SetLeafSort",
            Self::SetColumnOrder(_) => "SetColumnOrder",
            Self::SetColumnVisibility(_) => "SetColumnVisibility",
            Self::SetColumnWidths(_) => "SetColumnWidths",
            Self::CommitColumnWidth { .. } => "CommitColumnWidth",
            Self::SetColumnSticky { .. } => "SetColumnSticky",
            Self::SetLoading(_) => "SetLoading",
            Self::SetSelectedRows(_) => "SetSelectedRows",
            Self::SetExpandedRows(_) => "SetExpandedRows",
            Self::ToggleRowExpansion(_) => "ToggleRowExpansion",
            Self::SetCellFormatting { .. } => "SetCellFormatting",
            Self::SetColumnResize(_) => "SetColumnResize",
            Self::SetRowResize(_) => "SetRowResize",
            Self::CommitRowHeights(_) => "CommitRowHeights",
            Self::SetFocusedCell(_) => "SetFocusedCell",
        }
    }
}

fn touched(changed: bool, concern: Concern) -> Concern {
    if changed { concern } else { Concern::empty() }
}

fn replace<T: PartialEq>(slot: &mut T, value: T, concern: Concern) -> Concern {
    let changed = *slot != value;
    *slot = value;
    touched(changed, concern)
}

fn toggle(set: &mut HashSet<RowId>, id: RowId) {
    if !set.remove(&id) {
        set.insert(id);
    }
}

impl TableState {
    /// Apply `command`, returning the touched concerns.
    ///
    /// Returns [`Concern::empty`] when nothing changed.
    pub fn apply(&mut self, command: Command) -> Concern {
        match command {
            Command::SetDrilldowns(ids) => replace(&mut self.drilldowns, ids, Concern::GROUPS),
            Command::ToggleDrilldown(id) => {
                toggle(&mut self.drilldowns, id);
                Concern::GROUPS
            }
            Command::SetExpandedLevels(levels) => {
                replace(&mut self.expanded_levels, levels, Concern::GROUPS)
            }
            Command::SetFilters(filters) => replace(&mut self.filters, filters, Concern::FILTERS),
            Command::SetSort(sort) => replace(&mut self.sort, sort, Concern::SORT),
            Command::SetLeafSort { parent, sort } => {
                let changed = match sort {
                    Some(sort) => {
                        let previous = self.leaf_sorts.insert(parent, sort.clone());
                        previous.as_ref() != Some(&sort)
                    }
                    None => self.leaf_sorts.remove(&parent).is_some(),
                };
                touched(changed, Concern::SORT)
            }
            Command::SetColumnOrder(order) => {
                replace(&mut self.column_order, order, Concern::COLUMNS)
            }
            Command::SetColumnVisibility(visibility) => {
                replace(&mut self.column_visibility, visibility, Concern::COLUMNS)
            }
            Command::SetColumnWidths(widths) => {
                replace(&mut self.column_widths, widths, Concern::COLUMNS)
            }
            Command::CommitColumnWidth { column, width } => {
                let preview = self.column_resize.take().is_some();
                let changed = self.column_widths.insert(column, width) != Some(width);
                touched(preview || changed, Concern::COLUMNS)
            }
            Command::SetColumnSticky { column, position } => {
                let previous = if position == StickyPosition::None {
                    self.sticky_columns.remove(&column)
                } else {
                    self.sticky_columns.insert(column, position)
                };
                touched(previous.unwrap_or_default() != position, Concern::COLUMNS)
            }
            Command::SetLoading(loading) => replace(&mut self.loading, loading, Concern::LOADING),
            Command::SetSelectedRows(ids) => {
                replace(&mut self.selected_rows, ids, Concern::SELECTION)
            }
            Command::SetExpandedRows(ids) => {
                replace(&mut self.expanded_rows, ids, Concern::HEIGHTS)
            }
            Command::ToggleRowExpansion(id) => {
                toggle(&mut self.expanded_rows, id);
                Concern::HEIGHTS
            }
            Command::SetCellFormatting { column, formatting } => {
                let previous = match formatting.clone() {
                    Some(f) => self.cell_formatting.insert(column, f),
                    None => self.cell_formatting.remove(&column),
                };
                touched(previous != formatting, Concern::FORMATTING)
            }
            Command::SetColumnResize(preview) => {
                replace(&mut self.column_resize, preview, Concern::PREVIEW)
            }
            Command::SetRowResize(preview) => {
                replace(&mut self.row_resize, preview, Concern::PREVIEW | Concern::HEIGHTS)
            }
            Command::CommitRowHeights(heights) => {
                let mut changed = self.row_resize.take().is_some();
                for (id, height) in heights {
                    changed |= if height == 0 {
                        self.row_heights.remove(&id).is_some()
                    } else {
                        self.row_heights.insert(id, height) != Some(height)
                    };
                }
                touched(changed, Concern::HEIGHTS)
            }
            Command::SetFocusedCell(cell) => replace(&mut self.focused_cell, cell, Concern::FOCUS),
        }
    }
}

/// Store configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Table id used for the storage key. Persistence is off without one.
    pub table_id: Option<String>,
    /// Maximum number of commands kept in history.
    pub history_limit: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            table_id: None,
            history_limit: 100,
        }
    }
}

impl StoreConfig {
    /// Set the table id.
    #[must_use]
    pub fn with_table_id(mut self, table_id: impl Into<String>) -> Self {
        self.table_id = Some(table_id.into());
        self
    }

    /// Set the history cap.
    #[must_use]
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }
}

/// Per-concern revision counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Revisions {
    /// Bumped by every applied command.
    pub global: u64,
    /// Root and leaf sorts.
    pub sort: u64,
    /// Drilldowns and expanded levels.
    pub groups: u64,
    /// Row height inputs.
    pub heights: u64,
    /// Column layout.
    pub columns: u64,
    /// Filters.
    pub filters: u64,
}

impl Revisions {
    fn bump(&mut self, concern: Concern) {
        self.global += 1;
        if concern.contains(Concern::SORT) {
            self.sort += 1;
        }
        if concern.contains(Concern::GROUPS) {
            self.groups += 1;
        }
        if concern.contains(Concern::HEIGHTS) {
            self.heights += 1;
        }
        if concern.contains(Concern::COLUMNS) {
            self.columns += 1;
        }
        if concern.contains(Concern::FILTERS) {
            self.filters += 1;
        }
    }
}

/// Handle returned by [`TableStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubId(u64);

type Listener = Box<dyn Fn(&TableState, Concern)>;

/// Concerns whose fields are written to storage.
const PERSISTED: Concern = Concern::SORT
    .union(Concern::GROUPS)
    .union(Concern::COLUMNS)
    .union(Concern::FILTERS)
    .union(Concern::FORMATTING);

/// Owner of one table's state.
pub struct TableStore {
    config: StoreConfig,
    state: TableState,
    revisions: Revisions,
    history: VecDeque<Command>,
    listeners: Vec<(SubId, Listener)>,
    next_sub: u64,
    storage: Option<Arc<dyn StorageBackend>>,
    persist_failures: u64,
}

impl TableStore {
    /// Create an in-memory store.
    #[must_use]
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            state: TableState::default(),
            revisions: Revisions::default(),
            history: VecDeque::new(),
            listeners: Vec::new(),
            next_sub: 0,
            storage: None,
            persist_failures: 0,
        }
    }

    /// Create a store backed by `storage`, restoring any saved state.
    ///
    /// Without a table id in `config` the backend is never touched.
    /// Unreadable or incompatible documents are logged and ignored.
    #[must_use]
    pub fn with_storage(config: StoreConfig, storage: Arc<dyn StorageBackend>) -> Self {
        let mut store = Self::new(config);
        store.storage = Some(storage);
        store.restore();
        store
    }

    fn restore(&mut self) {
        let (Some(storage), Some(table_id)) = (&self.storage, &self.config.table_id) else {
            return;
        };
        let key = storage_key(table_id);
        let stored = match storage.get_item(&key) {
            Ok(Some(json)) => json,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(backend = storage.name(), key = %key, error = %e, "failed to read table state");
                return;
            }
        };
        match PersistedTableState::from_json(&stored) {
            Ok(Some(doc)) => {
                doc.restore_into(&mut self.state);
                tracing::debug!(key = %key, "restored table state");
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "discarding unreadable table state");
            }
        }
    }

    fn persist(&mut self) {
        let (Some(storage), Some(table_id)) = (&self.storage, &self.config.table_id) else {
            return;
        };
        let key = storage_key(table_id);
        let result = PersistedTableState::capture(&self.state)
            .to_json()
            .and_then(|json| storage.set_item(&key, &json));
        if let Err(e) = result {
            self.persist_failures += 1;
            tracing::warn!(backend = storage.name(), key = %key, error = %e, "failed to persist table state");
        }
    }

    /// Delete this table's saved state. In-memory state is kept.
    pub fn clear_persisted(&self) -> StorageResult<()> {
        match (&self.storage, &self.config.table_id) {
            (Some(storage), Some(table_id)) => storage.remove_item(&storage_key(table_id)),
            _ => Ok(()),
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> &TableState {
        &self.state
    }

    /// Current revisions.
    #[must_use]
    pub fn revisions(&self) -> Revisions {
        self.revisions
    }

    /// Global revision.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revisions.global
    }

    /// Applied commands, oldest first.
    #[must_use]
    pub fn history(&self) -> &VecDeque<Command> {
        &self.history
    }

    /// Number of failed storage writes since construction.
    #[must_use]
    pub fn persist_failures(&self) -> u64 {
        self.persist_failures
    }

    /// Store configuration.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Apply a command.
    ///
    /// Returns the touched concerns, empty when the command changed nothing.
    pub fn dispatch(&mut self, command: Command) -> Concern {
        let _span = tracing::debug_span!("table_dispatch", command = command.name()).entered();
        let record = (self.config.history_limit > 0).then(|| command.clone());
        let concern = self.state.apply(command);
        if concern.is_empty() {
            tracing::trace!("command left state unchanged");
            return concern;
        }

        self.revisions.bump(concern);
        tracing::trace!(
            revision = self.revisions.global,
            concern = ?concern,
            "applied command"
        );

        if let Some(record) = record {
            while self.history.len() >= self.config.history_limit {
                self.history.pop_front();
            }
            self.history.push_back(record);
        }

        for (_, listener) in &self.listeners {
            listener(&self.state, concern);
        }

        if concern.intersects(PERSISTED) {
            self.persist();
        }
        concern
    }

    /// Register a change listener.
    pub fn subscribe(&mut self, listener: impl Fn(&TableState, Concern) + 'static) -> SubId {
        let id = SubId(self.next_sub);
        self.next_sub += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns `false` if `id` was not registered.
    pub fn unsubscribe(&mut self, id: SubId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sub, _)| *sub != id);
        self.listeners.len() != before
    }
}

impl Default for TableStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

impl fmt::Debug for TableStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableStore")
            .field("config", &self.config)
            .field("revisions", &self.revisions)
            .field("history", &self.history.len())
            .field("listeners", &self.listeners.len())
            .field("storage", &self.storage.as_ref().map(|s| s.name().to_owned()))
            .finish()
    }
}
