//! The grid pipeline.
//!
//! [`GridView`] wires the store, the loader and the widget algorithms into
//! one object a host drives with events and frames:
//!
//! ```text
//! loaded window ─► filters ─► sort (cached) ─► drill-down visibility
//!        ─► row heights ─► virtualizer ─► sticky headers ─► render window
//!                               │
//!                               └─► ensure_loaded(placeholders in range)
//! ```
//!
//! Filtering and sorting need every row, so they only run once the whole
//! data set is loaded. Until then rows are shown in server order and every
//! unloaded slot renders as a placeholder with the default row height.
//!
//! Commands that change rows, order or heights request a frame; the next
//! [`GridView::on_frame`] rebuilds once no matter how many commands arrived.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use vgrid_core::{
    FormattedCell, KeyEvent, Row, RowId, RowKey, SortDirection, SortState, StickyPosition,
    format_cell,
};
use vgrid_runtime::{
    Command, Concern, DataSource, FrameScheduler, LoadedWindow, Slot, StorageBackend, TableState,
    TableStore, WindowedLoader,
};
use vgrid_widgets::{
    ColumnLayout, FocusChange, FocusContext, FocusNavigator, HeightInputs, ResizeDrag,
    RowHeightResolver, SortCache, StaticViewport, StickyHeader, StickyHeaderTracker,
    VariableVirtualizer, VirtualRange, filter_indices, reorder, sticky_offsets, visible_indices,
    visible_indices_partial,
};

use crate::Result;
use crate::config::GridConfig;

/// Concerns that invalidate the displayed row sequence or its heights.
const REBUILD: Concern = Concern::SORT
    .union(Concern::GROUPS)
    .union(Concern::FILTERS)
    .union(Concern::HEIGHTS);

/// One displayed position, pointing at a slot of the loaded window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DisplaySlot {
    Loaded(usize),
    Placeholder(usize),
}

impl DisplaySlot {
    fn slot(self) -> usize {
        match self {
            Self::Loaded(i) | Self::Placeholder(i) => i,
        }
    }
}

/// A displayed column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderColumn {
    /// Column name.
    pub name: String,
    /// Width in pixels, preview included.
    pub width: u32,
    /// Sticky edge and offset from it.
    pub sticky: Option<(StickyPosition, u32)>,
    /// Root sort direction when sorted on this column.
    pub sort: Option<SortDirection>,
}

/// A mounted row.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRow<'a> {
    /// Index in the displayed sequence.
    pub index: usize,
    /// The row, or `None` for a loading placeholder.
    pub row: Option<&'a Row>,
    /// Row key, `None` for placeholders.
    pub key: Option<RowId>,
    /// Top edge in pixels.
    pub top: u32,
    /// Height in pixels.
    pub height: u32,
    /// Row is selected.
    pub selected: bool,
    /// Row shows its detail panel.
    pub expanded: bool,
    /// Row is an open group root.
    pub drilled_down: bool,
    /// Focused tab stop, when keyboard focus is on this row.
    pub focused_tab: Option<usize>,
    /// Formatted cells aligned with [`RenderWindow::columns`]. Empty for
    /// placeholders.
    pub cells: Vec<FormattedCell>,
}

/// Everything the host needs to paint one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderWindow<'a> {
    /// Mounted rows, in display order.
    pub rows: Vec<RenderRow<'a>>,
    /// Displayed columns.
    pub columns: Vec<RenderColumn>,
    /// Virtualized range.
    pub range: VirtualRange,
    /// Space above the first mounted row.
    pub padding_top: u32,
    /// Space below the last mounted row.
    pub padding_bottom: u32,
    /// Height of all displayed rows.
    pub total_height: u32,
    /// Width of all displayed columns plus the fixed leading ones.
    pub total_width: u32,
    /// Group headers pinned to the viewport top.
    pub sticky_headers: Vec<StickyHeader>,
    /// Number of displayed rows.
    pub row_count: usize,
    /// A page fetch is in flight.
    pub loading: bool,
}

/// Headless data grid over a [`DataSource`].
pub struct GridView<S> {
    config: GridConfig,
    store: TableStore,
    loader: WindowedLoader<S>,
    layout: ColumnLayout,
    row_key: RowKey,
    resolver: RowHeightResolver,
    virtualizer: VariableVirtualizer,
    sticky: StickyHeaderTracker,
    focus: FocusNavigator,
    sort_cache: SortCache,
    frames: FrameScheduler,
    viewport: StaticViewport,
    column_drag: ResizeDrag<String>,
    row_drag: ResizeDrag<RowId>,
    display: Vec<DisplaySlot>,
    heights: Vec<u32>,
    rows_version: u64,
    data_key: Option<(u64, u64)>,
}

impl<S: DataSource> GridView<S> {
    /// Create a grid with in-memory state.
    #[must_use]
    pub fn new<I, C>(columns: I, source: S, config: GridConfig) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        let store = TableStore::new(config.store.clone());
        Self::assemble(columns, source, config, store)
    }

    /// Create a grid whose persisted state lives in `storage`.
    #[must_use]
    pub fn with_storage<I, C>(
        columns: I,
        source: S,
        config: GridConfig,
        storage: Arc<dyn StorageBackend>,
    ) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        let store = TableStore::with_storage(config.store.clone(), storage);
        Self::assemble(columns, source, config, store)
    }

    fn assemble<I, C>(columns: I, source: S, config: GridConfig, mut store: TableStore) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        let layout = ColumnLayout::new(columns, config.columns);
        if let Some(widths) = layout.reconcile_widths(&store.state().column_widths) {
            store.dispatch(Command::SetColumnWidths(widths));
        }
        let row_key = RowKey::resolve(layout.natural(), config.id_column.as_deref());
        let mut focus = FocusNavigator::new(config.focus);
        focus.set_focused(store.state().focused_cell);

        Self {
            loader: WindowedLoader::new(source, config.loader),
            resolver: RowHeightResolver::new(config.heights),
            virtualizer: VariableVirtualizer::new(config.virtualizer),
            sticky: StickyHeaderTracker::new(config.sticky),
            column_drag: ResizeDrag::new(config.columns.min_width),
            row_drag: ResizeDrag::new(config.heights.min_height),
            sort_cache: SortCache::new(),
            frames: FrameScheduler::new(),
            viewport: StaticViewport::default(),
            display: Vec::new(),
            heights: Vec::new(),
            rows_version: 0,
            data_key: None,
            config,
            store,
            layout,
            row_key,
            focus,
        }
    }

    // ── Accessors ───────────────────────────────────────────────────────

    /// Configuration.
    #[must_use]
    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// Table store.
    #[must_use]
    pub fn store(&self) -> &TableStore {
        &self.store
    }

    /// Table state.
    #[must_use]
    pub fn state(&self) -> &TableState {
        self.store.state()
    }

    /// Loaded rows.
    #[must_use]
    pub fn window(&self) -> &LoadedWindow {
        self.loader.window()
    }

    /// Column layout.
    #[must_use]
    pub fn layout(&self) -> &ColumnLayout {
        &self.layout
    }

    /// Row key column in use.
    #[must_use]
    pub fn row_key(&self) -> &RowKey {
        &self.row_key
    }

    /// Current virtualized range.
    #[must_use]
    pub fn range(&self) -> VirtualRange {
        self.virtualizer.range()
    }

    /// Number of displayed rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.display.len()
    }

    /// Displayed row at `index`, `None` for placeholders and out of range.
    #[must_use]
    pub fn row_at(&self, index: usize) -> Option<&Row> {
        match self.display.get(index)? {
            DisplaySlot::Loaded(slot) => self.loader.window().row(*slot),
            DisplaySlot::Placeholder(_) => None,
        }
    }

    /// Heights of the displayed rows.
    #[must_use]
    pub fn row_heights(&self) -> &[u32] {
        &self.heights
    }

    /// Current viewport metrics.
    #[must_use]
    pub fn viewport(&self) -> StaticViewport {
        self.viewport
    }

    /// Whether a frame is waiting.
    #[must_use]
    pub fn wants_frame(&self, now: Instant) -> bool {
        self.frames.is_pending() || self.virtualizer.wants_frame(now)
    }

    /// Tab stops per row.
    #[must_use]
    pub fn tab_count(&self) -> usize {
        let state = self.store.state();
        self.config.fixed_tab_stops
            + self
                .layout
                .displayed_columns(&state.column_order, &state.column_visibility)
                .len()
    }

    // ── Lifecycle ───────────────────────────────────────────────────────

    /// Schedule the first page and the first frame.
    pub fn start(&mut self, now: Instant) {
        self.loader.load_initial(now);
        self.frames.request(now);
    }

    /// Apply a command through the store.
    ///
    /// Changes to rows, order or heights request a frame.
    pub fn dispatch(&mut self, command: Command, now: Instant) -> Concern {
        let concern = self.store.dispatch(command);
        if concern.intersects(REBUILD) {
            self.frames.request(now);
        }
        if concern.contains(Concern::FOCUS) {
            self.focus.set_focused(self.store.state().focused_cell);
        }
        concern
    }

    /// Fetch the due page, if any.
    ///
    /// Returns `true` when rows were merged; the next frame shows them.
    pub async fn fetch_due(&mut self, now: Instant) -> Result<bool> {
        match self.loader.run_due(now, &mut self.store).await {
            None => Ok(false),
            Some(Ok(_)) => {
                self.frames.request(now);
                Ok(true)
            }
            Some(Err(e)) => Err(e.into()),
        }
    }

    /// Delete this table's saved state.
    pub fn forget_saved_state(&self) -> Result<()> {
        self.store.clear_persisted()?;
        Ok(())
    }

    /// Animation frame.
    ///
    /// Rebuilds the pipeline if requested, recomputes the range for pending
    /// scroll or resize events, asks the loader for unloaded rows in range
    /// and settles keyboard focus. Returns `true` when the render window
    /// changed.
    pub fn on_frame(&mut self, now: Instant) -> bool {
        let mut changed = false;
        if self.frames.take().is_some() {
            self.rebuild(now);
            changed = true;
        }
        if self.virtualizer.on_frame(&self.viewport, now).is_some() {
            changed = true;
        }
        if changed {
            self.request_visible(now);
        }

        let ctx = FocusContext {
            heights: self.virtualizer.heights(),
            tab_count: self.tab_count(),
            scroll_offset: self.viewport.scroll_offset,
            viewport_size: self.viewport.viewport_size,
        };
        if let Some(change) = self.focus.poll(now, &ctx) {
            self.store.dispatch(Command::SetFocusedCell(Some(change.cell)));
            changed = true;
        }
        changed
    }

    /// The scroll container moved.
    pub fn on_scroll(&mut self, scroll_offset: u32, now: Instant) {
        self.viewport.scroll_offset = scroll_offset;
        self.virtualizer.on_scroll(now);
        self.focus.on_scroll(now);
    }

    /// The scroll container changed height.
    pub fn on_resize(&mut self, viewport_size: u32) {
        self.viewport.viewport_size = viewport_size;
        self.virtualizer.on_resize();
    }

    /// Keyboard input. Returns the focus change for the host to apply.
    pub fn handle_key(&mut self, event: KeyEvent) -> Option<FocusChange> {
        let ctx = FocusContext {
            heights: self.virtualizer.heights(),
            tab_count: self.tab_count(),
            scroll_offset: self.viewport.scroll_offset,
            viewport_size: self.viewport.viewport_size,
        };
        let change = self.focus.handle_key(event, &ctx)?;
        self.store.dispatch(Command::SetFocusedCell(Some(change.cell)));
        Some(change)
    }

    /// Scroll offset that reveals displayed row `index`, if it is not fully
    /// visible.
    #[must_use]
    pub fn scroll_to_row(&self, index: usize) -> Option<u32> {
        self.virtualizer.scroll_offset_to_reveal(index, &self.viewport)
    }

    // ── Header interactions ─────────────────────────────────────────────

    /// Header click: sort by `column`, flipping direction if already sorted.
    pub fn toggle_sort(&mut self, column: &str, now: Instant) {
        let next = SortState::cycle(self.store.state().sort.as_ref(), column);
        self.dispatch(Command::SetSort(Some(next)), now);
    }

    /// Sort the children of group `parent` by `column`.
    pub fn toggle_leaf_sort(&mut self, parent: RowId, column: &str, now: Instant) {
        let next = SortState::cycle(self.store.state().leaf_sorts.get(&parent), column);
        self.dispatch(
            Command::SetLeafSort {
                parent,
                sort: Some(next),
            },
            now,
        );
    }

    /// Drop column `dragged` onto column `target`. Returns `false` for
    /// unknown columns.
    pub fn move_column(&mut self, dragged: &str, target: &str, now: Instant) -> bool {
        let order = self.layout.ordered_columns(&self.store.state().column_order);
        match reorder(&order, dragged, target) {
            Some(next) => {
                self.dispatch(Command::SetColumnOrder(next), now);
                true
            }
            None => false,
        }
    }

    /// Start resizing `column` from pointer x position `x`.
    pub fn begin_column_resize(&mut self, column: &str, x: i32, now: Instant) {
        let state = self.store.state();
        let width = self.layout.column_width(column, &state.column_widths, None);
        let preview = self.column_drag.begin(column.to_owned(), x, width);
        self.dispatch(Command::SetColumnResize(Some(preview)), now);
    }

    /// Pointer moved during a column resize.
    pub fn update_column_resize(&mut self, x: i32, now: Instant) {
        if let Some(preview) = self.column_drag.update(x) {
            self.dispatch(Command::SetColumnResize(Some(preview)), now);
        }
    }

    /// Pointer released: commit the previewed width.
    pub fn finish_column_resize(&mut self, now: Instant) {
        if let Some(preview) = self.column_drag.finish() {
            self.dispatch(
                Command::CommitColumnWidth {
                    column: preview.key,
                    width: preview.size,
                },
                now,
            );
        }
    }

    /// Abandon a column resize.
    pub fn cancel_column_resize(&mut self, now: Instant) {
        self.column_drag.cancel();
        self.dispatch(Command::SetColumnResize(None), now);
    }

    /// Start resizing displayed row `index` from pointer y position `y`.
    ///
    /// Returns `false` for placeholders and out-of-range indices.
    pub fn begin_row_resize(&mut self, index: usize, y: i32, now: Instant) -> bool {
        let Some(row) = self.row_at(index) else {
            return false;
        };
        let key = self.row_key.key_of(row);
        let height = self.heights.get(index).copied().unwrap_or_default();
        let preview = self.row_drag.begin(key, y, height);
        self.dispatch(Command::SetRowResize(Some(preview)), now);
        true
    }

    /// Pointer moved during a row resize.
    pub fn update_row_resize(&mut self, y: i32, now: Instant) {
        if let Some(preview) = self.row_drag.update(y) {
            self.dispatch(Command::SetRowResize(Some(preview)), now);
        }
    }

    /// Pointer released: commit the previewed height.
    pub fn finish_row_resize(&mut self, now: Instant) {
        if let Some(preview) = self.row_drag.finish() {
            self.dispatch(
                Command::CommitRowHeights(HashMap::from([(preview.key, preview.size)])),
                now,
            );
        }
    }

    /// Abandon a row resize.
    pub fn cancel_row_resize(&mut self, now: Instant) {
        self.row_drag.cancel();
        self.dispatch(Command::SetRowResize(None), now);
    }

    // ── Pipeline ────────────────────────────────────────────────────────

    fn rebuild(&mut self, now: Instant) {
        let revisions = self.store.revisions();
        let window = self.loader.window();
        let data_key = (window.version(), revisions.filters);
        if self.data_key != Some(data_key) {
            self.data_key = Some(data_key);
            self.rows_version += 1;
        }

        let state = self.store.state();
        let complete = window.is_complete();
        self.display = if complete {
            arrange_complete(
                window,
                state,
                &mut self.sort_cache,
                self.rows_version,
                revisions.sort,
            )
        } else {
            arrange_partial(window, state)
        };

        let inputs = HeightInputs {
            overrides: &state.row_heights,
            preview: state.row_resize.as_ref(),
            expanded: &state.expanded_rows,
        };
        let default_height = self.resolver.config().default_height;
        self.heights = self
            .display
            .iter()
            .map(|d| match slot_row(window, *d) {
                Some(row) => self.resolver.height_of(&self.row_key.key_of(row), &inputs),
                None => default_height,
            })
            .collect();
        self.virtualizer
            .set_heights(&self.heights, &self.viewport, now);

        let placeholder = Row::new("$loading");
        let rows: Vec<&Row> = self
            .display
            .iter()
            .map(|d| slot_row(window, *d).unwrap_or(&placeholder))
            .collect();
        let pinned: HashSet<RowId> = state
            .drilldowns
            .union(&state.expanded_levels)
            .cloned()
            .collect();
        self.sticky.set_rows(&rows, self.virtualizer.heights(), &pinned);

        tracing::debug!(
            rows = self.display.len(),
            complete,
            revision = revisions.global,
            "rebuilt grid pipeline"
        );
    }

    fn request_visible(&mut self, now: Instant) {
        if self.display.is_empty() {
            return;
        }
        let range = self.virtualizer.range();
        let end = range.end_index.min(self.display.len() - 1);
        if range.start_index > end {
            return;
        }
        let mut missing = self.display[range.start_index..=end]
            .iter()
            .filter(|d| matches!(d, DisplaySlot::Placeholder(_)))
            .map(|d| d.slot());
        let Some(first) = missing.next() else {
            return;
        };
        let last = missing.last().unwrap_or(first);
        self.loader.ensure_loaded(first, last, now);
    }

    // ── Rendering ───────────────────────────────────────────────────────

    /// Snapshot of the mounted rows and columns.
    #[must_use]
    pub fn render_window(&self) -> RenderWindow<'_> {
        let state = self.store.state();
        let window = self.loader.window();
        let range = self.virtualizer.range();

        let names = self
            .layout
            .displayed_columns(&state.column_order, &state.column_visibility);
        let width = |c: &str| {
            self.layout
                .column_width(c, &state.column_widths, state.column_resize.as_ref())
        };
        let offsets = sticky_offsets(&names, &state.sticky_columns, width);
        let columns: Vec<RenderColumn> = names
            .iter()
            .map(|name| RenderColumn {
                name: name.clone(),
                width: width(name),
                sticky: offsets.get(name),
                sort: state
                    .sort
                    .as_ref()
                    .filter(|s| s.column == *name)
                    .map(|s| s.sort),
            })
            .collect();

        let mounted = range.start_index..(range.end_index + 1).min(self.display.len());
        let heights = self.virtualizer.heights();
        let rows = mounted
            .map(|index| {
                let row = slot_row(window, self.display[index]);
                let key = row.map(|r| self.row_key.key_of(r));
                let contains = |set: &HashSet<RowId>| key.as_ref().is_some_and(|k| set.contains(k));
                RenderRow {
                    index,
                    row,
                    top: heights.offset_of(index),
                    height: heights.height(index),
                    selected: contains(&state.selected_rows),
                    expanded: contains(&state.expanded_rows),
                    drilled_down: row
                        .is_some_and(|r| r.is_group_root && state.drilldowns.contains(&r.id)),
                    focused_tab: state
                        .focused_cell
                        .filter(|c| c.row_index == index)
                        .map(|c| c.tab_index),
                    cells: row
                        .map(|r| format_row(r, &names, state))
                        .unwrap_or_default(),
                    key,
                }
            })
            .collect();

        RenderWindow {
            rows,
            columns,
            range,
            padding_top: range.padding_top,
            padding_bottom: range.padding_bottom,
            total_height: self.virtualizer.total_height(),
            total_width: self.layout.total_width(
                &names,
                &state.column_widths,
                state.column_resize.as_ref(),
            ),
            sticky_headers: self.sticky.on_scroll(self.viewport.scroll_offset),
            row_count: self.display.len(),
            loading: state.loading,
        }
    }
}

impl<S> std::fmt::Debug for GridView<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GridView")
            .field("store", &self.store)
            .field("rows", &self.display.len())
            .field("range", &self.virtualizer.range())
            .field("viewport", &self.viewport)
            .finish()
    }
}

fn slot_row(window: &LoadedWindow, slot: DisplaySlot) -> Option<&Row> {
    match slot {
        DisplaySlot::Loaded(i) => window.row(i),
        DisplaySlot::Placeholder(_) => None,
    }
}

fn format_row(row: &Row, columns: &[String], state: &TableState) -> Vec<FormattedCell> {
    columns
        .iter()
        .map(|c| {
            let value = row.value(c).unwrap_or_default();
            format_cell(&value, state.cell_formatting.get(c))
        })
        .collect()
}

/// Filter, sort and drill-down over a fully loaded window.
fn arrange_complete(
    window: &LoadedWindow,
    state: &TableState,
    cache: &mut SortCache,
    rows_version: u64,
    sort_revision: u64,
) -> Vec<DisplaySlot> {
    let rows: Vec<&Row> = window.loaded_rows().collect();
    let kept = filter_indices(&rows, &state.filters);
    let filtered: Vec<&Row> = kept.iter().map(|&i| rows[i]).collect();
    let order = cache.get_or_compute(
        rows_version,
        sort_revision,
        &filtered,
        state.sort.as_ref(),
        &state.leaf_sorts,
    );
    visible_indices(&filtered, &order, &state.drilldowns)
        .into_iter()
        .map(|i| DisplaySlot::Loaded(kept[i]))
        .collect()
}

/// Server order with placeholders for unloaded slots.
///
/// Loaded rows whose ancestors are not all open are dropped, including
/// ancestors that have not been loaded yet.
fn arrange_partial(window: &LoadedWindow, state: &TableState) -> Vec<DisplaySlot> {
    let loaded: Vec<(usize, &Row)> = window
        .slots()
        .iter()
        .enumerate()
        .filter_map(|(i, s)| s.row().map(|r| (i, r)))
        .collect();
    let rows: Vec<&Row> = loaded.iter().map(|(_, r)| *r).collect();
    let identity: Vec<usize> = (0..rows.len()).collect();
    let shown: HashSet<usize> = visible_indices_partial(&rows, &identity, &state.drilldowns)
        .into_iter()
        .map(|i| loaded[i].0)
        .collect();

    window
        .slots()
        .iter()
        .enumerate()
        .filter_map(|(i, slot)| match slot {
            Slot::NotLoaded => Some(DisplaySlot::Placeholder(i)),
            Slot::Loaded(_) => shown.contains(&i).then_some(DisplaySlot::Loaded(i)),
        })
        .collect()
}
