//! End-to-end pipeline tests: load, render, sort, group, focus, resize.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::executor::block_on;
use vgrid::prelude::*;
use vgrid::{
    Concern, ConditionOperator, Error, Filter, LoaderConfig, MemoryStorage, SortDirection,
    StoreConfig, VirtualizerConfig,
};

const MS: Duration = Duration::from_millis(1);

// ============================================================================
// Fixtures
// ============================================================================

/// Serves a fixed row set page by page.
struct VecSource {
    rows: Vec<Row>,
    fail: bool,
}

impl VecSource {
    fn new(rows: Vec<Row>) -> Self {
        Self {
            rows,
            fail: false,
        }
    }

    fn numbered(total: usize) -> Self {
        Self::new(
            (0..total)
                .map(|i| {
                    Row::new(i as i64)
                        .with("name", format!("row {i:03}"))
                        .with("score", (i % 7) as i64)
                })
                .collect(),
        )
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(Vec::new())
        }
    }
}

impl DataSource for VecSource {
    async fn load_page(&self, request: PageRequest) -> std::result::Result<Page, FetchError> {
        if self.fail {
            return Err(FetchError::Rejected("quota exceeded".into()));
        }
        let end = request.end().min(self.rows.len());
        let start = request.offset.min(end);
        Ok(Page {
            rows: self.rows[start..end].to_vec(),
            total: self.rows.len(),
        })
    }
}

fn config() -> GridConfig {
    GridConfig::default()
        .with_loader(
            LoaderConfig::default()
                .with_debounce(10 * MS)
                .with_page_limit(50),
        )
        .with_virtualizer(VirtualizerConfig::default().with_buffer(5))
}

/// Start `view`, fetch the first page and render it. Returns the time after.
fn boot<S: DataSource>(view: &mut GridView<S>, t0: Instant) -> Instant {
    view.on_resize(640);
    view.start(t0);
    view.on_frame(t0);
    let fetched = block_on(view.fetch_due(t0 + 10 * MS)).expect("first page");
    assert!(fetched);
    let t1 = t0 + 20 * MS;
    assert!(view.on_frame(t1));
    t1
}

fn ids(window: &RenderWindow<'_>) -> Vec<RowId> {
    window
        .rows
        .iter()
        .filter_map(|r| r.row.map(|row| row.id.clone()))
        .collect()
}

fn grouped() -> Vec<Row> {
    vec![
        Row::new(1).group_root("team").with("name", "alpha"),
        Row::new(2).with_parents([1]).with("name", "ann"),
        Row::new(3).with_parents([1]).with("name", "bob"),
        Row::new(4).group_root("team").with("name", "beta"),
        Row::new(5).with_parents([4]).with("name", "cat"),
        Row::new(6).with("name", "solo"),
    ]
}

// ============================================================================
// Loading
// ============================================================================

#[test]
fn first_page_renders_with_placeholders_for_the_rest() {
    let t0 = Instant::now();
    let mut view = GridView::new(["id", "name", "score"], VecSource::numbered(100), config());
    boot(&mut view, t0);

    assert_eq!(view.row_count(), 100);
    assert!(view.row_at(49).is_some());
    assert!(view.row_at(50).is_none());
    assert_eq!(view.row_heights().len(), 100);

    let window = view.render_window();
    assert_eq!(window.range.start_index, 0);
    assert!(window.range.end_index >= 9);
    assert_eq!(window.total_height, 100 * 64);
    assert_eq!(window.total_width, 3 * 250);
    assert!(!window.loading);

    let first = &window.rows[0];
    assert_eq!(first.top, 0);
    assert_eq!(first.height, 64);
    assert_eq!(first.cells.len(), 3);
    assert_eq!(first.cells[1].text, "row 000");
    assert_eq!(first.cells[2].text, "0");
}

#[test]
fn scrolling_into_placeholders_fetches_them() {
    let t0 = Instant::now();
    let mut view = GridView::new(["id", "name", "score"], VecSource::numbered(100), config());
    let t1 = boot(&mut view, t0);

    let t2 = t1 + 100 * MS;
    view.on_scroll(60 * 64, t2);
    assert!(view.on_frame(t2));
    assert!(view.range().contains(60));
    assert!(view.render_window().rows.iter().any(|r| r.row.is_none()));

    assert!(block_on(view.fetch_due(t2 + 10 * MS)).expect("second page"));
    view.on_frame(t2 + 20 * MS);
    assert!(view.row_at(60).is_some());
    assert!(!view.window().is_complete());
}

#[test]
fn failed_fetch_surfaces_load_error() {
    let t0 = Instant::now();
    let mut view = GridView::new(["id", "name"], VecSource::failing(), config());
    view.start(t0);
    view.on_frame(t0);

    let err = block_on(view.fetch_due(t0 + 10 * MS)).unwrap_err();
    assert!(matches!(err, Error::Load(_)));
    assert!(!view.state().loading);
    assert_eq!(view.row_count(), 0);
}

// ============================================================================
// Sort, filter, groups
// ============================================================================

#[test]
fn header_click_cycles_sort_direction() {
    let t0 = Instant::now();
    let rows = vec![
        Row::new(1).with("score", 3),
        Row::new(2).with("score", 1),
        Row::new(3).with("score", 2),
    ];
    let mut view = GridView::new(["id", "score"], VecSource::new(rows), config());
    let t1 = boot(&mut view, t0);
    assert!(view.window().is_complete());

    view.toggle_sort("score", t1);
    view.on_frame(t1);
    let window = view.render_window();
    assert_eq!(ids(&window), vec![RowId::from(2), RowId::from(3), RowId::from(1)]);
    let score = window.columns.iter().find(|c| c.name == "score").unwrap();
    assert_eq!(score.sort, Some(SortDirection::Asc));

    view.toggle_sort("score", t1);
    view.on_frame(t1);
    assert_eq!(
        ids(&view.render_window()),
        vec![RowId::from(1), RowId::from(3), RowId::from(2)]
    );
}

#[test]
fn filters_drop_rows_once_complete() {
    let t0 = Instant::now();
    let mut view = GridView::new(["id", "name", "score"], VecSource::numbered(14), config());
    let t1 = boot(&mut view, t0);

    view.dispatch(
        Command::SetFilters(vec![Filter::new("score", ConditionOperator::GreaterThan, 4)]),
        t1,
    );
    view.on_frame(t1);
    // Scores 5 and 6 appear twice each in 0..14.
    assert_eq!(view.row_count(), 4);
    assert_eq!(view.render_window().total_height, 4 * 64);
}

#[test]
fn drilldown_reveals_children_under_their_root() {
    let t0 = Instant::now();
    let mut view = GridView::new(["id", "name"], VecSource::new(grouped()), config());
    let t1 = boot(&mut view, t0);
    assert_eq!(
        ids(&view.render_window()),
        vec![RowId::from(1), RowId::from(4), RowId::from(6)]
    );

    let concern = view.dispatch(Command::ToggleDrilldown(RowId::from(1)), t1);
    assert!(concern.contains(Concern::GROUPS));
    assert!(view.wants_frame(t1));
    view.on_frame(t1);

    let window = view.render_window();
    assert_eq!(
        ids(&window),
        vec![
            RowId::from(1),
            RowId::from(2),
            RowId::from(3),
            RowId::from(4),
            RowId::from(6)
        ]
    );
    assert!(window.rows[0].drilled_down);
    assert!(!window.rows[3].drilled_down);
}

#[test]
fn open_group_header_sticks_while_its_children_scroll() {
    let t0 = Instant::now();
    let mut rows = vec![Row::new(0).group_root("team").with("name", "big")];
    rows.extend((1..30).map(|i| Row::new(i).with_parents([0])));
    let mut view = GridView::new(["id", "name"], VecSource::new(rows), config());
    let t1 = boot(&mut view, t0);
    view.dispatch(Command::ToggleDrilldown(RowId::from(0)), t1);
    view.on_frame(t1);

    let t2 = t1 + 100 * MS;
    view.on_scroll(10 * 64, t2);
    view.on_frame(t2);
    let headers = view.render_window().sticky_headers;
    assert_eq!(headers.len(), 1);
    assert_eq!(headers[0].row_id, RowId::from(0));
}

#[test]
fn children_of_an_unloaded_root_stay_hidden_until_it_opens() {
    let t0 = Instant::now();
    let mut rows: Vec<Row> = (0..50).map(Row::new).collect();
    rows.push(Row::new(50).group_root("team"));
    rows.extend((51..100).map(|i| Row::new(i).with_parents([50])));
    let mut view = GridView::new(["id", "name"], VecSource::new(rows), config());
    let t1 = boot(&mut view, t0);

    let t2 = t1 + 100 * MS;
    view.on_scroll(90 * 64, t2);
    view.on_frame(t2);
    assert!(block_on(view.fetch_due(t2 + 10 * MS)).expect("tail page"));
    view.on_frame(t2 + 20 * MS);
    assert!(view.window().row(99).is_some());
    assert!(view.window().row(50).is_none());

    let count = view.row_count();
    assert!(count < 100);
    assert!(
        (0..count)
            .filter_map(|i| view.row_at(i))
            .all(|row| row.parent_id.is_empty())
    );

    let t3 = t2 + 30 * MS;
    view.dispatch(Command::ToggleDrilldown(RowId::from(50)), t3);
    view.on_frame(t3);
    assert_eq!(view.row_count(), 100);
    assert_eq!(view.row_at(99).map(|r| r.id.clone()), Some(RowId::from(99)));
}

#[test]
fn expanded_group_pins_its_header_without_revealing_children() {
    let t0 = Instant::now();
    let mut rows = vec![Row::new(0).group_root("team").with("name", "big")];
    rows.extend((1..30).map(|i| Row::new(i).with_parents([0])));
    rows.extend((30..60).map(Row::new));
    let mut view = GridView::new(["id", "name"], VecSource::new(rows), config());
    let t1 = boot(&mut view, t0);
    assert!(view.window().is_complete());

    let t2 = t1 + 100 * MS;
    view.on_scroll(32, t2);
    view.on_frame(t2);
    assert!(view.render_window().sticky_headers.is_empty());

    let concern = view.dispatch(
        Command::SetExpandedLevels([RowId::from(0)].into_iter().collect()),
        t2,
    );
    assert!(concern.contains(Concern::GROUPS));
    view.on_frame(t2);
    assert_eq!(view.row_count(), 31);
    assert!(view.state().drilldowns.is_empty());

    let headers = view.render_window().sticky_headers;
    assert_eq!(headers.len(), 1);
    assert_eq!(headers[0].row_id, RowId::from(0));
}

// ============================================================================
// Focus
// ============================================================================

#[test]
fn arrow_keys_move_focus_through_rows_and_tabs() {
    let t0 = Instant::now();
    let mut view = GridView::new(
        ["id", "name", "score"],
        VecSource::numbered(20),
        config().with_fixed_tab_stops(1),
    );
    boot(&mut view, t0);
    assert_eq!(view.tab_count(), 4);

    let change = view.handle_key(KeyEvent::new(KeyCode::Down)).unwrap();
    assert_eq!(change.cell.row_index, 1);
    view.handle_key(KeyEvent::new(KeyCode::Tab));
    let change = view.handle_key(KeyEvent::new(KeyCode::End)).unwrap();
    assert_eq!(change.cell.row_index, 19);
    assert_eq!(change.cell.tab_index, 1);
    assert_eq!(view.state().focused_cell, Some(change.cell));
    // Row 19 sits below a 640px viewport.
    assert_eq!(change.scroll_to, Some(20 * 64 - 640));
}

#[test]
fn focused_row_reports_its_tab() {
    let t0 = Instant::now();
    let mut view = GridView::new(["id", "name"], VecSource::numbered(5), config());
    boot(&mut view, t0);

    view.handle_key(KeyEvent::new(KeyCode::Down));
    let window = view.render_window();
    assert_eq!(window.rows[0].focused_tab, None);
    assert_eq!(window.rows[1].focused_tab, Some(0));
}

// ============================================================================
// Columns and resizing
// ============================================================================

#[test]
fn column_resize_previews_then_commits() {
    let t0 = Instant::now();
    let mut view = GridView::new(["id", "name"], VecSource::numbered(3), config());
    let t1 = boot(&mut view, t0);

    view.begin_column_resize("name", 100, t1);
    view.update_column_resize(140, t1);
    let name_width = |view: &GridView<VecSource>| {
        view.render_window()
            .columns
            .iter()
            .find(|c| c.name == "name")
            .map(|c| c.width)
    };
    assert_eq!(name_width(&view), Some(290));
    assert_eq!(view.state().column_widths.get("name"), Some(&250));

    view.finish_column_resize(t1);
    assert_eq!(view.state().column_resize, None);
    assert_eq!(view.state().column_widths.get("name"), Some(&290));
    assert_eq!(name_width(&view), Some(290));
}

#[test]
fn cancelled_column_resize_keeps_width() {
    let t0 = Instant::now();
    let mut view = GridView::new(["id", "name"], VecSource::numbered(3), config());
    let t1 = boot(&mut view, t0);

    view.begin_column_resize("name", 0, t1);
    view.update_column_resize(-500, t1);
    view.cancel_column_resize(t1);
    assert_eq!(view.state().column_resize, None);
    assert_eq!(view.state().column_widths.get("name"), Some(&250));
}

#[test]
fn row_resize_commits_height_override() {
    let t0 = Instant::now();
    let mut view = GridView::new(["id", "name"], VecSource::numbered(3), config());
    let t1 = boot(&mut view, t0);

    assert!(view.begin_row_resize(0, 10, t1));
    view.update_row_resize(40, t1);
    view.on_frame(t1);
    assert_eq!(view.row_heights()[0], 94);

    view.finish_row_resize(t1);
    view.on_frame(t1);
    assert_eq!(view.state().row_heights.get(&RowId::from(0)), Some(&94));
    assert_eq!(view.row_heights()[0], 94);
    assert_eq!(view.render_window().rows[1].top, 94);
}

#[test]
fn placeholder_rows_cannot_be_resized() {
    let t0 = Instant::now();
    let mut view = GridView::new(["id"], VecSource::numbered(80), config());
    let t1 = boot(&mut view, t0);
    assert!(!view.begin_row_resize(70, 0, t1));
    assert!(!view.begin_row_resize(500, 0, t1));
}

#[test]
fn dropping_a_column_reorders_headers() {
    let t0 = Instant::now();
    let mut view = GridView::new(["id", "name", "score"], VecSource::numbered(3), config());
    let t1 = boot(&mut view, t0);

    assert!(view.move_column("score", "id", t1));
    let names: Vec<_> = view
        .render_window()
        .columns
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, vec!["score", "id", "name"]);
    assert!(!view.move_column("missing", "id", t1));
}

// ============================================================================
// Persistence
// ============================================================================

#[test]
fn sort_survives_a_remount() {
    let storage = Arc::new(MemoryStorage::new());
    let config = config().with_store(StoreConfig::default().with_table_id("orders"));
    let t0 = Instant::now();

    let mut first = GridView::with_storage(
        ["id", "score"],
        VecSource::numbered(3),
        config.clone(),
        storage.clone(),
    );
    first.toggle_sort("score", t0);

    let second = GridView::with_storage(
        ["id", "score"],
        VecSource::numbered(3),
        config.clone(),
        storage.clone(),
    );
    assert_eq!(second.state().sort, Some(SortState::asc("score")));

    second.forget_saved_state().unwrap();
    let third = GridView::with_storage(["id", "score"], VecSource::numbered(3), config, storage);
    assert_eq!(third.state().sort, None);
}
