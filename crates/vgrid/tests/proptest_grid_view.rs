//! Property-based invariants of the assembled pipeline.
//!
//! 1. The mounted rows are a contiguous run inside the displayed rows.
//! 2. Paddings plus mounted heights account for every pixel.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use futures::executor::block_on;
use proptest::prelude::*;
use vgrid::prelude::*;
use vgrid::{LoaderConfig, VirtualizerConfig};

const MS: Duration = Duration::from_millis(1);

struct AllRows(Vec<Row>);

impl DataSource for AllRows {
    async fn load_page(&self, request: PageRequest) -> std::result::Result<Page, FetchError> {
        let end = request.end().min(self.0.len());
        let start = request.offset.min(end);
        Ok(Page {
            rows: self.0[start..end].to_vec(),
            total: self.0.len(),
        })
    }
}

fn loaded_view(total: usize, viewport: u32, buffer: usize) -> (GridView<AllRows>, Instant) {
    let rows = (0..total).map(|i| Row::new(i as i64).with("n", i as i64)).collect();
    let config = GridConfig::default()
        .with_loader(
            LoaderConfig::default()
                .with_debounce(10 * MS)
                .with_page_limit(500),
        )
        .with_virtualizer(VirtualizerConfig::default().with_buffer(buffer));
    let mut view = GridView::new(["id", "n"], AllRows(rows), config);
    let t0 = Instant::now();
    view.on_resize(viewport);
    view.start(t0);
    view.on_frame(t0);
    block_on(view.fetch_due(t0 + 10 * MS)).expect("single page");
    let t1 = t0 + 20 * MS;
    view.on_frame(t1);
    (view, t1)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn mounted_rows_account_for_total_height(
        heights in prop::collection::vec(20u32..=300, 1..150),
        scroll_frac in 0.0f64..=1.0,
        viewport in 50u32..1_200,
        buffer in 0usize..6,
    ) {
        let (mut view, t1) = loaded_view(heights.len(), viewport, buffer);
        prop_assert!(view.window().is_complete());

        let overrides: HashMap<RowId, u32> = heights
            .iter()
            .enumerate()
            .map(|(i, &h)| (RowId::from(i as i64), h))
            .collect();
        view.dispatch(Command::CommitRowHeights(overrides), t1);
        let t2 = t1 + 100 * MS;
        let total: u32 = heights.iter().sum();
        view.on_scroll((f64::from(total) * scroll_frac) as u32, t2);
        view.on_frame(t2);

        let window = view.render_window();
        prop_assert_eq!(window.row_count, heights.len());
        prop_assert_eq!(window.total_height, total);
        prop_assert!(window.range.end_index < window.row_count);
        prop_assert!(!window.rows.is_empty());

        for (offset, row) in window.rows.iter().enumerate() {
            prop_assert_eq!(row.index, window.range.start_index + offset);
            prop_assert_eq!(row.height, heights[row.index]);
        }
        let mounted: u32 = window.rows.iter().map(|r| r.height).sum();
        prop_assert_eq!(window.padding_top + mounted + window.padding_bottom, total);
    }
}
