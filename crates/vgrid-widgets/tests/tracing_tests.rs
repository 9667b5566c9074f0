#![forbid(unsafe_code)]

//! Tracing span instrumentation tests.
//!
//! Spans enabled:
//!   cargo test -p vgrid-widgets --features tracing --test tracing_tests
//!
//! Zero-overhead verification (no feature):
//!   cargo test -p vgrid-widgets --test tracing_tests -- zero_overhead

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use vgrid_core::{Row, SortState};
use vgrid_widgets::fenwick::HeightIndex;
use vgrid_widgets::sort::{LeafSorts, sort_order};
use vgrid_widgets::virtualizer::compute_range;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;

// ============================================================================
// Test Infrastructure
// ============================================================================

#[derive(Debug, Clone)]
#[allow(dead_code)]
struct CapturedSpan {
    name: String,
    fields: HashMap<String, String>,
}

struct SpanCapture {
    spans: Arc<Mutex<Vec<CapturedSpan>>>,
}

struct FieldVisitor(Vec<(String, String)>);

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.push((field.name().to_string(), format!("{value:?}")));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.push((field.name().to_string(), value.to_string()));
    }
}

impl<S> tracing_subscriber::Layer<S> for SpanCapture
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(
        &self,
        attrs: &tracing::span::Attributes<'_>,
        _id: &tracing::span::Id,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let mut visitor = FieldVisitor(Vec::new());
        attrs.record(&mut visitor);
        self.spans.lock().unwrap().push(CapturedSpan {
            name: attrs.metadata().name().to_string(),
            fields: visitor.0.into_iter().collect(),
        });
    }
}

fn with_captured_spans<F>(f: F) -> Vec<CapturedSpan>
where
    F: FnOnce(),
{
    let spans = Arc::new(Mutex::new(Vec::new()));
    let layer = SpanCapture {
        spans: spans.clone(),
    };
    let subscriber = tracing_subscriber::registry().with(layer);
    tracing::subscriber::with_default(subscriber, f);
    let captured = spans.lock().unwrap().clone();
    captured
}

fn exercise() {
    let rows: Vec<Row> = (0..10).map(|i| Row::new(i).with("v", 10 - i)).collect();
    let _ = sort_order(&rows, Some(&SortState::asc("v")), &LeafSorts::new());
    let heights = HeightIndex::from_heights(&[20; 10]);
    let _ = compute_range(&heights, 40, 100, 2);
}

// ============================================================================
// Tests
// ============================================================================

#[test]
#[cfg(feature = "tracing")]
fn spans_cover_sort_and_range() {
    let spans = with_captured_spans(exercise);

    let sort = spans
        .iter()
        .find(|s| s.name == "grid_sort")
        .expect("grid_sort span");
    assert_eq!(sort.fields.get("rows").map(String::as_str), Some("10"));

    let range = spans
        .iter()
        .find(|s| s.name == "virtual_range")
        .expect("virtual_range span");
    assert_eq!(range.fields.get("scroll_offset").map(String::as_str), Some("40"));
    assert_eq!(range.fields.get("items").map(String::as_str), Some("10"));
}

#[test]
#[cfg(not(feature = "tracing"))]
fn zero_overhead_without_feature() {
    let spans = with_captured_spans(exercise);
    assert!(
        spans.is_empty(),
        "no spans expected without the tracing feature, got {spans:?}"
    );
}
