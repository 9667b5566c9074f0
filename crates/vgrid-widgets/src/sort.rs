//! Hierarchical sorting of flattened group rows.
//!
//! Rows arrive as a pre-order flattening of a forest. Sorting rebuilds the
//! forest from each row's immediate parent, orders every sibling list, and
//! flattens again:
//!
//! - top-level siblings follow the root sort,
//! - the direct children of group `g` follow the leaf sort stored for `g`,
//! - siblings without a sort keep their input order.
//!
//! The sort is stable, so sorting an already sorted sequence is a no-op.
//!
//! # Value ordering
//!
//! Two texts compare case-insensitively, ties broken by exact comparison.
//! Null, booleans and numbers compare numerically (null as 0, booleans as
//! 0/1). When siblings mix text and numeric values, numeric values come first.
//!
//! # Malformed grouping
//!
//! A row whose immediate parent is absent is treated as top-level. Rows only
//! reachable through a parent cycle are appended at the end, in input order.
//! No row is ever dropped.

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use vgrid_core::{CellValue, Row, RowId, SortDirection, SortState};

/// Leaf sorts keyed by the id of the group whose children they order.
pub type LeafSorts = HashMap<RowId, SortState>;

/// Total order over cell values used for sorting.
#[must_use]
pub fn compare_values(a: &CellValue, b: &CellValue) -> Ordering {
    match (a, b) {
        (CellValue::Text(x), CellValue::Text(y)) => collate(x, y),
        (CellValue::Text(_), _) => Ordering::Greater,
        (_, CellValue::Text(_)) => Ordering::Less,
        _ => {
            let x = a.to_number().unwrap_or(0.0);
            let y = b.to_number().unwrap_or(0.0);
            x.total_cmp(&y)
        }
    }
}

fn collate(a: &str, b: &str) -> Ordering {
    let folded = a
        .chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase));
    folded.then_with(|| a.cmp(b))
}

#[inline]
fn as_row<R: Borrow<Row>>(r: &R) -> &Row {
    r.borrow()
}

fn compare_rows(a: &Row, b: &Row, sort: &SortState) -> Ordering {
    let null = CellValue::Null;
    let lhs = a.value(&sort.column);
    let rhs = b.value(&sort.column);
    let ord = compare_values(
        lhs.as_deref().unwrap_or(&null),
        rhs.as_deref().unwrap_or(&null),
    );
    match sort.sort {
        SortDirection::Asc => ord,
        SortDirection::Desc => ord.reverse(),
    }
}

/// Compute the display permutation of `rows`.
///
/// The result lists every input index exactly once.
#[must_use]
pub fn sort_order<R: Borrow<Row>>(
    rows: &[R],
    sort: Option<&SortState>,
    leaf_sorts: &LeafSorts,
) -> Vec<usize> {
    #[cfg(feature = "tracing")]
    let _span = tracing::debug_span!(
        "grid_sort",
        rows = rows.len(),
        leaf_sorts = leaf_sorts.len()
    )
    .entered();

    let present: HashMap<&RowId, usize> = rows
        .iter()
        .enumerate()
        .map(|(i, r)| (&as_row(r).id, i))
        .collect();

    let mut roots = Vec::new();
    let mut children: HashMap<&RowId, Vec<usize>> = HashMap::new();
    for (i, row) in rows.iter().enumerate() {
        match as_row(row).immediate_parent() {
            Some(parent) if present.contains_key(parent) => {
                children.entry(parent).or_default().push(i);
            }
            _ => roots.push(i),
        }
    }

    sort_siblings(&mut roots, rows, sort);

    let mut order = Vec::with_capacity(rows.len());
    let mut emitted = vec![false; rows.len()];
    for &root in &roots {
        emit_subtree(root, rows, leaf_sorts, &mut children, &mut emitted, &mut order);
    }
    for i in 0..rows.len() {
        if !emitted[i] {
            emit_subtree(i, rows, leaf_sorts, &mut children, &mut emitted, &mut order);
        }
    }

    order
}

fn sort_siblings<R: Borrow<Row>>(siblings: &mut [usize], rows: &[R], by: Option<&SortState>) {
    if let Some(by) = by {
        siblings.sort_by(|&a, &b| compare_rows(as_row(&rows[a]), as_row(&rows[b]), by));
    }
}

/// Pre-order walk from `start`, emitting each row once.
fn emit_subtree<R: Borrow<Row>>(
    start: usize,
    rows: &[R],
    leaf_sorts: &LeafSorts,
    children: &mut HashMap<&RowId, Vec<usize>>,
    emitted: &mut [bool],
    order: &mut Vec<usize>,
) {
    let mut stack = vec![start];
    while let Some(i) = stack.pop() {
        if emitted[i] {
            continue;
        }
        emitted[i] = true;
        order.push(i);
        let id = &as_row(&rows[i]).id;
        if let Some(mut kids) = children.remove(id) {
            sort_siblings(&mut kids, rows, leaf_sorts.get(id));
            stack.extend(kids.into_iter().rev());
        }
    }
}

/// Sort `rows` into a new vector.
#[must_use]
pub fn sort_rows<R: Borrow<Row>>(
    rows: &[R],
    sort: Option<&SortState>,
    leaf_sorts: &LeafSorts,
) -> Vec<Row> {
    sort_order(rows, sort, leaf_sorts)
        .into_iter()
        .map(|i| as_row(&rows[i]).clone())
        .collect()
}

/// Memoized [`sort_order`].
///
/// Keyed by the caller's data version and the store's sort revision, so a
/// recompute happens only when either moves.
#[derive(Debug, Clone, Default)]
pub struct SortCache {
    key: Option<(u64, u64)>,
    order: Arc<[usize]>,
}

impl SortCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached order for `(rows_version, sort_revision)`, computing
    /// it on a miss.
    pub fn get_or_compute<R: Borrow<Row>>(
        &mut self,
        rows_version: u64,
        sort_revision: u64,
        rows: &[R],
        sort: Option<&SortState>,
        leaf_sorts: &LeafSorts,
    ) -> Arc<[usize]> {
        let key = (rows_version, sort_revision);
        if self.key != Some(key) {
            self.order = sort_order(rows, sort, leaf_sorts).into();
            self.key = Some(key);
        }
        Arc::clone(&self.order)
    }

    /// Drop the cached order.
    pub fn invalidate(&mut self) {
        self.key = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(rows: &[Row]) -> Vec<String> {
        rows.iter().map(|r| r.id.to_string()).collect()
    }

    fn grouped() -> Vec<Row> {
        vec![
            Row::new("b").group_root("team").with("name", "beta"),
            Row::new("b2").with_parents(["b"]).with("name", "zed"),
            Row::new("b1").with_parents(["b"]).with("name", "amy"),
            Row::new("a").group_root("team").with("name", "Alpha"),
            Row::new("a1").with_parents(["a"]).with("name", "kim"),
        ]
    }

    #[test]
    fn no_sort_keeps_input_order() {
        let rows = grouped();
        assert_eq!(ids(&sort_rows(&rows, None, &LeafSorts::new())), ids(&rows));
    }

    #[test]
    fn root_sort_moves_whole_groups() {
        let rows = grouped();
        let sorted = sort_rows(&rows, Some(&SortState::asc("name")), &LeafSorts::new());
        assert_eq!(ids(&sorted), ["a", "a1", "b", "b2", "b1"]);
    }

    #[test]
    fn leaf_sort_orders_one_group() {
        let rows = grouped();
        let mut leaf = LeafSorts::new();
        leaf.insert(RowId::from("b"), SortState::asc("name"));
        let sorted = sort_rows(&rows, None, &leaf);
        assert_eq!(ids(&sorted), ["b", "b1", "b2", "a", "a1"]);
    }

    #[test]
    fn descending_numbers() {
        let rows = vec![
            Row::new(1).with("n", 3),
            Row::new(2).with("n", 10),
            Row::new(3).with("n", CellValue::Null),
        ];
        let sorted = sort_rows(&rows, Some(&SortState::desc("n")), &LeafSorts::new());
        assert_eq!(ids(&sorted), ["2", "1", "3"]);
    }

    #[test]
    fn text_collates_case_insensitively() {
        assert_eq!(
            compare_values(&"apple".into(), &"Banana".into()),
            Ordering::Less
        );
        assert_eq!(compare_values(&"a".into(), &"A".into()), Ordering::Greater);
        assert_eq!(compare_values(&5.into(), &"x".into()), Ordering::Less);
        assert_eq!(compare_values(&true.into(), &2.into()), Ordering::Less);
    }

    #[test]
    fn orphans_become_roots() {
        let rows = vec![
            Row::new(1).with_parents([99]).with("v", 2),
            Row::new(2).with("v", 1),
        ];
        let order = sort_order(&rows, Some(&SortState::asc("v")), &LeafSorts::new());
        assert_eq!(order, [1, 0]);
    }

    #[test]
    fn cycles_are_appended_not_dropped() {
        let rows = vec![
            Row::new("top"),
            Row::new("x").with_parents(["y"]),
            Row::new("y").with_parents(["x"]),
        ];
        let order = sort_order(&rows, None, &LeafSorts::new());
        assert_eq!(order, [0, 1, 2]);
    }

    #[test]
    fn empty_input() {
        let rows: Vec<Row> = Vec::new();
        assert!(sort_order(&rows, None, &LeafSorts::new()).is_empty());
    }

    #[test]
    fn cache_hits_until_key_moves() {
        let rows = grouped();
        let mut cache = SortCache::new();
        let sort = SortState::asc("name");
        let first = cache.get_or_compute(1, 1, &rows, Some(&sort), &LeafSorts::new());
        let again = cache.get_or_compute(1, 1, &rows, None, &LeafSorts::new());
        assert!(Arc::ptr_eq(&first, &again));
        let moved = cache.get_or_compute(1, 2, &rows, None, &LeafSorts::new());
        assert_eq!(&*moved, &[0, 1, 2, 3, 4]);
    }
}
