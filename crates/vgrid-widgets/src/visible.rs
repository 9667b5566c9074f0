//! Drill-down visibility.
//!
//! A row is shown when every id in its ancestor chain is open. The rule is
//! an AND over the whole chain, so closing a distant ancestor hides every
//! descendant whatever the nearer ancestors say.
//!
//! Over a complete data set, chain ids naming no row at all are skipped, so
//! malformed grouping degrades to showing the row rather than hiding it
//! forever. Over a partial window an id missing from the loaded rows may
//! still arrive with a later page, so [`visible_indices_partial`] requires
//! every chain id to be open.

use std::borrow::Borrow;
use std::collections::HashSet;

use vgrid_core::{Row, RowId};

/// Ids of every row in the set.
fn present_ids<R: Borrow<Row>>(rows: &[R]) -> HashSet<&RowId> {
    rows.iter().map(|r| &r.borrow().id).collect()
}

fn chain_open(row: &Row, present: Option<&HashSet<&RowId>>, open: &HashSet<RowId>) -> bool {
    row.parent_id
        .iter()
        .filter(|id| present.is_none_or(|p| p.contains(id)))
        .all(|id| open.contains(id))
}

/// Positions in `order` (indices into `rows`) whose rows are visible.
///
/// `rows` is the whole data set. Returns the visible subsequence of
/// `order`, preserving its order.
#[must_use]
pub fn visible_indices<R: Borrow<Row>>(
    rows: &[R],
    order: &[usize],
    open: &HashSet<RowId>,
) -> Vec<usize> {
    let present = present_ids(rows);
    order
        .iter()
        .copied()
        .filter(|&i| chain_open(rows[i].borrow(), Some(&present), open))
        .collect()
}

/// Like [`visible_indices`] for a window that is still loading.
///
/// No chain id is skipped: an ancestor that is not loaded yet counts as
/// closed unless it is in `open`.
#[must_use]
pub fn visible_indices_partial<R: Borrow<Row>>(
    rows: &[R],
    order: &[usize],
    open: &HashSet<RowId>,
) -> Vec<usize> {
    order
        .iter()
        .copied()
        .filter(|&i| chain_open(rows[i].borrow(), None, open))
        .collect()
}

/// Visible rows of an already ordered sequence.
#[must_use]
pub fn visible_rows<R: Borrow<Row>>(rows: &[R], open: &HashSet<RowId>) -> Vec<Row> {
    let present = present_ids(rows);
    rows.iter()
        .map(Borrow::<Row>::borrow)
        .filter(|r| chain_open(r, Some(&present), open))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open(ids: &[i32]) -> HashSet<RowId> {
        ids.iter().map(|&i| RowId::from(i)).collect()
    }

    fn ids(rows: &[Row]) -> Vec<String> {
        rows.iter().map(|r| r.id.to_string()).collect()
    }

    #[test]
    fn drilldown_reveals_children() {
        let rows = vec![
            Row::new(1).group_root("team"),
            Row::new(2).with_parents([1]),
        ];
        assert_eq!(ids(&visible_rows(&rows, &open(&[]))), ["1"]);
        assert_eq!(ids(&visible_rows(&rows, &open(&[1]))), ["1", "2"]);
    }

    #[test]
    fn every_ancestor_must_be_open() {
        let rows = vec![
            Row::new(1).group_root("a"),
            Row::new(2).with_parents([1]).group_root("b"),
            Row::new(3).with_parents([1, 2]),
        ];
        assert_eq!(ids(&visible_rows(&rows, &open(&[2]))), ["1"]);
        assert_eq!(ids(&visible_rows(&rows, &open(&[1]))), ["1", "2"]);
        assert_eq!(ids(&visible_rows(&rows, &open(&[1, 2]))), ["1", "2", "3"]);
    }

    #[test]
    fn ancestor_without_group_flag_still_gates() {
        let rows = vec![Row::new(1), Row::new(2).with_parents([1])];
        assert_eq!(ids(&visible_rows(&rows, &open(&[]))), ["1"]);
        assert_eq!(ids(&visible_rows(&rows, &open(&[1]))), ["1", "2"]);
    }

    #[test]
    fn partial_window_hides_children_of_unloaded_roots() {
        let rows = vec![
            Row::new(7),
            Row::new(51).with_parents([50]),
            Row::new(52).with_parents([50]),
        ];
        let order = [0, 1, 2];
        assert_eq!(visible_indices_partial(&rows, &order, &open(&[])), [0]);
        assert_eq!(visible_indices_partial(&rows, &order, &open(&[50])), [0, 1, 2]);
        // The complete-set rule treats 50 as dangling.
        assert_eq!(visible_indices(&rows, &order, &open(&[])), [0, 1, 2]);
    }

    #[test]
    fn dangling_parent_is_ignored() {
        let rows = vec![Row::new(5).with_parents([42])];
        assert_eq!(ids(&visible_rows(&rows, &open(&[]))), ["5"]);
    }

    #[test]
    fn indices_follow_given_order() {
        let rows = vec![
            Row::new(1).group_root("a"),
            Row::new(2).with_parents([1]),
            Row::new(3),
        ];
        assert_eq!(visible_indices(&rows, &[2, 0, 1], &open(&[])), [2, 0]);
        assert_eq!(visible_indices(&rows, &[2, 0, 1], &open(&[1])), [2, 0, 1]);
    }
}
