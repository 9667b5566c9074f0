//! Column filters applied ahead of sorting.
//!
//! A leaf row survives when it passes every filter. Group roots are always
//! kept so the hierarchy stays navigable even when all of a group's leaves
//! are filtered out.

use std::borrow::Borrow;

use vgrid_core::{Filter, Row};

/// Whether `row` survives `filters`.
#[must_use]
pub fn passes(row: &Row, filters: &[Filter]) -> bool {
    row.is_group_root || filters.iter().all(|f| f.matches(row))
}

/// Indices of the rows that survive `filters`, in input order.
#[must_use]
pub fn filter_indices<R: Borrow<Row>>(rows: &[R], filters: &[Filter]) -> Vec<usize> {
    rows.iter()
        .enumerate()
        .filter(|(_, r)| passes((*r).borrow(), filters))
        .map(|(i, _)| i)
        .collect()
}

/// Borrow the rows that survive `filters`.
#[must_use]
pub fn apply_filters<'a, R: Borrow<Row>>(rows: &'a [R], filters: &[Filter]) -> Vec<&'a Row> {
    rows.iter()
        .map(Borrow::<Row>::borrow)
        .filter(|r| passes(r, filters))
        .collect()
}
