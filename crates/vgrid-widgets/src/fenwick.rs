//! Prefix-sum index over row heights.
//!
//! [`HeightIndex`] is a Fenwick tree (Binary Indexed Tree) specialised for
//! vertical layout: entry `i` is the height of row `i`, so prefix sums are row
//! offsets. Offset and search queries are O(log n).
//!
//! # Layout
//!
//! Stored 1-indexed in a contiguous `Vec<u32>` of length `n + 1` (index 0
//! unused). For 100k rows the index occupies ~400 KB.
//!
//! # Operations
//!
//! | Operation | Time |
//! |-----------|------|
//! | `from_heights(h)` | O(n) |
//! | `set(i, h)` | O(log n) |
//! | `offset_of(i)` | O(log n) |
//! | `rows_within(y)` | O(log n) |
//! | `first_reaching(i, span)` | O(log n) |
//!
//! # Invariants
//!
//! 1. `offset_of(i) + height(i) == bottom_of(i)`.
//! 2. `offset_of(0) == 0` and `bottom_of(n - 1) == total()`.
//! 3. `rows_within` is monotone in its argument.
//!
//! Sums use wrapping `u32` arithmetic; the total height must fit in a `u32`.

/// Fenwick tree over row heights in pixels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeightIndex {
    /// 1-indexed tree storage. `tree[0]` is unused.
    tree: Vec<u32>,
    /// Number of rows.
    n: usize,
}

impl HeightIndex {
    /// An index over `n` zero-height rows.
    #[must_use]
    pub fn new(n: usize) -> Self {
        Self {
            tree: vec![0u32; n + 1],
            n,
        }
    }

    /// Build from row heights in O(n).
    #[must_use]
    pub fn from_heights(heights: &[u32]) -> Self {
        let mut index = Self::new(heights.len());
        index.fill(heights);
        index
    }

    /// Replace every height, resizing to `heights.len()`. O(n).
    pub fn rebuild(&mut self, heights: &[u32]) {
        self.n = heights.len();
        self.tree.clear();
        self.tree.resize(self.n + 1, 0);
        self.fill(heights);
    }

    fn fill(&mut self, heights: &[u32]) {
        for (i, &h) in heights.iter().enumerate() {
            self.tree[i + 1] = h;
        }
        // Parent propagation.
        for i in 1..=self.n {
            let parent = i + lowbit(i);
            if parent <= self.n {
                self.tree[parent] = self.tree[parent].wrapping_add(self.tree[i]);
            }
        }
    }

    /// Number of rows.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.n
    }

    /// Whether there are no rows.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Sum of the first `count` heights.
    fn sum_first(&self, count: usize) -> u32 {
        let mut sum = 0u32;
        let mut idx = count.min(self.n);
        while idx > 0 {
            sum = sum.wrapping_add(self.tree[idx]);
            idx -= lowbit(idx);
        }
        sum
    }

    /// Top edge of row `i`: the sum of heights strictly before it.
    ///
    /// `offset_of(len())` is the total height.
    #[must_use]
    pub fn offset_of(&self, i: usize) -> u32 {
        self.sum_first(i)
    }

    /// Bottom edge of row `i`.
    #[must_use]
    pub fn bottom_of(&self, i: usize) -> u32 {
        self.sum_first(i + 1)
    }

    /// Height of row `i`, or 0 past the end.
    #[must_use]
    pub fn height(&self, i: usize) -> u32 {
        if i >= self.n {
            return 0;
        }
        self.bottom_of(i).wrapping_sub(self.offset_of(i))
    }

    /// Sum of all heights.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.sum_first(self.n)
    }

    /// Sum of heights in `first..=last`.
    #[must_use]
    pub fn span(&self, first: usize, last: usize) -> u32 {
        if first > last {
            return 0;
        }
        self.bottom_of(last).wrapping_sub(self.offset_of(first))
    }

    /// Set the height of row `i`. Out-of-range indices are ignored.
    pub fn set(&mut self, i: usize, height: u32) {
        if i >= self.n {
            return;
        }
        let delta = height.wrapping_sub(self.height(i));
        let mut idx = i + 1;
        while idx <= self.n {
            self.tree[idx] = self.tree[idx].wrapping_add(delta);
            idx += lowbit(idx);
        }
    }

    /// Number of leading rows whose bottom edge is at or above `y`.
    ///
    /// Equivalently, the index of the first row extending below `y`
    /// (`len()` if none does).
    #[must_use]
    pub fn rows_within(&self, y: u32) -> usize {
        let mut pos = 0usize;
        let mut remaining = y;
        let mut step = most_significant_bit(self.n);
        while step > 0 {
            let next = pos + step;
            if next <= self.n && self.tree[next] <= remaining {
                remaining -= self.tree[next];
                pos = next;
            }
            step >>= 1;
        }
        pos
    }

    /// Smallest `j >= first` with `span(first, j) >= amount`.
    ///
    /// `None` when the rows from `first` to the end are shorter than
    /// `amount`. An `amount` of 0 is reached at `first`.
    #[must_use]
    pub fn first_reaching(&self, first: usize, amount: u32) -> Option<usize> {
        if first >= self.n {
            return None;
        }
        if amount == 0 {
            return Some(first);
        }
        let target = self.offset_of(first).checked_add(amount)?;
        let j = self.rows_within(target - 1);
        (j < self.n).then_some(j)
    }
}

/// Lowest set bit of `x`. E.g., `lowbit(6) = 2`, `lowbit(4) = 4`.
#[inline]
fn lowbit(x: usize) -> usize {
    x & x.wrapping_neg()
}

/// Most significant bit that fits within `n`.
#[inline]
fn most_significant_bit(n: usize) -> usize {
    if n == 0 {
        return 0;
    }
    1 << (usize::BITS - 1 - n.leading_zeros())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_index() {
        let index = HeightIndex::new(0);
        assert!(index.is_empty());
        assert_eq!(index.total(), 0);
        assert_eq!(index.rows_within(100), 0);
        assert_eq!(index.first_reaching(0, 10), None);
    }

    #[test]
    fn offsets_and_bottoms() {
        let index = HeightIndex::from_heights(&[20, 30, 10, 40, 25]);
        assert_eq!(index.offset_of(0), 0);
        assert_eq!(index.offset_of(2), 50);
        assert_eq!(index.bottom_of(2), 60);
        assert_eq!(index.offset_of(5), 125);
        assert_eq!(index.total(), 125);
        assert_eq!(index.height(3), 40);
        assert_eq!(index.height(9), 0);
        assert_eq!(index.span(1, 3), 80);
    }

    #[test]
    fn set_updates_later_offsets() {
        let mut index = HeightIndex::from_heights(&[5, 10, 15]);
        index.set(1, 20);
        assert_eq!(index.height(1), 20);
        assert_eq!(index.offset_of(2), 25);
        assert_eq!(index.total(), 40);
        index.set(7, 99);
        assert_eq!(index.total(), 40);
    }

    #[test]
    fn rows_within_skips_rows_above() {
        // Bottoms: [20, 50, 60, 100, 125]
        let index = HeightIndex::from_heights(&[20, 30, 10, 40, 25]);
        assert_eq!(index.rows_within(0), 0);
        assert_eq!(index.rows_within(19), 0);
        assert_eq!(index.rows_within(20), 1);
        assert_eq!(index.rows_within(99), 3);
        assert_eq!(index.rows_within(125), 5);
        assert_eq!(index.rows_within(10_000), 5);
    }

    #[test]
    fn rows_within_counts_leading_zero_heights() {
        let index = HeightIndex::from_heights(&[0, 0, 10, 0, 10]);
        assert_eq!(index.rows_within(0), 2);
        assert_eq!(index.rows_within(10), 4);
    }

    #[test]
    fn first_reaching_accumulates_from_start() {
        let index = HeightIndex::from_heights(&[50, 50, 50, 50, 50]);
        assert_eq!(index.first_reaching(0, 120), Some(2));
        assert_eq!(index.first_reaching(0, 100), Some(1));
        assert_eq!(index.first_reaching(3, 100), Some(4));
        assert_eq!(index.first_reaching(3, 101), None);
        assert_eq!(index.first_reaching(4, 0), Some(4));
    }

    #[test]
    fn rebuild_resizes() {
        let mut index = HeightIndex::from_heights(&[1, 2, 3]);
        index.rebuild(&[10, 20, 30, 40, 50]);
        assert_eq!(index.len(), 5);
        assert_eq!(index, HeightIndex::from_heights(&[10, 20, 30, 40, 50]));
        index.rebuild(&[]);
        assert!(index.is_empty());
    }
}
