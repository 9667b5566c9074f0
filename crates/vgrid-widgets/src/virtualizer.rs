#![forbid(unsafe_code)]

//! Variable-height row virtualization.
//!
//! Given per-row heights and the scroll container's metrics, computes the
//! slice of rows to mount plus spacer heights above and below it, so the
//! scrollbar extent matches the full list while only a window is rendered.
//!
//! # Range computation
//!
//! 1. Raw start: the first row whose bottom edge is below the scroll offset.
//!    Scrolled past the end, the last row.
//! 2. Raw end: walk from the raw start accumulating heights until the
//!    viewport height is covered; the last row if it never is.
//! 3. Widen both ends by `buffer` rows, clamped to the list.
//! 4. `padding_top` sums the heights before the start, `padding_bottom` the
//!    heights after the end.
//!
//! # Scheduling
//!
//! The host reports scroll and resize events and calls [`VariableVirtualizer::on_frame`]
//! once per animation frame. Events only mark a frame as pending, so any
//! number of events between frames cost one recompute. Height changes
//! recompute immediately.
//!
//! After the range changes, scroll events are ignored for a short
//! suppression window so programmatic scrolling (focus navigation) does not
//! fight the scroll handler. A scroll inside the window is not lost: it is
//! replayed on the first frame after the window closes.
//!
//! # Invariants
//!
//! 1. `start_index <= end_index <= max(0, item_count - 1)`.
//! 2. `padding_top + span(start, end) + padding_bottom == total_height`.
//! 3. For fixed heights and viewport, `start_index` is monotone in the
//!    scroll offset.

use std::time::{Duration, Instant};

use crate::fenwick::HeightIndex;

/// Source of scroll container metrics.
pub trait ViewportMetrics {
    /// Distance scrolled from the top, in pixels.
    fn scroll_offset(&self) -> u32;
    /// Visible height of the container, in pixels.
    fn viewport_size(&self) -> u32;
}

/// Fixed metrics, handy for tests and headless hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StaticViewport {
    /// Scroll offset in pixels.
    pub scroll_offset: u32,
    /// Viewport height in pixels.
    pub viewport_size: u32,
}

impl StaticViewport {
    /// Create metrics.
    #[must_use]
    pub const fn new(scroll_offset: u32, viewport_size: u32) -> Self {
        Self {
            scroll_offset,
            viewport_size,
        }
    }
}

impl ViewportMetrics for StaticViewport {
    fn scroll_offset(&self) -> u32 {
        self.scroll_offset
    }

    fn viewport_size(&self) -> u32 {
        self.viewport_size
    }
}

/// Virtualizer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualizerConfig {
    /// Extra rows mounted on each side of the visible range.
    pub buffer: usize,
    /// How long scroll events are ignored after a range change.
    pub suppression: Duration,
}

impl Default for VirtualizerConfig {
    fn default() -> Self {
        Self {
            buffer: 5,
            suppression: Duration::from_millis(50),
        }
    }
}

impl VirtualizerConfig {
    /// Set the buffer size.
    #[must_use]
    pub fn with_buffer(mut self, buffer: usize) -> Self {
        self.buffer = buffer;
        self
    }

    /// Set the scroll suppression window.
    #[must_use]
    pub fn with_suppression(mut self, window: Duration) -> Self {
        self.suppression = window;
        self
    }
}

/// Rows to mount and the spacer heights around them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VirtualRange {
    /// First mounted row.
    pub start_index: usize,
    /// Last mounted row (inclusive).
    pub end_index: usize,
    /// Height of the spacer above `start_index`.
    pub padding_top: u32,
    /// Height of the spacer below `end_index`.
    pub padding_bottom: u32,
}

impl VirtualRange {
    /// Number of mounted rows for a list of `item_count` rows.
    #[must_use]
    pub fn len(&self, item_count: usize) -> usize {
        if item_count == 0 {
            0
        } else {
            self.end_index - self.start_index + 1
        }
    }

    /// Whether `index` is mounted.
    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        (self.start_index..=self.end_index).contains(&index)
    }
}

/// Compute the mounted range for `heights` at the given metrics.
#[must_use]
pub fn compute_range(
    heights: &HeightIndex,
    scroll_offset: u32,
    viewport_size: u32,
    buffer: usize,
) -> VirtualRange {
    #[cfg(feature = "tracing")]
    let _span = tracing::debug_span!(
        "virtual_range",
        items = heights.len(),
        scroll_offset,
        viewport_size
    )
    .entered();

    let n = heights.len();
    if n == 0 {
        return VirtualRange::default();
    }
    let last = n - 1;

    let raw_start = heights.rows_within(scroll_offset).min(last);
    let raw_end = heights
        .first_reaching(raw_start, viewport_size)
        .unwrap_or(last);

    let start_index = raw_start.saturating_sub(buffer);
    let end_index = raw_end.saturating_add(buffer).min(last);

    VirtualRange {
        start_index,
        end_index,
        padding_top: heights.offset_of(start_index),
        padding_bottom: heights.total().wrapping_sub(heights.bottom_of(end_index)),
    }
}

/// Frame-coalesced virtualizer over variable row heights.
#[derive(Debug, Clone)]
pub struct VariableVirtualizer {
    config: VirtualizerConfig,
    heights: HeightIndex,
    range: VirtualRange,
    scroll_offset: u32,
    viewport_size: u32,
    frame_pending: bool,
    scroll_deferred: bool,
    suppress_until: Option<Instant>,
}

impl Default for VariableVirtualizer {
    fn default() -> Self {
        Self::new(VirtualizerConfig::default())
    }
}

impl VariableVirtualizer {
    /// Create a virtualizer with no rows.
    #[must_use]
    pub fn new(config: VirtualizerConfig) -> Self {
        Self {
            config,
            heights: HeightIndex::default(),
            range: VirtualRange::default(),
            scroll_offset: 0,
            viewport_size: 0,
            frame_pending: false,
            scroll_deferred: false,
            suppress_until: None,
        }
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &VirtualizerConfig {
        &self.config
    }

    /// Current range.
    #[must_use]
    pub fn range(&self) -> VirtualRange {
        self.range
    }

    /// Number of rows.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.heights.len()
    }

    /// Height index backing the layout.
    #[must_use]
    pub fn heights(&self) -> &HeightIndex {
        &self.heights
    }

    /// Sum of all row heights.
    #[must_use]
    pub fn total_height(&self) -> u32 {
        self.heights.total()
    }

    /// Replace the row heights and recompute at once.
    ///
    /// Returns the new range if it changed.
    pub fn set_heights<M: ViewportMetrics + ?Sized>(
        &mut self,
        heights: &[u32],
        metrics: &M,
        now: Instant,
    ) -> Option<VirtualRange> {
        self.heights.rebuild(heights);
        self.read_metrics(metrics);
        self.recompute(now)
    }

    /// Change one row's height and recompute at once.
    pub fn set_height<M: ViewportMetrics + ?Sized>(
        &mut self,
        index: usize,
        height: u32,
        metrics: &M,
        now: Instant,
    ) -> Option<VirtualRange> {
        self.heights.set(index, height);
        self.read_metrics(metrics);
        self.recompute(now)
    }

    /// Whether scroll events are currently being ignored.
    #[must_use]
    pub fn is_suppressed(&self, now: Instant) -> bool {
        self.suppress_until.is_some_and(|until| now < until)
    }

    /// Report a scroll event.
    pub fn on_scroll(&mut self, now: Instant) {
        if self.is_suppressed(now) {
            self.scroll_deferred = true;
        } else {
            self.frame_pending = true;
        }
    }

    /// Report a viewport resize.
    pub fn on_resize(&mut self) {
        self.frame_pending = true;
    }

    /// Whether the next [`on_frame`](Self::on_frame) will recompute.
    #[must_use]
    pub fn wants_frame(&self, now: Instant) -> bool {
        self.frame_pending || (self.scroll_deferred && !self.is_suppressed(now))
    }

    /// Animation-frame callback.
    ///
    /// Recomputes when a frame is pending and returns the new range if it
    /// changed.
    pub fn on_frame<M: ViewportMetrics + ?Sized>(
        &mut self,
        metrics: &M,
        now: Instant,
    ) -> Option<VirtualRange> {
        if !self.wants_frame(now) {
            return None;
        }
        self.frame_pending = false;
        if !self.is_suppressed(now) {
            self.scroll_deferred = false;
        }
        self.read_metrics(metrics);
        self.recompute(now)
    }

    /// Top edge of row `index`.
    #[must_use]
    pub fn offset_of(&self, index: usize) -> u32 {
        self.heights.offset_of(index)
    }

    /// Scroll offset that brings row `index` fully into view, or `None` if
    /// it already is.
    ///
    /// Rows above the viewport align their top edge; rows below align their
    /// bottom edge.
    #[must_use]
    pub fn scroll_offset_to_reveal<M: ViewportMetrics + ?Sized>(
        &self,
        index: usize,
        metrics: &M,
    ) -> Option<u32> {
        reveal_offset(&self.heights, index, metrics.scroll_offset(), metrics.viewport_size())
    }

    fn read_metrics<M: ViewportMetrics + ?Sized>(&mut self, metrics: &M) {
        self.scroll_offset = metrics.scroll_offset();
        self.viewport_size = metrics.viewport_size();
    }

    fn recompute(&mut self, now: Instant) -> Option<VirtualRange> {
        let next = compute_range(
            &self.heights,
            self.scroll_offset,
            self.viewport_size,
            self.config.buffer,
        );
        if next == self.range {
            return None;
        }
        self.range = next;
        self.suppress_until = Some(now + self.config.suppression);
        Some(next)
    }
}

/// Direction-aware reveal: `None` when row `index` is fully visible.
#[must_use]
pub fn reveal_offset(
    heights: &HeightIndex,
    index: usize,
    scroll_offset: u32,
    viewport_size: u32,
) -> Option<u32> {
    if index >= heights.len() {
        return None;
    }
    let top = heights.offset_of(index);
    let bottom = heights.bottom_of(index);
    if top < scroll_offset {
        Some(top)
    } else if bottom > scroll_offset.saturating_add(viewport_size) {
        Some(bottom.saturating_sub(viewport_size))
    } else {
        None
    }
}
