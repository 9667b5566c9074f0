#![forbid(unsafe_code)]

//! Keyboard focus navigation across a virtualized grid.
//!
//! The navigator owns the focused cell coordinate and turns key events into
//! [`FocusChange`]s. When the new row is outside the viewport the change
//! carries the scroll offset that reveals it, and `prevent_scroll` tells the
//! host to suppress its own scroll-into-view.
//!
//! # State machine
//!
//! ```text
//! Idle --key press/repeat--> Navigating --key released, scroll settled--> Idle
//! ```
//!
//! While navigating, every scroll event pushes a settle deadline forward.
//! Once the deadline passes, [`FocusNavigator::poll`] checks whether the
//! focused row was left behind by a key-repeat burst and, if so, moves focus
//! to the visible row at the leading edge.
//!
//! Time is passed in by the caller so tests are deterministic.

use std::time::{Duration, Instant};

use vgrid_core::{FocusedCell, KeyCode, KeyEvent, KeyEventKind};

use crate::fenwick::HeightIndex;
use crate::virtualizer::reveal_offset;

/// Focus navigation configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusConfig {
    /// Quiet period after the last scroll event before focus is re-synced.
    pub settle: Duration,
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(100),
        }
    }
}

impl FocusConfig {
    /// Set the scroll settle delay.
    #[must_use]
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }
}

/// Layout snapshot the navigator reads on each event.
#[derive(Debug, Clone, Copy)]
pub struct FocusContext<'a> {
    /// Heights of the displayed rows.
    pub heights: &'a HeightIndex,
    /// Number of tab stops per row, fixed leading columns included.
    pub tab_count: usize,
    /// Current scroll offset.
    pub scroll_offset: u32,
    /// Current viewport height.
    pub viewport_size: u32,
}

impl FocusContext<'_> {
    fn row_count(&self) -> usize {
        self.heights.len()
    }

    fn viewport_end(&self) -> u32 {
        self.scroll_offset.saturating_add(self.viewport_size)
    }

    fn is_row_visible(&self, row: usize) -> bool {
        self.heights.offset_of(row) >= self.scroll_offset
            && self.heights.bottom_of(row) <= self.viewport_end()
    }

    /// First row whose top edge is inside the viewport.
    fn first_visible_row(&self) -> usize {
        let last = self.row_count().saturating_sub(1);
        let i = self.heights.rows_within(self.scroll_offset).min(last);
        if self.heights.offset_of(i) < self.scroll_offset {
            (i + 1).min(last)
        } else {
            i
        }
    }

    /// Last row whose bottom edge is inside the viewport.
    fn last_visible_row(&self) -> usize {
        let last = self.row_count().saturating_sub(1);
        self.heights
            .rows_within(self.viewport_end())
            .saturating_sub(1)
            .min(last)
    }
}

/// Result of a navigation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusChange {
    /// Newly focused cell.
    pub cell: FocusedCell,
    /// Scroll offset the host should apply before focusing.
    pub scroll_to: Option<u32>,
    /// Suppress the host's native scroll-into-view.
    pub prevent_scroll: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Travel {
    Up,
    Down,
}

/// Navigator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NavState {
    /// No navigation key is active.
    #[default]
    Idle,
    /// A navigation key is held or its scroll has not settled.
    Navigating {
        /// Key still held.
        held: bool,
        /// A repeat event has been seen in this burst.
        repeating: bool,
        /// Deadline armed by scroll events.
        settle_deadline: Option<Instant>,
    },
}

/// Keyboard focus navigator.
#[derive(Debug, Clone, Default)]
pub struct FocusNavigator {
    config: FocusConfig,
    focused: Option<FocusedCell>,
    state: NavState,
    travel: Option<Travel>,
}

impl FocusNavigator {
    /// Create a navigator with nothing focused.
    #[must_use]
    pub fn new(config: FocusConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Focused cell, if any.
    #[must_use]
    pub fn focused(&self) -> Option<FocusedCell> {
        self.focused
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> NavState {
        self.state
    }

    /// Focus a cell directly, e.g. on click.
    pub fn set_focused(&mut self, cell: Option<FocusedCell>) {
        self.focused = cell;
    }

    /// Handle a key event. Returns the focus change, if the key moved focus.
    pub fn handle_key(
        &mut self,
        event: KeyEvent,
        ctx: &FocusContext<'_>,
    ) -> Option<FocusChange> {
        if event.kind == KeyEventKind::Release {
            if let NavState::Navigating { held, .. } = &mut self.state {
                *held = false;
            }
            return None;
        }
        if ctx.row_count() == 0 || ctx.tab_count == 0 {
            return None;
        }

        let current = self.clamped(ctx);
        let code = match event.code {
            KeyCode::Tab if event.shift() => KeyCode::BackTab,
            code => code,
        };
        let target = self.target(code, current, ctx)?;

        let repeating = event.kind == KeyEventKind::Repeat
            || matches!(self.state, NavState::Navigating { repeating: true, .. });
        let settle_deadline = match self.state {
            NavState::Navigating {
                settle_deadline, ..
            } => settle_deadline,
            NavState::Idle => None,
        };
        self.state = NavState::Navigating {
            held: true,
            repeating,
            settle_deadline,
        };
        if target.row_index != current.row_index {
            self.travel = Some(if target.row_index > current.row_index {
                Travel::Down
            } else {
                Travel::Up
            });
        }

        self.focused = Some(target);
        let scroll_to = reveal_offset(
            ctx.heights,
            target.row_index,
            ctx.scroll_offset,
            ctx.viewport_size,
        );
        Some(FocusChange {
            cell: target,
            scroll_to,
            prevent_scroll: scroll_to.is_some(),
        })
    }

    /// Report a scroll event from the container.
    pub fn on_scroll(&mut self, now: Instant) {
        if let NavState::Navigating {
            settle_deadline, ..
        } = &mut self.state
        {
            *settle_deadline = Some(now + self.config.settle);
        }
    }

    /// Advance timers.
    ///
    /// After the scroll settles, re-syncs focus if a key-repeat burst left the
    /// focused row outside the viewport, and returns to idle once the key is
    /// released.
    pub fn poll(&mut self, now: Instant, ctx: &FocusContext<'_>) -> Option<FocusChange> {
        let NavState::Navigating {
            held,
            repeating,
            settle_deadline,
        } = self.state
        else {
            return None;
        };

        match settle_deadline {
            Some(deadline) if now < deadline => None,
            Some(_) => {
                let change = if repeating { self.resync(ctx) } else { None };
                self.state = if held {
                    NavState::Navigating {
                        held,
                        repeating,
                        settle_deadline: None,
                    }
                } else {
                    NavState::Idle
                };
                change
            }
            None => {
                if !held {
                    self.state = NavState::Idle;
                }
                None
            }
        }
    }

    fn clamped(&self, ctx: &FocusContext<'_>) -> FocusedCell {
        let cell = self.focused.unwrap_or_default();
        FocusedCell::new(
            cell.row_index.min(ctx.row_count() - 1),
            cell.tab_index.min(ctx.tab_count - 1),
        )
    }

    fn target(
        &self,
        code: KeyCode,
        current: FocusedCell,
        ctx: &FocusContext<'_>,
    ) -> Option<FocusedCell> {
        let last_row = ctx.row_count() - 1;
        let last_tab = ctx.tab_count - 1;
        let FocusedCell {
            row_index: row,
            tab_index: tab,
        } = current;
        let cell = match code {
            KeyCode::Up => FocusedCell::new(row.saturating_sub(1), tab),
            KeyCode::Down => FocusedCell::new((row + 1).min(last_row), tab),
            KeyCode::Left | KeyCode::BackTab => FocusedCell::new(row, tab.saturating_sub(1)),
            KeyCode::Right | KeyCode::Tab => FocusedCell::new(row, (tab + 1).min(last_tab)),
            KeyCode::Home => FocusedCell::new(0, tab),
            KeyCode::End => FocusedCell::new(last_row, tab),
            KeyCode::PageDown => {
                let y = ctx.heights.offset_of(row).saturating_add(ctx.viewport_size);
                let next = ctx.heights.rows_within(y).max(row + 1).min(last_row);
                FocusedCell::new(next, tab)
            }
            KeyCode::PageUp => {
                let y = ctx.heights.offset_of(row).saturating_sub(ctx.viewport_size);
                let next = ctx.heights.rows_within(y).min(row.saturating_sub(1));
                FocusedCell::new(next, tab)
            }
            _ => return None,
        };
        Some(cell)
    }

    fn resync(&mut self, ctx: &FocusContext<'_>) -> Option<FocusChange> {
        let focused = self.focused?;
        if ctx.row_count() == 0 || ctx.is_row_visible(focused.row_index) {
            return None;
        }
        let row = match self.travel {
            Some(Travel::Up) => ctx.first_visible_row(),
            Some(Travel::Down) | None => ctx.last_visible_row(),
        };
        let cell = FocusedCell::new(row, focused.tab_index);
        self.focused = Some(cell);
        Some(FocusChange {
            cell,
            scroll_to: None,
            prevent_scroll: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(heights: &HeightIndex, scroll_offset: u32) -> FocusContext<'_> {
        FocusContext {
            heights,
            tab_count: 3,
            scroll_offset,
            viewport_size: 100,
        }
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code)
    }

    #[test]
    fn arrows_move_and_clamp() {
        let heights = HeightIndex::from_heights(&[50; 4]);
        let c = ctx(&heights, 0);
        let mut nav = FocusNavigator::default();

        let up = nav.handle_key(press(KeyCode::Up), &c).unwrap();
        assert_eq!(up.cell, FocusedCell::new(0, 0));
        let right = nav.handle_key(press(KeyCode::Right), &c).unwrap();
        assert_eq!(right.cell, FocusedCell::new(0, 1));
        nav.handle_key(press(KeyCode::Right), &c);
        let clamped = nav.handle_key(press(KeyCode::Right), &c).unwrap();
        assert_eq!(clamped.cell, FocusedCell::new(0, 2));
        let end = nav.handle_key(press(KeyCode::End), &c).unwrap();
        assert_eq!(end.cell.row_index, 3);
        let down = nav.handle_key(press(KeyCode::Down), &c).unwrap();
        assert_eq!(down.cell.row_index, 3);
    }

    #[test]
    fn shift_tab_moves_back_a_tab() {
        let heights = HeightIndex::from_heights(&[50; 4]);
        let c = ctx(&heights, 0);
        let mut nav = FocusNavigator::default();

        let tab = nav.handle_key(press(KeyCode::Tab), &c).unwrap();
        assert_eq!(tab.cell, FocusedCell::new(0, 1));
        nav.handle_key(press(KeyCode::Tab), &c);
        let shift_tab = press(KeyCode::Tab).with_modifiers(vgrid_core::Modifiers::SHIFT);
        let back = nav.handle_key(shift_tab, &c).unwrap();
        assert_eq!(back.cell, FocusedCell::new(0, 1));
        let back_tab = nav.handle_key(press(KeyCode::BackTab), &c).unwrap();
        assert_eq!(back_tab.cell, FocusedCell::new(0, 0));
    }

    #[test]
    fn moving_out_of_view_scrolls_direction_aware() {
        let heights = HeightIndex::from_heights(&[50; 10]);
        let mut nav = FocusNavigator::default();

        // Viewport 100..200 shows rows 2 and 3.
        let c = ctx(&heights, 100);
        nav.set_focused(Some(FocusedCell::new(3, 0)));
        let down = nav.handle_key(press(KeyCode::Down), &c).unwrap();
        assert_eq!(down.scroll_to, Some(150));
        assert!(down.prevent_scroll);

        nav.set_focused(Some(FocusedCell::new(2, 0)));
        let up = nav.handle_key(press(KeyCode::Up), &c).unwrap();
        assert_eq!(up.scroll_to, Some(50));

        nav.set_focused(Some(FocusedCell::new(2, 0)));
        let inside = nav.handle_key(press(KeyCode::Down), &c).unwrap();
        assert_eq!(inside.scroll_to, None);
        assert!(!inside.prevent_scroll);
    }

    #[test]
    fn page_keys_move_by_viewport() {
        let heights = HeightIndex::from_heights(&[25; 20]);
        let c = ctx(&heights, 0);
        let mut nav = FocusNavigator::default();
        let down = nav.handle_key(press(KeyCode::PageDown), &c).unwrap();
        assert_eq!(down.cell.row_index, 4);
        let up = nav.handle_key(press(KeyCode::PageUp), &c).unwrap();
        assert_eq!(up.cell.row_index, 0);
    }

    #[test]
    fn empty_grid_ignores_keys() {
        let heights = HeightIndex::new(0);
        let mut nav = FocusNavigator::default();
        assert_eq!(
            nav.handle_key(press(KeyCode::Down), &ctx(&heights, 0)),
            None
        );
        assert_eq!(nav.state(), NavState::Idle);
    }

    #[test]
    fn release_without_scroll_returns_to_idle() {
        let heights = HeightIndex::from_heights(&[50; 4]);
        let c = ctx(&heights, 0);
        let t = Instant::now();
        let mut nav = FocusNavigator::default();
        nav.handle_key(press(KeyCode::Down), &c);
        assert!(matches!(nav.state(), NavState::Navigating { held: true, .. }));
        nav.handle_key(press(KeyCode::Down).with_kind(KeyEventKind::Release), &c);
        assert_eq!(nav.poll(t, &c), None);
        assert_eq!(nav.state(), NavState::Idle);
    }

    #[test]
    fn key_repeat_resyncs_after_scroll_settles() {
        let heights = HeightIndex::from_heights(&[50; 40]);
        let t0 = Instant::now();
        let mut nav = FocusNavigator::default();
        let repeat = press(KeyCode::Down).with_kind(KeyEventKind::Repeat);

        nav.handle_key(repeat, &ctx(&heights, 0));
        nav.handle_key(repeat, &ctx(&heights, 0));
        assert_eq!(nav.focused(), Some(FocusedCell::new(2, 0)));

        // The container raced ahead to 500..600 during the burst.
        nav.on_scroll(t0);
        let scrolled = ctx(&heights, 500);
        assert_eq!(nav.poll(t0 + Duration::from_millis(50), &scrolled), None);

        nav.handle_key(press(KeyCode::Down).with_kind(KeyEventKind::Release), &scrolled);
        let change = nav
            .poll(t0 + Duration::from_millis(150), &scrolled)
            .expect("focus re-synced");
        assert_eq!(change.cell, FocusedCell::new(11, 0));
        assert!(change.prevent_scroll);
        assert_eq!(nav.state(), NavState::Idle);
    }
}
