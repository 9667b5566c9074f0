//! Windowed data loading.
//!
//! Rows live in a sparse [`LoadedWindow`] whose length is the total reported
//! by the data source. The virtualizer asks for ranges through
//! [`WindowedLoader::ensure_loaded`]; requests are debounced, overlapping
//! ones are merged, and a request only reaches the [`DataSource`] if some
//! slot it covers is still empty when the timer fires.
//!
//! ```text
//! ensure_loaded ─► Debouncer<PageRequest> ─► poll ─► fetch ─► DataSource
//!                      (200 ms, union)       (any      │
//!                                          NotLoaded?) ▼
//!                                                 LoadedWindow::merge
//! ```
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | Fetch fails | Loading cleared, loaded slots untouched, error returned |
//! | Range past known total | Request ignored |
//! | Page longer than window | Extra rows dropped with a warning |

use std::future::Future;
use std::time::{Duration, Instant};

use vgrid_core::Row;

use crate::scheduler::Debouncer;
use crate::store::{Command, TableStore};

/// A page of rows to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageRequest {
    /// First absolute row index.
    pub offset: usize,
    /// Number of rows.
    pub limit: usize,
}

impl PageRequest {
    /// Request covering the inclusive index range `start..=end`.
    #[must_use]
    pub fn covering(start: usize, end: usize) -> Self {
        let (lo, hi) = if start <= end { (start, end) } else { (end, start) };
        Self {
            offset: lo,
            limit: hi - lo + 1,
        }
    }

    /// One past the last index.
    #[must_use]
    pub fn end(&self) -> usize {
        self.offset + self.limit
    }

    /// Whether the two requests overlap or touch.
    #[must_use]
    pub fn touches(&self, other: &PageRequest) -> bool {
        self.offset <= other.end() && other.offset <= self.end()
    }

    /// Smallest request covering both.
    #[must_use]
    pub fn union(&self, other: &PageRequest) -> Self {
        let offset = self.offset.min(other.offset);
        Self {
            offset,
            limit: self.end().max(other.end()) - offset,
        }
    }
}

/// A page returned by the data source.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Page {
    /// Rows starting at the requested offset.
    pub rows: Vec<Row>,
    /// Total number of rows the source can serve.
    pub total: usize,
}

/// Error reported by a [`DataSource`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),
    /// The source answered with an error.
    #[error("source rejected request: {0}")]
    Rejected(String),
}

/// Error returned by [`WindowedLoader::fetch`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    /// The data source failed.
    #[error("failed to load {limit} rows at offset {offset}")]
    Fetch {
        /// Requested offset.
        offset: usize,
        /// Requested row count.
        limit: usize,
        /// Underlying failure.
        #[source]
        source: FetchError,
    },
}

/// Asynchronous row provider.
///
/// `total` must be stable across pages.
pub trait DataSource {
    /// Fetch one page.
    fn load_page(&self, request: PageRequest) -> impl Future<Output = Result<Page, FetchError>>;
}

/// One position of the loaded window.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Slot {
    /// Not fetched yet.
    #[default]
    NotLoaded,
    /// Fetched row.
    Loaded(Row),
}

impl Slot {
    /// The row, if loaded.
    #[must_use]
    pub fn row(&self) -> Option<&Row> {
        match self {
            Self::Loaded(row) => Some(row),
            Self::NotLoaded => None,
        }
    }

    /// Whether the slot holds a row.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }
}

/// Sparse rows of server-reported length.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LoadedWindow {
    slots: Vec<Slot>,
    total: Option<usize>,
    version: u64,
}

impl LoadedWindow {
    /// Empty window with no known total.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total reported by the first successful page.
    #[must_use]
    pub fn total(&self) -> Option<usize> {
        self.total
    }

    /// Number of slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether there are no slots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Bumped on every merge.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// All slots.
    #[must_use]
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Slot at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Slot> {
        self.slots.get(index)
    }

    /// Row at `index`, if loaded.
    #[must_use]
    pub fn row(&self, index: usize) -> Option<&Row> {
        self.slots.get(index).and_then(Slot::row)
    }

    /// Loaded rows in index order.
    pub fn loaded_rows(&self) -> impl Iterator<Item = &Row> {
        self.slots.iter().filter_map(Slot::row)
    }

    /// First empty slot.
    #[must_use]
    pub fn first_unloaded(&self) -> Option<usize> {
        self.slots.iter().position(|s| !s.is_loaded())
    }

    /// Whether the total is known and every slot is loaded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.total.is_some() && self.first_unloaded().is_none()
    }

    /// Whether any slot covered by `request` is empty.
    ///
    /// Always true before the total is known.
    #[must_use]
    pub fn needs(&self, request: &PageRequest) -> bool {
        if self.total.is_none() {
            return true;
        }
        let end = request.end().min(self.slots.len());
        (request.offset..end).any(|i| !self.slots[i].is_loaded())
    }

    /// Record the total and size the window. Later totals are ignored.
    pub fn init(&mut self, total: usize) {
        if self.total.is_none() {
            self.total = Some(total);
            self.slots = vec![Slot::NotLoaded; total];
        } else if self.total != Some(total) {
            tracing::warn!(
                known = ?self.total,
                reported = total,
                "data source reported a different total, keeping the first"
            );
        }
    }

    /// Write `rows` at absolute positions starting at `offset`.
    ///
    /// Returns the number of rows stored.
    pub fn merge(&mut self, offset: usize, rows: Vec<Row>) -> usize {
        let available = self.slots.len().saturating_sub(offset);
        if rows.len() > available {
            tracing::warn!(
                offset,
                rows = rows.len(),
                available,
                "page overruns window, dropping extra rows"
            );
        }
        let mut stored = 0;
        for (slot, row) in self.slots.iter_mut().skip(offset).zip(rows) {
            *slot = Slot::Loaded(row);
            stored += 1;
        }
        self.version += 1;
        stored
    }
}

/// Loader configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Quiet period before a request fires.
    pub debounce: Duration,
    /// Page size for the initial and load-more requests.
    pub page_limit: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(200),
            page_limit: 50,
        }
    }
}

impl LoaderConfig {
    /// Set the debounce delay.
    #[must_use]
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Set the page size.
    #[must_use]
    pub fn with_page_limit(mut self, limit: usize) -> Self {
        self.page_limit = limit.max(1);
        self
    }
}

/// Debounced, deduplicated page loader over a [`DataSource`].
#[derive(Debug)]
pub struct WindowedLoader<S> {
    source: S,
    config: LoaderConfig,
    window: LoadedWindow,
    pending: Debouncer<PageRequest>,
}

impl<S: DataSource> WindowedLoader<S> {
    /// Create a loader with an empty window.
    #[must_use]
    pub fn new(source: S, config: LoaderConfig) -> Self {
        Self {
            source,
            config,
            window: LoadedWindow::new(),
            pending: Debouncer::new(config.debounce),
        }
    }

    /// Loader configuration.
    #[must_use]
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// The loaded window.
    #[must_use]
    pub fn window(&self) -> &LoadedWindow {
        &self.window
    }

    /// The data source.
    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Request waiting for its debounce timer.
    #[must_use]
    pub fn pending(&self) -> Option<&PageRequest> {
        self.pending.pending()
    }

    /// When the pending request fires.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.deadline()
    }

    /// Schedule the first page.
    pub fn load_initial(&mut self, now: Instant) {
        self.ensure_loaded(0, self.config.page_limit.saturating_sub(1), now);
    }

    /// Make sure rows `start..=end` get loaded.
    ///
    /// A request touching the pending one is merged into their union; any
    /// other request replaces it. Either way the debounce timer restarts.
    pub fn ensure_loaded(&mut self, start: usize, end: usize, now: Instant) {
        let mut request = PageRequest::covering(start, end);
        if let Some(total) = self.window.total() {
            if request.offset >= total {
                tracing::trace!(offset = request.offset, total, "range past end, ignoring");
                return;
            }
            request.limit = request.limit.min(total - request.offset);
        }
        if let Some(pending) = self.pending.pending()
            && pending.touches(&request)
        {
            request = pending.union(&request);
        }
        self.pending.schedule(request, now);
    }

    /// Take the due request if it still covers an empty slot.
    pub fn poll(&mut self, now: Instant) -> Option<PageRequest> {
        let request = self.pending.poll(now)?;
        if self.window.needs(&request) {
            Some(request)
        } else {
            tracing::trace!(?request, "range already loaded, skipping fetch");
            None
        }
    }

    /// Fetch `request` and merge the rows into the window.
    ///
    /// The store's loading flag is set for the duration of the fetch and
    /// cleared on both outcomes. On failure previously loaded slots are
    /// untouched.
    pub async fn fetch(
        &mut self,
        request: PageRequest,
        store: &mut TableStore,
    ) -> Result<usize, LoadError> {
        store.dispatch(Command::SetLoading(true));
        tracing::debug!(offset = request.offset, limit = request.limit, "fetching page");

        let result = self.source.load_page(request).await;
        let outcome = match result {
            Ok(page) => {
                self.window.init(page.total);
                let stored = self.window.merge(request.offset, page.rows);
                tracing::debug!(
                    offset = request.offset,
                    stored,
                    total = page.total,
                    version = self.window.version(),
                    "merged page"
                );
                Ok(stored)
            }
            Err(source) => {
                tracing::warn!(offset = request.offset, error = %source, "page fetch failed");
                Err(LoadError::Fetch {
                    offset: request.offset,
                    limit: request.limit,
                    source,
                })
            }
        };

        store.dispatch(Command::SetLoading(false));
        outcome
    }

    /// Poll and fetch in one step.
    ///
    /// Returns `None` when nothing was due.
    pub async fn run_due(
        &mut self,
        now: Instant,
        store: &mut TableStore,
    ) -> Option<Result<usize, LoadError>> {
        let request = self.poll(now)?;
        Some(self.fetch(request, store).await)
    }

    /// Next page for an append-style "load more" trigger.
    ///
    /// Starts at the first empty slot. `None` while a fetch is in flight or
    /// once everything is loaded.
    #[must_use]
    pub fn load_more_request(&self, store: &TableStore) -> Option<PageRequest> {
        if store.state().loading {
            return None;
        }
        let Some(total) = self.window.total() else {
            return Some(PageRequest {
                offset: 0,
                limit: self.config.page_limit,
            });
        };
        let offset = self.window.first_unloaded()?;
        Some(PageRequest {
            offset,
            limit: self.config.page_limit.min(total - offset),
        })
    }
}
