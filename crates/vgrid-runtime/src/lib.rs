#![forbid(unsafe_code)]

//! vgrid runtime
//!
//! Owns the mutable side of a grid: the [`TableStore`] and its persistence
//! backends, the debounce and frame scheduling primitives, and the
//! [`WindowedLoader`] that streams rows in from a [`DataSource`].
//!
//! # Key Components
//!
//! - [`TableStore`] - command dispatcher over [`TableState`] with history,
//!   listeners and per-concern revisions
//! - [`StorageBackend`] - string key/value persistence ([`MemoryStorage`],
//!   `FileStorage` with the `state-persistence` feature)
//! - [`Debouncer`] / [`FrameScheduler`] - time-injected scheduling
//! - [`WindowedLoader`] - debounced, merged page fetches into a sparse window
//!
//! Storage failures are logged and never fail a dispatch. Fetch failures
//! clear the loading flag and are returned to the caller.

pub mod loader;
pub mod scheduler;
pub mod state_persistence;
pub mod store;

pub use loader::{
    DataSource, FetchError, LoadError, LoadedWindow, LoaderConfig, Page, PageRequest, Slot,
    WindowedLoader,
};
pub use scheduler::{Debouncer, FrameScheduler};
#[cfg(feature = "state-persistence")]
pub use state_persistence::FileStorage;
pub use state_persistence::{
    MemoryStorage, PersistedTableState, StorageBackend, StorageError, StorageResult, storage_key,
};
pub use store::{
    Command, Concern, Revisions, StoreConfig, SubId, TableState, TableStore,
};
