//! Table state persistence across sessions.
//!
//! A [`StorageBackend`] is a string key/value store holding JSON documents,
//! the same shape as browser local storage. The table store writes one
//! document per table under [`storage_key`] and reads it back on
//! construction.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        TableStore                            │
//! │   - serializes PersistedTableState on persisted changes      │
//! │   - restores it when constructed                             │
//! └──────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     StorageBackend                           │
//! │   - MemoryStorage: in-memory (testing, ephemeral)            │
//! │   - FileStorage: JSON file (requires state-persistence)      │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Design Invariants
//!
//! 1. **Graceful degradation**: storage failures never panic and never fail
//!    a dispatch; the store logs them and keeps running in memory.
//! 2. **Atomic writes**: file storage uses the write-rename pattern.
//! 3. **Version gate**: a document with an unknown `formatVersion` is ignored
//!    and the table starts from defaults.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | `StorageError::Io` | File I/O failure | Logged, state kept in memory |
//! | `StorageError::Serialization` | JSON encode/decode | Logged, defaults used on load |
//! | `StorageError::Corruption` | Poisoned lock, invalid file | Logged |
//! | Missing entry | First run | Defaults used |

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use vgrid_core::{CellFormatting, Filter, RowId, SortState};
use vgrid_widgets::{ColumnVisibility, ColumnWidths, StickyColumns};

use crate::store::TableState;

// ─────────────────────────────────────────────────────────────────────────────
// Error Types
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can occur during state storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// Storage is corrupted or in an invalid format.
    #[error("storage corruption: {0}")]
    Corruption(String),
    /// Backend is not available.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage key for a table's persisted state.
#[must_use]
pub fn storage_key(table_id: &str) -> String {
    format!("tableState_{table_id}")
}

// ─────────────────────────────────────────────────────────────────────────────
// Storage Backend Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Pluggable string key/value storage.
///
/// Implementations must be thread-safe (`Send + Sync`) so one backend can be
/// shared between several table stores.
pub trait StorageBackend: Send + Sync {
    /// Human-readable backend name for logging.
    fn name(&self) -> &str;

    /// Read the value stored under `key`.
    fn get_item(&self, key: &str) -> StorageResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    fn set_item(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Delete `key`. Deleting a missing key is not an error.
    fn remove_item(&self, key: &str) -> StorageResult<()>;

    /// Whether the backend can currently accept writes.
    fn is_available(&self) -> bool {
        true
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Memory Storage
// ─────────────────────────────────────────────────────────────────────────────

/// In-memory storage backend.
///
/// State is lost when the process exits. Useful in tests and for hosts that
/// do not need cross-session persistence.
#[derive(Default)]
pub struct MemoryStorage {
    data: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Create an empty memory storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create storage pre-populated with entries.
    #[must_use]
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            data: RwLock::new(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.read().map(|g| g.len()).unwrap_or(0)
    }

    /// Whether nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StorageBackend for MemoryStorage {
    fn name(&self) -> &str {
        "MemoryStorage"
    }

    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        let guard = self
            .data
            .read()
            .map_err(|_| StorageError::Corruption("lock poisoned".into()))?;
        Ok(guard.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut guard = self
            .data
            .write()
            .map_err(|_| StorageError::Corruption("lock poisoned".into()))?;
        guard.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        let mut guard = self
            .data
            .write()
            .map_err(|_| StorageError::Corruption("lock poisoned".into()))?;
        guard.remove(key);
        Ok(())
    }
}

impl fmt::Debug for MemoryStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStorage")
            .field("entries", &self.len())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// File Storage (requires state-persistence feature)
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(feature = "state-persistence")]
mod file_storage {
    use super::*;
    use std::fs::{self, File};
    use std::io::{BufReader, BufWriter, Write};
    use std::path::{Path, PathBuf};

    /// On-disk layout.
    #[derive(Serialize, Deserialize)]
    struct StateFile {
        format_version: u32,
        entries: BTreeMap<String, String>,
    }

    impl StateFile {
        const FORMAT_VERSION: u32 = 1;

        fn new() -> Self {
            Self {
                format_version: Self::FORMAT_VERSION,
                entries: BTreeMap::new(),
            }
        }
    }

    /// File-based storage backend.
    ///
    /// All keys live in one JSON file:
    ///
    /// ```json
    /// {
    ///   "format_version": 1,
    ///   "entries": {
    ///     "tableState_orders": "{\"formatVersion\":1,\"drilldowns\":[\"eu\"]}"
    ///   }
    /// }
    /// ```
    ///
    /// Every write rewrites the file through `{path}.tmp`, flushes, syncs and
    /// renames over the original.
    pub struct FileStorage {
        path: PathBuf,
        lock: RwLock<()>,
    }

    impl FileStorage {
        /// Create a file storage at the given path.
        ///
        /// The file does not need to exist; it is created on first write.
        #[must_use]
        pub fn new(path: impl AsRef<Path>) -> Self {
            Self {
                path: path.as_ref().to_path_buf(),
                lock: RwLock::new(()),
            }
        }

        /// Create storage at the default location for the application.
        ///
        /// Uses `$XDG_STATE_HOME/vgrid/{app_name}/state.json`, falling back to
        /// `~/.local/state` and then the current directory.
        #[must_use]
        pub fn default_for_app(app_name: &str) -> Self {
            let base = dirs_or_fallback();
            Self::new(base.join("vgrid").join(app_name).join("state.json"))
        }

        /// Path of the backing file.
        #[must_use]
        pub fn path(&self) -> &Path {
            &self.path
        }

        fn temp_path(&self) -> PathBuf {
            let mut tmp = self.path.clone();
            tmp.set_extension("json.tmp");
            tmp
        }

        fn read_file(&self) -> StorageResult<StateFile> {
            if !self.path.exists() {
                return Ok(StateFile::new());
            }
            let reader = BufReader::new(File::open(&self.path)?);
            let file: StateFile = serde_json::from_reader(reader).map_err(|e| {
                StorageError::Serialization(format!("failed to parse state file: {e}"))
            })?;
            if file.format_version != StateFile::FORMAT_VERSION {
                tracing::warn!(
                    stored = file.format_version,
                    expected = StateFile::FORMAT_VERSION,
                    "state file format version mismatch, ignoring stored state"
                );
                return Ok(StateFile::new());
            }
            Ok(file)
        }

        fn write_file(&self, file: &StateFile) -> StorageResult<()> {
            if let Some(parent) = self.path.parent() {
                fs::create_dir_all(parent)?;
            }
            let tmp_path = self.temp_path();
            {
                let mut writer = BufWriter::new(File::create(&tmp_path)?);
                serde_json::to_writer_pretty(&mut writer, file).map_err(|e| {
                    StorageError::Serialization(format!("failed to serialize state: {e}"))
                })?;
                writer.flush()?;
                writer.get_ref().sync_all()?;
            }
            fs::rename(&tmp_path, &self.path)?;
            tracing::debug!(
                path = %self.path.display(),
                entries = file.entries.len(),
                "saved table state"
            );
            Ok(())
        }

        fn update<F>(&self, f: F) -> StorageResult<()>
        where
            F: FnOnce(&mut BTreeMap<String, String>),
        {
            let _guard = self
                .lock
                .write()
                .map_err(|_| StorageError::Corruption("lock poisoned".into()))?;
            let mut file = self.read_file()?;
            f(&mut file.entries);
            self.write_file(&file)
        }
    }

    fn dirs_or_fallback() -> PathBuf {
        if let Ok(state_home) = std::env::var("XDG_STATE_HOME") {
            return PathBuf::from(state_home);
        }
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(".local").join("state");
        }
        PathBuf::from(".")
    }

    impl StorageBackend for FileStorage {
        fn name(&self) -> &str {
            "FileStorage"
        }

        fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
            let _guard = self
                .lock
                .read()
                .map_err(|_| StorageError::Corruption("lock poisoned".into()))?;
            Ok(self.read_file()?.entries.remove(key))
        }

        fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
            self.update(|entries| {
                entries.insert(key.to_owned(), value.to_owned());
            })
        }

        fn remove_item(&self, key: &str) -> StorageResult<()> {
            if !self.path.exists() {
                return Ok(());
            }
            self.update(|entries| {
                entries.remove(key);
            })
        }

        fn is_available(&self) -> bool {
            let Some(parent) = self.path.parent() else {
                return false;
            };
            if !parent.exists() {
                return fs::create_dir_all(parent).is_ok();
            }
            let probe = parent.join(".vgrid_test_write");
            if fs::write(&probe, b"test").is_ok() {
                let _ = fs::remove_file(&probe);
                return true;
            }
            false
        }
    }

    impl fmt::Debug for FileStorage {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("FileStorage")
                .field("path", &self.path)
                .finish()
        }
    }
}

#[cfg(feature = "state-persistence")]
pub use file_storage::FileStorage;

// ─────────────────────────────────────────────────────────────────────────────
// Persisted document
// ─────────────────────────────────────────────────────────────────────────────

/// The persisted subset of [`TableState`].
///
/// Selection, loading, resize previews, focus, expanded rows and row height
/// overrides are session-only and never written.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistedTableState {
    /// Document schema version.
    pub format_version: u32,
    /// Open group ids, sorted.
    pub drilldowns: Vec<RowId>,
    /// Expanded group ids, sorted.
    pub expanded_levels: Vec<RowId>,
    /// Column filters.
    pub filters: Vec<Filter>,
    /// Root sort.
    pub sort: Option<SortState>,
    /// Leaf sorts as `(parent id, sort)` pairs, sorted by parent id.
    pub leaf_sorts: Vec<(RowId, SortState)>,
    /// Explicit column order.
    pub column_order: Vec<String>,
    /// Column visibility.
    pub column_visibility: ColumnVisibility,
    /// Committed column widths.
    pub column_widths: ColumnWidths,
    /// Sticky positions.
    pub sticky_columns: StickyColumns,
    /// Per-column cell formatting.
    pub cell_formatting: BTreeMap<String, CellFormatting>,
}

impl PersistedTableState {
    /// Current document schema version.
    pub const FORMAT_VERSION: u32 = 1;

    /// Extract the persisted subset of `state`.
    #[must_use]
    pub fn capture(state: &TableState) -> Self {
        let mut drilldowns: Vec<RowId> = state.drilldowns.iter().cloned().collect();
        drilldowns.sort();
        let mut expanded_levels: Vec<RowId> = state.expanded_levels.iter().cloned().collect();
        expanded_levels.sort();
        let mut leaf_sorts: Vec<(RowId, SortState)> = state
            .leaf_sorts
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        leaf_sorts.sort_by(|a, b| a.0.cmp(&b.0));
        Self {
            format_version: Self::FORMAT_VERSION,
            drilldowns,
            expanded_levels,
            filters: state.filters.clone(),
            sort: state.sort.clone(),
            leaf_sorts,
            column_order: state.column_order.clone(),
            column_visibility: state.column_visibility.clone(),
            column_widths: state.column_widths.clone(),
            sticky_columns: state.sticky_columns.clone(),
            cell_formatting: state.cell_formatting.clone(),
        }
    }

    /// Overwrite the persisted fields of `state`.
    pub fn restore_into(self, state: &mut TableState) {
        state.drilldowns = self.drilldowns.into_iter().collect();
        state.expanded_levels = self.expanded_levels.into_iter().collect();
        state.filters = self.filters;
        state.sort = self.sort;
        state.leaf_sorts = self.leaf_sorts.into_iter().collect();
        state.column_order = self.column_order;
        state.column_visibility = self.column_visibility;
        state.column_widths = self.column_widths;
        state.sticky_columns = self.sticky_columns;
        state.cell_formatting = self.cell_formatting;
    }

    /// Serialize to the stored JSON string.
    pub fn to_json(&self) -> StorageResult<String> {
        serde_json::to_string(self).map_err(|e| StorageError::Serialization(e.to_string()))
    }

    /// Parse a stored JSON string.
    ///
    /// Returns `Ok(None)` for documents written by an unknown format version.
    pub fn from_json(json: &str) -> StorageResult<Option<Self>> {
        let doc: Self =
            serde_json::from_str(json).map_err(|e| StorageError::Serialization(e.to_string()))?;
        if doc.format_version != Self::FORMAT_VERSION {
            tracing::warn!(
                stored = doc.format_version,
                expected = Self::FORMAT_VERSION,
                "table state format version mismatch, ignoring stored state"
            );
            return Ok(None);
        }
        Ok(Some(doc))
    }
}
