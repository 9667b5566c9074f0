//! Per-row height resolution.
//!
//! Resolution order for a row key:
//!
//! 1. the live row-resize preview, while that row is being dragged,
//! 2. a committed height override (zero counts as unset),
//! 3. the default height plus the expanded bonus, for expanded rows,
//! 4. the default height.
//!
//! The expanded bonus is a fixed estimate of the detail panel. Hosts that
//! measure the real panel feed it back as a committed override.

use std::borrow::Borrow;
use std::collections::{HashMap, HashSet};

use vgrid_core::{Row, RowId, RowKey, RowResize};

/// Row height configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowHeightConfig {
    /// Height of a collapsed row without an override.
    pub default_height: u32,
    /// Extra height added to expanded rows.
    pub expanded_bonus: u32,
    /// Smallest height a row resize may produce.
    pub min_height: u32,
}

impl Default for RowHeightConfig {
    fn default() -> Self {
        Self {
            default_height: 64,
            expanded_bonus: 100,
            min_height: 30,
        }
    }
}

impl RowHeightConfig {
    /// Set the default row height.
    #[must_use]
    pub fn with_default_height(mut self, height: u32) -> Self {
        self.default_height = height;
        self
    }

    /// Set the expanded-row bonus.
    #[must_use]
    pub fn with_expanded_bonus(mut self, bonus: u32) -> Self {
        self.expanded_bonus = bonus;
        self
    }

    /// Set the resize floor.
    #[must_use]
    pub fn with_min_height(mut self, min: u32) -> Self {
        self.min_height = min;
        self
    }
}

/// Inputs that vary between resolutions.
#[derive(Debug, Clone, Copy)]
pub struct HeightInputs<'a> {
    /// Committed overrides keyed by row key.
    pub overrides: &'a HashMap<RowId, u32>,
    /// In-flight row resize.
    pub preview: Option<&'a RowResize>,
    /// Keys of expanded rows.
    pub expanded: &'a HashSet<RowId>,
}

/// Resolves row heights from configuration and table state.
#[derive(Debug, Clone, Default)]
pub struct RowHeightResolver {
    config: RowHeightConfig,
}

impl RowHeightResolver {
    /// Create a resolver.
    #[must_use]
    pub fn new(config: RowHeightConfig) -> Self {
        Self { config }
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &RowHeightConfig {
        &self.config
    }

    /// Height of the row keyed `key`.
    #[must_use]
    pub fn height_of(&self, key: &RowId, inputs: &HeightInputs<'_>) -> u32 {
        if let Some(preview) = inputs.preview
            && preview.key == *key
        {
            return preview.size.max(self.config.min_height);
        }
        if let Some(&h) = inputs.overrides.get(key)
            && h > 0
        {
            return h;
        }
        if inputs.expanded.contains(key) {
            return self.config.default_height + self.config.expanded_bonus;
        }
        self.config.default_height
    }

    /// Heights of `rows` in order.
    #[must_use]
    pub fn resolve<R: Borrow<Row>>(
        &self,
        rows: &[R],
        key: &RowKey,
        inputs: &HeightInputs<'_>,
    ) -> Vec<u32> {
        rows.iter()
            .map(|r| self.height_of(&key.key_of(r.borrow()), inputs))
            .collect()
    }
}
