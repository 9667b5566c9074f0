//! Error types shared by the grid crates.

/// Errors raised by row and formatting helpers.
///
/// Most grid operations degrade gracefully instead of failing (unknown column
/// ids are no-ops, malformed grouping falls back to top-level rows), so this
/// enum stays small.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    /// `minimum_fraction_digits` exceeds `maximum_fraction_digits`.
    #[error("invalid fraction digits: minimum {min} > maximum {max}")]
    InvalidFractionDigits {
        /// Requested minimum.
        min: u8,
        /// Requested maximum.
        max: u8,
    },

    /// Fraction digits beyond what a number format can represent.
    #[error("fraction digits {0} out of range (0..=20)")]
    FractionDigitsOutOfRange(u8),

    /// Currency style requested without a currency code.
    #[error("currency style requires a currency code")]
    MissingCurrency,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GridError>;
