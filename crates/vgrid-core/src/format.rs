#![forbid(unsafe_code)]

//! Per-column cell formatting rules.
//!
//! A [`CellFormatting`] is stored per column in the table state and persisted
//! with it. [`format_cell`] turns a raw value into display text plus an
//! optional style:
//!
//! 1. Number options apply to numeric values (fraction digits, percent,
//!    currency code, unit suffix). No locale data is consulted.
//! 2. Date options are kept for round-tripping; date values render as-is.
//! 3. Style rules: the first matching condition wins, else the default style.
//! 4. Prefix and suffix wrap the final text.

use serde::{Deserialize, Serialize};

use crate::error::{GridError, Result};
use crate::row::CellValue;

/// Comparison operator shared by style conditions and row filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionOperator {
    /// Loose equality.
    #[serde(rename = "==")]
    Equals,
    /// Loose inequality.
    #[serde(rename = "!=")]
    NotEquals,
    /// Less than.
    #[serde(rename = "<")]
    LessThan,
    /// Greater than.
    #[serde(rename = ">")]
    GreaterThan,
    /// Less than or equal.
    #[serde(rename = "<=")]
    LessThanOrEqual,
    /// Greater than or equal.
    #[serde(rename = ">=")]
    GreaterThanOrEqual,
}

impl ConditionOperator {
    /// Evaluate `lhs <op> rhs`.
    ///
    /// Two texts compare as strings. Otherwise both sides are coerced to
    /// numbers; a side that does not coerce makes every ordering comparison
    /// false. Null only equals null.
    #[must_use]
    pub fn evaluate(self, lhs: &CellValue, rhs: &CellValue) -> bool {
        match self {
            Self::Equals => loose_eq(lhs, rhs),
            Self::NotEquals => !loose_eq(lhs, rhs),
            Self::LessThan => ordering(lhs, rhs).is_some_and(|o| o.is_lt()),
            Self::GreaterThan => ordering(lhs, rhs).is_some_and(|o| o.is_gt()),
            Self::LessThanOrEqual => ordering(lhs, rhs).is_some_and(|o| o.is_le()),
            Self::GreaterThanOrEqual => ordering(lhs, rhs).is_some_and(|o| o.is_ge()),
        }
    }
}

fn loose_eq(lhs: &CellValue, rhs: &CellValue) -> bool {
    match (lhs, rhs) {
        (CellValue::Null, CellValue::Null) => true,
        (CellValue::Null, _) | (_, CellValue::Null) => false,
        (CellValue::Text(a), CellValue::Text(b)) => a == b,
        _ => match (lhs.to_number(), rhs.to_number()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
    }
}

fn ordering(lhs: &CellValue, rhs: &CellValue) -> Option<std::cmp::Ordering> {
    if let (CellValue::Text(a), CellValue::Text(b)) = (lhs, rhs) {
        return Some(a.cmp(b));
    }
    lhs.to_number()?.partial_cmp(&rhs.to_number()?)
}

/// Visual style of a cell. Colors are opaque strings for the host renderer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellStyle {
    /// Text color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Background color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    /// Bold text.
    #[serde(default)]
    pub bold: bool,
    /// Italic text.
    #[serde(default)]
    pub italic: bool,
    /// Underlined text.
    #[serde(default)]
    pub underline: bool,
}

/// A style applied when a value satisfies a condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleCondition {
    /// Comparison against the cell value.
    pub operator: ConditionOperator,
    /// Right-hand operand.
    pub value: CellValue,
    /// Style used when the condition holds.
    pub style: CellStyle,
}

/// Default style plus ordered conditional overrides.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StyleRules {
    /// Used when no condition matches.
    #[serde(default)]
    pub default: CellStyle,
    /// Checked in order; first match wins.
    #[serde(default)]
    pub conditions: Vec<StyleCondition>,
}

impl StyleRules {
    /// Resolve the style for `value`.
    #[must_use]
    pub fn resolve(&self, value: &CellValue) -> &CellStyle {
        self.conditions
            .iter()
            .find(|c| c.operator.evaluate(value, &c.value))
            .map_or(&self.default, |c| &c.style)
    }
}

/// Kind of formatting configured for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormattingType {
    /// Conditional styling.
    Style,
    /// Date display.
    Date,
}

/// Date display granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateGranularity {
    /// Chosen by the renderer.
    #[default]
    Auto,
    Year,
    Month,
    Week,
    Day,
    Hour,
    Minute,
    Second,
}

/// Date display options.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateFormatting {
    /// Granularity.
    #[serde(default)]
    pub granularity: DateGranularity,
    /// Render as a span covering one granularity unit.
    #[serde(default)]
    pub show_as_span: bool,
    /// Locale tag passed through to the host.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

/// Number presentation style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumberStyle {
    /// Plain decimal.
    #[default]
    Decimal,
    /// Currency code prefix.
    Currency,
    /// Value times 100 with a `%` suffix.
    Percent,
    /// Unit suffix.
    Unit,
}

/// Number display options.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumberFormatting {
    /// Locale tag passed through to the host.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    /// Presentation style.
    #[serde(default)]
    pub style: NumberStyle,
    /// ISO currency code for [`NumberStyle::Currency`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    /// Unit label for [`NumberStyle::Unit`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_fraction_digits: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum_fraction_digits: Option<u8>,
}

const MAX_FRACTION_DIGITS: u8 = 20;

impl NumberFormatting {
    /// Effective `(min, max)` fraction digits after style defaults.
    ///
    /// Currency defaults to two digits, percent to zero, decimal to at most
    /// three.
    pub fn fraction_digits(&self) -> Result<(u8, u8)> {
        let (default_min, default_max) = match self.style {
            NumberStyle::Currency => (2, 2),
            NumberStyle::Percent => (0, 0),
            NumberStyle::Decimal | NumberStyle::Unit => (0, 3),
        };
        let min = self.minimum_fraction_digits.unwrap_or(default_min);
        let max = self
            .maximum_fraction_digits
            .unwrap_or_else(|| default_max.max(min));
        for d in [min, max] {
            if d > MAX_FRACTION_DIGITS {
                return Err(GridError::FractionDigitsOutOfRange(d));
            }
        }
        if min > max {
            return Err(GridError::InvalidFractionDigits { min, max });
        }
        Ok((min, max))
    }

    /// Format `n` according to these options.
    pub fn format(&self, n: f64) -> Result<String> {
        let (min, max) = self.fraction_digits()?;
        let scaled = if self.style == NumberStyle::Percent {
            n * 100.0
        } else {
            n
        };
        let digits = trim_fraction(format!("{:.*}", usize::from(max), scaled), min);
        Ok(match self.style {
            NumberStyle::Decimal => digits,
            NumberStyle::Percent => format!("{digits}%"),
            NumberStyle::Currency => {
                let code = self.currency.as_deref().ok_or(GridError::MissingCurrency)?;
                format!("{code} {digits}")
            }
            NumberStyle::Unit => match self.unit.as_deref() {
                Some(unit) => format!("{digits} {unit}"),
                None => digits,
            },
        })
    }
}

/// Drop trailing fractional zeros while keeping at least `min` digits.
fn trim_fraction(mut text: String, min: u8) -> String {
    let Some(dot) = text.find('.') else {
        return text;
    };
    let keep = dot + 1 + usize::from(min);
    while text.len() > keep && text.ends_with('0') {
        text.pop();
    }
    if text.ends_with('.') {
        text.pop();
    }
    text
}

/// Formatting configured for one column.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CellFormatting {
    /// Which editor produced this formatting.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<FormattingType>,
    /// Conditional styles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<StyleRules>,
    /// Date options.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateFormatting>,
    /// Number options.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<NumberFormatting>,
    /// Text placed before the value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    /// Text placed after the value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
}

/// Display text and style for one cell.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FormattedCell {
    /// Rendered text.
    pub text: String,
    /// Resolved style, if any rules are configured.
    pub style: Option<CellStyle>,
}

/// Render `value` under `formatting`.
///
/// Invalid number options fall back to the plain value.
#[must_use]
pub fn format_cell(value: &CellValue, formatting: Option<&CellFormatting>) -> FormattedCell {
    let Some(formatting) = formatting else {
        return FormattedCell {
            text: value.to_string(),
            style: None,
        };
    };

    let body = match (value, &formatting.date, &formatting.number) {
        (_, Some(_), _) => value.to_string(),
        (CellValue::Number(n), None, Some(number)) => match number.format(*n) {
            Ok(text) => text,
            Err(_err) => {
                crate::warn!(error = %_err, "number formatting rejected; using plain value");
                value.to_string()
            }
        },
        _ => value.to_string(),
    };

    let mut text = String::with_capacity(body.len());
    if let Some(prefix) = &formatting.prefix {
        text.push_str(prefix);
    }
    text.push_str(&body);
    if let Some(suffix) = &formatting.suffix {
        text.push_str(suffix);
    }

    FormattedCell {
        text,
        style: formatting.style.as_ref().map(|rules| rules.resolve(value).clone()),
    }
}
