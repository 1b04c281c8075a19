//! Advisory checks for weight entries.
//!
//! Nothing here blocks an edit. The UI decides whether to warn, and the
//! store accepts the value either way.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::sample::Sample;
use crate::schema::Field;

/// Plausible weight range in grams, inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightBounds {
    pub min: f64,
    pub max: f64,
}

impl Default for WeightBounds {
    fn default() -> Self {
        Self { min: 0.001, max: 100.0 }
    }
}

impl WeightBounds {
    pub fn contains(&self, grams: f64) -> bool {
        grams >= self.min && grams <= self.max
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WeightCheck {
    Ok,
    /// Blank input is always allowed.
    Empty,
    NotANumber(String),
    OutOfRange { value: f64, bounds: WeightBounds },
    /// After-weight is not below the row's before-weight.
    NotBelowBefore { after: f64, before: f64 },
    /// Before-weight is not above the row's after-weight.
    NotAboveAfter { before: f64, after: f64 },
}

impl WeightCheck {
    /// True for `Ok` and `Empty`.
    pub fn is_acceptable(&self) -> bool {
        matches!(self, WeightCheck::Ok | WeightCheck::Empty)
    }
}

impl fmt::Display for WeightCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Empty => write!(f, "empty"),
            Self::NotANumber(input) => write!(f, "invalid weight '{input}': must be a number"),
            Self::OutOfRange { value, bounds } => {
                write!(f, "weight {value}g outside {}g..{}g", bounds.min, bounds.max)
            }
            Self::NotBelowBefore { after, before } => {
                write!(f, "after weight ({after}g) should be less than before weight ({before}g)")
            }
            Self::NotAboveAfter { before, after } => {
                write!(f, "before weight ({before}g) should be greater than after weight ({after}g)")
            }
        }
    }
}

/// Check a value about to be entered into `field` on `row`. Fields other
/// than the two weights always pass.
pub fn validate_weight_entry(
    sample: &Sample,
    row: usize,
    field: Field,
    input: &str,
    bounds: &WeightBounds,
) -> WeightCheck {
    if !field.is_weight() {
        return WeightCheck::Ok;
    }

    let trimmed = input.trim();
    if trimmed.is_empty() {
        return WeightCheck::Empty;
    }

    let value = match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => {
            log::warn!("{}: invalid weight '{}' at row {}", sample.id, trimmed, row);
            return WeightCheck::NotANumber(trimmed.to_string());
        }
    };

    if !bounds.contains(value) {
        log::warn!("{}: weight {}g at row {} looks unreasonable", sample.id, value, row);
        return WeightCheck::OutOfRange { value, bounds: *bounds };
    }

    let check = match field {
        Field::AfterWeight => match sample.cell(row, Field::BeforeWeight).as_number() {
            Some(before) if value >= before => WeightCheck::NotBelowBefore { after: value, before },
            _ => WeightCheck::Ok,
        },
        Field::BeforeWeight => match sample.cell(row, Field::AfterWeight).as_number() {
            Some(after) if value <= after => WeightCheck::NotAboveAfter { before: value, after },
            _ => WeightCheck::Ok,
        },
        _ => WeightCheck::Ok,
    };
    if !check.is_acceptable() {
        log::warn!("{}: row {}: {}", sample.id, row, check);
    }
    check
}
