//! Field layouts for the two kinds of test.
//!
//! A schema variant is fixed for the lifetime of a test. It decides which
//! measurement fields a sample carries, the order they appear in the grid,
//! and how many columns each sample occupies in the persisted sheet.

use serde::{Deserialize, Serialize};

use crate::cell::CellValue;

/// Test names that select the user-simulation layout.
const USER_SIMULATION_NAMES: &[&str] = &["User Test Simulation", "User Simulation Test"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaVariant {
    #[default]
    Standard,
    UserSimulation,
}

/// A measurement column. `Smell` doubles as "Failure" in user simulation tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Chronography,
    Puffs,
    BeforeWeight,
    AfterWeight,
    DrawPressure,
    Resistance,
    Smell,
    Clog,
    Notes,
    Tpm,
}

const STANDARD_FIELDS: &[Field] = &[
    Field::Puffs,
    Field::BeforeWeight,
    Field::AfterWeight,
    Field::DrawPressure,
    Field::Resistance,
    Field::Smell,
    Field::Clog,
    Field::Notes,
    Field::Tpm,
];

const USER_SIMULATION_FIELDS: &[Field] = &[
    Field::Chronography,
    Field::Puffs,
    Field::BeforeWeight,
    Field::AfterWeight,
    Field::DrawPressure,
    Field::Smell,
    Field::Notes,
    Field::Tpm,
];

impl SchemaVariant {
    /// Resolve the variant from a test (sheet) name.
    pub fn for_test_name(name: &str) -> Self {
        if USER_SIMULATION_NAMES.contains(&name.trim()) {
            SchemaVariant::UserSimulation
        } else {
            SchemaVariant::Standard
        }
    }

    /// All fields in grid / sheet column order, TPM last.
    pub fn fields(&self) -> &'static [Field] {
        match self {
            SchemaVariant::Standard => STANDARD_FIELDS,
            SchemaVariant::UserSimulation => USER_SIMULATION_FIELDS,
        }
    }

    /// Editable measurement fields (everything except the derived TPM).
    pub fn data_fields(&self) -> &'static [Field] {
        let fields = self.fields();
        &fields[..fields.len() - 1]
    }

    /// Columns reserved per sample block in the persisted sheet.
    pub fn columns_per_sample(&self) -> usize {
        match self {
            SchemaVariant::Standard => 12,
            SchemaVariant::UserSimulation => 8,
        }
    }

    /// Column of `field` within a sample block / grid row.
    pub fn column_of(&self, field: Field) -> Option<usize> {
        self.fields().iter().position(|f| *f == field)
    }

    /// Field shown in grid column `col`, if any.
    pub fn field_at(&self, col: usize) -> Option<Field> {
        self.fields().get(col).copied()
    }

    pub fn has_field(&self, field: Field) -> bool {
        self.fields().contains(&field)
    }

    pub fn puffs_col(&self) -> usize {
        match self {
            SchemaVariant::Standard => 0,
            SchemaVariant::UserSimulation => 1,
        }
    }

    pub fn before_weight_col(&self) -> usize {
        self.puffs_col() + 1
    }

    pub fn after_weight_col(&self) -> usize {
        self.puffs_col() + 2
    }

    pub fn tpm_col(&self) -> usize {
        self.fields().len() - 1
    }

    /// Fields whose presence makes an imported row meaningful.
    pub fn key_fields(&self) -> &'static [Field] {
        match self {
            SchemaVariant::Standard => &[Field::Puffs, Field::BeforeWeight, Field::AfterWeight],
            SchemaVariant::UserSimulation => &[
                Field::Chronography,
                Field::Puffs,
                Field::BeforeWeight,
                Field::AfterWeight,
            ],
        }
    }

    /// Header label for the grid / sheet column of `field`.
    pub fn label(&self, field: Field) -> &'static str {
        match (self, field) {
            (SchemaVariant::UserSimulation, Field::Smell) => "Failure",
            (_, f) => f.label(),
        }
    }
}

impl Field {
    /// Whether values are coerced to numbers when parseable.
    pub fn is_numeric(&self) -> bool {
        !matches!(self, Field::Notes | Field::Chronography)
    }

    /// Normalize a cell for storage in this field: numeric fields turn
    /// parseable text into numbers, text fields keep numbers as text.
    pub fn coerce(&self, value: &CellValue) -> CellValue {
        match value {
            CellValue::Empty => CellValue::Empty,
            CellValue::Text(s) if self.is_numeric() => CellValue::from_input(s),
            CellValue::Text(s) => CellValue::text_from_input(s),
            CellValue::Number(n) if self.is_numeric() => CellValue::Number(*n),
            CellValue::Number(_) => CellValue::Text(value.raw_display()),
        }
    }

    /// Coerce raw grid input for this field.
    pub fn parse_input(&self, input: &str) -> CellValue {
        if self.is_numeric() {
            CellValue::from_input(input)
        } else {
            CellValue::text_from_input(input)
        }
    }

    pub fn is_weight(&self) -> bool {
        matches!(self, Field::BeforeWeight | Field::AfterWeight)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Field::Chronography => "Chronography",
            Field::Puffs => "Puffs",
            Field::BeforeWeight => "Before Weight (g)",
            Field::AfterWeight => "After Weight (g)",
            Field::DrawPressure => "Draw Pressure (kPa)",
            Field::Resistance => "Resistance (Ohms)",
            Field::Smell => "Smell",
            Field::Clog => "Clog",
            Field::Notes => "Notes",
            Field::Tpm => "TPM (mg/puff)",
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Field::Chronography => "chronography",
            Field::Puffs => "puffs",
            Field::BeforeWeight => "before_weight",
            Field::AfterWeight => "after_weight",
            Field::DrawPressure => "draw_pressure",
            Field::Resistance => "resistance",
            Field::Smell => "smell",
            Field::Clog => "clog",
            Field::Notes => "notes",
            Field::Tpm => "tpm",
        }
    }
}

impl std::fmt::Display for SchemaVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Standard => write!(f, "standard"),
            Self::UserSimulation => write!(f, "user_simulation"),
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}
