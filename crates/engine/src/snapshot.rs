//! Tabular snapshots of a sample grid, and the cell writes the engine asks
//! the grid to apply.

use serde::{Deserialize, Serialize};

use crate::cell::CellValue;
use crate::sample::Sample;
use crate::schema::SchemaVariant;

/// Rows of cells in the variant's column order. The TPM column may be
/// present; it is display-only and ignored when reconciling.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GridSnapshot {
    pub rows: Vec<Vec<CellValue>>,
}

/// A single cell write for the caller's grid widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridPatch {
    pub row: usize,
    pub col: usize,
    pub value: CellValue,
}

impl GridSnapshot {
    pub fn new(rows: Vec<Vec<CellValue>>) -> Self {
        Self { rows }
    }

    /// Build a snapshot from raw text rows, coercing each cell.
    pub fn from_text_rows<R, S>(rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(|c| CellValue::from_input(c.as_ref())).collect())
                .collect(),
        }
    }

    /// Render a sample as the grid shows it, TPM column included.
    pub fn from_sample(sample: &Sample) -> Self {
        let fields = sample.variant.fields();
        let rows = (0..sample.row_count())
            .map(|row| fields.iter().map(|f| sample.cell(row, *f)).collect())
            .collect();
        Self { rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Cell at (row, col); missing cells read as empty.
    pub fn get(&self, row: usize, col: usize) -> &CellValue {
        const EMPTY: &CellValue = &CellValue::Empty;
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(EMPTY)
    }

    /// Write a cell, widening the row if needed. Writes past the last row
    /// are dropped.
    pub fn set(&mut self, row: usize, col: usize, value: CellValue) -> bool {
        match self.rows.get_mut(row) {
            Some(cells) => {
                if cells.len() <= col {
                    cells.resize(col + 1, CellValue::Empty);
                }
                cells[col] = value;
                true
            }
            None => false,
        }
    }

    pub fn apply(&mut self, patches: &[GridPatch]) {
        for patch in patches {
            self.set(patch.row, patch.col, patch.value.clone());
        }
    }

    /// Number of cells that differ from `other`, ignoring the TPM column.
    pub fn diff_count(&self, other: &GridSnapshot, variant: SchemaVariant) -> usize {
        let rows = self.rows.len().max(other.rows.len());
        let cols = variant.tpm_col();
        (0..rows)
            .flat_map(|r| (0..cols).map(move |c| (r, c)))
            .filter(|(r, c)| !same_cell(self.get(*r, *c), other.get(*r, *c)))
            .count()
    }
}

/// Cell equality where blank text counts as empty.
pub(crate) fn same_cell(a: &CellValue, b: &CellValue) -> bool {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => true,
        (false, false) => a == b,
        _ => false,
    }
}
