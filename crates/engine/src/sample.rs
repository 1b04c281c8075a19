//! Canonical per-sample measurement record.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cell::CellValue;
use crate::schema::{Field, SchemaVariant};

/// Rows pre-populated for a fresh sample.
pub const DEFAULT_TEMPLATE_ROWS: usize = 50;

/// 1-based sample index. Displays as `Sample {n}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SampleId(pub usize);

impl SampleId {
    /// Id for a 0-based position in the sample list.
    pub fn from_index(index: usize) -> Self {
        SampleId(index + 1)
    }

    /// 0-based position in the sample list.
    pub fn index(&self) -> usize {
        self.0.saturating_sub(1)
    }
}

impl std::fmt::Display for SampleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sample {}", self.0)
    }
}

/// Measurement data for one physical sample.
///
/// Every data field of the variant has one array; `tpm` runs parallel to
/// them. All arrays share the same length (see [`Sample::repair_lengths`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub id: SampleId,
    pub variant: SchemaVariant,
    columns: BTreeMap<Field, Vec<CellValue>>,
    pub tpm: Vec<Option<f64>>,
    pub avg_tpm: f64,
    pub current_row_index: usize,
    pub sample_notes: String,
}

impl Sample {
    /// Sample with no rows.
    pub fn empty(id: SampleId, variant: SchemaVariant) -> Self {
        let columns = variant
            .data_fields()
            .iter()
            .map(|f| (*f, Vec::new()))
            .collect();
        Self {
            id,
            variant,
            columns,
            tpm: Vec::new(),
            avg_tpm: 0.0,
            current_row_index: 0,
            sample_notes: String::new(),
        }
    }

    /// Sample with `rows` blank rows (puffs empty too).
    pub fn blank(id: SampleId, variant: SchemaVariant, rows: usize) -> Self {
        let mut sample = Self::empty(id, variant);
        for column in sample.columns.values_mut() {
            column.resize(rows, CellValue::Empty);
        }
        sample.tpm.resize(rows, None);
        sample
    }

    /// Sample with `rows` template rows: `puffs[i] = (i + 1) * puff_interval`.
    pub fn template(id: SampleId, variant: SchemaVariant, rows: usize, puff_interval: u32) -> Self {
        let mut sample = Self::blank(id, variant, rows);
        if let Some(puffs) = sample.columns.get_mut(&Field::Puffs) {
            for (i, cell) in puffs.iter_mut().enumerate() {
                *cell = CellValue::Number(((i as u64 + 1) * puff_interval as u64) as f64);
            }
        }
        sample
    }

    pub fn row_count(&self) -> usize {
        self.columns
            .values()
            .map(|c| c.len())
            .chain(std::iter::once(self.tpm.len()))
            .max()
            .unwrap_or(0)
    }

    /// Values of `field`. Fields the variant does not carry read as empty.
    pub fn column(&self, field: Field) -> &[CellValue] {
        self.columns.get(&field).map(|c| c.as_slice()).unwrap_or(&[])
    }

    pub fn puffs(&self) -> &[CellValue] {
        self.column(Field::Puffs)
    }

    pub fn before_weight(&self) -> &[CellValue] {
        self.column(Field::BeforeWeight)
    }

    pub fn after_weight(&self) -> &[CellValue] {
        self.column(Field::AfterWeight)
    }

    pub fn cell(&self, row: usize, field: Field) -> CellValue {
        if field == Field::Tpm {
            return match self.tpm.get(row).copied().flatten() {
                Some(n) => CellValue::Number(n),
                None => CellValue::Empty,
            };
        }
        self.column(field).get(row).cloned().unwrap_or_default()
    }

    /// Write a data cell, growing every array if `row` is past the end.
    /// Writes to TPM or to fields the variant lacks are ignored.
    pub fn set_cell(&mut self, row: usize, field: Field, value: CellValue) -> bool {
        if !self.columns.contains_key(&field) {
            return false;
        }
        if row >= self.row_count() {
            self.resize_rows(row + 1);
        }
        if let Some(column) = self.columns.get_mut(&field) {
            column[row] = value;
            return true;
        }
        false
    }

    /// Append one row. Fields not given stay empty.
    pub fn push_row(&mut self, values: impl IntoIterator<Item = (Field, CellValue)>, tpm: Option<f64>) {
        let row = self.row_count();
        self.resize_rows(row + 1);
        for (field, value) in values {
            if let Some(column) = self.columns.get_mut(&field) {
                column[row] = value;
            }
        }
        self.tpm[row] = tpm;
    }

    /// Drop every row, keeping notes and cursor.
    pub fn clear_rows(&mut self) {
        for column in self.columns.values_mut() {
            column.clear();
        }
        self.tpm.clear();
        self.avg_tpm = 0.0;
    }

    /// Blank every field except puffs and reset TPM. Row count is kept.
    pub fn clear_measurements(&mut self) {
        for (field, column) in self.columns.iter_mut() {
            if *field != Field::Puffs {
                column.iter_mut().for_each(|cell| *cell = CellValue::Empty);
            }
        }
        self.tpm.iter_mut().for_each(|t| *t = None);
        self.avg_tpm = 0.0;
    }

    /// Whole puffs in the last numeric puff cell, 0 if there is none.
    pub fn last_puff_count(&self) -> i64 {
        self.puffs()
            .iter()
            .rev()
            .find_map(CellValue::as_number)
            .map(|n| n.trunc() as i64)
            .unwrap_or(0)
    }

    /// Append `count` blank rows. Their puffs continue from
    /// [`Sample::last_puff_count`] in steps of `puff_interval`; a count that
    /// would overflow is left empty.
    pub fn append_rows(&mut self, count: usize, puff_interval: u32) {
        let last = self.last_puff_count();
        let start = self.row_count();
        self.resize_rows(start + count);
        if let Some(puffs) = self.columns.get_mut(&Field::Puffs) {
            for (step, cell) in puffs[start..].iter_mut().enumerate() {
                *cell = (step as i64 + 1)
                    .checked_mul(puff_interval as i64)
                    .and_then(|offset| last.checked_add(offset))
                    .map(|n| CellValue::Number(n as f64))
                    .unwrap_or_default();
            }
        }
    }

    fn resize_rows(&mut self, rows: usize) {
        for column in self.columns.values_mut() {
            column.resize(rows, CellValue::Empty);
        }
        self.tpm.resize(rows, None);
    }

    /// Pad shorter arrays so every array has the same length.
    /// Returns true if anything had to be padded.
    pub fn repair_lengths(&mut self) -> bool {
        let target = self.row_count();
        let ragged = self.columns.values().any(|c| c.len() != target) || self.tpm.len() != target;
        if ragged {
            log::warn!("{}: padding ragged field arrays to {} rows", self.id, target);
            self.resize_rows(target);
        }
        ragged
    }

    /// True if any non-puff field on `row` holds data (TPM included).
    pub fn row_has_data(&self, row: usize) -> bool {
        self.variant
            .data_fields()
            .iter()
            .filter(|f| **f != Field::Puffs)
            .any(|f| !self.cell(row, *f).is_empty())
            || self.tpm.get(row).copied().flatten().is_some()
    }

    /// Number of rows with at least one non-puff value.
    pub fn populated_rows(&self) -> usize {
        (0..self.row_count()).filter(|r| self.row_has_data(*r)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_id_display() {
        assert_eq!(SampleId(3).to_string(), "Sample 3");
        assert_eq!(SampleId::from_index(0), SampleId(1));
        assert_eq!(SampleId(4).index(), 3);
    }

    #[test]
    fn test_template_rows() {
        let s = Sample::template(SampleId(1), SchemaVariant::Standard, 50, 10);
        assert_eq!(s.row_count(), 50);
        assert_eq!(s.puffs()[0], CellValue::Number(10.0));
        assert_eq!(s.puffs()[49], CellValue::Number(500.0));
        assert!(s.before_weight().iter().all(|c| c.is_empty()));
        assert!(s.tpm.iter().all(|t| t.is_none()));
        assert_eq!(s.avg_tpm, 0.0);
        assert_eq!(s.populated_rows(), 0);
    }

    #[test]
    fn test_user_simulation_template_has_chronography() {
        let s = Sample::template(SampleId(2), SchemaVariant::UserSimulation, 50, 5);
        assert_eq!(s.column(Field::Chronography).len(), 50);
        assert!(s.column(Field::Resistance).is_empty());
        assert_eq!(s.puffs()[1], CellValue::Number(10.0));
    }

    #[test]
    fn test_set_cell_grows_all_arrays() {
        let mut s = Sample::empty(SampleId(1), SchemaVariant::Standard);
        assert!(s.set_cell(2, Field::Notes, CellValue::Text("leak".into())));
        assert_eq!(s.row_count(), 3);
        assert_eq!(s.puffs().len(), 3);
        assert_eq!(s.tpm.len(), 3);
        assert!(!s.set_cell(0, Field::Chronography, CellValue::Number(1.0)));
        assert!(!s.set_cell(0, Field::Tpm, CellValue::Number(1.0)));
    }

    #[test]
    fn test_repair_lengths_pads() {
        let mut s = Sample::blank(SampleId(1), SchemaVariant::Standard, 2);
        s.tpm.push(Some(1.0));
        assert!(s.repair_lengths());
        assert_eq!(s.puffs().len(), 3);
        assert_eq!(s.column(Field::Notes).len(), 3);
        assert!(!s.repair_lengths());
    }

    #[test]
    fn test_row_has_data_ignores_puffs() {
        let mut s = Sample::template(SampleId(1), SchemaVariant::Standard, 3, 10);
        assert!(!s.row_has_data(0));
        s.set_cell(1, Field::DrawPressure, CellValue::Number(2.1));
        assert!(s.row_has_data(1));
        s.tpm[2] = Some(50.0);
        assert!(s.row_has_data(2));
    }

    #[test]
    fn test_serde_round_trip() {
        let mut s = Sample::template(SampleId(2), SchemaVariant::UserSimulation, 2, 10);
        s.set_cell(0, Field::Chronography, CellValue::Text("00:30".into()));
        s.tpm[1] = Some(12.5);
        let json = serde_json::to_string(&s).unwrap();
        let back: Sample = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn test_append_rows_continues_puffs() {
        let mut sample = Sample::template(SampleId(1), SchemaVariant::Standard, 3, 10);
        sample.set_cell(2, Field::Puffs, CellValue::Text("n/a".into()));
        sample.append_rows(2, 5);
        assert_eq!(sample.row_count(), 5);
        assert_eq!(sample.puffs()[3], CellValue::Number(25.0));
        assert_eq!(sample.puffs()[4], CellValue::Number(30.0));
        assert_eq!(sample.tpm.len(), 5);
        assert_eq!(sample.cell(4, Field::Notes), CellValue::Empty);
    }

    #[test]
    fn test_append_rows_to_empty_sample_starts_at_interval() {
        let mut sample = Sample::empty(SampleId(1), SchemaVariant::UserSimulation);
        sample.append_rows(1, 10);
        assert_eq!(sample.puffs(), &[CellValue::Number(10.0)]);
        assert_eq!(sample.column(Field::Chronography).len(), 1);
    }

    #[test]
    fn test_clear_measurements_keeps_puffs() {
        let mut sample = Sample::template(SampleId(1), SchemaVariant::Standard, 2, 10);
        sample.set_cell(0, Field::BeforeWeight, CellValue::Number(2.0));
        sample.set_cell(0, Field::Clog, CellValue::Text("yes".into()));
        sample.tpm[0] = Some(5.0);
        sample.avg_tpm = 5.0;
        sample.sample_notes = "kept".into();

        sample.clear_measurements();
        assert_eq!(sample.row_count(), 2);
        assert_eq!(sample.puffs()[0], CellValue::Number(10.0));
        assert_eq!(sample.cell(0, Field::BeforeWeight), CellValue::Empty);
        assert_eq!(sample.cell(0, Field::Clog), CellValue::Empty);
        assert_eq!(sample.tpm, vec![None, None]);
        assert_eq!(sample.avg_tpm, 0.0);
        assert_eq!(sample.sample_notes, "kept");
    }
}
