//! A test run: the ordered samples of one test plus the state needed to
//! reconcile grid edits against them.

use std::collections::BTreeMap;

use crate::cell::CellValue;
use crate::error::EngineError;
use crate::events::{EngineEvent, EventCollector, TpmUpdatedEvent};
use crate::reconcile::{reconcile, ReconcileContext};
use crate::sample::{Sample, SampleId, DEFAULT_TEMPLATE_ROWS};
use crate::schema::{Field, SchemaVariant};
use crate::snapshot::{GridPatch, GridSnapshot};
use crate::tpm::{self, TpmPrecision};

pub const DEFAULT_PUFF_INTERVAL: u32 = 10;

/// Per-test knobs, usually taken from settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TestOptions {
    pub puff_interval: u32,
    pub precision: TpmPrecision,
    pub template_rows: usize,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            puff_interval: DEFAULT_PUFF_INTERVAL,
            precision: TpmPrecision::default(),
            template_rows: DEFAULT_TEMPLATE_ROWS,
        }
    }
}

/// What a grid sync did, for the caller to mirror in its widget.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncOutcome {
    pub patches: Vec<GridPatch>,
    pub progressed_rows: Vec<usize>,
    pub filled_puff_rows: Vec<usize>,
    pub avg_tpm: f64,
    pub changed: bool,
}

#[derive(Debug)]
pub struct TestRun {
    pub(crate) name: String,
    pub(crate) variant: SchemaVariant,
    pub(crate) options: TestOptions,
    pub(crate) samples: Vec<Sample>,
    /// Last grid state each sample was reconciled against.
    pub(crate) previous: BTreeMap<SampleId, GridSnapshot>,
    pub(crate) unsaved: bool,
    pub(crate) events: EventCollector,
}

fn check_interval(puff_interval: u32) -> Result<(), EngineError> {
    if puff_interval == 0 {
        return Err(EngineError::InvalidPuffInterval(puff_interval));
    }
    Ok(())
}

impl TestRun {
    /// New test with `num_samples` template samples.
    pub fn new(
        name: impl Into<String>,
        variant: SchemaVariant,
        num_samples: usize,
        options: TestOptions,
    ) -> Result<Self, EngineError> {
        if num_samples == 0 {
            return Err(EngineError::InvalidSampleCount(num_samples));
        }
        check_interval(options.puff_interval)?;
        let samples = (0..num_samples)
            .map(|i| Sample::template(SampleId::from_index(i), variant, options.template_rows, options.puff_interval))
            .collect();
        Self::from_samples(name, variant, samples, options)
    }

    /// Wrap already-populated samples. Ids are reassigned by position.
    pub fn from_samples(
        name: impl Into<String>,
        variant: SchemaVariant,
        samples: Vec<Sample>,
        options: TestOptions,
    ) -> Result<Self, EngineError> {
        if samples.is_empty() {
            return Err(EngineError::InvalidSampleCount(0));
        }
        check_interval(options.puff_interval)?;

        let mut run = Self {
            name: name.into(),
            variant,
            options,
            samples,
            previous: BTreeMap::new(),
            unsaved: false,
            events: EventCollector::new(),
        };
        for (i, sample) in run.samples.iter_mut().enumerate() {
            sample.id = SampleId::from_index(i);
            sample.variant = variant;
            sample.repair_lengths();
        }
        for i in 0..run.samples.len() {
            run.reset_snapshot_at(i);
        }
        Ok(run)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn variant(&self) -> SchemaVariant {
        self.variant
    }

    pub fn options(&self) -> TestOptions {
        self.options
    }

    pub fn puff_interval(&self) -> u32 {
        self.options.puff_interval
    }

    pub fn precision(&self) -> TpmPrecision {
        self.options.precision
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn num_samples(&self) -> usize {
        self.samples.len()
    }

    pub fn sample_ids(&self) -> Vec<SampleId> {
        self.samples.iter().map(|s| s.id).collect()
    }

    pub(crate) fn position(&self, id: SampleId) -> Result<usize, EngineError> {
        self.samples
            .iter()
            .position(|s| s.id == id)
            .ok_or(EngineError::UnknownSample(id))
    }

    pub fn sample(&self, id: SampleId) -> Result<&Sample, EngineError> {
        let idx = self.position(id)?;
        Ok(&self.samples[idx])
    }

    /// The sample as the grid should display it.
    pub fn grid(&self, id: SampleId) -> Result<GridSnapshot, EngineError> {
        Ok(GridSnapshot::from_sample(self.sample(id)?))
    }

    pub fn previous_snapshot(&self, id: SampleId) -> Option<&GridSnapshot> {
        self.previous.get(&id)
    }

    pub(crate) fn reset_snapshot_at(&mut self, idx: usize) {
        let sample = &self.samples[idx];
        self.previous.insert(sample.id, GridSnapshot::from_sample(sample));
    }

    /// Forget pending grid edits: the next sync diffs against the sample as
    /// it is now.
    pub fn reset_snapshot(&mut self, id: SampleId) -> Result<(), EngineError> {
        let idx = self.position(id)?;
        self.reset_snapshot_at(idx);
        Ok(())
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.unsaved
    }

    pub(crate) fn mark_unsaved(&mut self) {
        if !self.unsaved {
            self.unsaved = true;
            self.events.push(EngineEvent::UnsavedChanges);
        }
    }

    pub fn mark_saved(&mut self) {
        self.unsaved = false;
    }

    pub fn events(&self) -> &EventCollector {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        self.events.drain()
    }

    pub(crate) fn push_tpm_event(&mut self, idx: usize) {
        let sample = &self.samples[idx];
        let valid_rows = sample.tpm.iter().filter(|t| t.is_some()).count();
        self.events.push(EngineEvent::TpmUpdated(TpmUpdatedEvent {
            sample: sample.id,
            avg_tpm: sample.avg_tpm,
            valid_rows,
        }));
    }

    /// Change the puff interval used for auto-fill and new templates.
    /// Existing puff counts are left alone.
    pub fn set_puff_interval(&mut self, puff_interval: u32) -> Result<(), EngineError> {
        check_interval(puff_interval)?;
        self.options.puff_interval = puff_interval;
        Ok(())
    }

    fn reconcile_context(&self) -> ReconcileContext {
        ReconcileContext {
            puff_interval: self.options.puff_interval,
            precision: self.options.precision,
        }
    }

    /// Reconcile an edited grid for one sample and adopt the result.
    pub fn sync_grid(&mut self, id: SampleId, snapshot: &GridSnapshot) -> Result<SyncOutcome, EngineError> {
        let idx = self.position(id)?;
        let ctx = self.reconcile_context();
        let result = reconcile(self.previous.get(&id), snapshot, &self.samples[idx], &ctx);

        if !result.progressed_rows.is_empty() {
            log::info!("{}: auto-progressed rows {:?}", id, result.progressed_rows);
        }

        self.samples[idx] = result.sample;
        self.previous.insert(id, result.snapshot);

        if result.changed {
            self.push_tpm_event(idx);
            self.mark_unsaved();
        }

        Ok(SyncOutcome {
            patches: result.patches,
            progressed_rows: result.progressed_rows,
            filled_puff_rows: result.filled_puff_rows,
            avg_tpm: self.samples[idx].avg_tpm,
            changed: result.changed,
        })
    }

    /// Single-cell edit. The input is coerced for `field` and TPM is
    /// recomputed from `row` on. Returns false when `field` is TPM or not
    /// part of the variant.
    pub fn set_cell(&mut self, id: SampleId, row: usize, field: Field, input: &str) -> Result<bool, EngineError> {
        let idx = self.position(id)?;
        let rows = self.samples[idx].row_count();
        if row >= rows {
            return Err(EngineError::RowOutOfRange { sample: id, row, rows });
        }
        if field == Field::Tpm || !self.variant.has_field(field) {
            log::warn!("{}: ignoring write to {} field", id, field);
            return Ok(false);
        }

        let value = field.parse_input(input);
        let old = self.samples[idx].cell(row, field);
        if old == value {
            return Ok(true);
        }

        let precision = self.options.precision;
        let sample = &mut self.samples[idx];
        sample.set_cell(row, field, value.clone());
        if matches!(field, Field::Puffs | Field::BeforeWeight | Field::AfterWeight) {
            tpm::recompute_from(sample, row, precision);
        }

        // Keep the sync baseline in step so this edit is not seen twice.
        if let (Some(previous), Some(col)) = (self.previous.get_mut(&id), self.variant.column_of(field)) {
            previous.set(row, col, value);
        }

        if field.is_weight() || field == Field::Puffs {
            self.push_tpm_event(idx);
        }
        self.mark_unsaved();
        Ok(true)
    }

    /// Bulk recompute of every sample. Returns the number of samples with at
    /// least one TPM value.
    pub fn recalculate_all(&mut self) -> usize {
        let precision = self.options.precision;
        let mut with_values = 0;
        for idx in 0..self.samples.len() {
            if tpm::recalculate(&mut self.samples[idx], precision) {
                with_values += 1;
            }
            self.push_tpm_event(idx);
        }
        with_values
    }

    /// Move the sample's entry cursor, clamped to its rows.
    pub fn set_current_row(&mut self, id: SampleId, row: usize) -> Result<(), EngineError> {
        let idx = self.position(id)?;
        let sample = &mut self.samples[idx];
        sample.current_row_index = row.min(sample.row_count().saturating_sub(1));
        Ok(())
    }

    pub fn set_sample_notes(&mut self, id: SampleId, notes: impl Into<String>) -> Result<(), EngineError> {
        let idx = self.position(id)?;
        self.samples[idx].sample_notes = notes.into();
        self.mark_unsaved();
        Ok(())
    }

    /// Read-only view of one cell, TPM included.
    pub fn cell(&self, id: SampleId, row: usize, field: Field) -> Result<CellValue, EngineError> {
        Ok(self.sample(id)?.cell(row, field))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(samples: usize) -> TestRun {
        TestRun::new("Quick Screening Test", SchemaVariant::Standard, samples, TestOptions::default()).unwrap()
    }

    fn typed(run: &TestRun, id: SampleId, row: usize, col: usize, input: &str) -> GridSnapshot {
        let mut grid = run.previous_snapshot(id).unwrap().clone();
        grid.set(row, col, CellValue::from_input(input));
        grid
    }

    #[test]
    fn test_new_builds_templates() {
        let run = run(3);
        assert_eq!(run.num_samples(), 3);
        assert_eq!(run.sample_ids(), vec![SampleId(1), SampleId(2), SampleId(3)]);
        let s = run.sample(SampleId(2)).unwrap();
        assert_eq!(s.row_count(), 50);
        assert_eq!(s.puffs()[4], CellValue::Number(50.0));
        assert!(run.previous_snapshot(SampleId(3)).is_some());
        assert!(!run.has_unsaved_changes());
    }

    #[test]
    fn test_new_rejects_bad_options() {
        assert_eq!(
            TestRun::new("t", SchemaVariant::Standard, 0, TestOptions::default()).unwrap_err(),
            EngineError::InvalidSampleCount(0)
        );
        let options = TestOptions { puff_interval: 0, ..TestOptions::default() };
        assert_eq!(
            TestRun::new("t", SchemaVariant::Standard, 1, options).unwrap_err(),
            EngineError::InvalidPuffInterval(0)
        );
    }

    #[test]
    fn test_sync_grid_progression_sequence() {
        let samples = vec![Sample::blank(SampleId(1), SchemaVariant::Standard, 50)];
        let mut run = TestRun::from_samples("t", SchemaVariant::Standard, samples, TestOptions::default()).unwrap();
        let id = SampleId(1);

        let grid = typed(&run, id, 0, 1, "2.0");
        let out = run.sync_grid(id, &grid).unwrap();
        assert!(out.changed);
        assert_eq!(run.sample(id).unwrap().puffs()[0], CellValue::Number(10.0));

        let grid = typed(&run, id, 0, 2, "1.5");
        let out = run.sync_grid(id, &grid).unwrap();
        assert_eq!(out.progressed_rows, vec![0]);
        assert_eq!(out.avg_tpm, 50.0);
        let s = run.sample(id).unwrap();
        assert_eq!(s.before_weight()[1], CellValue::Number(1.5));
        assert_eq!(s.puffs()[1], CellValue::Number(20.0));

        // Baseline now holds the patched grid.
        let baseline = run.previous_snapshot(id).unwrap();
        assert_eq!(baseline.get(1, 1), &CellValue::Number(1.5));
        assert_eq!(baseline.get(1, 0), &CellValue::Number(20.0));
    }

    #[test]
    fn test_sync_grid_emits_events_once_unsaved() {
        let mut run = run(1);
        let id = SampleId(1);
        let grid = typed(&run, id, 0, 1, "2.0");
        run.sync_grid(id, &grid).unwrap();
        let grid = typed(&run, id, 0, 2, "1.0");
        run.sync_grid(id, &grid).unwrap();

        let events = run.drain_events();
        let unsaved = events.iter().filter(|e| **e == EngineEvent::UnsavedChanges).count();
        assert_eq!(unsaved, 1);
        match events.last() {
            Some(EngineEvent::TpmUpdated(e)) => {
                assert_eq!(e.sample, id);
                assert_eq!(e.avg_tpm, 100.0);
                assert_eq!(e.valid_rows, 1);
            }
            other => panic!("unexpected last event {:?}", other),
        }
        assert!(run.has_unsaved_changes());
        run.mark_saved();
        assert!(!run.has_unsaved_changes());
    }

    #[test]
    fn test_sync_unchanged_grid_is_quiet() {
        let mut run = run(1);
        let grid = run.grid(SampleId(1)).unwrap();
        let out = run.sync_grid(SampleId(1), &grid).unwrap();
        assert!(!out.changed);
        assert!(out.patches.is_empty());
        assert!(run.events().is_empty());
    }

    #[test]
    fn test_unknown_sample() {
        let mut run = run(2);
        let grid = GridSnapshot::default();
        assert_eq!(run.sync_grid(SampleId(5), &grid).unwrap_err(), EngineError::UnknownSample(SampleId(5)));
        assert!(run.sample(SampleId(0)).is_err());
    }

    #[test]
    fn test_set_cell_recomputes_from_row() {
        let mut run = run(1);
        let id = SampleId(1);
        run.set_cell(id, 0, Field::BeforeWeight, "3.0").unwrap();
        run.set_cell(id, 0, Field::AfterWeight, "2.0").unwrap();
        run.set_cell(id, 1, Field::BeforeWeight, "2.0").unwrap();
        run.set_cell(id, 1, Field::AfterWeight, "1.5").unwrap();
        assert_eq!(run.sample(id).unwrap().tpm[..2], [Some(100.0), Some(50.0)]);

        run.set_cell(id, 0, Field::Puffs, "5").unwrap();
        let s = run.sample(id).unwrap();
        assert_eq!(s.tpm[0], Some(200.0));
        assert_eq!(s.tpm[1], Some(33.333333));
        assert_eq!(run.cell(id, 0, Field::Tpm).unwrap(), CellValue::Number(200.0));

        // The baseline follows single-cell edits.
        assert_eq!(run.previous_snapshot(id).unwrap().get(0, 0), &CellValue::Number(5.0));
    }

    #[test]
    fn test_set_cell_rejects_rows_and_tpm() {
        let mut run = run(1);
        let id = SampleId(1);
        assert_eq!(
            run.set_cell(id, 50, Field::Notes, "x").unwrap_err(),
            EngineError::RowOutOfRange { sample: id, row: 50, rows: 50 }
        );
        assert!(!run.set_cell(id, 0, Field::Tpm, "1").unwrap());
        assert!(!run.set_cell(id, 0, Field::Chronography, "00:10").unwrap());
        assert!(run.set_cell(id, 0, Field::Notes, "12").unwrap());
        assert_eq!(run.cell(id, 0, Field::Notes).unwrap(), CellValue::Text("12".into()));
    }

    #[test]
    fn test_puff_interval_drives_auto_fill() {
        let mut run = run(1);
        run.set_puff_interval(5).unwrap();
        assert!(run.set_puff_interval(0).is_err());

        let id = SampleId(1);
        run.set_cell(id, 0, Field::Puffs, "").unwrap();
        run.set_cell(id, 1, Field::Puffs, "").unwrap();
        // Later rows still carry puff counts, so row 0 is not past the last puff.
        let grid = typed(&run, id, 0, 1, "1.0");
        run.sync_grid(id, &grid).unwrap();
        assert_eq!(run.sample(id).unwrap().puffs()[0], CellValue::Empty);
    }

    #[test]
    fn test_recalculate_all_counts_samples() {
        let mut run = run(2);
        run.set_cell(SampleId(2), 0, Field::BeforeWeight, "1.0").unwrap();
        run.set_cell(SampleId(2), 0, Field::AfterWeight, "0.5").unwrap();
        run.drain_events();
        assert_eq!(run.recalculate_all(), 1);
        assert_eq!(run.events().tpm_updated().len(), 2);
    }
}
