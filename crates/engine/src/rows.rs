//! Appending rows and clearing measurements.

use crate::error::EngineError;
use crate::events::{EngineEvent, RowsAddedEvent};
use crate::sample::SampleId;
use crate::test_run::TestRun;
use crate::tpm;

impl TestRun {
    /// Append `count` rows to every sample. Each sample's new puff counts
    /// continue from its own last puff count. Returns the row count of the
    /// longest sample afterwards.
    pub fn add_rows(&mut self, count: usize) -> usize {
        if count == 0 {
            return self.max_rows();
        }

        let interval = self.options.puff_interval;
        let precision = self.options.precision;
        for idx in 0..self.samples.len() {
            let sample = &mut self.samples[idx];
            let first_new = sample.row_count();
            sample.append_rows(count, interval);
            tpm::recompute_from(sample, first_new, precision);
            self.reset_snapshot_at(idx);
            self.push_tpm_event(idx);
        }

        let row_count = self.max_rows();
        log::info!("{}: added {} rows to {} samples, now {} rows", self.name, count, self.samples.len(), row_count);
        self.events.push(EngineEvent::RowsAdded(RowsAddedEvent { added: count, row_count }));
        self.mark_unsaved();
        row_count
    }

    /// Blank every measurement of one sample except its puff counts.
    pub fn clear_sample(&mut self, id: SampleId) -> Result<(), EngineError> {
        let idx = self.position(id)?;
        self.clear_at(idx);
        log::info!("{}: cleared {}", self.name, id);
        self.events.push(EngineEvent::SamplesCleared(vec![id]));
        self.mark_unsaved();
        Ok(())
    }

    /// Blank every measurement of every sample except puff counts.
    pub fn clear_all(&mut self) {
        for idx in 0..self.samples.len() {
            self.clear_at(idx);
        }
        log::info!("{}: cleared all {} samples", self.name, self.samples.len());
        let ids = self.sample_ids();
        self.events.push(EngineEvent::SamplesCleared(ids));
        self.mark_unsaved();
    }

    fn clear_at(&mut self, idx: usize) {
        self.samples[idx].clear_measurements();
        self.reset_snapshot_at(idx);
        self.push_tpm_event(idx);
    }

    fn max_rows(&self) -> usize {
        self.samples.iter().map(|s| s.row_count()).max().unwrap_or(0)
    }
}
