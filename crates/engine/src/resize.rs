//! Growing and shrinking the sample list of a test.

use crate::error::EngineError;
use crate::events::{EngineEvent, SamplesResizedEvent};
use crate::sample::{Sample, SampleId};
use crate::snapshot::GridSnapshot;
use crate::test_run::TestRun;

/// Which samples a resize created or dropped, so the caller can rebuild its
/// per-sample views.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResizeReport {
    pub added: Vec<SampleId>,
    pub removed: Vec<SampleId>,
    pub num_samples: usize,
}

impl ResizeReport {
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

impl TestRun {
    /// Change the number of samples. New samples are templates; samples at
    /// index `new_count` and above are removed with their grid baselines.
    pub fn resize(&mut self, new_count: usize) -> Result<ResizeReport, EngineError> {
        if new_count == 0 {
            return Err(EngineError::InvalidSampleCount(new_count));
        }

        let old_count = self.samples.len();
        let mut report = ResizeReport {
            num_samples: new_count,
            ..ResizeReport::default()
        };

        if new_count > old_count {
            for index in old_count..new_count {
                let id = SampleId::from_index(index);
                let sample = Sample::template(
                    id,
                    self.variant,
                    self.options.template_rows,
                    self.options.puff_interval,
                );
                self.previous.insert(id, GridSnapshot::from_sample(&sample));
                self.samples.push(sample);
                report.added.push(id);
            }
        } else if new_count < old_count {
            for sample in self.samples.drain(new_count..) {
                self.previous.remove(&sample.id);
                report.removed.push(sample.id);
            }
        }

        if report.is_noop() {
            return Ok(report);
        }

        log::info!(
            "{}: resized from {} to {} samples (+{} / -{})",
            self.name,
            old_count,
            new_count,
            report.added.len(),
            report.removed.len()
        );
        self.events.push(EngineEvent::SamplesResized(SamplesResizedEvent {
            added: report.added.clone(),
            removed: report.removed.clone(),
            num_samples: new_count,
        }));
        self.mark_unsaved();
        Ok(report)
    }
}
