//! Change notifications emitted by a test run.
//!
//! The engine never talks to the UI directly. Each mutating operation queues
//! events; the caller drains them after the call and refreshes whatever
//! displays the averages, the title bar "unsaved" marker, or per-sample tabs.

use crate::sample::SampleId;

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// A sample's TPM column was recomputed.
    TpmUpdated(TpmUpdatedEvent),

    /// The test went from saved to unsaved.
    UnsavedChanges,

    /// Samples were added or removed.
    SamplesResized(SamplesResizedEvent),

    /// Rows were appended to every sample.
    RowsAdded(RowsAddedEvent),

    /// Measurements of these samples were blanked (puffs kept).
    SamplesCleared(Vec<SampleId>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TpmUpdatedEvent {
    pub sample: SampleId,
    pub avg_tpm: f64,
    /// Rows with a computable TPM.
    pub valid_rows: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SamplesResizedEvent {
    pub added: Vec<SampleId>,
    pub removed: Vec<SampleId>,
    pub num_samples: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowsAddedEvent {
    pub added: usize,
    /// Rows in the longest sample afterwards.
    pub row_count: usize,
}

/// Ordered event queue owned by a test run.
#[derive(Debug, Default)]
pub struct EventCollector {
    events: Vec<EngineEvent>,
}

impl EventCollector {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn push(&mut self, event: EngineEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[EngineEvent] {
        &self.events
    }

    /// Take every queued event, oldest first.
    pub fn drain(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn tpm_updated(&self) -> Vec<&TpmUpdatedEvent> {
        self.events
            .iter()
            .filter_map(|e| match e {
                EngineEvent::TpmUpdated(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    pub fn samples_resized(&self) -> Vec<&SamplesResizedEvent> {
        self.events
            .iter()
            .filter_map(|e| match e {
                EngineEvent::SamplesResized(r) => Some(r),
                _ => None,
            })
            .collect()
    }
}
