use std::fmt;

use crate::sample::SampleId;

#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// No sample with this id in the test.
    UnknownSample(SampleId),
    /// Row index past the end of the sample's arrays.
    RowOutOfRange { sample: SampleId, row: usize, rows: usize },
    /// Puff interval must be positive.
    InvalidPuffInterval(u32),
    /// A test needs at least one sample.
    InvalidSampleCount(usize),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownSample(id) => write!(f, "unknown sample: {id}"),
            Self::RowOutOfRange { sample, row, rows } => {
                write!(f, "{sample}: row {row} out of range ({rows} rows)")
            }
            Self::InvalidPuffInterval(n) => write!(f, "puff interval must be positive, got {n}"),
            Self::InvalidSampleCount(n) => write!(f, "sample count must be at least 1, got {n}"),
        }
    }
}

impl std::error::Error for EngineError {}
