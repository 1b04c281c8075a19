//! Sample-grid synchronization and TPM engine.
//!
//! Owns the canonical per-sample measurement arrays of a test, reconciles
//! edited grid snapshots against them, and keeps the derived TPM column
//! current. File formats live in `tpmgrid-io`.

pub mod cell;
pub mod error;
pub mod events;
pub mod reconcile;
pub mod resize;
pub mod rows;
pub mod sample;
pub mod schema;
pub mod snapshot;
pub mod test_run;
pub mod tpm;
pub mod validation;

pub use cell::CellValue;
pub use error::EngineError;
pub use events::EngineEvent;
pub use reconcile::{reconcile, ReconcileContext, Reconciled};
pub use resize::ResizeReport;
pub use sample::{Sample, SampleId};
pub use schema::{Field, SchemaVariant};
pub use snapshot::{GridPatch, GridSnapshot};
pub use test_run::{SyncOutcome, TestOptions, TestRun};
pub use tpm::TpmPrecision;
