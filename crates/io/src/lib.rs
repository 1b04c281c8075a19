// File I/O: tabular codec, Excel workbooks, CSV export

pub mod codec;
pub mod csv;
pub mod error;
pub mod save_guard;
pub mod table;
pub mod xlsx;

pub use codec::{from_table, infer_sample_count, to_table, CodecOptions};
pub use error::CodecError;
pub use save_guard::{SaveGuard, SaveOutcome};
pub use table::{DateKind, Table, TableLayout};
