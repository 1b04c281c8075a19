use std::fmt;

use tpmgrid_engine::{EngineError, SchemaVariant};

#[derive(Debug)]
pub enum CodecError {
    /// The table is narrower than the declared variant and sample count need.
    SchemaMismatch { variant: SchemaVariant, required: usize, found: usize },
    /// The workbook has no sheet for the test.
    MissingSheet(String),
    /// Spreadsheet read/write failure.
    Xlsx(String),
    /// CSV write failure.
    Csv(String),
    /// IO error (file read, directory creation, etc.).
    Io(String),
    /// Another save holds the save guard.
    SaveInProgress,
    /// The decoded data could not form a valid test.
    Engine(EngineError),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SchemaMismatch { variant, required, found } => write!(
                f,
                "table too narrow for {variant} layout: needs {required} columns, found {found}"
            ),
            Self::MissingSheet(name) => write!(f, "sheet '{name}' not found"),
            Self::Xlsx(msg) => write!(f, "spreadsheet error: {msg}"),
            Self::Csv(msg) => write!(f, "CSV error: {msg}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
            Self::SaveInProgress => write!(f, "a save is already in progress"),
            Self::Engine(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for CodecError {}

impl From<EngineError> for CodecError {
    fn from(e: EngineError) -> Self {
        Self::Engine(e)
    }
}

impl From<std::io::Error> for CodecError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}
