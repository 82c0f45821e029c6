//! Record store and record sources for the geo dashboard

pub mod sources;
pub mod store;

use thiserror::Error;

use gd_core::{QueryError, RecordError};

// Re-exports
pub use sources::{load_records_csv, SampleGenerator, SimulatedSource};
pub use store::MemoryRecordStore;

/// Errors that can occur while building or loading a record set
#[derive(Error, Debug)]
pub enum DataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(String),

    #[error("invalid record on line {line}: {source}")]
    InvalidRecord {
        line: u64,
        #[source]
        source: RecordError,
    },

    #[error("invalid timestamp '{value}' on line {line}")]
    InvalidTimestamp { line: u64, value: String },

    #[error("duplicate record id '{0}'")]
    DuplicateId(String),

    #[error("Query error: {0}")]
    Query(#[from] QueryError),
}

impl From<csv::Error> for DataError {
    fn from(error: csv::Error) -> Self {
        match error.kind() {
            csv::ErrorKind::Io(io_err) => DataError::Io(std::io::Error::new(io_err.kind(), error.to_string())),
            _ => DataError::Csv(error.to_string()),
        }
    }
}
