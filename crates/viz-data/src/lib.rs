//! Data tables and row access for the visualization platform

pub mod config;
pub mod element;
pub mod schema;
pub mod sources;
pub mod table;
pub mod value;

use arrow::error::ArrowError;
use thiserror::Error;
use viz_core::VizError;

// Re-exports
pub use config::CsvOptions;
pub use element::{CellRef, Element, Record, TableRow};
pub use schema::SchemaDetector;
pub use sources::{from_record_batch, CsvLoader};
pub use table::{Cell, Column, ColumnType, DataTable, DataView, TableModel};
pub use value::Value;

/// Errors that can occur in data operations
#[derive(Error, Debug)]
pub enum DataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Arrow error: {0}")]
    Arrow(ArrowError),

    #[error("CSV parsing error: {0}")]
    Csv(String),

    #[error(transparent)]
    Core(#[from] VizError),

    #[error("Column '{column}' has unsupported type {data_type}")]
    UnsupportedType { column: String, data_type: String },
}

impl From<csv::Error> for DataError {
    fn from(error: csv::Error) -> Self {
        match error.kind() {
            csv::ErrorKind::Io(io_err) => DataError::Io(std::io::Error::new(io_err.kind(), error.to_string())),
            _ => DataError::Csv(error.to_string()),
        }
    }
}

impl From<ArrowError> for DataError {
    fn from(error: ArrowError) -> Self {
        DataError::Arrow(error)
    }
}
