pub mod arrow_source;
pub mod csv_source;

pub use arrow_source::from_record_batch;
pub use csv_source::CsvLoader;
