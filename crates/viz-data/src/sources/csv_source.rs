//! CSV loading into in-memory tables

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use csv::ReaderBuilder;
use tracing::{debug, info, warn};
use viz_core::VizError;

use crate::config::CsvOptions;
use crate::schema::{parse_bool, parse_date_millis, SchemaDetector};
use crate::table::{Cell, Column, ColumnType, DataTable};
use crate::value::Value;
use crate::DataError;

/// Reads CSV text into a [`DataTable`]
#[derive(Debug, Clone, Default)]
pub struct CsvLoader {
    options: CsvOptions,
}

impl CsvLoader {
    pub fn new(options: CsvOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CsvOptions {
        &self.options
    }

    /// Load a CSV file
    pub fn load_path(&self, path: impl AsRef<Path>) -> Result<DataTable, DataError> {
        let path = path.as_ref();
        info!("Loading CSV table from {:?}", path);
        let file = File::open(path)?;
        self.load(BufReader::new(file))
    }

    /// Load CSV text from any reader
    pub fn load<R: Read>(&self, reader: R) -> Result<DataTable, DataError> {
        let delimiter = self.options.delimiter_byte().ok_or_else(|| {
            VizError::invalid("delimiter", format!("'{}' is not ASCII", self.options.delimiter))
        })?;

        let mut csv_reader = ReaderBuilder::new()
            .has_headers(false)
            .delimiter(delimiter)
            .flexible(true)
            .from_reader(reader);

        let mut records = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            records.push(record.iter().map(|s| s.to_string()).collect::<Vec<_>>());
        }

        let headers: Vec<String> = if self.options.has_headers {
            if records.is_empty() {
                return Err(VizError::ArgumentRequired("CSV header record".to_string()).into());
            }
            records.remove(0)
        } else {
            let width = records.iter().map(Vec::len).max().unwrap_or(0);
            (0..width).map(|idx| format!("col{}", idx)).collect()
        };

        for key in &self.options.key_columns {
            if !headers.contains(key) {
                return Err(VizError::invalid("keyColumns", format!("unknown column '{}'", key)).into());
            }
        }

        let detector = SchemaDetector::new().with_sample_size(self.options.sample_size);
        let detected = detector.detect_from_samples(&headers, &records, |v| self.options.is_null(v));

        let columns: Vec<Column> = detected
            .into_iter()
            .map(|d| {
                let column_type = self
                    .options
                    .column_types
                    .get(&d.name)
                    .copied()
                    .unwrap_or(d.column_type);
                let is_key = self.options.key_columns.contains(&d.name);
                debug!("Column {} detected as {} ({})", d.name, column_type, d.stats);
                if is_key && d.stats.null_count > 0 {
                    warn!("Key column {} has {} empty cells in the sample", d.name, d.stats.null_count);
                }
                let column = Column::new(d.name, column_type);
                if is_key {
                    column.key()
                } else {
                    column
                }
            })
            .collect();

        let types: Vec<ColumnType> = columns.iter().map(|c| c.column_type).collect();
        let mut table = DataTable::new(columns)?;

        for record in &records {
            let cells = types
                .iter()
                .enumerate()
                .map(|(idx, column_type)| {
                    let text = record.get(idx).map(String::as_str).unwrap_or("");
                    self.parse_cell(text, *column_type)
                })
                .collect();
            table.add_row(cells)?;
        }

        info!("Loaded {} rows x {} columns", records.len(), types.len());
        Ok(table)
    }

    fn parse_cell(&self, text: &str, column_type: ColumnType) -> Cell {
        if self.options.is_null(text) {
            return Cell::new(Value::Null);
        }

        let trimmed = text.trim();
        match column_type {
            ColumnType::Number => match trimmed.parse::<f64>() {
                Ok(n) => Cell::new(n),
                Err(_) => Cell::labeled(Value::Null, text),
            },
            ColumnType::Boolean => match parse_bool(trimmed) {
                Some(b) => Cell::new(b),
                None => Cell::labeled(Value::Null, text),
            },
            ColumnType::Date => match parse_date_millis(trimmed) {
                Some(ms) => Cell::labeled(ms, trimmed),
                None => Cell::labeled(Value::Null, text),
            },
            ColumnType::String | ColumnType::Object => Cell::new(text),
        }
    }
}
