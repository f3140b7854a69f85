//! Table loading configuration

use std::collections::HashMap;
use serde::{Serialize, Deserialize};

use crate::table::ColumnType;

/// Options for reading a CSV file into a table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CsvOptions {
    /// Field delimiter
    pub delimiter: char,

    /// Whether the first record holds column names
    pub has_headers: bool,

    /// Columns flagged as keys
    pub key_columns: Vec<String>,

    /// Column type overrides, bypassing detection
    pub column_types: HashMap<String, ColumnType>,

    /// Texts read as null
    pub null_patterns: Vec<String>,

    /// Whether null matching is case sensitive
    pub null_case_sensitive: bool,

    /// Rows inspected for type detection
    pub sample_size: usize,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: ',',
            has_headers: true,
            key_columns: Vec::new(),
            column_types: HashMap::new(),
            null_patterns: vec![
                String::new(),
                "-".to_string(),
                "N/A".to_string(),
                "null".to_string(),
                "None".to_string(),
            ],
            null_case_sensitive: false,
            sample_size: 1000,
        }
    }
}

impl CsvOptions {
    /// Flag `column` as a key column
    pub fn with_key(mut self, column: impl Into<String>) -> Self {
        self.key_columns.push(column.into());
        self
    }

    /// Force the type of `column`
    pub fn with_column_type(mut self, column: impl Into<String>, column_type: ColumnType) -> Self {
        self.column_types.insert(column.into(), column_type);
        self
    }

    /// Check if a (trimmed) text should be treated as null
    pub fn is_null(&self, value: &str) -> bool {
        let value = value.trim();
        self.null_patterns.iter().any(|pattern| {
            if self.null_case_sensitive {
                value == pattern
            } else {
                value.eq_ignore_ascii_case(pattern)
            }
        })
    }

    /// The delimiter as a byte, if it is ASCII
    pub fn delimiter_byte(&self) -> Option<u8> {
        self.delimiter.is_ascii().then_some(self.delimiter as u8)
    }
}
