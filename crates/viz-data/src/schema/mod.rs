use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashSet;

use crate::table::ColumnType;

/// Schema detector for choosing column types from text samples
pub struct SchemaDetector {
    sample_size: usize,
}

/// A detected column
#[derive(Debug, Clone)]
pub struct DetectedColumn {
    pub name: String,
    pub column_type: ColumnType,
    pub stats: ColumnStats,
}

/// Statistics about a sampled column
#[derive(Debug, Clone, Default)]
pub struct ColumnStats {
    pub null_count: usize,
    pub distinct_count: usize,
    pub is_unique: bool,
}

impl std::fmt::Display for ColumnStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} null, {} distinct", self.null_count, self.distinct_count)?;
        if self.is_unique {
            f.write_str(", unique")?;
        }
        Ok(())
    }
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];
const DATE_TIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];

impl SchemaDetector {
    pub fn new() -> Self {
        Self { sample_size: 1000 }
    }

    /// Set the number of rows inspected per column
    pub fn with_sample_size(mut self, size: usize) -> Self {
        self.sample_size = size.max(1);
        self
    }

    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    /// Detect column types from sample rows.
    ///
    /// `is_null` decides which texts count as missing values.
    pub fn detect_from_samples<F>(&self, headers: &[String], samples: &[Vec<String>], is_null: F) -> Vec<DetectedColumn>
    where
        F: Fn(&str) -> bool,
    {
        let samples = &samples[..samples.len().min(self.sample_size)];
        headers
            .iter()
            .enumerate()
            .map(|(col_idx, header)| {
                let (column_type, stats) = Self::analyze_column(samples, col_idx, &is_null);
                DetectedColumn {
                    name: header.clone(),
                    column_type,
                    stats,
                }
            })
            .collect()
    }

    fn analyze_column<F>(samples: &[Vec<String>], col_idx: usize, is_null: &F) -> (ColumnType, ColumnStats)
    where
        F: Fn(&str) -> bool,
    {
        let mut null_count = 0;
        let mut values = Vec::new();
        let mut is_number = true;
        let mut is_date = true;
        let mut is_bool = true;

        for row in samples {
            match row.get(col_idx).map(|v| v.trim()) {
                Some(value) if !is_null(value) => {
                    if is_number && value.parse::<f64>().is_err() {
                        is_number = false;
                    }
                    if is_date && parse_date_millis(value).is_none() {
                        is_date = false;
                    }
                    if is_bool && parse_bool(value).is_none() {
                        is_bool = false;
                    }
                    values.push(value);
                }
                _ => null_count += 1,
            }
        }

        // An all-null column carries no evidence; keep it textual
        let column_type = if values.is_empty() {
            ColumnType::String
        } else if is_bool && !is_number {
            ColumnType::Boolean
        } else if is_number {
            ColumnType::Number
        } else if is_date {
            ColumnType::Date
        } else {
            ColumnType::String
        };

        let distinct_count = values.iter().collect::<HashSet<_>>().len();
        let stats = ColumnStats {
            null_count,
            distinct_count,
            is_unique: distinct_count == values.len(),
        };

        (column_type, stats)
    }
}

impl Default for SchemaDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse boolean spellings
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" => Some(true),
        "false" | "no" => Some(false),
        _ => None,
    }
}

/// Parse a date or date-time into milliseconds since the Unix epoch (UTC)
pub fn parse_date_millis(value: &str) -> Option<f64> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(value) {
        return Some(dt.timestamp_millis() as f64);
    }
    for format in DATE_TIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt.and_utc().timestamp_millis() as f64);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return date
                .and_hms_opt(0, 0, 0)
                .map(|dt| dt.and_utc().timestamp_millis() as f64);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers() -> Vec<String> {
        ["name", "sales", "active", "day", "empty"].iter().map(|s| s.to_string()).collect()
    }

    fn row(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_detect_types() {
        let samples = vec![
            row(&["Foo", "12000", "true", "2017-07-14", ""]),
            row(&["Bar", "6000.5", "false", "2017-07-15", "n/a"]),
            row(&["Baz", "", "yes", "2017-07-16T10:00:00", ""]),
        ];
        let detected = SchemaDetector::new().detect_from_samples(&headers(), &samples, |v| {
            v.is_empty() || v.eq_ignore_ascii_case("n/a")
        });

        let types: Vec<ColumnType> = detected.iter().map(|c| c.column_type).collect();
        assert_eq!(
            types,
            vec![
                ColumnType::String,
                ColumnType::Number,
                ColumnType::Boolean,
                ColumnType::Date,
                ColumnType::String,
            ]
        );
        assert_eq!(detected[1].stats.null_count, 1);
        assert!(detected[0].stats.is_unique);
        assert_eq!(detected[0].stats.to_string(), "0 null, 3 distinct, unique");
        assert_eq!(detected[1].stats.to_string(), "1 null, 2 distinct, unique");
    }

    #[test]
    fn test_parse_date_millis() {
        assert_eq!(parse_date_millis("1970-01-02"), Some(86_400_000.0));
        assert_eq!(parse_date_millis("1970-01-01T00:00:01Z"), Some(1000.0));
        assert_eq!(parse_date_millis("yesterday"), None);
    }
}
