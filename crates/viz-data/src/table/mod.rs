//! In-memory data tables and the read-only table contract

mod view;

use std::fmt;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use viz_core::VizError;

use crate::value::Value;

pub use view::DataView;

/// Logical type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    String,
    Number,
    Boolean,
    /// Milliseconds since the Unix epoch, labeled with the source text
    Date,
    Object,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::String => "string",
            ColumnType::Number => "number",
            ColumnType::Boolean => "boolean",
            ColumnType::Date => "date",
            ColumnType::Object => "object",
        };
        f.write_str(name)
    }
}

/// Column metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    #[serde(default)]
    pub is_key: bool,
}

impl Column {
    /// A non-key column labeled with its name
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            name,
            column_type,
            is_key: false,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn key(mut self) -> Self {
        self.is_key = true;
        self
    }
}

/// A table cell: a typed value and an optional formatted label
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    #[serde(rename = "v")]
    pub value: Value,
    #[serde(rename = "f", default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Cell {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            label: None,
        }
    }

    pub fn labeled(value: impl Into<Value>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: Some(label.into()),
        }
    }
}

impl From<Value> for Cell {
    fn from(value: Value) -> Self {
        Cell::new(value)
    }
}

/// Read-only access to tabular data
pub trait TableModel {
    fn number_of_rows(&self) -> usize;

    fn number_of_columns(&self) -> usize;

    /// Raw value of a cell; `None` when out of range
    fn value(&self, row: usize, col: usize) -> Option<&Value>;

    /// Formatted label of a cell, if one was provided
    fn label(&self, row: usize, col: usize) -> Option<&str>;

    fn column_type(&self, col: usize) -> Option<ColumnType>;

    fn is_column_key(&self, col: usize) -> bool;

    fn column_id(&self, col: usize) -> Option<&str>;

    fn column_label(&self, col: usize) -> Option<&str>;

    /// Index of the column named `name`
    fn column_index(&self, name: &str) -> Option<usize>;

    /// The label of a cell, or the display form of its value
    fn formatted_value(&self, row: usize, col: usize) -> Option<String> {
        if let Some(label) = self.label(row, col) {
            return Some(label.to_string());
        }
        self.value(row, col).filter(|v| !v.is_null()).map(|v| v.to_string())
    }
}

/// Row-oriented in-memory table with a fixed set of columns
#[derive(Debug, Clone, Default)]
pub struct DataTable {
    columns: Vec<Column>,
    column_index: AHashMap<String, usize>,
    rows: Vec<Vec<Cell>>,
}

impl DataTable {
    /// Create an empty table; column names must be present and unique
    pub fn new(columns: Vec<Column>) -> Result<Self, VizError> {
        let mut column_index = AHashMap::with_capacity(columns.len());
        for (idx, column) in columns.iter().enumerate() {
            if column.name.is_empty() {
                return Err(VizError::ArgumentRequired(format!("name of column {}", idx)));
            }
            if column_index.insert(column.name.clone(), idx).is_some() {
                return Err(VizError::invalid(
                    "columns",
                    format!("duplicate column '{}'", column.name),
                ));
            }
        }

        Ok(Self {
            columns,
            column_index,
            rows: Vec::new(),
        })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Append a row, returning its index
    pub fn add_row(&mut self, cells: Vec<Cell>) -> Result<usize, VizError> {
        if cells.len() != self.columns.len() {
            return Err(VizError::invalid(
                "row",
                format!("expected {} cells, got {}", self.columns.len(), cells.len()),
            ));
        }
        self.rows.push(cells);
        Ok(self.rows.len() - 1)
    }

    /// Append a row of unlabeled values
    pub fn add_values<I, V>(&mut self, values: I) -> Result<usize, VizError>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let cells = values.into_iter().map(Cell::new).collect();
        self.add_row(cells)
    }

    pub fn row(&self, row: usize) -> Option<&[Cell]> {
        self.rows.get(row).map(Vec::as_slice)
    }

    fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.rows.get(row).and_then(|cells| cells.get(col))
    }
}

impl TableModel for DataTable {
    fn number_of_rows(&self) -> usize {
        self.rows.len()
    }

    fn number_of_columns(&self) -> usize {
        self.columns.len()
    }

    fn value(&self, row: usize, col: usize) -> Option<&Value> {
        self.cell(row, col).map(|cell| &cell.value)
    }

    fn label(&self, row: usize, col: usize) -> Option<&str> {
        self.cell(row, col).and_then(|cell| cell.label.as_deref())
    }

    fn column_type(&self, col: usize) -> Option<ColumnType> {
        self.columns.get(col).map(|c| c.column_type)
    }

    fn is_column_key(&self, col: usize) -> bool {
        self.columns.get(col).map(|c| c.is_key).unwrap_or(false)
    }

    fn column_id(&self, col: usize) -> Option<&str> {
        self.columns.get(col).map(|c| c.name.as_str())
    }

    fn column_label(&self, col: usize) -> Option<&str> {
        self.columns.get(col).map(|c| c.label.as_str())
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.column_index.get(name).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn sales_table() -> DataTable {
        let mut table = DataTable::new(vec![
            Column::new("country", ColumnType::String).key(),
            Column::new("product", ColumnType::String).key(),
            Column::new("sales", ColumnType::Number).with_label("Sales"),
        ])
        .unwrap();
        table.add_values(vec![Value::from("Portugal"), Value::from("Car"), Value::from(12000)]).unwrap();
        table.add_values(vec![Value::from("Ireland"), Value::from("Car"), Value::from(6000)]).unwrap();
        table
            .add_row(vec![Cell::new("Portugal"), Cell::new("Bike"), Cell::labeled(1500, "1.5k")])
            .unwrap();
        table
    }

    #[test]
    fn test_table_contract() {
        let table = sales_table();
        assert_eq!(table.number_of_rows(), 3);
        assert_eq!(table.number_of_columns(), 3);
        assert_eq!(table.column_index("sales"), Some(2));
        assert_eq!(table.column_label(2), Some("Sales"));
        assert!(table.is_column_key(0));
        assert!(!table.is_column_key(2));
        assert_eq!(table.column_type(2), Some(ColumnType::Number));
        assert_eq!(table.value(1, 2), Some(&Value::Number(6000.0)));
        assert_eq!(table.formatted_value(1, 2).as_deref(), Some("6000"));
        assert_eq!(table.formatted_value(2, 2).as_deref(), Some("1.5k"));
        assert_eq!(table.value(9, 0), None);
    }

    #[test]
    fn test_row_arity_is_checked() {
        let mut table = sales_table();
        assert!(table.add_values(vec![Value::from("Spain")]).is_err());
        assert_eq!(table.number_of_rows(), 3);
    }

    #[test]
    fn test_duplicate_columns_rejected() {
        let result = DataTable::new(vec![
            Column::new("a", ColumnType::String),
            Column::new("a", ColumnType::Number),
        ]);
        assert!(matches!(result, Err(VizError::ArgumentInvalid { .. })));
    }
}
