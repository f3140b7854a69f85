//! Conversion of Arrow record batches into tables

use arrow::array::{Array, ArrayRef, BooleanArray, Float64Array, StringArray, TimestampMillisecondArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Field, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::DateTime;
use tracing::debug;

use crate::table::{Cell, Column, ColumnType, DataTable};
use crate::value::Value;
use crate::DataError;

/// Field metadata entry marking a key column
pub const KEY_METADATA: &str = "key";

/// Field metadata entry carrying a display label
pub const LABEL_METADATA: &str = "label";

/// Map an Arrow data type to a column type
pub fn column_type_of(data_type: &DataType) -> Option<ColumnType> {
    match data_type {
        DataType::Boolean => Some(ColumnType::Boolean),
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64
        | DataType::Float16
        | DataType::Float32
        | DataType::Float64 => Some(ColumnType::Number),
        DataType::Utf8 | DataType::LargeUtf8 => Some(ColumnType::String),
        DataType::Date32 | DataType::Date64 | DataType::Timestamp(_, _) => Some(ColumnType::Date),
        _ => None,
    }
}

/// Copy a record batch into a [`DataTable`]
pub fn from_record_batch(batch: &RecordBatch) -> Result<DataTable, DataError> {
    let schema = batch.schema();
    let mut columns = Vec::with_capacity(schema.fields().len());
    let mut cells_by_column: Vec<Vec<Cell>> = Vec::with_capacity(schema.fields().len());

    for (field, array) in schema.fields().iter().zip(batch.columns()) {
        let column_type = column_type_of(field.data_type()).ok_or_else(|| DataError::UnsupportedType {
            column: field.name().clone(),
            data_type: field.data_type().to_string(),
        })?;

        columns.push(column_for(field, column_type));
        cells_by_column.push(convert_column(array, field.data_type(), column_type)?);
    }

    let mut table = DataTable::new(columns)?;
    for row in 0..batch.num_rows() {
        let cells = cells_by_column.iter().map(|cells| cells[row].clone()).collect();
        table.add_row(cells)?;
    }

    debug!("Converted record batch with {} rows", batch.num_rows());
    Ok(table)
}

fn column_for(field: &Field, column_type: ColumnType) -> Column {
    let metadata = field.metadata();
    let mut column = Column::new(field.name().clone(), column_type);
    if let Some(label) = metadata.get(LABEL_METADATA) {
        column = column.with_label(label.clone());
    }
    if metadata.get(KEY_METADATA).map(|v| v == "true").unwrap_or(false) {
        column = column.key();
    }
    column
}

fn convert_column(array: &ArrayRef, data_type: &DataType, column_type: ColumnType) -> Result<Vec<Cell>, DataError> {
    let cells = match column_type {
        ColumnType::Boolean => {
            let values = downcast::<BooleanArray>(array)?;
            (0..values.len())
                .map(|i| cell_or_null(values.is_valid(i), || Cell::new(values.value(i))))
                .collect()
        }
        ColumnType::Number => {
            let converted = cast(array, &DataType::Float64)?;
            let values = downcast::<Float64Array>(&converted)?;
            (0..values.len())
                .map(|i| cell_or_null(values.is_valid(i), || Cell::new(values.value(i))))
                .collect()
        }
        ColumnType::Date => {
            let converted = cast(array, &DataType::Timestamp(TimeUnit::Millisecond, None))?;
            let values = downcast::<TimestampMillisecondArray>(&converted)?;
            let date_only = matches!(data_type, DataType::Date32 | DataType::Date64);
            (0..values.len())
                .map(|i| {
                    cell_or_null(values.is_valid(i), || {
                        let ms = values.value(i);
                        match format_millis(ms, date_only) {
                            Some(label) => Cell::labeled(ms as f64, label),
                            None => Cell::new(ms as f64),
                        }
                    })
                })
                .collect()
        }
        ColumnType::String | ColumnType::Object => {
            let converted = cast(array, &DataType::Utf8)?;
            let values = downcast::<StringArray>(&converted)?;
            (0..values.len())
                .map(|i| cell_or_null(values.is_valid(i), || Cell::new(values.value(i))))
                .collect()
        }
    };
    Ok(cells)
}

fn cell_or_null(valid: bool, cell: impl FnOnce() -> Cell) -> Cell {
    if valid {
        cell()
    } else {
        Cell::new(Value::Null)
    }
}

fn downcast<T: 'static>(array: &ArrayRef) -> Result<&T, DataError> {
    array
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| DataError::UnsupportedType {
            column: String::new(),
            data_type: array.data_type().to_string(),
        })
}

fn format_millis(ms: i64, date_only: bool) -> Option<String> {
    let dt = DateTime::from_timestamp_millis(ms)?;
    Some(if date_only {
        dt.format("%Y-%m-%d").to_string()
    } else {
        dt.format("%Y-%m-%d %H:%M:%S").to_string()
    })
}
