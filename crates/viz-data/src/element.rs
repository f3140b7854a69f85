//! Named property access over rows and records
//!
//! Filters read data through [`Element`]. A missing property (`None`) is
//! distinct from a property that is present with a null value.

use std::borrow::Cow;

use indexmap::IndexMap;
use viz_core::VizError;

use crate::table::{Cell, TableModel};
use crate::value::Value;

/// Borrowed view of a single property
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellRef<'a> {
    pub value: &'a Value,
    pub label: Option<&'a str>,
}

impl<'a> CellRef<'a> {
    /// The label, falling back to the display form of a non-null value
    pub fn formatted(&self) -> Option<Cow<'a, str>> {
        match (self.label, self.value) {
            (Some(label), _) => Some(Cow::Borrowed(label)),
            (None, Value::Null) => None,
            (None, Value::String(s)) => Some(Cow::Borrowed(s.as_str())),
            (None, value) => Some(Cow::Owned(value.to_string())),
        }
    }
}

/// Something with named properties
pub trait Element {
    fn property(&self, name: &str) -> Option<CellRef<'_>>;
}

impl<E: Element + ?Sized> Element for &E {
    fn property(&self, name: &str) -> Option<CellRef<'_>> {
        (**self).property(name)
    }
}

/// A row of a table, addressed by column name
pub struct TableRow<'a, T: TableModel + ?Sized> {
    table: &'a T,
    row: usize,
}

impl<T: TableModel + ?Sized> Clone for TableRow<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: TableModel + ?Sized> Copy for TableRow<'_, T> {}

impl<'a, T: TableModel + ?Sized> TableRow<'a, T> {
    pub fn new(table: &'a T, row: usize) -> Self {
        Self { table, row }
    }

    pub fn index(&self) -> usize {
        self.row
    }

    pub fn table(&self) -> &'a T {
        self.table
    }
}

impl<T: TableModel + ?Sized> std::fmt::Debug for TableRow<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableRow").field("row", &self.row).finish()
    }
}

impl<T: TableModel + ?Sized> Element for TableRow<'_, T> {
    fn property(&self, name: &str) -> Option<CellRef<'_>> {
        let col = self.table.column_index(name)?;
        let value = self.table.value(self.row, col)?;
        Some(CellRef {
            value,
            label: self.table.label(self.row, col),
        })
    }
}

/// A free-standing row: property name to cell, in insertion order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    cells: IndexMap<String, Cell>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Record::insert`]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, Cell::new(value));
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, cell: Cell) {
        self.cells.insert(name.into(), cell);
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Build from a JSON object.
    ///
    /// Scalars become unlabeled cells; `{"v": value, "f": "label"}` objects
    /// become labeled cells.
    pub fn from_json(json: &serde_json::Value) -> Result<Self, VizError> {
        let object = json
            .as_object()
            .ok_or_else(|| VizError::invalid("record", "expected a JSON object"))?;

        let mut record = Record::new();
        for (name, value) in object {
            let cell = match value {
                serde_json::Value::Object(_) => serde_json::from_value::<Cell>(value.clone())
                    .map_err(|e| VizError::invalid(name.clone(), e.to_string()))?,
                scalar => Value::from_json(scalar)
                    .map(Cell::new)
                    .ok_or_else(|| VizError::invalid(name.clone(), "unsupported value"))?,
            };
            record.insert(name.clone(), cell);
        }
        Ok(record)
    }
}

impl Element for Record {
    fn property(&self, name: &str) -> Option<CellRef<'_>> {
        self.cells.get(name).map(|cell| CellRef {
            value: &cell.value,
            label: cell.label.as_deref(),
        })
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (name, value) in iter {
            record.insert(name, Cell::new(value));
        }
        record
    }
}
