//! Row subsets of a table

use std::sync::Arc;

use super::{ColumnType, TableModel};
use crate::value::Value;

/// A read-only subset of another table's rows, in the order given
pub struct DataView<'a, T: TableModel + ?Sized> {
    source: &'a T,
    rows: Arc<[usize]>,
}

impl<T: TableModel + ?Sized> Clone for DataView<'_, T> {
    fn clone(&self) -> Self {
        Self {
            source: self.source,
            rows: self.rows.clone(),
        }
    }
}

impl<T: TableModel + ?Sized> std::fmt::Debug for DataView<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataView").field("rows", &self.rows).finish()
    }
}

impl<'a, T: TableModel + ?Sized> DataView<'a, T> {
    /// View over `rows` of `source`; indices past the end are dropped
    pub fn new(source: &'a T, rows: impl Into<Arc<[usize]>>) -> Self {
        let rows: Arc<[usize]> = rows.into();
        let total = source.number_of_rows();
        let rows = if rows.iter().all(|&r| r < total) {
            rows
        } else {
            rows.iter().copied().filter(|&r| r < total).collect()
        };
        Self { source, rows }
    }

    /// View over every row of `source`
    pub fn all(source: &'a T) -> Self {
        let rows: Arc<[usize]> = (0..source.number_of_rows()).collect();
        Self { source, rows }
    }

    pub fn source(&self) -> &'a T {
        self.source
    }

    /// Source row indices in view order
    pub fn row_indices(&self) -> &Arc<[usize]> {
        &self.rows
    }

    /// Source row index of view row `row`
    pub fn source_row(&self, row: usize) -> Option<usize> {
        self.rows.get(row).copied()
    }
}

impl<T: TableModel + ?Sized> TableModel for DataView<'_, T> {
    fn number_of_rows(&self) -> usize {
        self.rows.len()
    }

    fn number_of_columns(&self) -> usize {
        self.source.number_of_columns()
    }

    fn value(&self, row: usize, col: usize) -> Option<&Value> {
        self.source_row(row).and_then(|r| self.source.value(r, col))
    }

    fn label(&self, row: usize, col: usize) -> Option<&str> {
        self.source_row(row).and_then(|r| self.source.label(r, col))
    }

    fn column_type(&self, col: usize) -> Option<ColumnType> {
        self.source.column_type(col)
    }

    fn is_column_key(&self, col: usize) -> bool {
        self.source.is_column_key(col)
    }

    fn column_id(&self, col: usize) -> Option<&str> {
        self.source.column_id(col)
    }

    fn column_label(&self, col: usize) -> Option<&str> {
        self.source.column_label(col)
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.source.column_index(name)
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::sales_table;
    use super::*;

    #[test]
    fn test_view_maps_rows() {
        let table = sales_table();
        let view = DataView::new(&table, vec![2, 0, 7]);

        assert_eq!(view.number_of_rows(), 2);
        assert_eq!(view.value(0, 1), Some(&Value::from("Bike")));
        assert_eq!(view.label(0, 2), Some("1.5k"));
        assert_eq!(view.value(1, 2), Some(&Value::Number(12000.0)));
        assert_eq!(view.value(2, 0), None);
        assert_eq!(view.column_index("country"), Some(0));
    }

    #[test]
    fn test_view_of_view() {
        let table = sales_table();
        let outer = DataView::all(&table);
        let inner = DataView::new(&outer, vec![1]);
        assert_eq!(inner.value(0, 0), Some(&Value::from("Ireland")));
    }
}
