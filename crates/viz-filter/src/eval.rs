//! Evaluation of filters over tables

use std::iter::FusedIterator;

use viz_data::{DataView, TableModel, TableRow};

use crate::filter::Filter;

/// Rows of a table accepted by a filter, in table order.
///
/// The iterator is lazy and `Clone`; a clone or [`FilteredRows::restart`]
/// replays the sequence from the first row.
pub struct FilteredRows<'a, T: TableModel + ?Sized> {
    filter: &'a Filter,
    table: &'a T,
    next_row: usize,
}

impl<T: TableModel + ?Sized> Clone for FilteredRows<'_, T> {
    fn clone(&self) -> Self {
        Self {
            filter: self.filter,
            table: self.table,
            next_row: self.next_row,
        }
    }
}

impl<'a, T: TableModel + ?Sized> FilteredRows<'a, T> {
    /// A fresh iterator over the same table and filter
    pub fn restart(&self) -> Self {
        Self {
            filter: self.filter,
            table: self.table,
            next_row: 0,
        }
    }

    pub fn table(&self) -> &'a T {
        self.table
    }
}

impl<'a, T: TableModel + ?Sized> Iterator for FilteredRows<'a, T> {
    type Item = TableRow<'a, T>;

    fn next(&mut self) -> Option<Self::Item> {
        let rows = self.table.number_of_rows();
        while self.next_row < rows {
            let row = TableRow::new(self.table, self.next_row);
            self.next_row += 1;
            if self.filter.contains(&row) {
                return Some(row);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.table.number_of_rows().saturating_sub(self.next_row);
        (0, Some(remaining))
    }
}

impl<T: TableModel + ?Sized> FusedIterator for FilteredRows<'_, T> {}

impl Filter {
    /// Lazily iterate the rows of `table` this filter accepts
    pub fn filter<'a, T: TableModel + ?Sized>(&'a self, table: &'a T) -> FilteredRows<'a, T> {
        FilteredRows {
            filter: self,
            table,
            next_row: 0,
        }
    }

    /// Indices of the accepted rows
    pub fn row_indices<T: TableModel + ?Sized>(&self, table: &T) -> Vec<usize> {
        self.filter(table).map(|row| row.index()).collect()
    }

    /// A view of `table` holding only the accepted rows
    pub fn apply<'a, T: TableModel + ?Sized>(&self, table: &'a T) -> DataView<'a, T> {
        DataView::new(table, self.row_indices(table))
    }

    /// Number of accepted rows
    pub fn count<T: TableModel + ?Sized>(&self, table: &T) -> usize {
        self.filter(table).count()
    }
}
