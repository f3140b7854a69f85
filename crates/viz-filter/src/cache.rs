//! Filter result caching

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::RwLock;
use tracing::debug;
use viz_data::{DataView, TableModel};

use crate::filter::Filter;

struct CacheEntry {
    rows: Arc<[usize]>,
    last_access: AtomicU64,
}

/// Accepted row indices of recently evaluated filters, keyed by content key.
///
/// A cache belongs to one table; use a fresh cache (or [`FilterCache::clear`])
/// when the table changes.
pub struct FilterCache {
    /// Cached row indices indexed by content key
    entries: Arc<RwLock<AHashMap<String, CacheEntry>>>,
    /// Maximum number of filters to keep
    max_entries: usize,
    clock: AtomicU64,
}

impl FilterCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(AHashMap::new())),
            max_entries: max_entries.max(1),
            clock: AtomicU64::new(0),
        }
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    /// Cached rows of the filter with content key `key`
    pub fn get(&self, key: &str) -> Option<Arc<[usize]>> {
        let entries = self.entries.read();
        let entry = entries.get(key)?;
        entry.last_access.store(self.tick(), Ordering::Relaxed);
        Some(entry.rows.clone())
    }

    /// Rows of `table` accepted by `filter`, evaluating only on a miss
    pub fn rows<T: TableModel + ?Sized>(&self, filter: &Filter, table: &T) -> Arc<[usize]> {
        let key = filter.content_key();
        if let Some(rows) = self.get(&key) {
            return rows;
        }

        let rows: Arc<[usize]> = filter.row_indices(table).into();
        let mut entries = self.entries.write();

        // Evict the least recently used entry if at capacity
        if entries.len() >= self.max_entries && !entries.contains_key(&key) {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_access.load(Ordering::Relaxed))
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                debug!("Evicting cached filter {}", oldest);
                entries.remove(&oldest);
            }
        }

        entries.insert(
            key,
            CacheEntry {
                rows: rows.clone(),
                last_access: AtomicU64::new(self.tick()),
            },
        );
        rows
    }

    /// A view of `table` holding the rows accepted by `filter`
    pub fn view<'a, T: TableModel + ?Sized>(&self, filter: &Filter, table: &'a T) -> DataView<'a, T> {
        DataView::new(table, self.rows(filter, table))
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Clear the cache
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

impl Default for FilterCache {
    fn default() -> Self {
        Self::new(64)
    }
}
