use log::{debug, trace};
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;

use super::error::{BufferError, BufferResult};
use super::{PageCache, Permission, TransactionId};
use crate::catalog::Catalog;
use crate::file::BUFFER_POOL_SIZE;
use crate::record::{HeapPage, PageId};

/// Entry in the buffer pool
struct CacheEntry {
    page: Arc<HeapPage>,
    /// Strongest permission granted for this page so far
    permission: Permission,
}

/// Page cache with LRU eviction, reading pages through the catalog's heap files
pub struct BufferPool {
    catalog: Arc<Catalog>,
    /// Cached pages in recency order
    pool: Mutex<LruCache<PageId, CacheEntry>>,
    capacity: usize,
}

impl BufferPool {
    /// Create a new buffer pool
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self::with_capacity(catalog, BUFFER_POOL_SIZE)
    }

    /// Create a new buffer pool holding at most `capacity` pages
    pub fn with_capacity(catalog: Arc<Catalog>, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            catalog,
            pool: Mutex::new(LruCache::new(capacity)),
            capacity: capacity.get(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Check if a page is currently cached, without touching its recency
    pub fn is_page_cached(&self, page_id: PageId) -> bool {
        self.pool.lock().contains(&page_id)
    }

    /// Get number of cached pages
    pub fn cached_page_count(&self) -> usize {
        self.pool.lock().len()
    }

    pub fn permission_of(&self, page_id: PageId) -> Option<Permission> {
        self.pool.lock().peek(&page_id).map(|entry| entry.permission)
    }

    /// Drop one page from the pool; returns whether it was cached
    pub fn evict_page(&self, page_id: PageId) -> bool {
        self.pool.lock().pop(&page_id).is_some()
    }

    /// Drop every cached page
    pub fn clear(&self) {
        self.pool.lock().clear();
    }
}

impl PageCache for BufferPool {
    fn fetch(
        &self,
        tid: TransactionId,
        page_id: PageId,
        permission: Permission,
    ) -> BufferResult<Arc<HeapPage>> {
        let mut pool = self.pool.lock();

        if let Some(entry) = pool.get_mut(&page_id) {
            entry.permission = entry.permission.max(permission);
            return Ok(Arc::clone(&entry.page));
        }

        debug!("{}: page {} not cached, reading from disk", tid, page_id);
        let file = self.catalog.file(page_id.table_id)?;
        let page = file
            .read_page(page_id)
            .map(Arc::new)
            .ok_or(BufferError::PageUnavailable(page_id))?;

        let entry = CacheEntry {
            page: Arc::clone(&page),
            permission,
        };
        if let Some((evicted, _)) = pool.push(page_id, entry) {
            trace!("Evicted page {}", evicted);
        }

        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogError;
    use crate::file::TableId;
    use crate::record::{DataType, HeapFile, HeapFileEncoder, Record, Schema, Value};
    use tempfile::TempDir;

    /// Catalog with one table spanning `pages` full pages of single-int records
    fn setup(pages: usize) -> (TempDir, Arc<Catalog>, TableId) {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nums.dat");
        let schema = Schema::named(vec![(DataType::Int, "n")]).unwrap();
        let per_page = HeapPage::calculate_slot_count(schema.byte_width());

        let records = (0..(pages * per_page) as i32).map(|i| Record::new(vec![Value::Int(i)]));
        HeapFileEncoder::write_records(&path, &schema, records).unwrap();

        let catalog = Arc::new(Catalog::new());
        let table_id = catalog.add_table(HeapFile::open(&path, schema).unwrap(), "nums");
        (temp_dir, catalog, table_id)
    }

    #[test]
    fn test_repeated_fetch_returns_same_instance() {
        let (_temp_dir, catalog, table_id) = setup(1);
        let pool = BufferPool::new(catalog);
        let tid = TransactionId::new();
        let pid = PageId::new(table_id, 0);

        let first = pool.fetch(tid, pid, Permission::ReadOnly).unwrap();
        let second = pool.fetch(tid, pid, Permission::ReadOnly).unwrap();
        let other_tx = pool
            .fetch(TransactionId::new(), pid, Permission::ReadOnly)
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&first, &other_tx));
        assert_eq!(pool.cached_page_count(), 1);
    }

    #[test]
    fn test_lru_eviction() {
        let (_temp_dir, catalog, table_id) = setup(3);
        let pool = BufferPool::with_capacity(catalog, 2);
        let tid = TransactionId::new();
        let pid = |n| PageId::new(table_id, n);

        pool.fetch(tid, pid(0), Permission::ReadOnly).unwrap();
        pool.fetch(tid, pid(1), Permission::ReadOnly).unwrap();
        // Touch page 0 so page 1 is least recently used
        pool.fetch(tid, pid(0), Permission::ReadOnly).unwrap();
        pool.fetch(tid, pid(2), Permission::ReadOnly).unwrap();

        assert_eq!(pool.cached_page_count(), 2);
        assert!(pool.is_page_cached(pid(0)));
        assert!(!pool.is_page_cached(pid(1)));
        assert!(pool.is_page_cached(pid(2)));
    }

    #[test]
    fn test_permission_upgrades() {
        let (_temp_dir, catalog, table_id) = setup(1);
        let pool = BufferPool::new(catalog);
        let tid = TransactionId::new();
        let pid = PageId::new(table_id, 0);

        assert_eq!(pool.permission_of(pid), None);
        pool.fetch(tid, pid, Permission::ReadOnly).unwrap();
        assert_eq!(pool.permission_of(pid), Some(Permission::ReadOnly));
        pool.fetch(tid, pid, Permission::ReadWrite).unwrap();
        pool.fetch(tid, pid, Permission::ReadOnly).unwrap();
        assert_eq!(pool.permission_of(pid), Some(Permission::ReadWrite));
    }

    #[test]
    fn test_evict_and_clear() {
        let (_temp_dir, catalog, table_id) = setup(2);
        let pool = BufferPool::new(catalog);
        let tid = TransactionId::new();
        let pid = PageId::new(table_id, 0);

        let before = pool.fetch(tid, pid, Permission::ReadOnly).unwrap();
        assert!(pool.evict_page(pid));
        assert!(!pool.evict_page(pid));

        let after = pool.fetch(tid, pid, Permission::ReadOnly).unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(before.used_slot_count(), after.used_slot_count());

        pool.fetch(tid, PageId::new(table_id, 1), Permission::ReadOnly)
            .unwrap();
        pool.clear();
        assert_eq!(pool.cached_page_count(), 0);
    }

    #[test]
    fn test_fetch_failures() {
        let (_temp_dir, catalog, table_id) = setup(1);
        let pool = BufferPool::new(catalog);
        let tid = TransactionId::new();

        let unknown = pool.fetch(tid, PageId::new(TableId::new(0), 0), Permission::ReadOnly);
        assert!(matches!(
            unknown,
            Err(BufferError::Catalog(CatalogError::TableNotFound(_)))
        ));

        let past_end = pool.fetch(tid, PageId::new(table_id, 1), Permission::ReadOnly);
        assert!(matches!(past_end, Err(BufferError::PageUnavailable(_))));
        assert_eq!(pool.cached_page_count(), 0);
    }

    #[test]
    fn test_zero_capacity_holds_one_page() {
        let (_temp_dir, catalog, _table_id) = setup(1);
        let pool = BufferPool::with_capacity(catalog, 0);
        assert_eq!(pool.capacity(), 1);
    }
}
