use log::warn;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::error::{RecordError, RecordResult};
use super::page::HeapPage;
use super::record::{PageId, Record, SlotId};
use super::schema::Schema;
use crate::buffer::{PageCache, Permission, TransactionId};
use crate::execution::{ExecutionError, ExecutionResult, OpIterator};
use crate::file::{FileError, PAGE_SIZE, PageNumber, PagedFile, TableId};

/// An unordered collection of records stored in fixed-size pages
pub struct HeapFile {
    file: Mutex<PagedFile>,
    table_id: TableId,
    path: PathBuf,
    schema: Arc<Schema>,
    page_count: usize,
    slots_per_page: usize,
}

impl HeapFile {
    /// Open an existing heap file whose records follow `schema`
    pub fn open<P: AsRef<Path>>(path: P, schema: Schema) -> RecordResult<Self> {
        let slots_per_page = HeapPage::calculate_slot_count(schema.byte_width());
        if slots_per_page == 0 {
            return Err(RecordError::RecordTooLarge(schema.byte_width()));
        }

        let file = PagedFile::open(path)?;

        Ok(Self {
            table_id: file.id(),
            path: file.path().to_path_buf(),
            page_count: file.page_count(),
            file: Mutex::new(file),
            schema: Arc::new(schema),
            slots_per_page,
        })
    }

    /// Stable identifier derived from the file's absolute path
    pub fn id(&self) -> TableId {
        self.table_id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get schema
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn slots_per_page(&self) -> usize {
        self.slots_per_page
    }

    /// Read and decode one page, reporting why it failed
    pub fn try_read_page(&self, page_id: PageId) -> RecordResult<HeapPage> {
        if page_id.table_id != self.table_id {
            return Err(FileError::WrongTable {
                expected: self.table_id,
                actual: page_id.table_id,
            }
            .into());
        }

        let mut buffer = vec![0u8; PAGE_SIZE];
        self.file.lock().read_page(page_id.page_number, &mut buffer)?;

        HeapPage::from_bytes(page_id, Arc::clone(&self.schema), buffer)
    }

    /// Read one page; a failure is logged and reported as no page
    pub fn read_page(&self, page_id: PageId) -> Option<HeapPage> {
        match self.try_read_page(page_id) {
            Ok(page) => Some(page),
            Err(err) => {
                warn!(
                    "{}: cannot read page {}: {}",
                    self.path.display(),
                    page_id,
                    err
                );
                None
            }
        }
    }

    /// Cursor over every record in the file, fetching pages through `cache`
    pub fn iterator(&self, tid: TransactionId, cache: Arc<dyn PageCache>) -> HeapFileIterator {
        HeapFileIterator {
            source: PageSource {
                table_id: self.table_id,
                page_count: self.page_count,
                tid,
                cache,
            },
            schema: Arc::clone(&self.schema),
            state: CursorState::Closed,
        }
    }
}

struct PageSource {
    table_id: TableId,
    page_count: usize,
    tid: TransactionId,
    cache: Arc<dyn PageCache>,
}

struct Cursor {
    next_page: PageNumber,
    current: Option<(Arc<HeapPage>, SlotId)>,
    lookahead: Option<Record>,
}

impl Cursor {
    fn start(source: &PageSource) -> ExecutionResult<Self> {
        let mut cursor = Cursor {
            next_page: 0,
            current: None,
            lookahead: None,
        };
        cursor.lookahead = cursor.advance(source)?;
        Ok(cursor)
    }

    /// Next occupied slot, moving on to later pages as each one runs out
    fn advance(&mut self, source: &PageSource) -> ExecutionResult<Option<Record>> {
        loop {
            if let Some((page, slot)) = &mut self.current {
                if let Some(slot_id) = page.next_used_slot(*slot) {
                    *slot = slot_id + 1;
                    return Ok(Some(page.record(slot_id)?));
                }
            }

            if self.next_page >= source.page_count {
                self.current = None;
                return Ok(None);
            }

            let page_id = PageId::new(source.table_id, self.next_page);
            let page = source
                .cache
                .fetch(source.tid, page_id, Permission::ReadOnly)?;
            self.next_page += 1;
            self.current = Some((page, 0));
        }
    }
}

enum CursorState {
    Closed,
    Open(Cursor),
}

/// Transaction-scoped cursor over all records of a heap file
pub struct HeapFileIterator {
    source: PageSource,
    schema: Arc<Schema>,
    state: CursorState,
}

impl HeapFileIterator {
    fn cursor(&mut self) -> ExecutionResult<&mut Cursor> {
        match &mut self.state {
            CursorState::Open(cursor) => Ok(cursor),
            CursorState::Closed => Err(ExecutionError::NotOpen),
        }
    }
}

impl OpIterator for HeapFileIterator {
    fn open(&mut self) -> ExecutionResult<()> {
        self.state = CursorState::Open(Cursor::start(&self.source)?);
        Ok(())
    }

    fn has_next(&mut self) -> ExecutionResult<bool> {
        Ok(self.cursor()?.lookahead.is_some())
    }

    fn next(&mut self) -> ExecutionResult<Record> {
        let CursorState::Open(cursor) = &mut self.state else {
            return Err(ExecutionError::NotOpen);
        };
        let record = cursor
            .lookahead
            .take()
            .ok_or(ExecutionError::NoSuchElement)?;
        cursor.lookahead = cursor.advance(&self.source)?;
        Ok(record)
    }

    fn rewind(&mut self) -> ExecutionResult<()> {
        self.cursor()?;
        self.open()
    }

    fn close(&mut self) {
        self.state = CursorState::Closed;
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::BufferResult;
    use crate::record::{DataType, HeapFileEncoder, Value};
    use tempfile::TempDir;

    /// Reads straight from the file and remembers every request
    struct RecordingCache {
        file: Arc<HeapFile>,
        requests: Mutex<Vec<(PageId, Permission)>>,
    }

    impl PageCache for RecordingCache {
        fn fetch(
            &self,
            _tid: TransactionId,
            page_id: PageId,
            permission: Permission,
        ) -> BufferResult<Arc<HeapPage>> {
            self.requests.lock().push((page_id, permission));
            let page = self.file.try_read_page(page_id)?;
            Ok(Arc::new(page))
        }
    }

    fn create_test_schema() -> Schema {
        Schema::named(vec![(DataType::Int, "id"), (DataType::Text(20), "name")]).unwrap()
    }

    fn make_records(count: i32) -> Vec<Record> {
        (0..count)
            .map(|i| Record::new(vec![Value::Int(i), Value::Text(format!("User{}", i))]))
            .collect()
    }

    fn setup(count: i32) -> (TempDir, Arc<HeapFile>, Arc<RecordingCache>) {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("test.dat");
        HeapFileEncoder::write_records(&path, &create_test_schema(), make_records(count)).unwrap();

        let file = Arc::new(HeapFile::open(&path, create_test_schema()).unwrap());
        let cache = Arc::new(RecordingCache {
            file: Arc::clone(&file),
            requests: Mutex::new(Vec::new()),
        });
        (temp_dir, file, cache)
    }

    fn drain(iter: &mut HeapFileIterator) -> Vec<Record> {
        let mut out = Vec::new();
        while iter.has_next().unwrap() {
            out.push(iter.next().unwrap());
        }
        out
    }

    #[test]
    fn test_open_computes_geometry() {
        let (_temp_dir, file, _cache) = setup(300);
        // 4 + 24 = 28 bytes per record
        assert_eq!(file.slots_per_page(), 32768 / 225);
        assert_eq!(file.page_count(), 300usize.div_ceil(file.slots_per_page()));
        assert_eq!(file.schema(), &create_test_schema());
    }

    #[test]
    fn test_read_page() {
        let (_temp_dir, file, _cache) = setup(10);
        let page = file.read_page(PageId::new(file.id(), 0)).unwrap();
        assert_eq!(page.used_slot_count(), 10);
        assert_eq!(page.record(3).unwrap(), make_records(10)[3]);
    }

    #[test]
    fn test_read_page_rejects_foreign_or_missing_pages() {
        let (_temp_dir, file, _cache) = setup(10);
        let other = TableId::new(file.id().as_u32().wrapping_add(1));

        assert!(file.read_page(PageId::new(other, 0)).is_none());
        assert!(file.read_page(PageId::new(file.id(), 1)).is_none());
        assert!(matches!(
            file.try_read_page(PageId::new(file.id(), 5)),
            Err(RecordError::File(FileError::PageOutOfRange { page: 5, .. }))
        ));
    }

    #[test]
    fn test_iterator_visits_all_pages_read_only() {
        let (_temp_dir, file, cache) = setup(500);
        let mut iter = file.iterator(TransactionId::new(), cache.clone());
        iter.open().unwrap();

        let records = drain(&mut iter);
        assert_eq!(records, make_records(500));

        let requests = cache.requests.lock();
        let pages: Vec<usize> = requests.iter().map(|(pid, _)| pid.page_number).collect();
        assert_eq!(pages, (0..file.page_count()).collect::<Vec<_>>());
        assert!(requests.iter().all(|(_, p)| *p == Permission::ReadOnly));
    }

    #[test]
    fn test_iterator_skips_empty_pages() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("sparse.dat");
        let schema = create_test_schema();
        let records = make_records(3);

        let mut paged = PagedFile::create(&path).unwrap();
        paged.write_page(0, &vec![0u8; PAGE_SIZE]).unwrap();
        paged
            .write_page(1, &HeapPage::encode_slots(&schema, &[(5, &records[0])]).unwrap())
            .unwrap();
        paged.write_page(2, &vec![0u8; PAGE_SIZE]).unwrap();
        paged
            .write_page(3, &HeapPage::encode(&schema, &records[1..]).unwrap())
            .unwrap();
        drop(paged);

        let file = Arc::new(HeapFile::open(&path, schema).unwrap());
        let cache: Arc<dyn PageCache> = Arc::new(RecordingCache {
            file: Arc::clone(&file),
            requests: Mutex::new(Vec::new()),
        });
        let mut iter = file.iterator(TransactionId::new(), cache);
        iter.open().unwrap();
        assert_eq!(drain(&mut iter), records);
    }

    #[test]
    fn test_has_next_is_idempotent() {
        let (_temp_dir, file, cache) = setup(3);
        let mut iter = file.iterator(TransactionId::new(), cache);
        iter.open().unwrap();

        for _ in 0..5 {
            assert!(iter.has_next().unwrap());
        }
        assert_eq!(iter.next().unwrap(), make_records(3)[0]);
    }

    #[test]
    fn test_rewind_and_reopen_reproduce_sequence() {
        let (_temp_dir, file, cache) = setup(400);
        let mut iter = file.iterator(TransactionId::new(), cache);
        iter.open().unwrap();
        let first = drain(&mut iter);

        iter.rewind().unwrap();
        let second = drain(&mut iter);

        iter.close();
        iter.open().unwrap();
        let third = drain(&mut iter);

        assert_eq!(first.len(), 400);
        assert_eq!(first, second);
        assert_eq!(first, third);
    }

    #[test]
    fn test_usage_errors() {
        let (_temp_dir, file, cache) = setup(1);
        let mut iter = file.iterator(TransactionId::new(), cache);

        assert!(matches!(iter.has_next(), Err(ExecutionError::NotOpen)));
        assert!(matches!(iter.next(), Err(ExecutionError::NotOpen)));
        assert!(matches!(iter.rewind(), Err(ExecutionError::NotOpen)));

        iter.open().unwrap();
        iter.next().unwrap();
        assert!(!iter.has_next().unwrap());
        assert!(matches!(iter.next(), Err(ExecutionError::NoSuchElement)));

        iter.close();
        iter.close();
        assert!(matches!(iter.has_next(), Err(ExecutionError::NotOpen)));
    }

    #[test]
    fn test_empty_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("empty.dat");
        HeapFileEncoder::write_records(&path, &create_test_schema(), Vec::new()).unwrap();

        let file = Arc::new(HeapFile::open(&path, create_test_schema()).unwrap());
        assert_eq!(file.page_count(), 0);

        let cache: Arc<dyn PageCache> = Arc::new(RecordingCache {
            file: Arc::clone(&file),
            requests: Mutex::new(Vec::new()),
        });
        let mut iter = file.iterator(TransactionId::new(), cache);
        iter.open().unwrap();
        assert!(!iter.has_next().unwrap());
    }
}
