use log::info;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::buffer::{BufferPool, PageCache, TransactionId};
use crate::catalog::{Catalog, CatalogError};
use crate::execution::{ExecutionError, SeqScan};
use crate::file::{BUFFER_POOL_SIZE, TableId};
use crate::record::{HeapFile, HeapFileEncoder, Record, RecordError, Schema};

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Cannot read/write file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Catalog error: {0}")]
    CatalogError(#[from] CatalogError),

    #[error("Record error: {0}")]
    RecordError(#[from] RecordError),

    #[error("Execution error: {0}")]
    ExecutionError(#[from] ExecutionError),

    #[error("Invalid table name: {0}")]
    InvalidTableName(String),
}

pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Session context: the catalog and the page cache every query reads through
pub struct Database {
    data_dir: PathBuf,
    catalog: Arc<Catalog>,
    buffer_pool: Arc<BufferPool>,
}

impl Database {
    /// Open (or create) a data directory with the default pool size
    pub fn open<P: AsRef<Path>>(data_dir: P) -> DatabaseResult<Self> {
        Self::open_with_capacity(data_dir, BUFFER_POOL_SIZE)
    }

    pub fn open_with_capacity<P: AsRef<Path>>(data_dir: P, pool_pages: usize) -> DatabaseResult<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        fs::create_dir_all(&data_dir)?;

        let catalog = Arc::new(Catalog::new());
        let tables = catalog.load(&data_dir)?;
        info!("Opened {} with {} tables", data_dir.display(), tables);

        let buffer_pool = Arc::new(BufferPool::with_capacity(Arc::clone(&catalog), pool_pages));
        Ok(Self {
            data_dir,
            catalog,
            buffer_pool,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn buffer_pool(&self) -> &Arc<BufferPool> {
        &self.buffer_pool
    }

    pub fn page_cache(&self) -> Arc<dyn PageCache> {
        Arc::clone(&self.buffer_pool) as Arc<dyn PageCache>
    }

    /// Where the heap file of table `name` lives
    pub fn table_path(&self, name: &str) -> DatabaseResult<PathBuf> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(DatabaseError::InvalidTableName(name.to_string()));
        }
        Ok(self.data_dir.join(format!("{}.dat", name)))
    }

    /// Write `records` to a new heap file and register it as `name`
    pub fn create_table<I>(&self, name: &str, schema: Schema, records: I) -> DatabaseResult<TableId>
    where
        I: IntoIterator<Item = Record>,
    {
        let path = self.table_path(name)?;
        HeapFileEncoder::write_records(&path, &schema, records)?;
        self.register(name, &path, schema)
    }

    /// Encode a headerless CSV file as table `name`
    pub fn import_csv<P: AsRef<Path>>(
        &self,
        name: &str,
        csv_path: P,
        schema: Schema,
        delimiter: u8,
    ) -> DatabaseResult<TableId> {
        let path = self.table_path(name)?;
        HeapFileEncoder::convert_csv(csv_path, &path, &schema, delimiter)?;
        self.register(name, &path, schema)
    }

    fn register(&self, name: &str, path: &Path, schema: Schema) -> DatabaseResult<TableId> {
        let file = HeapFile::open(path, schema)?;
        let table_id = self.catalog.add_table(file, name);
        self.save_catalog()?;
        Ok(table_id)
    }

    /// Scan table `name` on behalf of `tid`
    pub fn seq_scan(
        &self,
        tid: TransactionId,
        name: &str,
        alias: Option<&str>,
    ) -> DatabaseResult<SeqScan> {
        let table_id = self.catalog.table_id(name)?;
        Ok(SeqScan::new(
            Arc::clone(&self.catalog),
            self.page_cache(),
            tid,
            table_id,
            alias,
        )?)
    }

    pub fn save_catalog(&self) -> DatabaseResult<()> {
        self.catalog.save(&self.data_dir)?;
        Ok(())
    }
}
