use log::{info, warn};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::file::TableId;
use crate::record::{DataType, HeapFile, RecordError, Schema};

/// File name of the persisted catalog inside a data directory
pub const CATALOG_FILE: &str = "catalog.json";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Record error: {0}")]
    Record(#[from] RecordError),

    #[error("Table {0} not found")]
    TableNotFound(TableId),

    #[error("Table {0} not found")]
    TableNameNotFound(String),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldMetadata {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub field_type: String, // Store as string for JSON: "INT", "TEXT(n)"
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableMetadata {
    pub name: String,
    /// Heap file path, relative to the data directory when it lives inside it
    pub file: PathBuf,
    pub fields: Vec<FieldMetadata>,
}

impl TableMetadata {
    pub fn schema(&self) -> CatalogResult<Schema> {
        let types = self
            .fields
            .iter()
            .map(|f| f.field_type.parse::<DataType>())
            .collect::<Result<Vec<_>, _>>()?;
        let names = self.fields.iter().map(|f| f.name.clone()).collect();
        Ok(Schema::new(types, names)?)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogMetadata {
    pub tables: Vec<TableMetadata>,
}

impl CatalogMetadata {
    pub fn load(data_dir: &Path) -> CatalogResult<Self> {
        let metadata_path = data_dir.join(CATALOG_FILE);
        let content = fs::read_to_string(&metadata_path)?;
        let metadata = serde_json::from_str(&content)?;
        Ok(metadata)
    }

    pub fn save(&self, data_dir: &Path) -> CatalogResult<()> {
        fs::create_dir_all(data_dir)?;
        let metadata_path = data_dir.join(CATALOG_FILE);
        let content = serde_json::to_string_pretty(&self)?;
        fs::write(&metadata_path, content)?;
        Ok(())
    }
}

struct TableEntry {
    name: String,
    file: Arc<HeapFile>,
}

#[derive(Default)]
struct CatalogInner {
    tables: HashMap<TableId, TableEntry>,
    names: HashMap<String, TableId>,
    /// Registration order, used for listing and persistence
    order: Vec<TableId>,
}

impl CatalogInner {
    fn remove(&mut self, table_id: TableId) -> Option<TableEntry> {
        let entry = self.tables.remove(&table_id)?;
        if self.names.get(&entry.name) == Some(&table_id) {
            self.names.remove(&entry.name);
        }
        self.order.retain(|id| *id != table_id);
        Some(entry)
    }

    /// Insert `file` as `name`, returning the path of a different file that
    /// held the same id and was dropped
    fn insert(&mut self, name: String, file: HeapFile) -> Option<PathBuf> {
        let table_id = file.id();
        if let Some(previous) = self.names.get(&name).copied() {
            self.remove(previous);
        }
        let displaced = self
            .remove(table_id)
            .map(|entry| entry.file.path().to_path_buf())
            .filter(|path| path.as_path() != file.path());

        self.names.insert(name.clone(), table_id);
        self.order.push(table_id);
        self.tables.insert(
            table_id,
            TableEntry {
                name,
                file: Arc::new(file),
            },
        );
        displaced
    }
}

/// Maps table ids to names and heap files
#[derive(Default)]
pub struct Catalog {
    inner: RwLock<CatalogInner>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `file` under `name`
    ///
    /// A table already registered under the same name, or backed by the same
    /// file, is replaced.
    pub fn add_table<S: Into<String>>(&self, file: HeapFile, name: S) -> TableId {
        let table_id = file.id();
        let path = file.path().to_path_buf();

        if let Some(displaced) = self.inner.write().insert(name.into(), file) {
            warn!(
                "Table id {} of {} collides with {}; the older table was dropped",
                table_id,
                path.display(),
                displaced.display()
            );
        }
        table_id
    }

    pub fn table_id(&self, name: &str) -> CatalogResult<TableId> {
        self.inner
            .read()
            .names
            .get(name)
            .copied()
            .ok_or_else(|| CatalogError::TableNameNotFound(name.to_string()))
    }

    pub fn table_name(&self, table_id: TableId) -> CatalogResult<String> {
        self.inner
            .read()
            .tables
            .get(&table_id)
            .map(|entry| entry.name.clone())
            .ok_or(CatalogError::TableNotFound(table_id))
    }

    /// Heap file backing `table_id`
    pub fn file(&self, table_id: TableId) -> CatalogResult<Arc<HeapFile>> {
        self.inner
            .read()
            .tables
            .get(&table_id)
            .map(|entry| Arc::clone(&entry.file))
            .ok_or(CatalogError::TableNotFound(table_id))
    }

    pub fn schema(&self, table_id: TableId) -> CatalogResult<Schema> {
        Ok(self.file(table_id)?.schema().clone())
    }

    /// Registered table ids, oldest first
    pub fn table_ids(&self) -> Vec<TableId> {
        self.inner.read().order.clone()
    }

    pub fn table_count(&self) -> usize {
        self.inner.read().order.len()
    }

    /// Register every table listed in `<data_dir>/catalog.json`
    ///
    /// A missing catalog file means an empty data directory.
    pub fn load(&self, data_dir: &Path) -> CatalogResult<usize> {
        if !data_dir.join(CATALOG_FILE).exists() {
            return Ok(0);
        }

        let metadata = CatalogMetadata::load(data_dir)?;
        for table in &metadata.tables {
            let schema = table.schema()?;
            let file = HeapFile::open(data_dir.join(&table.file), schema)?;
            info!(
                "Loaded table {} ({} pages) from {}",
                table.name,
                file.page_count(),
                file.path().display()
            );
            self.add_table(file, table.name.clone());
        }
        Ok(metadata.tables.len())
    }

    /// Write every registered table to `<data_dir>/catalog.json`
    pub fn save(&self, data_dir: &Path) -> CatalogResult<()> {
        fs::create_dir_all(data_dir)?;
        let base = data_dir.canonicalize()?;

        let inner = self.inner.read();
        let tables = inner
            .order
            .iter()
            .filter_map(|id| inner.tables.get(id))
            .map(|entry| {
                let path = entry.file.path();
                let file = path
                    .strip_prefix(&base)
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|_| path.to_path_buf());
                let fields = entry
                    .file
                    .schema()
                    .fields()
                    .iter()
                    .map(|f| FieldMetadata {
                        name: f.name.clone(),
                        field_type: f.data_type.to_string(),
                    })
                    .collect();
                TableMetadata {
                    name: entry.name.clone(),
                    file,
                    fields,
                }
            })
            .collect();

        CatalogMetadata { tables }.save(data_dir)
    }
}
