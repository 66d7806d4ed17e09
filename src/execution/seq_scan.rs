use std::sync::Arc;

use super::OpIterator;
use super::error::ExecutionResult;
use crate::buffer::{PageCache, TransactionId};
use crate::catalog::Catalog;
use crate::file::TableId;
use crate::record::{HeapFileIterator, Record, Schema};

/// Sequential scan over one table, with field names qualified by an alias
pub struct SeqScan {
    catalog: Arc<Catalog>,
    cache: Arc<dyn PageCache>,
    tid: TransactionId,
    table_id: TableId,
    table_name: String,
    alias: String,
    schema: Schema,
    cursor: HeapFileIterator,
}

impl SeqScan {
    /// Scan `table_id`, naming output fields `alias.field`
    ///
    /// `None` means "use the table name" as the alias, so the `null`
    /// placeholder of `Schema::with_alias_prefix` never shows up here.
    pub fn new(
        catalog: Arc<Catalog>,
        cache: Arc<dyn PageCache>,
        tid: TransactionId,
        table_id: TableId,
        alias: Option<&str>,
    ) -> ExecutionResult<Self> {
        let target = Target::resolve(&catalog, &cache, tid, table_id, alias)?;
        Ok(Self {
            catalog,
            cache,
            tid,
            table_id,
            table_name: target.table_name,
            alias: target.alias,
            schema: target.schema,
            cursor: target.cursor,
        })
    }

    pub fn table_id(&self) -> TableId {
        self.table_id
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Point the scan at another table; it must be opened again
    pub fn reset(&mut self, table_id: TableId, alias: Option<&str>) -> ExecutionResult<()> {
        let target = Target::resolve(&self.catalog, &self.cache, self.tid, table_id, alias)?;
        self.cursor.close();

        self.table_id = table_id;
        self.table_name = target.table_name;
        self.alias = target.alias;
        self.schema = target.schema;
        self.cursor = target.cursor;
        Ok(())
    }
}

struct Target {
    table_name: String,
    alias: String,
    schema: Schema,
    cursor: HeapFileIterator,
}

impl Target {
    fn resolve(
        catalog: &Catalog,
        cache: &Arc<dyn PageCache>,
        tid: TransactionId,
        table_id: TableId,
        alias: Option<&str>,
    ) -> ExecutionResult<Self> {
        let table_name = catalog.table_name(table_id)?;
        let file = catalog.file(table_id)?;
        let alias = alias.map_or_else(|| table_name.clone(), str::to_string);
        let schema = file.schema().with_alias_prefix(Some(&alias));

        Ok(Self {
            table_name,
            alias,
            schema,
            cursor: file.iterator(tid, Arc::clone(cache)),
        })
    }
}

impl OpIterator for SeqScan {
    fn open(&mut self) -> ExecutionResult<()> {
        self.cursor.open()
    }

    fn has_next(&mut self) -> ExecutionResult<bool> {
        self.cursor.has_next()
    }

    fn next(&mut self) -> ExecutionResult<Record> {
        self.cursor.next()
    }

    fn rewind(&mut self) -> ExecutionResult<()> {
        self.cursor.rewind()
    }

    fn close(&mut self) {
        self.cursor.close()
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }
}
