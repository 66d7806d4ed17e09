pub mod buffer;
pub mod catalog;
pub mod database;
pub mod execution;
pub mod file;
pub mod record;

pub use buffer::{BufferPool, PageCache, Permission, TransactionId};
pub use catalog::Catalog;
pub use database::{Database, DatabaseError, DatabaseResult};
pub use execution::{
    Aggregate, AggregateOp, Aggregator, CompareOp, Filter, OpIterator, Predicate, SeqScan,
};
pub use file::{BUFFER_POOL_SIZE, PAGE_SIZE, TableId};
pub use record::{
    DataType, HeapFile, HeapPage, PageId, Record, RecordError, RecordId, RecordResult, Schema,
    Value,
};
