mod aggregate;
mod error;
mod filter;
mod predicate;
mod record_list;
mod seq_scan;

pub use aggregate::{Aggregate, AggregateOp, Aggregator, GroupBy};
pub use error::{ExecutionError, ExecutionResult};
pub use filter::Filter;
pub use predicate::{CompareOp, Predicate};
pub use record_list::RecordListIterator;
pub use seq_scan::SeqScan;

use crate::record::{Record, Schema};

/// Pull-based record producer shared by every operator
///
/// `open` must be called before any other method except `close` and
/// `schema`. `has_next` may be called any number of times between two calls
/// to `next` without side effects.
pub trait OpIterator {
    fn open(&mut self) -> ExecutionResult<()>;

    fn has_next(&mut self) -> ExecutionResult<bool>;

    /// Return the next record, or `NoSuchElement` when exhausted
    fn next(&mut self) -> ExecutionResult<Record>;

    /// Restart from the first record without releasing resources
    fn rewind(&mut self) -> ExecutionResult<()>;

    /// Release resources; safe to call at any time, including twice
    fn close(&mut self);

    fn schema(&self) -> &Schema;
}

/// Pull every remaining record out of an open iterator
pub fn collect_records(iter: &mut dyn OpIterator) -> ExecutionResult<Vec<Record>> {
    let mut records = Vec::new();
    while iter.has_next()? {
        records.push(iter.next()?);
    }
    Ok(records)
}
