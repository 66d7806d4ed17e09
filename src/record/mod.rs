mod encoder;
mod error;
mod heap_file;
mod page;
mod record;
mod schema;
mod value;

pub use encoder::{EncodeStats, HeapFileEncoder};
pub use error::{RecordError, RecordResult};
pub use heap_file::{HeapFile, HeapFileIterator};
pub use page::{HeapPage, HeapPageIter};
pub use record::{PageId, Record, RecordId, SlotId};
pub use schema::{FieldDef, NULL_NAME, Schema};
pub use value::{DEFAULT_TEXT_CAPACITY, DataType, Value};
