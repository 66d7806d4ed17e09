mod buffer_pool;
mod error;

pub use buffer_pool::BufferPool;
pub use error::{BufferError, BufferResult};

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::record::{HeapPage, PageId};

static NEXT_TRANSACTION_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies the transaction on whose behalf pages are fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionId(u64);

impl TransactionId {
    /// Allocate a fresh, process-unique id
    pub fn new() -> Self {
        Self(NEXT_TRANSACTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tx{}", self.0)
    }
}

/// Access level requested for a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Permission {
    ReadOnly,
    ReadWrite,
}

/// Resolves page ids to live pages
///
/// Repeated fetches of one page return the same shared instance for as long
/// as the cache holds it.
pub trait PageCache: Send + Sync {
    fn fetch(
        &self,
        tid: TransactionId,
        page_id: PageId,
        permission: Permission,
    ) -> BufferResult<Arc<HeapPage>>;
}
