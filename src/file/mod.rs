mod error;
mod paged_file;

pub use error::{FileError, FileResult};
pub use paged_file::{PagedFile, TableId};

/// Page size in bytes (4KB), shared by every heap file
pub const PAGE_SIZE: usize = 4096;

/// Default number of pages held by the buffer pool
pub const BUFFER_POOL_SIZE: usize = 50;

/// Zero-based page number within a file
pub type PageNumber = usize;
