use std::io;
use thiserror::Error;

use super::TableId;

#[derive(Debug, Error)]
pub enum FileError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("File already exists: {0}")]
    FileAlreadyExists(String),

    #[error("Page {page} out of range for table {table} ({page_count} pages)")]
    PageOutOfRange {
        table: TableId,
        page: usize,
        page_count: usize,
    },

    #[error("Page belongs to table {actual}, not {expected}")]
    WrongTable { expected: TableId, actual: TableId },

    #[error("Invalid page size: expected {expected}, got {actual}")]
    InvalidPageSize { expected: usize, actual: usize },
}

pub type FileResult<T> = Result<T, FileError>;
