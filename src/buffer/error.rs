use thiserror::Error;

use crate::catalog::CatalogError;
use crate::record::{PageId, RecordError};

#[derive(Debug, Error)]
pub enum BufferError {
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Record error: {0}")]
    Record(#[from] RecordError),

    #[error("Page {0} could not be read")]
    PageUnavailable(PageId),
}

pub type BufferResult<T> = Result<T, BufferError>;
