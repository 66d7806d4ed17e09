use thiserror::Error;

use super::AggregateOp;
use crate::buffer::BufferError;
use crate::catalog::CatalogError;
use crate::record::{DataType, RecordError};

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Iterator is not open")]
    NotOpen,

    #[error("No more records")]
    NoSuchElement,

    #[error("Record error: {0}")]
    Record(#[from] RecordError),

    #[error("Buffer error: {0}")]
    Buffer(#[from] BufferError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("{op} is not supported over {data_type} fields")]
    UnsupportedAggregate { op: AggregateOp, data_type: DataType },

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("{0} result does not fit in INT")]
    AggregateOverflow(AggregateOp),

    #[error("Unknown operator: {0}")]
    InvalidOperator(String),

    #[error("Invalid LIKE pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

pub type ExecutionResult<T> = Result<T, ExecutionError>;
