use crate::file::FileError;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("File error: {0}")]
    File(#[from] FileError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("A schema needs at least one field")]
    EmptySchema,

    #[error("Field index {index} out of range for arity {arity}")]
    FieldIndexOutOfRange { index: usize, arity: usize },

    #[error("No field named {0}")]
    FieldNotFound(String),

    #[error("Invalid field type: {0}")]
    InvalidFieldType(String),

    #[error("Invalid slot: {0}")]
    InvalidSlot(usize),

    #[error("Page full: {0} slots")]
    PageFull(usize),

    #[error("Record width {0} does not fit in a page")]
    RecordTooLarge(usize),

    #[error("Malformed page: {0}")]
    MalformedPage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },
}

pub type RecordResult<T> = Result<T, RecordError>;
