use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use super::error::{RecordError, RecordResult};

/// Capacity used for text fields declared without one
pub const DEFAULT_TEXT_CAPACITY: usize = 128;

/// Bytes used to store the length prefix of a text field
const TEXT_LENGTH_PREFIX: usize = 4;

/// Represents a field data type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Int,         // 4 bytes
    Text(usize), // 4-byte length + n bytes (fixed capacity)
}

impl DataType {
    /// Text type with the default capacity
    pub fn text() -> Self {
        DataType::Text(DEFAULT_TEXT_CAPACITY)
    }

    /// Get the size in bytes for this data type
    pub fn size(&self) -> usize {
        match self {
            DataType::Int => 4,
            DataType::Text(n) => TEXT_LENGTH_PREFIX + n,
        }
    }

    /// Parse a literal of this type, e.g. a CSV cell or a CLI operand
    pub fn parse_value(&self, literal: &str) -> RecordResult<Value> {
        match self {
            DataType::Int => literal
                .trim()
                .parse::<i32>()
                .map(Value::Int)
                .map_err(|e| RecordError::TypeMismatch {
                    expected: self.to_string(),
                    actual: format!("{:?} ({})", literal, e),
                }),
            DataType::Text(_) => Ok(Value::Text(literal.to_string())),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Int => write!(f, "INT"),
            DataType::Text(n) => write!(f, "TEXT({})", n),
        }
    }
}

impl FromStr for DataType {
    type Err = RecordError;

    /// Accepts `INT`, `TEXT`, `STRING` and `TEXT(n)`/`VARCHAR(n)`/`CHAR(n)`
    fn from_str(s: &str) -> RecordResult<Self> {
        let upper = s.trim().to_ascii_uppercase();
        match upper.as_str() {
            "INT" | "INTEGER" => return Ok(DataType::Int),
            "TEXT" | "STRING" => return Ok(DataType::text()),
            _ => {}
        }

        let capacity = ["TEXT(", "VARCHAR(", "CHAR("]
            .iter()
            .find_map(|prefix| upper.strip_prefix(prefix))
            .and_then(|rest| rest.strip_suffix(')'))
            .and_then(|n| n.trim().parse::<usize>().ok())
            .ok_or_else(|| RecordError::InvalidFieldType(s.to_string()))?;

        Ok(DataType::Text(capacity))
    }
}

/// Represents a single field value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Int(i32),
    Text(String),
}

impl Value {
    /// Whether this value can be stored in a field of `data_type`
    pub fn is_instance_of(&self, data_type: &DataType) -> bool {
        matches!(
            (self, data_type),
            (Value::Int(_), DataType::Int) | (Value::Text(_), DataType::Text(_))
        )
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Int(_) => None,
            Value::Text(s) => Some(s),
        }
    }

    /// Order two values of the same kind; `None` across kinds
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(l), Value::Int(r)) => Some(l.cmp(r)),
            (Value::Text(l), Value::Text(r)) => Some(l.cmp(r)),
            _ => None,
        }
    }

    /// Serialize value to bytes
    /// Text is length-prefixed and zero padded to the declared capacity
    pub fn serialize(&self, data_type: &DataType) -> RecordResult<Vec<u8>> {
        match (self, data_type) {
            (Value::Int(i), DataType::Int) => Ok(i.to_be_bytes().to_vec()),
            (Value::Text(s), DataType::Text(capacity)) => {
                let bytes = s.as_bytes();
                if bytes.len() > *capacity {
                    return Err(RecordError::Serialization(format!(
                        "String length {} exceeds capacity {}",
                        bytes.len(),
                        capacity
                    )));
                }
                let mut result = vec![0u8; data_type.size()];
                result[..TEXT_LENGTH_PREFIX].copy_from_slice(&(bytes.len() as u32).to_be_bytes());
                result[TEXT_LENGTH_PREFIX..TEXT_LENGTH_PREFIX + bytes.len()].copy_from_slice(bytes);
                Ok(result)
            }
            _ => Err(RecordError::TypeMismatch {
                expected: data_type.to_string(),
                actual: format!("{:?}", self),
            }),
        }
    }

    /// Deserialize value from bytes
    pub fn deserialize(bytes: &[u8], data_type: &DataType) -> RecordResult<Self> {
        if bytes.len() != data_type.size() {
            return Err(RecordError::Deserialization(format!(
                "Expected {} bytes for {}, got {}",
                data_type.size(),
                data_type,
                bytes.len()
            )));
        }

        match data_type {
            DataType::Int => {
                let mut buf = [0u8; 4];
                buf.copy_from_slice(bytes);
                Ok(Value::Int(i32::from_be_bytes(buf)))
            }
            DataType::Text(capacity) => {
                let mut len_buf = [0u8; TEXT_LENGTH_PREFIX];
                len_buf.copy_from_slice(&bytes[..TEXT_LENGTH_PREFIX]);
                let len = u32::from_be_bytes(len_buf) as usize;
                if len > *capacity {
                    return Err(RecordError::Deserialization(format!(
                        "Stored length {} exceeds capacity {}",
                        len, capacity
                    )));
                }
                let data = &bytes[TEXT_LENGTH_PREFIX..TEXT_LENGTH_PREFIX + len];
                let s = String::from_utf8(data.to_vec())
                    .map_err(|e| RecordError::Deserialization(format!("Invalid UTF-8: {}", e)))?;
                Ok(Value::Text(s))
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}
