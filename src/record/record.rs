use std::fmt;

use super::error::{RecordError, RecordResult};
use super::schema::Schema;
use super::value::Value;
use crate::file::{PageNumber, TableId};

/// Slot identifier within a page
pub type SlotId = usize;

/// Address of a page: the owning table and its page number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageId {
    pub table_id: TableId,
    pub page_number: PageNumber,
}

impl PageId {
    pub fn new(table_id: TableId, page_number: PageNumber) -> Self {
        Self {
            table_id,
            page_number,
        }
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.table_id, self.page_number)
    }
}

/// Physical identifier for a record (page + slot)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId {
    pub page_id: PageId,
    pub slot_id: SlotId,
}

impl RecordId {
    pub fn new(page_id: PageId, slot_id: SlotId) -> Self {
        Self { page_id, slot_id }
    }
}

/// A single record (row) with typed values
#[derive(Debug, Clone)]
pub struct Record {
    values: Vec<Value>,
    record_id: Option<RecordId>,
}

impl Record {
    /// Create a new record
    pub fn new(values: Vec<Value>) -> Self {
        Self {
            values,
            record_id: None,
        }
    }

    /// Get the number of values
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if record is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get a value by index
    pub fn get(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }

    /// Get a value by index, failing when out of range
    pub fn field(&self, idx: usize) -> RecordResult<&Value> {
        self.values.get(idx).ok_or(RecordError::FieldIndexOutOfRange {
            index: idx,
            arity: self.values.len(),
        })
    }

    /// Get all values
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Overwrite a value in place; the record never grows
    pub fn set(&mut self, idx: usize, value: Value) -> RecordResult<()> {
        let arity = self.values.len();
        let slot = self
            .values
            .get_mut(idx)
            .ok_or(RecordError::FieldIndexOutOfRange { index: idx, arity })?;
        *slot = value;
        Ok(())
    }

    /// Where this record is stored, if it was read from a page
    pub fn record_id(&self) -> Option<RecordId> {
        self.record_id
    }

    pub fn set_record_id(&mut self, record_id: Option<RecordId>) {
        self.record_id = record_id;
    }

    /// Serialize record to bytes according to schema
    /// Format: [field0 data] [field1 data] ...
    pub fn serialize(&self, schema: &Schema) -> RecordResult<Vec<u8>> {
        schema.validate_record(&self.values)?;

        let mut result = Vec::with_capacity(schema.byte_width());
        for (value, field) in self.values.iter().zip(schema.fields()) {
            let bytes = value.serialize(&field.data_type)?;
            result.extend_from_slice(&bytes);
        }

        Ok(result)
    }

    /// Deserialize record from bytes according to schema
    pub fn deserialize(data: &[u8], schema: &Schema) -> RecordResult<Self> {
        if data.len() != schema.byte_width() {
            return Err(RecordError::Deserialization(format!(
                "Expected {} bytes, got {}",
                schema.byte_width(),
                data.len()
            )));
        }

        let mut offset = 0;
        let mut values = Vec::with_capacity(schema.field_count());
        for field in schema.fields() {
            let size = field.size();
            values.push(Value::deserialize(
                &data[offset..offset + size],
                &field.data_type,
            )?);
            offset += size;
        }

        Ok(Record::new(values))
    }
}

/// Records compare by their values; where they are stored does not matter
impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

impl Eq for Record {}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, "\t")?;
            }
            write!(f, "{}", value)?;
        }
        Ok(())
    }
}
