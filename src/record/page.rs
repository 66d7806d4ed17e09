use std::sync::Arc;

use super::error::{RecordError, RecordResult};
use super::record::{PageId, Record, RecordId, SlotId};
use super::schema::Schema;
use crate::file::PAGE_SIZE;

/// Read-only view of one heap page
///
/// Layout: `[bitmap: ceil(S/8) bytes][slot 0]...[slot S-1]`. Bit `i` of the
/// bitmap (LSB first within each byte) is set when slot `i` holds a record.
#[derive(Debug)]
pub struct HeapPage {
    id: PageId,
    schema: Arc<Schema>,
    slot_count: usize,
    buffer: Box<[u8]>,
}

impl HeapPage {
    /// Calculate maximum number of slots for a given record size
    pub fn calculate_slot_count(record_size: usize) -> usize {
        if record_size == 0 {
            return 0;
        }

        // Each slot costs its record bytes plus one bitmap bit:
        // slot_count * (record_size * 8 + 1) <= PAGE_SIZE * 8
        (PAGE_SIZE * 8) / (record_size * 8 + 1)
    }

    /// Bytes taken by the occupancy bitmap
    pub fn bitmap_size(slot_count: usize) -> usize {
        slot_count.div_ceil(8)
    }

    /// Decode a raw page read from disk
    pub fn from_bytes(id: PageId, schema: Arc<Schema>, buffer: Vec<u8>) -> RecordResult<Self> {
        if buffer.len() != PAGE_SIZE {
            return Err(RecordError::MalformedPage(format!(
                "Buffer must be PAGE_SIZE ({}) bytes, got {}",
                PAGE_SIZE,
                buffer.len()
            )));
        }

        let slot_count = Self::calculate_slot_count(schema.byte_width());
        if slot_count == 0 {
            return Err(RecordError::RecordTooLarge(schema.byte_width()));
        }

        // Padding bits after the last slot must be clear
        let trailing_bits = slot_count % 8;
        if trailing_bits != 0 {
            let last = buffer[Self::bitmap_size(slot_count) - 1];
            if last >> trailing_bits != 0 {
                return Err(RecordError::MalformedPage(format!(
                    "Page {} marks slots beyond its {} slots",
                    id, slot_count
                )));
            }
        }

        Ok(Self {
            id,
            schema,
            slot_count,
            buffer: buffer.into_boxed_slice(),
        })
    }

    /// Build page bytes with each record placed in its given slot
    pub fn encode_slots(schema: &Schema, records: &[(SlotId, &Record)]) -> RecordResult<Vec<u8>> {
        let record_size = schema.byte_width();
        let slot_count = Self::calculate_slot_count(record_size);
        if slot_count == 0 {
            return Err(RecordError::RecordTooLarge(record_size));
        }

        let data_start = Self::bitmap_size(slot_count);
        let mut buffer = vec![0u8; PAGE_SIZE];
        for &(slot_id, record) in records {
            if slot_id >= slot_count {
                return Err(RecordError::InvalidSlot(slot_id));
            }
            let bytes = record.serialize(schema)?;
            let start = data_start + slot_id * record_size;
            buffer[start..start + record_size].copy_from_slice(&bytes);
            buffer[slot_id / 8] |= 1 << (slot_id % 8);
        }

        Ok(buffer)
    }

    /// Build page bytes with records packed into slots `0..records.len()`
    pub fn encode(schema: &Schema, records: &[Record]) -> RecordResult<Vec<u8>> {
        let slot_count = Self::calculate_slot_count(schema.byte_width());
        if records.len() > slot_count {
            return Err(RecordError::PageFull(slot_count));
        }
        let placed: Vec<(SlotId, &Record)> = records.iter().enumerate().collect();
        Self::encode_slots(schema, &placed)
    }

    pub fn id(&self) -> PageId {
        self.id
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Get the number of slots in this page
    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    /// Check if a slot is used
    pub fn is_slot_used(&self, slot_id: SlotId) -> bool {
        if slot_id >= self.slot_count {
            return false;
        }
        (self.buffer[slot_id / 8] & (1 << (slot_id % 8))) != 0
    }

    /// Number of occupied slots
    pub fn used_slot_count(&self) -> usize {
        self.buffer[..Self::bitmap_size(self.slot_count)]
            .iter()
            .map(|b| b.count_ones() as usize)
            .sum()
    }

    /// Get the number of free slots
    pub fn free_slot_count(&self) -> usize {
        self.slot_count - self.used_slot_count()
    }

    /// First occupied slot at or after `from`
    pub fn next_used_slot(&self, from: SlotId) -> Option<SlotId> {
        (from..self.slot_count).find(|&slot_id| self.is_slot_used(slot_id))
    }

    /// Get record data from a slot
    pub fn record_bytes(&self, slot_id: SlotId) -> RecordResult<&[u8]> {
        if !self.is_slot_used(slot_id) {
            return Err(RecordError::InvalidSlot(slot_id));
        }

        let record_size = self.schema.byte_width();
        let start = Self::bitmap_size(self.slot_count) + slot_id * record_size;
        Ok(&self.buffer[start..start + record_size])
    }

    /// Decode the record in an occupied slot, tagged with its record id
    pub fn record(&self, slot_id: SlotId) -> RecordResult<Record> {
        let mut record = Record::deserialize(self.record_bytes(slot_id)?, &self.schema)?;
        record.set_record_id(Some(RecordId::new(self.id, slot_id)));
        Ok(record)
    }

    /// Iterate occupied slots in ascending slot order
    pub fn iter(&self) -> HeapPageIter<'_> {
        HeapPageIter {
            page: self,
            next_slot: 0,
        }
    }
}

/// Iterator over the records of a page
pub struct HeapPageIter<'a> {
    page: &'a HeapPage,
    next_slot: SlotId,
}

impl Iterator for HeapPageIter<'_> {
    type Item = RecordResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        let slot_id = self.page.next_used_slot(self.next_slot)?;
        self.next_slot = slot_id + 1;
        Some(self.page.record(slot_id))
    }
}
