use super::OpIterator;
use super::error::{ExecutionError, ExecutionResult};
use crate::record::{Record, Schema};

enum ListState {
    Closed,
    Open { position: usize },
}

/// Iterates a materialized list of records
pub struct RecordListIterator {
    schema: Schema,
    records: Vec<Record>,
    state: ListState,
}

impl RecordListIterator {
    pub fn new(schema: Schema, records: Vec<Record>) -> Self {
        Self {
            schema,
            records,
            state: ListState::Closed,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn position(&self) -> ExecutionResult<usize> {
        match self.state {
            ListState::Open { position } => Ok(position),
            ListState::Closed => Err(ExecutionError::NotOpen),
        }
    }
}

impl OpIterator for RecordListIterator {
    fn open(&mut self) -> ExecutionResult<()> {
        self.state = ListState::Open { position: 0 };
        Ok(())
    }

    fn has_next(&mut self) -> ExecutionResult<bool> {
        Ok(self.position()? < self.records.len())
    }

    fn next(&mut self) -> ExecutionResult<Record> {
        let position = self.position()?;
        let record = self
            .records
            .get(position)
            .cloned()
            .ok_or(ExecutionError::NoSuchElement)?;
        self.state = ListState::Open {
            position: position + 1,
        };
        Ok(record)
    }

    fn rewind(&mut self) -> ExecutionResult<()> {
        self.position()?;
        self.open()
    }

    fn close(&mut self) {
        self.state = ListState::Closed;
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }
}
