use super::OpIterator;
use super::error::{ExecutionError, ExecutionResult};
use super::predicate::Predicate;
use crate::record::{Record, Schema};

enum FilterState {
    Closed,
    Open { lookahead: Option<Record> },
}

/// Re-emits the child's records that satisfy a predicate
pub struct Filter {
    predicate: Predicate,
    child: Box<dyn OpIterator>,
    state: FilterState,
}

impl Filter {
    pub fn new(predicate: Predicate, child: Box<dyn OpIterator>) -> Self {
        Self {
            predicate,
            child,
            state: FilterState::Closed,
        }
    }

    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    /// Advance the child to its next qualifying record
    fn pull(child: &mut dyn OpIterator, predicate: &Predicate) -> ExecutionResult<Option<Record>> {
        while child.has_next()? {
            let record = child.next()?;
            if predicate.matches(&record)? {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }
}

impl OpIterator for Filter {
    fn open(&mut self) -> ExecutionResult<()> {
        self.child.open()?;
        match Self::pull(self.child.as_mut(), &self.predicate) {
            Ok(lookahead) => {
                self.state = FilterState::Open { lookahead };
                Ok(())
            }
            Err(err) => {
                self.child.close();
                self.state = FilterState::Closed;
                Err(err)
            }
        }
    }

    fn has_next(&mut self) -> ExecutionResult<bool> {
        match &self.state {
            FilterState::Open { lookahead } => Ok(lookahead.is_some()),
            FilterState::Closed => Err(ExecutionError::NotOpen),
        }
    }

    fn next(&mut self) -> ExecutionResult<Record> {
        let FilterState::Open { lookahead } = &mut self.state else {
            return Err(ExecutionError::NotOpen);
        };
        let record = lookahead.take().ok_or(ExecutionError::NoSuchElement)?;
        *lookahead = Self::pull(self.child.as_mut(), &self.predicate)?;
        Ok(record)
    }

    fn rewind(&mut self) -> ExecutionResult<()> {
        let FilterState::Open { lookahead } = &mut self.state else {
            return Err(ExecutionError::NotOpen);
        };
        self.child.rewind()?;
        *lookahead = Self::pull(self.child.as_mut(), &self.predicate)?;
        Ok(())
    }

    fn close(&mut self) {
        self.child.close();
        self.state = FilterState::Closed;
    }

    fn schema(&self) -> &Schema {
        self.child.schema()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::{CompareOp, RecordListIterator, collect_records};
    use crate::record::{DataType, Value};
    use std::cell::Cell;
    use std::rc::Rc;

    /// Wraps a child and counts how many records were pulled from it
    struct CountingChild {
        inner: RecordListIterator,
        pulled: Rc<Cell<usize>>,
    }

    impl OpIterator for CountingChild {
        fn open(&mut self) -> ExecutionResult<()> {
            self.inner.open()
        }

        fn has_next(&mut self) -> ExecutionResult<bool> {
            self.inner.has_next()
        }

        fn next(&mut self) -> ExecutionResult<Record> {
            self.pulled.set(self.pulled.get() + 1);
            self.inner.next()
        }

        fn rewind(&mut self) -> ExecutionResult<()> {
            self.inner.rewind()
        }

        fn close(&mut self) {
            self.inner.close()
        }

        fn schema(&self) -> &Schema {
            self.inner.schema()
        }
    }

    fn numbers(values: &[i32]) -> RecordListIterator {
        let schema = Schema::named(vec![(DataType::Int, "n")]).unwrap();
        let records = values.iter().map(|&n| Record::new(vec![Value::Int(n)])).collect();
        RecordListIterator::new(schema, records)
    }

    fn ints(records: &[Record]) -> Vec<i32> {
        records
            .iter()
            .map(|r| r.values()[0].as_int().unwrap())
            .collect()
    }

    fn greater_than(n: i32) -> Predicate {
        Predicate::new(0, CompareOp::Gt, Value::Int(n)).unwrap()
    }

    #[test]
    fn test_filters_records() {
        let mut filter = Filter::new(greater_than(2), Box::new(numbers(&[1, 5, 2, 3, 0, 9])));
        filter.open().unwrap();
        assert_eq!(ints(&collect_records(&mut filter).unwrap()), vec![5, 3, 9]);
        assert!(matches!(filter.next(), Err(ExecutionError::NoSuchElement)));
    }

    #[test]
    fn test_has_next_is_idempotent() {
        let pulled = Rc::new(Cell::new(0));
        let child = CountingChild {
            inner: numbers(&[1, 7, 8]),
            pulled: Rc::clone(&pulled),
        };
        let mut filter = Filter::new(greater_than(5), Box::new(child));
        filter.open().unwrap();
        let after_open = pulled.get();

        for _ in 0..10 {
            assert!(filter.has_next().unwrap());
        }
        assert_eq!(pulled.get(), after_open);
        assert_eq!(ints(&[filter.next().unwrap()]), vec![7]);

        for _ in 0..3 {
            assert!(filter.has_next().unwrap());
        }
        assert_eq!(ints(&[filter.next().unwrap()]), vec![8]);
        assert!(!filter.has_next().unwrap());
        assert_eq!(pulled.get(), 3);
    }

    #[test]
    fn test_rewind_restarts_from_first_match() {
        let mut filter = Filter::new(greater_than(0), Box::new(numbers(&[0, 4, 0, 6])));
        filter.open().unwrap();
        let first = collect_records(&mut filter).unwrap();

        filter.rewind().unwrap();
        let second = collect_records(&mut filter).unwrap();

        filter.close();
        filter.open().unwrap();
        let third = collect_records(&mut filter).unwrap();

        assert_eq!(ints(&first), vec![4, 6]);
        assert_eq!(first, second);
        assert_eq!(first, third);
    }

    #[test]
    fn test_nothing_matches() {
        let mut filter = Filter::new(greater_than(100), Box::new(numbers(&[1, 2, 3])));
        filter.open().unwrap();
        assert!(!filter.has_next().unwrap());
    }

    #[test]
    fn test_usage_errors() {
        let mut filter = Filter::new(greater_than(0), Box::new(numbers(&[1])));
        assert!(matches!(filter.has_next(), Err(ExecutionError::NotOpen)));
        assert!(matches!(filter.next(), Err(ExecutionError::NotOpen)));
        assert!(matches!(filter.rewind(), Err(ExecutionError::NotOpen)));
        filter.close();
    }

    #[test]
    fn test_schema_is_childs() {
        let filter = Filter::new(greater_than(0), Box::new(numbers(&[1])));
        assert_eq!(filter.schema().name_at(0).unwrap(), Some("n"));
    }
}
