use ahash::AHashMap;
use log::debug;
use std::fmt;
use std::str::FromStr;

use super::OpIterator;
use super::error::{ExecutionError, ExecutionResult};
use super::record_list::RecordListIterator;
use crate::record::{DataType, NULL_NAME, Record, Schema, Value};

/// Reduction applied to each group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateOp {
    Count,
    Sum,
    Min,
    Max,
    Avg,
}

impl fmt::Display for AggregateOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AggregateOp::Count => "count",
            AggregateOp::Sum => "sum",
            AggregateOp::Min => "min",
            AggregateOp::Max => "max",
            AggregateOp::Avg => "avg",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for AggregateOp {
    type Err = ExecutionError;

    fn from_str(s: &str) -> ExecutionResult<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "COUNT" => Ok(AggregateOp::Count),
            "SUM" => Ok(AggregateOp::Sum),
            "MIN" => Ok(AggregateOp::Min),
            "MAX" => Ok(AggregateOp::Max),
            "AVG" => Ok(AggregateOp::Avg),
            _ => Err(ExecutionError::InvalidOperator(s.to_string())),
        }
    }
}

/// Which field, if any, buckets records into groups
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupBy {
    None,
    Field { index: usize, data_type: DataType },
}

#[derive(Debug, Clone)]
enum AggState {
    Count(i64),
    Sum(i64),
    Min(i32),
    Max(i32),
    Avg { sum: i64, count: i64 },
}

impl AggState {
    /// State after merging the first record of a group
    fn start(op: AggregateOp, value: Option<i32>) -> Self {
        let v = value.unwrap_or_default();
        match op {
            AggregateOp::Count => AggState::Count(1),
            AggregateOp::Sum => AggState::Sum(v as i64),
            AggregateOp::Min => AggState::Min(v),
            AggregateOp::Max => AggState::Max(v),
            AggregateOp::Avg => AggState::Avg {
                sum: v as i64,
                count: 1,
            },
        }
    }

    /// State of an ungrouped aggregate that saw no records; MIN, MAX and AVG
    /// have no INT value to report
    fn empty(op: AggregateOp) -> Option<Self> {
        match op {
            AggregateOp::Count => Some(AggState::Count(0)),
            AggregateOp::Sum => Some(AggState::Sum(0)),
            AggregateOp::Min | AggregateOp::Max | AggregateOp::Avg => None,
        }
    }

    fn merge(&mut self, value: Option<i32>) {
        let v = value.unwrap_or_default();
        match self {
            AggState::Count(count) => *count += 1,
            AggState::Sum(sum) => *sum += v as i64,
            AggState::Min(min) => *min = (*min).min(v),
            AggState::Max(max) => *max = (*max).max(v),
            AggState::Avg { sum, count } => {
                *sum += v as i64;
                *count += 1;
            }
        }
    }

    fn finish(&self, op: AggregateOp) -> ExecutionResult<i32> {
        let result = match self {
            AggState::Count(count) => *count,
            AggState::Sum(sum) => *sum,
            AggState::Min(min) => return Ok(*min),
            AggState::Max(max) => return Ok(*max),
            // Integer division truncates toward zero
            AggState::Avg { sum, count } => *sum / *count,
        };
        i32::try_from(result).map_err(|_| ExecutionError::AggregateOverflow(op))
    }
}

/// Folds records into per-group reductions
pub struct Aggregator {
    group_by: GroupBy,
    agg_field: usize,
    op: AggregateOp,
    /// Group key to position in `groups`; `None` is the single ungrouped key
    index: AHashMap<Option<Value>, usize>,
    groups: Vec<(Option<Value>, AggState)>,
}

impl Aggregator {
    /// Text fields support only COUNT
    pub fn new(
        group_by: GroupBy,
        agg_field: usize,
        agg_type: DataType,
        op: AggregateOp,
    ) -> ExecutionResult<Self> {
        if matches!(agg_type, DataType::Text(_)) && op != AggregateOp::Count {
            return Err(ExecutionError::UnsupportedAggregate {
                op,
                data_type: agg_type,
            });
        }

        Ok(Self {
            group_by,
            agg_field,
            op,
            index: AHashMap::new(),
            groups: Vec::new(),
        })
    }

    pub fn op(&self) -> AggregateOp {
        self.op
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Fold one record into its group
    pub fn merge_record(&mut self, record: &Record) -> ExecutionResult<()> {
        let key = match self.group_by {
            GroupBy::None => None,
            GroupBy::Field { index, data_type } => {
                let value = record.field(index)?;
                if !value.is_instance_of(&data_type) {
                    return Err(ExecutionError::TypeMismatch(format!(
                        "group field {} holds {:?}, expected {}",
                        index, value, data_type
                    )));
                }
                Some(value.clone())
            }
        };

        let value = record.field(self.agg_field)?;
        let operand = match self.op {
            AggregateOp::Count => None,
            _ => Some(value.as_int().ok_or_else(|| {
                ExecutionError::TypeMismatch(format!(
                    "{} requires an INT field, got {:?}",
                    self.op, value
                ))
            })?),
        };

        match self.index.get(&key).copied() {
            Some(position) => self.groups[position].1.merge(operand),
            None => {
                self.index.insert(key.clone(), self.groups.len());
                self.groups.push((key, AggState::start(self.op, operand)));
            }
        }
        Ok(())
    }

    /// Output layout: `(group value, result)` when grouped, else `(result)`
    pub fn schema(&self) -> ExecutionResult<Schema> {
        let mut types = Vec::with_capacity(2);
        if let GroupBy::Field { data_type, .. } = self.group_by {
            types.push(data_type);
        }
        types.push(DataType::Int);
        Ok(Schema::anonymous(types)?)
    }

    /// One record per group, in the order groups were first seen
    ///
    /// Ungrouped COUNT and SUM over no records still yield a single `(0)`;
    /// ungrouped MIN, MAX and AVG yield nothing.
    pub fn results(&self) -> ExecutionResult<Vec<Record>> {
        debug!("Materializing {} {} groups", self.groups.len(), self.op);
        if self.groups.is_empty() && self.group_by == GroupBy::None {
            return AggState::empty(self.op)
                .map(|state| self.result_record(None, &state))
                .into_iter()
                .collect();
        }

        self.groups
            .iter()
            .map(|(key, state)| self.result_record(key.as_ref(), state))
            .collect()
    }

    fn result_record(&self, key: Option<&Value>, state: &AggState) -> ExecutionResult<Record> {
        let result = Value::Int(state.finish(self.op)?);
        let values = match key {
            Some(group) => vec![group.clone(), result],
            None => vec![result],
        };
        Ok(Record::new(values))
    }

    pub fn iterator(&self) -> ExecutionResult<RecordListIterator> {
        Ok(RecordListIterator::new(self.schema()?, self.results()?))
    }
}

enum AggregateState {
    Closed,
    Open { results: RecordListIterator },
}

/// Operator computing one aggregate over its child, optionally grouped
pub struct Aggregate {
    child: Box<dyn OpIterator>,
    agg_field: usize,
    group_field: Option<usize>,
    op: AggregateOp,
    schema: Schema,
    state: AggregateState,
}

impl Aggregate {
    pub fn new(
        child: Box<dyn OpIterator>,
        agg_field: usize,
        group_field: Option<usize>,
        op: AggregateOp,
    ) -> ExecutionResult<Self> {
        let child_schema = child.schema();
        let agg_type = child_schema.type_at(agg_field)?;
        // Reject unsupported combinations before any record is read
        Aggregator::new(GroupBy::None, agg_field, agg_type, op)?;

        let agg_name = format!(
            "{}({})",
            op,
            child_schema.name_at(agg_field)?.unwrap_or(NULL_NAME)
        );
        let mut types = Vec::with_capacity(2);
        let mut names = Vec::with_capacity(2);
        if let Some(group_field) = group_field {
            types.push(child_schema.type_at(group_field)?);
            names.push(child_schema.name_at(group_field)?.map(str::to_string));
        }
        types.push(DataType::Int);
        names.push(Some(agg_name));

        Ok(Self {
            schema: Schema::new(types, names)?,
            child,
            agg_field,
            group_field,
            op,
            state: AggregateState::Closed,
        })
    }

    pub fn group_field(&self) -> Option<usize> {
        self.group_field
    }

    pub fn agg_field(&self) -> usize {
        self.agg_field
    }

    pub fn op(&self) -> AggregateOp {
        self.op
    }

    /// Name of the grouping field in the output, if grouped
    pub fn group_field_name(&self) -> Option<&str> {
        self.group_field
            .and_then(|_| self.schema.name_at(0).ok().flatten())
    }

    pub fn aggregate_field_name(&self) -> Option<&str> {
        let last = self.schema.field_count() - 1;
        self.schema.name_at(last).ok().flatten()
    }

    fn compute(&mut self) -> ExecutionResult<RecordListIterator> {
        let child_schema = self.child.schema();
        let group_by = match self.group_field {
            Some(index) => GroupBy::Field {
                index,
                data_type: child_schema.type_at(index)?,
            },
            None => GroupBy::None,
        };
        let agg_type = child_schema.type_at(self.agg_field)?;
        let mut aggregator = Aggregator::new(group_by, self.agg_field, agg_type, self.op)?;

        while self.child.has_next()? {
            aggregator.merge_record(&self.child.next()?)?;
        }

        let mut results = RecordListIterator::new(self.schema.clone(), aggregator.results()?);
        results.open()?;
        Ok(results)
    }

    fn results(&mut self) -> ExecutionResult<&mut RecordListIterator> {
        match &mut self.state {
            AggregateState::Open { results } => Ok(results),
            AggregateState::Closed => Err(ExecutionError::NotOpen),
        }
    }
}

impl OpIterator for Aggregate {
    fn open(&mut self) -> ExecutionResult<()> {
        self.child.open()?;
        match self.compute() {
            Ok(results) => {
                self.state = AggregateState::Open { results };
                Ok(())
            }
            Err(err) => {
                self.child.close();
                self.state = AggregateState::Closed;
                Err(err)
            }
        }
    }

    fn has_next(&mut self) -> ExecutionResult<bool> {
        self.results()?.has_next()
    }

    fn next(&mut self) -> ExecutionResult<Record> {
        self.results()?.next()
    }

    /// Replays the computed groups; the child is not read again
    fn rewind(&mut self) -> ExecutionResult<()> {
        self.results()?.rewind()
    }

    fn close(&mut self) {
        self.child.close();
        self.state = AggregateState::Closed;
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }
}
