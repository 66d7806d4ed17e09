use std::fmt;

use super::error::{RecordError, RecordResult};
use super::value::{DataType, Value};

/// Rendered in place of a missing alias or field name
pub const NULL_NAME: &str = "null";

/// Field definition: a type and an optional name
#[derive(Debug, Clone)]
pub struct FieldDef {
    pub data_type: DataType,
    pub name: Option<String>,
}

impl FieldDef {
    pub fn new(data_type: DataType, name: Option<String>) -> Self {
        Self { data_type, name }
    }

    /// Get the size of this field in bytes
    pub fn size(&self) -> usize {
        self.data_type.size()
    }
}

impl fmt::Display for FieldDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({})",
            self.data_type,
            self.name.as_deref().unwrap_or(NULL_NAME)
        )
    }
}

/// Ordered, immutable description of a record's fields
#[derive(Debug, Clone)]
pub struct Schema {
    fields: Vec<FieldDef>,
    record_size: usize,
}

impl Schema {
    /// Create a schema from parallel type and name lists
    pub fn new(types: Vec<DataType>, names: Vec<Option<String>>) -> RecordResult<Self> {
        if types.len() != names.len() {
            return Err(RecordError::SchemaMismatch(format!(
                "{} types but {} names",
                types.len(),
                names.len()
            )));
        }

        Self::from_fields(
            types
                .into_iter()
                .zip(names)
                .map(|(data_type, name)| FieldDef::new(data_type, name))
                .collect(),
        )
    }

    /// Create a schema whose fields are all unnamed
    pub fn anonymous(types: Vec<DataType>) -> RecordResult<Self> {
        let names = vec![None; types.len()];
        Self::new(types, names)
    }

    /// Create a schema from `(type, name)` pairs, all named
    pub fn named<S: Into<String>>(fields: Vec<(DataType, S)>) -> RecordResult<Self> {
        Self::from_fields(
            fields
                .into_iter()
                .map(|(data_type, name)| FieldDef::new(data_type, Some(name.into())))
                .collect(),
        )
    }

    fn from_fields(fields: Vec<FieldDef>) -> RecordResult<Self> {
        if fields.is_empty() {
            return Err(RecordError::EmptySchema);
        }
        let record_size = fields.iter().map(|f| f.size()).sum();
        Ok(Self {
            fields,
            record_size,
        })
    }

    /// Get all fields
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    fn field(&self, index: usize) -> RecordResult<&FieldDef> {
        self.fields
            .get(index)
            .ok_or(RecordError::FieldIndexOutOfRange {
                index,
                arity: self.fields.len(),
            })
    }

    /// Name of the field at `index`, which may be unnamed
    pub fn name_at(&self, index: usize) -> RecordResult<Option<&str>> {
        Ok(self.field(index)?.name.as_deref())
    }

    pub fn type_at(&self, index: usize) -> RecordResult<DataType> {
        Ok(self.field(index)?.data_type)
    }

    /// Position of the first field called `name`
    pub fn index_of(&self, name: &str) -> RecordResult<usize> {
        self.fields
            .iter()
            .position(|f| f.name.as_deref() == Some(name))
            .ok_or_else(|| RecordError::FieldNotFound(name.to_string()))
    }

    /// Get total record size in bytes
    pub fn byte_width(&self) -> usize {
        self.record_size
    }

    /// Fields of `left` followed by fields of `right`
    pub fn concat(left: &Schema, right: &Schema) -> Schema {
        let fields: Vec<FieldDef> = left.fields.iter().chain(&right.fields).cloned().collect();
        Schema {
            fields,
            record_size: left.record_size + right.record_size,
        }
    }

    /// Rename every field to `prefix.name`
    pub fn with_alias_prefix(&self, prefix: Option<&str>) -> Schema {
        let prefix = prefix.unwrap_or(NULL_NAME);
        let fields = self
            .fields
            .iter()
            .map(|f| {
                let name = format!("{}.{}", prefix, f.name.as_deref().unwrap_or(NULL_NAME));
                FieldDef::new(f.data_type, Some(name))
            })
            .collect();
        Schema {
            fields,
            record_size: self.record_size,
        }
    }

    /// Validate record values against this schema
    pub fn validate_record(&self, values: &[Value]) -> RecordResult<()> {
        if values.len() != self.fields.len() {
            return Err(RecordError::SchemaMismatch(format!(
                "Expected {} fields, got {}",
                self.fields.len(),
                values.len()
            )));
        }

        for (value, field) in values.iter().zip(&self.fields) {
            if !value.is_instance_of(&field.data_type) {
                return Err(RecordError::TypeMismatch {
                    expected: field.data_type.to_string(),
                    actual: format!("{:?}", value),
                });
            }
        }

        Ok(())
    }
}

/// Schemas are equal when their type sequences are; names are ignored
impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.fields.len() == other.fields.len()
            && self
                .fields
                .iter()
                .zip(&other.fields)
                .all(|(l, r)| l.data_type == r.data_type)
    }
}

impl Eq for Schema {}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", field)?;
        }
        Ok(())
    }
}
