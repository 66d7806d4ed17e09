use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use super::error::{ExecutionError, ExecutionResult};
use crate::record::{Record, Value};

/// Comparison applied between a record field and a constant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Like,
}

impl CompareOp {
    fn holds(&self, cmp: Ordering) -> bool {
        match self {
            CompareOp::Eq => cmp == Ordering::Equal,
            CompareOp::Ne => cmp != Ordering::Equal,
            CompareOp::Lt => cmp == Ordering::Less,
            CompareOp::Le => cmp != Ordering::Greater,
            CompareOp::Gt => cmp == Ordering::Greater,
            CompareOp::Ge => cmp != Ordering::Less,
            CompareOp::Like => false,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Like => "LIKE",
        };
        write!(f, "{}", symbol)
    }
}

impl FromStr for CompareOp {
    type Err = ExecutionError;

    fn from_str(s: &str) -> ExecutionResult<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "=" | "==" | "EQ" => Ok(CompareOp::Eq),
            "<>" | "!=" | "NE" => Ok(CompareOp::Ne),
            ">" | "GT" => Ok(CompareOp::Gt),
            ">=" | "GE" => Ok(CompareOp::Ge),
            "<" | "LT" => Ok(CompareOp::Lt),
            "<=" | "LE" => Ok(CompareOp::Le),
            "LIKE" => Ok(CompareOp::Like),
            _ => Err(ExecutionError::InvalidOperator(s.to_string())),
        }
    }
}

/// Compares one field of each record against a constant operand
#[derive(Debug, Clone)]
pub struct Predicate {
    field: usize,
    op: CompareOp,
    operand: Value,
    /// Compiled operand for `LIKE`
    pattern: Option<Regex>,
}

impl Predicate {
    pub fn new(field: usize, op: CompareOp, operand: Value) -> ExecutionResult<Self> {
        let pattern = match (op, &operand) {
            (CompareOp::Like, Value::Text(text)) => Some(Regex::new(&like_pattern_to_regex(text))?),
            (CompareOp::Like, Value::Int(_)) => {
                return Err(ExecutionError::TypeMismatch(
                    "LIKE requires a text operand".to_string(),
                ));
            }
            _ => None,
        };

        Ok(Self {
            field,
            op,
            operand,
            pattern,
        })
    }

    pub fn field(&self) -> usize {
        self.field
    }

    pub fn op(&self) -> CompareOp {
        self.op
    }

    pub fn operand(&self) -> &Value {
        &self.operand
    }

    /// Whether `record` passes; values of a different kind never match
    pub fn matches(&self, record: &Record) -> ExecutionResult<bool> {
        let value = record.field(self.field)?;

        if let Some(pattern) = &self.pattern {
            return Ok(value.as_text().is_some_and(|text| pattern.is_match(text)));
        }

        Ok(value
            .compare(&self.operand)
            .is_some_and(|cmp| self.op.holds(cmp)))
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field {} {} {}", self.field, self.op, self.operand)
    }
}

fn like_pattern_to_regex(pattern: &str) -> String {
    let mut regex = String::with_capacity(pattern.len() * 2 + 2);
    regex.push('^');
    for ch in pattern.chars() {
        match ch {
            '%' => regex.push_str(".*"),
            '_' => regex.push('.'),
            _ => regex.push_str(&regex::escape(ch.encode_utf8(&mut [0u8; 4]))),
        }
    }
    regex.push('$');
    regex
}
