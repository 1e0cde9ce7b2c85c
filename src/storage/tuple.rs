//! Tuple and Value types for relshell
//!
//! This module defines how cell values and rows are represented in memory.

use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A scalar cell value
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Integer value (64-bit)
    Integer(i64),
    /// Float value (64-bit)
    Float(f64),
    /// String value
    String(String),
    /// Boolean value
    Boolean(bool),
}

/// Integral floats inside the i64 range, as the integer they equal
fn integral(f: f64) -> Option<i64> {
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

/// Order an integer against a float without rounding the integer, so that
/// `Equal` holds exactly when the two values are `==`
fn compare_mixed(i: i64, f: f64) -> Option<Ordering> {
    if f.is_nan() {
        return None;
    }
    if f >= TWO_POW_63 {
        return Some(Ordering::Less);
    }
    if f < -TWO_POW_63 {
        return Some(Ordering::Greater);
    }
    // In range, so the truncation is exact
    match i.cmp(&(f.trunc() as i64)) {
        Ordering::Equal => 0.0f64.partial_cmp(&f.fract()),
        other => Some(other),
    }
}

const TWO_POW_63: f64 = 9_223_372_036_854_775_808.0;

// Numeric equality crosses Integer/Float so that `1` and `1.0` are the same cell
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Integer(a), Value::Float(b)) | (Value::Float(b), Value::Integer(a)) => {
                integral(*b) == Some(*a)
            }
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Value::Integer(v) => {
                0u8.hash(state);
                v.hash(state);
            }
            Value::Float(v) => match integral(*v) {
                Some(i) => {
                    0u8.hash(state);
                    i.hash(state);
                }
                None => {
                    1u8.hash(state);
                    v.to_bits().hash(state);
                }
            },
            Value::String(v) => {
                2u8.hash(state);
                v.hash(state);
            }
            Value::Boolean(v) => {
                3u8.hash(state);
                v.hash(state);
            }
        }
    }
}

impl Value {
    /// Compare two values.
    ///
    /// Returns `None` when the values are of incomparable kinds.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::Integer(a), Value::Float(b)) => compare_mixed(*a, *b),
            (Value::Float(a), Value::Integer(b)) => compare_mixed(*b, *a).map(Ordering::reverse),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),

            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),

            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),

            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::Boolean(b) => write!(f, "{}", b),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

/// A tuple (row) of a relation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Tuple {
    /// Values in this tuple
    values: Vec<Value>,
}

impl Tuple {
    /// Create a new tuple from values
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Get a value by index
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Get all values
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Get number of values
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if tuple is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Consume the tuple and return the values
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Project specific columns, in the order given
    pub fn project(&self, indices: &[usize]) -> Tuple {
        let values = indices
            .iter()
            .filter_map(|&i| self.values.get(i).cloned())
            .collect();
        Tuple::new(values)
    }

    /// Concatenate two tuples
    pub fn concat(&self, other: &Tuple) -> Tuple {
        let mut values = self.values.clone();
        values.extend(other.values.iter().cloned());
        Tuple::new(values)
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cells: Vec<String> = self.values.iter().map(|v| v.to_string()).collect();
        write!(f, "({})", cells.join(", "))
    }
}

/// Build a tuple from a list of values convertible into [`Value`]
#[macro_export]
macro_rules! tuple {
    ($($value:expr),* $(,)?) => {
        $crate::storage::Tuple::new(vec![$($crate::storage::Value::from($value)),*])
    };
}
