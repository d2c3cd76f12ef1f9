//! One row of data: field name to typed value.

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A typed field value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Number(f32),
    Text(String),
    Vector(Vec<f32>),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    /// Name of the runtime type, used in error messages.
    pub fn type_name(&self) -> String {
        match self {
            Value::Number(_) => "numeric".to_string(),
            Value::Text(_) => "categorical".to_string(),
            Value::Vector(v) => format!("vector[{}]", v.len()),
        }
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Number(v)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Vec<f32>> for Value {
    fn from(v: Vec<f32>) -> Self {
        Value::Vector(v)
    }
}

/// A mapping from field name to value. One record is one trip.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    values: BTreeMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.values.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn require(&self, name: &str) -> Result<&Value> {
        self.get(name)
            .ok_or_else(|| PipelineError::Schema(format!("record is missing field '{}'", name)))
    }

    pub fn number(&self, name: &str) -> Result<f32> {
        match self.require(name)? {
            Value::Number(v) => Ok(*v),
            other => Err(PipelineError::wrong_type(name, "numeric", other.type_name())),
        }
    }

    pub fn text(&self, name: &str) -> Result<&str> {
        match self.require(name)? {
            Value::Text(s) => Ok(s),
            other => Err(PipelineError::wrong_type(name, "categorical", other.type_name())),
        }
    }

    pub fn vector(&self, name: &str) -> Result<&[f32]> {
        match self.require(name)? {
            Value::Vector(v) => Ok(v),
            other => Err(PipelineError::wrong_type(name, "vector", other.type_name())),
        }
    }
}
