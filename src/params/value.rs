use std::fmt;
use serde::Serialize;

use crate::error::{Error, Result};
use super::Kwargs;

/// A single parsed parameter value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Bool(bool),
    Enum(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Bool(v) => write!(f, "{}", v),
            ParamValue::Enum(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Enum(v.to_string())
    }
}

/// Values produced by [`ParamSchema::parse`](super::ParamSchema::parse), in schema field order.
///
/// Every field of the schema is present: either supplied by the caller or
/// filled from its default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamValues {
    kind: &'static str,
    values: Vec<(&'static str, ParamValue)>,
}

impl ParamValues {
    pub(crate) fn new(kind: &'static str, values: Vec<(&'static str, ParamValue)>) -> Self {
        Self { kind, values }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &ParamValue)> {
        self.values.iter().map(|(field, value)| (*field, value))
    }

    pub fn int(&self, name: &str) -> Result<i64> {
        match self.require(name)? {
            ParamValue::Int(v) => Ok(*v),
            other => Err(self.type_mismatch(name, "int", other)),
        }
    }

    pub fn bool(&self, name: &str) -> Result<bool> {
        match self.require(name)? {
            ParamValue::Bool(v) => Ok(*v),
            other => Err(self.type_mismatch(name, "boolean", other)),
        }
    }

    pub fn enumeration(&self, name: &str) -> Result<&str> {
        match self.require(name)? {
            ParamValue::Enum(v) => Ok(v.as_str()),
            other => Err(self.type_mismatch(name, "enum", other)),
        }
    }

    /// String form of every value, the inverse of parsing
    pub fn to_kwargs(&self) -> Kwargs {
        self.values
            .iter()
            .map(|(field, value)| (field.to_string(), value.to_string()))
            .collect()
    }

    fn require(&self, name: &str) -> Result<&ParamValue> {
        self.get(name).ok_or_else(|| {
            Error::InvalidConfiguration(format!(
                "Operator {} has no parameter field '{}'",
                self.kind, name
            ))
        })
    }

    fn type_mismatch(&self, name: &str, expected: &str, found: &ParamValue) -> Error {
        Error::InvalidConfiguration(format!(
            "Parameter '{}' of operator {} is not {} (found {:?})",
            name, self.kind, expected, found
        ))
    }
}
