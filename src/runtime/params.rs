//! Configuration values pushed across the native boundary

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, SigbindError};

/// A typed parameter value
///
/// Built at configuration time; marshaling dispatches on the variant with
/// one exhaustive match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Bool(bool),
    Int(i64),
    Real(f64),
    Text(String),
    RealVector(Vec<f64>),
    TextVector(Vec<String>),
}

/// Parameter name to value, in name order
pub type Parameters = BTreeMap<String, ParameterValue>;

impl ParameterValue {
    /// Short name of the value kind
    pub fn kind(&self) -> &'static str {
        match self {
            ParameterValue::Bool(_) => "bool",
            ParameterValue::Int(_) => "int",
            ParameterValue::Real(_) => "real",
            ParameterValue::Text(_) => "string",
            ParameterValue::RealVector(_) => "real vector",
            ParameterValue::TextVector(_) => "string vector",
        }
    }

    /// Numeric value of an int or real parameter
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParameterValue::Int(i) => Some(*i as f64),
            ParameterValue::Real(r) => Some(*r),
            _ => None,
        }
    }

    /// Convert a JSON value; null, objects and mixed arrays are rejected
    pub fn from_json(parameter: &str, value: &Value) -> Result<Self> {
        let unsupported = |found: &str| SigbindError::UnsupportedParameterType {
            parameter: parameter.to_string(),
            found: found.to_string(),
        };

        match value {
            Value::Bool(b) => Ok(ParameterValue::Bool(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(ParameterValue::Int(i)),
                None => n
                    .as_f64()
                    .map(ParameterValue::Real)
                    .ok_or_else(|| unsupported("number")),
            },
            Value::String(s) => Ok(ParameterValue::Text(s.clone())),
            Value::Array(items) => {
                if items.iter().all(Value::is_number) {
                    Ok(ParameterValue::RealVector(
                        items.iter().filter_map(Value::as_f64).collect(),
                    ))
                } else if items.iter().all(Value::is_string) {
                    Ok(ParameterValue::TextVector(
                        items
                            .iter()
                            .filter_map(|v| v.as_str().map(str::to_string))
                            .collect(),
                    ))
                } else {
                    Err(unsupported("mixed array"))
                }
            }
            Value::Null => Err(unsupported("null")),
            Value::Object(_) => Err(unsupported("object")),
        }
    }
}

/// Parse a JSON object into [`Parameters`]
pub fn parameters_from_json(value: &Value) -> Result<Parameters> {
    let object = value
        .as_object()
        .ok_or_else(|| SigbindError::UnsupportedParameterType {
            parameter: "<root>".to_string(),
            found: "non-object parameter set".to_string(),
        })?;

    object
        .iter()
        .map(|(name, value)| Ok((name.clone(), ParameterValue::from_json(name, value)?)))
        .collect()
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Bool(b) => write!(f, "{}", b),
            ParameterValue::Int(i) => write!(f, "{}", i),
            ParameterValue::Real(r) => write!(f, "{}", r),
            ParameterValue::Text(s) => write!(f, "{:?}", s),
            ParameterValue::RealVector(v) => write!(f, "{:?}", v),
            ParameterValue::TextVector(v) => write!(f, "{:?}", v),
        }
    }
}

impl From<bool> for ParameterValue {
    fn from(value: bool) -> Self {
        ParameterValue::Bool(value)
    }
}

impl From<i32> for ParameterValue {
    fn from(value: i32) -> Self {
        ParameterValue::Int(value.into())
    }
}

impl From<i64> for ParameterValue {
    fn from(value: i64) -> Self {
        ParameterValue::Int(value)
    }
}

impl From<f32> for ParameterValue {
    fn from(value: f32) -> Self {
        ParameterValue::Real(value.into())
    }
}

impl From<f64> for ParameterValue {
    fn from(value: f64) -> Self {
        ParameterValue::Real(value)
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        ParameterValue::Text(value.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(value: String) -> Self {
        ParameterValue::Text(value)
    }
}

impl From<Vec<f64>> for ParameterValue {
    fn from(value: Vec<f64>) -> Self {
        ParameterValue::RealVector(value)
    }
}

impl From<Vec<f32>> for ParameterValue {
    fn from(value: Vec<f32>) -> Self {
        ParameterValue::RealVector(value.into_iter().map(f64::from).collect())
    }
}

impl From<Vec<String>> for ParameterValue {
    fn from(value: Vec<String>) -> Self {
        ParameterValue::TextVector(value)
    }
}

impl From<Vec<&str>> for ParameterValue {
    fn from(value: Vec<&str>) -> Self {
        ParameterValue::TextVector(value.into_iter().map(str::to_string).collect())
    }
}
