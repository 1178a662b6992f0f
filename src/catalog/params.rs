use std::{collections::BTreeMap, fmt};

use crate::foundation::core::ImageSize;
use crate::foundation::error::{ChainError, ChainResult};

/// A single parameter value as stored on a node instance.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Boolean toggle.
    Bool(bool),
    /// Integer slider/input.
    Int(i64),
    /// Floating-point input.
    Float(f64),
    /// Free text or a choice out of a fixed list.
    Text(String),
}

impl ParamValue {
    /// Short type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
        }
    }

    /// Numeric view of the value (ints widen to `f64`).
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::Int(v) => Some(v as f64),
            Self::Float(v) => Some(v),
            _ => None,
        }
    }

    /// Integer view of the value.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Self::Int(v) => Some(v),
            _ => None,
        }
    }

    /// Text view of the value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v:?}"),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u32> for ParamValue {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

/// Where a parameter's initial value comes from.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamDefault {
    /// A fixed value.
    Value(ParamValue),
    /// Width of the Input node's full-resolution image.
    InputWidth,
    /// Height of the Input node's full-resolution image.
    InputHeight,
}

/// Schema entry for one node parameter.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ParamSpec {
    /// Parameter key, unique within its kind.
    pub name: String,
    /// Initial value source.
    pub default: ParamDefault,
    /// Inclusive lower bound for numeric values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Inclusive upper bound for numeric values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Allowed values for text parameters (empty means free text).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,
}

impl ParamSpec {
    /// Integer parameter clamped to `[min, max]`.
    pub fn int(name: &str, default: i64, min: i64, max: i64) -> Self {
        Self {
            name: name.to_string(),
            default: ParamDefault::Value(ParamValue::Int(default)),
            min: Some(min as f64),
            max: Some(max as f64),
            choices: Vec::new(),
        }
    }

    /// Float parameter clamped to `[min, max]`.
    pub fn float(name: &str, default: f64, min: f64, max: f64) -> Self {
        Self {
            name: name.to_string(),
            default: ParamDefault::Value(ParamValue::Float(default)),
            min: Some(min),
            max: Some(max),
            choices: Vec::new(),
        }
    }

    /// Text parameter restricted to `choices`; the first choice is the default.
    pub fn choice(name: &str, choices: &[&str]) -> Self {
        let first = choices.first().copied().unwrap_or_default();
        Self {
            name: name.to_string(),
            default: ParamDefault::Value(ParamValue::Text(first.to_string())),
            min: None,
            max: None,
            choices: choices.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// Integer parameter whose default follows the Input image size.
    pub fn int_from_input(name: &str, default: ParamDefault, min: i64) -> Self {
        Self {
            name: name.to_string(),
            default,
            min: Some(min as f64),
            max: None,
            choices: Vec::new(),
        }
    }

    /// Resolve the initial value for a node created against an input of `input` size.
    pub fn initial_value(&self, input: ImageSize) -> ParamValue {
        match &self.default {
            ParamDefault::Value(v) => v.clone(),
            ParamDefault::InputWidth => ParamValue::Int(i64::from(input.width)),
            ParamDefault::InputHeight => ParamValue::Int(i64::from(input.height)),
        }
    }

    fn default_type_name(&self) -> &'static str {
        match &self.default {
            ParamDefault::Value(v) => v.type_name(),
            ParamDefault::InputWidth | ParamDefault::InputHeight => "int",
        }
    }

    /// Check `value` against this schema entry and return the value to store.
    ///
    /// Ints are accepted for float parameters, numbers are clamped into range.
    pub fn coerce(&self, value: ParamValue) -> ChainResult<ParamValue> {
        let expected = self.default_type_name();
        let value = match (expected, value) {
            ("float", ParamValue::Int(v)) => ParamValue::Float(v as f64),
            ("int", ParamValue::Float(v)) if v.fract() == 0.0 && v.is_finite() => {
                ParamValue::Int(v as i64)
            }
            (_, v) => v,
        };
        if value.type_name() != expected {
            return Err(ChainError::validation(format!(
                "parameter '{}' expects {expected}, got {}",
                self.name,
                value.type_name()
            )));
        }

        Ok(match value {
            ParamValue::Int(v) => {
                let mut v = v;
                if let Some(min) = self.min {
                    v = v.max(min.ceil() as i64);
                }
                if let Some(max) = self.max {
                    v = v.min(max.floor() as i64);
                }
                ParamValue::Int(v)
            }
            ParamValue::Float(v) => {
                if !v.is_finite() {
                    return Err(ChainError::validation(format!(
                        "parameter '{}' must be finite",
                        self.name
                    )));
                }
                let mut v = v;
                if let Some(min) = self.min {
                    v = v.max(min);
                }
                if let Some(max) = self.max {
                    v = v.min(max);
                }
                ParamValue::Float(v)
            }
            ParamValue::Text(v) => {
                if !self.choices.is_empty() && !self.choices.iter().any(|c| *c == v) {
                    return Err(ChainError::validation(format!(
                        "parameter '{}' must be one of {:?}, got '{v}'",
                        self.name, self.choices
                    )));
                }
                ParamValue::Text(v)
            }
            other => other,
        })
    }
}

/// Current parameter values of one node instance.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Params(BTreeMap<String, ParamValue>);

impl Params {
    /// Build the default parameter set for a schema.
    pub fn from_schema(schema: &[ParamSpec], input: ImageSize) -> Self {
        Self(
            schema
                .iter()
                .map(|spec| (spec.name.clone(), spec.initial_value(input)))
                .collect(),
        )
    }

    /// Value of `key`, if present.
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    /// Whether `key` is part of this parameter set.
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Replace an existing value, returning the previous one.
    pub(crate) fn replace(&mut self, key: &str, value: ParamValue) -> Option<ParamValue> {
        let slot = self.0.get_mut(key)?;
        Some(std::mem::replace(slot, value))
    }

    /// Iterate `(key, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Integer parameter, failing with a message a transform can surface.
    pub fn int(&self, key: &str) -> anyhow::Result<i64> {
        match self.0.get(key) {
            Some(v) => v
                .as_i64()
                .ok_or_else(|| anyhow::anyhow!("parameter '{key}' must be an integer")),
            None => anyhow::bail!("missing parameter '{key}'"),
        }
    }

    /// Numeric parameter, accepting ints and floats.
    pub fn number(&self, key: &str) -> anyhow::Result<f64> {
        match self.0.get(key) {
            Some(v) => v
                .as_f64()
                .ok_or_else(|| anyhow::anyhow!("parameter '{key}' must be a number")),
            None => anyhow::bail!("missing parameter '{key}'"),
        }
    }

    /// Text parameter.
    pub fn text(&self, key: &str) -> anyhow::Result<&str> {
        match self.0.get(key) {
            Some(v) => v
                .as_str()
                .ok_or_else(|| anyhow::anyhow!("parameter '{key}' must be text")),
            None => anyhow::bail!("missing parameter '{key}'"),
        }
    }
}

impl FromIterator<(String, ParamValue)> for Params {
    fn from_iter<T: IntoIterator<Item = (String, ParamValue)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/catalog/params.rs"]
mod tests;
