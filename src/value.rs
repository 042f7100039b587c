//! Tagged variable value shared by fixtures, plan attributes and plan variables.
//!
//! Module inputs nest arbitrarily (maps of lists of maps), so fixtures and
//! planned attributes are both represented as [`Value`]. Extraction is always
//! explicit: the `as_*` accessors fail with [`AssertionError::WrongShape`]
//! instead of coercing, so a test that casts to the wrong type fails loudly.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::AssertionError;

/// A string-keyed, recursively nested configuration value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Build a map value from key/value pairs.
    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Map(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value))
                .collect(),
        )
    }

    /// Build a list value from anything convertible into values.
    pub fn list<T, I>(items: I) -> Self
    where
        T: Into<Value>,
        I: IntoIterator<Item = T>,
    {
        Value::List(items.into_iter().map(Into::into).collect())
    }

    /// Name of the variant, used in shape errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Result<&str, AssertionError> {
        match self {
            Value::Str(value) => Ok(value),
            other => Err(other.wrong_shape("string")),
        }
    }

    pub fn as_i64(&self) -> Result<i64, AssertionError> {
        match self {
            Value::Int(value) => Ok(*value),
            other => Err(other.wrong_shape("integer")),
        }
    }

    /// Numeric view; integers widen to `f64`, nothing else converts.
    pub fn as_f64(&self) -> Result<f64, AssertionError> {
        match self {
            Value::Int(value) => Ok(*value as f64),
            Value::Float(value) => Ok(*value),
            other => Err(other.wrong_shape("number")),
        }
    }

    pub fn as_bool(&self) -> Result<bool, AssertionError> {
        match self {
            Value::Bool(value) => Ok(*value),
            other => Err(other.wrong_shape("bool")),
        }
    }

    pub fn as_list(&self) -> Result<&[Value], AssertionError> {
        match self {
            Value::List(items) => Ok(items),
            other => Err(other.wrong_shape("list")),
        }
    }

    pub fn as_map(&self) -> Result<&BTreeMap<String, Value>, AssertionError> {
        match self {
            Value::Map(entries) => Ok(entries),
            other => Err(other.wrong_shape("map")),
        }
    }

    /// Map member lookup; `None` for missing keys and for non-map values.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(entries) => entries.get(key),
            _ => None,
        }
    }

    /// Walk a dotted path such as `scaling_config.0.desired_size`.
    ///
    /// Numeric segments index into lists, everything else is a map key.
    pub fn path(&self, path: &str) -> Option<&Value> {
        path.split('.')
            .filter(|segment| !segment.is_empty())
            .try_fold(self, |current, segment| match current {
                Value::Map(entries) => entries.get(segment),
                Value::List(items) => segment
                    .parse::<usize>()
                    .ok()
                    .and_then(|idx| items.get(idx)),
                _ => None,
            })
    }

    /// Length of a list, map or string; `None` for scalars.
    pub fn len(&self) -> Option<usize> {
        match self {
            Value::List(items) => Some(items.len()),
            Value::Map(entries) => Some(entries.len()),
            Value::Str(value) => Some(value.chars().count()),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::from(self)
    }

    fn wrong_shape(&self, expected: &'static str) -> AssertionError {
        AssertionError::WrongShape {
            expected,
            found: self.kind(),
            value: self.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl From<&Value> for serde_json::Value {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Str(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(serde_json::Value::from).collect())
            }
            Value::Map(entries) => serde_json::Value::Object(
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), serde_json::Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or_default()),
            },
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(entries) => Value::Map(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(entries: BTreeMap<String, Value>) -> Self {
        Value::Map(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node_group() -> Value {
        Value::map([
            ("subnet_ids", Value::list(["subnet1"])),
            (
                "scaling_config",
                Value::List(vec![Value::map([("desired_size", Value::Int(2))])]),
            ),
        ])
    }

    #[test]
    fn casts_fail_loudly_on_wrong_shape() {
        let value = Value::from("1");
        assert_eq!(value.as_str().unwrap(), "1");
        match value.as_i64() {
            Err(AssertionError::WrongShape {
                expected, found, ..
            }) => {
                assert_eq!(expected, "integer");
                assert_eq!(found, "string");
            }
            other => panic!("expected WrongShape, got {other:?}"),
        }
        assert!(Value::Null.as_list().is_err());
    }

    #[test]
    fn integers_widen_to_float_but_not_back() {
        assert_eq!(Value::Int(3).as_f64().unwrap(), 3.0);
        assert!(Value::Float(3.0).as_i64().is_err());
    }

    #[test]
    fn path_walks_maps_and_lists() {
        let group = node_group();
        assert_eq!(
            group.path("scaling_config.0.desired_size"),
            Some(&Value::Int(2))
        );
        assert_eq!(group.path("subnet_ids.0"), Some(&Value::from("subnet1")));
        assert_eq!(group.path("subnet_ids.3"), None);
        assert_eq!(group.path("missing.key"), None);
    }

    #[test]
    fn json_conversion_keeps_integer_and_float_apart() {
        let json = serde_json::json!({"count": 2, "ratio": 0.5, "tags": ["a"], "none": null});
        let value = Value::from(json.clone());
        assert_eq!(value.get("count"), Some(&Value::Int(2)));
        assert_eq!(value.get("ratio"), Some(&Value::Float(0.5)));
        assert_eq!(value.get("none"), Some(&Value::Null));
        assert_eq!(value.to_json(), json);
    }

    #[test]
    fn deserializes_untagged_from_json_text() {
        let value: Value = serde_json::from_str(r#"{"a": [1, "two", true, null]}"#).unwrap();
        let items = value.get("a").unwrap().as_list().unwrap();
        assert_eq!(items[0], Value::Int(1));
        assert_eq!(items[1], Value::from("two"));
        assert_eq!(items[2], Value::Bool(true));
        assert!(items[3].is_null());
    }

    #[test]
    fn len_covers_collections_and_strings() {
        assert_eq!(node_group().get("subnet_ids").unwrap().len(), Some(1));
        assert_eq!(Value::from("héllo").len(), Some(5));
        assert_eq!(Value::Int(1).len(), None);
    }
}
