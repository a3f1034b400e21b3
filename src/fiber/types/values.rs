//! Runtime value types

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// Runtime value type
///
/// Everything that crosses a frame boundary (call arguments, child results,
/// delivered messages) is a `Val`, so the frame stack stays plain data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "v")]
pub enum Val {
    Null,
    Bool(bool),
    Num(f64),
    Str(String),
    List(Vec<Val>),
    Obj(BTreeMap<String, Val>),
}

impl Val {
    /// Check if value is truthy (for conditionals)
    pub fn is_truthy(&self) -> bool {
        match self {
            Val::Bool(b) => *b,
            Val::Null => false,
            _ => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Val::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_num(&self) -> Option<f64> {
        match self {
            Val::Num(n) => Some(*n),
            _ => None,
        }
    }

    /// Look up a property on an object value
    pub fn get(&self, key: &str) -> Option<&Val> {
        match self {
            Val::Obj(map) => map.get(key),
            _ => None,
        }
    }
}

impl From<&str> for Val {
    fn from(s: &str) -> Self {
        Val::Str(s.to_string())
    }
}

impl From<String> for Val {
    fn from(s: String) -> Self {
        Val::Str(s)
    }
}

impl From<f64> for Val {
    fn from(n: f64) -> Self {
        Val::Num(n)
    }
}

/// Largest integer magnitude a `Val::Num` holds exactly (2^53)
pub const MAX_EXACT_INT: u64 = 1 << 53;

/// Integers beyond [`MAX_EXACT_INT`] round to the nearest `f64`; store
/// them as strings when exact values matter.
impl From<i64> for Val {
    fn from(n: i64) -> Self {
        Val::Num(n as f64)
    }
}

impl From<i32> for Val {
    fn from(n: i32) -> Self {
        Val::Num(n as f64)
    }
}

/// Rounds above [`MAX_EXACT_INT`], like `From<i64>`.
impl From<u64> for Val {
    fn from(n: u64) -> Self {
        Val::Num(n as f64)
    }
}

impl From<bool> for Val {
    fn from(b: bool) -> Self {
        Val::Bool(b)
    }
}

impl From<&JsonValue> for Val {
    fn from(json: &JsonValue) -> Self {
        match json {
            JsonValue::Null => Val::Null,
            JsonValue::Bool(b) => Val::Bool(*b),
            // Numbers outside f64 range degrade to the nearest representable value
            JsonValue::Number(n) => Val::Num(n.as_f64().unwrap_or(f64::NAN)),
            JsonValue::String(s) => Val::Str(s.clone()),
            JsonValue::Array(items) => Val::List(items.iter().map(Val::from).collect()),
            JsonValue::Object(map) => Val::Obj(
                map.iter()
                    .map(|(k, v)| (k.clone(), Val::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&Val> for JsonValue {
    fn from(val: &Val) -> Self {
        match val {
            Val::Null => JsonValue::Null,
            Val::Bool(b) => JsonValue::Bool(*b),
            Val::Num(n) => serde_json::Number::from_f64(*n)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Val::Str(s) => JsonValue::String(s.clone()),
            Val::List(items) => JsonValue::Array(items.iter().map(JsonValue::from).collect()),
            Val::Obj(map) => JsonValue::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), JsonValue::from(v)))
                    .collect(),
            ),
        }
    }
}

/// Convert a plain JSON value into a runtime value
pub fn json_to_val(json: &JsonValue) -> Val {
    Val::from(json)
}

/// Convert a runtime value into plain JSON
///
/// Non-finite numbers become `null`.
pub fn val_to_json(val: &Val) -> JsonValue {
    JsonValue::from(val)
}
