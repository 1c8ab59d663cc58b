//! The canonical value tree every stage after ingestion works on.
//!
//! A [`Value`] is what the normalizer produces from a loosely-typed parse tree:
//! mappings always have string keys and keep their source order.

use indexmap::IndexMap;
use serde::Serialize;
use serde_yaml::Number;

/// Ordered mapping with string keys.
pub type Map = IndexMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Seq(Vec<Value>),
    Map(Map),
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Seq(_) => "sequence",
            Value::Map(_) => "mapping",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_scalar(&self) -> bool {
        !matches!(self, Value::Seq(_) | Value::Map(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&[Value]> {
        match self {
            Value::Seq(items) => Some(items),
            _ => None,
        }
    }

    /// Non-negative integer view. Accepts integral numbers and digit strings.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Scalar rendered as text; `None` for sequences and mappings.
    pub fn scalar_text(&self) -> Option<String> {
        match self {
            Value::Null => Some(String::new()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::String(s) => Some(s.clone()),
            Value::Seq(_) | Value::Map(_) => None,
        }
    }

    /// Text for any value: scalars as-is, collections as compact JSON.
    pub fn to_text(&self) -> String {
        match self.scalar_text() {
            Some(text) => text,
            None => serde_json::to_string(self).unwrap_or_default(),
        }
    }

    /// Looks up a key of a mapping value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map().and_then(|m| m.get(key))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Number(Number::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(Number::from(n))
    }
}

impl From<Map> for Value {
    fn from(m: Map) -> Self {
        Value::Map(m)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Seq(items)
    }
}

impl From<&Value> for serde_yaml::Value {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => serde_yaml::Value::Null,
            Value::Bool(b) => serde_yaml::Value::Bool(*b),
            Value::Number(n) => serde_yaml::Value::Number(n.clone()),
            Value::String(s) => serde_yaml::Value::String(s.clone()),
            Value::Seq(items) => {
                serde_yaml::Value::Sequence(items.iter().map(serde_yaml::Value::from).collect())
            }
            Value::Map(m) => {
                let mut out = serde_yaml::Mapping::new();
                for (k, v) in m {
                    out.insert(serde_yaml::Value::String(k.clone()), serde_yaml::Value::from(v));
                }
                serde_yaml::Value::Mapping(out)
            }
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_text())
    }
}

/// Builds a single-entry mapping.
pub fn single(key: impl Into<String>, value: impl Into<Value>) -> Value {
    let mut m = Map::new();
    m.insert(key.into(), value.into());
    Value::Map(m)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_text_and_json_fallback() {
        assert_eq!(Value::from(12u64).to_text(), "12");
        assert_eq!(Value::Bool(true).to_text(), "true");
        assert_eq!(Value::Null.to_text(), "");
        let seq = Value::Seq(vec![Value::from("a"), Value::from(1u64)]);
        assert_eq!(seq.to_text(), r#"["a",1]"#);
    }

    #[test]
    fn test_as_u64_accepts_digit_strings() {
        assert_eq!(Value::from("1500").as_u64(), Some(1500));
        assert_eq!(Value::from(" 20 ").as_u64(), Some(20));
        assert_eq!(Value::from("soon").as_u64(), None);
        assert_eq!(Value::from(-3i64).as_u64(), None);
    }
}
