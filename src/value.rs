//! Typed values shared by signature declarations and observed calls
//!
//! Signature files are loosely typed YAML while decompiler output is concrete.
//! Both sides are lowered into one closed sum type so that type inference and
//! comparison are total functions over a fixed set of variants.

use std::fmt;

/// Type tag of a declared or observed value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ValueType {
    #[default]
    Unknown,
    String,
    Number,
    Bytes,
}

impl ValueType {
    /// Map a `type:` field onto a variant
    ///
    /// Unrecognized names map to [`ValueType::Unknown`].
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "string" => Self::String,
            "number" => Self::Number,
            "bytes" => Self::Bytes,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::String => "string",
            Self::Number => "number",
            Self::Bytes => "bytes",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A declared (signature) or observed (call) value
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Value {
    /// Absent, unresolved or undecodable
    #[default]
    Unknown,
    String(String),
    Number(i64),
    Bytes(Vec<u8>),
    /// Only produced by declarations (`in`, `contains_in`)
    Sequence(Vec<Value>),
}

impl Value {
    /// Infer the type of a value
    ///
    /// A non-empty sequence takes the type of its first element, an empty one
    /// is [`ValueType::Unknown`].
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Unknown => ValueType::Unknown,
            Value::String(_) => ValueType::String,
            Value::Number(_) => ValueType::Number,
            Value::Bytes(_) => ValueType::Bytes,
            Value::Sequence(items) => items
                .first()
                .map_or(ValueType::Unknown, Value::value_type),
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Value::Unknown)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Lower a YAML node into a value
    ///
    /// Floats, booleans, mappings and tagged nodes have no counterpart in the
    /// call model and become [`Value::Unknown`].
    pub fn from_yaml(node: &serde_yml::Value) -> Self {
        match node {
            serde_yml::Value::String(s) => Value::String(s.clone()),
            serde_yml::Value::Number(n) => n.as_i64().map_or(Value::Unknown, Value::Number),
            serde_yml::Value::Sequence(items) => {
                Value::Sequence(items.iter().map(Value::from_yaml).collect())
            }
            _ => Value::Unknown,
        }
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

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n)
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value::Bytes(bytes)
    }
}

impl From<Option<String>> for Value {
    fn from(s: Option<String>) -> Self {
        s.map_or(Value::Unknown, Value::String)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unknown => f.write_str("?"),
            Value::String(s) => write!(f, "'{}'", s),
            Value::Number(n) if *n < 0 => write!(f, "-{:#x}", n.unsigned_abs()),
            Value::Number(n) => write!(f, "{:#x}", n),
            Value::Bytes(bytes) => write!(f, "0x{}", hex::encode(bytes)),
            Value::Sequence(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_scalar_types() {
        assert_eq!(Value::Unknown.value_type(), ValueType::Unknown);
        assert_eq!(Value::from("x").value_type(), ValueType::String);
        assert_eq!(Value::from(7).value_type(), ValueType::Number);
        assert_eq!(Value::from(vec![0u8]).value_type(), ValueType::Bytes);
    }

    #[test]
    fn test_infer_sequence_uses_first_element() {
        let seq = Value::Sequence(vec![Value::from(1), Value::from("a")]);
        assert_eq!(seq.value_type(), ValueType::Number);
        assert_eq!(Value::Sequence(vec![]).value_type(), ValueType::Unknown);
    }

    #[test]
    fn test_type_from_name() {
        assert_eq!(ValueType::from_name("string"), ValueType::String);
        assert_eq!(ValueType::from_name("Number"), ValueType::Number);
        assert_eq!(ValueType::from_name("bytes"), ValueType::Bytes);
        assert_eq!(ValueType::from_name("float"), ValueType::Unknown);
        assert_eq!(ValueType::from_name(""), ValueType::Unknown);
    }

    #[test]
    fn test_from_yaml() {
        let node: serde_yml::Value = serde_yml::from_str("[1, 'two', 3.5, true, ~]").unwrap();
        assert_eq!(
            Value::from_yaml(&node),
            Value::Sequence(vec![
                Value::Number(1),
                Value::String("two".to_string()),
                Value::Unknown,
                Value::Unknown,
                Value::Unknown,
            ])
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::from("a").to_string(), "'a'");
        assert_eq!(Value::from(255).to_string(), "0xff");
        assert_eq!(Value::from(-16).to_string(), "-0x10");
        assert_eq!(Value::from(vec![0xde, 0xad]).to_string(), "0xdead");
        assert_eq!(Value::Unknown.to_string(), "?");
        assert_eq!(
            Value::Sequence(vec![Value::from(1), Value::from(2)]).to_string(),
            "[0x1, 0x2]"
        );
    }
}
