//! Type descriptors and null-aware values.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Column and function argument types
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Type {
    Boolean = 1,
    Bigint = 2,
    Double = 3,
    Varchar = 4,
    Varbinary = 5,
}

impl Type {
    /// Lowercase SQL name of the type
    pub fn name(&self) -> &'static str {
        match self {
            Type::Boolean => "boolean",
            Type::Bigint => "bigint",
            Type::Double => "double",
            Type::Varchar => "varchar",
            Type::Varbinary => "varbinary",
        }
    }

    /// Width of one value in bytes, or `None` for variable-width types
    pub fn fixed_size(&self) -> Option<usize> {
        match self {
            Type::Boolean => Some(1),
            Type::Bigint | Type::Double => Some(8),
            Type::Varchar | Type::Varbinary => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single materialized value. `Null` is a distinct state, never a
/// sentinel payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    Null,
    Boolean(bool),
    Bigint(i64),
    Double(f64),
    Varchar(String),
    Varbinary(Vec<u8>),
}

impl Value {
    /// Get the type of this value, `None` for NULL
    pub fn value_type(&self) -> Option<Type> {
        match self {
            Value::Null => None,
            Value::Boolean(_) => Some(Type::Boolean),
            Value::Bigint(_) => Some(Type::Bigint),
            Value::Double(_) => Some(Type::Double),
            Value::Varchar(_) => Some(Type::Varchar),
            Value::Varbinary(_) => Some(Type::Varbinary),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if this value can be stored in a column of the given type
    pub fn is_compatible_with(&self, value_type: Type) -> bool {
        match self.value_type() {
            None => true,
            Some(t) => t == value_type,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Bigint(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Varchar(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Varchar(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

// Structural equality: doubles compare by bit pattern so values can key maps.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Bigint(a), Value::Bigint(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits(),
            (Value::Varchar(a), Value::Varchar(b)) => a == b,
            (Value::Varbinary(a), Value::Varbinary(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Boolean(b) => b.hash(state),
            Value::Bigint(n) => n.hash(state),
            Value::Double(d) => d.to_bits().hash(state),
            Value::Varchar(s) => s.hash(state),
            Value::Varbinary(b) => b.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Bigint(n) => write!(f, "{}", n),
            Value::Double(d) => write!(f, "{}", d),
            Value::Varchar(s) => write!(f, "'{}'", s),
            Value::Varbinary(b) => write!(f, "X'{}'", hex(b)),
        }
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_value_type() {
        assert_eq!(Value::Null.value_type(), None);
        assert_eq!(Value::Boolean(true).value_type(), Some(Type::Boolean));
        assert_eq!(Value::Bigint(1).value_type(), Some(Type::Bigint));
        assert_eq!(Value::Double(1.5).value_type(), Some(Type::Double));
        assert_eq!(Value::from("a").value_type(), Some(Type::Varchar));
        assert_eq!(Value::Varbinary(vec![1]).value_type(), Some(Type::Varbinary));
    }

    #[test]
    fn test_value_compatibility() {
        assert!(Value::Null.is_compatible_with(Type::Bigint));
        assert!(Value::Boolean(true).is_compatible_with(Type::Boolean));
        assert!(Value::Bigint(42).is_compatible_with(Type::Bigint));
        assert!(!Value::Bigint(42).is_compatible_with(Type::Double));
        assert!(!Value::from("x").is_compatible_with(Type::Varbinary));
    }

    #[test]
    fn test_null_is_not_a_payload() {
        assert_ne!(Value::Null, Value::Boolean(false));
        assert_ne!(Value::Null, Value::Bigint(0));
        assert_ne!(Value::Null, Value::from(""));
    }

    #[test]
    fn test_structural_hash() {
        let mut set = HashSet::new();
        set.insert(Value::Double(f64::NAN));
        set.insert(Value::Double(f64::NAN));
        set.insert(Value::Double(0.0));
        set.insert(Value::Double(-0.0));
        set.insert(Value::Null);
        assert_eq!(set.len(), 4);
    }

    #[test]
    fn test_display() {
        assert_eq!(Type::Bigint.to_string(), "bigint");
        assert_eq!(Value::Null.to_string(), "NULL");
        assert_eq!(Value::from("hi").to_string(), "'hi'");
        assert_eq!(Value::Varbinary(vec![0xab, 0x01]).to_string(), "X'ab01'");
        assert_eq!(Value::from(Some(3i64)), Value::Bigint(3));
        assert_eq!(Value::from(None::<i64>), Value::Null);
    }
}
