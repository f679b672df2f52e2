//! Native type markers used to specialize aggregation templates.

use crate::block::{decode_varchar, Block};
use crate::error::EvalResult;
use crate::types::{Type, Value};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;

/// Binds a SQL [`Type`] to its native Rust representation and the typed
/// block accessor that reads it.
pub trait NativeType: Send + Sync + 'static {
    const TYPE: Type;

    /// Value as read from a block, borrowing for variable-width types
    type Native<'a>: Copy;

    /// Value as kept in accumulator state
    type Owned: Clone + fmt::Debug + PartialEq + Send + Sync + Serialize + DeserializeOwned + 'static;

    fn read(block: &dyn Block, position: usize) -> EvalResult<Self::Native<'_>>;

    fn into_owned(value: Self::Native<'_>) -> Self::Owned;

    fn compare(value: Self::Native<'_>, owned: &Self::Owned) -> Ordering;

    fn compare_owned(a: &Self::Owned, b: &Self::Owned) -> Ordering;

    fn to_value(value: &Self::Owned) -> Value;
}

#[derive(Debug, Clone, Copy)]
pub struct BooleanType;

#[derive(Debug, Clone, Copy)]
pub struct BigintType;

#[derive(Debug, Clone, Copy)]
pub struct DoubleType;

#[derive(Debug, Clone, Copy)]
pub struct VarcharType;

impl NativeType for BooleanType {
    const TYPE: Type = Type::Boolean;
    type Native<'a> = bool;
    type Owned = bool;

    fn read(block: &dyn Block, position: usize) -> EvalResult<bool> {
        block.get_boolean(position)
    }

    fn into_owned(value: bool) -> bool {
        value
    }

    fn compare(value: bool, owned: &bool) -> Ordering {
        value.cmp(owned)
    }

    fn compare_owned(a: &bool, b: &bool) -> Ordering {
        a.cmp(b)
    }

    fn to_value(value: &bool) -> Value {
        Value::Boolean(*value)
    }
}

impl NativeType for BigintType {
    const TYPE: Type = Type::Bigint;
    type Native<'a> = i64;
    type Owned = i64;

    fn read(block: &dyn Block, position: usize) -> EvalResult<i64> {
        block.get_long(position)
    }

    fn into_owned(value: i64) -> i64 {
        value
    }

    fn compare(value: i64, owned: &i64) -> Ordering {
        value.cmp(owned)
    }

    fn compare_owned(a: &i64, b: &i64) -> Ordering {
        a.cmp(b)
    }

    fn to_value(value: &i64) -> Value {
        Value::Bigint(*value)
    }
}

// Doubles use the IEEE total order so NaN does not break commutativity.
impl NativeType for DoubleType {
    const TYPE: Type = Type::Double;
    type Native<'a> = f64;
    type Owned = f64;

    fn read(block: &dyn Block, position: usize) -> EvalResult<f64> {
        block.get_double(position)
    }

    fn into_owned(value: f64) -> f64 {
        value
    }

    fn compare(value: f64, owned: &f64) -> Ordering {
        value.total_cmp(owned)
    }

    fn compare_owned(a: &f64, b: &f64) -> Ordering {
        a.total_cmp(b)
    }

    fn to_value(value: &f64) -> Value {
        Value::Double(*value)
    }
}

impl NativeType for VarcharType {
    const TYPE: Type = Type::Varchar;
    type Native<'a> = &'a str;
    type Owned = String;

    fn read(block: &dyn Block, position: usize) -> EvalResult<&str> {
        decode_varchar(block.get_slice(position)?)
    }

    fn into_owned(value: &str) -> String {
        value.to_string()
    }

    fn compare(value: &str, owned: &String) -> Ordering {
        value.cmp(owned.as_str())
    }

    fn compare_owned(a: &String, b: &String) -> Ordering {
        a.cmp(b)
    }

    fn to_value(value: &String) -> Value {
        Value::Varchar(value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{double_block, varchar_block};

    #[test]
    fn test_read_native_values() {
        let block = varchar_block([Some("b"), Some("a")]);
        let value = VarcharType::read(block.as_ref(), 1).unwrap();
        assert_eq!(value, "a");
        assert_eq!(VarcharType::compare(value, &"b".to_string()), Ordering::Less);
        assert_eq!(VarcharType::to_value(&VarcharType::into_owned(value)), Value::from("a"));
        assert!(BigintType::read(block.as_ref(), 0).is_err());
    }

    #[test]
    fn test_double_total_order() {
        let block = double_block([Some(f64::NAN)]);
        let nan = DoubleType::read(block.as_ref(), 0).unwrap();
        assert_eq!(DoubleType::compare(nan, &1.0), Ordering::Greater);
        assert_eq!(DoubleType::compare_owned(&-0.0, &0.0), Ordering::Less);
    }
}
