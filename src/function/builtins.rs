//! Built-in scalar functions.
//!
//! Every function is registered per concrete signature, so `add(bigint,bigint)`
//! and `add(double,double)` are distinct entries with their own native code.

use crate::error::{EvalResult, EvaluationError};
use crate::function::ScalarFunction;
use crate::signature::Signature;
use crate::types::{Type, Value};
use std::cmp::Ordering;

const COMPARABLE_TYPES: [Type; 5] = [
    Type::Boolean,
    Type::Bigint,
    Type::Double,
    Type::Varchar,
    Type::Varbinary,
];

/// All built-in scalar functions
pub fn builtin_functions() -> Vec<ScalarFunction> {
    let mut functions = Vec::new();
    register_arithmetic(&mut functions);
    register_comparisons(&mut functions);
    register_logical(&mut functions);
    register_null_handling(&mut functions);
    register_strings(&mut functions);
    register_casts(&mut functions);
    register_session_functions(&mut functions);
    functions
}

fn describe(value: Option<&Value>) -> String {
    match value {
        None => "missing argument".to_string(),
        Some(value) => value
            .value_type()
            .map(|t| t.name().to_string())
            .unwrap_or_else(|| "null".to_string()),
    }
}

fn argument_mismatch(expected: Type, actual: Option<&Value>, function: &str) -> EvaluationError {
    EvaluationError::TypeMismatch {
        expected,
        actual: describe(actual),
        context: format!("argument of {}", function),
    }
}

fn boolean_at(arguments: &[Value], index: usize, function: &str) -> EvalResult<bool> {
    match arguments.get(index) {
        Some(Value::Boolean(value)) => Ok(*value),
        other => Err(argument_mismatch(Type::Boolean, other, function)),
    }
}

fn bigint_at(arguments: &[Value], index: usize, function: &str) -> EvalResult<i64> {
    match arguments.get(index) {
        Some(Value::Bigint(value)) => Ok(*value),
        other => Err(argument_mismatch(Type::Bigint, other, function)),
    }
}

fn double_at(arguments: &[Value], index: usize, function: &str) -> EvalResult<f64> {
    match arguments.get(index) {
        Some(Value::Double(value)) => Ok(*value),
        other => Err(argument_mismatch(Type::Double, other, function)),
    }
}

fn varchar_at<'a>(arguments: &'a [Value], index: usize, function: &str) -> EvalResult<&'a str> {
    match arguments.get(index) {
        Some(Value::Varchar(value)) => Ok(value),
        other => Err(argument_mismatch(Type::Varchar, other, function)),
    }
}

fn overflow(operation: &str) -> EvaluationError {
    EvaluationError::Overflow {
        operation: operation.to_string(),
    }
}

// Arithmetic

fn bigint_binary(name: &'static str, op: fn(i64, i64) -> EvalResult<i64>) -> ScalarFunction {
    let signature = Signature::new(name, Type::Bigint, vec![Type::Bigint, Type::Bigint]);
    ScalarFunction::new(signature, move |_, arguments| {
        let left = bigint_at(arguments, 0, name)?;
        let right = bigint_at(arguments, 1, name)?;
        op(left, right).map(Value::Bigint)
    })
}

fn double_binary(name: &'static str, op: fn(f64, f64) -> f64) -> ScalarFunction {
    let signature = Signature::new(name, Type::Double, vec![Type::Double, Type::Double]);
    ScalarFunction::new(signature, move |_, arguments| {
        let left = double_at(arguments, 0, name)?;
        let right = double_at(arguments, 1, name)?;
        Ok(Value::Double(op(left, right)))
    })
}

fn register_arithmetic(functions: &mut Vec<ScalarFunction>) {
    functions.push(bigint_binary("add", |a, b| {
        a.checked_add(b).ok_or_else(|| overflow("add"))
    }));
    functions.push(bigint_binary("subtract", |a, b| {
        a.checked_sub(b).ok_or_else(|| overflow("subtract"))
    }));
    functions.push(bigint_binary("multiply", |a, b| {
        a.checked_mul(b).ok_or_else(|| overflow("multiply"))
    }));
    functions.push(bigint_binary("divide", |a, b| {
        if b == 0 {
            return Err(EvaluationError::DivisionByZero);
        }
        a.checked_div(b).ok_or_else(|| overflow("divide"))
    }));
    // i64::MIN % -1 is mathematically 0
    functions.push(bigint_binary("modulus", |a, b| {
        if b == 0 {
            return Err(EvaluationError::DivisionByZero);
        }
        Ok(a.wrapping_rem(b))
    }));

    functions.push(double_binary("add", |a, b| a + b));
    functions.push(double_binary("subtract", |a, b| a - b));
    functions.push(double_binary("multiply", |a, b| a * b));
    functions.push(double_binary("divide", |a, b| a / b));
    functions.push(double_binary("modulus", |a, b| a % b));

    functions.push(ScalarFunction::new(
        Signature::new("negate", Type::Bigint, vec![Type::Bigint]),
        |_, arguments| {
            let value = bigint_at(arguments, 0, "negate")?;
            value
                .checked_neg()
                .map(Value::Bigint)
                .ok_or_else(|| overflow("negate"))
        },
    ));
    functions.push(ScalarFunction::new(
        Signature::new("negate", Type::Double, vec![Type::Double]),
        |_, arguments| Ok(Value::Double(-double_at(arguments, 0, "negate")?)),
    ));
}

// Comparison

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Comparison {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

impl Comparison {
    const ALL: [Comparison; 6] = [
        Comparison::Equal,
        Comparison::NotEqual,
        Comparison::LessThan,
        Comparison::LessThanOrEqual,
        Comparison::GreaterThan,
        Comparison::GreaterThanOrEqual,
    ];

    fn name(self) -> &'static str {
        match self {
            Comparison::Equal => "equal",
            Comparison::NotEqual => "not_equal",
            Comparison::LessThan => "less_than",
            Comparison::LessThanOrEqual => "less_than_or_equal",
            Comparison::GreaterThan => "greater_than",
            Comparison::GreaterThanOrEqual => "greater_than_or_equal",
        }
    }

    /// `None` is an unordered pair (a NaN operand)
    fn test(self, ordering: Option<Ordering>) -> bool {
        match self {
            Comparison::Equal => ordering == Some(Ordering::Equal),
            Comparison::NotEqual => ordering != Some(Ordering::Equal),
            Comparison::LessThan => ordering == Some(Ordering::Less),
            Comparison::LessThanOrEqual => {
                matches!(ordering, Some(Ordering::Less | Ordering::Equal))
            }
            Comparison::GreaterThan => ordering == Some(Ordering::Greater),
            Comparison::GreaterThanOrEqual => {
                matches!(ordering, Some(Ordering::Greater | Ordering::Equal))
            }
        }
    }
}

fn comparison(op: Comparison, value_type: Type) -> ScalarFunction {
    let signature = Signature::new(op.name(), Type::Boolean, vec![value_type, value_type]);
    ScalarFunction::new(signature, move |_, arguments| {
        let ordering = match (arguments.first(), arguments.get(1)) {
            (Some(Value::Boolean(a)), Some(Value::Boolean(b))) => a.partial_cmp(b),
            (Some(Value::Bigint(a)), Some(Value::Bigint(b))) => a.partial_cmp(b),
            (Some(Value::Double(a)), Some(Value::Double(b))) => a.partial_cmp(b),
            (Some(Value::Varchar(a)), Some(Value::Varchar(b))) => a.partial_cmp(b),
            (Some(Value::Varbinary(a)), Some(Value::Varbinary(b))) => a.partial_cmp(b),
            _ => {
                let offending = arguments
                    .iter()
                    .find(|value| value.value_type() != Some(value_type));
                return Err(argument_mismatch(value_type, offending, op.name()));
            }
        };
        Ok(Value::Boolean(op.test(ordering)))
    })
}

fn register_comparisons(functions: &mut Vec<ScalarFunction>) {
    for value_type in COMPARABLE_TYPES {
        for op in Comparison::ALL {
            functions.push(comparison(op, value_type));
        }
    }
}

// Logical

fn truth_value(arguments: &[Value], index: usize, function: &str) -> EvalResult<Option<bool>> {
    match arguments.get(index) {
        Some(Value::Null) => Ok(None),
        Some(Value::Boolean(value)) => Ok(Some(*value)),
        other => Err(argument_mismatch(Type::Boolean, other, function)),
    }
}

fn register_logical(functions: &mut Vec<ScalarFunction>) {
    let binary = vec![Type::Boolean, Type::Boolean];

    // FALSE AND NULL is FALSE
    functions.push(ScalarFunction::null_tolerant(
        Signature::new("and", Type::Boolean, binary.clone()),
        |_, arguments| {
            let left = truth_value(arguments, 0, "and")?;
            let right = truth_value(arguments, 1, "and")?;
            Ok(match (left, right) {
                (Some(false), _) | (_, Some(false)) => Value::Boolean(false),
                (Some(true), Some(true)) => Value::Boolean(true),
                _ => Value::Null,
            })
        },
    ));

    // TRUE OR NULL is TRUE
    functions.push(ScalarFunction::null_tolerant(
        Signature::new("or", Type::Boolean, binary),
        |_, arguments| {
            let left = truth_value(arguments, 0, "or")?;
            let right = truth_value(arguments, 1, "or")?;
            Ok(match (left, right) {
                (Some(true), _) | (_, Some(true)) => Value::Boolean(true),
                (Some(false), Some(false)) => Value::Boolean(false),
                _ => Value::Null,
            })
        },
    ));

    functions.push(ScalarFunction::new(
        Signature::new("not", Type::Boolean, vec![Type::Boolean]),
        |_, arguments| Ok(Value::Boolean(!boolean_at(arguments, 0, "not")?)),
    ));
}

// Null handling

fn register_null_handling(functions: &mut Vec<ScalarFunction>) {
    for value_type in COMPARABLE_TYPES {
        functions.push(ScalarFunction::null_tolerant(
            Signature::new("is_null", Type::Boolean, vec![value_type]),
            |_, arguments| {
                Ok(Value::Boolean(
                    arguments.first().map(Value::is_null).unwrap_or(true),
                ))
            },
        ));
        functions.push(ScalarFunction::null_tolerant(
            Signature::new("coalesce", value_type, vec![value_type, value_type]),
            |_, arguments| {
                Ok(arguments
                    .iter()
                    .find(|value| !value.is_null())
                    .cloned()
                    .unwrap_or(Value::Null))
            },
        ));
    }
}

// Strings

/// 1-based `start`; a negative start counts back from the end
fn substring(value: &str, start: i64, length: Option<i64>) -> EvalResult<String> {
    if start == 0 {
        return Err(EvaluationError::IndexOutOfRange {
            function: "substr",
            index: start,
        });
    }
    if let Some(length) = length.filter(|length| *length < 0) {
        return Err(EvaluationError::IndexOutOfRange {
            function: "substr",
            index: length,
        });
    }

    let chars: Vec<char> = value.chars().collect();
    let count = chars.len() as i64;
    let begin = if start > 0 { start - 1 } else { count + start };
    if begin < 0 || begin >= count {
        return Ok(String::new());
    }
    let end = match length {
        Some(length) => begin.saturating_add(length).min(count),
        None => count,
    };
    Ok(chars[begin as usize..end as usize].iter().collect())
}

fn register_strings(functions: &mut Vec<ScalarFunction>) {
    functions.push(ScalarFunction::new(
        Signature::new("concat", Type::Varchar, vec![Type::Varchar, Type::Varchar]),
        |_, arguments| {
            let left = varchar_at(arguments, 0, "concat")?;
            let right = varchar_at(arguments, 1, "concat")?;
            let mut result = String::with_capacity(left.len() + right.len());
            result.push_str(left);
            result.push_str(right);
            Ok(Value::Varchar(result))
        },
    ));
    functions.push(ScalarFunction::new(
        Signature::new("length", Type::Bigint, vec![Type::Varchar]),
        |_, arguments| {
            let value = varchar_at(arguments, 0, "length")?;
            Ok(Value::Bigint(value.chars().count() as i64))
        },
    ));
    functions.push(ScalarFunction::new(
        Signature::new("lower", Type::Varchar, vec![Type::Varchar]),
        |_, arguments| Ok(Value::Varchar(varchar_at(arguments, 0, "lower")?.to_lowercase())),
    ));
    functions.push(ScalarFunction::new(
        Signature::new("upper", Type::Varchar, vec![Type::Varchar]),
        |_, arguments| Ok(Value::Varchar(varchar_at(arguments, 0, "upper")?.to_uppercase())),
    ));
    functions.push(ScalarFunction::new(
        Signature::new("substr", Type::Varchar, vec![Type::Varchar, Type::Bigint]),
        |_, arguments| {
            let value = varchar_at(arguments, 0, "substr")?;
            let start = bigint_at(arguments, 1, "substr")?;
            substring(value, start, None).map(Value::Varchar)
        },
    ));
    functions.push(ScalarFunction::new(
        Signature::new(
            "substr",
            Type::Varchar,
            vec![Type::Varchar, Type::Bigint, Type::Bigint],
        ),
        |_, arguments| {
            let value = varchar_at(arguments, 0, "substr")?;
            let start = bigint_at(arguments, 1, "substr")?;
            let length = bigint_at(arguments, 2, "substr")?;
            substring(value, start, Some(length)).map(Value::Varchar)
        },
    ));
}

// Casts

fn invalid_cast(value: impl Into<String>, target: Type) -> EvaluationError {
    EvaluationError::InvalidCast {
        value: value.into(),
        target,
    }
}

pub(crate) fn format_double(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "Infinity".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else {
        format!("{:?}", value)
    }
}

fn double_to_bigint(value: f64) -> EvalResult<i64> {
    // 2^63
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if value.is_nan() {
        return Err(invalid_cast(format_double(value), Type::Bigint));
    }
    let rounded = value.round();
    if rounded < -LIMIT || rounded >= LIMIT {
        return Err(overflow("cast(double as bigint)"));
    }
    Ok(rounded as i64)
}

fn parse_boolean(value: &str) -> EvalResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "1" => Ok(true),
        "false" | "f" | "0" => Ok(false),
        _ => Err(invalid_cast(value, Type::Boolean)),
    }
}

fn cast(from: Type, to: Type, convert: fn(&Value) -> EvalResult<Value>) -> ScalarFunction {
    ScalarFunction::new(Signature::new("cast", to, vec![from]), move |_, arguments| {
        match arguments.first() {
            Some(value) if value.value_type() == Some(from) => convert(value),
            other => Err(argument_mismatch(from, other, "cast")),
        }
    })
}

fn register_casts(functions: &mut Vec<ScalarFunction>) {
    functions.push(cast(Type::Bigint, Type::Double, |value| match value {
        Value::Bigint(v) => Ok(Value::Double(*v as f64)),
        other => Err(argument_mismatch(Type::Bigint, Some(other), "cast")),
    }));
    functions.push(cast(Type::Double, Type::Bigint, |value| match value {
        Value::Double(v) => double_to_bigint(*v).map(Value::Bigint),
        other => Err(argument_mismatch(Type::Double, Some(other), "cast")),
    }));
    functions.push(cast(Type::Bigint, Type::Varchar, |value| match value {
        Value::Bigint(v) => Ok(Value::Varchar(v.to_string())),
        other => Err(argument_mismatch(Type::Bigint, Some(other), "cast")),
    }));
    functions.push(cast(Type::Double, Type::Varchar, |value| match value {
        Value::Double(v) => Ok(Value::Varchar(format_double(*v))),
        other => Err(argument_mismatch(Type::Double, Some(other), "cast")),
    }));
    functions.push(cast(Type::Boolean, Type::Varchar, |value| match value {
        Value::Boolean(v) => Ok(Value::Varchar(v.to_string())),
        other => Err(argument_mismatch(Type::Boolean, Some(other), "cast")),
    }));
    functions.push(cast(Type::Varchar, Type::Bigint, |value| match value {
        Value::Varchar(v) => v
            .trim()
            .parse::<i64>()
            .map(Value::Bigint)
            .map_err(|_| invalid_cast(v.as_str(), Type::Bigint)),
        other => Err(argument_mismatch(Type::Varchar, Some(other), "cast")),
    }));
    functions.push(cast(Type::Varchar, Type::Double, |value| match value {
        Value::Varchar(v) => v
            .trim()
            .parse::<f64>()
            .map(Value::Double)
            .map_err(|_| invalid_cast(v.as_str(), Type::Double)),
        other => Err(argument_mismatch(Type::Varchar, Some(other), "cast")),
    }));
    functions.push(cast(Type::Varchar, Type::Boolean, |value| match value {
        Value::Varchar(v) => parse_boolean(v).map(Value::Boolean),
        other => Err(argument_mismatch(Type::Varchar, Some(other), "cast")),
    }));
}

// Session

fn register_session_functions(functions: &mut Vec<ScalarFunction>) {
    functions.push(ScalarFunction::new(
        Signature::new("current_user", Type::Varchar, vec![]),
        |session, _| Ok(Value::Varchar(session.user().to_string())),
    ));
    functions.push(ScalarFunction::new(
        Signature::new("current_timezone", Type::Varchar, vec![]),
        |session, _| Ok(Value::Varchar(session.time_zone().to_string())),
    ));
}
