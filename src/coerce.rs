//! Typed coercion of resolved values.
//!
//! Every function returns `None` when the value cannot be represented as the
//! target type. The accessors on [`Config`](crate::Config) decide whether that
//! means "use the default" or "raise an error".

use std::sync::LazyLock;

use regex::Regex;

use crate::error::CoerceTarget;
use crate::value::{Table, Value};

static INTEGER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^-?[0-9]+$").unwrap());
static DECIMAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?(?:[0-9]+\.[0-9]*|\.[0-9]+)$").unwrap());

const TRUTHY: [&str; 6] = ["true", "1", "yes", "on", "enabled", "y"];
const FALSY: [&str; 7] = ["false", "0", "no", "off", "disabled", "n", ""];

/// Types a configuration value can be read as.
pub trait FromValue: Sized {
    /// Reported in coercion errors.
    const TARGET: CoerceTarget;

    fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for i64 {
    const TARGET: CoerceTarget = CoerceTarget::Int;

    fn from_value(value: &Value) -> Option<Self> {
        to_int(value)
    }
}

impl FromValue for f64 {
    const TARGET: CoerceTarget = CoerceTarget::Float;

    fn from_value(value: &Value) -> Option<Self> {
        to_float(value)
    }
}

impl FromValue for bool {
    const TARGET: CoerceTarget = CoerceTarget::Bool;

    fn from_value(value: &Value) -> Option<Self> {
        to_bool(value)
    }
}

impl FromValue for String {
    const TARGET: CoerceTarget = CoerceTarget::String;

    fn from_value(value: &Value) -> Option<Self> {
        to_string(value)
    }
}

impl FromValue for Vec<Value> {
    const TARGET: CoerceTarget = CoerceTarget::List;

    fn from_value(value: &Value) -> Option<Self> {
        to_list(value)
    }
}

/// Whether `s` looks like an integer or decimal number.
pub fn is_numeric(s: &str) -> bool {
    INTEGER.is_match(s) || DECIMAL.is_match(s)
}

/// Integers pass through, integral floats convert, numeric strings parse
/// (decimals truncate toward zero), booleans become 1/0.
pub fn to_int(value: &Value) -> Option<i64> {
    match value {
        Value::Integer(i) => Some(*i),
        Value::Float(f) if f.fract() == 0.0 => float_to_int(*f),
        Value::Bool(b) => Some(i64::from(*b)),
        Value::String(s) if INTEGER.is_match(s) => s.parse().ok(),
        Value::String(s) if DECIMAL.is_match(s) => s
            .parse::<f64>()
            .ok()
            .and_then(|f| float_to_int(f.trunc())),
        _ => None,
    }
}

fn float_to_int(f: f64) -> Option<i64> {
    // i64::MAX is not exactly representable; the bound is exclusive.
    if f.is_finite() && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

/// Numbers pass through, numeric strings parse, booleans become 1.0/0.0.
pub fn to_float(value: &Value) -> Option<f64> {
    match value {
        Value::Float(f) => Some(*f),
        Value::Integer(i) => Some(*i as f64),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) if is_numeric(s) => s.parse().ok(),
        _ => None,
    }
}

/// Strings match the truthy/falsy word lists case-insensitively; anything
/// else falls back to general truthiness. Null has no boolean reading.
pub fn to_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Null => None,
        Value::String(s) => {
            let lowered = s.to_lowercase();
            if TRUTHY.contains(&lowered.as_str()) {
                Some(true)
            } else if FALSY.contains(&lowered.as_str()) {
                Some(false)
            } else {
                Some(truthy(value))
            }
        }
        other => Some(truthy(other)),
    }
}

/// General truthiness: zero, empty and null are false.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Integer(i) => *i != 0,
        Value::Float(f) => *f != 0.0,
        Value::String(s) => !(s.is_empty() || s == "0"),
        Value::Array(items) => !items.is_empty(),
        Value::Table(table) => !table.is_empty(),
        Value::Deferred(_) => true,
    }
}

/// Scalars format with `Display`; containers, null and deferred values fail.
pub fn to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Integer(i) => Some(i.to_string()),
        Value::Float(f) => Some(f.to_string()),
        _ => None,
    }
}

/// Arrays pass through; strings split on `,` with each element trimmed (the
/// empty string is the empty list); other scalars become a one-element list.
pub fn to_list(value: &Value) -> Option<Vec<Value>> {
    match value {
        Value::Array(items) => Some(items.clone()),
        Value::String(s) if s.is_empty() => Some(Vec::new()),
        Value::String(s) => Some(
            s.split(',')
                .map(|item| Value::String(item.trim().to_string()))
                .collect(),
        ),
        Value::Bool(_) | Value::Integer(_) | Value::Float(_) => Some(vec![value.clone()]),
        _ => None,
    }
}

/// Tables pass through; nothing else converts.
pub fn to_table(value: &Value) -> Option<Table> {
    value.as_table().cloned()
}
