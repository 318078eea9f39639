//! Value types for configuration representation.
//!
//! This module provides the `Value` enum that every provider produces and every
//! accessor reads. Tables keep insertion order so iteration over a snapshot
//! follows the order in which providers contributed keys.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::config::Config;

/// A mapping from string keys to values, in insertion order.
pub type Table = IndexMap<String, Value>;

/// A computation stored in the tree and run against the owning snapshot.
///
/// Deferral is explicit: only values wrapped in `Deferred` are ever invoked.
/// Two `Deferred` values are equal only when they share the same closure.
#[derive(Clone)]
pub struct Deferred(Arc<dyn Fn(&Config) -> Value + Send + Sync>);

impl Deferred {
    /// Wrap a closure that computes a value from the owning snapshot.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Config) -> Value + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Run the computation against `config`.
    pub fn invoke(&self, config: &Config) -> Value {
        (self.0)(config)
    }

    /// Whether both handles point at the same closure.
    pub fn ptr_eq(&self, other: &Deferred) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Deferred(..)")
    }
}

/// A node of the configuration tree.
///
/// Providers produce `Table` roots; everything below is plain data except
/// `Deferred`, which is only invoked by the snapshot accessors.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Array(Vec<Value>),
    Table(Table),
    Deferred(Deferred),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Table(a), Value::Table(b)) => a == b,
            (Value::Deferred(a), Value::Deferred(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl Value {
    /// Wrap a closure as a deferred value.
    pub fn deferred<F>(f: F) -> Self
    where
        F: Fn(&Config) -> Value + Send + Sync + 'static,
    {
        Value::Deferred(Deferred::new(f))
    }

    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if this value is a deferred computation.
    pub fn is_deferred(&self) -> bool {
        matches!(self, Value::Deferred(_))
    }

    /// Whether this is a scalar (bool, number or string).
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Value::Bool(_) | Value::Integer(_) | Value::Float(_) | Value::String(_)
        )
    }

    /// Try to get this value as a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get this value as an integer.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get this value as a float.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Try to get this value as a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get this value as an array.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Try to get this value as a table.
    pub fn as_table(&self) -> Option<&Table> {
        match self {
            Value::Table(table) => Some(table),
            _ => None,
        }
    }

    /// Try to get this value as a mutable table.
    pub fn as_table_mut(&mut self) -> Option<&mut Table> {
        match self {
            Value::Table(table) => Some(table),
            _ => None,
        }
    }

    /// Whether this is an array or table with no entries.
    pub fn is_empty_container(&self) -> bool {
        match self {
            Value::Array(arr) => arr.is_empty(),
            Value::Table(table) => table.is_empty(),
            _ => false,
        }
    }

    /// Get a human-readable type name for this value.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Table(_) => "table",
            Value::Deferred(_) => "deferred",
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<Table> for Value {
    fn from(t: Table) -> Self {
        Value::Table(t)
    }
}

impl From<Deferred> for Value {
    fn from(d: Deferred) -> Self {
        Value::Deferred(d)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Array(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Value::Table(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Build a [`Table`] from `key => value` pairs.
///
/// ```
/// use configtree::table;
///
/// let t = table! {
///     "db" => table! { "host" => "localhost", "port" => 5432 },
///     "debug" => true,
/// };
/// assert_eq!(t.len(), 2);
/// ```
#[macro_export]
macro_rules! table {
    () => { $crate::Table::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut t = $crate::Table::new();
        $( t.insert(::std::string::String::from($key), $crate::Value::from($value)); )+
        t
    }};
}

/// A value that has no plain-data representation.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct NotData {
    pub path: String,
    pub reason: String,
}

/// Convert parsed JSON into a `Value`.
pub(crate) fn from_json(json: serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => {
            // Try integer first, fall back to float
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else if let Some(f) = n.as_f64() {
                Value::Float(f)
            } else {
                Value::String(n.to_string())
            }
        }
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(arr) => Value::Array(arr.into_iter().map(from_json).collect()),
        serde_json::Value::Object(obj) => {
            Value::Table(obj.into_iter().map(|(k, v)| (k, from_json(v))).collect())
        }
    }
}

/// Convert a value to JSON, failing on deferred values and non-finite floats.
///
/// `path` is the location of `value` and is reported on failure.
pub(crate) fn to_json(value: &Value, path: &str) -> Result<serde_json::Value, NotData> {
    let json = match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Integer(i) => serde_json::Value::Number((*i).into()),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .ok_or_else(|| NotData {
                path: path.to_string(),
                reason: format!("float {} has no JSON representation", f),
            })?,
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Array(items) => serde_json::Value::Array(
            items
                .iter()
                .enumerate()
                .map(|(i, item)| to_json(item, &join_path(path, &i.to_string())))
                .collect::<Result<_, _>>()?,
        ),
        Value::Table(table) => serde_json::Value::Object(
            table
                .iter()
                .map(|(k, v)| Ok((k.clone(), to_json(v, &join_path(path, k))?)))
                .collect::<Result<_, NotData>>()?,
        ),
        Value::Deferred(_) => {
            return Err(NotData {
                path: path.to_string(),
                reason: "deferred values are not plain data".to_string(),
            })
        }
    };
    Ok(json)
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors_are_exact() {
        let port = Value::from("5432");
        assert_eq!(port.as_str(), Some("5432"));
        assert_eq!(port.as_integer(), None);
        assert!(port.is_scalar());

        assert_eq!(Value::Integer(8).as_float(), Some(8.0));
        assert_eq!(Value::Float(0.5).as_integer(), None);
        assert_eq!(Value::Bool(false).as_bool(), Some(false));
        assert!(Value::Null.is_null());
        assert!(!Value::from(vec!["a"]).is_scalar());
        assert!(Value::deferred(|_| Value::Null).is_deferred());
    }

    #[test]
    fn test_type_names_used_in_errors() {
        let names: Vec<&str> = [
            Value::Null,
            Value::Bool(true),
            Value::Integer(1),
            Value::Float(1.5),
            Value::from("s"),
            Value::Array(vec![]),
            Value::Table(Table::new()),
            Value::deferred(|_| Value::Null),
        ]
        .iter()
        .map(Value::type_name)
        .collect();
        assert_eq!(
            names,
            ["null", "boolean", "integer", "float", "string", "array", "table", "deferred"]
        );
    }

    #[test]
    fn test_deferred_equality_is_identity() {
        let d = Deferred::new(|_| Value::Integer(1));
        let same = Value::Deferred(d.clone());
        let other = Value::deferred(|_| Value::Integer(1));

        assert_eq!(Value::Deferred(d), same);
        assert_ne!(same, other);
    }

    #[test]
    fn test_table_macro_keeps_insertion_order() {
        let t = table! { "zeta" => 1, "alpha" => 2, "mid" => 3 };
        let keys: Vec<&str> = t.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_empty_container() {
        assert!(Value::Table(Table::new()).is_empty_container());
        assert!(Value::Array(vec![]).is_empty_container());
        assert!(!Value::Null.is_empty_container());
        assert!(!Value::from(vec![1i64]).is_empty_container());
    }

    #[test]
    fn test_value_from_conversions() {
        assert_eq!(Value::from(5432i32), Value::Integer(5432));
        assert_eq!(Value::from(String::from("db")), Value::from("db"));
        assert_eq!(
            Value::from(vec!["a", "b"]),
            Value::Array(vec![Value::from("a"), Value::from("b")])
        );
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some(true)), Value::Bool(true));

        let v: Value = vec![("a", 1i64), ("b", 2i64)].into_iter().collect();
        assert_eq!(v.as_table().map(Table::len), Some(2));
    }

    #[test]
    fn test_json_conversion() {
        let json = serde_json::json!({"db": {"port": 5432, "ratio": 0.5, "hosts": ["a"]}, "x": null});
        let value = from_json(json.clone());
        assert_eq!(
            value.as_table().and_then(|t| t.get("db")).and_then(|db| db.as_table()).and_then(|db| db.get("port")),
            Some(&Value::Integer(5432))
        );
        assert_eq!(to_json(&value, ""), Ok(json));
    }

    #[test]
    fn test_to_json_rejects_deferred_with_path() {
        let value = Value::Table(table! {
            "services" => table! { "list" => vec![Value::Null, Value::deferred(|_| Value::Null)] },
        });
        let err = to_json(&value, "").unwrap_err();
        assert_eq!(err.path, "services.list.1");

        let err = to_json(&Value::Float(f64::NAN), "ratio").unwrap_err();
        assert_eq!(err.path, "ratio");
    }
}
