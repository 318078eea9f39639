//! Path keys and tree lookup.
//!
//! A [`PathKey`] is either a dotted path (`"db.primary.host"`), split on `.`
//! and walked one segment at a time, or a literal key that names one top-level
//! entry verbatim even when it contains dots. Callers choose explicitly; the
//! resolver never guesses.

use std::fmt;

use crate::value::{Table, Value};

/// Address of a value inside a configuration tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathKey {
    /// Split on `.` and traverse nested tables.
    Dotted(String),
    /// Exact top-level key, never split.
    Literal(String),
}

impl PathKey {
    /// Create a dotted path.
    pub fn dotted(path: impl Into<String>) -> Self {
        PathKey::Dotted(path.into())
    }

    /// Create a literal key.
    pub fn literal(key: impl Into<String>) -> Self {
        PathKey::Literal(key.into())
    }

    /// The raw string content.
    pub fn as_str(&self) -> &str {
        match self {
            PathKey::Dotted(s) | PathKey::Literal(s) => s,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, PathKey::Literal(_))
    }

    /// Whether this key addresses a single top-level entry.
    pub fn is_top_level(&self) -> bool {
        match self {
            PathKey::Literal(_) => true,
            PathKey::Dotted(s) => !s.contains('.'),
        }
    }

    /// Traversal steps: the split path, or the literal key as one step.
    pub fn segments(&self) -> Vec<&str> {
        match self {
            PathKey::Dotted(s) => s.split('.').collect(),
            PathKey::Literal(s) => vec![s.as_str()],
        }
    }
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for PathKey {
    fn from(s: &str) -> Self {
        PathKey::Dotted(s.to_string())
    }
}

impl From<String> for PathKey {
    fn from(s: String) -> Self {
        PathKey::Dotted(s)
    }
}

impl From<&String> for PathKey {
    fn from(s: &String) -> Self {
        PathKey::Dotted(s.clone())
    }
}

impl From<&PathKey> for PathKey {
    fn from(key: &PathKey) -> Self {
        key.clone()
    }
}

/// Shorthand for [`PathKey::literal`].
pub fn literal(key: impl Into<String>) -> PathKey {
    PathKey::literal(key)
}

/// Look up a single step below `node`.
///
/// Numeric segments index into arrays; everything else is a table key.
pub(crate) fn child<'a>(node: &'a Value, segment: &str) -> Option<&'a Value> {
    match node {
        Value::Table(table) => table.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

/// Walk `segments` below the root table. Every step must exist.
pub(crate) fn lookup_nested<'a>(table: &'a Table, segments: &[&str]) -> Option<&'a Value> {
    let (first, rest) = segments.split_first()?;
    let mut current = table.get(*first)?;
    for segment in rest {
        current = child(current, segment)?;
    }
    Some(current)
}

/// Resolve `key` against `table`.
///
/// A dotted path is walked segment by segment. When that walk finds nothing,
/// a top-level entry whose key is the whole dotted string is used instead, so
/// `"a.b"` still reaches `{"a.b": ..}` when no nested `a.b` exists. A literal
/// key only ever matches a top-level entry. Empty paths never resolve.
pub fn resolve<'a>(table: &'a Table, key: &PathKey) -> Option<&'a Value> {
    locate(table, key).map(|(_, value)| value)
}

/// Like [`resolve`], also returning where the value was found.
///
/// The location is canonical: every spelling that reaches a top-level entry
/// (`"x"`, `literal("x")`, or a dotted string matched by the fallback) yields
/// `PathKey::Literal`, and a nested hit yields the dotted path.
pub fn locate<'a>(table: &'a Table, key: &PathKey) -> Option<(PathKey, &'a Value)> {
    match key {
        PathKey::Literal(k) => table.get(k.as_str()).map(|v| (key.clone(), v)),
        PathKey::Dotted(path) if path.is_empty() => None,
        PathKey::Dotted(path) if !path.contains('.') => table
            .get(path.as_str())
            .map(|v| (PathKey::literal(path.as_str()), v)),
        PathKey::Dotted(path) => match lookup_nested(table, &key.segments()) {
            Some(value) => Some((key.clone(), value)),
            None => table
                .get(path.as_str())
                .map(|v| (PathKey::literal(path.as_str()), v)),
        },
    }
}

/// Whether `key` resolves to anything (including null).
pub fn exists(table: &Table, key: &PathKey) -> bool {
    resolve(table, key).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table;

    fn sample() -> Table {
        table! {
            "a.b" => "X",
            "a" => table! { "b" => "Y", "c" => Value::Null },
            "list" => vec!["zero", "one"],
            "db" => table! { "host" => "localhost", "port" => "5432" },
        }
    }

    #[test]
    fn test_plain_key_is_top_level_lookup() {
        let t = sample();
        assert_eq!(resolve(&t, &"db".into()), t.get("db"));
    }

    #[test]
    fn test_dotted_path_prefers_nested_value() {
        let t = sample();
        assert_eq!(resolve(&t, &"a.b".into()), Some(&Value::from("Y")));
    }

    #[test]
    fn test_literal_key_is_never_split() {
        let t = sample();
        assert_eq!(resolve(&t, &literal("a.b")), Some(&Value::from("X")));
        assert_eq!(resolve(&t, &literal("db.host")), None);
    }

    #[test]
    fn test_dotted_path_falls_back_to_exact_key() {
        let t = table! { "cache.dir" => "/tmp" };
        assert_eq!(resolve(&t, &"cache.dir".into()), Some(&Value::from("/tmp")));
    }

    #[test]
    fn test_missing_segments() {
        let t = sample();
        assert_eq!(resolve(&t, &"db.password".into()), None);
        assert_eq!(resolve(&t, &"db.host.deeper".into()), None);
        assert_eq!(resolve(&t, &"nope".into()), None);
    }

    #[test]
    fn test_empty_path_never_resolves() {
        let t = table! { "" => 1 };
        assert_eq!(resolve(&t, &"".into()), None);
    }

    #[test]
    fn test_null_value_exists() {
        let t = sample();
        assert_eq!(resolve(&t, &"a.c".into()), Some(&Value::Null));
        assert!(exists(&t, &"a.c".into()));
    }

    #[test]
    fn test_numeric_segments_index_arrays() {
        let t = sample();
        assert_eq!(resolve(&t, &"list.1".into()), Some(&Value::from("one")));
        assert_eq!(resolve(&t, &"list.2".into()), None);

        let numeric_keys = table! { "ports" => table! { "0" => 80 } };
        assert_eq!(
            resolve(&numeric_keys, &"ports.0".into()),
            Some(&Value::Integer(80))
        );
    }

    #[test]
    fn test_segments() {
        assert_eq!(PathKey::from("a.b.c").segments(), vec!["a", "b", "c"]);
        assert_eq!(literal("a.b.c").segments(), vec!["a.b.c"]);
        assert!(PathKey::from("a").is_top_level());
        assert!(!PathKey::from("a.b").is_top_level());
        assert!(literal("a.b").is_top_level());
    }

    #[test]
    fn test_locate_is_canonical() {
        let t = table! { "x" => 1, "a.b" => "X", "n" => table! { "m" => 2 } };

        assert_eq!(locate(&t, &PathKey::from("x")).map(|(at, _)| at), Some(literal("x")));
        assert_eq!(locate(&t, &literal("x")).map(|(at, _)| at), Some(literal("x")));
        assert_eq!(locate(&t, &PathKey::from("a.b")).map(|(at, _)| at), Some(literal("a.b")));
        assert_eq!(
            locate(&t, &PathKey::from("n.m")).map(|(at, _)| at),
            Some(PathKey::from("n.m"))
        );
        assert_eq!(locate(&t, &PathKey::from("n.z")), None);
    }
}
