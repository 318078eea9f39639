//! Restricting (`only`) and excluding (`except`) parts of a tree.
//!
//! Both operations build a new table and leave their input untouched. Removal
//! prunes every ancestor that the removal left empty, walking back up the
//! recorded key path until a non-empty ancestor or the root is reached.

use crate::path::{self, PathKey};
use crate::value::{Table, Value};

/// Keep only the entries addressed by `keys`.
///
/// Top-level keys are copied verbatim when present. Dotted paths are resolved
/// and, when they hold a non-null value, inserted at the same nested location
/// of the result. Paths that resolve to nothing are skipped.
pub fn only(source: &Table, keys: &[PathKey]) -> Table {
    let mut out = Table::new();
    for key in keys {
        if key.is_top_level() {
            let name = key.as_str();
            if name.is_empty() {
                continue;
            }
            if let Some(value) = source.get(name) {
                out.insert(name.to_string(), value.clone());
            }
            continue;
        }

        let segments = key.segments();
        match path::lookup_nested(source, &segments) {
            Some(Value::Null) => {}
            Some(value) => insert_at(&mut out, &segments, value.clone()),
            None => {
                if let Some(value) = source.get(key.as_str()) {
                    out.insert(key.as_str().to_string(), value.clone());
                }
            }
        }
    }
    out
}

/// Drop the entries addressed by `keys`, pruning emptied ancestors.
pub fn except(source: &Table, keys: &[PathKey]) -> Table {
    let mut root = Value::Table(source.clone());
    for key in keys {
        if key.is_top_level() {
            if let Value::Table(table) = &mut root {
                table.shift_remove(key.as_str());
            }
            continue;
        }

        let segments = key.segments();
        if !remove_at(&mut root, &segments) {
            if let Value::Table(table) = &mut root {
                table.shift_remove(key.as_str());
            }
        }
    }
    match root {
        Value::Table(table) => table,
        _ => Table::new(),
    }
}

/// Insert `value` at `segments`, creating (or overwriting non-table)
/// intermediate entries as tables.
pub fn insert_at(table: &mut Table, segments: &[&str], value: Value) {
    let Some((last, parents)) = segments.split_last() else {
        return;
    };
    let mut current = table;
    for segment in parents {
        let slot = current
            .entry((*segment).to_string())
            .or_insert_with(|| Value::Table(Table::new()));
        if !matches!(slot, Value::Table(_)) {
            *slot = Value::Table(Table::new());
        }
        let Value::Table(next) = slot else {
            return;
        };
        current = next;
    }
    current.insert((*last).to_string(), value);
}

/// Remove the value at `segments` below `root`.
///
/// Returns `false` when nothing lives at that location. After a removal every
/// ancestor table that became empty is removed as well. Arrays along the path
/// lose elements by being re-keyed on their original indices.
pub fn remove_at(root: &mut Value, segments: &[&str]) -> bool {
    let Some((last, parents)) = segments.split_last() else {
        return false;
    };
    let removed = match descend_mut(root, parents) {
        Some(parent) => remove_child(parent, last),
        None => false,
    };
    if !removed {
        return false;
    }

    // `parents` is the ancestor stack; unwind it deepest first.
    for depth in (0..parents.len()).rev() {
        let key = parents[depth];
        let Some(ancestor) = descend_mut(root, &parents[..depth]) else {
            break;
        };
        let emptied = path::child(ancestor, key).is_some_and(Value::is_empty_container);
        if !emptied {
            break;
        }
        remove_child(ancestor, key);
    }
    true
}

fn descend_mut<'a>(mut node: &'a mut Value, segments: &[&str]) -> Option<&'a mut Value> {
    for segment in segments {
        node = child_mut(node, segment)?;
    }
    Some(node)
}

fn child_mut<'a>(node: &'a mut Value, segment: &str) -> Option<&'a mut Value> {
    match node {
        Value::Table(table) => table.get_mut(segment),
        Value::Array(items) => segment
            .parse::<usize>()
            .ok()
            .and_then(move |i| items.get_mut(i)),
        _ => None,
    }
}

/// Remove one child of `node`.
///
/// An array losing an element becomes a table keyed by the original indices
/// of the elements left, so later paths in the same call still address the
/// source positions.
fn remove_child(node: &mut Value, segment: &str) -> bool {
    let reindexed: Table = match node {
        Value::Table(table) => return table.shift_remove(segment).is_some(),
        Value::Array(items) => match segment.parse::<usize>() {
            Ok(i) if i < items.len() => std::mem::take(items)
                .into_iter()
                .enumerate()
                .filter(|(index, _)| *index != i)
                .map(|(index, item)| (index.to_string(), item))
                .collect(),
            _ => return false,
        },
        _ => return false,
    };
    *node = Value::Table(reindexed);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::literal;
    use crate::table;

    fn keys(paths: &[&str]) -> Vec<PathKey> {
        paths.iter().map(|p| PathKey::from(*p)).collect()
    }

    fn sample() -> Table {
        table! {
            "app" => table! { "name" => "demo", "debug" => true },
            "db" => table! {
                "primary" => table! { "host" => "db1", "port" => 5432 },
                "replica" => table! { "host" => "db2" },
                "password" => Value::Null,
            },
            "log.level" => "info",
            "hosts" => vec!["a", "b", "c"],
        }
    }

    #[test]
    fn test_only_top_level_keys() {
        let out = only(&sample(), &keys(&["app", "missing"]));
        assert_eq!(out, table! { "app" => table! { "name" => "demo", "debug" => true } });
    }

    #[test]
    fn test_only_nested_path_rebuilds_structure() {
        let out = only(&sample(), &keys(&["db.primary.host", "app.name"]));
        assert_eq!(
            out,
            table! {
                "db" => table! { "primary" => table! { "host" => "db1" } },
                "app" => table! { "name" => "demo" },
            }
        );
    }

    #[test]
    fn test_only_skips_null_and_missing_nested_values() {
        let out = only(&sample(), &keys(&["db.password", "db.primary.user"]));
        assert!(out.is_empty());
    }

    #[test]
    fn test_only_literal_key() {
        let out = only(&sample(), &[literal("log.level")]);
        assert_eq!(out, table! { "log.level" => "info" });

        let out = only(&sample(), &[literal("app.name")]);
        assert!(out.is_empty());
    }

    #[test]
    fn test_only_is_idempotent() {
        let paths = keys(&["db.primary", "app.debug", "log.level", "hosts.1"]);
        let once = only(&sample(), &paths);
        let twice = only(&once, &paths);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_except_prunes_empty_ancestors() {
        let tree = table! { "a" => table! { "b" => table! { "c" => 1 } } };
        let out = except(&tree, &keys(&["a.b.c"]));
        assert!(out.is_empty());
    }

    #[test]
    fn test_except_stops_pruning_at_non_empty_ancestor() {
        let out = except(&sample(), &keys(&["db.replica.host"]));
        let db = out.get("db").and_then(Value::as_table).unwrap();
        assert!(!db.contains_key("replica"));
        assert!(db.contains_key("primary"));
        assert!(db.contains_key("password"));
    }

    #[test]
    fn test_except_top_level_and_literal() {
        let out = except(&sample(), &[PathKey::from("app"), literal("log.level")]);
        assert!(!out.contains_key("app"));
        assert!(!out.contains_key("log.level"));
        assert!(out.contains_key("db"));
    }

    #[test]
    fn test_except_literal_does_not_touch_nested() {
        let tree = table! { "a" => table! { "b" => 1 }, "a.b" => 2 };
        let out = except(&tree, &[literal("a.b")]);
        assert_eq!(out, table! { "a" => table! { "b" => 1 } });

        let out = except(&tree, &keys(&["a.b"]));
        assert_eq!(out, table! { "a.b" => 2 });
    }

    #[test]
    fn test_except_missing_path_is_noop() {
        let source = sample();
        let out = except(&source, &keys(&["db.primary.user", "nothing.here"]));
        assert_eq!(out, source);
    }

    #[test]
    fn test_except_array_element_keeps_source_indices() {
        let out = except(&sample(), &keys(&["hosts.0"]));
        assert_eq!(out.get("hosts"), Some(&Value::Table(table! { "1" => "b", "2" => "c" })));

        let tree = table! { "only" => table! { "list" => vec!["x"] } };
        assert!(except(&tree, &keys(&["only.list.0"])).is_empty());
    }

    #[test]
    fn test_except_several_indices_of_one_array() {
        let tree = table! { "hosts" => vec!["a", "b", "c"] };
        let expected = Some(Value::Table(table! { "2" => "c" }));

        let out = except(&tree, &keys(&["hosts.0", "hosts.1"]));
        assert_eq!(out.get("hosts").cloned(), expected);

        let out = except(&tree, &keys(&["hosts.1", "hosts.0"]));
        assert_eq!(out.get("hosts").cloned(), expected);

        assert!(except(&tree, &keys(&["hosts.2", "hosts.0", "hosts.1"])).is_empty());
    }

    #[test]
    fn test_only_and_except_agree_on_array_elements() {
        let tree = table! { "hosts" => vec!["a", "b", "c"] };
        assert_eq!(
            only(&tree, &keys(&["hosts.1", "hosts.2"])),
            except(&tree, &keys(&["hosts.0"]))
        );
    }

    #[test]
    fn test_projection_leaves_source_untouched() {
        let source = sample();
        let before = source.clone();
        let _ = only(&source, &keys(&["db.primary.host"]));
        let _ = except(&source, &keys(&["db.primary.host"]));
        assert_eq!(source, before);
    }

    #[test]
    fn test_insert_at_replaces_scalar_intermediate() {
        let mut t = table! { "a" => 1 };
        insert_at(&mut t, &["a", "b"], Value::from("x"));
        assert_eq!(t, table! { "a" => table! { "b" => "x" } });
    }

    #[test]
    fn test_remove_at_reports_misses() {
        let mut root = Value::Table(sample());
        assert!(!remove_at(&mut root, &["db", "nothing"]));
        assert!(!remove_at(&mut root, &[]));
        assert!(remove_at(&mut root, &["db", "primary", "port"]));
    }
}
