//! Deterministic merging of provider trees.
//!
//! Trees are folded left to right in provider order. By default tables merge
//! recursively and everything else is replaced by the later value. A small
//! table of reserved top-level keys opts into different behaviour, see
//! [`MergeStrategy`].

use std::collections::HashMap;

use crate::value::{Table, Value};

/// Key whose sub-tables hold dependency definitions (factories, aliases, ...).
pub const DEPENDENCIES_KEY: &str = "dependencies";

/// Key holding the list of bootstrap/initialization entries.
pub const BOOTSTRAP_KEY: &str = "bootstrap";

/// How a top-level key is combined when both sides define it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeStrategy {
    /// Tables merge key by key at every depth; anything else is replaced.
    #[default]
    Recursive,
    /// The later value replaces the earlier one, tables included.
    ReplaceWhole,
    /// Each sub-table merges entry by entry; entries themselves are replaced
    /// and sub-lists are concatenated, so independently contributed
    /// definitions accumulate.
    DeepMergeOneLevel,
    /// Both sides are appended into one list.
    ConcatList,
}

/// Lookup table from reserved top-level keys to their merge strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergePolicy {
    reserved: HashMap<String, MergeStrategy>,
}

impl Default for MergePolicy {
    /// `dependencies` deep-merges one level, `bootstrap` concatenates.
    fn default() -> Self {
        Self::none()
            .with_key(DEPENDENCIES_KEY, MergeStrategy::DeepMergeOneLevel)
            .with_key(BOOTSTRAP_KEY, MergeStrategy::ConcatList)
    }
}

impl MergePolicy {
    /// A policy with no reserved keys: plain recursive merge everywhere.
    pub fn none() -> Self {
        Self {
            reserved: HashMap::new(),
        }
    }

    /// Attach a strategy to a top-level key.
    pub fn with_key(mut self, key: impl Into<String>, strategy: MergeStrategy) -> Self {
        self.reserved.insert(key.into(), strategy);
        self
    }

    /// Strategy used for `key` at the top level.
    pub fn strategy_for(&self, key: &str) -> MergeStrategy {
        self.reserved.get(key).copied().unwrap_or_default()
    }
}

/// Merge `incoming` into `base`; `incoming` wins on conflicts.
pub fn merge(mut base: Table, incoming: Table, policy: &MergePolicy) -> Table {
    for (key, value) in incoming {
        let strategy = policy.strategy_for(&key);
        match base.get_mut(&key) {
            Some(existing) => {
                let current = std::mem::take(existing);
                *existing = merge_with(strategy, current, value);
            }
            None => {
                base.insert(key, value);
            }
        }
    }
    base
}

/// Fold trees left to right.
pub fn merge_all<I>(trees: I, policy: &MergePolicy) -> Table
where
    I: IntoIterator<Item = Table>,
{
    trees
        .into_iter()
        .fold(Table::new(), |acc, tree| merge(acc, tree, policy))
}

fn merge_with(strategy: MergeStrategy, base: Value, incoming: Value) -> Value {
    match strategy {
        MergeStrategy::Recursive => merge_recursive(base, incoming),
        MergeStrategy::ReplaceWhole => incoming,
        MergeStrategy::DeepMergeOneLevel => merge_one_level(base, incoming),
        MergeStrategy::ConcatList => concat(base, incoming),
    }
}

fn merge_recursive(base: Value, incoming: Value) -> Value {
    match (base, incoming) {
        (Value::Table(mut left), Value::Table(right)) => {
            for (key, value) in right {
                match left.get_mut(&key) {
                    Some(existing) => {
                        let current = std::mem::take(existing);
                        *existing = merge_recursive(current, value);
                    }
                    None => {
                        left.insert(key, value);
                    }
                }
            }
            Value::Table(left)
        }
        (_, incoming) => incoming,
    }
}

fn merge_one_level(base: Value, incoming: Value) -> Value {
    match (base, incoming) {
        (Value::Table(mut sections), Value::Table(incoming_sections)) => {
            for (name, section) in incoming_sections {
                match sections.get_mut(&name) {
                    Some(existing) => {
                        let current = std::mem::take(existing);
                        *existing = merge_section(current, section);
                    }
                    None => {
                        sections.insert(name, section);
                    }
                }
            }
            Value::Table(sections)
        }
        (_, incoming) => incoming,
    }
}

fn merge_section(base: Value, incoming: Value) -> Value {
    match (base, incoming) {
        (Value::Table(mut left), Value::Table(right)) => {
            left.extend(right);
            Value::Table(left)
        }
        (Value::Array(mut left), Value::Array(right)) => {
            left.extend(right);
            Value::Array(left)
        }
        (_, incoming) => incoming,
    }
}

fn concat(base: Value, incoming: Value) -> Value {
    match (base, incoming) {
        (Value::Array(mut left), Value::Array(right)) => {
            left.extend(right);
            Value::Array(left)
        }
        (Value::Array(mut left), scalar) if !matches!(scalar, Value::Table(_)) => {
            left.push(scalar);
            Value::Array(left)
        }
        (scalar, Value::Array(right)) if !matches!(scalar, Value::Table(_)) => {
            let mut items = Vec::with_capacity(right.len() + 1);
            items.push(scalar);
            items.extend(right);
            Value::Array(items)
        }
        (_, incoming) => incoming,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table;

    #[test]
    fn test_disjoint_keys_union() {
        let a = table! { "host" => "localhost" };
        let b = table! { "port" => 8080 };

        let merged = merge(a, b, &MergePolicy::default());
        assert_eq!(merged, table! { "host" => "localhost", "port" => 8080 });
    }

    #[test]
    fn test_later_scalar_wins() {
        let a = table! { "host" => "localhost", "port" => 8080 };
        let b = table! { "host" => "production" };

        let merged = merge(a, b, &MergePolicy::default());
        assert_eq!(merged.get("host"), Some(&Value::from("production")));
        assert_eq!(merged.get("port"), Some(&Value::Integer(8080)));
    }

    #[test]
    fn test_nested_tables_merge_recursively() {
        let a = table! { "db" => table! { "host" => "a", "pool" => table! { "min" => 1 } } };
        let b = table! { "db" => table! { "pool" => table! { "max" => 10 } } };

        let merged = merge(a, b, &MergePolicy::none());
        assert_eq!(
            merged,
            table! { "db" => table! { "host" => "a", "pool" => table! { "min" => 1, "max" => 10 } } }
        );
    }

    #[test]
    fn test_lists_and_type_mismatches_are_replaced() {
        let a = table! { "hosts" => vec!["a", "b"], "mode" => table! { "x" => 1 } };
        let b = table! { "hosts" => vec!["c"], "mode" => "simple" };

        let merged = merge(a, b, &MergePolicy::default());
        assert_eq!(merged.get("hosts"), Some(&Value::from(vec!["c"])));
        assert_eq!(merged.get("mode"), Some(&Value::from("simple")));
    }

    #[test]
    fn test_dependencies_accumulate() {
        let a = table! {
            "dependencies" => table! {
                "factories" => table! { "Db" => "DbFactory" },
                "delegators" => table! { "Db" => vec!["Logging"] },
            },
        };
        let b = table! {
            "dependencies" => table! {
                "factories" => table! { "Cache" => "CacheFactory" },
                "aliases" => table! { "db" => "Db" },
            },
        };

        let merged = merge(a, b, &MergePolicy::default());
        let deps = merged.get("dependencies").and_then(Value::as_table).unwrap();
        let factories = deps.get("factories").and_then(Value::as_table).unwrap();
        assert_eq!(factories.len(), 2);
        assert!(factories.contains_key("Db"));
        assert!(factories.contains_key("Cache"));
        assert!(deps.contains_key("aliases"));
        assert!(deps.contains_key("delegators"));
    }

    #[test]
    fn test_dependency_sub_lists_concatenate() {
        let a = table! { "dependencies" => table! { "invokables" => vec!["A"] } };
        let b = table! { "dependencies" => table! { "invokables" => vec!["B"] } };

        let merged = merge(a, b, &MergePolicy::default());
        assert_eq!(
            merged,
            table! { "dependencies" => table! { "invokables" => vec!["A", "B"] } }
        );
    }

    #[test]
    fn test_dependency_entries_replaced_not_merged() {
        let a = table! {
            "dependencies" => table! { "factories" => table! { "Db" => table! { "class" => "A", "shared" => true } } },
        };
        let b = table! {
            "dependencies" => table! { "factories" => table! { "Db" => table! { "class" => "B" } } },
        };

        let merged = merge(a, b, &MergePolicy::default());
        assert_eq!(
            merged,
            table! { "dependencies" => table! { "factories" => table! { "Db" => table! { "class" => "B" } } } }
        );
    }

    #[test]
    fn test_bootstrap_lists_concatenate() {
        let a = table! { "bootstrap" => vec!["first"] };
        let b = table! { "bootstrap" => vec!["second", "third"] };

        let merged = merge(a, b, &MergePolicy::default());
        assert_eq!(
            merged.get("bootstrap"),
            Some(&Value::from(vec!["first", "second", "third"]))
        );
    }

    #[test]
    fn test_bootstrap_scalar_appended() {
        let merged = merge(
            table! { "bootstrap" => vec!["first"] },
            table! { "bootstrap" => "second" },
            &MergePolicy::default(),
        );
        assert_eq!(
            merged.get("bootstrap"),
            Some(&Value::from(vec!["first", "second"]))
        );

        let merged = merge(
            table! { "bootstrap" => "first" },
            table! { "bootstrap" => vec!["second"] },
            &MergePolicy::default(),
        );
        assert_eq!(
            merged.get("bootstrap"),
            Some(&Value::from(vec!["first", "second"]))
        );
    }

    #[test]
    fn test_reserved_keys_only_apply_at_top_level() {
        let a = table! { "app" => table! { "bootstrap" => vec!["a"] } };
        let b = table! { "app" => table! { "bootstrap" => vec!["b"] } };

        let merged = merge(a, b, &MergePolicy::default());
        assert_eq!(
            merged,
            table! { "app" => table! { "bootstrap" => vec!["b"] } }
        );
    }

    #[test]
    fn test_replace_whole_strategy() {
        let policy = MergePolicy::none().with_key("routes", MergeStrategy::ReplaceWhole);
        let a = table! { "routes" => table! { "home" => "/", "about" => "/about" } };
        let b = table! { "routes" => table! { "home" => "/index" } };

        let merged = merge(a, b, &policy);
        assert_eq!(merged, table! { "routes" => table! { "home" => "/index" } });
    }

    #[test]
    fn test_merge_all_follows_order() {
        let merged = merge_all(
            vec![
                table! { "v" => 1 },
                table! { "v" => 2 },
                table! { "v" => 3, "w" => 0 },
            ],
            &MergePolicy::default(),
        );
        assert_eq!(merged, table! { "v" => 3, "w" => 0 });

        let keys: Vec<&str> = merged.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["v", "w"]);
    }
}
