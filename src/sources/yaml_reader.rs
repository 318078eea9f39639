//! YAML file reader.

use std::path::Path;

use crate::env::ConfigEnv;
use crate::error::{Result, SourceErrorKind};
use crate::value::{Table, Value};

use super::{has_extension, read_table, FileReader};

/// Reads `.yaml` and `.yml` files.
///
/// An empty document reads as an empty table. Mapping keys that are numbers
/// or booleans are converted to strings; other non-string keys are dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlReader;

impl FileReader for YamlReader {
    fn try_read(&self, path: &Path, env: &dyn ConfigEnv) -> Option<Result<Table>> {
        if !has_extension(path, &["yaml", "yml"]) {
            return None;
        }
        Some(read_table(path, env, parse_yaml))
    }

    fn name(&self) -> &str {
        "yaml"
    }
}

fn parse_yaml(content: &str) -> std::result::Result<Value, SourceErrorKind> {
    let yaml: serde_yaml::Value =
        serde_yaml::from_str(content).map_err(|e| {
            let (line, column) = e.location().map_or((None, None), |loc| {
                (Some(loc.line() as u32), Some(loc.column() as u32))
            });
            SourceErrorKind::ParseError {
                message: e.to_string(),
                line,
                column,
            }
        })?;

    Ok(match yaml {
        serde_yaml::Value::Null => Value::Table(Table::new()),
        other => yaml_to_value(&other),
    })
}

fn yaml_to_value(yaml: &serde_yaml::Value) -> Value {
    match yaml {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(*b),
        serde_yaml::Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => Value::Integer(i),
            (None, Some(f)) => Value::Float(f),
            (None, None) => Value::String(n.to_string()),
        },
        serde_yaml::Value::String(s) => Value::String(s.clone()),
        serde_yaml::Value::Sequence(items) => {
            Value::Array(items.iter().map(yaml_to_value).collect())
        }
        serde_yaml::Value::Mapping(map) => Value::Table(
            map.iter()
                .filter_map(|(k, v)| {
                    let key = match k {
                        serde_yaml::Value::String(s) => s.clone(),
                        serde_yaml::Value::Number(n) => n.to_string(),
                        serde_yaml::Value::Bool(b) => b.to_string(),
                        _ => return None,
                    };
                    Some((key, yaml_to_value(v)))
                })
                .collect(),
        ),
        serde_yaml::Value::Tagged(tagged) => yaml_to_value(&tagged.value),
    }
}
