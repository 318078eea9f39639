//! TOML file reader.

use std::path::Path;

use toml_edit::{ImDocument, Item};

use crate::env::ConfigEnv;
use crate::error::{Result, SourceErrorKind};
use crate::value::{Table, Value};

use super::{has_extension, line_from_offset, read_table, FileReader};

/// Reads `.toml` files.
///
/// Datetimes have no counterpart in the value model and are kept as their
/// TOML string form.
#[derive(Debug, Clone, Copy, Default)]
pub struct TomlReader;

impl FileReader for TomlReader {
    fn try_read(&self, path: &Path, env: &dyn ConfigEnv) -> Option<Result<Table>> {
        if !has_extension(path, &["toml"]) {
            return None;
        }
        Some(read_table(path, env, parse_toml))
    }

    fn name(&self) -> &str {
        "toml"
    }
}

fn parse_toml(content: &str) -> std::result::Result<Value, SourceErrorKind> {
    let document: ImDocument<&str> =
        ImDocument::parse(content).map_err(|e: toml_edit::TomlError| {
            let (line, column) = e
                .span()
                .map(|s| line_from_offset(content, s.start))
                .map_or((None, None), |(l, c)| (Some(l), Some(c)));
            SourceErrorKind::ParseError {
                message: e.message().to_string(),
                line,
                column,
            }
        })?;

    Ok(Value::Table(table_to_value(document.as_table())))
}

fn table_to_value(table: &toml_edit::Table) -> Table {
    table
        .iter()
        .filter_map(|(key, item)| item_to_value(item).map(|v| (key.to_string(), v)))
        .collect()
}

fn item_to_value(item: &Item) -> Option<Value> {
    match item {
        Item::None => None,
        Item::Value(v) => Some(toml_value(v)),
        Item::Table(t) => Some(Value::Table(table_to_value(t))),
        Item::ArrayOfTables(arr) => Some(Value::Array(
            arr.iter().map(|t| Value::Table(table_to_value(t))).collect(),
        )),
    }
}

fn toml_value(value: &toml_edit::Value) -> Value {
    match value {
        toml_edit::Value::String(s) => Value::String(s.value().clone()),
        toml_edit::Value::Integer(i) => Value::Integer(*i.value()),
        toml_edit::Value::Float(f) => Value::Float(*f.value()),
        toml_edit::Value::Boolean(b) => Value::Bool(*b.value()),
        toml_edit::Value::Datetime(dt) => Value::String(dt.value().to_string()),
        toml_edit::Value::Array(arr) => Value::Array(arr.iter().map(toml_value).collect()),
        toml_edit::Value::InlineTable(t) => Value::Table(
            t.iter()
                .map(|(k, v)| (k.to_string(), toml_value(v)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::MockEnv;
    use crate::error::ConfigError;

    fn read(content: &str) -> Result<Table> {
        let env = MockEnv::new().with_file("config.toml", content);
        TomlReader
            .try_read(Path::new("config.toml"), &env)
            .expect("toml reader accepts .toml")
    }

    #[test]
    fn test_declines_other_extensions() {
        let env = MockEnv::new().with_file("config.json", "{}");
        assert!(TomlReader.try_read(Path::new("config.json"), &env).is_none());
    }

    #[test]
    fn test_nested_tables_and_arrays() {
        let table = read(
            r#"
            name = "svc"
            ports = [80, 443]
            started = 1979-05-27T07:32:00Z
            inline = { a = 1.5, b = true }

            [db]
            host = "localhost"
            port = 5432

            [[workers]]
            id = 1

            [[workers]]
            id = 2
            "#,
        )
        .unwrap();

        assert_eq!(table.get("name"), Some(&Value::from("svc")));
        assert_eq!(table.get("ports"), Some(&Value::from(vec![80i64, 443])));
        assert_eq!(table.get("started"), Some(&Value::from("1979-05-27T07:32:00Z")));

        let inline = table.get("inline").and_then(Value::as_table).unwrap();
        assert_eq!(inline.get("a"), Some(&Value::Float(1.5)));
        assert_eq!(inline.get("b"), Some(&Value::Bool(true)));

        let db = table.get("db").and_then(Value::as_table).unwrap();
        assert_eq!(db.get("port"), Some(&Value::Integer(5432)));

        let workers = table.get("workers").and_then(Value::as_array).unwrap();
        assert_eq!(workers.len(), 2);
    }

    #[test]
    fn test_parse_error_has_location() {
        let err = read("a = 1\nb = \n").unwrap_err();
        match err {
            ConfigError::Source {
                kind: SourceErrorKind::ParseError { line, column, .. },
                ..
            } => {
                assert_eq!(line, Some(2));
                assert!(column.is_some());
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
