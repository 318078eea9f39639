//! JSON file reader.

use std::path::Path;

use crate::env::ConfigEnv;
use crate::error::{Result, SourceErrorKind};
use crate::value::{self, Table};

use super::{has_extension, read_table, FileReader};

/// Reads `.json` files.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonReader;

impl FileReader for JsonReader {
    fn try_read(&self, path: &Path, env: &dyn ConfigEnv) -> Option<Result<Table>> {
        if !has_extension(path, &["json"]) {
            return None;
        }
        Some(read_table(path, env, parse_json))
    }

    fn name(&self) -> &str {
        "json"
    }
}

fn parse_json(content: &str) -> std::result::Result<value::Value, SourceErrorKind> {
    serde_json::from_str::<serde_json::Value>(content)
        .map(value::from_json)
        .map_err(|e| SourceErrorKind::ParseError {
            message: e.to_string(),
            line: Some(e.line() as u32),
            column: Some(e.column() as u32),
        })
}
