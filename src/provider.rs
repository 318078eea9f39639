//! Configuration providers.
//!
//! A provider produces one tree of configuration values. The builder invokes
//! providers in registration order and merges their trees, later providers
//! overriding earlier ones.
//!
//! # Example
//!
//! ```
//! use configtree::{table, Config, FnProvider, Literal, Value};
//!
//! let config = Config::builder()
//!     .provider(Literal::new(table! { "db" => table! { "host" => "localhost", "port" => 5432 } }))
//!     .provider(Literal::partial().set("db.port", 6543))
//!     .provider(FnProvider::new("computed", || Ok(Value::from_iter([("workers", 4)]))))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.get_int("db.port", 0), 6543);
//! assert_eq!(config.get_int("workers", 0), 4);
//! ```

use serde::Serialize;

use crate::env::ConfigEnv;
use crate::error::{BoxError, ConfigError, Result};
use crate::path::PathKey;
use crate::projection;
use crate::value::{self, Table, Value};

/// A source of configuration values.
///
/// `provide` should return a table; anything else fails the load with a
/// provider error naming this provider's position and name.
pub trait Provider: Send + Sync {
    /// Produce this provider's tree.
    fn provide(&self, env: &dyn ConfigEnv) -> std::result::Result<Value, BoxError>;

    /// Human-readable name for error messages.
    fn name(&self) -> &str;
}

/// A fixed tree, typically the lowest-priority defaults.
#[derive(Debug, Clone, Default)]
pub struct Literal {
    table: Table,
    name: String,
}

impl Literal {
    /// Provide `table` as is.
    pub fn new(table: Table) -> Self {
        Self {
            table,
            name: "literal".to_string(),
        }
    }

    /// Start an empty tree to be filled with [`set`](Self::set).
    pub fn partial() -> Self {
        Self::new(Table::new())
    }

    /// Provide the serialized form of `value`.
    ///
    /// `value` must serialize to a map (a struct or map type).
    pub fn from_serialize<T: Serialize>(value: &T) -> Result<Self> {
        let json = serde_json::to_value(value).map_err(|e| ConfigError::Deserialize {
            path: String::new(),
            message: e.to_string(),
        })?;
        match value::from_json(json) {
            Value::Table(table) => Ok(Self::new(table)),
            other => Err(ConfigError::Deserialize {
                path: String::new(),
                message: format!("expected a map, found {}", other.type_name()),
            }),
        }
    }

    /// Set `value` at `path`, creating intermediate tables.
    ///
    /// Dotted paths are nested; a literal key is stored verbatim.
    pub fn set(mut self, path: impl Into<PathKey>, value: impl Into<Value>) -> Self {
        let key = path.into();
        if !key.as_str().is_empty() {
            projection::insert_at(&mut self.table, &key.segments(), value.into());
        }
        self
    }

    /// Set a custom name for error messages.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl Provider for Literal {
    fn provide(&self, _env: &dyn ConfigEnv) -> std::result::Result<Value, BoxError> {
        Ok(Value::Table(self.table.clone()))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// A provider backed by a closure.
///
/// The closure runs once per load.
pub struct FnProvider<F> {
    f: F,
    name: String,
}

impl<F> FnProvider<F>
where
    F: Fn() -> std::result::Result<Value, BoxError> + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            f,
            name: name.into(),
        }
    }
}

impl<F> std::fmt::Debug for FnProvider<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnProvider")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<F> Provider for FnProvider<F>
where
    F: Fn() -> std::result::Result<Value, BoxError> + Send + Sync,
{
    fn provide(&self, _env: &dyn ConfigEnv) -> std::result::Result<Value, BoxError> {
        (self.f)()
    }

    fn name(&self) -> &str {
        &self.name
    }
}
