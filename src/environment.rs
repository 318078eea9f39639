//! Environment snapshots and the loaders that produce them.
//!
//! An [`Environment`] is captured once per load (from `.env` files, from the
//! process environment, or from a cache file) and never changes afterwards.
//! It is deliberately a different type from the live process environment;
//! code that really needs a live read uses [`process_var`].

use std::collections::HashSet;
use std::path::PathBuf;

use indexmap::IndexMap;
use stillwater::{NonEmptyVec, Validation};
use tracing::debug;

use crate::env::ConfigEnv;
use crate::error::{ConfigError, Result, SourceErrorKind};

/// Immutable set of environment variables captured at load time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: IndexMap<String, String>,
}

impl Environment {
    /// An empty snapshot.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Get a variable by name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Iterate over variables in load order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Combine two snapshots; variables in `other` win.
    pub fn overlay(&self, other: &Environment) -> Environment {
        let mut vars = self.vars.clone();
        vars.extend(other.vars.iter().map(|(k, v)| (k.clone(), v.clone())));
        Environment { vars }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Environment {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Live read of the process environment.
///
/// This is not part of any snapshot and may change between calls.
pub fn process_var(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Produces an [`Environment`] snapshot.
pub trait EnvironmentLoader: Send + Sync {
    /// Load the variables through `env`.
    fn load(&self, env: &dyn ConfigEnv) -> Result<Environment>;

    /// Human-readable name for error messages.
    fn name(&self) -> &str;
}

/// Check that every key in `required` is present, reporting all that are not.
fn check_required(
    vars: &Environment,
    required: &[String],
    source_name: &str,
) -> Result<()> {
    if required.is_empty() {
        return Ok(());
    }
    let checks: Vec<Validation<(), NonEmptyVec<String>>> = required
        .iter()
        .map(|key| {
            if vars.contains(key) {
                Validation::Success(())
            } else {
                Validation::Failure(NonEmptyVec::singleton(key.clone()))
            }
        })
        .collect();

    match Validation::all_vec(checks) {
        Validation::Success(_) => Ok(()),
        Validation::Failure(missing) => Err(ConfigError::MissingEnvironment {
            source_name: source_name.to_string(),
            keys: missing.into_vec(),
        }),
    }
}

/// Loads `.env` files.
///
/// Files are read in order; later files override earlier ones.
///
/// ```
/// use configtree::env::MockEnv;
/// use configtree::environment::{DotEnv, EnvironmentLoader};
///
/// let env = MockEnv::new().with_file(".env", "DB_HOST=localhost\nDB_PORT=5432\n");
/// let vars = DotEnv::new(".env").require("DB_HOST").load(&env).unwrap();
/// assert_eq!(vars.get("DB_PORT"), Some("5432"));
/// ```
#[derive(Debug, Clone)]
pub struct DotEnv {
    files: Vec<PathBuf>,
    required: Vec<String>,
    optional: bool,
    name: String,
}

impl DotEnv {
    /// Load a single `.env` file (required by default).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::files([path.into()])
    }

    /// Load several files in order.
    pub fn files<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let files: Vec<PathBuf> = paths.into_iter().map(Into::into).collect();
        let name = files
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        Self {
            files,
            required: Vec::new(),
            optional: false,
            name,
        }
    }

    /// Missing files are skipped instead of failing the load.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Fail the load if `key` is not defined by any of the files.
    pub fn require(mut self, key: impl Into<String>) -> Self {
        self.required.push(key.into());
        self
    }

    /// Require several keys at once.
    pub fn require_all(mut self, keys: &[&str]) -> Self {
        self.required.extend(keys.iter().map(|k| k.to_string()));
        self
    }

    fn error(&self, kind: SourceErrorKind) -> ConfigError {
        ConfigError::EnvironmentLoad {
            source_name: self.name.clone(),
            kind,
        }
    }
}

impl EnvironmentLoader for DotEnv {
    fn load(&self, env: &dyn ConfigEnv) -> Result<Environment> {
        let mut vars = IndexMap::new();

        for path in &self.files {
            let content = match env.read_file(path) {
                Ok(content) => content,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound && self.optional => {
                    debug!(path = %path.display(), "optional .env file not found");
                    continue;
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    return Err(self.error(SourceErrorKind::NotFound {
                        path: path.display().to_string(),
                    }));
                }
                Err(e) => {
                    return Err(self.error(SourceErrorKind::IoError {
                        message: e.to_string(),
                    }));
                }
            };

            for item in dotenvy::from_read_iter(content.as_bytes()) {
                let (key, value) = item.map_err(|e| {
                    self.error(SourceErrorKind::ParseError {
                        message: format!("{}: {}", path.display(), e),
                        line: None,
                        column: None,
                    })
                })?;
                vars.insert(key, value);
            }
        }

        let snapshot = Environment { vars };
        check_required(&snapshot, &self.required, &self.name)?;
        debug!(source = %self.name, count = snapshot.len(), "loaded .env variables");
        Ok(snapshot)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Captures process variables sharing a prefix.
///
/// The prefix is kept in the variable names unless [`strip_prefix`](Self::strip_prefix)
/// is set.
#[derive(Debug, Clone)]
pub struct ProcessEnv {
    prefix: String,
    strip_prefix: bool,
    required: Vec<String>,
    excluded: HashSet<String>,
}

impl ProcessEnv {
    /// Capture every variable starting with `prefix`.
    pub fn prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            strip_prefix: false,
            required: Vec::new(),
            excluded: HashSet::new(),
        }
    }

    /// Remove the prefix from captured names.
    pub fn strip_prefix(mut self) -> Self {
        self.strip_prefix = true;
        self
    }

    /// Skip a variable (full name).
    pub fn exclude(mut self, var: impl Into<String>) -> Self {
        self.excluded.insert(var.into());
        self
    }

    /// Fail the load if `key` (as it appears in the snapshot) is missing.
    pub fn require(mut self, key: impl Into<String>) -> Self {
        self.required.push(key.into());
        self
    }
}

impl EnvironmentLoader for ProcessEnv {
    fn load(&self, env: &dyn ConfigEnv) -> Result<Environment> {
        let snapshot: Environment = env
            .vars_with_prefix(&self.prefix)
            .into_iter()
            .filter(|(key, _)| !self.excluded.contains(key))
            .map(|(key, value)| {
                let name = match key.strip_prefix(self.prefix.as_str()) {
                    Some(rest) if self.strip_prefix => rest.to_string(),
                    _ => key,
                };
                (name, value)
            })
            .collect();

        check_required(&snapshot, &self.required, self.name())?;
        Ok(snapshot)
    }

    fn name(&self) -> &str {
        "process environment"
    }
}
