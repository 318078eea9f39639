//! File-backed configuration providers.
//!
//! [`Files`] expands a list of file and directory entries, hands each file to
//! the first [`FileReader`] that accepts it, and merges the per-file trees in
//! order. Readers are matched by extension:
//!
//! - [`JsonReader`] (`.json`, feature `json`)
//! - [`TomlReader`] (`.toml`, feature `toml`)
//! - [`YamlReader`] (`.yaml` / `.yml`, feature `yaml`)

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::env::ConfigEnv;
use crate::error::{BoxError, ConfigError, Result, SourceErrorKind};
use crate::merge::{self, MergePolicy};
use crate::provider::Provider;
use crate::value::{Table, Value};

#[cfg(feature = "json")]
mod json_reader;
#[cfg(feature = "toml")]
mod toml_reader;
#[cfg(feature = "yaml")]
mod yaml_reader;

#[cfg(feature = "json")]
pub use json_reader::JsonReader;
#[cfg(feature = "toml")]
pub use toml_reader::TomlReader;
#[cfg(feature = "yaml")]
pub use yaml_reader::YamlReader;

/// Parses one configuration file into a tree.
pub trait FileReader: Send + Sync {
    /// Read `path`, or return `None` when this reader does not handle it.
    fn try_read(&self, path: &Path, env: &dyn ConfigEnv) -> Option<Result<Table>>;

    /// Human-readable name for logs.
    fn name(&self) -> &str;
}

/// The built-in readers, in the order they are consulted.
pub fn default_readers() -> Vec<Arc<dyn FileReader>> {
    #[allow(unused_mut)]
    let mut readers: Vec<Arc<dyn FileReader>> = Vec::new();
    #[cfg(feature = "json")]
    readers.push(Arc::new(JsonReader));
    #[cfg(feature = "toml")]
    readers.push(Arc::new(TomlReader));
    #[cfg(feature = "yaml")]
    readers.push(Arc::new(YamlReader));
    readers
}

/// Whether `path` ends in one of `extensions` (case-insensitive).
pub(crate) fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}

/// Read `path` through `env` and parse it with `parse`.
///
/// The parsed root must be a table.
pub(crate) fn read_table<F>(path: &Path, env: &dyn ConfigEnv, parse: F) -> Result<Table>
where
    F: FnOnce(&str) -> std::result::Result<Value, SourceErrorKind>,
{
    let source_name = path.display().to_string();
    let error = |kind: SourceErrorKind| ConfigError::Source {
        source_name: source_name.clone(),
        kind,
    };

    let content = env.read_file(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            error(SourceErrorKind::NotFound {
                path: source_name.clone(),
            })
        } else {
            error(SourceErrorKind::IoError {
                message: e.to_string(),
            })
        }
    })?;

    match parse(&content).map_err(error)? {
        Value::Table(table) => Ok(table),
        other => Err(error(SourceErrorKind::NotATable {
            found: other.type_name(),
        })),
    }
}

/// 1-based line and column of a byte offset.
pub(crate) fn line_from_offset(content: &str, offset: usize) -> (u32, u32) {
    let offset = offset.min(content.len());
    let before = content.get(..offset).unwrap_or(content);
    let line = before.matches('\n').count() + 1;
    let column = match before.rfind('\n') {
        Some(newline) => before[newline + 1..].chars().count() + 1,
        None => before.chars().count() + 1,
    };
    (line as u32, column as u32)
}

#[derive(Debug, Clone)]
enum Entry {
    File(PathBuf),
    Dir(PathBuf),
}

/// Provider that loads and merges configuration files.
///
/// Entries are processed in the order they were added. A directory entry
/// contributes every file directly inside it, sorted by path. Files no reader
/// accepts are skipped with a warning. Files are merged with this provider's
/// own [`merge_policy`](Self::merge_policy).
///
/// ```
/// use configtree::env::MockEnv;
/// use configtree::{Config, Files};
///
/// let env = MockEnv::new()
///     .with_file("config/base.json", r#"{"db": {"host": "localhost", "port": 5432}}"#)
///     .with_file("config/local.json", r#"{"db": {"port": 6543}}"#);
///
/// let config = Config::builder()
///     .provider(Files::dir("config"))
///     .build_with_env(&env)
///     .unwrap();
/// assert_eq!(config.get_int("db.port", 0), 6543);
/// assert_eq!(config.get_string("db.host", ""), "localhost");
/// ```
#[derive(Clone)]
pub struct Files {
    entries: Vec<Entry>,
    readers: Vec<Arc<dyn FileReader>>,
    optional: bool,
    policy: MergePolicy,
    name: String,
}

impl Files {
    /// Load the given files in order.
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            entries: paths.into_iter().map(|p| Entry::File(p.into())).collect(),
            readers: default_readers(),
            optional: false,
            policy: MergePolicy::default(),
            name: "files".to_string(),
        }
    }

    /// Load a single file.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::new([path])
    }

    /// Load every file directly inside `dir`.
    pub fn dir(dir: impl Into<PathBuf>) -> Self {
        Self::new(Vec::<PathBuf>::new()).and_dir(dir)
    }

    /// Append another file entry.
    pub fn and_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.entries.push(Entry::File(path.into()));
        self
    }

    /// Append another directory entry.
    pub fn and_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.entries.push(Entry::Dir(dir.into()));
        self
    }

    /// Skip missing files and directories instead of failing.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Consult `reader` after the ones already registered.
    pub fn with_reader<R: FileReader + 'static>(mut self, reader: R) -> Self {
        self.readers.push(Arc::new(reader));
        self
    }

    /// Replace the reader list.
    pub fn readers(mut self, readers: Vec<Arc<dyn FileReader>>) -> Self {
        self.readers = readers;
        self
    }

    /// Merge policy applied between files of this provider.
    ///
    /// Independent of [`ConfigBuilder::merge_policy`](crate::ConfigBuilder::merge_policy),
    /// which only governs how provider results are combined. Defaults to
    /// [`MergePolicy::default`].
    pub fn merge_policy(mut self, policy: MergePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set a custom name for error messages.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    fn not_found(path: &Path) -> ConfigError {
        ConfigError::Source {
            source_name: path.display().to_string(),
            kind: SourceErrorKind::NotFound {
                path: path.display().to_string(),
            },
        }
    }

    /// Expand entries into the concrete list of files to read.
    fn expand(&self, env: &dyn ConfigEnv) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for entry in &self.entries {
            match entry {
                Entry::File(path) => {
                    if env.file_exists(path) {
                        paths.push(path.clone());
                    } else if self.optional {
                        debug!(path = %path.display(), "optional configuration file not found");
                    } else {
                        return Err(Self::not_found(path));
                    }
                }
                Entry::Dir(dir) => {
                    if !env.is_directory(dir) {
                        if self.optional {
                            debug!(dir = %dir.display(), "optional configuration directory not found");
                            continue;
                        }
                        return Err(Self::not_found(dir));
                    }
                    let listed = env.list_dir(dir).map_err(|e| ConfigError::Source {
                        source_name: dir.display().to_string(),
                        kind: SourceErrorKind::IoError {
                            message: e.to_string(),
                        },
                    })?;
                    paths.extend(listed);
                }
            }
        }
        Ok(paths)
    }

    /// Load and merge every file.
    pub fn load(&self, env: &dyn ConfigEnv) -> Result<Table> {
        let mut tree = Table::new();
        for path in self.expand(env)? {
            match self.readers.iter().find_map(|r| r.try_read(&path, env)) {
                Some(parsed) => {
                    let parsed = parsed?;
                    debug!(path = %path.display(), keys = parsed.len(), "configuration file read");
                    tree = merge::merge(tree, parsed, &self.policy);
                }
                None => {
                    warn!(path = %path.display(), "no reader accepts configuration file; skipping");
                }
            }
        }
        Ok(tree)
    }
}

impl fmt::Debug for Files {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let readers: Vec<&str> = self.readers.iter().map(|r| r.name()).collect();
        f.debug_struct("Files")
            .field("name", &self.name)
            .field("entries", &self.entries)
            .field("readers", &readers)
            .field("optional", &self.optional)
            .finish()
    }
}

impl Provider for Files {
    fn provide(&self, env: &dyn ConfigEnv) -> std::result::Result<Value, BoxError> {
        Ok(Value::Table(self.load(env)?))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
