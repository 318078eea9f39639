//! Error types for the configtree configuration library.
//!
//! Soft failures (a missing path, a value that does not coerce) never show up
//! here: the `get*` accessors fold them into caller-supplied defaults. Everything
//! in [`ConfigError`] is a hard failure that propagates to the immediate caller.

use std::fmt;

use thiserror::Error;

/// Boxed error produced by providers and other pluggable collaborators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias used throughout the crate.
pub type Result<T, E = ConfigError> = std::result::Result<T, E>;

/// Target type of a typed accessor, reported in coercion failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoerceTarget {
    Int,
    Float,
    Bool,
    String,
    List,
}

impl fmt::Display for CoerceTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CoerceTarget::Int => "int",
            CoerceTarget::Float => "float",
            CoerceTarget::Bool => "bool",
            CoerceTarget::String => "string",
            CoerceTarget::List => "list",
        };
        f.write_str(name)
    }
}

/// Kinds of failures reported by file readers and environment loaders.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceErrorKind {
    /// Source file was not found
    NotFound { path: String },
    /// Source file could not be read
    IoError { message: String },
    /// Source content could not be parsed
    ParseError {
        message: String,
        line: Option<u32>,
        column: Option<u32>,
    },
    /// Content parsed, but not into a table
    NotATable { found: &'static str },
    /// Other source-specific error
    Other { message: String },
}

impl fmt::Display for SourceErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceErrorKind::NotFound { path } => write!(f, "file not found: {}", path),
            SourceErrorKind::IoError { message } => write!(f, "I/O error: {}", message),
            SourceErrorKind::ParseError {
                message,
                line,
                column,
            } => {
                write!(f, "parse error: {}", message)?;
                if let Some(l) = line {
                    write!(f, " at line {}", l)?;
                    if let Some(c) = column {
                        write!(f, ", column {}", c)?;
                    }
                }
                Ok(())
            }
            SourceErrorKind::NotATable { found } => {
                write!(f, "expected a table at the document root, found {}", found)
            }
            SourceErrorKind::Other { message } => write!(f, "{}", message),
        }
    }
}

/// Hard failures raised while loading or reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An `ensure*` accessor found nothing (or null) at the path.
    #[error("required configuration value '{path}' is missing")]
    RequiredValueMissing { path: String },

    /// An `ensure*` typed accessor found a value of the wrong shape.
    #[error("configuration value '{path}' cannot be read as {target} (found {actual})")]
    TypeCoercion {
        path: String,
        target: CoerceTarget,
        actual: &'static str,
    },

    /// Someone tried to write to or delete from a snapshot.
    #[error("configuration is immutable: cannot {operation} '{path}'")]
    Immutable {
        operation: &'static str,
        path: String,
    },

    /// A provider failed or returned something other than a table.
    #[error("provider #{index} ({name}) failed: {source}")]
    Provider {
        index: usize,
        name: String,
        #[source]
        source: BoxError,
    },

    /// A file could not be read or parsed by the reader that accepted it.
    #[error("{source_name}: {kind}")]
    Source {
        source_name: String,
        kind: SourceErrorKind,
    },

    /// A configured cache location could not be read or decoded.
    #[error("cannot load configuration cache '{location}': {message}")]
    CacheDecode { location: String, message: String },

    /// The tree holds something that cannot be written to a cache.
    #[error("cannot cache value at '{path}': {reason}")]
    CacheEncode { path: String, reason: String },

    /// Writing the encoded cache failed.
    #[error("cannot write configuration cache '{location}': {message}")]
    CacheWrite { location: String, message: String },

    /// An environment loader could not read or parse its input.
    #[error("{source_name}: {kind}")]
    EnvironmentLoad {
        source_name: String,
        kind: SourceErrorKind,
    },

    /// One or more required environment variables were not defined.
    #[error("{source_name}: missing required environment variables: {}", keys.join(", "))]
    MissingEnvironment {
        source_name: String,
        keys: Vec<String>,
    },

    /// Deserializing part of the tree into a Rust type failed.
    #[error("cannot deserialize configuration at '{path}': {message}")]
    Deserialize { path: String, message: String },
}

impl ConfigError {
    /// Get the configuration path that this error relates to, if any.
    pub fn path(&self) -> Option<&str> {
        match self {
            ConfigError::RequiredValueMissing { path }
            | ConfigError::TypeCoercion { path, .. }
            | ConfigError::Immutable { path, .. }
            | ConfigError::CacheEncode { path, .. }
            | ConfigError::Deserialize { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Whether this error came from reading configuration rather than loading it.
    pub fn is_access_error(&self) -> bool {
        matches!(
            self,
            ConfigError::RequiredValueMissing { .. }
                | ConfigError::TypeCoercion { .. }
                | ConfigError::Immutable { .. }
        )
    }
}
