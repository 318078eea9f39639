//! Convenient re-exports for common configtree usage.
//!
//! ```
//! use configtree::prelude::*;
//!
//! let config = Config::new(table! { "port" => "8080" });
//! assert_eq!(config.get_int("port", 0), 8080);
//! ```

// ============================================================================
// Snapshot and builder
// ============================================================================

pub use crate::config::{Config, ConfigBuilder};

/// Build a `Table` from `key => value` pairs.
pub use crate::table;

// ============================================================================
// Values and paths
// ============================================================================

pub use crate::path::{literal, PathKey};
pub use crate::resolve::ResolveFlags;
pub use crate::value::{Deferred, Table, Value};

// ============================================================================
// Providers
// ============================================================================

pub use crate::merge::{MergePolicy, MergeStrategy};
pub use crate::provider::{FnProvider, Literal, Provider};
pub use crate::sources::{FileReader, Files};

// ============================================================================
// Environment and capability
// ============================================================================

pub use crate::capability::{Capability, StaticCapability};
pub use crate::environment::{DotEnv, Environment, EnvironmentLoader, ProcessEnv};

// ============================================================================
// Errors
// ============================================================================

pub use crate::error::{ConfigError, SourceErrorKind};
