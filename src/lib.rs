// Allow large error types - load errors carry paths and boxed causes
#![allow(clippy::result_large_err)]

//! Configtree: one immutable configuration tree aggregated from many providers.
//!
//! Providers (literal tables, configuration files, closures) each produce a
//! tree; the builder merges them in order into a single snapshot that is read
//! through dotted paths with typed, soft-failing accessors.
//!
//! # Core Concepts
//!
//! - **Path keys**: `"db.primary.host"` walks nested tables; [`literal`] marks
//!   a key that contains dots but names one top-level entry
//! - **Merging**: later providers win, with reserved keys (`dependencies`,
//!   `bootstrap`) merged one level deep or concatenated
//! - **Deferred values**: computations stored in the tree, run against the
//!   snapshot on first read and memoized per path
//! - **Projections**: `only` / `except` derive new snapshots without
//!   touching the original
//! - **Cache files**: a loaded tree and its environment can be written out and
//!   used in place of the providers on the next load
//! - **Testable I/O**: every file and environment read goes through
//!   [`ConfigEnv`], with [`MockEnv`] for tests
//!
//! # Quick Start
//!
//! ```
//! use configtree::env::MockEnv;
//! use configtree::prelude::*;
//!
//! let env = MockEnv::new()
//!     .with_file("config/app.json", r#"{"db": {"host": "localhost", "port": "5432"}}"#)
//!     .with_file(".env", "DB_PASSWORD=secret\n");
//!
//! let config = Config::builder()
//!     .environment_loader(DotEnv::new(".env").require("DB_PASSWORD"))
//!     .provider(Literal::partial().set("db.pool", 4))
//!     .provider(Files::dir("config"))
//!     .build_with_env(&env)?;
//!
//! assert_eq!(config.get_int("db.port", 0), 5432);
//! assert_eq!(config.get_int("db.pool", 0), 4);
//! assert_eq!(config.env_var("DB_PASSWORD"), Some("secret"));
//! # Ok::<(), configtree::ConfigError>(())
//! ```
//!
//! # Module Structure
//!
//! - [`config`]: `Config` snapshot and `ConfigBuilder`
//! - [`value`]: `Value`, `Table` and `Deferred`
//! - [`path`]: `PathKey` and tree lookup
//! - [`merge`]: merge strategies and policy
//! - [`coerce`]: conversions behind the typed accessors
//! - [`resolve`]: resolution flags and the resolved-value cache
//! - [`projection`]: `only` / `except` on raw tables
//! - [`cache`]: cache file codec
//! - [`environment`]: `Environment` snapshots and loaders
//! - [`mod@env`]: `ConfigEnv` I/O trait with `RealEnv` and `MockEnv`
//! - [`provider`]: `Provider` trait, `Literal`, `FnProvider`
//! - [`sources`]: `Files` provider and file readers
//! - [`capability`]: service-resolution handle for deferred values
//! - [`error`]: `ConfigError`

pub mod cache;
pub mod capability;
pub mod coerce;
pub mod config;
pub mod env;
pub mod environment;
pub mod error;
pub mod merge;
pub mod path;
pub mod prelude;
pub mod projection;
pub mod provider;
pub mod resolve;
pub mod sources;
pub mod value;

pub use capability::{Capability, StaticCapability};
pub use config::{Config, ConfigBuilder, CACHE_ENABLED_KEY};
pub use env::{ConfigEnv, MockEnv, RealEnv};
pub use environment::{DotEnv, Environment, EnvironmentLoader, ProcessEnv};
pub use error::{ConfigError, Result};
pub use merge::{MergePolicy, MergeStrategy};
pub use path::{literal, PathKey};
pub use provider::{FnProvider, Literal, Provider};
pub use resolve::ResolveFlags;
pub use sources::{FileReader, Files};
pub use value::{Deferred, Table, Value};

#[cfg(feature = "json")]
pub use sources::JsonReader;
#[cfg(feature = "toml")]
pub use sources::TomlReader;
#[cfg(feature = "yaml")]
pub use sources::YamlReader;
