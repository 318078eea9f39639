//! The configuration snapshot and the builder that loads it.
//!
//! This module provides the `Config` type, an immutable tree with typed
//! accessors, and `ConfigBuilder`, which runs the load pipeline:
//!
//! 1. With a cache file configured (and not bypassed), decode it and build the
//!    snapshot from it. Providers are never invoked; a missing or corrupt cache
//!    fails the load.
//! 2. Otherwise run the environment loaders, invoke every provider in order and
//!    merge their trees.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{debug, info, trace};

use crate::cache;
use crate::capability::Capability;
use crate::coerce::{self, FromValue};
use crate::env::{ConfigEnv, RealEnv};
use crate::environment::{Environment, EnvironmentLoader};
use crate::error::{ConfigError, Result};
use crate::merge::{self, MergePolicy};
use crate::path::{self, PathKey};
use crate::projection;
use crate::provider::Provider;
use crate::resolve::{ResolutionKey, ResolveFlags, ResolvedCache};
use crate::value::{self, Table, Value};

/// Top-level key that enables writing the cache in
/// [`ConfigBuilder::build_and_cache`].
pub const CACHE_ENABLED_KEY: &str = "config_cache_enabled";

/// An immutable configuration snapshot.
///
/// Cloning is cheap and the clone shares the tree, the environment, the
/// capability and the resolved-value cache with the original. Projections
/// ([`only`](Self::only), [`except`](Self::except)) produce new snapshots
/// with their own cache.
///
/// # Example
///
/// ```
/// use configtree::{table, Config};
///
/// let config = Config::new(table! {
///     "db" => table! { "host" => "localhost", "port" => "5432" },
/// });
///
/// assert_eq!(config.get_int("db.port", 0), 5432);
/// assert_eq!(config.get_int("db.missing", 111), 111);
/// assert!(config.ensure_value("db.password").is_err());
/// ```
#[derive(Clone)]
pub struct Config {
    data: Arc<Table>,
    environment: Arc<Environment>,
    capability: Option<Arc<dyn Capability>>,
    resolved: Arc<ResolvedCache>,
}

impl Config {
    /// Snapshot over `data` with an empty environment and no capability.
    pub fn new(data: Table) -> Self {
        Self::from_parts(data, Environment::empty(), None)
    }

    pub fn from_parts(
        data: Table,
        environment: Environment,
        capability: Option<Arc<dyn Capability>>,
    ) -> Self {
        Self {
            data: Arc::new(data),
            environment: Arc::new(environment),
            capability,
            resolved: Arc::new(ResolvedCache::new()),
        }
    }

    /// Start building a snapshot from providers.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// New snapshot over `data` sharing this one's environment and capability.
    fn derive(&self, data: Table) -> Self {
        Self {
            data: Arc::new(data),
            environment: Arc::clone(&self.environment),
            capability: self.capability.clone(),
            resolved: Arc::new(ResolvedCache::new()),
        }
    }

    // ---- reads ----

    /// Whether `path` exists (even when it holds null). Never invokes
    /// deferred values.
    pub fn has(&self, path: impl Into<PathKey>) -> bool {
        path::exists(&self.data, &path.into())
    }

    /// The value at `path`, with deferred values resolved.
    pub fn get(&self, path: impl Into<PathKey>) -> Option<Value> {
        self.lookup(&path.into(), ResolveFlags::default())
    }

    /// The value at `path`, or `default` when the path does not exist.
    pub fn get_or(&self, path: impl Into<PathKey>, default: impl Into<Value>) -> Value {
        self.get_with(path, default.into(), ResolveFlags::default())
    }

    /// Full form of [`get`](Self::get).
    ///
    /// A found value is resolved when `flags` contains
    /// [`INVOKE_VALUES`](ResolveFlags::INVOKE_VALUES); a deferred `default` is
    /// resolved when `flags` contains [`INVOKE_DEFAULTS`](ResolveFlags::INVOKE_DEFAULTS).
    /// Results are memoized per path unless [`NO_CACHE`](ResolveFlags::NO_CACHE)
    /// is set.
    pub fn get_with(&self, path: impl Into<PathKey>, default: Value, flags: ResolveFlags) -> Value {
        let key = path.into();
        match self.lookup(&key, flags) {
            Some(value) => value,
            None => self.resolve_deferred(
                &default,
                ResolutionKey::Default(key),
                flags.contains(ResolveFlags::INVOKE_DEFAULTS),
                flags,
            ),
        }
    }

    fn lookup(&self, key: &PathKey, flags: ResolveFlags) -> Option<Value> {
        let (location, raw) = path::locate(&self.data, key)?;
        Some(self.resolve_deferred(
            raw,
            ResolutionKey::Value(location),
            flags.contains(ResolveFlags::INVOKE_VALUES),
            flags,
        ))
    }

    fn resolve_deferred(
        &self,
        value: &Value,
        key: ResolutionKey,
        invoke: bool,
        flags: ResolveFlags,
    ) -> Value {
        let Value::Deferred(deferred) = value else {
            return value.clone();
        };
        if !invoke {
            return value.clone();
        }
        if flags.contains(ResolveFlags::NO_CACHE) {
            trace!(key = ?key, "invoking deferred value (uncached)");
            return deferred.invoke(self);
        }
        self.resolved.get_or_resolve(key.clone(), || {
            trace!(key = ?key, "invoking deferred value");
            deferred.invoke(self)
        })
    }

    /// The value at `path` coerced to `T`, or `default` when the path is
    /// missing, null, or cannot be coerced.
    pub fn get_as<T: FromValue>(&self, path: impl Into<PathKey>, default: T, flags: ResolveFlags) -> T {
        match self.lookup(&path.into(), flags) {
            Some(value) => T::from_value(&value).unwrap_or(default),
            None => default,
        }
    }

    pub fn get_int(&self, path: impl Into<PathKey>, default: i64) -> i64 {
        self.get_as(path, default, ResolveFlags::default())
    }

    pub fn get_float(&self, path: impl Into<PathKey>, default: f64) -> f64 {
        self.get_as(path, default, ResolveFlags::default())
    }

    pub fn get_bool(&self, path: impl Into<PathKey>, default: bool) -> bool {
        self.get_as(path, default, ResolveFlags::default())
    }

    pub fn get_string(&self, path: impl Into<PathKey>, default: impl Into<String>) -> String {
        self.get_as(path, default.into(), ResolveFlags::default())
    }

    /// List at `path`. Comma-separated strings are split.
    pub fn get_array(&self, path: impl Into<PathKey>, default: Vec<Value>) -> Vec<Value> {
        self.get_as(path, default, ResolveFlags::default())
    }

    /// Sub-table at `path`, if there is one.
    pub fn get_table(&self, path: impl Into<PathKey>) -> Option<Table> {
        self.get(path).as_ref().and_then(coerce::to_table)
    }

    // ---- required reads ----

    /// The value at `path`; missing or null is an error.
    pub fn ensure_value(&self, path: impl Into<PathKey>) -> Result<Value> {
        self.ensure_value_with(path, ResolveFlags::default())
    }

    pub fn ensure_value_with(&self, path: impl Into<PathKey>, flags: ResolveFlags) -> Result<Value> {
        let key = path.into();
        match self.lookup(&key, flags) {
            Some(value) if !value.is_null() => Ok(value),
            _ => Err(ConfigError::RequiredValueMissing {
                path: key.to_string(),
            }),
        }
    }

    /// The value at `path` coerced to `T`; missing, null or uncoercible is an
    /// error.
    pub fn ensure_as<T: FromValue>(&self, path: impl Into<PathKey>, flags: ResolveFlags) -> Result<T> {
        let key = path.into();
        let value = self.ensure_value_with(&key, flags)?;
        T::from_value(&value).ok_or_else(|| ConfigError::TypeCoercion {
            path: key.to_string(),
            target: T::TARGET,
            actual: value.type_name(),
        })
    }

    pub fn ensure_int(&self, path: impl Into<PathKey>) -> Result<i64> {
        self.ensure_as(path, ResolveFlags::default())
    }

    pub fn ensure_float(&self, path: impl Into<PathKey>) -> Result<f64> {
        self.ensure_as(path, ResolveFlags::default())
    }

    pub fn ensure_bool(&self, path: impl Into<PathKey>) -> Result<bool> {
        self.ensure_as(path, ResolveFlags::default())
    }

    pub fn ensure_string(&self, path: impl Into<PathKey>) -> Result<String> {
        self.ensure_as(path, ResolveFlags::default())
    }

    pub fn ensure_array(&self, path: impl Into<PathKey>) -> Result<Vec<Value>> {
        self.ensure_as(path, ResolveFlags::default())
    }

    // ---- projections ----

    /// New snapshot holding only the given paths.
    ///
    /// ```
    /// use configtree::{literal, table, Config};
    ///
    /// let config = Config::new(table! {
    ///     "db" => table! { "host" => "localhost", "port" => 5432 },
    ///     "log.level" => "info",
    ///     "debug" => true,
    /// });
    ///
    /// let db_host = config.only(["db.host"]);
    /// assert_eq!(db_host.keys().collect::<Vec<_>>(), vec!["db"]);
    /// assert!(!db_host.has("db.port"));
    ///
    /// let logging = config.only([literal("log.level")]);
    /// assert_eq!(logging.get_string(literal("log.level"), ""), "info");
    /// ```
    pub fn only<I, K>(&self, paths: I) -> Config
    where
        I: IntoIterator<Item = K>,
        K: Into<PathKey>,
    {
        let keys: Vec<PathKey> = paths.into_iter().map(Into::into).collect();
        self.derive(projection::only(&self.data, &keys))
    }

    /// New snapshot without the given paths. Ancestors left empty are removed.
    pub fn except<I, K>(&self, paths: I) -> Config
    where
        I: IntoIterator<Item = K>,
        K: Into<PathKey>,
    {
        let keys: Vec<PathKey> = paths.into_iter().map(Into::into).collect();
        self.derive(projection::except(&self.data, &keys))
    }

    // ---- inspection ----

    /// Number of top-level entries.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Top-level entries in insertion order. Deferred values are not resolved.
    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Value> {
        self.data.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }

    /// Borrow the raw tree.
    pub fn as_table(&self) -> &Table {
        &self.data
    }

    /// Copy of the raw tree. Deferred values are exported as-is.
    pub fn to_table(&self) -> Table {
        self.data.as_ref().clone()
    }

    /// The environment captured when this snapshot was loaded.
    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn env_var(&self, name: &str) -> Option<&str> {
        self.environment.get(name)
    }

    pub fn capability(&self) -> Option<&dyn Capability> {
        self.capability.as_deref()
    }

    // ---- writes ----

    /// Always fails: snapshots are immutable.
    pub fn set(&self, path: impl Into<PathKey>, _value: impl Into<Value>) -> Result<()> {
        Err(ConfigError::Immutable {
            operation: "set",
            path: path.into().to_string(),
        })
    }

    /// Always fails: snapshots are immutable.
    pub fn remove(&self, path: impl Into<PathKey>) -> Result<()> {
        Err(ConfigError::Immutable {
            operation: "remove",
            path: path.into().to_string(),
        })
    }

    // ---- cache ----

    /// Whether the tree enables writing a cache file.
    pub fn cache_enabled(&self) -> bool {
        self.get_bool(CACHE_ENABLED_KEY, false)
    }

    /// Write this snapshot's tree and environment to `path`.
    pub fn write_cache(&self, env: &dyn ConfigEnv, path: impl AsRef<Path>) -> Result<()> {
        cache::store(env, path.as_ref(), &self.data, &self.environment)
    }

    // ---- serde ----

    /// Deserialize the whole tree into `T`.
    ///
    /// Deferred values cannot be deserialized and produce an error.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        Self::deserialize_value(&Value::Table(self.to_table()), "")
    }

    /// Deserialize the value at `path` into `T`.
    pub fn deserialize_at<T: DeserializeOwned>(&self, path: impl Into<PathKey>) -> Result<T> {
        let key = path.into();
        let value = self.ensure_value(&key)?;
        Self::deserialize_value(&value, key.as_str())
    }

    fn deserialize_value<T: DeserializeOwned>(value: &Value, path: &str) -> Result<T> {
        let json = value::to_json(value, path).map_err(|e| ConfigError::Deserialize {
            path: e.path,
            message: e.reason,
        })?;
        serde_json::from_value(json).map_err(|e| ConfigError::Deserialize {
            path: path.to_string(),
            message: e.to_string(),
        })
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("data", &self.data)
            .field("environment", &self.environment.len())
            .field("capability", &self.capability.is_some())
            .field("resolved", &self.resolved.len())
            .finish()
    }
}

impl<'a> IntoIterator for &'a Config {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Builder for loading a [`Config`].
///
/// # Example
///
/// ```
/// use configtree::env::MockEnv;
/// use configtree::{Config, DotEnv, Files};
///
/// let env = MockEnv::new()
///     .with_file("config/app.json", r#"{"db": {"host": "localhost"}}"#)
///     .with_file(".env", "DB_PASSWORD=secret\n");
///
/// let config = Config::builder()
///     .environment_loader(DotEnv::new(".env").require("DB_PASSWORD"))
///     .provider(Files::file("config/app.json"))
///     .build_with_env(&env)
///     .unwrap();
///
/// assert_eq!(config.get_string("db.host", ""), "localhost");
/// assert_eq!(config.env_var("DB_PASSWORD"), Some("secret"));
/// ```
#[derive(Default)]
pub struct ConfigBuilder {
    providers: Vec<Box<dyn Provider>>,
    environment_loaders: Vec<Box<dyn EnvironmentLoader>>,
    cache_file: Option<PathBuf>,
    bypass_cache: bool,
    capability: Option<Arc<dyn Capability>>,
    policy: MergePolicy,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a provider. Later providers override earlier ones.
    pub fn provider<P: Provider + 'static>(mut self, provider: P) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    /// Add an environment loader. Later loaders override earlier ones.
    pub fn environment_loader<L: EnvironmentLoader + 'static>(mut self, loader: L) -> Self {
        self.environment_loaders.push(Box::new(loader));
        self
    }

    /// Load from this cache file instead of the providers.
    pub fn cache_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_file = Some(path.into());
        self
    }

    /// Ignore the cache file for this load and run the providers.
    pub fn bypass_cache(mut self) -> Self {
        self.bypass_cache = true;
        self
    }

    /// Attach a capability to the snapshot.
    pub fn capability<C: Capability + 'static>(self, capability: C) -> Self {
        self.shared_capability(Arc::new(capability))
    }

    /// Attach an already shared capability.
    pub fn shared_capability(mut self, capability: Arc<dyn Capability>) -> Self {
        self.capability = Some(capability);
        self
    }

    /// Replace the merge policy applied between providers.
    ///
    /// A [`Files`](crate::Files) provider merges its own files with
    /// [`Files::merge_policy`](crate::Files::merge_policy).
    pub fn merge_policy(mut self, policy: MergePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Load using the real filesystem and process environment.
    pub fn build(self) -> Result<Config> {
        self.build_with_env(&RealEnv::new())
    }

    /// Load using a custom I/O environment.
    pub fn build_with_env(self, env: &dyn ConfigEnv) -> Result<Config> {
        if let (Some(path), false) = (&self.cache_file, self.bypass_cache) {
            let cached = cache::load(env, path)?;
            debug!(
                path = %path.display(),
                keys = cached.data.len(),
                "configuration loaded from cache; providers skipped"
            );
            let environment = if cached.environment.is_empty() && !self.environment_loaders.is_empty() {
                self.load_environment(env)?
            } else {
                cached.environment
            };
            return Ok(Config::from_parts(cached.data, environment, self.capability));
        }

        if self.cache_file.is_some() {
            debug!("configuration cache bypassed");
        }
        let environment = self.load_environment(env)?;
        let data = self.aggregate(env)?;
        Ok(Config::from_parts(data, environment, self.capability))
    }

    /// Load from the providers and write the cache file when the result
    /// enables it through [`CACHE_ENABLED_KEY`].
    pub fn build_and_cache(self) -> Result<Config> {
        self.build_and_cache_with_env(&RealEnv::new())
    }

    pub fn build_and_cache_with_env(self, env: &dyn ConfigEnv) -> Result<Config> {
        let cache_file = self.cache_file.clone();
        let config = self.bypass_cache().build_with_env(env)?;
        match cache_file {
            Some(path) if config.cache_enabled() => {
                config.write_cache(env, &path)?;
            }
            Some(path) => {
                info!(path = %path.display(), "configuration cache disabled; not written");
            }
            None => {}
        }
        Ok(config)
    }

    fn load_environment(&self, env: &dyn ConfigEnv) -> Result<Environment> {
        let mut environment = Environment::empty();
        for loader in &self.environment_loaders {
            let loaded = loader.load(env)?;
            debug!(loader = loader.name(), variables = loaded.len(), "environment loaded");
            environment = environment.overlay(&loaded);
        }
        Ok(environment)
    }

    fn aggregate(&self, env: &dyn ConfigEnv) -> Result<Table> {
        let mut merged = Table::new();
        for (index, provider) in self.providers.iter().enumerate() {
            let name = provider.name();
            let tree = match provider.provide(env) {
                Ok(Value::Table(tree)) => tree,
                Ok(other) => {
                    return Err(ConfigError::Provider {
                        index,
                        name: name.to_string(),
                        source: format!("expected a table, found {}", other.type_name()).into(),
                    })
                }
                Err(source) => {
                    return Err(ConfigError::Provider {
                        index,
                        name: name.to_string(),
                        source,
                    })
                }
            };
            debug!(index, provider = name, keys = tree.len(), "provider loaded");
            merged = merge::merge(merged, tree, &self.policy);
        }
        Ok(merged)
    }
}

impl fmt::Debug for ConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let providers: Vec<&str> = self.providers.iter().map(|p| p.name()).collect();
        let loaders: Vec<&str> = self.environment_loaders.iter().map(|l| l.name()).collect();
        f.debug_struct("ConfigBuilder")
            .field("providers", &providers)
            .field("environment_loaders", &loaders)
            .field("cache_file", &self.cache_file)
            .field("bypass_cache", &self.bypass_cache)
            .field("capability", &self.capability.is_some())
            .finish()
    }
}
