//! Lazy resolution of deferred values and the per-snapshot result cache.
//!
//! A deferred value runs at most once per resolution key per snapshot. The
//! cache lock is only held while looking up the per-key cell, never while the
//! computation runs, so a deferred value may read other paths of the same
//! snapshot. Reading the path that is currently being resolved is a cycle and
//! is not supported.

use std::collections::HashMap;
use std::ops::{BitOr, BitOrAssign};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use crate::path::PathKey;
use crate::value::Value;

/// Controls which deferred values an accessor invokes and whether results
/// are memoized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResolveFlags(u8);

impl ResolveFlags {
    /// Return deferred values as-is.
    pub const INVOKE_NONE: Self = Self(0);
    /// Invoke deferred values found in the tree.
    pub const INVOKE_VALUES: Self = Self(1);
    /// Invoke deferred default values.
    pub const INVOKE_DEFAULTS: Self = Self(1 << 1);
    /// Invoke both.
    pub const INVOKE_ALL: Self = Self(Self::INVOKE_VALUES.0 | Self::INVOKE_DEFAULTS.0);
    /// Skip the cache for this call: always invoke, never store.
    pub const NO_CACHE: Self = Self(1 << 2);

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl Default for ResolveFlags {
    fn default() -> Self {
        Self::INVOKE_ALL
    }
}

impl BitOr for ResolveFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOrAssign for ResolveFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.union(rhs);
    }
}

/// Cache slot for a resolved value.
///
/// Defaults live in their own namespace so a default computed for `"x"` never
/// shadows a tree value cached at `"x"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResolutionKey {
    Value(PathKey),
    Default(PathKey),
}

/// Memoized results of deferred values, owned by one snapshot.
#[derive(Debug, Default)]
pub struct ResolvedCache {
    cells: Mutex<HashMap<ResolutionKey, Arc<OnceLock<Value>>>>,
}

impl ResolvedCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached value for `key`, computing it with `compute` the
    /// first time. Concurrent callers for the same key wait for one result.
    pub fn get_or_resolve<F>(&self, key: ResolutionKey, compute: F) -> Value
    where
        F: FnOnce() -> Value,
    {
        let cell = {
            let mut cells = self.cells.lock();
            Arc::clone(cells.entry(key).or_default())
        };
        cell.get_or_init(compute).clone()
    }

    /// Previously resolved value, if any.
    pub fn cached(&self, key: &ResolutionKey) -> Option<Value> {
        let cell = self.cells.lock().get(key).cloned()?;
        cell.get().cloned()
    }

    /// Number of resolved entries.
    pub fn len(&self) -> usize {
        self.cells
            .lock()
            .values()
            .filter(|cell| cell.get().is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
