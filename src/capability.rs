//! Service-resolution handle attached to a snapshot.
//!
//! The library never calls a capability itself; it only carries the reference
//! so deferred values can resolve services while they compute.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A resolved service.
pub type Service = Arc<dyn Any + Send + Sync>;

/// Minimal dependency-resolution interface.
pub trait Capability: Send + Sync {
    /// Whether a service is registered under `id`.
    fn has(&self, id: &str) -> bool;

    /// Resolve the service registered under `id`.
    fn resolve(&self, id: &str) -> Option<Service>;
}

impl<'a> dyn Capability + 'a {
    /// Resolve and downcast in one step.
    pub fn resolve_as<T: Any + Send + Sync>(&self, id: &str) -> Option<Arc<T>> {
        self.resolve(id)?.downcast::<T>().ok()
    }
}

/// A fixed map of services, useful for tests and small applications.
#[derive(Default, Clone)]
pub struct StaticCapability {
    services: HashMap<String, Service>,
}

impl StaticCapability {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `service` under `id`.
    pub fn with_service<T: Any + Send + Sync>(mut self, id: impl Into<String>, service: T) -> Self {
        self.services.insert(id.into(), Arc::new(service));
        self
    }
}

impl fmt::Debug for StaticCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<&String> = self.services.keys().collect();
        ids.sort();
        f.debug_struct("StaticCapability")
            .field("services", &ids)
            .finish()
    }
}

impl Capability for StaticCapability {
    fn has(&self, id: &str) -> bool {
        self.services.contains_key(id)
    }

    fn resolve(&self, id: &str) -> Option<Service> {
        self.services.get(id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_capability() {
        let cap = StaticCapability::new().with_service("answer", 42u32);
        assert!(cap.has("answer"));
        assert!(!cap.has("question"));

        let dynamic: &dyn Capability = &cap;
        assert_eq!(dynamic.resolve_as::<u32>("answer").as_deref(), Some(&42));
        assert!(dynamic.resolve_as::<String>("answer").is_none());
        assert!(dynamic.resolve("question").is_none());
    }
}
