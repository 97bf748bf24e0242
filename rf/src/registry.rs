//! GuardedRegistry - reader/writer-locked key/value store
//!
//! Every access to the map goes through the lock: any number of readers may
//! hold it together, a writer holds it alone. The lock is never held across an
//! `.await`, so the registry is safe to call from async tasks.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{PoisonError, RwLock};

use tracing::debug;

/// Thread-safe key/value store with reader-writer exclusion
///
/// Construct one and pass it by reference (or inside an `Arc`) to the tasks
/// that need it; there is no process-wide instance.
#[derive(Debug)]
pub struct GuardedRegistry<K, V> {
    entries: RwLock<HashMap<K, V>>,
}

impl<K, V> GuardedRegistry<K, V>
where
    K: Eq + Hash + std::fmt::Debug,
    V: Clone,
{
    /// Create an empty registry
    pub fn new() -> Self {
        debug!("GuardedRegistry::new: called");
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Install `value` for `key`, replacing any previous value
    pub fn set(&self, key: K, value: V) {
        debug!(?key, "GuardedRegistry::set: called");
        // The map is only touched by a single insert, so a poisoned lock never
        // guards a half-updated map.
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key, value);
    }

    /// Get the current value for `key`, or `None` if it was never set
    pub fn get(&self, key: &K) -> Option<V> {
        debug!(?key, "GuardedRegistry::get: called");
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).cloned()
    }

    /// Number of keys currently set
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clone the current mapping for reporting
    pub fn snapshot(&self) -> HashMap<K, V>
    where
        K: Clone,
    {
        debug!("GuardedRegistry::snapshot: called");
        self.entries.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl<K, V> Default for GuardedRegistry<K, V> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}
