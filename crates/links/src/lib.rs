//! Two-way 1:1 link registry.
//!
//! Remembers which auxiliary helper belongs to which actor (and the reverse)
//! so background sweeps can reclaim orphaned helpers and mechanics can reuse
//! an actor's helper instead of spawning a duplicate.

#![warn(missing_docs)]

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use tracing::debug;

/// Bidirectional 1:1 index between keys and values.
///
/// Both directions live behind this type so they cannot drift apart: every
/// key maps to at most one value and every value to at most one key.
#[derive(Debug, Clone)]
pub struct LinkRegistry<K, V> {
    forward: HashMap<K, V>,
    reverse: HashMap<V, K>,
}

impl<K, V> LinkRegistry<K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: Eq + Hash + Clone + Debug,
{
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            forward: HashMap::new(),
            reverse: HashMap::new(),
        }
    }

    /// Link `key` and `value`, evicting any pair that shared either side.
    pub fn link(&mut self, key: K, value: V) {
        if let Some(old_value) = self.forward.remove(&key) {
            self.reverse.remove(&old_value);
        }
        if let Some(old_key) = self.reverse.remove(&value) {
            self.forward.remove(&old_key);
        }
        debug!(?key, ?value, "linked");
        self.forward.insert(key.clone(), value.clone());
        self.reverse.insert(value, key);
    }

    /// Value linked to `key`.
    pub fn lookup_by_key(&self, key: &K) -> Option<&V> {
        self.forward.get(key)
    }

    /// Key linked to `value`.
    pub fn lookup_by_value(&self, value: &V) -> Option<&K> {
        self.reverse.get(value)
    }

    /// Remove the pair containing `key`. Returns the value it was linked to.
    pub fn unlink_by_key(&mut self, key: &K) -> Option<V> {
        let value = self.forward.remove(key)?;
        self.reverse.remove(&value);
        debug!(?key, ?value, "unlinked by key");
        Some(value)
    }

    /// Remove the pair containing `value`. Returns the key it was linked to.
    pub fn unlink_by_value(&mut self, value: &V) -> Option<K> {
        let key = self.reverse.remove(value)?;
        self.forward.remove(&key);
        debug!(?key, ?value, "unlinked by value");
        Some(key)
    }

    /// Number of live pairs.
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    /// Whether no pairs are linked.
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// Iterate over all pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.forward.iter()
    }

    /// Values among `live` that no key links to.
    ///
    /// This is the sweep contract: the caller enumerates every live helper in
    /// the environment and destroys what comes back.
    pub fn orphans<I>(&self, live: I) -> Vec<V>
    where
        I: IntoIterator<Item = V>,
    {
        live.into_iter()
            .filter(|value| !self.reverse.contains_key(value))
            .collect()
    }

    /// Unlink every pair whose key fails `keep`. Returns the removed pairs.
    pub fn retain_keys<F>(&mut self, mut keep: F) -> Vec<(K, V)>
    where
        F: FnMut(&K) -> bool,
    {
        let stale: Vec<K> = self.forward.keys().filter(|key| !keep(key)).cloned().collect();
        stale
            .into_iter()
            .filter_map(|key| {
                let value = self.unlink_by_key(&key)?;
                Some((key, value))
            })
            .collect()
    }
}

impl<K, V> Default for LinkRegistry<K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: Eq + Hash + Clone + Debug,
{
    fn default() -> Self {
        Self::new()
    }
}
