//! Keyed property store abstraction.

use std::collections::BTreeMap;

use edutools_core::Value;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

/// Error type for property store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur reading or writing properties.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Stored value has a different shape than requested
    #[error("Property {key} has an unexpected type: {source}")]
    TypeMismatch {
        /// Property key
        key: String,
        /// Decode failure
        source: serde_json::Error,
    },
}

/// Keyed persistence for settings, scoped per feature through [`ScopedStore`].
pub trait PropertyStore {
    /// Raw stored value.
    fn get_value(&self, key: &str) -> Option<Value>;

    /// Replace a raw value.
    fn set_value(&mut self, key: &str, value: Value);

    /// Remove a value.
    fn remove(&mut self, key: &str) -> Option<Value>;

    /// All stored keys, sorted.
    fn keys(&self) -> Vec<String>;

    /// Typed read returning `default` when the key is absent or holds a
    /// value of another shape.
    fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> T
    where
        Self: Sized,
    {
        match self.try_get(key) {
            Ok(Some(value)) => value,
            Ok(None) => default,
            Err(error) => {
                warn!(key, %error, "ignoring malformed property");
                default
            }
        }
    }

    /// Typed read that reports shape mismatches.
    fn try_get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>>
    where
        Self: Sized,
    {
        match self.get_value(key) {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|source| StoreError::TypeMismatch {
                    key: key.to_string(),
                    source,
                }),
            None => Ok(None),
        }
    }

    /// Typed write.
    fn set<T: Serialize>(&mut self, key: &str, value: &T) -> Result<()>
    where
        Self: Sized,
    {
        let value = serde_json::to_value(value)?;
        self.set_value(key, value);
        Ok(())
    }
}

/// Property store kept only in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryPropertyStore {
    values: BTreeMap<String, Value>,
}

impl MemoryPropertyStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl PropertyStore for MemoryPropertyStore {
    fn get_value(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn set_value(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
    }

    fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    fn keys(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }
}

/// View of a store with every key prefixed by a feature area.
pub struct ScopedStore<'a, S: PropertyStore + ?Sized> {
    inner: &'a mut S,
    prefix: String,
}

impl<'a, S: PropertyStore + ?Sized> ScopedStore<'a, S> {
    /// Scope `inner` to keys under `area`.
    pub fn new(inner: &'a mut S, area: &str) -> Self {
        Self {
            inner,
            prefix: format!("{area}."),
        }
    }

    fn scoped(&self, key: &str) -> String {
        format!("{}{key}", self.prefix)
    }
}

impl<S: PropertyStore + ?Sized> PropertyStore for ScopedStore<'_, S> {
    fn get_value(&self, key: &str) -> Option<Value> {
        self.inner.get_value(&self.scoped(key))
    }

    fn set_value(&mut self, key: &str, value: Value) {
        let key = self.scoped(key);
        self.inner.set_value(&key, value);
    }

    fn remove(&mut self, key: &str) -> Option<Value> {
        let key = self.scoped(key);
        self.inner.remove(&key)
    }

    fn keys(&self) -> Vec<String> {
        self.inner
            .keys()
            .into_iter()
            .filter_map(|key| key.strip_prefix(&self.prefix).map(str::to_string))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_with_default() {
        let mut store = MemoryPropertyStore::new();
        assert_eq!(store.get("feedback.enabled", true), true);

        store.set("feedback.enabled", &false).unwrap();
        assert_eq!(store.get("feedback.enabled", true), false);
    }

    #[test]
    fn test_type_mismatch() {
        let mut store = MemoryPropertyStore::new();
        store.set_value("timer.seconds", json!("soon"));

        assert_eq!(store.get("timer.seconds", 30u32), 30);
        assert!(matches!(
            store.try_get::<u32>("timer.seconds"),
            Err(StoreError::TypeMismatch { ref key, .. }) if key == "timer.seconds"
        ));
    }

    #[test]
    fn test_scoped_store_prefixes_keys() {
        let mut store = MemoryPropertyStore::new();
        store.set_value("other.flag", json!(1));
        {
            let mut feedback = ScopedStore::new(&mut store, "feedback");
            feedback.set("alex.rating", &4).unwrap();
            assert_eq!(feedback.get("alex.rating", 0), 4);
            assert_eq!(feedback.keys(), vec!["alex.rating".to_string()]);
        }
        assert_eq!(store.get_value("feedback.alex.rating"), Some(json!(4)));

        let mut scoped = ScopedStore::new(&mut store, "feedback");
        assert_eq!(scoped.remove("alex.rating"), Some(json!(4)));
        assert_eq!(store.keys(), vec!["other.flag".to_string()]);
    }
}
