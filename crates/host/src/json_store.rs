//! JSON file property store.
//!
//! Properties live in memory and are written to a single pretty-printed JSON
//! object on [`JsonPropertyStore::flush`]. Nothing is written between flushes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use edutools_core::Value;
use tokio::fs;
use tracing::debug;

use crate::store::{PropertyStore, Result};

/// File-backed property store.
#[derive(Debug)]
pub struct JsonPropertyStore {
    path: PathBuf,
    values: BTreeMap<String, Value>,
    dirty: bool,
}

impl JsonPropertyStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let values = match fs::read_to_string(&path).await {
            Ok(json) => serde_json::from_str(&json)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), properties = values.len(), "opened property store");
        Ok(Self {
            path,
            values,
            dirty: false,
        })
    }

    /// File backing this store.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether there are unflushed changes.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Write pending changes.
    pub async fn flush(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let json = serde_json::to_string_pretty(&self.values)?;
        fs::write(&self.path, json.as_bytes()).await?;
        self.dirty = false;
        debug!(path = %self.path.display(), "flushed property store");
        Ok(())
    }
}

impl PropertyStore for JsonPropertyStore {
    fn get_value(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn set_value(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
        self.dirty = true;
    }

    fn remove(&mut self, key: &str) -> Option<Value> {
        let removed = self.values.remove(key);
        if removed.is_some() {
            self.dirty = true;
        }
        removed
    }

    fn keys(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }
}
