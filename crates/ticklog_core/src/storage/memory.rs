//! In-process blob store.

use super::{AdapterError, AdapterResult, StorageAdapter};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

/// Map-backed adapter with write accounting and fault injection.
///
/// Hand the store an `Arc<MemoryAdapter>` (or `&MemoryAdapter`) to keep
/// inspecting blobs and write counts while the store owns its handle.
#[derive(Debug, Default)]
pub struct MemoryAdapter {
    inner: Mutex<MemoryInner>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    blobs: HashMap<String, String>,
    write_counts: HashMap<String, usize>,
    failing_keys: HashSet<String>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an adapter pre-seeded with raw blobs.
    pub fn with_blobs<K, V>(blobs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let adapter = Self::new();
        {
            let mut inner = adapter.lock();
            for (key, value) in blobs {
                inner.blobs.insert(key.into(), value.into());
            }
        }
        adapter
    }

    /// Current raw blob under `key`, if any.
    pub fn blob(&self, key: &str) -> Option<String> {
        self.lock().blobs.get(key).cloned()
    }

    /// Number of successful writes to `key` since creation.
    pub fn write_count(&self, key: &str) -> usize {
        self.lock().write_counts.get(key).copied().unwrap_or(0)
    }

    pub fn reset_write_counts(&self) {
        self.lock().write_counts.clear();
    }

    /// Makes subsequent writes to `key` fail until cleared.
    pub fn fail_writes_to(&self, key: &str) {
        self.lock().failing_keys.insert(key.to_string());
    }

    pub fn clear_write_failures(&self) {
        self.lock().failing_keys.clear();
    }

    fn lock(&self) -> MutexGuard<'_, MemoryInner> {
        // A poisoned map is still structurally valid.
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl StorageAdapter for MemoryAdapter {
    async fn get_data(&self, key: &str) -> AdapterResult<String> {
        self.lock()
            .blobs
            .get(key)
            .cloned()
            .ok_or_else(|| AdapterError::KeyNotFound(key.to_string()))
    }

    async fn set_data(&self, key: &str, value: &str) -> AdapterResult<()> {
        let mut inner = self.lock();
        if inner.failing_keys.contains(key) {
            return Err(AdapterError::WriteRejected {
                key: key.to_string(),
                reason: "injected failure".to_string(),
            });
        }
        inner.blobs.insert(key.to_string(), value.to_string());
        *inner.write_counts.entry(key.to_string()).or_insert(0) += 1;
        Ok(())
    }
}

impl<T: StorageAdapter> StorageAdapter for &T {
    async fn get_data(&self, key: &str) -> AdapterResult<String> {
        (**self).get_data(key).await
    }

    async fn set_data(&self, key: &str, value: &str) -> AdapterResult<()> {
        (**self).set_data(key, value).await
    }
}

impl<T: StorageAdapter> StorageAdapter for std::sync::Arc<T> {
    async fn get_data(&self, key: &str) -> AdapterResult<String> {
        (**self).get_data(key).await
    }

    async fn set_data(&self, key: &str, value: &str) -> AdapterResult<()> {
        (**self).set_data(key, value).await
    }
}
