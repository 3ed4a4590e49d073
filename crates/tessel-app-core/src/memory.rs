// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! In-process `ConfigStore`, used by tests and by tools that must not touch disk.

use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::config::{ConfigError, ConfigStore};

/// Keeps config blobs in a map guarded by a mutex.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    blobs: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryConfigStore {
    /// Store pre-populated with `(key, blob)` pairs.
    pub fn with_entries<K, B>(entries: impl IntoIterator<Item = (K, B)>) -> Self
    where
        K: Into<String>,
        B: Into<Vec<u8>>,
    {
        Self {
            blobs: Mutex::new(
                entries
                    .into_iter()
                    .map(|(key, blob)| (key.into(), blob.into()))
                    .collect(),
            ),
        }
    }
}

impl ConfigStore for MemoryConfigStore {
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError> {
        let blobs = self
            .blobs
            .lock()
            .map_err(|_| ConfigError::Other("config store lock poisoned".into()))?;
        blobs.get(key).cloned().ok_or(ConfigError::NotFound)
    }

    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError> {
        let mut blobs = self
            .blobs
            .lock()
            .map_err(|_| ConfigError::Other("config store lock poisoned".into()))?;
        blobs.insert(key.to_owned(), data.to_vec());
        Ok(())
    }
}
