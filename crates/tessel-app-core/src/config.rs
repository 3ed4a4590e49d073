// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Config service and storage port for Tessel tools.

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Storage port for raw config blobs (keyed by logical name).
pub trait ConfigStore {
    /// Load a raw config blob. Returns `NotFound` when missing.
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError>;
    /// Persist a raw config blob.
    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError>;
}

/// Error type for config operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Key not present in store.
    #[error("not found")]
    NotFound,
    /// I/O error while reading/writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization/deserialization failure.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    /// Catch-all error variant.
    #[error("other: {0}")]
    Other(String),
}

/// Serializes config values as JSON and delegates storage to a `ConfigStore`.
pub struct ConfigService<S> {
    store: S,
}

impl<S> ConfigService<S> {
    /// Create a new service using the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

impl<S> ConfigService<S>
where
    S: ConfigStore,
{
    /// Load and deserialize the value stored under `key`. Returns `Ok(None)` if missing.
    pub fn load<T>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: DeserializeOwned,
    {
        match self.store.load_raw(key) {
            Ok(bytes) => {
                if bytes.is_empty() {
                    return Ok(None);
                }
                let value = serde_json::from_slice(&bytes)?;
                Ok(Some(value))
            }
            Err(ConfigError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Like [`ConfigService::load`], falling back to `T::default()` when missing.
    pub fn load_or_default<T>(&self, key: &str) -> Result<T, ConfigError>
    where
        T: DeserializeOwned + Default,
    {
        Ok(self.load(key)?.unwrap_or_default())
    }

    /// Serialize and persist a value under `key`.
    pub fn save<T>(&self, key: &str, value: &T) -> Result<(), ConfigError>
    where
        T: Serialize,
    {
        let data = serde_json::to_vec_pretty(value)?;
        self.store.save_raw(key, &data)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use super::*;
    use crate::memory::MemoryConfigStore;
    use serde::Deserialize;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    #[serde(default, rename_all = "camelCase")]
    struct Limits {
        max_batch: u32,
        atomic: bool,
    }

    #[test]
    fn round_trips_through_the_store() {
        let service = ConfigService::new(MemoryConfigStore::default());
        let limits = Limits {
            max_batch: 64,
            atomic: true,
        };
        service.save("limits", &limits).expect("save");
        assert_eq!(service.load::<Limits>("limits").expect("load"), Some(limits));
    }

    #[test]
    fn missing_and_empty_blobs_load_as_none() {
        let store = MemoryConfigStore::default();
        store.save_raw("empty", b"").expect("save");
        let service = ConfigService::new(store);
        assert_eq!(service.load::<Limits>("absent").expect("load"), None);
        assert_eq!(service.load::<Limits>("empty").expect("load"), None);
        assert_eq!(
            service.load_or_default::<Limits>("absent").expect("load"),
            Limits::default()
        );
    }

    #[test]
    fn malformed_json_is_a_serde_error() {
        let store = MemoryConfigStore::default();
        store.save_raw("limits", b"{ not json").expect("save");
        let service = ConfigService::new(store);
        assert!(matches!(
            service.load::<Limits>("limits"),
            Err(ConfigError::Serde(_))
        ));
    }
}
