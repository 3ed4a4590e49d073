// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! JSON inputs and settings resolution.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use tessel_app_core::config::ConfigService;
use tessel_config_fs::FsConfigStore;
use tessel_core::{Cache, CacheSettings, Record, RecordOperation, Schema};
use tracing::debug;

use crate::cli::CacheArgs;

/// Config store key holding the default [`CacheSettings`].
pub const SETTINGS_KEY: &str = "cache";

pub fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let file =
        File::open(path).with_context(|| format!("failed to open {what} {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("failed to parse {what} {}", path.display()))
}

pub fn read_ops(path: &Path) -> Result<Vec<RecordOperation>> {
    read_json(path, "operations")
}

/// `--settings`, else the config store's `cache` key, else defaults.
pub fn resolve_settings(
    explicit: Option<&Path>,
    config_dir: Option<&Path>,
) -> Result<CacheSettings> {
    if let Some(path) = explicit {
        return read_json(path, "settings");
    }
    let store = match config_dir {
        Some(dir) => FsConfigStore::at(dir)
            .with_context(|| format!("failed to open config dir {}", dir.display()))?,
        None => match FsConfigStore::new() {
            Ok(store) => store,
            Err(err) => {
                debug!(error = %err, "no config dir; using default settings");
                return Ok(CacheSettings::default());
            }
        },
    };
    debug!(dir = %store.base().display(), "loading settings from config store");
    ConfigService::new(store)
        .load_or_default(SETTINGS_KEY)
        .context("failed to load cache settings from config store")
}

/// Builds the cache and applies the seed batch, if any.
pub fn build_cache(args: &CacheArgs, config_dir: Option<&Path>) -> Result<Cache> {
    let schema: Schema = read_json(&args.schema, "schema")?;
    let settings = resolve_settings(args.settings.as_deref(), config_dir)?;
    let mut cache = Cache::with_settings(schema, settings);
    if let Some(path) = &args.seed {
        let records: Vec<Record> = read_json(path, "seed records")?;
        let ops: Vec<RecordOperation> =
            records.into_iter().map(RecordOperation::add_record).collect();
        cache
            .patch(&ops)
            .with_context(|| format!("failed to apply seed records from {}", path.display()))?;
    }
    Ok(cache)
}
