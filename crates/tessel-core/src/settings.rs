// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Cache settings, loadable from JSON (`{"patchMode": "atomic", ...}`).
use serde::{Deserialize, Serialize};

use crate::processor::ProcessorKind;

/// How a multi-operation batch behaves when an operation fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PatchMode {
    /// Operations before the failing one stay applied.
    #[default]
    Sequential,
    /// The whole batch is rolled back and no notifications are emitted.
    Atomic,
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CacheSettings {
    /// Processor pipeline, in order.
    pub processors: Vec<ProcessorKind>,
    /// Failure behavior for batches.
    pub patch_mode: PatchMode,
    /// Whether queries fail on missing records instead of returning empty results.
    pub raise_not_found: bool,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            processors: ProcessorKind::DEFAULT_PIPELINE.to_vec(),
            patch_mode: PatchMode::default(),
            raise_not_found: false,
        }
    }
}

impl CacheSettings {
    /// Same settings with `mode` (builder style).
    #[must_use]
    pub fn with_patch_mode(mut self, mode: PatchMode) -> Self {
        self.patch_mode = mode;
        self
    }

    /// Same settings with `raise_not_found` (builder style).
    #[must_use]
    pub fn with_raise_not_found(mut self, raise: bool) -> Self {
        self.raise_not_found = raise;
        self
    }
}
