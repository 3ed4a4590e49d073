// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Operation processors: hooks the engine runs around every applied operation.
//!
//! Phases, in the order the engine drives them for one operation:
//!
//! 1. `validate` before anything else; an error aborts the operation.
//! 2. `before` operations are applied ahead of the primary mutation.
//! 3. `after` operations are computed against pre-mutation state and applied
//!    once the mutation, `immediate` hooks and the change notification are done.
//! 4. `immediate` runs right after the mutation (forward-index upkeep).
//! 5. `finally` operations are computed and applied last, once every `after`
//!    cascade has settled.
//!
//! Processors hold no state of their own; everything lives in [`CacheState`],
//! so one processor list can be shared by a cache and all of its forks.
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cache::CacheError;
use crate::operation::RecordOperation;
use crate::state::CacheState;

mod cache_integrity;
mod schema_consistency;
mod schema_validation;

pub use cache_integrity::CacheIntegrityProcessor;
pub use schema_consistency::SchemaConsistencyProcessor;
pub use schema_validation::SchemaValidationProcessor;

/// A participant in the patch pipeline. Every hook defaults to a no-op.
pub trait OperationProcessor: Send + Sync {
    /// Short name used in log output.
    fn name(&self) -> &'static str;

    /// Rejects `op` before any mutation.
    fn validate(&self, _state: &CacheState, _op: &RecordOperation) -> Result<(), CacheError> {
        Ok(())
    }

    /// Operations to apply before `op`.
    fn before(
        &self,
        _state: &mut CacheState,
        _op: &RecordOperation,
    ) -> Result<Vec<RecordOperation>, CacheError> {
        Ok(Vec::new())
    }

    /// Operations computed now and applied after `op` settles.
    fn after(
        &self,
        _state: &mut CacheState,
        _op: &RecordOperation,
    ) -> Result<Vec<RecordOperation>, CacheError> {
        Ok(Vec::new())
    }

    /// Same-tick side effects right after `op` is written.
    fn immediate(&self, _state: &mut CacheState, _op: &RecordOperation) -> Result<(), CacheError> {
        Ok(())
    }

    /// Operations computed and applied once every `after` cascade has settled.
    fn finally(
        &self,
        _state: &mut CacheState,
        _op: &RecordOperation,
    ) -> Result<Vec<RecordOperation>, CacheError> {
        Ok(Vec::new())
    }
}

/// Built-in processors, selectable from settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProcessorKind {
    /// [`SchemaValidationProcessor`].
    SchemaValidation,
    /// [`SchemaConsistencyProcessor`].
    SchemaConsistency,
    /// [`CacheIntegrityProcessor`].
    CacheIntegrity,
}

impl ProcessorKind {
    /// Validation, consistency, integrity: the default pipeline order.
    pub const DEFAULT_PIPELINE: [Self; 3] = [
        Self::SchemaValidation,
        Self::SchemaConsistency,
        Self::CacheIntegrity,
    ];

    /// Instantiates the processor.
    pub fn build(self) -> Arc<dyn OperationProcessor> {
        match self {
            Self::SchemaValidation => Arc::new(SchemaValidationProcessor),
            Self::SchemaConsistency => Arc::new(SchemaConsistencyProcessor),
            Self::CacheIntegrity => Arc::new(CacheIntegrityProcessor),
        }
    }
}

/// Instantiates `kinds` in order.
pub fn build_pipeline(kinds: &[ProcessorKind]) -> Vec<Arc<dyn OperationProcessor>> {
    kinds.iter().map(|kind| kind.build()).collect()
}
