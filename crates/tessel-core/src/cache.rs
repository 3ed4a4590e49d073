// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The patch engine: applies operation batches through the processor pipeline.
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, instrument, trace};

use crate::ident::RecordIdentity;
use crate::inverse_relationships::InverseRelationship;
use crate::inverse_transforms;
use crate::operation::RecordOperation;
use crate::patch_transforms;
use crate::processor::{build_pipeline, OperationProcessor};
use crate::query::{self, QueryExpression, QueryResult};
use crate::record::Record;
use crate::schema::{Schema, SchemaError};
use crate::settings::{CacheSettings, PatchMode};
use crate::state::{CacheState, Digest};

/// Errors produced by [`Cache::patch`] and [`Cache::query`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// An operation or query referenced something the schema does not declare.
    #[error(transparent)]
    Schema(#[from] SchemaError),
    /// A query targeted a missing record while `raiseNotFound` is set.
    #[error("record not found: {0}")]
    RecordNotFound(RecordIdentity),
}

/// Outcome of a successful [`Cache::patch`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PatchResult {
    /// Operations that undo the batch, in replay order.
    pub inverse: Vec<RecordOperation>,
    /// One entry per top-level operation; `None` for no-ops and absent records.
    pub data: Vec<Option<Arc<Record>>>,
}

/// Change notification emitted once per applied operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatchEvent {
    /// The operation as applied.
    pub operation: RecordOperation,
    /// What the patch transform returned.
    pub data: Option<Arc<Record>>,
}

/// Handle returned by [`Cache::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObserverId(u64);

type Observer = Box<dyn FnMut(&PatchEvent) + Send>;

/// Per-call bookkeeping for one `patch` batch.
struct Batch {
    result: PatchResult,
    deferred: Option<Vec<PatchEvent>>,
}

/// Normalized record cache with reversible, relationship-consistent patches.
///
/// The cache owns its [`CacheState`] exclusively; callers serialize access to
/// `patch`. Forks share all storage with their base until either side writes.
pub struct Cache {
    state: CacheState,
    processors: Vec<Arc<dyn OperationProcessor>>,
    settings: CacheSettings,
    observers: BTreeMap<ObserverId, Observer>,
    next_observer_id: u64,
}

impl fmt::Debug for Cache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("schema_version", &self.state.schema.version)
            .field(
                "processors",
                &self.processors.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .field("settings", &self.settings)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl Cache {
    /// Empty cache with default settings.
    pub fn new(schema: Schema) -> Self {
        Self::with_settings(schema, CacheSettings::default())
    }

    /// Empty cache whose pipeline is built from `settings.processors`.
    pub fn with_settings(schema: Schema, settings: CacheSettings) -> Self {
        let processors = build_pipeline(&settings.processors);
        Self::with_processors(schema, settings, processors)
    }

    /// Empty cache with an explicit processor pipeline.
    ///
    /// `settings.processors` is ignored in favor of `processors`.
    pub fn with_processors(
        schema: Schema,
        settings: CacheSettings,
        processors: Vec<Arc<dyn OperationProcessor>>,
    ) -> Self {
        Self {
            state: CacheState::new(Arc::new(schema)),
            processors,
            settings,
            observers: BTreeMap::new(),
            next_observer_id: 0,
        }
    }

    /// Schema in use.
    pub fn schema(&self) -> &Schema {
        &self.state.schema
    }

    /// Active settings.
    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    /// Full engine state (records and both indices).
    pub fn state(&self) -> &CacheState {
        &self.state
    }

    /// A new cache sharing all storage and processors with `self`.
    ///
    /// Observers are not carried over.
    #[instrument(level = "debug", skip(self))]
    pub fn fork(&self) -> Self {
        debug!("forking cache");
        Self {
            state: self.state.clone(),
            processors: self.processors.clone(),
            settings: self.settings.clone(),
            observers: BTreeMap::new(),
            next_observer_id: 0,
        }
    }

    /// Replaces this cache's state with a structural share of `base`'s.
    #[instrument(level = "debug", skip_all)]
    pub fn rebase(&mut self, base: &Self) {
        debug!("rebasing cache");
        self.state = base.state.clone();
    }

    /// Drops every record and index entry; schema and settings stay.
    pub fn reset(&mut self) {
        debug!("resetting cache");
        self.state.reset();
    }

    /// Installs `schema`, adding empty tables for its new types.
    #[instrument(level = "debug", skip_all, fields(version = schema.version))]
    pub fn upgrade(&mut self, schema: Schema) {
        debug!("upgrading schema");
        self.state.upgrade(Arc::new(schema));
    }

    /// Registers `observer` for change notifications.
    pub fn subscribe(&mut self, observer: impl FnMut(&PatchEvent) + Send + 'static) -> ObserverId {
        let id = ObserverId(self.next_observer_id);
        self.next_observer_id += 1;
        self.observers.insert(id, Box::new(observer));
        id
    }

    /// Removes an observer; returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        self.observers.remove(&id).is_some()
    }

    /// Record stored at `identity`.
    pub fn get_record(&self, identity: &RecordIdentity) -> Option<Arc<Record>> {
        self.state.records.get(identity).cloned()
    }

    /// Records of `kind`, sorted by id.
    pub fn records(&self, kind: &str) -> Vec<Arc<Record>> {
        self.state.records.records(kind)
    }

    /// Target of a to-one relationship.
    pub fn related_record(
        &self,
        identity: &RecordIdentity,
        relationship: &str,
    ) -> Option<RecordIdentity> {
        let record = self.state.records.get(identity)?;
        record.relationship(relationship)?.identities().next().cloned()
    }

    /// Members of a to-many relationship, in stored order.
    pub fn related_records(
        &self,
        identity: &RecordIdentity,
        relationship: &str,
    ) -> Vec<RecordIdentity> {
        self.state
            .records
            .get(identity)
            .and_then(|record| record.relationship(relationship))
            .map(|data| data.identities().cloned().collect())
            .unwrap_or_default()
    }

    /// Every relationship that currently references `identity`.
    pub fn inverse_relationships(&self, identity: &RecordIdentity) -> &[InverseRelationship] {
        self.state.inverse_relationships.all(identity)
    }

    /// Canonical digest of every record. See [`CacheState::state_digest`].
    pub fn state_digest(&self) -> Digest {
        self.state.state_digest()
    }

    /// `true` when no storage has diverged from `other`.
    pub fn shares_storage_with(&self, other: &Self) -> bool {
        self.state.shares_storage_with(&other.state)
    }

    /// Evaluates a read-only query.
    #[instrument(level = "debug", skip(self))]
    pub fn query(&self, expression: &QueryExpression) -> Result<QueryResult, CacheError> {
        query::evaluate(&self.state, expression, self.settings.raise_not_found)
    }

    /// Applies `operations` in order.
    ///
    /// Each operation is validated, inverted against the current state,
    /// applied, and followed by its cascades before the next one starts. In
    /// [`PatchMode::Sequential`] an error leaves earlier operations applied
    /// (and already notified); in [`PatchMode::Atomic`] the whole batch is
    /// rolled back and its notifications are dropped.
    #[instrument(skip_all, fields(ops = operations.len(), mode = ?self.settings.patch_mode))]
    pub fn patch(&mut self, operations: &[RecordOperation]) -> Result<PatchResult, CacheError> {
        match self.settings.patch_mode {
            PatchMode::Sequential => {
                let mut batch = Batch {
                    result: PatchResult::default(),
                    deferred: None,
                };
                self.apply_batch(operations, &mut batch)?;
                Ok(batch.result)
            }
            PatchMode::Atomic => {
                let snapshot = self.state.clone();
                let mut batch = Batch {
                    result: PatchResult::default(),
                    deferred: Some(Vec::new()),
                };
                if let Err(err) = self.apply_batch(operations, &mut batch) {
                    debug!(error = %err, "atomic patch failed; rolling back");
                    self.state = snapshot;
                    return Err(err);
                }
                for event in batch.deferred.take().unwrap_or_default() {
                    self.notify(&event);
                }
                Ok(batch.result)
            }
        }
    }

    fn apply_batch(
        &mut self,
        operations: &[RecordOperation],
        batch: &mut Batch,
    ) -> Result<(), CacheError> {
        for op in operations {
            self.apply_operation(op, batch, true)?;
        }
        batch.result.inverse.reverse();
        Ok(())
    }

    fn apply_operation(
        &mut self,
        op: &RecordOperation,
        batch: &mut Batch,
        primary: bool,
    ) -> Result<(), CacheError> {
        for processor in &self.processors {
            processor.validate(&self.state, op)?;
        }

        let Some(inverse) = inverse_transforms::inverse(&self.state.records, op) else {
            debug!(op = op.name(), record = %op.target(), primary, "skipping no-op");
            if primary {
                batch.result.data.push(None);
            }
            return Ok(());
        };
        trace!(op = op.name(), record = %op.target(), primary, "applying operation");
        batch.result.inverse.push(inverse);

        let mut before = Vec::new();
        for processor in &self.processors {
            before.extend(processor.before(&mut self.state, op)?);
        }
        for cascade in &before {
            self.apply_operation(cascade, batch, false)?;
        }

        let mut after = Vec::new();
        for processor in &self.processors {
            after.extend(processor.after(&mut self.state, op)?);
        }

        let data = patch_transforms::apply(&mut self.state.records, op);
        if primary {
            batch.result.data.push(data.clone());
        }

        for processor in &self.processors {
            processor.immediate(&mut self.state, op)?;
        }

        let event = PatchEvent {
            operation: op.clone(),
            data,
        };
        match &mut batch.deferred {
            Some(deferred) => deferred.push(event),
            None => self.notify(&event),
        }

        if !after.is_empty() {
            debug!(op = op.name(), cascades = after.len(), "applying after-phase cascades");
        }
        for cascade in &after {
            self.apply_operation(cascade, batch, false)?;
        }

        let mut finally = Vec::new();
        for processor in &self.processors {
            finally.extend(processor.finally(&mut self.state, op)?);
        }
        for cascade in &finally {
            self.apply_operation(cascade, batch, false)?;
        }
        Ok(())
    }

    fn notify(&mut self, event: &PatchEvent) {
        for observer in self.observers.values_mut() {
            observer(event);
        }
    }
}
