// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use crate::cache::CacheError;
use crate::ident::RecordIdentity;
use crate::inverse_relationships::InverseRelationship;
use crate::operation::RecordOperation;
use crate::processor::OperationProcessor;
use crate::relationships::RelatedSet;
use crate::state::CacheState;

/// Maintains both relationship indices and scrubs references to removed records.
///
/// The reverse index covers every relationship value on every record, so
/// removals find their holders whether or not the schema declares an inverse.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheIntegrityProcessor;

impl OperationProcessor for CacheIntegrityProcessor {
    fn name(&self) -> &'static str {
        "cacheIntegrity"
    }

    fn after(
        &self,
        state: &mut CacheState,
        op: &RecordOperation,
    ) -> Result<Vec<RecordOperation>, CacheError> {
        match op {
            RecordOperation::RemoveRecord { record } => return Ok(remove_record(state, record)),
            RecordOperation::AddRecord { record } | RecordOperation::ReplaceRecord { record } => {
                if let Some(current) = state.records.get(&record.identity()).cloned() {
                    state.inverse_relationships.record_removed(&current);
                }
            }
            RecordOperation::ReplaceKey { .. }
            | RecordOperation::ReplaceAttribute { .. }
            | RecordOperation::AddToRelatedRecords { .. } => {}
            RecordOperation::RemoveFromRelatedRecords {
                record,
                relationship,
                related_record,
            } => {
                state.inverse_relationships.remove(
                    related_record,
                    &InverseRelationship::new(record.clone(), relationship.clone()),
                );
            }
            RecordOperation::ReplaceRelatedRecords {
                record,
                relationship,
                ..
            }
            | RecordOperation::ReplaceRelatedRecord {
                record,
                relationship,
                ..
            } => unindex_relationship(state, record, relationship),
        }
        Ok(Vec::new())
    }

    fn immediate(&self, state: &mut CacheState, op: &RecordOperation) -> Result<(), CacheError> {
        match op {
            RecordOperation::AddRecord { record } | RecordOperation::ReplaceRecord { record } => {
                if let Some(stored) = state.records.get(&record.identity()).cloned() {
                    state.relationships.record_updated(&stored);
                }
            }
            RecordOperation::RemoveRecord { record } => state.relationships.clear(record),
            RecordOperation::ReplaceKey { .. } | RecordOperation::ReplaceAttribute { .. } => {}
            RecordOperation::AddToRelatedRecords {
                record,
                relationship,
                ..
            }
            | RecordOperation::RemoveFromRelatedRecords {
                record,
                relationship,
                ..
            }
            | RecordOperation::ReplaceRelatedRecords {
                record,
                relationship,
                ..
            }
            | RecordOperation::ReplaceRelatedRecord {
                record,
                relationship,
                ..
            } => {
                if let Some(stored) = state.records.get(record).cloned() {
                    state.relationships.relationship_updated(&stored, relationship);
                }
            }
        }
        Ok(())
    }

    fn finally(
        &self,
        state: &mut CacheState,
        op: &RecordOperation,
    ) -> Result<Vec<RecordOperation>, CacheError> {
        match op {
            RecordOperation::AddRecord { record } | RecordOperation::ReplaceRecord { record } => {
                if let Some(stored) = state.records.get(&record.identity()).cloned() {
                    state.inverse_relationships.record_added(&stored);
                }
            }
            RecordOperation::RemoveRecord { .. }
            | RecordOperation::ReplaceKey { .. }
            | RecordOperation::ReplaceAttribute { .. } => {}
            RecordOperation::AddToRelatedRecords {
                record,
                relationship,
                ..
            }
            | RecordOperation::RemoveFromRelatedRecords {
                record,
                relationship,
                ..
            }
            | RecordOperation::ReplaceRelatedRecords {
                record,
                relationship,
                ..
            }
            | RecordOperation::ReplaceRelatedRecord {
                record,
                relationship,
                ..
            } => index_relationship(state, record, relationship),
        }
        Ok(Vec::new())
    }
}

/// Cleanup for every holder of `removed`, then drops its index entries.
fn remove_record(state: &mut CacheState, removed: &RecordIdentity) -> Vec<RecordOperation> {
    let cleanup = state
        .inverse_relationships
        .all(removed)
        .iter()
        .filter_map(|edge| {
            match state.relationships.get(&edge.record, &edge.relationship)? {
                RelatedSet::Many(_) => Some(RecordOperation::remove_from_related_records(
                    edge.record.clone(),
                    edge.relationship.clone(),
                    removed.clone(),
                )),
                RelatedSet::One(_) => Some(RecordOperation::replace_related_record(
                    edge.record.clone(),
                    edge.relationship.clone(),
                    None,
                )),
            }
        })
        .collect();
    if let Some(record) = state.records.get(removed).cloned() {
        state.inverse_relationships.record_removed(&record);
    }
    state.inverse_relationships.clear(removed);
    cleanup
}

fn unindex_relationship(state: &mut CacheState, record: &RecordIdentity, relationship: &str) {
    let Some(stored) = state.records.get(record).cloned() else {
        return;
    };
    let Some(data) = stored.relationship(relationship) else {
        return;
    };
    let edge = InverseRelationship::new(record.clone(), relationship);
    for target in data.identities() {
        state.inverse_relationships.remove(target, &edge);
    }
}

fn index_relationship(state: &mut CacheState, record: &RecordIdentity, relationship: &str) {
    let Some(stored) = state.records.get(record).cloned() else {
        return;
    };
    let Some(data) = stored.relationship(relationship) else {
        return;
    };
    let edge = InverseRelationship::new(record.clone(), relationship);
    for target in data.identities() {
        state.inverse_relationships.add(target, edge.clone());
    }
}
