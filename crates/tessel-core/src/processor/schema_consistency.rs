// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use crate::cache::CacheError;
use crate::ident::RecordIdentity;
use crate::identity_set::RecordIdentitySet;
use crate::operation::RecordOperation;
use crate::processor::OperationProcessor;
use crate::record::Record;
use crate::relationships::RelatedSet;
use crate::schema::{Dependent, RelationshipDefinition};
use crate::state::CacheState;

/// Keeps declared inverse relationships in step and applies dependent cascades.
///
/// Every change to a relationship with a declared `inverse` schedules the
/// mirrored change on the related record. Record-level removals and
/// replacements follow `dependent: "remove"` by removing the related records
/// instead of unlinking them.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaConsistencyProcessor;

impl OperationProcessor for SchemaConsistencyProcessor {
    fn name(&self) -> &'static str {
        "schemaConsistency"
    }

    fn after(
        &self,
        state: &mut CacheState,
        op: &RecordOperation,
    ) -> Result<Vec<RecordOperation>, CacheError> {
        let mut ops = Vec::new();
        let mut linker = Linker { state, ops: &mut ops };
        match op {
            RecordOperation::AddRecord { record } => linker.record_changed(record, true)?,
            RecordOperation::ReplaceRecord { record } => linker.record_changed(record, false)?,
            RecordOperation::RemoveRecord { record } => linker.record_removed(record)?,
            RecordOperation::ReplaceKey { .. } | RecordOperation::ReplaceAttribute { .. } => {}
            RecordOperation::AddToRelatedRecords {
                record,
                relationship,
                related_record,
            } => {
                let definition = linker.definition(record, relationship)?;
                linker.link(record, &definition, related_record)?;
            }
            RecordOperation::RemoveFromRelatedRecords {
                record,
                relationship,
                related_record,
            } => {
                let definition = linker.definition(record, relationship)?;
                linker.unlink(record, &definition, related_record)?;
            }
            RecordOperation::ReplaceRelatedRecords {
                record,
                relationship,
                related_records,
            } => {
                let definition = linker.definition(record, relationship)?;
                let next: RecordIdentitySet = related_records.iter().collect();
                linker.diff(record, relationship, &definition, &next, false)?;
            }
            RecordOperation::ReplaceRelatedRecord {
                record,
                relationship,
                related_record,
            } => {
                let definition = linker.definition(record, relationship)?;
                let current = match linker.state.relationships.get(record, relationship) {
                    Some(RelatedSet::One(current)) => current.clone(),
                    Some(RelatedSet::Many(set)) => set.iter().next().cloned(),
                    None => None,
                };
                if current != *related_record {
                    if let Some(current) = &current {
                        linker.unlink(record, &definition, current)?;
                    }
                    if let Some(next) = related_record {
                        linker.link(record, &definition, next)?;
                    }
                }
            }
        }
        Ok(ops)
    }
}

/// Accumulates the mirrored operations for one primary operation.
struct Linker<'a> {
    state: &'a CacheState,
    ops: &'a mut Vec<RecordOperation>,
}

impl Linker<'_> {
    fn definition(
        &self,
        record: &RecordIdentity,
        relationship: &str,
    ) -> Result<RelationshipDefinition, CacheError> {
        Ok(self
            .state
            .schema
            .relationship(&record.kind, relationship)?
            .clone())
    }

    /// Mirrors `owner -> related` onto the inverse side.
    fn link(
        &mut self,
        owner: &RecordIdentity,
        definition: &RelationshipDefinition,
        related: &RecordIdentity,
    ) -> Result<(), CacheError> {
        let Some(inverse) = &definition.inverse else {
            return Ok(());
        };
        let inverse_definition = self.state.schema.relationship(&related.kind, inverse)?;
        self.ops.push(if inverse_definition.is_many() {
            RecordOperation::add_to_related_records(related.clone(), inverse.clone(), owner.clone())
        } else {
            RecordOperation::replace_related_record(
                related.clone(),
                inverse.clone(),
                Some(owner.clone()),
            )
        });
        Ok(())
    }

    /// Removes `owner` from the inverse side of `related`.
    ///
    /// A to-one inverse is only cleared while it still points at `owner`.
    fn unlink(
        &mut self,
        owner: &RecordIdentity,
        definition: &RelationshipDefinition,
        related: &RecordIdentity,
    ) -> Result<(), CacheError> {
        let Some(inverse) = &definition.inverse else {
            return Ok(());
        };
        let inverse_definition = self.state.schema.relationship(&related.kind, inverse)?;
        if inverse_definition.is_many() {
            self.ops.push(RecordOperation::remove_from_related_records(
                related.clone(),
                inverse.clone(),
                owner.clone(),
            ));
        } else if self
            .state
            .relationships
            .get(related, inverse)
            .is_some_and(|current| current.has(owner))
        {
            self.ops.push(RecordOperation::replace_related_record(
                related.clone(),
                inverse.clone(),
                None,
            ));
        }
        Ok(())
    }

    /// Links added members and unlinks (or cascade-removes) dropped ones.
    fn diff(
        &mut self,
        owner: &RecordIdentity,
        relationship: &str,
        definition: &RelationshipDefinition,
        next: &RecordIdentitySet,
        cascade: bool,
    ) -> Result<(), CacheError> {
        let current = self
            .state
            .relationships
            .get(owner, relationship)
            .map(RelatedSet::to_set)
            .unwrap_or_default();
        for added in next.exclusive_of(&current) {
            self.link(owner, definition, &added)?;
        }
        for removed in current.exclusive_of(next) {
            if cascade && definition.dependent == Some(Dependent::Remove) {
                self.ops.push(RecordOperation::remove_record(removed));
            } else {
                self.unlink(owner, definition, &removed)?;
            }
        }
        Ok(())
    }

    /// Diffs every relationship `record` carries against the stored record.
    ///
    /// With `whole`, relationships the stored record has but `record` omits
    /// count as emptied, since `addRecord` replaces the record outright.
    fn record_changed(mut self, record: &Record, whole: bool) -> Result<(), CacheError> {
        let owner = record.identity();
        let mut names: Vec<String> = record.relationships.keys().cloned().collect();
        if whole {
            if let Some(current) = self.state.relationships.relationships(&owner) {
                names.extend(
                    current
                        .keys()
                        .filter(|name| !record.relationships.contains_key(*name))
                        .cloned(),
                );
            }
        }
        for name in names {
            let definition = self.definition(&owner, &name)?;
            let next: RecordIdentitySet = record
                .relationship(&name)
                .map(|data| data.identities().collect())
                .unwrap_or_default();
            self.diff(&owner, &name, &definition, &next, true)?;
        }
        Ok(())
    }

    /// Unlinks, or cascade-removes, everything the record is related to.
    fn record_removed(mut self, identity: &RecordIdentity) -> Result<(), CacheError> {
        let Some(record) = self.state.records.get(identity).cloned() else {
            return Ok(());
        };
        for (name, data) in &record.relationships {
            let definition = self.definition(identity, name)?;
            for related in data.identities() {
                if definition.dependent == Some(Dependent::Remove) {
                    self.ops.push(RecordOperation::remove_record(related.clone()));
                } else {
                    self.unlink(identity, &definition, related)?;
                }
            }
        }
        Ok(())
    }
}
