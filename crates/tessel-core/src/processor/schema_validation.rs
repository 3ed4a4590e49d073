// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use crate::cache::CacheError;
use crate::ident::RecordIdentity;
use crate::operation::RecordOperation;
use crate::processor::OperationProcessor;
use crate::record::{Record, RelationshipData};
use crate::schema::{RelationshipKind, Schema, SchemaError};
use crate::state::CacheState;

/// Fails operations whose types or relationships the schema does not declare.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaValidationProcessor;

impl OperationProcessor for SchemaValidationProcessor {
    fn name(&self) -> &'static str {
        "schemaValidation"
    }

    fn validate(&self, state: &CacheState, op: &RecordOperation) -> Result<(), CacheError> {
        let schema = &*state.schema;
        schema.model(op.target_kind())?;
        match op {
            RecordOperation::AddRecord { record } | RecordOperation::ReplaceRecord { record } => {
                validate_record(schema, record)?;
            }
            RecordOperation::RemoveRecord { .. }
            | RecordOperation::ReplaceKey { .. }
            | RecordOperation::ReplaceAttribute { .. } => {}
            RecordOperation::AddToRelatedRecords {
                record,
                relationship,
                related_record,
            }
            | RecordOperation::RemoveFromRelatedRecords {
                record,
                relationship,
                related_record,
            } => {
                expect_kind(schema, record, relationship, RelationshipKind::HasMany)?;
                schema.model(&related_record.kind)?;
            }
            RecordOperation::ReplaceRelatedRecords {
                record,
                relationship,
                related_records,
            } => {
                expect_kind(schema, record, relationship, RelationshipKind::HasMany)?;
                for related in related_records {
                    schema.model(&related.kind)?;
                }
            }
            RecordOperation::ReplaceRelatedRecord {
                record,
                relationship,
                related_record,
            } => {
                expect_kind(schema, record, relationship, RelationshipKind::HasOne)?;
                if let Some(related) = related_record {
                    schema.model(&related.kind)?;
                }
            }
        }
        Ok(())
    }
}

fn expect_kind(
    schema: &Schema,
    record: &RecordIdentity,
    relationship: &str,
    expected: RelationshipKind,
) -> Result<(), SchemaError> {
    let definition = schema.relationship(&record.kind, relationship)?;
    if definition.kind == expected {
        Ok(())
    } else {
        Err(SchemaError::CardinalityMismatch {
            model: record.kind.clone(),
            relationship: relationship.to_owned(),
            expected,
        })
    }
}

fn validate_record(schema: &Schema, record: &Record) -> Result<(), SchemaError> {
    for (name, data) in &record.relationships {
        let carried = match data {
            RelationshipData::Many(_) => RelationshipKind::HasMany,
            RelationshipData::One(_) => RelationshipKind::HasOne,
        };
        expect_kind(schema, &record.identity(), name, carried)?;
        for related in data.identities() {
            schema.model(&related.kind)?;
        }
    }
    Ok(())
}
