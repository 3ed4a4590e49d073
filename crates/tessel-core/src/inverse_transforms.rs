// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Inverse transforms: the operation that undoes each kind, computed from pre-mutation state.
//!
//! `None` means the operation would change nothing and is skipped entirely.
use serde_json::Value;

use crate::container::RecordContainer;
use crate::ident::RecordIdentity;
use crate::operation::RecordOperation;
use crate::record::{Record, RelationshipData};

/// Computes the undo operation for `op` against the current `container`.
pub fn inverse(container: &RecordContainer, op: &RecordOperation) -> Option<RecordOperation> {
    match op {
        RecordOperation::AddRecord { record } => match container.get(&record.identity()) {
            None => Some(RecordOperation::remove_record(record.identity())),
            Some(current) if **current == record.normalized() => None,
            Some(current) => Some(RecordOperation::replace_record(restore_over(
                current, record,
            ))),
        },
        RecordOperation::ReplaceRecord { record } => match container.get(&record.identity()) {
            None => Some(RecordOperation::remove_record(record.identity())),
            Some(current) => replaced_members(current, record).map(RecordOperation::replace_record),
        },
        RecordOperation::RemoveRecord { record } => container
            .get(record)
            .map(|current| RecordOperation::replace_record((**current).clone())),
        RecordOperation::ReplaceKey { record, key, value } => {
            let current = container
                .get(record)
                .and_then(|r| r.key(key))
                .map(str::to_owned);
            (current != *value)
                .then(|| RecordOperation::replace_key(record.clone(), key.clone(), current))
        }
        RecordOperation::ReplaceAttribute {
            record,
            attribute,
            value,
        } => {
            let current = container
                .get(record)
                .and_then(|r| r.attributes.get(attribute).cloned())
                .unwrap_or(Value::Null);
            (current != *value).then(|| {
                RecordOperation::replace_attribute(record.clone(), attribute.clone(), current)
            })
        }
        RecordOperation::AddToRelatedRecords {
            record,
            relationship,
            related_record,
        } => (!linked(container, record, relationship, related_record)).then(|| {
            RecordOperation::remove_from_related_records(
                record.clone(),
                relationship.clone(),
                related_record.clone(),
            )
        }),
        RecordOperation::RemoveFromRelatedRecords {
            record,
            relationship,
            related_record,
        } => linked(container, record, relationship, related_record).then(|| {
            RecordOperation::add_to_related_records(
                record.clone(),
                relationship.clone(),
                related_record.clone(),
            )
        }),
        RecordOperation::ReplaceRelatedRecords {
            record,
            relationship,
            related_records,
        } => {
            let current = current_relationship(container, record, relationship);
            let next = RelationshipData::Many(related_records.clone());
            let unchanged = current.map_or(next.is_empty(), |c| c.matches(&next));
            (!unchanged).then(|| {
                let prior = current
                    .map(|c| c.identities().cloned().collect())
                    .unwrap_or_default();
                RecordOperation::replace_related_records(
                    record.clone(),
                    relationship.clone(),
                    prior,
                )
            })
        }
        RecordOperation::ReplaceRelatedRecord {
            record,
            relationship,
            related_record,
        } => {
            let prior = current_relationship(container, record, relationship)
                .and_then(|c| c.identities().next().cloned());
            (prior != *related_record).then(|| {
                RecordOperation::replace_related_record(record.clone(), relationship.clone(), prior)
            })
        }
    }
}

fn current_relationship<'a>(
    container: &'a RecordContainer,
    record: &RecordIdentity,
    relationship: &str,
) -> Option<&'a RelationshipData> {
    container.get(record)?.relationship(relationship)
}

fn linked(
    container: &RecordContainer,
    record: &RecordIdentity,
    relationship: &str,
    related: &RecordIdentity,
) -> bool {
    current_relationship(container, record, relationship).is_some_and(|c| c.contains(related))
}

/// `current`, plus unset markers for members only `next` sets.
fn restore_over(current: &Record, next: &Record) -> Record {
    let mut restore = current.normalized();
    for name in next.keys.keys() {
        restore.keys.entry(name.clone()).or_insert(None);
    }
    for name in next.attributes.keys() {
        restore
            .attributes
            .entry(name.clone())
            .or_insert(Value::Null);
    }
    for (name, data) in &next.relationships {
        restore
            .relationships
            .entry(name.clone())
            .or_insert_with(|| data.empty_like());
    }
    restore
}

/// The members of `current` that `replacement` would change, at their prior values.
///
/// Returns `None` when the merge would leave the record untouched.
fn replaced_members(current: &Record, replacement: &Record) -> Option<Record> {
    let mut restore = Record::stub(&current.identity());
    let mut changed = false;

    for (name, value) in &replacement.keys {
        let prior = current.key(name).map(str::to_owned);
        if prior != *value {
            changed = true;
            restore.keys.insert(name.clone(), prior);
        }
    }

    for (name, value) in &replacement.attributes {
        let prior = current.attributes.get(name).unwrap_or(&Value::Null);
        if prior != value {
            changed = true;
            restore.attributes.insert(name.clone(), prior.clone());
        }
    }

    for (name, data) in &replacement.relationships {
        match current.relationship(name) {
            Some(prior) if prior.matches(data) => {}
            None if data.is_empty() => {}
            Some(prior) => {
                changed = true;
                restore.relationships.insert(name.clone(), prior.clone());
            }
            None => {
                changed = true;
                restore.relationships.insert(name.clone(), data.empty_like());
            }
        }
    }

    changed.then_some(restore)
}
