// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Patch transforms: the structural mutation performed by each operation kind.
use std::sync::Arc;

use crate::container::RecordContainer;
use crate::ident::RecordIdentity;
use crate::operation::RecordOperation;
use crate::record::{Record, RelationshipData};

/// Applies `op` to `container` and returns the resulting record.
///
/// `removeRecord` returns the removed record; `removeFromRelatedRecords`
/// returns `None` when the owning record does not exist. Every other kind
/// returns the record as stored after the write. Writes that target a missing
/// record start from a stub `{type, id}`.
pub fn apply(container: &mut RecordContainer, op: &RecordOperation) -> Option<Arc<Record>> {
    match op {
        RecordOperation::AddRecord { record } => Some(container.set(record.normalized())),
        RecordOperation::ReplaceRecord { record } => {
            let merged = match container.get(&record.identity()) {
                Some(current) => current.merge(record),
                None => record.normalized(),
            };
            Some(container.set(merged))
        }
        RecordOperation::RemoveRecord { record } => container.remove(record),
        RecordOperation::ReplaceKey { record, key, value } => {
            let mut next = current_or_stub(container, record);
            match value {
                Some(value) => {
                    next.keys.insert(key.clone(), Some(value.clone()));
                }
                None => {
                    next.keys.remove(key);
                }
            }
            Some(container.set(next))
        }
        RecordOperation::ReplaceAttribute {
            record,
            attribute,
            value,
        } => {
            let mut next = current_or_stub(container, record);
            next.attributes.insert(attribute.clone(), value.clone());
            Some(container.set(next))
        }
        RecordOperation::AddToRelatedRecords {
            record,
            relationship,
            related_record,
        } => {
            let mut next = current_or_stub(container, record);
            update_many(&mut next, relationship, |ids| {
                if !ids.contains(related_record) {
                    ids.push(related_record.clone());
                }
            });
            Some(container.set(next))
        }
        RecordOperation::RemoveFromRelatedRecords {
            record,
            relationship,
            related_record,
        } => {
            let current = container.get(record)?;
            let linked = matches!(
                current.relationship(relationship),
                Some(RelationshipData::Many(ids)) if ids.contains(related_record)
            );
            if !linked {
                return Some(Arc::clone(current));
            }
            let mut next = (**current).clone();
            update_many(&mut next, relationship, |ids| ids.retain(|id| id != related_record));
            Some(container.set(next))
        }
        RecordOperation::ReplaceRelatedRecords {
            record,
            relationship,
            related_records,
        } => {
            let mut next = current_or_stub(container, record);
            next.relationships.insert(
                relationship.clone(),
                RelationshipData::Many(related_records.clone()),
            );
            Some(container.set(next))
        }
        RecordOperation::ReplaceRelatedRecord {
            record,
            relationship,
            related_record,
        } => {
            let mut next = current_or_stub(container, record);
            next.relationships.insert(
                relationship.clone(),
                RelationshipData::One(related_record.clone()),
            );
            Some(container.set(next))
        }
    }
}

fn current_or_stub(container: &RecordContainer, identity: &RecordIdentity) -> Record {
    container
        .get(identity)
        .map_or_else(|| Record::stub(identity), |current| (**current).clone())
}

/// Rewrites the to-many members of `relationship`; a to-one value is promoted.
fn update_many(record: &mut Record, relationship: &str, f: impl FnOnce(&mut Vec<RecordIdentity>)) {
    let mut ids = match record.relationships.remove(relationship) {
        Some(RelationshipData::Many(ids)) => ids,
        Some(RelationshipData::One(value)) => value.into_iter().collect(),
        None => Vec::new(),
    };
    f(&mut ids);
    record
        .relationships
        .insert(relationship.to_owned(), RelationshipData::Many(ids));
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use super::*;
    use crate::schema::{ModelDefinition, Schema};
    use serde_json::json;

    fn container() -> RecordContainer {
        RecordContainer::new(
            &Schema::default()
                .with_model("planet", ModelDefinition::default())
                .with_model("moon", ModelDefinition::default()),
        )
    }

    fn planet(id: &str) -> RecordIdentity {
        RecordIdentity::new("planet", id)
    }

    fn moon(id: &str) -> RecordIdentity {
        RecordIdentity::new("moon", id)
    }

    #[test]
    fn writes_to_missing_records_create_stubs() {
        let mut c = container();
        let out = apply(
            &mut c,
            &RecordOperation::replace_attribute(planet("p1"), "name", json!("Mars")),
        );
        let stored = c.get(&planet("p1")).cloned();
        assert_eq!(out, stored);
        assert_eq!(
            stored.map(|r| r.attributes["name"].clone()),
            Some(json!("Mars"))
        );
    }

    #[test]
    fn replace_record_merges_over_existing() {
        let mut c = container();
        c.set(
            Record::new("planet", "p1")
                .with_attribute("name", json!("Jupiter"))
                .with_key("remoteId", "j"),
        );
        apply(
            &mut c,
            &RecordOperation::replace_record(
                Record::new("planet", "p1").with_attribute("mass", json!(318)),
            ),
        );
        let stored = c.get(&planet("p1")).cloned().expect("stored");
        assert_eq!(stored.attributes["name"], json!("Jupiter"));
        assert_eq!(stored.attributes["mass"], json!(318));
        assert_eq!(stored.key("remoteId"), Some("j"));
    }

    #[test]
    fn remove_from_related_records_on_missing_owner_is_none() {
        let mut c = container();
        let out = apply(
            &mut c,
            &RecordOperation::remove_from_related_records(planet("p1"), "moons", moon("m1")),
        );
        assert!(out.is_none());
        assert!(c.get(&planet("p1")).is_none());
    }

    #[test]
    fn remove_from_related_records_skips_unchanged_write() {
        let mut c = container();
        let stored = c.set(Record::new("planet", "p1").with_has_many("moons", vec![moon("m1")]));
        let out = apply(
            &mut c,
            &RecordOperation::remove_from_related_records(planet("p1"), "moons", moon("m9")),
        );
        assert!(out.is_some_and(|r| Arc::ptr_eq(&r, &stored)));

        apply(
            &mut c,
            &RecordOperation::remove_from_related_records(planet("p1"), "moons", moon("m1")),
        );
        assert_eq!(
            c.get(&planet("p1")).and_then(|r| r.relationship("moons").cloned()),
            Some(RelationshipData::Many(Vec::new()))
        );
    }

    #[test]
    fn add_to_related_records_does_not_duplicate() {
        let mut c = container();
        let op = RecordOperation::add_to_related_records(planet("p1"), "moons", moon("m1"));
        apply(&mut c, &op);
        apply(&mut c, &op);
        assert_eq!(
            c.get(&planet("p1")).and_then(|r| r.relationship("moons").cloned()),
            Some(RelationshipData::Many(vec![moon("m1")]))
        );
    }

    #[test]
    fn replace_key_none_unsets() {
        let mut c = container();
        c.set(Record::new("planet", "p1").with_key("remoteId", "x"));
        apply(
            &mut c,
            &RecordOperation::replace_key(planet("p1"), "remoteId", None),
        );
        assert!(c.get(&planet("p1")).is_some_and(|r| r.keys.is_empty()));
    }

    #[test]
    fn stored_records_never_keep_unset_keys() {
        let mut c = container();
        let added = apply(
            &mut c,
            &RecordOperation::add_record(
                Record::new("planet", "p1")
                    .with_key("remoteId", "x")
                    .without_key("catalog"),
            ),
        );
        assert!(added.is_some_and(|r| r.keys.len() == 1));

        apply(
            &mut c,
            &RecordOperation::replace_record(Record::new("planet", "p1").without_key("remoteId")),
        );
        assert!(c.get(&planet("p1")).is_some_and(|r| r.keys.is_empty()));
    }

    #[test]
    fn remove_record_returns_removed() {
        let mut c = container();
        c.set(Record::new("moon", "m1"));
        let out = apply(&mut c, &RecordOperation::remove_record(moon("m1")));
        assert_eq!(out.map(|r| r.identity()), Some(moon("m1")));
        assert!(apply(&mut c, &RecordOperation::remove_record(moon("m1"))).is_none());
    }
}
