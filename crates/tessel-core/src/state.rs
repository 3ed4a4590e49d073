// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Engine state: schema, record container and both relationship indices.
use std::sync::Arc;

use serde_json::Value;

use crate::container::RecordContainer;
use crate::ident::RecordIdentity;
use crate::inverse_relationships::InverseRelationshipIndex;
use crate::record::{Record, RelationshipData};
use crate::relationships::RelationshipIndex;
use crate::schema::Schema;

/// 32-byte BLAKE3 digest.
pub type Digest = [u8; 32];

const DIGEST_HEADER: &[u8] = b"TESSEL_STATE_DIGEST_V1\0";

/// Everything a patch reads or writes.
///
/// Cloning is O(number of types): every table is structurally shared, which is
/// what makes forks and atomic-batch snapshots cheap.
#[derive(Clone, Debug)]
pub struct CacheState {
    /// Schema consulted by processors.
    pub schema: Arc<Schema>,
    /// Normalized records.
    pub records: RecordContainer,
    /// Forward relationship index.
    pub relationships: RelationshipIndex,
    /// Reverse relationship index.
    pub inverse_relationships: InverseRelationshipIndex,
}

impl CacheState {
    /// Empty state for `schema`.
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            records: RecordContainer::new(&schema),
            relationships: RelationshipIndex::new(&schema),
            inverse_relationships: InverseRelationshipIndex::new(&schema),
            schema,
        }
    }

    /// Drops all records and index entries; the schema stays.
    pub fn reset(&mut self) {
        self.records.clear();
        self.relationships.reset();
        self.inverse_relationships.reset();
    }

    /// Installs `schema` and adds tables for its new types.
    pub fn upgrade(&mut self, schema: Arc<Schema>) {
        self.records.schema_upgrade(&schema);
        self.relationships.schema_upgrade(&schema);
        self.inverse_relationships.schema_upgrade(&schema);
        self.schema = schema;
    }

    /// `true` when no table has diverged from `other`.
    pub fn shares_storage_with(&self, other: &Self) -> bool {
        self.records.shares_storage_with(&other.records)
            && self.relationships.shares_storage_with(&other.relationships)
            && self
                .inverse_relationships
                .shares_storage_with(&other.inverse_relationships)
    }

    /// Canonical digest of every record.
    ///
    /// Layout:
    /// 1. Header `b"TESSEL_STATE_DIGEST_V1\0"`
    /// 2. Record count (u64 LE)
    /// 3. Records sorted by type then id: `b"R\0"` + type + id, then keys,
    ///    attributes and relationships, each as a count followed by sorted
    ///    length-prefixed entries
    ///
    /// Unset keys, null attributes, empty to-many and null to-one relationships are
    /// skipped and to-many members are sorted, so states that differ only in
    /// unset-versus-null or list order digest equal.
    #[must_use]
    pub fn state_digest(&self) -> Digest {
        let records = self.records.all();
        let mut hasher = blake3::Hasher::new();
        hasher.update(DIGEST_HEADER);
        hasher.update(&(records.len() as u64).to_le_bytes());
        for record in &records {
            hash_record(&mut hasher, record);
        }
        *hasher.finalize().as_bytes()
    }
}

fn update_str(hasher: &mut blake3::Hasher, s: &str) {
    hasher.update(&(s.len() as u64).to_le_bytes());
    hasher.update(s.as_bytes());
}

fn update_value(hasher: &mut blake3::Hasher, value: &Value) {
    let mut bytes = Vec::new();
    if ciborium::into_writer(value, &mut bytes).is_err() {
        bytes = value.to_string().into_bytes();
    }
    hasher.update(&(bytes.len() as u64).to_le_bytes());
    hasher.update(&bytes);
}

fn hash_record(hasher: &mut blake3::Hasher, record: &Record) {
    hasher.update(b"R\0");
    update_str(hasher, &record.kind);
    update_str(hasher, &record.id);

    let keys: Vec<(&String, &String)> = record
        .keys
        .iter()
        .filter_map(|(name, value)| value.as_ref().map(|value| (name, value)))
        .collect();
    hasher.update(&(keys.len() as u64).to_le_bytes());
    for (name, value) in keys {
        update_str(hasher, name);
        update_str(hasher, value);
    }

    let attributes: Vec<(&String, &Value)> = record
        .attributes
        .iter()
        .filter(|(_, value)| !value.is_null())
        .collect();
    hasher.update(&(attributes.len() as u64).to_le_bytes());
    for (name, value) in attributes {
        update_str(hasher, name);
        update_value(hasher, value);
    }

    let relationships: Vec<(&String, &RelationshipData)> = record
        .relationships
        .iter()
        .filter(|(_, data)| !data.is_empty())
        .collect();
    hasher.update(&(relationships.len() as u64).to_le_bytes());
    for (name, data) in relationships {
        update_str(hasher, name);
        let mut members: Vec<&RecordIdentity> = data.identities().collect();
        members.sort();
        hasher.update(&[u8::from(matches!(data, RelationshipData::Many(_)))]);
        hasher.update(&(members.len() as u64).to_le_bytes());
        for member in members {
            update_str(hasher, &member.kind);
            update_str(hasher, &member.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ModelDefinition;
    use serde_json::json;

    fn state() -> CacheState {
        let schema = Schema::default()
            .with_model("planet", ModelDefinition::default())
            .with_model("moon", ModelDefinition::default());
        CacheState::new(Arc::new(schema))
    }

    #[test]
    fn digest_ignores_null_versus_unset_and_order() {
        let mut a = state();
        let mut b = state();
        let m1 = RecordIdentity::new("moon", "m1");
        let m2 = RecordIdentity::new("moon", "m2");
        a.records.set(
            Record::new("planet", "p1")
                .with_attribute("name", json!("P"))
                .with_has_many("moons", vec![m1.clone(), m2.clone()]),
        );
        b.records.set(
            Record::new("planet", "p1")
                .with_attribute("name", json!("P"))
                .with_attribute("mass", Value::Null)
                .without_key("remoteId")
                .with_has_one("sun", None)
                .with_has_many("moons", vec![m2, m1]),
        );
        assert_eq!(a.state_digest(), b.state_digest());

        b.records.set(Record::new("moon", "m1"));
        assert_ne!(a.state_digest(), b.state_digest());
    }

    #[test]
    fn digest_separates_type_and_id_of_members() {
        let mut a = state();
        let mut b = state();
        a.records.set(
            Record::new("planet", "p1")
                .with_has_many("rings", vec![RecordIdentity::new("ring:inner", "r")]),
        );
        b.records.set(
            Record::new("planet", "p1")
                .with_has_many("rings", vec![RecordIdentity::new("ring", "inner:r")]),
        );
        assert_ne!(a.state_digest(), b.state_digest());
    }

    #[test]
    fn clone_shares_then_diverges() {
        let mut base = state();
        base.records.set(Record::new("planet", "p1"));
        let mut fork = base.clone();
        assert!(fork.shares_storage_with(&base));
        fork.records.set(Record::new("planet", "p2"));
        assert!(!fork.shares_storage_with(&base));
        assert_ne!(fork.state_digest(), base.state_digest());
    }
}
