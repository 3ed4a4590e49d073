// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Forward relationship index: resolved relationship values per record.
use std::collections::BTreeMap;

use crate::container::TypedTable;
use crate::ident::RecordIdentity;
use crate::identity_set::RecordIdentitySet;
use crate::record::{Record, RelationshipData};
use crate::schema::Schema;

/// Resolved value of one relationship.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RelatedSet {
    /// To-one value.
    One(Option<RecordIdentity>),
    /// To-many membership.
    Many(RecordIdentitySet),
}

impl RelatedSet {
    /// Members as an identity set (a to-one value yields zero or one member).
    #[must_use]
    pub fn to_set(&self) -> RecordIdentitySet {
        match self {
            Self::One(value) => value.iter().collect(),
            Self::Many(set) => set.clone(),
        }
    }

    /// Membership test.
    #[must_use]
    pub fn has(&self, identity: &RecordIdentity) -> bool {
        match self {
            Self::One(value) => value.as_ref() == Some(identity),
            Self::Many(set) => set.has(identity),
        }
    }
}

impl From<&RelationshipData> for RelatedSet {
    fn from(data: &RelationshipData) -> Self {
        match data {
            RelationshipData::One(value) => Self::One(value.clone()),
            RelationshipData::Many(ids) => Self::Many(ids.iter().collect()),
        }
    }
}

type Entry = BTreeMap<String, RelatedSet>;

/// Per-record cache of resolved relationship values, kept in step with the container.
#[derive(Clone, Debug, Default)]
pub struct RelationshipIndex {
    entries: TypedTable<Entry>,
}

impl RelationshipIndex {
    /// Empty index with a map per schema model.
    pub fn new(schema: &Schema) -> Self {
        Self {
            entries: TypedTable::for_schema(schema),
        }
    }

    /// Resolved value of `relationship` on `record`, if set.
    pub fn get(&self, record: &RecordIdentity, relationship: &str) -> Option<&RelatedSet> {
        self.entries.get(record)?.get(relationship)
    }

    /// Every resolved relationship of `record`.
    pub fn relationships(&self, record: &RecordIdentity) -> Option<&BTreeMap<String, RelatedSet>> {
        self.entries.get(record)
    }

    /// Rebuilds the whole entry from `record`.
    pub fn record_updated(&mut self, record: &Record) {
        let entry: Entry = record
            .relationships
            .iter()
            .map(|(name, data)| (name.clone(), RelatedSet::from(data)))
            .collect();
        self.entries.set(&record.identity(), entry);
    }

    /// Refreshes one relationship of `record` from its stored value.
    pub fn relationship_updated(&mut self, record: &Record, relationship: &str) {
        let identity = record.identity();
        let mut entry = self.entries.get(&identity).cloned().unwrap_or_default();
        match record.relationship(relationship) {
            Some(data) => {
                entry.insert(relationship.to_owned(), RelatedSet::from(data));
            }
            None => {
                entry.remove(relationship);
            }
        }
        self.entries.set(&identity, entry);
    }

    /// Drops the entry of `record`.
    pub fn clear(&mut self, record: &RecordIdentity) {
        self.entries.remove(record);
    }

    /// Drops every entry.
    pub fn reset(&mut self) {
        self.entries.clear();
    }

    /// Adds maps for new schema types.
    pub fn schema_upgrade(&mut self, schema: &Schema) {
        self.entries.schema_upgrade(schema);
    }

    /// `true` when no map has diverged from `other`.
    pub fn shares_storage_with(&self, other: &Self) -> bool {
        self.entries.shares_storage_with(&other.entries)
    }
}
