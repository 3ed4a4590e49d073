// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Reverse relationship index: for each record, every relationship that targets it.
//!
//! Unlike schema inverses this index covers every relationship value on every
//! record, declared inverse or not, so removals can find all holders.
use serde::{Deserialize, Serialize};

use crate::container::TypedTable;
use crate::ident::RecordIdentity;
use crate::record::Record;
use crate::schema::Schema;

/// One incoming edge: `record.relationship` references the indexed record.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InverseRelationship {
    /// Holder of the reference.
    pub record: RecordIdentity,
    /// Relationship on the holder.
    pub relationship: String,
}

impl InverseRelationship {
    /// Builds an edge descriptor.
    pub fn new(record: RecordIdentity, relationship: impl Into<String>) -> Self {
        Self {
            record,
            relationship: relationship.into(),
        }
    }
}

/// Incoming-edge lists keyed by target identity.
#[derive(Clone, Debug, Default)]
pub struct InverseRelationshipIndex {
    edges: TypedTable<Vec<InverseRelationship>>,
}

impl InverseRelationshipIndex {
    /// Empty index with a map per schema model.
    pub fn new(schema: &Schema) -> Self {
        Self {
            edges: TypedTable::for_schema(schema),
        }
    }

    /// Every edge targeting `target`.
    pub fn all(&self, target: &RecordIdentity) -> &[InverseRelationship] {
        self.edges.get(target).map(Vec::as_slice).unwrap_or_default()
    }

    /// Records `edge` as targeting `target`; duplicates are ignored.
    pub fn add(&mut self, target: &RecordIdentity, edge: InverseRelationship) {
        let mut list = self.edges.get(target).cloned().unwrap_or_default();
        if list.contains(&edge) {
            return;
        }
        list.push(edge);
        self.edges.set(target, list);
    }

    /// Forgets `edge` on `target`.
    pub fn remove(&mut self, target: &RecordIdentity, edge: &InverseRelationship) {
        let Some(list) = self.edges.get(target) else {
            return;
        };
        if !list.contains(edge) {
            return;
        }
        let list: Vec<InverseRelationship> = list.iter().filter(|e| *e != edge).cloned().collect();
        if list.is_empty() {
            self.edges.remove(target);
        } else {
            self.edges.set(target, list);
        }
    }

    /// Indexes every outgoing edge of `record`.
    pub fn record_added(&mut self, record: &Record) {
        let holder = record.identity();
        for (name, data) in &record.relationships {
            for target in data.identities() {
                self.add(target, InverseRelationship::new(holder.clone(), name.clone()));
            }
        }
    }

    /// Unindexes every outgoing edge of `record`.
    pub fn record_removed(&mut self, record: &Record) {
        let holder = record.identity();
        for (name, data) in &record.relationships {
            for target in data.identities() {
                self.remove(target, &InverseRelationship::new(holder.clone(), name.clone()));
            }
        }
    }

    /// Drops every edge targeting `target`.
    pub fn clear(&mut self, target: &RecordIdentity) {
        self.edges.remove(target);
    }

    /// Drops every edge.
    pub fn reset(&mut self) {
        self.edges.clear();
    }

    /// Adds maps for new schema types.
    pub fn schema_upgrade(&mut self, schema: &Schema) {
        self.edges.schema_upgrade(schema);
    }

    /// `true` when no map has diverged from `other`.
    pub fn shares_storage_with(&self, other: &Self) -> bool {
        self.edges.shares_storage_with(&other.edges)
    }
}
