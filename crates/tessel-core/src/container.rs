// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Per-type tables of persistent maps, and the record container built on them.
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::ident::RecordIdentity;
use crate::persistent::PersistentMap;
use crate::record::Record;
use crate::schema::Schema;

/// `type -> (id -> V)` with structurally shared per-type maps.
///
/// Cloning a table is O(number of types); entries are shared until written.
#[derive(Debug)]
pub struct TypedTable<V> {
    tables: BTreeMap<String, PersistentMap<V>>,
}

impl<V> Clone for TypedTable<V> {
    fn clone(&self) -> Self {
        Self {
            tables: self.tables.clone(),
        }
    }
}

impl<V> Default for TypedTable<V> {
    fn default() -> Self {
        Self {
            tables: BTreeMap::new(),
        }
    }
}

impl<V> TypedTable<V> {
    /// Creates one empty map per model in `schema`.
    pub fn for_schema(schema: &Schema) -> Self {
        let mut table = Self::default();
        table.schema_upgrade(schema);
        table
    }

    /// Adds empty maps for types that are new in `schema`; existing maps are untouched.
    pub fn schema_upgrade(&mut self, schema: &Schema) {
        for kind in schema.models.keys() {
            self.tables.entry(kind.clone()).or_default();
        }
    }

    /// Value stored at `identity`.
    pub fn get(&self, identity: &RecordIdentity) -> Option<&V> {
        self.tables.get(&identity.kind)?.get(&identity.id)
    }

    /// Map for one type, if the type is known.
    pub fn table(&self, kind: &str) -> Option<&PersistentMap<V>> {
        self.tables.get(kind)
    }

    /// Type names with a map, in order.
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Drops every entry while keeping the known types.
    pub fn clear(&mut self) {
        for table in self.tables.values_mut() {
            *table = PersistentMap::new();
        }
    }

    /// `true` when every per-type map shares its root with `other`'s.
    pub fn shares_storage_with(&self, other: &Self) -> bool {
        self.tables.len() == other.tables.len()
            && self
                .tables
                .iter()
                .all(|(kind, table)| other.tables.get(kind).is_some_and(|o| table.ptr_eq(o)))
    }
}

impl<V: Clone> TypedTable<V> {
    /// Stores `value` at `identity`, creating the type's map on demand.
    pub fn set(&mut self, identity: &RecordIdentity, value: V) -> Option<V> {
        self.tables
            .entry(identity.kind.clone())
            .or_default()
            .insert(identity.id.clone(), value)
    }

    /// Removes and returns the value at `identity`.
    pub fn remove(&mut self, identity: &RecordIdentity) -> Option<V> {
        self.tables.get_mut(&identity.kind)?.remove(&identity.id)
    }
}

/// Normalized record storage: one persistent map per record type.
#[derive(Clone, Debug, Default)]
pub struct RecordContainer {
    records: TypedTable<Arc<Record>>,
}

impl RecordContainer {
    /// Empty container with a map per schema model.
    pub fn new(schema: &Schema) -> Self {
        Self {
            records: TypedTable::for_schema(schema),
        }
    }

    /// Record stored at `identity`.
    pub fn get(&self, identity: &RecordIdentity) -> Option<&Arc<Record>> {
        self.records.get(identity)
    }

    /// Stores `record` under its own identity and returns the shared handle.
    pub fn set(&mut self, record: Record) -> Arc<Record> {
        let record = Arc::new(record);
        self.records.set(&record.identity(), Arc::clone(&record));
        record
    }

    /// Removes the record at `identity`.
    pub fn remove(&mut self, identity: &RecordIdentity) -> Option<Arc<Record>> {
        self.records.remove(identity)
    }

    /// All records of `kind`, sorted by id.
    pub fn records(&self, kind: &str) -> Vec<Arc<Record>> {
        let mut out: Vec<Arc<Record>> = self
            .records
            .table(kind)
            .map(|table| table.values().cloned().collect())
            .unwrap_or_default();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out
    }

    /// Every record, sorted by type then id.
    pub fn all(&self) -> Vec<Arc<Record>> {
        self.records
            .kinds()
            .flat_map(|kind| self.records(kind))
            .collect()
    }

    /// Known record types.
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.records.kinds()
    }

    /// Adds maps for new schema types.
    pub fn schema_upgrade(&mut self, schema: &Schema) {
        self.records.schema_upgrade(schema);
    }

    /// Drops every record.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// `true` when no map has diverged from `other`.
    pub fn shares_storage_with(&self, other: &Self) -> bool {
        self.records.shares_storage_with(&other.records)
    }
}
