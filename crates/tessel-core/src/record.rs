// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Record payload types: records and relationship values.
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ident::RecordIdentity;

const NO_IDENTITIES: &[RecordIdentity] = &[];

/// Value of a single relationship on a record.
///
/// On the wire a to-many value is a JSON array and a to-one value is either an
/// identity object or `null`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelationshipData {
    /// Ordered list of related identities (hasMany).
    Many(Vec<RecordIdentity>),
    /// Single related identity or `None` (hasOne).
    One(Option<RecordIdentity>),
}

impl RelationshipData {
    /// Iterates the identities referenced by this value, in stored order.
    pub fn identities(&self) -> std::slice::Iter<'_, RecordIdentity> {
        match self {
            Self::Many(ids) => ids.iter(),
            Self::One(Some(id)) => std::slice::from_ref(id).iter(),
            Self::One(None) => NO_IDENTITIES.iter(),
        }
    }

    /// Returns `true` when the value references nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Many(ids) => ids.is_empty(),
            Self::One(id) => id.is_none(),
        }
    }

    /// Returns `true` when `identity` is referenced by this value.
    #[must_use]
    pub fn contains(&self, identity: &RecordIdentity) -> bool {
        self.identities().any(|id| id == identity)
    }

    /// An empty value with the same cardinality as `self`.
    #[must_use]
    pub fn empty_like(&self) -> Self {
        match self {
            Self::Many(_) => Self::Many(Vec::new()),
            Self::One(_) => Self::One(None),
        }
    }

    /// Order-independent comparison of the referenced identities.
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        let a: BTreeSet<&RecordIdentity> = self.identities().collect();
        let b: BTreeSet<&RecordIdentity> = other.identities().collect();
        a == b
    }
}

/// A typed entity addressed by `(type, id)`.
///
/// Empty member maps are omitted on the wire, so a bare `{type, id}` stub and a
/// record with empty maps compare equal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Model name as declared in the schema.
    #[serde(rename = "type")]
    pub kind: String,
    /// Record id, unique within `kind`.
    pub id: String,
    /// Alternate keys (e.g. remote ids).
    ///
    /// A `None` value means "unset": merging it removes the key, and stored
    /// records never keep one.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub keys: BTreeMap<String, Option<String>>,
    /// Attribute values.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Value>,
    /// Relationship values keyed by relationship name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub relationships: BTreeMap<String, RelationshipData>,
}

impl Record {
    /// Creates a bare record (a stub) with no members.
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
            keys: BTreeMap::new(),
            attributes: BTreeMap::new(),
            relationships: BTreeMap::new(),
        }
    }

    /// Creates a stub record for `identity`.
    #[must_use]
    pub fn stub(identity: &RecordIdentity) -> Self {
        Self::new(identity.kind.clone(), identity.id.clone())
    }

    /// Identity of this record.
    #[must_use]
    pub fn identity(&self) -> RecordIdentity {
        RecordIdentity::new(self.kind.clone(), self.id.clone())
    }

    /// Sets an attribute (builder style).
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    /// Sets a key (builder style).
    #[must_use]
    pub fn with_key(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.keys.insert(name.into(), Some(value.into()));
        self
    }

    /// Marks a key as unset (builder style); merging the record removes it.
    #[must_use]
    pub fn without_key(mut self, name: impl Into<String>) -> Self {
        self.keys.insert(name.into(), None);
        self
    }

    /// Value of key `name`, if set.
    #[must_use]
    pub fn key(&self, name: &str) -> Option<&str> {
        self.keys.get(name).and_then(Option::as_deref)
    }

    /// Sets a to-one relationship (builder style).
    #[must_use]
    pub fn with_has_one(
        mut self,
        relationship: impl Into<String>,
        related: Option<RecordIdentity>,
    ) -> Self {
        self.relationships
            .insert(relationship.into(), RelationshipData::One(related));
        self
    }

    /// Sets a to-many relationship (builder style).
    #[must_use]
    pub fn with_has_many(
        mut self,
        relationship: impl Into<String>,
        related: Vec<RecordIdentity>,
    ) -> Self {
        self.relationships
            .insert(relationship.into(), RelationshipData::Many(related));
        self
    }

    /// The record as it is stored: unset keys dropped.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let mut record = self.clone();
        record.keys.retain(|_, value| value.is_some());
        record
    }

    /// Returns the stored value of `relationship`, if set.
    #[must_use]
    pub fn relationship(&self, relationship: &str) -> Option<&RelationshipData> {
        self.relationships.get(relationship)
    }

    /// Overlays `replacement` onto `self` member by member.
    ///
    /// Every key, attribute and relationship present in `replacement` wins;
    /// members only present in `self` are kept. An unset key in
    /// `replacement` removes the key.
    #[must_use]
    pub fn merge(&self, replacement: &Self) -> Self {
        let mut merged = self.normalized();
        for (name, value) in &replacement.keys {
            match value {
                Some(value) => merged.keys.insert(name.clone(), Some(value.clone())),
                None => merged.keys.remove(name),
            };
        }
        for (name, value) in &replacement.attributes {
            merged.attributes.insert(name.clone(), value.clone());
        }
        for (name, value) in &replacement.relationships {
            merged.relationships.insert(name.clone(), value.clone());
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use super::*;
    use serde_json::json;

    fn moon(id: &str) -> RecordIdentity {
        RecordIdentity::new("moon", id)
    }

    #[test]
    fn merge_keeps_unmentioned_members() {
        let base = Record::new("planet", "jupiter")
            .with_attribute("name", json!("Jupiter"))
            .with_attribute("classification", json!("gas giant"))
            .with_has_many("moons", vec![moon("io")]);
        let replacement = Record::new("planet", "jupiter").with_attribute("name", json!("Jove"));

        let merged = base.merge(&replacement);
        assert_eq!(merged.attributes["name"], json!("Jove"));
        assert_eq!(merged.attributes["classification"], json!("gas giant"));
        assert_eq!(
            merged.relationship("moons"),
            Some(&RelationshipData::Many(vec![moon("io")]))
        );
    }

    #[test]
    fn unset_keys_are_removed_by_merge() {
        let base = Record::new("planet", "jupiter")
            .with_key("remoteId", "j")
            .with_key("catalog", "J-5");
        let replacement: Record = serde_json::from_value(json!({
            "type": "planet",
            "id": "jupiter",
            "keys": { "remoteId": null, "catalog": "J-V" }
        }))
        .expect("record");
        assert_eq!(
            replacement,
            Record::new("planet", "jupiter")
                .without_key("remoteId")
                .with_key("catalog", "J-V")
        );

        let merged = base.merge(&replacement);
        assert_eq!(merged.key("remoteId"), None);
        assert!(!merged.keys.contains_key("remoteId"));
        assert_eq!(merged.key("catalog"), Some("J-V"));
        assert_eq!(replacement.normalized().keys.len(), 1);
    }

    #[test]
    fn relationship_wire_form_is_untagged() {
        let many: RelationshipData =
            serde_json::from_value(json!([{ "type": "moon", "id": "io" }])).expect("many");
        assert_eq!(many, RelationshipData::Many(vec![moon("io")]));
        let one: RelationshipData =
            serde_json::from_value(json!({ "type": "moon", "id": "io" })).expect("one");
        assert_eq!(one, RelationshipData::One(Some(moon("io"))));
        let none: RelationshipData = serde_json::from_value(json!(null)).expect("null");
        assert_eq!(none, RelationshipData::One(None));
    }

    #[test]
    fn matches_ignores_order() {
        let a = RelationshipData::Many(vec![moon("io"), moon("europa")]);
        let b = RelationshipData::Many(vec![moon("europa"), moon("io")]);
        let c = RelationshipData::Many(vec![moon("io")]);
        assert!(a.matches(&b));
        assert!(!a.matches(&c));
        assert!(RelationshipData::One(None).matches(&RelationshipData::Many(Vec::new())));
    }

    #[test]
    fn stub_equals_deserialized_bare_record() {
        let bare: Record =
            serde_json::from_value(json!({ "type": "planet", "id": "mars" })).expect("record");
        assert_eq!(bare, Record::new("planet", "mars"));
        let wire = serde_json::to_value(&bare).expect("serialize");
        assert_eq!(wire, json!({ "type": "planet", "id": "mars" }));
    }
}
