// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{json, Value};
use tessel_core::{
    Cache, InverseRelationship, ModelDefinition, PatchResult, Record, RecordIdentity,
    RecordOperation, RelationshipDefinition, Schema,
};

// =============================================================================
// SOLAR SYSTEM FIXTURE
// =============================================================================

/// `planet.moons` (hasMany, dependent remove) <-> `moon.planet` (hasOne), and
/// `star.planets` (hasMany) <-> `planet.sun` (hasOne).
pub fn solar_schema() -> Schema {
    Schema::default()
        .with_model(
            "planet",
            ModelDefinition::default()
                .attribute("name")
                .attribute("classification")
                .key("remoteId")
                .relationship(
                    "moons",
                    RelationshipDefinition::has_many("moon")
                        .with_inverse("planet")
                        .dependent_remove(),
                )
                .relationship(
                    "sun",
                    RelationshipDefinition::has_one("star").with_inverse("planets"),
                ),
        )
        .with_model(
            "moon",
            ModelDefinition::default().attribute("name").relationship(
                "planet",
                RelationshipDefinition::has_one("planet").with_inverse("moons"),
            ),
        )
        .with_model(
            "star",
            ModelDefinition::default().attribute("name").relationship(
                "planets",
                RelationshipDefinition::has_many("planet").with_inverse("sun"),
            ),
        )
}

/// `task.children` (hasMany, dependent remove) <-> `task.parents` (hasMany).
pub fn task_schema() -> Schema {
    Schema::default().with_model(
        "task",
        ModelDefinition::default()
            .attribute("title")
            .relationship(
                "children",
                RelationshipDefinition::has_many("task")
                    .with_inverse("parents")
                    .dependent_remove(),
            )
            .relationship(
                "parents",
                RelationshipDefinition::has_many("task").with_inverse("children"),
            ),
    )
}

pub fn planet(id: &str) -> RecordIdentity {
    RecordIdentity::new("planet", id)
}

pub fn moon(id: &str) -> RecordIdentity {
    RecordIdentity::new("moon", id)
}

pub fn star(id: &str) -> RecordIdentity {
    RecordIdentity::new("star", id)
}

pub fn task(id: &str) -> RecordIdentity {
    RecordIdentity::new("task", id)
}

/// A named record with no relationships.
pub fn named(identity: &RecordIdentity) -> Record {
    Record::stub(identity).with_attribute("name", json!(identity.id.to_uppercase()))
}

/// Applies `records` as an `addRecord` batch.
pub fn seed(cache: &mut Cache, records: impl IntoIterator<Item = Record>) -> PatchResult {
    let ops: Vec<RecordOperation> = records.into_iter().map(RecordOperation::add_record).collect();
    cache.patch(&ops).expect("seed batch applies")
}

/// Solar cache seeded with `planets` and `moons`, all named, unlinked.
pub fn solar_cache(planets: &[&str], moons: &[&str]) -> Cache {
    let mut cache = Cache::new(solar_schema());
    seed(
        &mut cache,
        planets
            .iter()
            .map(|id| named(&planet(id)))
            .chain(moons.iter().map(|id| named(&moon(id)))),
    );
    cache
}

/// Member identities of a relationship, sorted.
pub fn members(cache: &Cache, owner: &RecordIdentity, relationship: &str) -> Vec<RecordIdentity> {
    let mut out = cache.related_records(owner, relationship);
    out.sort();
    out
}

/// Applies `result.inverse` and returns its own result.
pub fn replay_inverse(cache: &mut Cache, result: &PatchResult) -> PatchResult {
    cache.patch(&result.inverse).expect("inverse replays")
}

// =============================================================================
// INVARIANT CHECKERS
// =============================================================================

/// Declared-inverse pairs that do not mirror each other.
pub fn bidirectional_violations(cache: &Cache) -> Vec<String> {
    let schema = cache.schema().clone();
    let mut violations = Vec::new();
    for (kind, model) in &schema.models {
        for record in cache.records(kind) {
            for (name, data) in &record.relationships {
                let Some(inverse) = model
                    .relationships
                    .get(name)
                    .and_then(|definition| definition.inverse.as_ref())
                else {
                    continue;
                };
                for related in data.identities() {
                    let mirrored = cache
                        .get_record(related)
                        .and_then(|r| r.relationship(inverse).cloned())
                        .is_some_and(|d| d.contains(&record.identity()));
                    if !mirrored {
                        violations.push(format!(
                            "{}.{name} -> {related} but {related}.{inverse} does not point back",
                            record.identity()
                        ));
                    }
                }
            }
        }
    }
    violations
}

/// Disagreements between stored relationships and the reverse index.
pub fn reverse_index_violations(cache: &Cache) -> Vec<String> {
    let kinds: Vec<String> = cache.schema().models.keys().cloned().collect();
    let mut violations = Vec::new();
    for kind in &kinds {
        for record in cache.records(kind) {
            let holder = record.identity();
            for (name, data) in &record.relationships {
                for target in data.identities() {
                    let edge = InverseRelationship::new(holder.clone(), name.clone());
                    if !cache.inverse_relationships(target).contains(&edge) {
                        violations.push(format!("{holder}.{name} -> {target} is not indexed"));
                    }
                }
            }
            for edge in cache.inverse_relationships(&holder) {
                let held = cache
                    .get_record(&edge.record)
                    .and_then(|r| r.relationship(&edge.relationship).cloned())
                    .is_some_and(|d| d.contains(&holder));
                if !held {
                    violations.push(format!(
                        "index says {}.{} -> {holder} but the holder disagrees",
                        edge.record, edge.relationship
                    ));
                }
            }
        }
    }
    violations
}

/// Stored content of one record with unset members dropped and to-many
/// members as sets.
#[derive(Debug, PartialEq, Eq)]
pub struct Content {
    pub keys: BTreeMap<String, String>,
    pub attributes: BTreeMap<String, String>,
    pub relationships: BTreeMap<String, BTreeSet<RecordIdentity>>,
}

/// Every record that carries something, keyed by identity.
///
/// Empty stubs are left out, so a state that only gained stubs (which inverse
/// replay does not remove) compares equal to the state before.
pub fn content(cache: &Cache) -> BTreeMap<RecordIdentity, Content> {
    let kinds: Vec<String> = cache.schema().models.keys().cloned().collect();
    let mut out = BTreeMap::new();
    for kind in &kinds {
        for record in cache.records(kind) {
            let entry = Content {
                keys: record
                    .keys
                    .iter()
                    .filter_map(|(name, value)| Some((name.clone(), value.clone()?)))
                    .collect(),
                attributes: record
                    .attributes
                    .iter()
                    .filter(|(_, value)| !value.is_null())
                    .map(|(name, value): (&String, &Value)| (name.clone(), value.to_string()))
                    .collect(),
                relationships: record
                    .relationships
                    .iter()
                    .filter(|(_, data)| !data.is_empty())
                    .map(|(name, data)| (name.clone(), data.identities().cloned().collect()))
                    .collect(),
            };
            let empty = entry.keys.is_empty()
                && entry.attributes.is_empty()
                && entry.relationships.is_empty();
            if !empty {
                out.insert(record.identity(), entry);
            }
        }
    }
    out
}

pub fn assert_consistent(cache: &Cache) {
    let bidirectional = bidirectional_violations(cache);
    assert!(bidirectional.is_empty(), "{bidirectional:#?}");
    let reverse = reverse_index_violations(cache);
    assert!(reverse.is_empty(), "{reverse:#?}");
}

/// Every identity referenced anywhere (records or reverse index).
pub fn referenced_identities(cache: &Cache) -> Vec<RecordIdentity> {
    let kinds: Vec<String> = cache.schema().models.keys().cloned().collect();
    let mut out = Vec::new();
    for kind in &kinds {
        for record in cache.records(kind) {
            for data in record.relationships.values() {
                out.extend(data.identities().cloned());
            }
            out.extend(
                cache
                    .inverse_relationships(&record.identity())
                    .iter()
                    .map(|edge| edge.record.clone()),
            );
        }
    }
    out
}
