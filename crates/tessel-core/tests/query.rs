// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs)]

mod common;

use common::{moon, planet, solar_cache, solar_schema};
use serde_json::json;
use tessel_core::{
    Cache, CacheError, CacheSettings, QueryExpression, RecordOperation, SchemaError,
};

fn linked_cache() -> Cache {
    let mut cache = solar_cache(&["p2", "p1"], &["m2", "m1"]);
    cache
        .patch(&[RecordOperation::replace_related_records(
            planet("p1"),
            "moons",
            vec![moon("m2"), moon("m1")],
        )])
        .expect("link");
    cache
}

#[test]
fn find_record_and_find_records() {
    let cache = linked_cache();
    let found = cache
        .query(&QueryExpression::FindRecord { record: planet("p1") })
        .expect("query");
    assert_eq!(found.record().map(|r| r.identity()), Some(planet("p1")));

    let missing = cache
        .query(&QueryExpression::FindRecord { record: planet("p7") })
        .expect("query");
    assert!(missing.record().is_none());

    let planets = cache
        .query(&QueryExpression::FindRecords { kind: "planet".into() })
        .expect("query");
    let ids: Vec<&str> = planets.records().iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["p1", "p2"]);
}

#[test]
fn related_queries_follow_stored_order() {
    let cache = linked_cache();
    let moons = cache
        .query(&QueryExpression::FindRelatedRecords {
            record: planet("p1"),
            relationship: "moons".into(),
        })
        .expect("query");
    let ids: Vec<&str> = moons.records().iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["m2", "m1"]);

    let owner = cache
        .query(&QueryExpression::FindRelatedRecord {
            record: moon("m1"),
            relationship: "planet".into(),
        })
        .expect("query");
    assert_eq!(owner.record().map(|r| r.identity()), Some(planet("p1")));

    let none = cache
        .query(&QueryExpression::FindRelatedRecords {
            record: planet("p2"),
            relationship: "moons".into(),
        })
        .expect("query");
    assert!(none.records().is_empty());
}

#[test]
fn queries_are_schema_checked() {
    let cache = linked_cache();
    assert_eq!(
        cache.query(&QueryExpression::FindRecords { kind: "comet".into() }),
        Err(CacheError::Schema(SchemaError::ModelNotFound("comet".into())))
    );
    assert!(matches!(
        cache.query(&QueryExpression::FindRelatedRecord {
            record: planet("p1"),
            relationship: "rings".into(),
        }),
        Err(CacheError::Schema(SchemaError::RelationshipNotFound { .. }))
    ));
}

#[test]
fn raise_not_found_turns_misses_into_errors() {
    let cache = Cache::with_settings(
        solar_schema(),
        CacheSettings::default().with_raise_not_found(true),
    );
    assert_eq!(
        cache.query(&QueryExpression::FindRecord { record: planet("p7") }),
        Err(CacheError::RecordNotFound(planet("p7")))
    );
    assert!(matches!(
        cache.query(&QueryExpression::FindRelatedRecords {
            record: planet("p7"),
            relationship: "moons".into(),
        }),
        Err(CacheError::RecordNotFound(_))
    ));
}

#[test]
fn expressions_and_results_use_wire_names() {
    let cache = linked_cache();
    let expression: QueryExpression = serde_json::from_value(json!({
        "op": "findRelatedRecord",
        "record": { "type": "moon", "id": "m2" },
        "relationship": "planet"
    }))
    .expect("expression");
    let result = cache.query(&expression).expect("query");
    let wire = serde_json::to_value(&result).expect("serialize");
    assert_eq!(wire["type"], "planet");
    assert_eq!(wire["id"], "p1");

    let expression: QueryExpression =
        serde_json::from_value(json!({ "op": "findRecords", "type": "moon" })).expect("expression");
    let wire = serde_json::to_value(cache.query(&expression).expect("query")).expect("serialize");
    assert_eq!(wire.as_array().map(Vec::len), Some(2));

    let missing = cache
        .query(&QueryExpression::FindRecord { record: moon("m9") })
        .expect("query");
    assert_eq!(serde_json::to_value(&missing).expect("serialize"), json!(null));
}
