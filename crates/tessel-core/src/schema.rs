// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Schema: per-type attribute, key and relationship declarations.
//!
//! The schema is consumed read-only by the engine. It is deserializable from
//! JSON so tools can load it next to operation batches:
//!
//! ```text
//! { "models": { "planet": { "relationships": { "moons": {
//!     "type": "hasMany", "model": "moon", "inverse": "planet", "dependent": "remove"
//! } } } } }
//! ```
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when an operation references something the schema does not declare.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// The record type is not a model in the schema.
    #[error("model not found: {0}")]
    ModelNotFound(String),
    /// The model exists but does not declare the relationship.
    #[error("relationship not found: {model}.{relationship}")]
    RelationshipNotFound {
        /// Model name.
        model: String,
        /// Relationship name.
        relationship: String,
    },
    /// The operation requires a different relationship cardinality.
    #[error("relationship {model}.{relationship} is not {expected:?}")]
    CardinalityMismatch {
        /// Model name.
        model: String,
        /// Relationship name.
        relationship: String,
        /// Cardinality the operation requires.
        expected: RelationshipKind,
    },
}

/// Relationship cardinality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationshipKind {
    /// To-one.
    HasOne,
    /// To-many.
    HasMany,
}

/// Cascade policy applied when the owning record goes away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Dependent {
    /// Removing the owner removes every related record.
    Remove,
}

/// Declaration of one relationship on a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipDefinition {
    /// Cardinality.
    #[serde(rename = "type")]
    pub kind: RelationshipKind,
    /// Related model, when constrained.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Name of the mirrored relationship on the related model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inverse: Option<String>,
    /// Cascade policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependent: Option<Dependent>,
}

impl RelationshipDefinition {
    /// A to-one relationship to `model`.
    pub fn has_one(model: impl Into<String>) -> Self {
        Self {
            kind: RelationshipKind::HasOne,
            model: Some(model.into()),
            inverse: None,
            dependent: None,
        }
    }

    /// A to-many relationship to `model`.
    pub fn has_many(model: impl Into<String>) -> Self {
        Self {
            kind: RelationshipKind::HasMany,
            model: Some(model.into()),
            inverse: None,
            dependent: None,
        }
    }

    /// Declares the mirrored relationship (builder style).
    #[must_use]
    pub fn with_inverse(mut self, inverse: impl Into<String>) -> Self {
        self.inverse = Some(inverse.into());
        self
    }

    /// Marks the relationship as `dependent: "remove"` (builder style).
    #[must_use]
    pub fn dependent_remove(mut self) -> Self {
        self.dependent = Some(Dependent::Remove);
        self
    }

    /// `true` for hasMany.
    #[must_use]
    pub fn is_many(&self) -> bool {
        self.kind == RelationshipKind::HasMany
    }
}

/// Attribute declaration. The type is informational only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDefinition {
    /// Declared attribute type (e.g. `"string"`).
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// Key declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyDefinition {}

/// Declarations for one record type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDefinition {
    /// Attribute declarations.
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeDefinition>,
    /// Key declarations.
    #[serde(default)]
    pub keys: BTreeMap<String, KeyDefinition>,
    /// Relationship declarations.
    #[serde(default)]
    pub relationships: BTreeMap<String, RelationshipDefinition>,
}

impl ModelDefinition {
    /// Declares an attribute (builder style).
    #[must_use]
    pub fn attribute(mut self, name: impl Into<String>) -> Self {
        self.attributes
            .insert(name.into(), AttributeDefinition::default());
        self
    }

    /// Declares a key (builder style).
    #[must_use]
    pub fn key(mut self, name: impl Into<String>) -> Self {
        self.keys.insert(name.into(), KeyDefinition::default());
        self
    }

    /// Declares a relationship (builder style).
    #[must_use]
    pub fn relationship(
        mut self,
        name: impl Into<String>,
        definition: RelationshipDefinition,
    ) -> Self {
        self.relationships.insert(name.into(), definition);
        self
    }
}

/// Collection of model definitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    /// Incremented on every [`Schema::upgrade`].
    #[serde(default = "initial_version")]
    pub version: u32,
    /// Model definitions keyed by type name.
    #[serde(default)]
    pub models: BTreeMap<String, ModelDefinition>,
}

const fn initial_version() -> u32 {
    1
}

impl Default for Schema {
    fn default() -> Self {
        Self::new([])
    }
}

impl Schema {
    /// Builds a version-1 schema from `(name, model)` pairs.
    pub fn new(models: impl IntoIterator<Item = (String, ModelDefinition)>) -> Self {
        Self {
            version: initial_version(),
            models: models.into_iter().collect(),
        }
    }

    /// Adds a model (builder style).
    #[must_use]
    pub fn with_model(mut self, name: impl Into<String>, model: ModelDefinition) -> Self {
        self.models.insert(name.into(), model);
        self
    }

    /// Looks up a model.
    ///
    /// # Errors
    /// [`SchemaError::ModelNotFound`] when `kind` is not declared.
    pub fn model(&self, kind: &str) -> Result<&ModelDefinition, SchemaError> {
        self.models
            .get(kind)
            .ok_or_else(|| SchemaError::ModelNotFound(kind.to_owned()))
    }

    /// Returns `true` when `kind` is declared.
    #[must_use]
    pub fn has_model(&self, kind: &str) -> bool {
        self.models.contains_key(kind)
    }

    /// Looks up a relationship declaration.
    ///
    /// # Errors
    /// [`SchemaError::ModelNotFound`] or [`SchemaError::RelationshipNotFound`].
    pub fn relationship(
        &self,
        kind: &str,
        relationship: &str,
    ) -> Result<&RelationshipDefinition, SchemaError> {
        self.model(kind)?
            .relationships
            .get(relationship)
            .ok_or_else(|| SchemaError::RelationshipNotFound {
                model: kind.to_owned(),
                relationship: relationship.to_owned(),
            })
    }

    /// Merges `models` into the schema and bumps the version.
    ///
    /// Existing models with the same name are replaced.
    pub fn upgrade(&mut self, models: impl IntoIterator<Item = (String, ModelDefinition)>) {
        self.models.extend(models);
        self.version = self.version.saturating_add(1);
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_relationship_declarations() {
        let schema: Schema = serde_json::from_value(json!({
            "models": {
                "planet": {
                    "attributes": { "name": { "type": "string" } },
                    "relationships": {
                        "moons": {
                            "type": "hasMany",
                            "model": "moon",
                            "inverse": "planet",
                            "dependent": "remove"
                        }
                    }
                },
                "moon": {
                    "relationships": {
                        "planet": { "type": "hasOne", "model": "planet", "inverse": "moons" }
                    }
                }
            }
        }))
        .expect("schema");

        assert_eq!(schema.version, 1);
        let moons = schema.relationship("planet", "moons").expect("moons");
        assert!(moons.is_many());
        assert_eq!(moons.inverse.as_deref(), Some("planet"));
        assert_eq!(moons.dependent, Some(Dependent::Remove));
        let planet = schema.relationship("moon", "planet").expect("planet");
        assert_eq!(planet.kind, RelationshipKind::HasOne);
        assert_eq!(planet.dependent, None);
    }

    #[test]
    fn lookups_fail_with_typed_errors() {
        let schema = Schema::default().with_model("planet", ModelDefinition::default());
        assert_eq!(
            schema.model("star"),
            Err(SchemaError::ModelNotFound("star".into()))
        );
        assert_eq!(
            schema.relationship("planet", "moons"),
            Err(SchemaError::RelationshipNotFound {
                model: "planet".into(),
                relationship: "moons".into(),
            })
        );
    }

    #[test]
    fn upgrade_adds_models_and_bumps_version() {
        let mut schema = Schema::new([("planet".to_owned(), ModelDefinition::default())]);
        schema.upgrade([("moon".to_owned(), ModelDefinition::default())]);
        assert_eq!(schema.version, 2);
        assert!(schema.has_model("planet"));
        assert!(schema.has_model("moon"));
    }
}
