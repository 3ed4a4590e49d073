// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Record operations: the closed set of mutations accepted by [`crate::Cache::patch`].
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ident::RecordIdentity;
use crate::record::Record;

/// One atomic mutation request against the store.
///
/// Wire form is tagged by `"op"` (e.g. `{"op": "addRecord", "record": {...}}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum RecordOperation {
    /// Insert `record` as-is.
    AddRecord {
        /// Full record.
        record: Record,
    },
    /// Merge `record` over the stored record (replacement members win).
    ReplaceRecord {
        /// Partial or full record.
        record: Record,
    },
    /// Delete the record at `record`.
    RemoveRecord {
        /// Identity to remove.
        record: RecordIdentity,
    },
    /// Set (or with `None`, unset) one key.
    ReplaceKey {
        /// Owning record.
        record: RecordIdentity,
        /// Key name.
        key: String,
        /// New key value.
        value: Option<String>,
    },
    /// Set one attribute.
    ReplaceAttribute {
        /// Owning record.
        record: RecordIdentity,
        /// Attribute name.
        attribute: String,
        /// New attribute value.
        value: Value,
    },
    /// Append an identity to a to-many relationship.
    AddToRelatedRecords {
        /// Owning record.
        record: RecordIdentity,
        /// Relationship name.
        relationship: String,
        /// Identity to link.
        #[serde(rename = "relatedRecord")]
        related_record: RecordIdentity,
    },
    /// Remove an identity from a to-many relationship.
    RemoveFromRelatedRecords {
        /// Owning record.
        record: RecordIdentity,
        /// Relationship name.
        relationship: String,
        /// Identity to unlink.
        #[serde(rename = "relatedRecord")]
        related_record: RecordIdentity,
    },
    /// Overwrite a whole to-many relationship.
    ReplaceRelatedRecords {
        /// Owning record.
        record: RecordIdentity,
        /// Relationship name.
        relationship: String,
        /// New membership, in order.
        #[serde(rename = "relatedRecords")]
        related_records: Vec<RecordIdentity>,
    },
    /// Overwrite a to-one relationship.
    ReplaceRelatedRecord {
        /// Owning record.
        record: RecordIdentity,
        /// Relationship name.
        relationship: String,
        /// New value (`None` clears).
        #[serde(rename = "relatedRecord")]
        related_record: Option<RecordIdentity>,
    },
}

impl RecordOperation {
    /// Wire name of the operation kind.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::AddRecord { .. } => "addRecord",
            Self::ReplaceRecord { .. } => "replaceRecord",
            Self::RemoveRecord { .. } => "removeRecord",
            Self::ReplaceKey { .. } => "replaceKey",
            Self::ReplaceAttribute { .. } => "replaceAttribute",
            Self::AddToRelatedRecords { .. } => "addToRelatedRecords",
            Self::RemoveFromRelatedRecords { .. } => "removeFromRelatedRecords",
            Self::ReplaceRelatedRecords { .. } => "replaceRelatedRecords",
            Self::ReplaceRelatedRecord { .. } => "replaceRelatedRecord",
        }
    }

    /// Identity of the record this operation targets.
    #[must_use]
    pub fn target(&self) -> RecordIdentity {
        match self {
            Self::AddRecord { record } | Self::ReplaceRecord { record } => record.identity(),
            Self::RemoveRecord { record }
            | Self::ReplaceKey { record, .. }
            | Self::ReplaceAttribute { record, .. }
            | Self::AddToRelatedRecords { record, .. }
            | Self::RemoveFromRelatedRecords { record, .. }
            | Self::ReplaceRelatedRecords { record, .. }
            | Self::ReplaceRelatedRecord { record, .. } => record.clone(),
        }
    }

    /// Type of the record this operation targets.
    #[must_use]
    pub fn target_kind(&self) -> &str {
        match self {
            Self::AddRecord { record } | Self::ReplaceRecord { record } => &record.kind,
            Self::RemoveRecord { record }
            | Self::ReplaceKey { record, .. }
            | Self::ReplaceAttribute { record, .. }
            | Self::AddToRelatedRecords { record, .. }
            | Self::RemoveFromRelatedRecords { record, .. }
            | Self::ReplaceRelatedRecords { record, .. }
            | Self::ReplaceRelatedRecord { record, .. } => &record.kind,
        }
    }

    /// `addRecord` shorthand.
    #[must_use]
    pub fn add_record(record: Record) -> Self {
        Self::AddRecord { record }
    }

    /// `replaceRecord` shorthand.
    #[must_use]
    pub fn replace_record(record: Record) -> Self {
        Self::ReplaceRecord { record }
    }

    /// `removeRecord` shorthand.
    #[must_use]
    pub fn remove_record(record: RecordIdentity) -> Self {
        Self::RemoveRecord { record }
    }

    /// `replaceKey` shorthand.
    pub fn replace_key(
        record: RecordIdentity,
        key: impl Into<String>,
        value: Option<String>,
    ) -> Self {
        Self::ReplaceKey {
            record,
            key: key.into(),
            value,
        }
    }

    /// `replaceAttribute` shorthand.
    pub fn replace_attribute(
        record: RecordIdentity,
        attribute: impl Into<String>,
        value: Value,
    ) -> Self {
        Self::ReplaceAttribute {
            record,
            attribute: attribute.into(),
            value,
        }
    }

    /// `addToRelatedRecords` shorthand.
    pub fn add_to_related_records(
        record: RecordIdentity,
        relationship: impl Into<String>,
        related_record: RecordIdentity,
    ) -> Self {
        Self::AddToRelatedRecords {
            record,
            relationship: relationship.into(),
            related_record,
        }
    }

    /// `removeFromRelatedRecords` shorthand.
    pub fn remove_from_related_records(
        record: RecordIdentity,
        relationship: impl Into<String>,
        related_record: RecordIdentity,
    ) -> Self {
        Self::RemoveFromRelatedRecords {
            record,
            relationship: relationship.into(),
            related_record,
        }
    }

    /// `replaceRelatedRecords` shorthand.
    pub fn replace_related_records(
        record: RecordIdentity,
        relationship: impl Into<String>,
        related_records: Vec<RecordIdentity>,
    ) -> Self {
        Self::ReplaceRelatedRecords {
            record,
            relationship: relationship.into(),
            related_records,
        }
    }

    /// `replaceRelatedRecord` shorthand.
    pub fn replace_related_record(
        record: RecordIdentity,
        relationship: impl Into<String>,
        related_record: Option<RecordIdentity>,
    ) -> Self {
        Self::ReplaceRelatedRecord {
            record,
            relationship: relationship.into(),
            related_record,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use super::*;
    use serde_json::json;

    #[test]
    fn wire_form_is_op_tagged_camel_case() {
        let op = RecordOperation::add_to_related_records(
            RecordIdentity::new("planet", "jupiter"),
            "moons",
            RecordIdentity::new("moon", "io"),
        );
        let wire = serde_json::to_value(&op).expect("serialize");
        assert_eq!(
            wire,
            json!({
                "op": "addToRelatedRecords",
                "record": { "type": "planet", "id": "jupiter" },
                "relationship": "moons",
                "relatedRecord": { "type": "moon", "id": "io" }
            })
        );
        assert_eq!(op.name(), "addToRelatedRecords");
    }

    #[test]
    fn null_related_record_clears() {
        let op: RecordOperation = serde_json::from_value(json!({
            "op": "replaceRelatedRecord",
            "record": { "type": "moon", "id": "io" },
            "relationship": "planet",
            "relatedRecord": null
        }))
        .expect("deserialize");
        assert_eq!(
            op,
            RecordOperation::replace_related_record(
                RecordIdentity::new("moon", "io"),
                "planet",
                None
            )
        );
    }

    #[test]
    fn target_is_reported_for_record_carrying_ops() {
        let op = RecordOperation::add_record(Record::new("planet", "mars"));
        assert_eq!(op.target(), RecordIdentity::new("planet", "mars"));
        assert_eq!(op.target_kind(), "planet");
    }
}
