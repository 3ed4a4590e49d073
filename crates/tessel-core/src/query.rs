// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Read-only query expressions evaluated against engine state.
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cache::CacheError;
use crate::ident::RecordIdentity;
use crate::record::Record;
use crate::state::CacheState;

/// A lookup request. Wire form is tagged by `"op"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum QueryExpression {
    /// One record by identity.
    FindRecord {
        /// Identity to look up.
        record: RecordIdentity,
    },
    /// Every record of a type, sorted by id.
    FindRecords {
        /// Record type.
        #[serde(rename = "type")]
        kind: String,
    },
    /// The record a to-one relationship points at.
    FindRelatedRecord {
        /// Owning record.
        record: RecordIdentity,
        /// Relationship name.
        relationship: String,
    },
    /// The records a to-many relationship points at, in stored order.
    FindRelatedRecords {
        /// Owning record.
        record: RecordIdentity,
        /// Relationship name.
        relationship: String,
    },
}

/// Result of a [`QueryExpression`]: a record (or `null`) or a list of records.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryResult {
    /// Single-record result.
    Record(Option<Arc<Record>>),
    /// Multi-record result.
    Records(Vec<Arc<Record>>),
}

impl QueryResult {
    /// The single record, if this is a present single-record result.
    pub fn record(&self) -> Option<&Arc<Record>> {
        match self {
            Self::Record(record) => record.as_ref(),
            Self::Records(_) => None,
        }
    }

    /// The records of a multi-record result (empty otherwise).
    pub fn records(&self) -> &[Arc<Record>] {
        match self {
            Self::Records(records) => records.as_slice(),
            Self::Record(_) => &[],
        }
    }
}

/// Evaluates `expression` against `state`.
pub(crate) fn evaluate(
    state: &CacheState,
    expression: &QueryExpression,
    raise_not_found: bool,
) -> Result<QueryResult, CacheError> {
    let find = |identity: &RecordIdentity| -> Result<Option<Arc<Record>>, CacheError> {
        state.schema.model(&identity.kind)?;
        match state.records.get(identity) {
            Some(record) => Ok(Some(Arc::clone(record))),
            None if raise_not_found => Err(CacheError::RecordNotFound(identity.clone())),
            None => Ok(None),
        }
    };

    match expression {
        QueryExpression::FindRecord { record } => find(record).map(QueryResult::Record),
        QueryExpression::FindRecords { kind } => {
            state.schema.model(kind)?;
            Ok(QueryResult::Records(state.records.records(kind)))
        }
        QueryExpression::FindRelatedRecord {
            record,
            relationship,
        } => {
            state.schema.relationship(&record.kind, relationship)?;
            let related = find(record)?
                .and_then(|owner| owner.relationship(relationship)?.identities().next().cloned())
                .and_then(|related| state.records.get(&related).cloned());
            Ok(QueryResult::Record(related))
        }
        QueryExpression::FindRelatedRecords {
            record,
            relationship,
        } => {
            state.schema.relationship(&record.kind, relationship)?;
            let related = find(record)?
                .and_then(|owner| {
                    owner.relationship(relationship).map(|data| {
                        data.identities()
                            .filter_map(|related| state.records.get(related).cloned())
                            .collect()
                    })
                })
                .unwrap_or_default();
            Ok(QueryResult::Records(related))
        }
    }
}
