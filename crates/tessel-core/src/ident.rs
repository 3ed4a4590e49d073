// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Record identity: the `(type, id)` address used everywhere a record is referenced.
use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable reference to a record. Never carries payload.
///
/// Identities order by type first and id second, which is the canonical
/// traversal order used by [`crate::CacheState::state_digest`].
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct RecordIdentity {
    /// Model name as declared in the schema.
    #[serde(rename = "type")]
    pub kind: String,
    /// Record id, unique within `kind`.
    pub id: String,
}

impl RecordIdentity {
    /// Builds an identity from anything string-like.
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
        }
    }

    /// `"type:id"` rendering for logs and messages.
    ///
    /// Not unique when a type name contains `:`, so sets and maps key by the
    /// identity itself.
    #[must_use]
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RecordIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}
