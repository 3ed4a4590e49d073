// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! tessel-core: normalized in-memory record cache with reversible patches.
//!
//! Records are addressed by `(type, id)` and mutated only through
//! [`Cache::patch`], which runs every operation through a pipeline of
//! processors that validate it against the [`Schema`], keep declared inverse
//! relationships consistent, and maintain the forward and reverse relationship
//! indices. Every applied operation yields the operation that undoes it, and
//! storage is structurally shared so [`Cache::fork`] is cheap.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::missing_const_for_fn,
    clippy::redundant_pub_crate,
    clippy::module_name_repetitions,
    clippy::use_self
)]

mod cache;
mod container;
mod ident;
mod identity_set;
mod inverse_relationships;
mod inverse_transforms;
mod operation;
mod patch_transforms;
/// Persistent hash trie backing every per-type table.
pub mod persistent;
/// Operation processors and the hook contract they implement.
pub mod processor;
mod query;
mod record;
mod relationships;
mod schema;
mod settings;
mod state;

// Re-exports for stable public API
/// Patch engine, its results and errors.
pub use cache::{Cache, CacheError, ObserverId, PatchEvent, PatchResult};
/// Per-type structurally shared storage.
pub use container::{RecordContainer, TypedTable};
/// Record addressing.
pub use ident::RecordIdentity;
/// Identity sets used for relationship diffs.
pub use identity_set::RecordIdentitySet;
/// Reverse relationship index.
pub use inverse_relationships::{InverseRelationship, InverseRelationshipIndex};
/// Undo computation, exposed for tools that preview a batch.
pub use inverse_transforms::inverse as inverse_of;
/// Operations accepted by [`Cache::patch`].
pub use operation::RecordOperation;
/// Structural mutation per operation kind.
pub use patch_transforms::apply as apply_operation;
/// Built-in processors and the hook trait.
pub use processor::{OperationProcessor, ProcessorKind};
/// Query boundary.
pub use query::{QueryExpression, QueryResult};
/// Record payloads.
pub use record::{Record, RelationshipData};
/// Forward relationship index.
pub use relationships::{RelatedSet, RelationshipIndex};
/// Schema declarations and lookup errors.
pub use schema::{
    AttributeDefinition, Dependent, KeyDefinition, ModelDefinition, RelationshipDefinition,
    RelationshipKind, Schema, SchemaError,
};
/// Engine configuration.
pub use settings::{CacheSettings, PatchMode};
/// Engine state and canonical digests.
pub use state::{CacheState, Digest};
