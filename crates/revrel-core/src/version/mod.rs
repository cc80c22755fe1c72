//! Module: version
//! Responsibility: the version-store contract consumed by indirect relations.
//! Does not own: relation semantics or row persistence.
//! Boundary: `Db::save` stages snapshots through `record`; relation fields
//! read them back through `get` / `latest_snapshot_for` / `versions_for`.

mod memory;
mod registry;
mod scope;


use crate::{
    error::{ErrorClass, ErrorOrigin, InternalError},
    serialize::{MAX_ROW_BYTES, deserialize_bounded},
    traits::EntityKind,
    value::Value,
};
use derive_more::Display;
use serde::{Deserialize, Serialize};

pub use memory::MemoryVersionStore;
pub use registry::{is_registered, register, reset_for_tests as reset_registry_for_tests};
pub use scope::RevisionScope;

///
/// VersionId
///
/// Store-assigned snapshot identity. Monotonic across one store; the greatest
/// id for an object is its latest snapshot.
///

#[derive(
    Clone, Copy, Debug, Deserialize, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[serde(transparent)]
pub struct VersionId(u64);

impl VersionId {
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

///
/// RevisionId
///
/// Identity of one committed recording scope.
///

#[derive(
    Clone, Copy, Debug, Deserialize, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[serde(transparent)]
pub struct RevisionId(u64);

impl RevisionId {
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

///
/// Snapshot
///
/// Immutable recorded state of one entity. `data` uses the row encoding, so
/// it can be compared against an entity's current serialized state.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Snapshot {
    pub id: VersionId,
    pub revision: RevisionId,
    pub entity_name: String,
    pub object_key: Value,
    pub data: Vec<u8>,
    pub repr: String,
}

impl Snapshot {
    /// Reconstruct the recorded entity.
    pub fn materialize<T: EntityKind>(&self) -> Result<T, InternalError> {
        self.materialize_bounded(MAX_ROW_BYTES)
    }

    /// Reconstruct the recorded entity with an explicit decode bound.
    pub fn materialize_bounded<T: EntityKind>(&self, max_bytes: usize) -> Result<T, InternalError> {
        if self.entity_name != T::ENTITY_NAME {
            return Err(InternalError::misuse(format!(
                "snapshot {} records '{}', cannot materialize as {}",
                self.id,
                self.entity_name,
                T::PATH
            )));
        }

        deserialize_bounded(&self.data, max_bytes).map_err(|err| {
            InternalError::new(
                ErrorClass::Corruption,
                ErrorOrigin::Version,
                format!(
                    "snapshot {} of {} '{}' failed to decode: {err}",
                    self.id, self.entity_name, self.object_key
                ),
            )
        })
    }
}

///
/// VersionStore
///
/// Append-only snapshot store with scoped recording.
///
/// Registration is process-wide: the provided `register` / `is_registered`
/// write to a thread-local registry shared by every store instance, so
/// implementors normally keep the defaults.
///
/// Recording contract:
/// - `begin_recording` opens (or nests into) a scope; `end_recording` at the
///   outermost level commits every staged snapshot, or none.
/// - `record` stages a snapshot; a repeated save of the same object in one
///   scope rewrites the staged snapshot and keeps its id.
/// - Once `pin` marks a staged id as referenced, that snapshot is frozen: a
///   later save with different data stages a fresh id instead.
/// - Reads see staged snapshots of the open scope (read-your-writes).
///

pub trait VersionStore {
    fn register(&self, entity_name: &'static str) {
        registry::register(entity_name);
    }

    fn is_registered(&self, entity_name: &str) -> bool {
        registry::is_registered(entity_name)
    }

    fn begin_recording(&self) -> Result<(), InternalError>;

    fn end_recording(&self) -> Result<(), InternalError>;

    /// Abort the open scope; staged snapshots are dropped.
    fn discard_recording(&self);

    fn is_recording(&self) -> bool;

    fn record(
        &self,
        entity_name: &str,
        object_key: Value,
        data: Vec<u8>,
        repr: String,
    ) -> Result<VersionId, InternalError>;

    /// Mark `id` as held by a pointer. Committed ids are already frozen.
    fn pin(&self, id: VersionId) -> Result<(), InternalError>;

    fn get(&self, id: VersionId) -> Result<Option<Snapshot>, InternalError>;

    fn latest_snapshot_for(
        &self,
        entity_name: &str,
        object_key: &Value,
    ) -> Result<Option<Snapshot>, InternalError>;

    /// Every snapshot id recorded for one object, oldest first.
    fn versions_for(
        &self,
        entity_name: &str,
        object_key: &Value,
    ) -> Result<Vec<VersionId>, InternalError>;
}
