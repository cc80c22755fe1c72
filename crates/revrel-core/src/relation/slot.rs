use crate::{
    relation::proxy::{Related, VersionProxy},
    traits::EntityKind,
    value::Value,
    version::VersionId,
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cell::OnceCell;

///
/// Assigned
///
/// A value accepted by an indirect relation write: a live entity or a proxy
/// pinned to an existing snapshot.
///

#[derive(Clone, Debug)]
pub enum Assigned<T: EntityKind> {
    Entity(T),
    Proxy(VersionProxy<T>),
}

impl<T: EntityKind> From<T> for Assigned<T> {
    fn from(entity: T) -> Self {
        Self::Entity(entity)
    }
}

impl<T: EntityKind> From<VersionProxy<T>> for Assigned<T> {
    fn from(proxy: VersionProxy<T>) -> Self {
        Self::Proxy(proxy)
    }
}

impl<T: EntityKind> From<Related<T>> for Assigned<T> {
    fn from(related: Related<T>) -> Self {
        match related {
            Related::Entity(entity) => Self::Entity(entity),
            Related::Proxy(proxy) => Self::Proxy(proxy),
        }
    }
}

///
/// PendingWrite
///
/// Assignment not yet turned into a pointer. Consumed by the pre-save hook.
///

#[derive(Clone, Debug)]
pub(crate) enum PendingWrite<T: EntityKind> {
    Clear,
    Assigned(Assigned<T>),
}

///
/// IndirectRelation
///
/// Per-instance slot of an indirect relation field.
///
/// Only the pointer is persisted: the slot serializes exactly as
/// `Option<VersionId>`. The read cache and the pending write live for the
/// value's lifetime and never reach storage.
///

#[derive(Clone, Debug)]
pub struct IndirectRelation<T: EntityKind> {
    pub(crate) pointer: Option<VersionId>,
    pub(crate) cache: OnceCell<Related<T>>,
    pub(crate) pending: Option<PendingWrite<T>>,
}

impl<T: EntityKind> IndirectRelation<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self::from_pointer(None)
    }

    #[must_use]
    pub const fn from_pointer(pointer: Option<VersionId>) -> Self {
        Self {
            pointer,
            cache: OnceCell::new(),
            pending: None,
        }
    }

    /// The stored version pointer (optimistically updated by proxy writes).
    #[must_use]
    pub const fn pointer(&self) -> Option<VersionId> {
        self.pointer
    }

    #[must_use]
    pub const fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Column value as seen by predicates: `Version(id)` or `Null`.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::from(self.pointer)
    }

    pub(crate) fn assign(&mut self, value: Option<Assigned<T>>) {
        self.cache = OnceCell::new();

        match value {
            None => {
                self.pointer = None;
                self.pending = Some(PendingWrite::Clear);
            }
            Some(Assigned::Entity(entity)) => {
                let _ = self.cache.set(Related::Entity(entity.clone()));
                self.pending = Some(PendingWrite::Assigned(Assigned::Entity(entity)));
            }
            Some(Assigned::Proxy(proxy)) => {
                self.pointer = Some(proxy.version_id());
                let _ = self.cache.set(Related::Proxy(proxy.clone()));
                self.pending = Some(PendingWrite::Assigned(Assigned::Proxy(proxy)));
            }
        }
    }
}

impl<T: EntityKind> Default for IndirectRelation<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: EntityKind> Serialize for IndirectRelation<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.pointer.serialize(serializer)
    }
}

impl<'de, T: EntityKind> Deserialize<'de> for IndirectRelation<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<VersionId>::deserialize(deserializer).map(Self::from_pointer)
    }
}
