use crate::{
    error::InternalError,
    serialize::MAX_ROW_BYTES,
    traits::{EntityKey, EntityKind},
    value::Value,
    version::{Snapshot, VersionId},
};
use std::{cell::OnceCell, fmt};

///
/// VersionProxy
///
/// Read-time stand-in for the entity recorded by one snapshot.
///
/// - Identity (`version_id`, `snapshot`, `object_key`) is answered from the
///   snapshot without decoding.
/// - `entity` decodes on first use and caches the result for the proxy's
///   lifetime.
/// - Not persistable: `Db::save_related` rejects proxies.
///

#[derive(Clone)]
pub struct VersionProxy<T: EntityKind> {
    snapshot: Snapshot,
    max_bytes: usize,
    target: OnceCell<T>,
}

impl<T: EntityKind> VersionProxy<T> {
    #[must_use]
    pub const fn new(snapshot: Snapshot) -> Self {
        Self::with_limit(snapshot, MAX_ROW_BYTES)
    }

    #[must_use]
    pub const fn with_limit(snapshot: Snapshot, max_bytes: usize) -> Self {
        Self {
            snapshot,
            max_bytes,
            target: OnceCell::new(),
        }
    }

    #[must_use]
    pub const fn version_id(&self) -> VersionId {
        self.snapshot.id
    }

    #[must_use]
    pub const fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Logical key of the recorded entity.
    #[must_use]
    pub const fn object_key(&self) -> &Value {
        &self.snapshot.object_key
    }

    #[must_use]
    pub fn key(&self) -> Option<T::Key> {
        T::Key::from_value(&self.snapshot.object_key)
    }

    #[must_use]
    pub fn is_materialized(&self) -> bool {
        self.target.get().is_some()
    }

    /// The recorded entity, decoded on first access.
    pub fn entity(&self) -> Result<&T, InternalError> {
        if let Some(target) = self.target.get() {
            return Ok(target);
        }

        let target = self.snapshot.materialize_bounded::<T>(self.max_bytes)?;

        Ok(self.target.get_or_init(|| target))
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R, InternalError> {
        self.entity().map(f)
    }

    /// Consume the proxy, yielding an owned copy of the recorded entity.
    pub fn into_entity(self) -> Result<T, InternalError> {
        match self.target.into_inner() {
            Some(target) => Ok(target),
            None => self.snapshot.materialize_bounded(self.max_bytes),
        }
    }
}

impl<T: EntityKind> PartialEq for VersionProxy<T> {
    fn eq(&self, other: &Self) -> bool {
        self.snapshot.id == other.snapshot.id
    }
}

impl<T: EntityKind> Eq for VersionProxy<T> {}

impl<T: EntityKind> fmt::Display for VersionProxy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({}) @ version {}",
            self.snapshot.entity_name, self.snapshot.object_key, self.snapshot.id
        )
    }
}

impl<T: EntityKind> fmt::Debug for VersionProxy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VersionProxy")
            .field("entity", &self.snapshot.entity_name)
            .field("key", &self.snapshot.object_key)
            .field("version", &self.snapshot.id)
            .field("materialized", &self.is_materialized())
            .finish()
    }
}

///
/// Related
///
/// Result of reading an indirect relation: the live entity just assigned in
/// this session, or a proxy over the pinned snapshot.
///

#[derive(Clone, Debug)]
pub enum Related<T: EntityKind> {
    Entity(T),
    Proxy(VersionProxy<T>),
}

impl<T: EntityKind> Related<T> {
    pub fn entity(&self) -> Result<&T, InternalError> {
        match self {
            Self::Entity(entity) => Ok(entity),
            Self::Proxy(proxy) => proxy.entity(),
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R, InternalError> {
        self.entity().map(f)
    }

    #[must_use]
    pub fn key(&self) -> Option<T::Key> {
        match self {
            Self::Entity(entity) => Some(entity.key()),
            Self::Proxy(proxy) => proxy.key(),
        }
    }

    /// Pinned version, when this value came from a snapshot.
    #[must_use]
    pub const fn version_id(&self) -> Option<VersionId> {
        match self {
            Self::Entity(_) => None,
            Self::Proxy(proxy) => Some(proxy.version_id()),
        }
    }

    #[must_use]
    pub const fn is_proxy(&self) -> bool {
        matches!(self, Self::Proxy(_))
    }

    pub fn into_entity(self) -> Result<T, InternalError> {
        match self {
            Self::Entity(entity) => Ok(entity),
            Self::Proxy(proxy) => proxy.into_entity(),
        }
    }
}
