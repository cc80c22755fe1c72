use crate::{
    db::Db,
    error::InternalError,
    obs::sink::{MetricsEvent, record},
    relation::{
        proxy::{Related, VersionProxy},
        slot::{Assigned, IndirectRelation},
    },
    traits::EntityKind,
};

///
/// IndirectAccessor
///
/// Read/write mediation for one indirect relation slot of owner `O`.
///
/// Reads prefer the slot cache, so a value assigned in this session is read
/// back as assigned. Otherwise the stored pointer is resolved through the
/// version store and cached as a proxy.
///

pub struct IndirectAccessor<O, T: EntityKind> {
    field_name: &'static str,
    slot: fn(&O) -> &IndirectRelation<T>,
    slot_mut: fn(&mut O) -> &mut IndirectRelation<T>,
}

impl<O: EntityKind, T: EntityKind> IndirectAccessor<O, T> {
    #[must_use]
    pub const fn new(
        field_name: &'static str,
        slot: fn(&O) -> &IndirectRelation<T>,
        slot_mut: fn(&mut O) -> &mut IndirectRelation<T>,
    ) -> Self {
        Self {
            field_name,
            slot,
            slot_mut,
        }
    }

    #[must_use]
    pub fn slot<'o>(&self, owner: &'o O) -> &'o IndirectRelation<T> {
        (self.slot)(owner)
    }

    pub fn slot_mut<'o>(&self, owner: &'o mut O) -> &'o mut IndirectRelation<T> {
        (self.slot_mut)(owner)
    }

    pub fn get<'o>(&self, db: &Db, owner: &'o O) -> Result<Option<&'o Related<T>>, InternalError> {
        let slot = self.slot(owner);

        if let Some(cached) = slot.cache.get() {
            return Ok(Some(cached));
        }

        let Some(version) = slot.pointer else {
            return Ok(None);
        };

        let snapshot = match db.versions().get(version)? {
            Some(snapshot) if snapshot.entity_name == T::ENTITY_NAME => snapshot,
            _ => {
                record(MetricsEvent::ResolutionFailure {
                    entity_path: O::PATH,
                });
                return Err(InternalError::resolution(
                    self.field_name,
                    T::ENTITY_NAME,
                    version,
                ));
            }
        };

        record(MetricsEvent::PointerResolved {
            entity_path: O::PATH,
        });
        db.debug_log(format_args!(
            "resolved {}.{} -> {}({}) @ version {version}",
            O::ENTITY_NAME,
            self.field_name,
            snapshot.entity_name,
            snapshot.object_key
        ));

        let proxy = VersionProxy::with_limit(snapshot, db.config().max_snapshot_bytes);

        Ok(Some(slot.cache.get_or_init(|| Related::Proxy(proxy))))
    }

    /// Record an assignment; `None` clears both pointer and cache.
    pub fn set<V: Into<Assigned<T>>>(&self, owner: &mut O, value: Option<V>) {
        self.slot_mut(owner).assign(value.map(Into::into));
    }
}
