pub mod entity;

pub(crate) use entity::{
    CATEGORY_SUPPLIER, Category, PURCHASE_SUPPLIER, Purchase, STARRED_ORDER_SUPPLIER,
    StarredOrder, Supplier,
};

use crate::{
    db::Db,
    error::InternalError,
    model::field::{EntityFieldKind, EntityFieldModel},
    obs::metrics_reset_all,
    relation,
    value::Value,
    version::{self, MemoryVersionStore, Snapshot, VersionId, VersionStore},
};
use std::{cell::Cell, rc::Rc};
use ulid::Ulid;

/// Build a runtime field model for test entities.
#[must_use]
pub const fn field(name: &'static str, kind: EntityFieldKind) -> EntityFieldModel {
    EntityFieldModel { name, kind }
}

/// Deterministic ULID; ordering follows `n`.
#[must_use]
pub fn ulid(n: u64) -> Ulid {
    Ulid::from_parts(n, u128::from(n))
}

/// Reset every thread-local registry and counter, then open an empty db.
pub fn fresh_db() -> Db {
    reset_registries();
    Db::in_memory()
}

/// Fresh db with every test owner registered.
pub fn registered_db() -> Db {
    let db = fresh_db();
    register_owners(&db);

    db
}

pub fn reset_registries() {
    relation::reset_for_tests();
    version::reset_registry_for_tests();
    metrics_reset_all();
}

pub fn register_owners(db: &Db) {
    db.register::<Purchase>().expect("bind Purchase");
    db.register::<StarredOrder>().expect("bind StarredOrder");
}

///
/// FailingVersionStore
///
/// Memory store whose outermost `end_recording` fails (discarding the
/// recording) while the shared switch is on.
///

pub struct FailingVersionStore {
    inner: MemoryVersionStore,
    depth: Cell<usize>,
    fail_commit: Rc<Cell<bool>>,
}

impl FailingVersionStore {
    pub fn new() -> (Self, Rc<Cell<bool>>) {
        let switch = Rc::new(Cell::new(false));
        let store = Self {
            inner: MemoryVersionStore::new(),
            depth: Cell::new(0),
            fail_commit: Rc::clone(&switch),
        };

        (store, switch)
    }
}

impl VersionStore for FailingVersionStore {
    fn begin_recording(&self) -> Result<(), InternalError> {
        self.inner.begin_recording()?;
        self.depth.set(self.depth.get() + 1);

        Ok(())
    }

    fn end_recording(&self) -> Result<(), InternalError> {
        let depth = self.depth.get().saturating_sub(1);
        self.depth.set(depth);

        if depth == 0 && self.fail_commit.get() {
            self.inner.discard_recording();
            return Err(InternalError::version_invariant(
                "injected commit failure",
            ));
        }

        self.inner.end_recording()
    }

    fn discard_recording(&self) {
        self.depth.set(0);
        self.inner.discard_recording();
    }

    fn is_recording(&self) -> bool {
        self.inner.is_recording()
    }

    fn record(
        &self,
        entity_name: &str,
        object_key: Value,
        data: Vec<u8>,
        repr: String,
    ) -> Result<VersionId, InternalError> {
        self.inner.record(entity_name, object_key, data, repr)
    }

    fn pin(&self, id: VersionId) -> Result<(), InternalError> {
        self.inner.pin(id)
    }

    fn get(&self, id: VersionId) -> Result<Option<Snapshot>, InternalError> {
        self.inner.get(id)
    }

    fn latest_snapshot_for(
        &self,
        entity_name: &str,
        object_key: &Value,
    ) -> Result<Option<Snapshot>, InternalError> {
        self.inner.latest_snapshot_for(entity_name, object_key)
    }

    fn versions_for(
        &self,
        entity_name: &str,
        object_key: &Value,
    ) -> Result<Vec<VersionId>, InternalError> {
        self.inner.versions_for(entity_name, object_key)
    }
}
