//! Module: db
//! Responsibility: row persistence, failure-atomic saves and filtered scans.
//! Does not own: snapshot storage (delegated to a `VersionStore`).
//! Boundary: `save` runs every indirect-relation pre-save hook of the owning
//! type before its row is written, and stages a snapshot when the entity is
//! registered for versioning and a recording scope is open.

mod commit;
pub mod query;
pub mod store;


use crate::{
    config::RevrelConfig,
    error::InternalError,
    obs::sink::{ExecKind, MetricsEvent, Span, record},
    relation::Related,
    serialize::{deserialize_bounded, serialize},
    traits::{EntityKey, EntityKind},
    version::{MemoryVersionStore, VersionId, VersionStore},
};
use commit::{CommitGuard, RowUndo};
use std::{
    cell::{Ref, RefCell},
    fmt,
};

// re-exports
pub use query::{Predicate, Query};
pub use store::{DataKey, DataStore};

///
/// SaveMode
///
/// Whether a save created the row or replaced an existing one.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SaveMode {
    Insert,
    Update,
}

///
/// Db
///
/// Single-threaded handle over the row store and its version store.
/// Interior mutability keeps every operation on `&self`, so pre-save hooks
/// can run nested saves through the same handle.
///

pub struct Db {
    data: RefCell<DataStore>,
    journal: RefCell<Option<Vec<RowUndo>>>,
    versions: Box<dyn VersionStore>,
    config: RevrelConfig,
}

impl Db {
    // ======================================================================
    // Construction & configuration
    // ======================================================================

    #[must_use]
    pub fn new(versions: impl VersionStore + 'static) -> Self {
        Self::with_config(versions, RevrelConfig::default())
    }

    #[must_use]
    pub fn with_config(versions: impl VersionStore + 'static, config: RevrelConfig) -> Self {
        Self {
            data: RefCell::new(DataStore::default()),
            journal: RefCell::new(None),
            versions: Box::new(versions),
            config,
        }
    }

    /// Db backed by a fresh [`MemoryVersionStore`].
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(MemoryVersionStore::new())
    }

    #[must_use]
    pub const fn config(&self) -> &RevrelConfig {
        &self.config
    }

    #[must_use]
    pub const fn debug(&self) -> bool {
        self.config.debug
    }

    #[must_use]
    pub fn versions(&self) -> &dyn VersionStore {
        self.versions.as_ref()
    }

    /// Read-only view of the row store.
    #[must_use]
    pub fn data(&self) -> Ref<'_, DataStore> {
        self.data.borrow()
    }

    // Arguments are formatted only when the debug flag is set.
    pub(crate) fn debug_log(&self, args: fmt::Arguments<'_>) {
        if self.config.debug {
            tracing::debug!(target: "revrel", "{args}");
        }
    }

    // ======================================================================
    // Registration
    // ======================================================================

    /// Bind every indirect relation field `E` declares.
    pub fn register<E: EntityKind>(&self) -> Result<(), InternalError> {
        for hook in E::indirect_relations() {
            hook.bind()?;
            self.debug_log(format_args!(
                "bound indirect relation {}.{}",
                E::PATH,
                hook.field_name()
            ));
        }

        Ok(())
    }

    /// Register `E` for snapshotting without binding any relation to it.
    pub fn register_versioned<E: EntityKind>(&self) {
        self.versions.register(E::ENTITY_NAME);
    }

    // ======================================================================
    // Writes
    // ======================================================================

    /// Persist `entity`, running its indirect-relation hooks first.
    ///
    /// Every row written during this call (including rows written by nested
    /// saves that hooks trigger) is rolled back if any step fails.
    pub fn save<E: EntityKind>(&self, entity: &mut E) -> Result<SaveMode, InternalError> {
        let mut span = Span::<E>::new(ExecKind::Save);
        let guard = CommitGuard::begin(self);

        let key = DataKey::of::<E>(&entity.key());
        let mode = if self.data.borrow().contains(&key) {
            SaveMode::Update
        } else {
            SaveMode::Insert
        };

        // Phase 1: resolve pending relation writes into pointers.
        for hook in E::indirect_relations() {
            hook.pre_save(self, entity, mode)?;
        }

        // Phase 2: write the row and stage a snapshot if versioned.
        let row = serialize(entity)?;
        self.write_row(key.clone(), row.clone());

        if self.versions.is_recording() && self.versions.is_registered(E::ENTITY_NAME) {
            self.record_snapshot(entity, &key, row)?;
        }

        guard.finish();
        span.set_rows(1);
        self.debug_log(format_args!("saved {key} ({mode:?})"));

        Ok(mode)
    }

    /// Persist a related value obtained from an indirect relation read.
    ///
    /// Only live entities can be saved; a version proxy is a historical view.
    pub fn save_related<T: EntityKind>(
        &self,
        related: &mut Related<T>,
    ) -> Result<SaveMode, InternalError> {
        match related {
            Related::Entity(entity) => self.save(entity),
            Related::Proxy(proxy) => Err(InternalError::misuse(format!(
                "cannot save {proxy}: version proxies are read-only snapshots of {}",
                T::PATH
            ))),
        }
    }

    /// Remove the row for `key`; returns whether a row existed.
    pub fn delete<E: EntityKind>(&self, key: E::Key) -> Result<bool, InternalError> {
        let mut span = Span::<E>::new(ExecKind::Delete);
        let guard = CommitGuard::begin(self);

        let removed = self.remove_row(&DataKey::of::<E>(&key)).is_some();

        guard.finish();
        span.set_rows(u64::from(removed));

        Ok(removed)
    }

    fn record_snapshot<E: EntityKind>(
        &self,
        entity: &E,
        key: &DataKey,
        row: Vec<u8>,
    ) -> Result<VersionId, InternalError> {
        let max = self.config.max_snapshot_bytes;
        if row.len() > max {
            return Err(InternalError::snapshot_creation(
                E::ENTITY_NAME,
                &key.key,
                format!("snapshot of {} bytes exceeds limit {max}", row.len()),
            ));
        }

        let id = self
            .versions
            .record(E::ENTITY_NAME, key.key.clone(), row, entity.repr())
            .map_err(|err| InternalError::snapshot_creation(E::ENTITY_NAME, &key.key, err))?;

        record(MetricsEvent::SnapshotRecorded {
            entity_path: E::PATH,
        });
        self.debug_log(format_args!("staged snapshot {id} of {key}"));

        Ok(id)
    }

    // ======================================================================
    // Reads
    // ======================================================================

    pub fn load<E: EntityKind>(&self, key: E::Key) -> Result<Option<E>, InternalError> {
        let mut span = Span::<E>::new(ExecKind::Load);
        let data_key = DataKey::of::<E>(&key);

        let data = self.data.borrow();
        let Some(row) = data.get(&data_key) else {
            return Ok(None);
        };

        let entity = decode_row::<E>(&data_key, row)?;
        span.set_rows(1);

        Ok(Some(entity))
    }

    /// Like [`Db::load`], but a missing row is a NotFound error.
    pub fn get<E: EntityKind>(&self, key: E::Key) -> Result<E, InternalError> {
        self.load::<E>(key)?.ok_or_else(|| {
            InternalError::store_not_found(format!("{}:{}", E::ENTITY_NAME, key.to_value()))
        })
    }

    #[must_use]
    pub const fn query<E: EntityKind>(&self) -> Query<'_, E> {
        Query::new(self)
    }

    /// Decode every row of `E`, in key order.
    pub(crate) fn rows<E: EntityKind>(&self) -> Result<Vec<E>, InternalError> {
        let data = self.data.borrow();

        data.rows_for(E::ENTITY_NAME)
            .map(|(key, row)| decode_row::<E>(key, row))
            .collect()
    }

    // ======================================================================
    // Row journal
    // ======================================================================

    pub(crate) fn write_row(&self, key: DataKey, row: Vec<u8>) {
        let previous = self.data.borrow_mut().insert(key.clone(), row);
        self.journal_push(key, previous);
    }

    pub(crate) fn remove_row(&self, key: &DataKey) -> Option<Vec<u8>> {
        let previous = self.data.borrow_mut().remove(key);
        if previous.is_some() {
            self.journal_push(key.clone(), previous.clone());
        }

        previous
    }

    fn journal_push(&self, key: DataKey, previous: Option<Vec<u8>>) {
        if let Some(journal) = self.journal.borrow_mut().as_mut() {
            journal.push(RowUndo { key, previous });
        }
    }

    // Returns true when this call opened the journal.
    fn open_journal(&self) -> bool {
        let mut journal = self.journal.borrow_mut();
        if journal.is_some() {
            return false;
        }

        *journal = Some(Vec::new());
        true
    }

    fn take_journal(&self) -> Vec<RowUndo> {
        self.journal
            .try_borrow_mut()
            .ok()
            .and_then(|mut journal| journal.take())
            .unwrap_or_default()
    }

    // Best effort: never panics while unwinding.
    fn rollback(&self, undo: Vec<RowUndo>) {
        let Ok(mut data) = self.data.try_borrow_mut() else {
            return;
        };

        for entry in undo.into_iter().rev() {
            match entry.previous {
                Some(row) => {
                    data.insert(entry.key, row);
                }
                None => {
                    data.remove(&entry.key);
                }
            }
        }
    }
}

fn decode_row<E: EntityKind>(key: &DataKey, row: &[u8]) -> Result<E, InternalError> {
    deserialize_bounded(row, crate::serialize::MAX_ROW_BYTES)
        .map_err(|err| InternalError::store_corruption(format!("row {key} failed to decode: {err}")))
}
