use crate::{
    error::InternalError,
    value::Value,
    version::{RevisionId, Snapshot, VersionId, VersionStore},
};
use std::{
    cell::RefCell,
    collections::{BTreeMap, BTreeSet},
};

type ObjectKey = (String, Value);

///
/// MemoryVersionStore
///
/// In-process version store. Committed snapshots are append-only. The open
/// recording (if any) rewrites an object's staged snapshot in place until a
/// pointer pins it; later changes to that object stage a fresh id.
///

#[derive(Default)]
pub struct MemoryVersionStore {
    state: RefCell<State>,
}

#[derive(Default)]
struct State {
    snapshots: BTreeMap<VersionId, Snapshot>,
    by_object: BTreeMap<ObjectKey, Vec<VersionId>>,
    next_version: u64,
    next_revision: u64,
    recording: Option<Recording>,
}

struct Recording {
    depth: usize,
    revision: RevisionId,
    staged: BTreeMap<ObjectKey, Vec<Snapshot>>,
    pinned: BTreeSet<VersionId>,
}

impl Recording {
    fn latest(&self, object: &ObjectKey) -> Option<&Snapshot> {
        self.staged.get(object).and_then(|snapshots| snapshots.last())
    }

    fn find(&self, id: VersionId) -> Option<&Snapshot> {
        self.staged
            .values()
            .flatten()
            .find(|snapshot| snapshot.id == id)
    }
}

impl State {
    fn allocate_version(&mut self) -> VersionId {
        self.next_version += 1;
        VersionId::new(self.next_version)
    }

    fn allocate_revision(&mut self) -> RevisionId {
        self.next_revision += 1;
        RevisionId::new(self.next_revision)
    }

    fn staged(&self, object: &ObjectKey) -> Option<&Snapshot> {
        self.recording
            .as_ref()
            .and_then(|recording| recording.latest(object))
    }

    // Move every staged snapshot into the committed maps.
    fn commit(&mut self, recording: Recording) {
        for (object, snapshots) in recording.staged {
            let ids = self.by_object.entry(object).or_default();
            for snapshot in snapshots {
                ids.push(snapshot.id);
                self.snapshots.insert(snapshot.id, snapshot);
            }
        }
    }
}

impl MemoryVersionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of committed snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.borrow().snapshots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl VersionStore for MemoryVersionStore {
    fn begin_recording(&self) -> Result<(), InternalError> {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;

        if let Some(recording) = state.recording.as_mut() {
            recording.depth += 1;
            return Ok(());
        }

        let revision = state.allocate_revision();
        state.recording = Some(Recording {
            depth: 1,
            revision,
            staged: BTreeMap::new(),
            pinned: BTreeSet::new(),
        });

        Ok(())
    }

    fn end_recording(&self) -> Result<(), InternalError> {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;

        let Some(recording) = state.recording.as_mut() else {
            return Err(InternalError::version_invariant(
                "end_recording called without an open recording",
            ));
        };

        recording.depth -= 1;
        if recording.depth > 0 {
            return Ok(());
        }

        if let Some(recording) = state.recording.take() {
            state.commit(recording);
        }

        Ok(())
    }

    fn discard_recording(&self) {
        self.state.borrow_mut().recording = None;
    }

    fn is_recording(&self) -> bool {
        self.state.borrow().recording.is_some()
    }

    fn record(
        &self,
        entity_name: &str,
        object_key: Value,
        data: Vec<u8>,
        repr: String,
    ) -> Result<VersionId, InternalError> {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        let object = (entity_name.to_string(), object_key);

        let Some(recording) = state.recording.as_mut() else {
            return Err(InternalError::version_invariant(format!(
                "snapshot of {} '{}' recorded outside a recording scope",
                object.0, object.1
            )));
        };

        // An unpinned staged snapshot is rewritten in place; a pinned one is
        // kept as long as the data is unchanged.
        if let Some(last) = recording
            .staged
            .get_mut(&object)
            .and_then(|snapshots| snapshots.last_mut())
        {
            if !recording.pinned.contains(&last.id) {
                last.data = data;
                last.repr = repr;
                return Ok(last.id);
            }
            if last.data == data {
                return Ok(last.id);
            }
        }

        let revision = recording.revision;
        let id = state.allocate_version();

        let snapshot = Snapshot {
            id,
            revision,
            entity_name: object.0.clone(),
            object_key: object.1.clone(),
            data,
            repr,
        };
        if let Some(recording) = state.recording.as_mut() {
            recording.staged.entry(object).or_default().push(snapshot);
        }

        Ok(id)
    }

    fn pin(&self, id: VersionId) -> Result<(), InternalError> {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;

        if state.snapshots.contains_key(&id) {
            return Ok(());
        }

        match state.recording.as_mut() {
            Some(recording) if recording.find(id).is_some() => {
                recording.pinned.insert(id);
                Ok(())
            }
            _ => Err(InternalError::version_invariant(format!(
                "cannot pin unknown snapshot {id}"
            ))),
        }
    }

    fn get(&self, id: VersionId) -> Result<Option<Snapshot>, InternalError> {
        let state = self.state.borrow();

        if let Some(snapshot) = state.snapshots.get(&id) {
            return Ok(Some(snapshot.clone()));
        }

        Ok(state
            .recording
            .as_ref()
            .and_then(|recording| recording.find(id))
            .cloned())
    }

    fn latest_snapshot_for(
        &self,
        entity_name: &str,
        object_key: &Value,
    ) -> Result<Option<Snapshot>, InternalError> {
        let state = self.state.borrow();
        let object = (entity_name.to_string(), object_key.clone());

        // Staged ids are allocated after every committed id.
        if let Some(snapshot) = state.staged(&object) {
            return Ok(Some(snapshot.clone()));
        }

        let latest = state
            .by_object
            .get(&object)
            .and_then(|ids| ids.last())
            .and_then(|id| state.snapshots.get(id))
            .cloned();

        Ok(latest)
    }

    fn versions_for(
        &self,
        entity_name: &str,
        object_key: &Value,
    ) -> Result<Vec<VersionId>, InternalError> {
        let state = self.state.borrow();
        let object = (entity_name.to_string(), object_key.clone());

        let mut ids = state.by_object.get(&object).cloned().unwrap_or_default();
        if let Some(staged) = state
            .recording
            .as_ref()
            .and_then(|recording| recording.staged.get(&object))
        {
            ids.extend(staged.iter().map(|snapshot| snapshot.id));
        }

        Ok(ids)
    }
}
