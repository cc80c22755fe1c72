use crate::{error::InternalError, version::VersionStore};

///
/// RevisionScope
///
/// Guard around one begin/end recording region.
///
/// - `finish` ends the region; at the outermost level the store commits.
/// - Dropping an unfinished scope discards the whole recording, so callers
///   never observe half-written snapshots after an error.
///

pub struct RevisionScope<'a> {
    store: &'a dyn VersionStore,
    finished: bool,
}

impl<'a> RevisionScope<'a> {
    pub fn begin(store: &'a dyn VersionStore) -> Result<Self, InternalError> {
        store.begin_recording()?;

        Ok(Self {
            store,
            finished: false,
        })
    }

    pub fn finish(mut self) -> Result<(), InternalError> {
        self.finished = true;
        self.store.end_recording()
    }
}

impl Drop for RevisionScope<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.store.discard_recording();
        }
    }
}
