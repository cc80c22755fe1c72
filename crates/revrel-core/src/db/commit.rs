use crate::db::{Db, store::DataKey};

///
/// RowUndo
///
/// Prior state of one row touched inside an open commit window.
///

pub(crate) struct RowUndo {
    pub(crate) key: DataKey,
    pub(crate) previous: Option<Vec<u8>>,
}

///
/// CommitGuard
///
/// Failure-atomic window around one `Db` mutation.
///
/// - The outermost guard opens the row journal; nested guards (saves run
///   from pre-save hooks) join it.
/// - `finish` on the outermost guard drops the journal.
/// - Dropping an unfinished outermost guard restores every journaled row in
///   reverse write order. Nested guards never roll back on their own; the
///   error propagates to the outermost guard.
///

pub(crate) struct CommitGuard<'a> {
    db: &'a Db,
    outermost: bool,
    finished: bool,
}

impl<'a> CommitGuard<'a> {
    pub(crate) fn begin(db: &'a Db) -> Self {
        let outermost = db.open_journal();

        Self {
            db,
            outermost,
            finished: false,
        }
    }

    pub(crate) fn finish(mut self) {
        self.finished = true;
        if self.outermost {
            let _ = self.db.take_journal();
        }
    }
}

impl Drop for CommitGuard<'_> {
    fn drop(&mut self) {
        if self.finished || !self.outermost {
            return;
        }

        let undo = self.db.take_journal();
        self.db.rollback(undo);
    }
}

///
/// TESTS
///
