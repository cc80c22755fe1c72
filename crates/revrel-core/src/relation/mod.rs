//! Module: relation
//! Responsibility: version-pinned indirect relations.
//! Does not own: snapshot storage or row persistence.
//! Boundary: owning entities declare `IndirectRelationField` statics and list
//! them from `EntityKind::indirect_relations`; `Db::save` drives the
//! pre-save hook, accessors resolve pointers through the version store.
//!
//! An indirect relation stores a `VersionId` rather than the related
//! entity's key. Reads yield the pinned snapshot (as a `VersionProxy`);
//! writes accept the live entity and pin its current state on save.

mod accessor;
mod field;
mod proxy;
mod registry;
mod reverse;
mod slot;


use crate::{
    db::{Db, SaveMode},
    error::InternalError,
};

// re-exports
pub use accessor::IndirectAccessor;
pub use field::IndirectRelationField;
pub use proxy::{Related, VersionProxy};
pub use registry::{FieldBinding, ReverseBinding, field_binding, reset_for_tests, reverse_binding};
pub use reverse::ReverseRelation;
pub use slot::{Assigned, IndirectRelation};

///
/// IndirectRelationHook
///
/// Type-erased view of one indirect relation field of owner `O`, as seen by
/// registration and by `Db::save`.
///

pub trait IndirectRelationHook<O> {
    fn field_name(&self) -> &'static str;

    /// Register the field and its reverse accessor. Idempotent.
    fn bind(&self) -> Result<(), InternalError>;

    /// Turn the pending write (if any) into the stored pointer.
    fn pre_save(&self, db: &Db, owner: &mut O, mode: SaveMode) -> Result<(), InternalError>;
}
