//! Core runtime for revrel: version-pinned indirect relations, the row store
//! and version store they sit on, the form adapter, and the vocabulary
//! exported via the `prelude`.
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod config;
pub mod db;
pub mod error;
pub mod form;
pub mod model;
pub mod obs;
pub mod relation;
pub mod serialize;
pub mod traits;
pub mod value;
pub mod version;

// test
#[cfg(test)]
pub(crate) mod test_support;

pub use error::InternalError as Error;

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No errors, stores, serializers, or helpers are re-exported here.
///

pub mod prelude {
    pub use crate::{
        db::{Db, Predicate, SaveMode},
        model::{
            entity::EntityModel,
            field::{EntityFieldKind, EntityFieldModel},
        },
        relation::{IndirectRelation, IndirectRelationField, Related, VersionProxy},
        traits::{EntityKey, EntityKind, Path},
        value::Value,
        version::{MemoryVersionStore, VersionId, VersionStore},
    };
}
