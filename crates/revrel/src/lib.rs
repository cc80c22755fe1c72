//! ## Crate layout
//! - `core`: runtime row store, version store, indirect relation fields,
//!   form adapter, and observability.
//!
//! The `prelude` module mirrors the surface used by application code that
//! declares entities and wires their indirect relations.

pub use revrel_core as core;

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use crate::core::{
    Error, config, db, error, form, model, obs, relation, serialize, traits, value, version,
};

///
/// Prelude
/// using _ brings traits into scope and avoids name conflicts
///

pub mod prelude {
    pub use crate::core::{
        config::{RevrelConfig, SnapshotPolicy},
        db::{Db, Predicate, SaveMode},
        form::{Choice, ChoiceSet, IndirectChoiceField, IndirectSelect},
        model::{
            entity::EntityModel,
            field::{EntityFieldKind, EntityFieldModel},
        },
        relation::{
            Assigned, IndirectRelation, IndirectRelationField, IndirectRelationHook, Related,
            ReverseRelation, VersionProxy,
        },
        traits::{EntityKey, EntityKind, Path},
        value::Value,
        version::{MemoryVersionStore, VersionId, VersionStore},
    };
    pub use serde::{Deserialize, Serialize};
}
