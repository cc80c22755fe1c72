// -----------------------------------------------------------------------------
// Standard re-exports for `traits::X` ergonomics
// -----------------------------------------------------------------------------

pub use serde::{Deserialize, Serialize, de::DeserializeOwned};
pub use std::{fmt::Debug, hash::Hash};

use crate::{model::entity::EntityModel, relation::IndirectRelationHook, value::Value};
use ulid::Ulid;

// ============================================================================
// FOUNDATIONAL KINDS
// ============================================================================

///
/// Path
/// Fully-qualified type path.
///

pub trait Path {
    const PATH: &'static str;
}

// ============================================================================
// ENTITY IDENTITY
// ============================================================================

///
/// EntityKey
///
/// Primitive type used as an entity's primary key.
///
/// ## Semantics
/// - `to_value` is the canonical key projection stored in row keys and on
///   snapshots (`Snapshot::object_key`)
/// - `parse` accepts the `Display` form of that projection, which is what
///   form submissions carry
///

pub trait EntityKey: Copy + Debug + Eq + Ord + Serialize + DeserializeOwned + 'static {
    fn to_value(&self) -> Value;

    fn from_value(value: &Value) -> Option<Self>;

    fn parse(raw: &str) -> Option<Self>;
}

impl EntityKey for Ulid {
    fn to_value(&self) -> Value {
        Value::Ulid(*self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Ulid(v) => Some(*v),
            _ => None,
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        Self::from_string(raw).ok()
    }
}

impl EntityKey for u64 {
    fn to_value(&self) -> Value {
        Value::Uint(*self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Uint(v) => Some(*v),
            _ => None,
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        raw.parse().ok()
    }
}

// ============================================================================
// ENTITY RUNTIME
// ============================================================================

///
/// EntityKind
///
/// A persisted entity type.
///
/// Owning entities list their indirect relation fields through
/// `indirect_relations`; `Db::register` binds them and `Db::save` runs their
/// pre-save hooks before the row is written.
///

pub trait EntityKind: Path + Clone + Debug + Serialize + DeserializeOwned + 'static {
    type Key: EntityKey;

    const ENTITY_NAME: &'static str;
    const MODEL: &'static EntityModel;

    fn key(&self) -> Self::Key;

    /// Field value as seen by predicates; `None` for unknown fields.
    fn get_value(&self, field: &str) -> Option<Value>;

    /// Human-readable representation, recorded on snapshots and used as
    /// the choice label in forms.
    fn repr(&self) -> String {
        format!("{} object ({})", Self::ENTITY_NAME, self.key().to_value())
    }

    fn indirect_relations() -> Vec<&'static dyn IndirectRelationHook<Self>> {
        Vec::new()
    }
}
