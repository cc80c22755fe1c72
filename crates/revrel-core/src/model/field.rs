///
/// EntityFieldModel
/// Runtime field metadata used by predicate validation and relation binding.
///

pub struct EntityFieldModel {
    /// Field name as used in predicates.
    pub name: &'static str,
    /// Runtime type shape.
    pub kind: EntityFieldKind,
}

impl EntityFieldModel {
    #[must_use]
    pub const fn new(name: &'static str, kind: EntityFieldKind) -> Self {
        Self { name, kind }
    }
}

///
/// EntityFieldKind
///
/// Minimal type surface; aligned with `Value` variants.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EntityFieldKind {
    Bool,
    Uint,
    Text,
    Ulid,

    /// Column holding a version pointer to a snapshot of `target_entity_name`.
    IndirectRelation {
        target_path: &'static str,
        target_entity_name: &'static str,
    },
}
