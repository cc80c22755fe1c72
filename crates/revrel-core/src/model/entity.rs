use crate::model::field::EntityFieldModel;

///
/// EntityModel
/// Minimal runtime model for one entity.
///

pub struct EntityModel {
    /// Fully-qualified Rust type path (for dispatch and diagnostics).
    pub path: &'static str,
    /// Stable external name used in keys and on snapshots.
    pub entity_name: &'static str,
    /// Primary key field name (must name an entry in `fields`).
    pub primary_key: &'static str,
    /// Ordered field list (authoritative for predicate validation).
    pub fields: &'static [EntityFieldModel],
}

impl EntityModel {
    /// Look up a field model by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&EntityFieldModel> {
        self.fields.iter().find(|field| field.name == name)
    }
}
