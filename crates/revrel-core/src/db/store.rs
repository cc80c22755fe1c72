use crate::{
    traits::{EntityKey, EntityKind},
    value::Value,
};
use std::{collections::BTreeMap, fmt};

///
/// DataKey
///
/// Row identity: stable entity name plus the key's value projection.
/// Ordering groups rows by entity, then by key.
///

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct DataKey {
    pub entity: &'static str,
    pub key: Value,
}

impl DataKey {
    #[must_use]
    pub fn of<E: EntityKind>(key: &E::Key) -> Self {
        Self {
            entity: E::ENTITY_NAME,
            key: key.to_value(),
        }
    }
}

impl fmt::Display for DataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity, self.key)
    }
}

///
/// DataStore
///
/// Row bytes keyed by [`DataKey`]. Values are opaque CBOR rows.
///

#[derive(Default)]
pub struct DataStore {
    rows: BTreeMap<DataKey, Vec<u8>>,
}

impl DataStore {
    #[must_use]
    pub fn get(&self, key: &DataKey) -> Option<&[u8]> {
        self.rows.get(key).map(Vec::as_slice)
    }

    #[must_use]
    pub fn contains(&self, key: &DataKey) -> bool {
        self.rows.contains_key(key)
    }

    pub(crate) fn insert(&mut self, key: DataKey, row: Vec<u8>) -> Option<Vec<u8>> {
        self.rows.insert(key, row)
    }

    pub(crate) fn remove(&mut self, key: &DataKey) -> Option<Vec<u8>> {
        self.rows.remove(key)
    }

    /// Rows of one entity, in key order.
    pub fn rows_for(&self, entity: &'static str) -> impl Iterator<Item = (&DataKey, &[u8])> {
        self.rows
            .iter()
            .filter(move |(key, _)| key.entity == entity)
            .map(|(key, row)| (key, row.as_slice()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
