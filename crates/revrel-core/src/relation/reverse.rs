use crate::{
    db::{Db, Predicate, Query},
    error::InternalError,
    obs::sink::{MetricsEvent, record},
    relation::registry,
    traits::{EntityKey, EntityKind},
};
use std::marker::PhantomData;

///
/// ReverseRelation
///
/// Target-side view of an indirect relation: the `O` rows whose pointer
/// names any snapshot of a given `T`.
///
/// The lookup is a single `VersionOf` filter over `O`; the query executor
/// expands it against the version store, so pointers are never resolved
/// one by one.
///

#[derive(Debug)]
pub struct ReverseRelation<T: EntityKind, O: EntityKind> {
    field: &'static str,
    _marker: PhantomData<fn() -> (T, O)>,
}

impl<T: EntityKind, O: EntityKind> ReverseRelation<T, O> {
    pub(crate) const fn new(field: &'static str) -> Self {
        Self {
            field,
            _marker: PhantomData,
        }
    }

    /// Look up a bound reverse accessor on `T` by its related name.
    pub fn by_name(related_name: &str) -> Result<Self, InternalError> {
        let Some(binding) = registry::reverse_binding(T::PATH, related_name) else {
            return Err(InternalError::misuse(format!(
                "no reverse relation '{related_name}' registered on {}",
                T::PATH
            )));
        };

        if binding.owner_path != O::PATH {
            return Err(InternalError::misuse(format!(
                "reverse relation '{related_name}' on {} belongs to {}, not {}",
                T::PATH,
                binding.owner_path,
                O::PATH
            )));
        }

        Ok(Self::new(binding.field))
    }

    #[must_use]
    pub const fn field(&self) -> &'static str {
        self.field
    }

    #[must_use]
    pub fn predicate(&self, key: T::Key) -> Predicate {
        Predicate::version_of(self.field, T::ENTITY_NAME, key.to_value())
    }

    #[must_use]
    pub fn query<'a>(&self, db: &'a Db, target: &T) -> Query<'a, O> {
        db.query::<O>().filter(self.predicate(target.key()))
    }

    pub fn all(&self, db: &Db, target: &T) -> Result<Vec<O>, InternalError> {
        let rows = self.query(db, target).all()?;

        record(MetricsEvent::ReverseLookup {
            entity_path: O::PATH,
            rows: rows.len() as u64,
        });

        Ok(rows)
    }

    pub fn count(&self, db: &Db, target: &T) -> Result<usize, InternalError> {
        Ok(self.all(db, target)?.len())
    }

    pub fn exists(&self, db: &Db, target: &T) -> Result<bool, InternalError> {
        self.query(db, target).exists()
    }
}
