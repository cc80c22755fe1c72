use crate::{
    db::Db,
    error::InternalError,
    model::field::EntityFieldKind,
    obs::sink::{MetricsEvent, record},
    traits::EntityKind,
    value::Value,
    version::VersionStore,
};
use std::marker::PhantomData;

///
/// Predicate
///
/// Row filter evaluated against `EntityKind::get_value`.
///
/// `VersionOf` addresses "any snapshot of (entity, key)" through an indirect
/// relation column. Execution lowers it into `In` over the version store's
/// ids for that object, so the whole filter runs as one pass over the
/// owning rows.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Predicate {
    True,
    Eq {
        field: &'static str,
        value: Value,
    },
    In {
        field: &'static str,
        values: Vec<Value>,
    },
    And(Vec<Self>),
    Or(Vec<Self>),
    Not(Box<Self>),
    VersionOf {
        field: &'static str,
        entity: &'static str,
        key: Value,
    },
}

impl Predicate {
    #[must_use]
    pub fn eq(field: &'static str, value: impl Into<Value>) -> Self {
        Self::Eq {
            field,
            value: value.into(),
        }
    }

    #[must_use]
    pub fn one_of(field: &'static str, values: impl IntoIterator<Item = Value>) -> Self {
        Self::In {
            field,
            values: values.into_iter().collect(),
        }
    }

    #[must_use]
    pub const fn version_of(field: &'static str, entity: &'static str, key: Value) -> Self {
        Self::VersionOf { field, entity, key }
    }

    /// Conjunction; `True` operands collapse away.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        match (self, other) {
            (Self::True, p) | (p, Self::True) => p,
            (Self::And(mut left), Self::And(right)) => {
                left.extend(right);
                Self::And(left)
            }
            (Self::And(mut left), p) => {
                left.push(p);
                Self::And(left)
            }
            (p, q) => Self::And(vec![p, q]),
        }
    }

    #[must_use]
    pub fn or(self, other: Self) -> Self {
        Self::Or(vec![self, other])
    }

    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Check every referenced field against the entity model.
    pub fn validate<E: EntityKind>(&self) -> Result<(), InternalError> {
        match self {
            Self::True => Ok(()),
            Self::Eq { field, .. } | Self::In { field, .. } => {
                if E::MODEL.field(field).is_none() {
                    return Err(InternalError::query_unsupported(format!(
                        "unknown field '{field}' on {}",
                        E::PATH
                    )));
                }

                Ok(())
            }
            Self::And(children) | Self::Or(children) => {
                children.iter().try_for_each(Self::validate::<E>)
            }
            Self::Not(inner) => inner.validate::<E>(),
            Self::VersionOf { field, entity, .. } => {
                let Some(model) = E::MODEL.field(field) else {
                    return Err(InternalError::query_unsupported(format!(
                        "unknown field '{field}' on {}",
                        E::PATH
                    )));
                };

                match model.kind {
                    EntityFieldKind::IndirectRelation {
                        target_entity_name, ..
                    } if target_entity_name == *entity => Ok(()),
                    _ => Err(InternalError::query_unsupported(format!(
                        "field '{field}' on {} is not an indirect relation to '{entity}'",
                        E::PATH
                    ))),
                }
            }
        }
    }

    /// Replace every `VersionOf` with the version ids it currently denotes.
    pub fn lower(&self, versions: &dyn VersionStore) -> Result<Self, InternalError> {
        Ok(match self {
            Self::VersionOf { field, entity, key } => {
                let ids = versions.versions_for(entity, key)?;

                Self::In {
                    field: *field,
                    values: ids.into_iter().map(Value::Version).collect(),
                }
            }
            Self::And(children) => Self::And(
                children
                    .iter()
                    .map(|child| child.lower(versions))
                    .collect::<Result<_, _>>()?,
            ),
            Self::Or(children) => Self::Or(
                children
                    .iter()
                    .map(|child| child.lower(versions))
                    .collect::<Result<_, _>>()?,
            ),
            Self::Not(inner) => Self::Not(Box::new(inner.lower(versions)?)),
            other => other.clone(),
        })
    }

    /// Evaluate a lowered predicate against one entity.
    #[must_use]
    pub fn eval<E: EntityKind>(&self, entity: &E) -> bool {
        match self {
            Self::True => true,
            Self::Eq { field, value } => entity.get_value(field).as_ref() == Some(value),
            Self::In { field, values } => entity
                .get_value(field)
                .is_some_and(|actual| values.contains(&actual)),
            Self::And(children) => children.iter().all(|child| child.eval(entity)),
            Self::Or(children) => children.iter().any(|child| child.eval(entity)),
            Self::Not(inner) => !inner.eval(entity),

            // Unlowered version filters never match.
            Self::VersionOf { .. } => false,
        }
    }
}

///
/// Query
///
/// Filtered scan over one entity's rows, in key order.
///

pub struct Query<'a, E: EntityKind> {
    db: &'a Db,
    predicate: Predicate,
    limit: Option<usize>,
    _marker: PhantomData<E>,
}

impl<'a, E: EntityKind> Query<'a, E> {
    pub(crate) const fn new(db: &'a Db) -> Self {
        Self {
            db,
            predicate: Predicate::True,
            limit: None,
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicate = self.predicate.and(predicate);
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub const fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    pub fn all(&self) -> Result<Vec<E>, InternalError> {
        self.predicate.validate::<E>()?;
        let lowered = self.predicate.lower(self.db.versions())?;

        let rows = self.db.rows::<E>()?;
        record(MetricsEvent::RowsScanned {
            entity_path: E::PATH,
            rows_scanned: rows.len() as u64,
        });

        let matched = rows.into_iter().filter(|entity| lowered.eval(entity));
        let out = match self.limit {
            Some(limit) => matched.take(limit).collect(),
            None => matched.collect(),
        };

        Ok(out)
    }

    pub fn first(&self) -> Result<Option<E>, InternalError> {
        Ok(self.all()?.into_iter().next())
    }

    pub fn count(&self) -> Result<usize, InternalError> {
        Ok(self.all()?.len())
    }

    pub fn exists(&self) -> Result<bool, InternalError> {
        Ok(self.first()?.is_some())
    }
}
