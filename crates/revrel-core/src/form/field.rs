use crate::{
    db::{Db, Predicate, Query},
    error::InternalError,
    form::{Choice, ChoiceSet, IndirectSelect},
    obs::sink::{MetricsEvent, record},
    traits::{EntityKey, EntityKind},
    value::Value,
    version::VersionId,
};
use std::marker::PhantomData;

///
/// IndirectChoiceField
///
/// Form field for an indirect relation to `T`.
/// Choices and validation run against live `T` rows under the declaring
/// field's constraints.
///

pub struct IndirectChoiceField<T: EntityKind> {
    name: &'static str,
    required: bool,
    limit_choices_to: Option<fn() -> Predicate>,
    widget: IndirectSelect,
    _marker: PhantomData<fn() -> T>,
}

impl<T: EntityKind> IndirectChoiceField<T> {
    #[must_use]
    pub const fn new(
        name: &'static str,
        required: bool,
        limit_choices_to: Option<fn() -> Predicate>,
    ) -> Self {
        Self {
            name,
            required,
            limit_choices_to,
            widget: IndirectSelect::new(name),
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub const fn is_required(&self) -> bool {
        self.required
    }

    #[must_use]
    pub const fn widget(&self) -> &IndirectSelect {
        &self.widget
    }

    fn constraints(&self) -> Predicate {
        self.limit_choices_to.map_or(Predicate::True, |f| f())
    }

    /// Live `T` rows offered to the user.
    #[must_use]
    pub fn queryset<'a>(&self, db: &'a Db) -> Query<'a, T> {
        db.query::<T>().filter(self.constraints())
    }

    /// Choice set in key order, labelled by `EntityKind::repr`.
    pub fn choices(&self, db: &Db) -> Result<ChoiceSet, InternalError> {
        let choices = self
            .queryset(db)
            .all()?
            .into_iter()
            .map(|entity| Choice {
                value: entity.key().to_value(),
                label: entity.repr(),
            })
            .collect::<Vec<_>>();

        Ok(choices.into())
    }

    /// Turn a raw submission into a live entity (or `None` when empty).
    pub fn clean(&self, db: &Db, raw: Option<&str>) -> Result<Option<T>, InternalError> {
        let raw = raw.map(str::trim).filter(|raw| !raw.is_empty());

        let Some(raw) = raw else {
            if self.required {
                record(MetricsEvent::ValidationRejected {
                    entity_path: T::PATH,
                });
                return Err(InternalError::validation(
                    T::ENTITY_NAME,
                    "",
                    "is required",
                ));
            }

            return Ok(None);
        };

        let Some(key) = T::Key::parse(raw) else {
            record(MetricsEvent::ValidationRejected {
                entity_path: T::PATH,
            });
            return Err(InternalError::validation(
                T::ENTITY_NAME,
                raw,
                "is not a valid key",
            ));
        };

        validate_choice::<T>(db, key, self.constraints()).map(Some)
    }

    /// Logical key to pre-select for a stored pointer.
    pub fn initial_value(
        &self,
        db: &Db,
        pointer: Option<VersionId>,
    ) -> Result<Option<Value>, InternalError> {
        self.widget.format_value::<T>(db, pointer)
    }

    /// Render the `<select>` with the pointer's logical key pre-selected.
    pub fn render(&self, db: &Db, pointer: Option<VersionId>) -> Result<String, InternalError> {
        let choices = self.choices(db)?;
        let selected = self.initial_value(db, pointer)?;

        Ok(self
            .widget
            .render(&choices, selected.as_ref(), !self.required))
    }
}

/// The row of `T` named by `key`, if it satisfies `constraints`.
pub(crate) fn validate_choice<T: EntityKind>(
    db: &Db,
    key: T::Key,
    constraints: Predicate,
) -> Result<T, InternalError> {
    let found = db
        .query::<T>()
        .filter(Predicate::eq(T::MODEL.primary_key, key.to_value()))
        .filter(constraints)
        .first()?;

    found.ok_or_else(|| {
        record(MetricsEvent::ValidationRejected {
            entity_path: T::PATH,
        });
        InternalError::validation(
            T::ENTITY_NAME,
            key.to_value(),
            "is not one of the available choices",
        )
    })
}
