use crate::{
    config::SnapshotPolicy,
    db::{Db, Predicate, SaveMode},
    error::{InternalError, RelationErrorKind},
    form::{IndirectChoiceField, validate_choice},
    model::field::EntityFieldKind,
    obs::sink::{MetricsEvent, record},
    relation::{
        IndirectRelationHook,
        accessor::IndirectAccessor,
        proxy::Related,
        registry::{self, FieldBinding},
        reverse::ReverseRelation,
        slot::{Assigned, IndirectRelation, PendingWrite},
    },
    serialize::serialize,
    traits::{EntityKey, EntityKind},
    value::Value,
    version::{self, RevisionScope, VersionId},
};

///
/// IndirectRelationField
///
/// Declaration of a relation from owner `O` to a pinned snapshot of `T`.
/// Declared as a `static` beside the owning type:
///
/// ```ignore
/// static PURCHASE_SUPPLIER: IndirectRelationField<Purchase, Supplier> =
///     IndirectRelationField::new("supplier", supplier_slot, supplier_slot_mut)
///         .related_name("purchases");
/// ```
///
/// The matching model field must be `EntityFieldKind::IndirectRelation`
/// targeting `T`.
///

pub struct IndirectRelationField<O: EntityKind, T: EntityKind> {
    name: &'static str,
    related_name: Option<&'static str>,
    nullable: bool,
    limit_choices_to: Option<fn() -> Predicate>,
    accessor: IndirectAccessor<O, T>,
}

impl<O: EntityKind, T: EntityKind> IndirectRelationField<O, T> {
    // ======================================================================
    // Declaration
    // ======================================================================

    #[must_use]
    pub const fn new(
        name: &'static str,
        slot: fn(&O) -> &IndirectRelation<T>,
        slot_mut: fn(&mut O) -> &mut IndirectRelation<T>,
    ) -> Self {
        Self {
            name,
            related_name: None,
            nullable: true,
            limit_choices_to: None,
            accessor: IndirectAccessor::new(name, slot, slot_mut),
        }
    }

    /// Name of the reverse accessor on `T` (default `<owner entity>_set`).
    #[must_use]
    pub const fn related_name(mut self, related_name: &'static str) -> Self {
        self.related_name = Some(related_name);
        self
    }

    /// Restrict the selectable `T` rows.
    #[must_use]
    pub const fn limit_choices_to(mut self, constraints: fn() -> Predicate) -> Self {
        self.limit_choices_to = Some(constraints);
        self
    }

    /// Reject empty form submissions.
    #[must_use]
    pub const fn required(mut self) -> Self {
        self.nullable = false;
        self
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub const fn is_nullable(&self) -> bool {
        self.nullable
    }

    #[must_use]
    pub const fn accessor(&self) -> &IndirectAccessor<O, T> {
        &self.accessor
    }

    #[must_use]
    pub fn reverse_name(&self) -> String {
        self.related_name
            .map_or_else(|| format!("{}_set", O::ENTITY_NAME), str::to_string)
    }

    /// Declared choice constraints (`Predicate::True` when unconstrained).
    #[must_use]
    pub fn constraints(&self) -> Predicate {
        self.limit_choices_to.map_or(Predicate::True, |f| f())
    }

    // ======================================================================
    // Binding
    // ======================================================================

    #[must_use]
    pub fn binding(&self) -> FieldBinding {
        FieldBinding {
            owner_path: O::PATH,
            owner_entity: O::ENTITY_NAME,
            field: self.name,
            target_path: T::PATH,
            target_entity: T::ENTITY_NAME,
            related_name: self.reverse_name(),
        }
    }

    /// Register this field, its reverse accessor and `T` for versioning.
    pub fn bind(&self) -> Result<(), InternalError> {
        let declared = O::MODEL.field(self.name).map(|field| field.kind);

        match declared {
            Some(EntityFieldKind::IndirectRelation { target_path, .. }) if target_path == T::PATH => {}
            Some(_) => {
                return Err(InternalError::misuse(format!(
                    "model field {}.{} is not an indirect relation to {}",
                    O::PATH,
                    self.name,
                    T::PATH
                )));
            }
            None => {
                return Err(InternalError::misuse(format!(
                    "model of {} declares no field '{}'",
                    O::PATH,
                    self.name
                )));
            }
        }

        registry::bind(self.binding())?;
        version::register(T::ENTITY_NAME);

        Ok(())
    }

    #[must_use]
    pub fn is_bound(&self) -> bool {
        registry::field_binding(O::PATH, self.name).is_some()
    }

    fn ensure_bound(&self) -> Result<(), InternalError> {
        if self.is_bound() {
            return Ok(());
        }

        Err(InternalError::misuse(format!(
            "indirect relation {}.{} used before binding; call Db::register::<{}>() first",
            O::PATH,
            self.name,
            O::ENTITY_NAME
        )))
    }

    // ======================================================================
    // Access
    // ======================================================================

    /// Read the related value: the assigned entity, or a proxy over the
    /// pinned snapshot.
    pub fn get<'o>(&self, db: &Db, owner: &'o O) -> Result<Option<&'o Related<T>>, InternalError> {
        self.ensure_bound()?;
        self.accessor.get(db, owner)
    }

    /// Assign a live entity or a proxy; `None` clears the relation.
    pub fn set<V: Into<Assigned<T>>>(
        &self,
        owner: &mut O,
        value: Option<V>,
    ) -> Result<(), InternalError> {
        self.ensure_bound()?;
        self.accessor.set(owner, value);

        Ok(())
    }

    pub fn clear(&self, owner: &mut O) -> Result<(), InternalError> {
        self.set(owner, None::<T>)
    }

    #[must_use]
    pub fn pointer(&self, owner: &O) -> Option<VersionId> {
        self.accessor.slot(owner).pointer()
    }

    // ======================================================================
    // Persistence
    // ======================================================================

    /// Consume the pending write and store the resulting pointer.
    ///
    /// Returns the pointer the owning row will carry. On error the pending
    /// write is kept so the caller may retry.
    pub fn pre_save(
        &self,
        db: &Db,
        owner: &mut O,
        mode: SaveMode,
    ) -> Result<Option<VersionId>, InternalError> {
        let slot = self.accessor.slot_mut(owner);

        let Some(pending) = slot.pending.take() else {
            return Ok(slot.pointer);
        };

        let resolved = self
            .ensure_bound()
            .and_then(|()| match &pending {
                PendingWrite::Clear => Ok(None),
                PendingWrite::Assigned(Assigned::Proxy(proxy)) => Ok(Some(proxy.version_id())),
                PendingWrite::Assigned(Assigned::Entity(entity)) => {
                    self.snapshot_for(db, entity).map(Some)
                }
            })
            .and_then(|pointer| {
                // A pointed-at snapshot must never be rewritten by a later
                // save in the same recording scope.
                if let Some(id) = pointer {
                    db.versions().pin(id)?;
                }

                Ok(pointer)
            });

        match resolved {
            Ok(pointer) => {
                slot.pointer = pointer;
                db.debug_log(format_args!(
                    "{}.{} ({mode:?}) -> {}",
                    O::ENTITY_NAME,
                    self.name,
                    Value::from(pointer)
                ));

                Ok(pointer)
            }
            Err(err) => {
                slot.pending = Some(pending);
                Err(err)
            }
        }
    }

    /// Version id pinning the current state of `entity`.
    ///
    /// Under `ReuseMatching` the latest snapshot is reused when its data
    /// equals the entity's serialized state. Otherwise the entity is saved
    /// inside a recording scope, which stages a new snapshot.
    pub fn snapshot_for(&self, db: &Db, entity: &T) -> Result<VersionId, InternalError> {
        let key = entity.key().to_value();
        let versions = db.versions();

        if db.config().snapshot_policy == SnapshotPolicy::ReuseMatching
            && let Some(latest) = versions.latest_snapshot_for(T::ENTITY_NAME, &key)?
            && latest.data == serialize(entity)?
        {
            record(MetricsEvent::SnapshotReused {
                entity_path: T::PATH,
            });
            db.debug_log(format_args!(
                "reusing snapshot {} of {}:{key}",
                latest.id,
                T::ENTITY_NAME
            ));

            return Ok(latest.id);
        }

        // Write amplification: the related entity is saved as assigned.
        db.debug_log(format_args!(
            "recording snapshot of {}:{key} for {}.{}",
            T::ENTITY_NAME,
            O::ENTITY_NAME,
            self.name
        ));

        let scope = RevisionScope::begin(versions).map_err(|err| snapshot_failure::<T>(&key, err))?;
        let mut target = entity.clone();
        db.save(&mut target)
            .map_err(|err| snapshot_failure::<T>(&key, err))?;
        scope
            .finish()
            .map_err(|err| snapshot_failure::<T>(&key, err))?;

        versions
            .latest_snapshot_for(T::ENTITY_NAME, &key)
            .map_err(|err| snapshot_failure::<T>(&key, err))?
            .map(|snapshot| snapshot.id)
            .ok_or_else(|| {
                InternalError::snapshot_creation(
                    T::ENTITY_NAME,
                    &key,
                    "version store recorded no snapshot",
                )
            })
    }

    // ======================================================================
    // Forms
    // ======================================================================

    /// Check that `key` names a live `T` within the declared constraints.
    ///
    /// Runs against `T`'s rows, never against snapshots.
    pub fn validate(&self, db: &Db, key: T::Key) -> Result<T, InternalError> {
        validate_choice::<T>(db, key, self.constraints())
    }

    #[must_use]
    pub const fn form_field(&self) -> IndirectChoiceField<T> {
        IndirectChoiceField::new(self.name, !self.nullable, self.limit_choices_to)
    }

    /// Apply a cleaned form value to the owner.
    pub fn save_form_data(&self, owner: &mut O, cleaned: Option<T>) -> Result<(), InternalError> {
        self.set(owner, cleaned)
    }

    // ======================================================================
    // Reverse side
    // ======================================================================

    #[must_use]
    pub const fn reverse(&self) -> ReverseRelation<T, O> {
        ReverseRelation::new(self.name)
    }
}

impl<O: EntityKind, T: EntityKind> IndirectRelationHook<O> for IndirectRelationField<O, T> {
    fn field_name(&self) -> &'static str {
        self.name
    }

    fn bind(&self) -> Result<(), InternalError> {
        Self::bind(self)
    }

    fn pre_save(&self, db: &Db, owner: &mut O, mode: SaveMode) -> Result<(), InternalError> {
        Self::pre_save(self, db, owner, mode).map(|_| ())
    }
}

// Keep an existing snapshot-creation error; wrap anything else.
fn snapshot_failure<T: EntityKind>(key: &Value, err: InternalError) -> InternalError {
    if err.relation_kind() == Some(RelationErrorKind::SnapshotCreation) {
        err
    } else {
        InternalError::snapshot_creation(T::ENTITY_NAME, key, err)
    }
}
