use crate::error::InternalError;
use std::{cell::RefCell, collections::BTreeMap};

///
/// FieldBinding
///
/// Registered shape of one indirect relation field.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FieldBinding {
    pub owner_path: &'static str,
    pub owner_entity: &'static str,
    pub field: &'static str,
    pub target_path: &'static str,
    pub target_entity: &'static str,
    pub related_name: String,
}

///
/// ReverseBinding
///
/// Reverse accessor registered on the target side under `related_name`.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReverseBinding {
    pub target_path: &'static str,
    pub related_name: String,
    pub owner_path: &'static str,
    pub field: &'static str,
}

///
/// RelationRegistry
///

/// Fields are keyed owner path → field name; reverse accessors are keyed
/// target path → related name.
#[derive(Default)]
struct RelationRegistry {
    fields: BTreeMap<&'static str, BTreeMap<&'static str, FieldBinding>>,
    reverse: BTreeMap<&'static str, BTreeMap<String, ReverseBinding>>,
}

impl RelationRegistry {
    fn find_field(&self, owner_path: &str, field: &str) -> Option<&FieldBinding> {
        self.fields.get(owner_path)?.get(field)
    }

    fn find_reverse(&self, target_path: &str, related_name: &str) -> Option<&ReverseBinding> {
        self.reverse.get(target_path)?.get(related_name)
    }
}

thread_local! {
    static RELATION_REGISTRY: RefCell<RelationRegistry> = RefCell::new(RelationRegistry::default());
}

fn with_state<R>(f: impl FnOnce(&RelationRegistry) -> R) -> R {
    RELATION_REGISTRY.with(|r| f(&r.borrow()))
}

fn with_state_mut<R>(f: impl FnOnce(&mut RelationRegistry) -> R) -> R {
    RELATION_REGISTRY.with(|r| f(&mut r.borrow_mut()))
}

/// Register a field and its reverse accessor.
///
/// Re-binding an identical declaration is a no-op; any conflicting
/// declaration under the same (owner, field) or (target, related name) is
/// rejected.
pub(crate) fn bind(binding: FieldBinding) -> Result<(), InternalError> {
    with_state_mut(|reg| {
        if let Some(existing) = reg.find_field(binding.owner_path, binding.field) {
            if existing == &binding {
                return Ok(());
            }

            return Err(InternalError::misuse(format!(
                "indirect relation {}.{} already bound to {} (as '{}')",
                existing.owner_path, existing.field, existing.target_path, existing.related_name
            )));
        }

        if let Some(existing) = reg.find_reverse(binding.target_path, &binding.related_name) {
            return Err(InternalError::misuse(format!(
                "reverse name '{}' on {} already used by {}.{}",
                existing.related_name, existing.target_path, existing.owner_path, existing.field
            )));
        }

        reg.reverse.entry(binding.target_path).or_default().insert(
            binding.related_name.clone(),
            ReverseBinding {
                target_path: binding.target_path,
                related_name: binding.related_name.clone(),
                owner_path: binding.owner_path,
                field: binding.field,
            },
        );
        reg.fields
            .entry(binding.owner_path)
            .or_default()
            .insert(binding.field, binding);

        Ok(())
    })
}

#[must_use]
pub fn field_binding(owner_path: &str, field: &str) -> Option<FieldBinding> {
    with_state(|reg| reg.find_field(owner_path, field).cloned())
}

#[must_use]
pub fn reverse_binding(target_path: &str, related_name: &str) -> Option<ReverseBinding> {
    with_state(|reg| reg.find_reverse(target_path, related_name).cloned())
}

/// Clear every field and reverse binding (tests only).
pub fn reset_for_tests() {
    with_state_mut(|reg| *reg = RelationRegistry::default());
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(owner: &'static str, field: &'static str, related_name: &str) -> FieldBinding {
        FieldBinding {
            owner_path: owner,
            owner_entity: owner,
            field,
            target_path: "supplier",
            target_entity: "supplier",
            related_name: related_name.to_string(),
        }
    }

    #[test]
    fn lookups_address_each_binding_by_its_own_key() {
        reset_for_tests();
        bind(binding("purchase", "supplier", "purchases")).expect("bind purchase");
        bind(binding("invoice", "supplier", "invoices")).expect("bind invoice");
        bind(binding("invoice", "billed_to", "billed_invoices")).expect("bind billed");

        let found = field_binding("invoice", "supplier").expect("invoice.supplier");
        assert_eq!(found.related_name, "invoices");
        assert!(field_binding("purchase", "billed_to").is_none());

        let reverse = reverse_binding("supplier", "billed_invoices").expect("reverse");
        assert_eq!((reverse.owner_path, reverse.field), ("invoice", "billed_to"));
        assert!(reverse_binding("invoice", "billed_invoices").is_none());
    }

    #[test]
    fn conflicting_rebind_is_rejected_and_identical_rebind_is_not() {
        reset_for_tests();
        bind(binding("purchase", "supplier", "purchases")).expect("bind");
        bind(binding("purchase", "supplier", "purchases")).expect("identical rebind");

        let err = bind(binding("purchase", "supplier", "orders")).expect_err("changed name");
        assert!(err.message.contains("already bound"));

        let err = bind(binding("invoice", "supplier", "purchases")).expect_err("name taken");
        assert!(err.message.contains("already used"));
    }
}
