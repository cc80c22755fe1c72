use std::{cell::RefCell, collections::BTreeSet};

// Entity names eligible for snapshotting. Explicit init, no implicit teardown.
thread_local! {
    static REGISTERED: RefCell<BTreeSet<&'static str>> = const { RefCell::new(BTreeSet::new()) };
}

/// Mark an entity name as eligible for snapshotting. Idempotent.
pub fn register(entity_name: &'static str) {
    REGISTERED.with_borrow_mut(|set| {
        set.insert(entity_name);
    });
}

#[must_use]
pub fn is_registered(entity_name: &str) -> bool {
    REGISTERED.with_borrow(|set| set.contains(entity_name))
}

/// Clear every versioning registration (tests only).
pub fn reset_for_tests() {
    REGISTERED.with_borrow_mut(BTreeSet::clear);
}
