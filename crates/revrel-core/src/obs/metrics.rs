use serde::{Deserialize, Serialize};
use std::{cell::RefCell, collections::BTreeMap};

///
/// EventState
/// Ephemeral, in-memory counters for store and relation operations.
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventState {
    pub ops: EventOps,
    pub entities: BTreeMap<String, EntityCounters>,
}

///
/// EventOps
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventOps {
    // Store entrypoints
    pub load_calls: u64,
    pub save_calls: u64,
    pub delete_calls: u64,

    // Rows touched
    pub rows_loaded: u64,
    pub rows_scanned: u64,
    pub rows_deleted: u64,

    // Snapshots
    pub snapshots_recorded: u64,
    pub snapshots_reused: u64,

    // Indirect relations
    pub pointers_resolved: u64,
    pub resolution_failures: u64,
    pub reverse_lookups: u64,
    pub reverse_rows: u64,
    pub validation_rejections: u64,
}

///
/// EntityCounters
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EntityCounters {
    pub load_calls: u64,
    pub save_calls: u64,
    pub delete_calls: u64,
    pub rows_loaded: u64,
    pub rows_scanned: u64,
    pub rows_deleted: u64,
    pub snapshots_recorded: u64,
    pub snapshots_reused: u64,
    pub pointers_resolved: u64,
    pub reverse_lookups: u64,
}

thread_local! {
    static EVENT_STATE: RefCell<EventState> = RefCell::new(EventState::default());
}

/// Borrow metrics immutably.
pub(crate) fn with_state<R>(f: impl FnOnce(&EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&m.borrow()))
}

/// Borrow metrics mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&mut m.borrow_mut()))
}

/// Reset all counters.
pub(crate) fn reset_all() {
    with_state_mut(|m| *m = EventState::default());
}

/// Borrow (creating if needed) the per-entity counters for `path`.
pub(crate) fn entity<'a>(m: &'a mut EventState, path: &str) -> &'a mut EntityCounters {
    m.entities.entry(path.to_string()).or_default()
}

///
/// EventReport
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventReport {
    pub counters: EventState,
    /// Per-entity counters with derived averages.
    pub entity_counters: Vec<EntitySummary>,
}

///
/// EntitySummary
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EntitySummary {
    pub path: String,
    pub load_calls: u64,
    pub save_calls: u64,
    pub rows_loaded: u64,
    pub rows_scanned: u64,
    pub avg_rows_per_load: f64,
    pub snapshots_recorded: u64,
    pub snapshots_reused: u64,
    pub pointers_resolved: u64,
    pub reverse_lookups: u64,
}

/// Build a metrics report from in-memory counters.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub(crate) fn report() -> EventReport {
    let snap = with_state(Clone::clone);

    let entity_counters = snap
        .entities
        .iter()
        .map(|(path, ops)| {
            let avg_rows_per_load = if ops.load_calls > 0 {
                ops.rows_loaded as f64 / ops.load_calls as f64
            } else {
                0.0
            };

            EntitySummary {
                path: path.clone(),
                load_calls: ops.load_calls,
                save_calls: ops.save_calls,
                rows_loaded: ops.rows_loaded,
                rows_scanned: ops.rows_scanned,
                avg_rows_per_load,
                snapshots_recorded: ops.snapshots_recorded,
                snapshots_reused: ops.snapshots_reused,
                pointers_resolved: ops.pointers_resolved,
                reverse_lookups: ops.reverse_lookups,
            }
        })
        .collect();

    EventReport {
        counters: snap,
        entity_counters,
    }
}
