//! Metrics sink boundary.
//!
//! Core logic MUST NOT depend on obs::metrics directly.
//! All instrumentation flows through MetricsEvent and MetricsSink.
//!
//! This module is the only allowed bridge between execution logic
//! and the global metrics state.
use crate::{obs::metrics, traits::EntityKind};
use std::{cell::RefCell, marker::PhantomData};

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<*const dyn MetricsSink>> = const { RefCell::new(None) };
}

///
/// ExecKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExecKind {
    Load,
    Save,
    Delete,
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MetricsEvent {
    ExecStart {
        kind: ExecKind,
        entity_path: &'static str,
    },
    ExecFinish {
        kind: ExecKind,
        entity_path: &'static str,
        rows_touched: u64,
    },
    RowsScanned {
        entity_path: &'static str,
        rows_scanned: u64,
    },
    SnapshotRecorded {
        entity_path: &'static str,
    },
    SnapshotReused {
        entity_path: &'static str,
    },
    PointerResolved {
        entity_path: &'static str,
    },
    ResolutionFailure {
        entity_path: &'static str,
    },
    ReverseLookup {
        entity_path: &'static str,
        rows: u64,
    },
    ValidationRejected {
        entity_path: &'static str,
    },
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent);
}

/// GlobalMetricsSink
/// Default thread-local sink that writes into global metrics state.
/// Acts as the concrete sink when no scoped override is installed.

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent) {
        match event {
            MetricsEvent::ExecStart { kind, entity_path } => {
                metrics::with_state_mut(|m| {
                    match kind {
                        ExecKind::Load => m.ops.load_calls = m.ops.load_calls.saturating_add(1),
                        ExecKind::Save => m.ops.save_calls = m.ops.save_calls.saturating_add(1),
                        ExecKind::Delete => {
                            m.ops.delete_calls = m.ops.delete_calls.saturating_add(1);
                        }
                    }

                    let entry = metrics::entity(m, entity_path);
                    match kind {
                        ExecKind::Load => entry.load_calls = entry.load_calls.saturating_add(1),
                        ExecKind::Save => entry.save_calls = entry.save_calls.saturating_add(1),
                        ExecKind::Delete => {
                            entry.delete_calls = entry.delete_calls.saturating_add(1);
                        }
                    }
                });
            }

            MetricsEvent::ExecFinish {
                kind,
                entity_path,
                rows_touched,
            } => {
                metrics::with_state_mut(|m| {
                    match kind {
                        ExecKind::Load => {
                            m.ops.rows_loaded = m.ops.rows_loaded.saturating_add(rows_touched);
                        }
                        ExecKind::Delete => {
                            m.ops.rows_deleted = m.ops.rows_deleted.saturating_add(rows_touched);
                        }
                        ExecKind::Save => {}
                    }

                    let entry = metrics::entity(m, entity_path);
                    match kind {
                        ExecKind::Load => {
                            entry.rows_loaded = entry.rows_loaded.saturating_add(rows_touched);
                        }
                        ExecKind::Delete => {
                            entry.rows_deleted = entry.rows_deleted.saturating_add(rows_touched);
                        }
                        ExecKind::Save => {}
                    }
                });
            }

            MetricsEvent::RowsScanned {
                entity_path,
                rows_scanned,
            } => {
                metrics::with_state_mut(|m| {
                    m.ops.rows_scanned = m.ops.rows_scanned.saturating_add(rows_scanned);
                    let entry = metrics::entity(m, entity_path);
                    entry.rows_scanned = entry.rows_scanned.saturating_add(rows_scanned);
                });
            }

            MetricsEvent::SnapshotRecorded { entity_path } => {
                metrics::with_state_mut(|m| {
                    m.ops.snapshots_recorded = m.ops.snapshots_recorded.saturating_add(1);
                    let entry = metrics::entity(m, entity_path);
                    entry.snapshots_recorded = entry.snapshots_recorded.saturating_add(1);
                });
            }

            MetricsEvent::SnapshotReused { entity_path } => {
                metrics::with_state_mut(|m| {
                    m.ops.snapshots_reused = m.ops.snapshots_reused.saturating_add(1);
                    let entry = metrics::entity(m, entity_path);
                    entry.snapshots_reused = entry.snapshots_reused.saturating_add(1);
                });
            }

            MetricsEvent::PointerResolved { entity_path } => {
                metrics::with_state_mut(|m| {
                    m.ops.pointers_resolved = m.ops.pointers_resolved.saturating_add(1);
                    let entry = metrics::entity(m, entity_path);
                    entry.pointers_resolved = entry.pointers_resolved.saturating_add(1);
                });
            }

            MetricsEvent::ResolutionFailure { .. } => {
                metrics::with_state_mut(|m| {
                    m.ops.resolution_failures = m.ops.resolution_failures.saturating_add(1);
                });
            }

            MetricsEvent::ReverseLookup { entity_path, rows } => {
                metrics::with_state_mut(|m| {
                    m.ops.reverse_lookups = m.ops.reverse_lookups.saturating_add(1);
                    m.ops.reverse_rows = m.ops.reverse_rows.saturating_add(rows);
                    let entry = metrics::entity(m, entity_path);
                    entry.reverse_lookups = entry.reverse_lookups.saturating_add(1);
                });
            }

            MetricsEvent::ValidationRejected { .. } => {
                metrics::with_state_mut(|m| {
                    m.ops.validation_rejections = m.ops.validation_rejections.saturating_add(1);
                });
            }
        }
    }
}

pub(crate) const GLOBAL_METRICS_SINK: GlobalMetricsSink = GlobalMetricsSink;

pub(crate) fn record(event: MetricsEvent) {
    match SINK_OVERRIDE.with(|cell| *cell.borrow()) {
        // SAFETY: the pointer comes from a live `&dyn MetricsSink` borrowed by
        // `with_metrics_sink`, whose `OverrideGuard` clears it before that
        // borrow ends (unwinding included). It is dereferenced here only, as a
        // shared reference, and never retained.
        Some(sink) => unsafe { (*sink).record(event) },
        None => GLOBAL_METRICS_SINK.record(event),
    }
}

/// Snapshot the current metrics state.
#[must_use]
pub fn metrics_report() -> metrics::EventReport {
    metrics::report()
}

/// Reset all metrics counters.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Route every event recorded inside `f` to `sink`.
///
/// Overrides nest; the previous sink is reinstated when `f` returns or
/// unwinds.
pub fn with_metrics_sink<T>(sink: &dyn MetricsSink, f: impl FnOnce() -> T) -> T {
    struct OverrideGuard {
        previous: Option<*const dyn MetricsSink>,
    }

    impl Drop for OverrideGuard {
        fn drop(&mut self) {
            SINK_OVERRIDE.with(|cell| *cell.borrow_mut() = self.previous);
        }
    }

    // SAFETY: only the lifetime is erased. The pointer lives in the
    // thread-local slot for the duration of `f`, which `sink` outlives.
    let erased =
        unsafe { std::mem::transmute::<&dyn MetricsSink, *const dyn MetricsSink>(sink) };
    let _guard = OverrideGuard {
        previous: SINK_OVERRIDE.with(|cell| cell.borrow_mut().replace(erased)),
    };

    f()
}

///
/// Span
/// RAII guard that emits start/finish events for one store call.
/// Finish accounting happens even on early return or unwind.
///

pub(crate) struct Span<E: EntityKind> {
    kind: ExecKind,
    rows: u64,
    _marker: PhantomData<E>,
}

impl<E: EntityKind> Span<E> {
    #[must_use]
    pub(crate) fn new(kind: ExecKind) -> Self {
        record(MetricsEvent::ExecStart {
            kind,
            entity_path: E::PATH,
        });

        Self {
            kind,
            rows: 0,
            _marker: PhantomData,
        }
    }

    pub(crate) const fn set_rows(&mut self, rows: u64) {
        self.rows = rows;
    }
}

impl<E: EntityKind> Drop for Span<E> {
    fn drop(&mut self) {
        record(MetricsEvent::ExecFinish {
            kind: self.kind,
            entity_path: E::PATH,
            rows_touched: self.rows,
        });
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        cell::RefCell as StdRefCell,
        panic::{AssertUnwindSafe, catch_unwind},
    };

    #[derive(Default)]
    struct CapturingSink {
        events: StdRefCell<Vec<MetricsEvent>>,
    }

    impl CapturingSink {
        fn take(&self) -> Vec<MetricsEvent> {
            self.events.take()
        }
    }

    impl MetricsSink for CapturingSink {
        fn record(&self, event: MetricsEvent) {
            self.events.borrow_mut().push(event);
        }
    }

    const PATH: &str = "obs::tests::Entity";

    fn no_override() -> bool {
        SINK_OVERRIDE.with(|cell| cell.borrow().is_none())
    }

    #[test]
    fn nested_sinks_see_only_their_own_events() {
        let outer = CapturingSink::default();
        let inner = CapturingSink::default();

        with_metrics_sink(&outer, || {
            record(MetricsEvent::SnapshotRecorded { entity_path: PATH });
            with_metrics_sink(&inner, || {
                record(MetricsEvent::PointerResolved { entity_path: PATH });
            });
            record(MetricsEvent::ValidationRejected { entity_path: PATH });
        });

        assert_eq!(
            outer.take(),
            vec![
                MetricsEvent::SnapshotRecorded { entity_path: PATH },
                MetricsEvent::ValidationRejected { entity_path: PATH },
            ]
        );
        assert_eq!(
            inner.take(),
            vec![MetricsEvent::PointerResolved { entity_path: PATH }]
        );
        assert!(no_override());
    }

    #[test]
    fn override_is_cleared_when_the_closure_panics() {
        let sink = CapturingSink::default();

        let result = catch_unwind(AssertUnwindSafe(|| {
            with_metrics_sink(&sink, || {
                record(MetricsEvent::SnapshotReused { entity_path: PATH });
                panic!("boom");
            });
        }));

        assert!(result.is_err());
        assert_eq!(sink.take().len(), 1);
        assert!(no_override());
    }

    #[test]
    fn relation_events_accumulate_globally_and_per_entity() {
        metrics_reset_all();

        record(MetricsEvent::SnapshotRecorded { entity_path: PATH });
        record(MetricsEvent::SnapshotReused { entity_path: PATH });
        record(MetricsEvent::ReverseLookup {
            entity_path: PATH,
            rows: 3,
        });
        record(MetricsEvent::ResolutionFailure { entity_path: PATH });

        let report = metrics_report();
        let ops = &report.counters.ops;
        assert_eq!(ops.snapshots_recorded, 1);
        assert_eq!(ops.snapshots_reused, 1);
        assert_eq!(ops.reverse_lookups, 1);
        assert_eq!(ops.reverse_rows, 3);
        assert_eq!(ops.resolution_failures, 1);

        let entity = report
            .entity_counters
            .iter()
            .find(|summary| summary.path == PATH)
            .expect("entity summary should be present");
        assert_eq!(entity.snapshots_recorded, 1);
        assert_eq!(entity.reverse_lookups, 1);
    }

    #[test]
    fn span_emits_start_and_finish_with_rows() {
        use crate::test_support::Supplier;

        let sink = CapturingSink::default();

        with_metrics_sink(&sink, || {
            let mut span = Span::<Supplier>::new(ExecKind::Load);
            span.set_rows(4);
        });

        let events = sink.take();
        assert_eq!(
            events,
            vec![
                MetricsEvent::ExecStart {
                    kind: ExecKind::Load,
                    entity_path: <Supplier as crate::traits::Path>::PATH,
                },
                MetricsEvent::ExecFinish {
                    kind: ExecKind::Load,
                    entity_path: <Supplier as crate::traits::Path>::PATH,
                    rows_touched: 4,
                },
            ]
        );
    }
}
