use crate::classify::Rule;
use crate::classify::WorksheetRole;
use crate::discovery::strategy::StrategyKind;
use crate::spreadsheet::handle::WorksheetHandle;
use std::cell::RefCell;
use tracing::debug;
use tracing::info;
use tracing::warn;

/// Observable steps of a discovery run.
#[derive(Clone, Debug, PartialEq)]
pub enum DiscoveryEvent {
    StrategyStarted {
        strategy: StrategyKind,
        candidates: usize,
    },
    /// Transport failure; the strategy moves on to its next handle
    ProbeFailed {
        strategy: StrategyKind,
        handle: WorksheetHandle,
        attempt: usize,
        message: String,
    },
    /// Nothing usable at this handle
    ProbeEmpty {
        strategy: StrategyKind,
        handle: WorksheetHandle,
    },
    WorksheetClassified {
        strategy: StrategyKind,
        handle: WorksheetHandle,
        role: WorksheetRole,
        rule: Rule,
        rows: usize,
    },
    /// Role imposed by the worksheet name, whatever the classifier said
    RoleForced {
        handle: WorksheetHandle,
        detected: WorksheetRole,
        forced: WorksheetRole,
    },
    /// Role assumed from where the worksheet was found
    RoleAssumed {
        strategy: StrategyKind,
        handle: WorksheetHandle,
        detected: WorksheetRole,
        assumed: WorksheetRole,
    },
    /// Rows of a combined worksheet assigned to one survey
    LayoutSplit {
        handle: WorksheetHandle,
        role: WorksheetRole,
        rows: usize,
    },
    StrategyFinished {
        strategy: StrategyKind,
        found: Vec<WorksheetRole>,
    },
    EarlyExit {
        strategy: StrategyKind,
        roles: usize,
    },
    Reconciled {
        from: WorksheetRole,
        to: WorksheetRole,
        handle: WorksheetHandle,
    },
    NothingDiscovered {
        spreadsheet: String,
    },
}

/// Receives discovery events.
pub trait EventSink {
    fn record(&self, event: DiscoveryEvent);
}

/// Forwards events to `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, event: DiscoveryEvent) {
        match event {
            DiscoveryEvent::StrategyStarted { strategy, candidates } => {
                info!(?strategy, candidates, "strategy started")
            }
            DiscoveryEvent::ProbeFailed { strategy, handle, attempt, message } => {
                debug!(?strategy, %handle, attempt, %message, "probe failed")
            }
            DiscoveryEvent::ProbeEmpty { strategy, handle } => debug!(?strategy, %handle, "nothing at handle"),
            DiscoveryEvent::WorksheetClassified { strategy, handle, role, rule, rows } => {
                info!(?strategy, %handle, %role, ?rule, rows, "worksheet classified")
            }
            DiscoveryEvent::RoleForced { handle, detected, forced } => {
                info!(%handle, %detected, %forced, "role forced by worksheet name")
            }
            DiscoveryEvent::RoleAssumed { strategy, handle, detected, assumed } => {
                info!(?strategy, %handle, %detected, %assumed, "role assumed")
            }
            DiscoveryEvent::LayoutSplit { handle, role, rows } => {
                info!(%handle, %role, rows, "combined worksheet split")
            }
            DiscoveryEvent::StrategyFinished { strategy, found } => {
                debug!(?strategy, ?found, "strategy finished")
            }
            DiscoveryEvent::EarlyExit { strategy, roles } => info!(?strategy, roles, "enough roles found"),
            DiscoveryEvent::Reconciled { from, to, handle } => info!(%from, %to, %handle, "worksheet relabeled"),
            DiscoveryEvent::NothingDiscovered { spreadsheet } => {
                warn!(%spreadsheet, "no worksheets discovered")
            }
        }
    }
}

/// Keeps every event in memory, in order.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: RefCell<Vec<DiscoveryEvent>>,
}

impl MemorySink {
    pub fn events(&self) -> Vec<DiscoveryEvent> {
        self.events.borrow().clone()
    }
}

impl EventSink for MemorySink {
    fn record(&self, event: DiscoveryEvent) {
        self.events.borrow_mut().push(event);
    }
}

/// Drops every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn record(&self, _event: DiscoveryEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_keeps_order() {
        let sink = MemorySink::default();
        sink.record(DiscoveryEvent::StrategyStarted { strategy: StrategyKind::PositionalIndices, candidates: 3 });
        sink.record(DiscoveryEvent::EarlyExit { strategy: StrategyKind::PositionalIndices, roles: 2 });
        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], DiscoveryEvent::EarlyExit { roles: 2, .. }));
    }
}
