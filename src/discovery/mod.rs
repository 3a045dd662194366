//! # Worksheet Discovery
//!
//! Finds the survey worksheets of a spreadsheet whose tab ids are unknown.
//! Strategies run in a fixed order, each producing a partial
//! [`ClassifiedWorksheetSet`] that is merged into the running result; the run
//! stops as soon as a strategy's exit threshold is reached. A reconciliation
//! pass then fills missing survey roles from worksheets already found.
//!
//! Probes are sequential and blocking. A probe that fails or finds nothing is
//! recorded as an event and skipped.
pub mod events;
pub mod layout;
pub mod reconcile;
pub mod set;
pub mod strategy;

use crate::classify::explain;
use crate::classify::WorksheetRole;
use crate::config::DiscoveryOptions;
use crate::discovery::events::DiscoveryEvent;
use crate::discovery::events::EventSink;
use crate::discovery::layout::split_by_survey_type;
use crate::discovery::reconcile::reconcile;
use crate::discovery::set::ClassifiedWorksheetSet;
use crate::discovery::strategy::exhaustive_sweep;
use crate::discovery::strategy::hashed_guesses;
use crate::discovery::strategy::name_candidates;
use crate::discovery::strategy::numeric_sweep;
use crate::discovery::strategy::StrategyKind;
use crate::discovery::strategy::EXACT_NAMES;
use crate::discovery::strategy::FORCED_NAME;
use crate::discovery::strategy::POSITIONAL_ROLES;
use crate::error::NpsError;
use crate::spreadsheet::handle::SpreadsheetHandle;
use crate::spreadsheet::handle::WorksheetHandle;
use crate::spreadsheet::sheet::RawTable;
use crate::spreadsheet::FetchRequest;
use crate::spreadsheet::WorksheetSource;

/// Result of a discovery run.
#[derive(Clone, Debug, PartialEq)]
pub struct DiscoveryOutcome {
    pub spreadsheet: SpreadsheetHandle,
    /// Discovered worksheets; empty when nothing was found
    pub worksheets: ClassifiedWorksheetSet,
    /// Strategy whose exit threshold ended the run, if any
    pub decided_by: Option<StrategyKind>,
}

impl DiscoveryOutcome {
    pub fn is_empty(&self) -> bool {
        self.worksheets.is_empty()
    }
}

/// Runs the discovery strategies against one spreadsheet.
pub struct Discovery<'a> {
    source: &'a dyn WorksheetSource,
    sink: &'a dyn EventSink,
    options: &'a DiscoveryOptions,
}

impl<'a> Discovery<'a> {
    pub fn new(source: &'a dyn WorksheetSource, sink: &'a dyn EventSink, options: &'a DiscoveryOptions) -> Self {
        Self { source, sink, options }
    }

    /// Discovers the worksheets of the spreadsheet at `url`.
    ///
    /// Only an unrecognizable URL is an error; finding nothing yields an
    /// empty outcome.
    pub fn run(&self, url: &str) -> Result<DiscoveryOutcome, NpsError> {
        let spreadsheet = SpreadsheetHandle::from_url(url)?;
        let mut worksheets = ClassifiedWorksheetSet::new();
        let mut decided_by = None;
        // Index 0 as fetched by the single-worksheet check
        let mut first_worksheet = None;

        for strategy in StrategyKind::ORDER {
            if strategy == StrategyKind::ExplicitHandles && self.options.explicit_handles.is_empty() {
                continue;
            }
            let partial = self.run_strategy(strategy, &spreadsheet, &worksheets, &mut first_worksheet);
            self.sink.record(DiscoveryEvent::StrategyFinished { strategy, found: partial.roles() });

            if strategy == StrategyKind::SingleWorksheet {
                if partial.len() >= strategy.exit_threshold() {
                    self.sink.record(DiscoveryEvent::EarlyExit { strategy, roles: partial.len() });
                    return Ok(DiscoveryOutcome { spreadsheet, worksheets: partial, decided_by: Some(strategy) });
                }
                continue;
            }

            worksheets.merge(partial);
            if worksheets.len() >= strategy.exit_threshold() {
                self.sink.record(DiscoveryEvent::EarlyExit { strategy, roles: worksheets.len() });
                decided_by = Some(strategy);
                break;
            }
        }

        if worksheets.is_empty() {
            self.sink.record(DiscoveryEvent::NothingDiscovered { spreadsheet: spreadsheet.id.to_owned() });
        } else {
            reconcile(&mut worksheets, self.sink);
        }
        Ok(DiscoveryOutcome { spreadsheet, worksheets, decided_by })
    }

    fn run_strategy(
        &self,
        strategy: StrategyKind,
        spreadsheet: &SpreadsheetHandle,
        found: &ClassifiedWorksheetSet,
        first_worksheet: &mut Option<Option<RawTable>>,
    ) -> ClassifiedWorksheetSet {
        match strategy {
            StrategyKind::SingleWorksheet => self.single_worksheet(spreadsheet, first_worksheet),
            StrategyKind::ExplicitHandles => self.explicit_handles(spreadsheet),
            StrategyKind::PositionalIndices => self.positional_indices(spreadsheet, first_worksheet),
            StrategyKind::ExactNames => self.exact_names(spreadsheet),
            StrategyKind::NameSearch => self.name_search(spreadsheet),
            StrategyKind::HashedGuesses => {
                let handles = hashed_guesses(self.options.max_hashed_guesses);
                self.sweep(strategy, spreadsheet, &handles, self.options.timeouts.search, None)
            }
            StrategyKind::NumericSweep => {
                let handles = numeric_sweep(spreadsheet.url_gid);
                self.sweep(strategy, spreadsheet, &handles, self.options.timeouts.search, None)
            }
            StrategyKind::ExhaustiveSweep => {
                let handles = exhaustive_sweep();
                self.sweep(strategy, spreadsheet, &handles, self.options.timeouts.exhaustive, Some(found))
            }
        }
    }

    /// Fetches one handle, recording failures and empty results.
    fn probe(
        &self,
        strategy: StrategyKind,
        spreadsheet: &SpreadsheetHandle,
        handle: &WorksheetHandle,
        request: &FetchRequest,
        attempt: usize,
    ) -> Option<RawTable> {
        match self.source.fetch(spreadsheet, handle, request) {
            Ok(Some(table)) if !table.is_empty() => Some(table),
            Ok(_) => {
                self.sink.record(DiscoveryEvent::ProbeEmpty { strategy, handle: handle.clone() });
                None
            }
            Err(error) => {
                self.sink.record(DiscoveryEvent::ProbeFailed {
                    strategy,
                    handle: handle.clone(),
                    attempt,
                    message: error.to_string(),
                });
                None
            }
        }
    }

    /// Classifies a fetched table and records the decision.
    fn classify(&self, strategy: StrategyKind, handle: &WorksheetHandle, table: &RawTable) -> WorksheetRole {
        let classification = explain(table);
        self.sink.record(DiscoveryEvent::WorksheetClassified {
            strategy,
            handle: handle.clone(),
            role: classification.role,
            rule: classification.rule,
            rows: table.row_count(),
        });
        classification.role
    }

    fn started(&self, strategy: StrategyKind, candidates: usize) {
        self.sink.record(DiscoveryEvent::StrategyStarted { strategy, candidates });
    }

    /// Checks index 0 for a combined layout. The probe result is kept in
    /// `first_worksheet` for the positional strategy.
    fn single_worksheet(
        &self,
        spreadsheet: &SpreadsheetHandle,
        first_worksheet: &mut Option<Option<RawTable>>,
    ) -> ClassifiedWorksheetSet {
        let strategy = StrategyKind::SingleWorksheet;
        let handle = WorksheetHandle::Index(0);
        self.started(strategy, 1);

        let mut partial = ClassifiedWorksheetSet::new();
        let request = self.options.request(self.options.timeouts.targeted);
        let table = self.probe(strategy, spreadsheet, &handle, &request, 1);
        let parts = table.as_ref().and_then(|table| split_by_survey_type(table));
        *first_worksheet = Some(table);
        if let Some(parts) = parts {
            for (role, part) in parts {
                self.sink.record(DiscoveryEvent::LayoutSplit {
                    handle: handle.clone(),
                    role,
                    rows: part.row_count(),
                });
                partial.insert(role, handle.clone(), part);
            }
        }
        partial
    }

    fn explicit_handles(&self, spreadsheet: &SpreadsheetHandle) -> ClassifiedWorksheetSet {
        let strategy = StrategyKind::ExplicitHandles;
        let handles = &self.options.explicit_handles;
        self.started(strategy, handles.len());

        let mut partial = ClassifiedWorksheetSet::new();
        let request = self.options.request(self.options.timeouts.explicit);
        for handle in handles {
            for attempt in 1..=self.options.explicit_attempts.max(1) {
                let Some(table) = self.probe(strategy, spreadsheet, handle, &request, attempt) else {
                    continue;
                };
                let role = self.classify(strategy, handle, &table);
                if role != WorksheetRole::Unknown {
                    partial.insert(role, handle.clone(), table);
                    break;
                }
            }
        }
        partial
    }

    fn positional_indices(
        &self,
        spreadsheet: &SpreadsheetHandle,
        first_worksheet: &mut Option<Option<RawTable>>,
    ) -> ClassifiedWorksheetSet {
        let strategy = StrategyKind::PositionalIndices;
        self.started(strategy, POSITIONAL_ROLES.len());

        let mut partial = ClassifiedWorksheetSet::new();
        let request = self.options.request(self.options.timeouts.targeted);
        for (index, expected) in POSITIONAL_ROLES {
            let handle = WorksheetHandle::Index(index);
            let fetched = if index == 0 { first_worksheet.take() } else { None };
            let table = fetched.unwrap_or_else(|| self.probe(strategy, spreadsheet, &handle, &request, 1));
            let Some(table) = table else {
                continue;
            };
            let detected = self.classify(strategy, &handle, &table);
            let role = if detected == WorksheetRole::Unknown {
                self.sink.record(DiscoveryEvent::RoleAssumed {
                    strategy,
                    handle: handle.clone(),
                    detected,
                    assumed: expected,
                });
                expected
            } else {
                detected
            };
            partial.insert(role, handle, table);
        }
        partial
    }

    fn exact_names(&self, spreadsheet: &SpreadsheetHandle) -> ClassifiedWorksheetSet {
        let strategy = StrategyKind::ExactNames;
        self.started(strategy, EXACT_NAMES.len());

        let mut partial = ClassifiedWorksheetSet::new();
        let request = FetchRequest::new(self.options.timeouts.targeted, self.options.exact_name_min_body_len);
        for (name, expected) in EXACT_NAMES {
            let handle = WorksheetHandle::Name(name.to_owned());
            let Some(table) = self.probe(strategy, spreadsheet, &handle, &request, 1) else {
                continue;
            };
            let detected = self.classify(strategy, &handle, &table);
            let role = if name == FORCED_NAME {
                if detected != expected {
                    self.sink.record(DiscoveryEvent::RoleForced {
                        handle: handle.clone(),
                        detected,
                        forced: expected,
                    });
                }
                expected
            } else if matches!(detected, WorksheetRole::Unknown | WorksheetRole::GeneralData) {
                self.sink.record(DiscoveryEvent::RoleAssumed {
                    strategy,
                    handle: handle.clone(),
                    detected,
                    assumed: expected,
                });
                expected
            } else {
                detected
            };
            partial.insert(role, handle, table);
        }
        partial
    }

    fn name_search(&self, spreadsheet: &SpreadsheetHandle) -> ClassifiedWorksheetSet {
        let strategy = StrategyKind::NameSearch;
        let candidates = name_candidates();
        self.started(strategy, candidates.iter().map(|(_, names)| names.len()).sum());

        let mut partial = ClassifiedWorksheetSet::new();
        let request = self.options.request(self.options.timeouts.search);
        for (expected, names) in candidates {
            for name in names {
                let handle = WorksheetHandle::Name((*name).to_owned());
                let Some(table) = self.probe(strategy, spreadsheet, &handle, &request, 1) else {
                    continue;
                };
                let detected = self.classify(strategy, &handle, &table);
                if detected != WorksheetRole::Unknown {
                    partial.insert(detected, handle, table);
                    break;
                }
                if !partial.contains(expected) {
                    self.sink.record(DiscoveryEvent::RoleAssumed {
                        strategy,
                        handle: handle.clone(),
                        detected,
                        assumed: expected,
                    });
                    partial.insert(expected, handle, table);
                    break;
                }
            }
        }
        partial
    }

    /// Probes every handle, keeping the first worksheet classified into each role.
    /// With `found`, stops once three roles are covered between `found` and this sweep.
    fn sweep(
        &self,
        strategy: StrategyKind,
        spreadsheet: &SpreadsheetHandle,
        handles: &[WorksheetHandle],
        timeout: std::time::Duration,
        found: Option<&ClassifiedWorksheetSet>,
    ) -> ClassifiedWorksheetSet {
        self.started(strategy, handles.len());

        let mut partial = ClassifiedWorksheetSet::new();
        let request = self.options.request(timeout);
        for handle in handles {
            let Some(table) = self.probe(strategy, spreadsheet, handle, &request, 1) else {
                continue;
            };
            let role = self.classify(strategy, handle, &table);
            if !partial.insert(role, handle.clone(), table) {
                continue;
            }
            if let Some(found) = found {
                if covered_roles(found, &partial) >= WorksheetRole::REQUIRED.len() {
                    break;
                }
            }
        }
        partial
    }
}

/// Distinct roles held by either set.
fn covered_roles(found: &ClassifiedWorksheetSet, partial: &ClassifiedWorksheetSet) -> usize {
    found.len() + partial.iter().filter(|(role, _)| !found.contains(*role)).count()
}
