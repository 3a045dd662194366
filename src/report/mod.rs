//! # Report Assembly
//!
//! An [`AnalysisBundle`] holds everything computed from the discovered
//! worksheets and is what the result cache stores. A [`Report`] adds the
//! store name, a timestamp and the insight text, and renders as plain text.
pub mod insights;
pub mod summary;

use crate::classify::WorksheetRole;
use crate::discovery::set::ClassifiedWorksheetSet;
use crate::discovery::DiscoveryOutcome;
use crate::metrics::agents::agent_summary;
use crate::metrics::agents::AgentSummary;
use crate::metrics::cases::detractor_cases;
use crate::metrics::cases::CriticalCases;
use crate::metrics::cases::DETRACTOR_CASE_LIMIT;
use crate::metrics::combined;
use crate::metrics::compute;
use crate::metrics::CombinedMetrics;
use crate::metrics::NpsMetrics;
use crate::metrics::RoleMetrics;
use crate::spreadsheet::handle::WorksheetHandle;
use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use std::fmt::Write;

/// Metrics of one role, or why there are none.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MetricsEntry {
    Available { metrics: RoleMetrics },
    Unavailable { reason: String },
}

/// Everything computed for one discovered worksheet.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorksheetMetrics {
    pub role: WorksheetRole,
    pub handle: WorksheetHandle,
    pub rows: usize,
    pub entry: MetricsEntry,
    pub agents: Option<AgentSummary>,
    /// Worst detractors, only when no critical-feedback worksheet exists
    pub detractors: Option<CriticalCases>,
}

impl WorksheetMetrics {
    /// NPS figures, if this entry holds any.
    pub fn score(&self) -> Option<&NpsMetrics> {
        match &self.entry {
            MetricsEntry::Available { metrics: RoleMetrics::Score(metrics) } => Some(metrics),
            _ => None,
        }
    }

    /// Critical cases, if this entry holds any.
    pub fn cases(&self) -> Option<&CriticalCases> {
        match &self.entry {
            MetricsEntry::Available { metrics: RoleMetrics::Cases(cases) } => Some(cases),
            _ => None,
        }
    }
}

/// Metrics of every discovered worksheet, by role.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalysisBundle {
    /// Spreadsheet id
    pub spreadsheet: String,
    /// One entry per discovered worksheet, ordered by role
    pub worksheets: Vec<WorksheetMetrics>,
    /// Required roles no worksheet was found for
    pub missing_roles: Vec<WorksheetRole>,
    pub combined: CombinedMetrics,
}

impl AnalysisBundle {
    pub fn from_outcome(outcome: &DiscoveryOutcome) -> Self {
        Self::from_worksheets(&outcome.spreadsheet.id, &outcome.worksheets)
    }

    /// Computes metrics for every worksheet. A failed computation becomes an
    /// `Unavailable` entry, never an error.
    pub fn from_worksheets(spreadsheet: &str, set: &ClassifiedWorksheetSet) -> Self {
        let detractor_fallback = !set.contains(WorksheetRole::CriticalFeedback);
        let worksheets = set
            .iter()
            .map(|(role, worksheet)| {
                let entry = match compute(role, &worksheet.table) {
                    Ok(metrics) => MetricsEntry::Available { metrics },
                    Err(error) => MetricsEntry::Unavailable { reason: error.to_string() },
                };
                let detractors = (detractor_fallback && role.is_scored())
                    .then(|| detractor_cases(&worksheet.table, DETRACTOR_CASE_LIMIT).ok())
                    .flatten();
                WorksheetMetrics {
                    role,
                    handle: worksheet.handle.clone(),
                    rows: worksheet.table.row_count(),
                    entry,
                    agents: agent_summary(&worksheet.table),
                    detractors,
                }
            })
            .collect();

        Self {
            spreadsheet: spreadsheet.to_owned(),
            worksheets,
            missing_roles: set.missing_required(),
            combined: combined(set.iter().map(|(_, worksheet)| &worksheet.table)),
        }
    }

    pub fn get(&self, role: WorksheetRole) -> Option<&WorksheetMetrics> {
        self.worksheets.iter().find(|worksheet| worksheet.role == role)
    }
}

/// Where the insight text came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightOrigin {
    /// Text-generation service
    Service,
    /// Fixed fallback text
    Template,
}

/// Final analysis report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub store: Option<String>,
    pub generated_at: DateTime<Utc>,
    pub bundle: AnalysisBundle,
    pub insights: String,
    pub insight_origin: InsightOrigin,
    /// Bundle came from the result cache
    pub cached: bool,
}

const RULE: &str = "------------------------------------------------------------";

impl Report {
    pub fn render_text(&self) -> String {
        let mut text = String::new();
        let _ = writeln!(text, "NPS ANALYSIS{}", self.store.as_ref().map(|store| format!(" - {store}")).unwrap_or_default());
        let _ = writeln!(text, "Generated: {}", self.generated_at.format("%d/%m/%Y %H:%M"));
        let _ = writeln!(text, "Spreadsheet: {}", self.bundle.spreadsheet);

        section(&mut text, "NPS METRICS");
        for role in [WorksheetRole::ServiceFeedback, WorksheetRole::ProductFeedback] {
            match self.bundle.get(role) {
                Some(worksheet) => render_score(&mut text, worksheet),
                None => {
                    let _ = writeln!(text, "{}: data unavailable (worksheet not found)", role.label());
                }
            }
        }

        section(&mut text, "CRITICAL CASES");
        match self.bundle.get(WorksheetRole::CriticalFeedback) {
            Some(worksheet) => render_critical(&mut text, worksheet),
            None => {
                let _ = writeln!(text, "{}: worksheet not found", WorksheetRole::CriticalFeedback.label());
                render_detractors(&mut text, &self.bundle);
            }
        }

        section(&mut text, "OVERALL");
        let found = self.bundle.worksheets.iter().filter(|worksheet| worksheet.role != WorksheetRole::GeneralData).count();
        let _ = writeln!(text, "Worksheets analyzed: {}/{}", found, WorksheetRole::REQUIRED.len());
        let _ = writeln!(text, "Records analyzed: {}", self.bundle.combined.total_records);
        match &self.bundle.combined.metrics {
            Some(metrics) => {
                let _ = writeln!(text, "Combined NPS: {:.1} over {} ratings", metrics.nps_score, metrics.respondents);
            }
            None => {
                let _ = writeln!(text, "Combined NPS: data unavailable");
            }
        }

        section(&mut text, "INSIGHTS");
        let _ = writeln!(text, "{}", self.insights.trim());
        if self.insight_origin == InsightOrigin::Template {
            let _ = writeln!(text, "\n(generic insights: text generation unavailable)");
        }
        text
    }
}

fn section(text: &mut String, title: &str) {
    let _ = writeln!(text, "\n{RULE}\n{title}\n{RULE}");
}

fn render_score(text: &mut String, worksheet: &WorksheetMetrics) {
    let label = worksheet.role.label();
    match &worksheet.entry {
        MetricsEntry::Available { metrics: RoleMetrics::Score(metrics) } => {
            let _ = writeln!(text, "{label} [{}]", worksheet.handle);
            let _ = writeln!(text, "  Responses: {}", metrics.respondents);
            let _ = writeln!(text, "  NPS score: {:.1}", metrics.nps_score);
            let _ = writeln!(text, "  Mean rating: {:.2}", metrics.mean_rating);
            let _ = writeln!(text, "  Promoters (9-10): {} ({:.1}%)", metrics.promoters.count, metrics.promoters.percentage);
            let _ = writeln!(text, "  Passives (7-8):   {} ({:.1}%)", metrics.passives.count, metrics.passives.percentage);
            let _ = writeln!(text, "  Detractors (0-6): {} ({:.1}%)", metrics.detractors.count, metrics.detractors.percentage);
        }
        MetricsEntry::Available { metrics: RoleMetrics::Cases(_) } => {
            let _ = writeln!(text, "{label}: data unavailable");
        }
        MetricsEntry::Unavailable { reason } => {
            let _ = writeln!(text, "{label}: data unavailable ({reason})");
        }
    }
}

fn render_critical(text: &mut String, worksheet: &WorksheetMetrics) {
    match &worksheet.entry {
        MetricsEntry::Available { metrics: RoleMetrics::Cases(cases) } => {
            let _ = writeln!(text, "Total critical cases: {}", cases.total_cases);
            let _ = writeln!(text, "Lowest rated:");
            render_cases(text, cases);
        }
        MetricsEntry::Available { metrics: RoleMetrics::Score(_) } => {
            let _ = writeln!(text, "{}: data unavailable", worksheet.role.label());
        }
        MetricsEntry::Unavailable { reason } => {
            let _ = writeln!(text, "{}: data unavailable ({reason})", worksheet.role.label());
        }
    }
}

fn render_detractors(text: &mut String, bundle: &AnalysisBundle) {
    let mut any = false;
    for worksheet in &bundle.worksheets {
        let Some(cases) = worksheet.detractors.as_ref().filter(|cases| !cases.cases.is_empty()) else {
            continue;
        };
        any = true;
        let _ = writeln!(text, "Worst detractors of {} ({} in total):", worksheet.role.label(), cases.total_cases);
        render_cases(text, cases);
    }
    if !any {
        let _ = writeln!(text, "No detractors found in the survey worksheets");
    }
}

fn render_cases(text: &mut String, cases: &CriticalCases) {
    for (position, case) in cases.cases.iter().enumerate() {
        let rating = case.rating.map(|rating| format!("{rating}")).unwrap_or_else(|| "N/A".to_owned());
        let _ = writeln!(
            text,
            "{:2}. Rating: {} | Agent: {} | Store: {}",
            position + 1,
            rating,
            case.agent.as_deref().unwrap_or("N/A"),
            case.store.as_deref().unwrap_or("N/A"),
        );
        let _ = writeln!(text, "    \"{}\"", case.comment.as_deref().unwrap_or("No comment"));
    }
}
