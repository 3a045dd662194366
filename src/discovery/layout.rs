//! Single-worksheet layout: every survey in one tab, told apart by a
//! survey-type column holding values such as `D+1`, `D+30` or `Ruim`.
use crate::classify::classify;
use crate::classify::WorksheetRole;
use crate::helpers::string::compact;
use crate::spreadsheet::column::ColumnKind;
use crate::spreadsheet::sheet::RawTable;
use std::collections::BTreeMap;

/// Minimal number of surveys for the layout to be recognized.
const MIN_SURVEYS: usize = 2;

/// Role named by a survey-type value, if any.
pub fn survey_role(value: &str) -> Option<WorksheetRole> {
    let value = compact(value);
    if value.contains("ruim") {
        Some(WorksheetRole::CriticalFeedback)
    } else if value.contains("d30") {
        Some(WorksheetRole::ProductFeedback)
    } else if value.contains("d1") {
        Some(WorksheetRole::ServiceFeedback)
    } else {
        None
    }
}

/// Splits a combined worksheet into one table per survey, sharing the header.
///
/// Returns `None` unless at least two surveys are present. A worksheet that
/// classifies as critical feedback on its own is not a combined export: its
/// source column names the survey each bad case came from.
pub fn split_by_survey_type(table: &RawTable) -> Option<Vec<(WorksheetRole, RawTable)>> {
    let column = ColumnKind::SurveyType.find(table)?;
    if classify(table) == WorksheetRole::CriticalFeedback {
        return None;
    }

    let mut rows: BTreeMap<WorksheetRole, Vec<usize>> = BTreeMap::new();
    for row in 0..table.row_count() {
        if let Some(role) = table.cell(row, column).and_then(survey_role) {
            rows.entry(role).or_default().push(row);
        }
    }
    if rows.len() < MIN_SURVEYS {
        return None;
    }
    Some(
        rows.into_iter()
            .map(|(role, rows)| (role, table.select_rows(&rows)))
            .collect(),
    )
}
