use crate::metrics::parse_rating;
use crate::spreadsheet::column::ColumnKind;
use crate::spreadsheet::sheet::RawTable;
use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeMap;

/// Mean rating of one agent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentScore {
    pub name: String,
    pub responses: usize,
    pub mean_rating: f64,
}

/// Agents appearing in a worksheet and the best rated of them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentSummary {
    /// Distinct agents with at least one valid rating
    pub agents: usize,
    pub top: AgentScore,
}

/// Groups valid ratings by agent. `None` without an agent column, a rating
/// column, or any rated agent. Ties on the mean go to the first name in
/// alphabetical order.
pub fn agent_summary(table: &RawTable) -> Option<AgentSummary> {
    let agent_column = ColumnKind::Agent.find(table)?;
    let rating_column = ColumnKind::Rating.find(table)?;

    let mut groups: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    for row in 0..table.row_count() {
        let Some(agent) = table.cell(row, agent_column) else {
            continue;
        };
        let Some(rating) = table.cell(row, rating_column).and_then(parse_rating) else {
            continue;
        };
        let (sum, count) = groups.entry(agent).or_default();
        *sum += rating;
        *count += 1;
    }

    let agents = groups.len();
    let top = groups
        .into_iter()
        .map(|(name, (sum, count))| AgentScore {
            name: name.to_owned(),
            responses: count,
            mean_rating: sum / count as f64,
        })
        .reduce(|best, score| if score.mean_rating > best.mean_rating { score } else { best })?;
    Some(AgentSummary { agents, top })
}
