use crate::metrics::parse_rating;
use crate::metrics::MetricsError;
use crate::spreadsheet::column::ColumnKind;
use crate::spreadsheet::sheet::RawTable;
use serde::Deserialize;
use serde::Serialize;
use std::cmp::Ordering;

/// Comment length kept for a critical case.
pub const CRITICAL_COMMENT_CHARS: usize = 200;
/// Worst detractors listed when no critical-feedback worksheet exists.
pub const DETRACTOR_CASE_LIMIT: usize = 5;
/// Comment length kept for a detractor case.
pub const DETRACTOR_COMMENT_CHARS: usize = 150;
/// Highest detractor rating.
const DETRACTOR_MAX: f64 = 6.0;

/// One poorly rated row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CriticalCase {
    /// Row position in the worksheet, zero based
    pub row: usize,
    /// `None` when the cell is not a valid rating
    pub rating: Option<f64>,
    pub comment: Option<String>,
    pub agent: Option<String>,
    pub store: Option<String>,
}

/// The worst cases of a worksheet, ordered by ascending rating.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CriticalCases {
    /// Every row of the worksheet, listed or not
    pub total_cases: usize,
    pub cases: Vec<CriticalCase>,
}

/// Lists the `limit` lowest-rated rows. Rows without a valid rating go
/// last; equal ratings keep their row order.
pub fn critical_cases(table: &RawTable, limit: usize) -> Result<CriticalCases, MetricsError> {
    let rating_column = ColumnKind::Rating.find(table).ok_or(MetricsError::MissingRatingColumn)?;
    let mut rated: Vec<(usize, Option<f64>)> = (0..table.row_count())
        .map(|row| (row, table.cell(row, rating_column).and_then(parse_rating)))
        .collect();
    rated.sort_by(|(_, left), (_, right)| compare_nulls_last(*left, *right));

    Ok(CriticalCases {
        total_cases: table.row_count(),
        cases: collect_cases(table, rated, limit, CRITICAL_COMMENT_CHARS),
    })
}

/// Lists the `limit` lowest-rated detractors (ratings up to 6).
pub fn detractor_cases(table: &RawTable, limit: usize) -> Result<CriticalCases, MetricsError> {
    let rating_column = ColumnKind::Rating.find(table).ok_or(MetricsError::MissingRatingColumn)?;
    let mut rated: Vec<(usize, Option<f64>)> = (0..table.row_count())
        .filter_map(|row| {
            let rating = table.cell(row, rating_column).and_then(parse_rating)?;
            (rating <= DETRACTOR_MAX).then_some((row, Some(rating)))
        })
        .collect();
    rated.sort_by(|(_, left), (_, right)| compare_nulls_last(*left, *right));

    Ok(CriticalCases {
        total_cases: rated.len(),
        cases: collect_cases(table, rated, limit, DETRACTOR_COMMENT_CHARS),
    })
}

fn compare_nulls_last(left: Option<f64>, right: Option<f64>) -> Ordering {
    match (left, right) {
        (Some(left), Some(right)) => left.total_cmp(&right),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn collect_cases(
    table: &RawTable,
    rated: Vec<(usize, Option<f64>)>,
    limit: usize,
    comment_chars: usize,
) -> Vec<CriticalCase> {
    let comment_column = ColumnKind::Comment.find(table);
    let agent_column = ColumnKind::Agent.find(table);
    let store_column = ColumnKind::Store.find(table);
    let text = |row: usize, column: Option<usize>| column.and_then(|column| table.cell(row, column)).map(str::to_owned);

    rated
        .into_iter()
        .take(limit)
        .map(|(row, rating)| CriticalCase {
            row,
            rating,
            comment: text(row, comment_column).map(|comment| truncate(&comment, comment_chars)),
            agent: text(row, agent_column),
            store: text(row, store_column),
        })
        .collect()
}

/// First `chars` characters of `text`.
pub fn truncate(text: &str, chars: usize) -> String {
    text.chars().take(chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn critical_table() -> RawTable {
        RawTable::from_literal(
            &["Situacao", "Avaliacao", "Comentario", "Vendedor", "Loja"],
            &[
                &["Pendente", "5", "Demorou", "Carlos", "Centro"],
                &["Pendente", "", "Sem nota", "Bia", ""],
                &["Resolvido", "1", "", "Carlos", "Norte"],
                &["Pendente", "5", "Segundo cinco", "", "Sul"],
                &["Pendente", "0", "Horrivel", "Rui", "Centro"],
            ],
        )
    }

    #[test]
    fn test_critical_cases_order() {
        let cases = critical_cases(&critical_table(), 10).unwrap();
        assert_eq!(cases.total_cases, 5);
        let rows: Vec<usize> = cases.cases.iter().map(|case| case.row).collect();
        assert_eq!(rows, vec![4, 2, 0, 3, 1]);
        assert_eq!(cases.cases[0].rating, Some(0.0));
        assert_eq!(cases.cases[4].rating, None);
        assert_eq!(cases.cases[1].comment, None);
        assert_eq!(cases.cases[3].agent, None);
        assert_eq!(cases.cases[3].store.as_deref(), Some("Sul"));
        assert_eq!(cases.cases[0].agent.as_deref(), Some("Rui"));
    }

    #[test]
    fn test_critical_cases_limit() {
        let cases = critical_cases(&critical_table(), 2).unwrap();
        assert_eq!(cases.total_cases, 5);
        assert_eq!(cases.cases.len(), 2);
    }

    #[test]
    fn test_comment_truncated() {
        let long = "á".repeat(300);
        let table = RawTable::from_literal(&["Nota", "Comentario"], &[&["2", long.as_str()]]);
        let cases = critical_cases(&table, 10).unwrap();
        assert_eq!(cases.cases[0].comment.as_ref().unwrap().chars().count(), CRITICAL_COMMENT_CHARS);
        let detractors = detractor_cases(&table, 5).unwrap();
        assert_eq!(detractors.cases[0].comment.as_ref().unwrap().chars().count(), DETRACTOR_COMMENT_CHARS);
    }

    #[test]
    fn test_detractor_cases() {
        let table = RawTable::from_literal(
            &["Nota", "Comentario"],
            &[&["9", "Otimo"], &["6", "Regular"], &["2", "Ruim"], &["x", "?"], &["7", "Ok"], &["6", "Lento"]],
        );
        let detractors = detractor_cases(&table, 5).unwrap();
        assert_eq!(detractors.total_cases, 3);
        let comments: Vec<&str> = detractors.cases.iter().filter_map(|case| case.comment.as_deref()).collect();
        assert_eq!(comments, vec!["Ruim", "Regular", "Lento"]);
    }

    #[test]
    fn test_missing_rating_column() {
        let table = RawTable::from_literal(&["Comentario"], &[&["Ruim"]]);
        assert_eq!(critical_cases(&table, 10), Err(MetricsError::MissingRatingColumn));
        assert_eq!(detractor_cases(&table, 5), Err(MetricsError::MissingRatingColumn));
    }
}
