//! # NPS Metrics
//!
//! Ratings are numbers in `[0, 10]`; anything else in the rating column is
//! discarded, never clamped. Promoters rate 9-10, passives 7-8 and
//! detractors 0-6. The NPS score is the promoter percentage minus the
//! detractor percentage, so it always lies in `[-100, 100]`.
pub mod agents;
pub mod cases;

use crate::classify::WorksheetRole;
use crate::metrics::cases::critical_cases;
use crate::metrics::cases::CriticalCases;
use crate::spreadsheet::column::ColumnKind;
use crate::spreadsheet::sheet::RawTable;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

/// Worst-rated rows listed for a critical-feedback worksheet.
pub const CRITICAL_CASE_LIMIT: usize = 10;

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetricsError {
    #[error("Rating column not found")]
    MissingRatingColumn,

    #[error("No valid ratings (0-10) found")]
    NoValidRatings,
}

/// NPS bucket of a valid rating.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NpsBucket {
    Promoter,
    Passive,
    Detractor,
}

impl NpsBucket {
    pub fn of(rating: f64) -> Self {
        if rating >= 9.0 {
            NpsBucket::Promoter
        } else if rating >= 7.0 {
            NpsBucket::Passive
        } else {
            NpsBucket::Detractor
        }
    }
}

/// Parses a rating cell. Accepts a decimal comma; `None` for non-numeric
/// text and values outside `[0, 10]`.
pub fn parse_rating(text: &str) -> Option<f64> {
    let value: f64 = text.trim().replace(',', ".").parse().ok()?;
    (value.is_finite() && (0.0..=10.0).contains(&value)).then_some(value)
}

/// Count and percentage of one bucket.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BucketShare {
    pub count: usize,
    /// Share of respondents, 0-100
    pub percentage: f64,
}

impl BucketShare {
    fn new(count: usize, total: usize) -> Self {
        Self { count, percentage: count as f64 * 100.0 / total as f64 }
    }
}

/// Aggregate NPS figures over a set of valid ratings.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NpsMetrics {
    /// Number of valid ratings
    pub respondents: usize,
    pub promoters: BucketShare,
    pub passives: BucketShare,
    pub detractors: BucketShare,
    /// Promoter percentage minus detractor percentage
    pub nps_score: f64,
    pub mean_rating: f64,
}

impl NpsMetrics {
    /// Metrics over valid ratings; `None` when there are none.
    pub fn from_ratings(ratings: &[f64]) -> Option<Self> {
        if ratings.is_empty() {
            return None;
        }
        let total = ratings.len();
        let count = |bucket: NpsBucket| ratings.iter().filter(|rating| NpsBucket::of(**rating) == bucket).count();
        let promoters = BucketShare::new(count(NpsBucket::Promoter), total);
        let passives = BucketShare::new(count(NpsBucket::Passive), total);
        let detractors = BucketShare::new(count(NpsBucket::Detractor), total);
        Some(Self {
            respondents: total,
            promoters,
            passives,
            detractors,
            nps_score: promoters.percentage - detractors.percentage,
            mean_rating: ratings.iter().sum::<f64>() / total as f64,
        })
    }
}

/// Per-role aggregate: an NPS score for survey worksheets, a case list for critical feedback.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RoleMetrics {
    Score(NpsMetrics),
    Cases(CriticalCases),
}

/// Valid ratings of a table, in row order.
pub fn valid_ratings(table: &RawTable) -> Result<Vec<f64>, MetricsError> {
    let column = ColumnKind::Rating.find(table).ok_or(MetricsError::MissingRatingColumn)?;
    Ok((0..table.row_count())
        .filter_map(|row| table.cell(row, column).and_then(parse_rating))
        .collect())
}

/// NPS metrics of a table.
pub fn nps_metrics(table: &RawTable) -> Result<NpsMetrics, MetricsError> {
    NpsMetrics::from_ratings(&valid_ratings(table)?).ok_or(MetricsError::NoValidRatings)
}

/// Computes the aggregate matching a worksheet's role.
pub fn compute(role: WorksheetRole, table: &RawTable) -> Result<RoleMetrics, MetricsError> {
    match role {
        WorksheetRole::CriticalFeedback => critical_cases(table, CRITICAL_CASE_LIMIT).map(RoleMetrics::Cases),
        _ => nps_metrics(table).map(RoleMetrics::Score),
    }
}

/// NPS over several worksheets at once.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CombinedMetrics {
    /// Rows across every worksheet, rated or not
    pub total_records: usize,
    /// `None` when no worksheet has a valid rating
    pub metrics: Option<NpsMetrics>,
}

/// Pools the valid ratings of every table. Tables without a rating column
/// still count toward `total_records`.
pub fn combined<'a>(tables: impl IntoIterator<Item = &'a RawTable>) -> CombinedMetrics {
    let mut total_records = 0;
    let mut ratings = Vec::new();
    for table in tables {
        total_records += table.row_count();
        ratings.extend(valid_ratings(table).unwrap_or_default());
    }
    CombinedMetrics { total_records, metrics: NpsMetrics::from_ratings(&ratings) }
}
