//! # NPS Spreadsheet Analyzer
//!
//! Finds the survey worksheets of a publicly shared spreadsheet, classifies
//! them and computes Net Promoter Score metrics from them.
//!
//! ## Features
//!
//! - **Worksheet discovery**: tab ids are usually unknown, so an ordered
//!   series of strategies (combined layout, caller handles, tab positions,
//!   canonical names, name variants, hashed and numeric id sweeps) probes
//!   the spreadsheet until enough survey roles are found
//! - **Classification**: a column-label rule cascade with a content-scoring
//!   fallback assigns each worksheet a role
//! - **Reconciliation**: missing survey roles are filled from worksheets
//!   already found
//! - **Metrics**: promoter/passive/detractor buckets, NPS score, critical
//!   cases, detractor fallback and per-agent breakdown
//! - **Report**: plain-text or JSON report, with insights from an
//!   OpenAI-compatible service or a fixed template
//! - **Result cache**: one-hour file cache keyed by URL and filters
//!
//! ## Example
//!
//! ```no_run
//! use nps_sheet::analyze;
//! use nps_sheet::config::DiscoveryOptions;
//! use nps_sheet::config::InsightConfig;
//! use nps_sheet::discovery::events::TracingSink;
//! use nps_sheet::helpers::reader::HttpWorksheetSource;
//! use nps_sheet::report::insights::ChatCompletionClient;
//!
//! let options = DiscoveryOptions::default();
//! let source = HttpWorksheetSource::new(&options.base_url, &options.user_agent);
//! let insights = ChatCompletionClient::new(InsightConfig::from_env());
//! let url = "https://docs.google.com/spreadsheets/d/abc123/edit";
//! let report = analyze(url, Some("Centro"), &options, &source, &TracingSink, &insights, None)?;
//! println!("{}", report.render_text());
//! # Ok::<(), nps_sheet::error::NpsError>(())
//! ```
pub mod cache;
pub mod classify;
pub mod config;
pub mod discovery;
pub mod error;
pub mod helpers;
pub mod metrics;
pub mod report;
pub mod spreadsheet;

use crate::cache::CacheFilters;
use crate::cache::ResultCache;
use crate::config::DiscoveryOptions;
use crate::discovery::events::EventSink;
use crate::discovery::Discovery;
use crate::error::NpsError;
use crate::error::ResultMessage;
use crate::report::insights::generate_insights;
use crate::report::insights::InsightService;
use crate::report::AnalysisBundle;
use crate::report::Report;
use crate::spreadsheet::handle::SpreadsheetHandle;
use crate::spreadsheet::WorksheetSource;
use chrono::Utc;
use tracing::info;

/// Cache filters of a run: the caller-supplied handles change what is found.
pub fn cache_filters(options: &DiscoveryOptions) -> CacheFilters {
    let mut filters = CacheFilters::new();
    if !options.explicit_handles.is_empty() {
        let handles: Vec<String> = options.explicit_handles.iter().map(|handle| handle.to_string()).collect();
        filters.insert("handles".to_owned(), handles.join(","));
    }
    filters
}

/// Runs a full analysis of the spreadsheet at `url`.
///
/// A fresh cached bundle skips discovery. Insight generation never fails;
/// the only errors are an unrecognizable URL and a spreadsheet where no
/// worksheet could be discovered.
///
/// # Arguments
///
/// * `url` - Share URL of the spreadsheet
/// * `store` - Store name shown in the report and the insight prompt
/// * `options` - Discovery settings
/// * `source` - Worksheet retrieval
/// * `sink` - Receives discovery events
/// * `insights` - Text-generation service
/// * `cache` - Result cache, if enabled
pub fn analyze(
    url: &str,
    store: Option<&str>,
    options: &DiscoveryOptions,
    source: &dyn WorksheetSource,
    sink: &dyn EventSink,
    insights: &dyn InsightService,
    cache: Option<&ResultCache>,
) -> Result<Report, NpsError> {
    SpreadsheetHandle::from_url(url)?;
    let filters = cache_filters(options);

    let cached = cache.and_then(|cache| cache.get(url, &filters));
    let is_cached = cached.is_some();
    let bundle = match cached {
        Some(bundle) => bundle,
        None => {
            let outcome = Discovery::new(source, sink, options).run(url).with_prefix(url)?;
            if outcome.is_empty() {
                Err(NpsError::NoWorksheetsDiscovered(outcome.spreadsheet.id.to_owned()))?;
            }
            info!(roles = ?outcome.worksheets.roles(), decided_by = ?outcome.decided_by, "discovery finished");
            let bundle = AnalysisBundle::from_outcome(&outcome);
            if let Some(cache) = cache {
                cache.put(url, &filters, &bundle);
            }
            bundle
        }
    };

    let (insights, insight_origin) = generate_insights(insights, &bundle, store);
    Ok(Report {
        store: store.map(str::to_owned),
        generated_at: Utc::now(),
        bundle,
        insights,
        insight_origin,
        cached: is_cached,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::WorksheetRole;
    use crate::config::CacheConfig;
    use crate::discovery::events::MemorySink;
    use crate::discovery::events::NullSink;
    use crate::helpers::reader::FetchError;
    use crate::report::insights::InsightError;
    use crate::report::InsightOrigin;
    use crate::spreadsheet::handle::WorksheetHandle;
    use crate::spreadsheet::sheet::RawTable;
    use crate::spreadsheet::FetchRequest;
    use std::cell::Cell;
    use std::collections::HashMap;

    const URL: &str = "https://docs.google.com/spreadsheets/d/abc123/edit#gid=0";

    struct FakeSource {
        worksheets: HashMap<WorksheetHandle, &'static str>,
        probes: Cell<usize>,
    }

    impl FakeSource {
        fn new(worksheets: &[(WorksheetHandle, &'static str)]) -> Self {
            Self { worksheets: worksheets.iter().cloned().collect(), probes: Cell::new(0) }
        }
    }

    impl WorksheetSource for FakeSource {
        fn fetch(
            &self,
            _spreadsheet: &SpreadsheetHandle,
            handle: &WorksheetHandle,
            _request: &FetchRequest,
        ) -> Result<Option<RawTable>, FetchError> {
            self.probes.set(self.probes.get() + 1);
            Ok(self.worksheets.get(handle).map(|text| RawTable::parse_csv(text)))
        }
    }

    struct Offline;

    impl InsightService for Offline {
        fn generate(&self, _prompt: &str) -> Result<String, InsightError> {
            Err(InsightError::Transport("offline".to_owned()))
        }
    }

    fn survey_source() -> FakeSource {
        FakeSource::new(&[
            (WorksheetHandle::Index(1), "Id,Telefone,Avaliacao,Comentario\n1,1199,9,Bom\n2,1198,4,Lento\n3,1197,10,\n"),
            (WorksheetHandle::Index(4), "Data,Nome,WhatsApp,Avaliacao\n01/01,Ana,119,9\n02/01,Rui,118,10\n03/01,Lia,117,6\n"),
        ])
    }

    #[test]
    fn test_analyze_end_to_end() {
        let source = survey_source();
        let sink = MemorySink::default();
        let options = DiscoveryOptions::default();
        let report = analyze(URL, Some("Centro"), &options, &source, &sink, &Offline, None).unwrap();

        assert!(!report.cached);
        assert_eq!(report.insight_origin, InsightOrigin::Template);
        assert_eq!(report.bundle.spreadsheet, "abc123");
        let product = report.bundle.get(WorksheetRole::ProductFeedback).unwrap();
        assert_eq!(product.score().unwrap().respondents, 3);
        assert!(report.bundle.get(WorksheetRole::ServiceFeedback).is_some());
        assert_eq!(report.bundle.missing_roles, vec![WorksheetRole::CriticalFeedback]);
        assert!(!sink.events().is_empty());
        assert!(report.render_text().contains("NPS ANALYSIS - Centro"));
    }

    #[test]
    fn test_nothing_discovered_is_an_error() {
        let source = FakeSource::new(&[]);
        let options = DiscoveryOptions { max_hashed_guesses: 3, ..DiscoveryOptions::default() };
        let error = analyze(URL, None, &options, &source, &NullSink, &Offline, None).unwrap_err();
        assert!(matches!(error, NpsError::NoWorksheetsDiscovered(id) if id == "abc123"));
    }

    #[test]
    fn test_invalid_url_is_an_error() {
        let source = survey_source();
        let options = DiscoveryOptions::default();
        let error = analyze("https://example.com/nothing", None, &options, &source, &NullSink, &Offline, None).unwrap_err();
        assert!(matches!(error, NpsError::HandleError(_)));
        assert_eq!(source.probes.get(), 0);
    }

    #[test]
    fn test_cache_hit_skips_discovery() {
        let directory = tempfile::tempdir().unwrap();
        let cache = ResultCache::new(CacheConfig { directory: directory.path().to_path_buf(), ..CacheConfig::default() });
        let options = DiscoveryOptions::default();

        let source = survey_source();
        let first = analyze(URL, None, &options, &source, &NullSink, &Offline, Some(&cache)).unwrap();
        assert!(!first.cached);
        assert!(source.probes.get() > 0);

        let source = survey_source();
        let second = analyze(URL, None, &options, &source, &NullSink, &Offline, Some(&cache)).unwrap();
        assert!(second.cached);
        assert_eq!(source.probes.get(), 0);
        assert_eq!(second.bundle.worksheets.len(), first.bundle.worksheets.len());
        assert_eq!(second.insight_origin, InsightOrigin::Template);
    }

    #[test]
    fn test_cache_filters_follow_explicit_handles() {
        let mut options = DiscoveryOptions::default();
        assert!(cache_filters(&options).is_empty());
        options.explicit_handles = vec![WorksheetHandle::from(42u64), WorksheetHandle::from("NPS Ruim")];
        assert_eq!(cache_filters(&options)["handles"], "gid=42,'NPS Ruim'");
    }
}
