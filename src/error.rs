use thiserror::Error;

/// Main error type for the NPS sheet analyzer.
/// Aggregates errors from the standard library, dependencies and internal modules.
///
/// Expected absence (a worksheet that does not exist, a missing column, an
/// unparsable body) never shows up here: those are `None` values at the layer
/// that detects them.
#[derive(Error, Debug)]
pub enum NpsError {
    #[error("{0}")]
    WithContextError(String),

    #[error("No worksheets discovered in spreadsheet '{0}'")]
    NoWorksheetsDiscovered(String),

    // Standard library errors
    #[error("{0}")]
    IoError(#[from] std::io::Error),

    // Third-party library errors
    #[error("{0}")]
    JsonError(#[from] serde_json::Error),

    // Spreadsheet module errors
    #[error("{0}")]
    HandleError(#[from] crate::spreadsheet::handle::HandleError),

    #[error("{0}")]
    FetchError(#[from] crate::helpers::reader::FetchError),

    // Report module errors
    #[error("{0}")]
    InsightError(#[from] crate::report::insights::InsightError),

    #[error("{0}")]
    CacheError(#[from] crate::cache::CacheError),
}

pub trait ResultMessage {
    fn with_prefix(self, message: &str) -> Self;
}

impl<T> ResultMessage for Result<T, NpsError> {
    fn with_prefix(self, message: &str) -> Self {
        self.map_err(|e| NpsError::WithContextError(format!("{}: {}", message, e)))
    }
}
