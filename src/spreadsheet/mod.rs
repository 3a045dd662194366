//! # Spreadsheet Access
//!
//! Worksheet addressing, retrieval and the in-memory table model.
//! A [`WorksheetSource`] turns a `(spreadsheet, worksheet)` pair into a
//! [`RawTable`], or reports that nothing usable lives at that handle.
pub mod column;
pub mod handle;
pub mod sheet;

use crate::helpers::reader::FetchError;
use crate::spreadsheet::handle::SpreadsheetHandle;
use crate::spreadsheet::handle::WorksheetHandle;
use crate::spreadsheet::sheet::RawTable;
use std::time::Duration;

/// Per-probe limits chosen by the calling strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FetchRequest {
    /// Whole-request timeout
    pub timeout: Duration,
    /// Bodies shorter than this many bytes are implausible and treated as not found
    pub min_body_len: usize,
}

impl FetchRequest {
    pub fn new(timeout: Duration, min_body_len: usize) -> Self {
        Self { timeout, min_body_len }
    }
}

/// Retrieves one worksheet as a table.
///
/// `Ok(None)` is the expected "not found" outcome: missing worksheet,
/// non-success status, implausible or unparsable body, or zero data rows.
/// `Err` is reserved for transport failures; callers log and move on either way.
pub trait WorksheetSource {
    fn fetch(
        &self,
        spreadsheet: &SpreadsheetHandle,
        worksheet: &WorksheetHandle,
        request: &FetchRequest,
    ) -> Result<Option<RawTable>, FetchError>;
}

impl<S: WorksheetSource + ?Sized> WorksheetSource for &S {
    fn fetch(
        &self,
        spreadsheet: &SpreadsheetHandle,
        worksheet: &WorksheetHandle,
        request: &FetchRequest,
    ) -> Result<Option<RawTable>, FetchError> {
        (**self).fetch(spreadsheet, worksheet, request)
    }
}
