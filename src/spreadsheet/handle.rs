use regex::Regex;
use serde::Deserialize;
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use url::form_urlencoded;

#[derive(Error, Debug)]
pub enum HandleError {
    #[error("Not a spreadsheet URL (expected '/d/<id>'): '{0}'")]
    InvalidSpreadsheetUrl(String),
}

/// Identifier of one spreadsheet, extracted from its share URL.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpreadsheetHandle {
    /// Opaque document id (the `<id>` in `/d/<id>`)
    pub id: String,
    /// Worksheet id carried by the share URL, if any
    pub url_gid: Option<u64>,
}

impl SpreadsheetHandle {
    pub fn from_url(url: &str) -> Result<Self, HandleError> {
        let pattern = Regex::new(r"/d/([A-Za-z0-9_-]+)").expect("Hardcode regex pattern");
        let id = pattern
            .captures(url)
            .and_then(|captures| captures.get(1))
            .map(|id| id.as_str().to_owned())
            .ok_or_else(|| HandleError::InvalidSpreadsheetUrl(url.to_owned()))?;
        Ok(Self { id, url_gid: gid_from_url(url) })
    }
}

/// Extracts the numeric `gid=` worksheet id from a query string or fragment.
pub fn gid_from_url(url: &str) -> Option<u64> {
    let pattern = Regex::new(r"[?&#]gid=(\d+)").expect("Hardcode regex pattern");
    pattern.captures(url)?.get(1)?.as_str().parse().ok()
}

/// Reference to one worksheet within a spreadsheet.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum WorksheetHandle {
    /// Zero-based position in the tab bar
    Index(u32),
    /// Literal tab name
    Name(String),
    /// Opaque worksheet id, numeric (`1410159651`) or legacy (`od6`)
    Id(String),
}

impl WorksheetHandle {
    /// Retrieval URL of the worksheet as delimited text.
    ///
    /// # Arguments
    /// * `base` - Document base URL, without trailing slash
    /// * `spreadsheet` - Owning spreadsheet
    pub fn export_url(&self, base: &str, spreadsheet: &SpreadsheetHandle) -> String {
        let base = base.trim_end_matches('/');
        match self {
            WorksheetHandle::Index(index) => {
                format!("{}/{}/export?format=csv&single=true&gid={}", base, spreadsheet.id, index)
            }
            WorksheetHandle::Id(id) => format!("{}/{}/export?format=csv&gid={}", base, spreadsheet.id, id),
            WorksheetHandle::Name(name) => {
                format!("{}/{}/gviz/tq?tqx=out:csv&sheet={}", base, spreadsheet.id, encode_name(name))
            }
        }
    }

    pub fn id(id: u64) -> Self {
        WorksheetHandle::Id(id.to_string())
    }
}

/// Percent-encodes a worksheet name for the query export (spaces as `%20`).
fn encode_name(name: &str) -> String {
    form_urlencoded::byte_serialize(name.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

impl fmt::Display for WorksheetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorksheetHandle::Index(index) => write!(f, "#{}", index),
            WorksheetHandle::Name(name) => write!(f, "'{}'", name),
            WorksheetHandle::Id(id) => write!(f, "gid={}", id),
        }
    }
}

impl From<u64> for WorksheetHandle {
    fn from(id: u64) -> Self {
        WorksheetHandle::id(id)
    }
}

impl From<&str> for WorksheetHandle {
    /// Digits and `od<N>` become ids, anything else a name.
    fn from(text: &str) -> Self {
        let text = text.trim();
        let legacy = text
            .strip_prefix("od")
            .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()));
        if legacy || (!text.is_empty() && text.chars().all(|c| c.is_ascii_digit())) {
            WorksheetHandle::Id(text.to_owned())
        } else {
            WorksheetHandle::Name(text.to_owned())
        }
    }
}
