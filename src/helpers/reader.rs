use crate::helpers::encoding::decodings;
use crate::spreadsheet::handle::SpreadsheetHandle;
use crate::spreadsheet::handle::WorksheetHandle;
use crate::spreadsheet::sheet::RawTable;
use crate::spreadsheet::FetchRequest;
use crate::spreadsheet::WorksheetSource;
use std::io::Read;
use thiserror::Error;
use tracing::debug;
use ureq::Agent;
use ureq::AgentBuilder;

/// Default document base for worksheet retrieval URLs.
pub const DEFAULT_BASE_URL: &str = "https://docs.google.com/spreadsheets/d";

pub const DEFAULT_USER_AGENT: &str = concat!("nps-sheet/", env!("CARGO_PKG_VERSION"));

/// Upper bound on a downloaded worksheet body.
const MAX_BODY_BYTES: u64 = 32 * 1024 * 1024;

/// Markers of a provider error page served with a success status.
const PROVIDER_ERROR_MARKERS: [&str; 4] = [
    "Sorry, unable to open the file at this time",
    "<!DOCTYPE html",
    "<html",
    "google.visualization.Query.setResponse",
];

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Transport failure for '{url}': {message}")]
    Transport { url: String, message: String },

    #[error("Failed to read body from '{url}': {source}")]
    Body {
        url: String,
        #[source]
        source: std::io::Error,
    },
}

/// Decodes a body with each candidate encoding in turn and keeps the first
/// decoding that parses into a non-empty table. Returns an empty table if none does.
pub fn decode_table(body: &[u8]) -> RawTable {
    for (encoding, text) in decodings(body) {
        let table = RawTable::parse_csv(&text);
        if !table.is_empty() {
            debug!(encoding = encoding.name(), rows = table.row_count(), "decoded worksheet body");
            return table;
        }
    }
    RawTable::default()
}

/// Reads at most `cap` bytes. `None` when the input holds more than that.
pub fn read_capped(reader: impl Read, cap: u64) -> std::io::Result<Option<Vec<u8>>> {
    let mut body = Vec::new();
    reader.take(cap + 1).read_to_end(&mut body)?;
    Ok((body.len() as u64 <= cap).then_some(body))
}

/// Applies the plausibility checks to a successful body.
/// `None` for short bodies, provider error pages and bodies without data rows.
pub fn table_from_body(body: &[u8], min_body_len: usize) -> Option<RawTable> {
    if body.len() < min_body_len {
        return None;
    }
    let head = String::from_utf8_lossy(&body[..body.len().min(4096)]);
    if PROVIDER_ERROR_MARKERS.iter().any(|marker| head.contains(marker)) {
        return None;
    }
    Some(decode_table(body)).filter(|table| !table.is_empty())
}

/// Fetches worksheets over HTTP using the export URL schemes.
pub struct HttpWorksheetSource {
    agent: Agent,
    base_url: String,
}

impl HttpWorksheetSource {
    pub fn new(base_url: &str, user_agent: &str) -> Self {
        let agent = AgentBuilder::new().user_agent(user_agent).build();
        Self { agent, base_url: base_url.trim_end_matches('/').to_owned() }
    }
}

impl Default for HttpWorksheetSource {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL, DEFAULT_USER_AGENT)
    }
}

impl WorksheetSource for HttpWorksheetSource {
    fn fetch(
        &self,
        spreadsheet: &SpreadsheetHandle,
        worksheet: &WorksheetHandle,
        request: &FetchRequest,
    ) -> Result<Option<RawTable>, FetchError> {
        let url = worksheet.export_url(&self.base_url, spreadsheet);
        let response = match self.agent.get(&url).timeout(request.timeout).call() {
            Ok(response) => response,
            Err(ureq::Error::Status(status, _)) => {
                debug!(%url, status, "worksheet not available");
                return Ok(None);
            }
            Err(error) => Err(FetchError::Transport { url: url.to_owned(), message: error.to_string() })?,
        };

        let body = read_capped(response.into_reader(), MAX_BODY_BYTES)
            .map_err(|source| FetchError::Body { url: url.to_owned(), source })?;
        let Some(body) = body else {
            debug!(%url, limit = MAX_BODY_BYTES, "worksheet body over size limit");
            return Ok(None);
        };
        Ok(table_from_body(&body, request.min_body_len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const BODY: &str = "Data,Nome,WhatsApp,Avaliacao\n2025-01-01,Ana,11999990000,9\n2025-01-02,Rui,11988880000,10\n";

    #[test]
    fn test_table_from_body() {
        let table = table_from_body(BODY.as_bytes(), 50).unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.header(), vec!["Data", "Nome", "WhatsApp", "Avaliacao"]);
    }

    #[test]
    fn test_short_body_is_not_found() {
        assert!(table_from_body(b"A,B\n1,2\n", 50).is_none());
        assert!(table_from_body(BODY.as_bytes(), BODY.len() + 1).is_none());
    }

    #[test]
    fn test_provider_error_page_is_not_found() {
        let page = "<!DOCTYPE html><html><head><title>Google Sheets</title></head><body>Sorry, unable to open the file at this time.</body></html>";
        assert!(table_from_body(page.as_bytes(), 50).is_none());
    }

    #[test]
    fn test_header_only_body_is_not_found() {
        let body = "Data,Nome,Telefone,Avaliacao,Comentario,Loja,Vendedor,Situacao\n";
        assert!(body.len() >= 50);
        assert!(table_from_body(body.as_bytes(), 50).is_none());
    }

    #[test]
    fn test_decode_table_latin1_body() {
        let mut body = b"Avalia\xe7\xe3o,Coment\xe1rio\n".to_vec();
        body.extend_from_slice(b"9,\xd3timo atendimento\n");
        let table = decode_table(&body);
        assert_eq!(table.header(), vec!["Avaliação", "Comentário"]);
        assert_eq!(table.cell(0, 1), Some("Ótimo atendimento"));
    }

    #[test]
    fn test_read_capped() {
        let body = read_capped(Cursor::new(BODY.as_bytes()), BODY.len() as u64).unwrap();
        assert_eq!(body.as_deref(), Some(BODY.as_bytes()));
        assert!(read_capped(Cursor::new(BODY.as_bytes()), BODY.len() as u64 - 1).unwrap().is_none());
        assert_eq!(read_capped(Cursor::new(b""), 0).unwrap(), Some(Vec::new()));
    }

    #[test]
    fn test_decode_table_garbage_is_empty() {
        assert!(decode_table(b"").is_empty());
    }
}
