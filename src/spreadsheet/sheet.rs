use csv::ReaderBuilder;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

/// A named column with its cells in row order. Empty cells are `None`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawColumn {
    /// Header label exactly as downloaded (trimmed)
    pub name: String,
    /// Cell values, one per row
    pub cells: Vec<Option<String>>,
}

/// A downloaded worksheet: ordered named columns of equal length.
/// A table with zero rows is treated as "not found" by every caller.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    columns: Vec<RawColumn>,
    rows: usize,
}

impl RawTable {
    /// Builds a table from a header and row-major records.
    /// Short records are padded with empty cells, long records are truncated,
    /// and records whose cells are all empty are dropped.
    pub fn new(header: Vec<String>, records: Vec<Vec<Option<String>>>) -> Self {
        let mut columns: Vec<RawColumn> = header
            .into_iter()
            .map(|name| RawColumn { name, cells: Vec::new() })
            .collect();
        let mut rows = 0;
        for record in records {
            if record.iter().all(|cell| cell.is_none()) {
                continue;
            }
            let mut record = record.into_iter();
            for column in columns.iter_mut() {
                column.cells.push(record.next().flatten());
            }
            rows += 1;
        }
        if columns.is_empty() {
            rows = 0;
        }
        Self { columns, rows }
    }

    /// Parses delimited text with a header row.
    /// Malformed input produces an empty table rather than an error.
    pub fn parse_csv(text: &str) -> Self {
        let text = text.trim_start_matches('\u{feff}');
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());
        let header: Vec<String> = match reader.headers() {
            Ok(header) => header.iter().map(|label| label.trim().to_owned()).collect(),
            Err(error) => {
                debug!(%error, "unreadable csv header");
                return Self::default();
            }
        };
        if header.iter().all(|label| label.is_empty()) {
            return Self::default();
        }

        let mut records = Vec::new();
        for record in reader.records() {
            match record {
                Ok(record) => records.push(record.iter().map(to_cell).collect()),
                Err(error) => {
                    debug!(%error, "malformed csv record");
                    return Self::default();
                }
            }
        }
        Self::new(header, records)
    }

    /// Number of data rows (header excluded).
    pub fn row_count(&self) -> usize {
        self.rows
    }

    /// Returns true if the table has no data rows.
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn columns(&self) -> &[RawColumn] {
        &self.columns
    }

    /// Header labels in original order.
    pub fn header(&self) -> Vec<&str> {
        self.columns.iter().map(|column| column.name.as_str()).collect()
    }

    /// Gets a cell by position; `None` for empty cells and out-of-range positions.
    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.columns.get(column)?.cells.get(row)?.as_deref()
    }

    /// Cells of one row in column order.
    pub fn row(&self, row: usize) -> Vec<Option<&str>> {
        self.columns
            .iter()
            .map(|column| column.cells.get(row).and_then(|cell| cell.as_deref()))
            .collect()
    }

    /// Concatenates the non-empty cells of the first `rows` rows, space separated.
    pub fn sample_text(&self, rows: usize) -> String {
        (0..self.rows.min(rows))
            .flat_map(|row| self.row(row))
            .flatten()
            .collect::<Vec<&str>>()
            .join(" ")
    }

    /// Copies the given rows, in the given order, into a new table with the same header.
    pub fn select_rows(&self, rows: &[usize]) -> Self {
        let columns: Vec<RawColumn> = self
            .columns
            .iter()
            .map(|column| RawColumn {
                name: column.name.to_owned(),
                cells: rows
                    .iter()
                    .map(|row| column.cells.get(*row).cloned().flatten())
                    .collect(),
            })
            .collect();
        let rows = if columns.is_empty() { 0 } else { rows.len() };
        Self { columns, rows }
    }

    #[cfg(test)]
    pub(crate) fn from_literal(header: &[&str], records: &[&[&str]]) -> Self {
        Self::new(
            header.iter().map(|label| label.to_string()).collect(),
            records
                .iter()
                .map(|record| record.iter().map(|cell| to_cell(cell)).collect())
                .collect(),
        )
    }
}

fn to_cell(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_csv_basic() {
        let table = RawTable::parse_csv("Data,Nome,Avaliacao\n2025-01-01,Ana,9\n2025-01-02,Rui,6\n");
        assert_eq!(table.header(), vec!["Data", "Nome", "Avaliacao"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.cell(1, 1), Some("Rui"));
        assert_eq!(table.cell(1, 2), Some("6"));
    }

    #[test]
    fn test_parse_csv_pads_and_truncates_records() {
        let table = RawTable::parse_csv("A,B,C\n1\n1,2,3,4\n");
        assert_eq!(table.row_count(), 2);
        for column in table.columns() {
            assert_eq!(column.cells.len(), 2);
        }
        assert_eq!(table.cell(0, 1), None);
        assert_eq!(table.cell(1, 2), Some("3"));
    }

    #[test]
    fn test_parse_csv_drops_blank_rows() {
        let table = RawTable::parse_csv("A,B\n,\n1,2\n , \n");
        assert_eq!(table.row_count(), 1);
        assert_eq!(table.row(0), vec![Some("1"), Some("2")]);
    }

    #[test]
    fn test_parse_csv_header_only_is_empty() {
        let table = RawTable::parse_csv("A,B,C\n");
        assert!(table.is_empty());
        assert_eq!(table.header().len(), 3);
    }

    #[test]
    fn test_parse_csv_strips_bom_and_trims_labels() {
        let table = RawTable::parse_csv("\u{feff} Nota ,Loja\n10,Centro\n");
        assert_eq!(table.header(), vec!["Nota", "Loja"]);
    }

    #[test]
    fn test_parse_csv_quoted_fields() {
        let table = RawTable::parse_csv("Nota,Comentario\n3,\"Demorou, e veio errado\"\n");
        assert_eq!(table.cell(0, 1), Some("Demorou, e veio errado"));
    }

    #[test]
    fn test_parse_empty_text() {
        assert!(RawTable::parse_csv("").is_empty());
        assert!(RawTable::parse_csv("\n\n").is_empty());
    }

    #[test]
    fn test_sample_text_limits_rows() {
        let table = RawTable::from_literal(&["A", "B"], &[&["x", "1"], &["y", ""], &["z", "3"]]);
        assert_eq!(table.sample_text(2), "x 1 y");
        assert_eq!(table.sample_text(10), "x 1 y z 3");
    }

    #[test]
    fn test_select_rows_keeps_header_and_order() {
        let table = RawTable::from_literal(&["A", "B"], &[&["x", "1"], &["y", "2"], &["z", "3"]]);
        let selected = table.select_rows(&[2, 0]);
        assert_eq!(selected.header(), vec!["A", "B"]);
        assert_eq!(selected.row_count(), 2);
        assert_eq!(selected.row(0), vec![Some("z"), Some("3")]);
        assert_eq!(selected.row(1), vec![Some("x"), Some("1")]);
    }
}
