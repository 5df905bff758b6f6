//! In-memory CSV table
//!
//! Every cell is kept as a string. Nothing is interpreted at load time, so the
//! timestamp reconciler can inspect the raw shape of the export before deciding
//! how to read it.

use std::io::Read;
use std::path::Path;

use super::error::DataResult;

/// A CSV file loaded as strings: one header row plus data rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Build a table from headers and rows. Short rows are padded with empty cells.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Self { headers, rows }
    }

    /// Read a CSV file with a header row.
    pub fn from_path(path: impl AsRef<Path>) -> DataResult<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        Self::from_reader(file)
    }

    /// Read CSV text with a header row from any reader.
    pub fn from_reader<R: Read>(reader: R) -> DataResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = reader
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').to_string())
            .collect::<Vec<_>>();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self::new(headers, rows))
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column, matched exactly (case-sensitive).
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// All values of one column, in row order.
    pub fn column(&self, index: usize) -> impl Iterator<Item = &str> + '_ {
        self.rows.iter().map(move |row| row[index].as_str())
    }

    /// A single record as `(column, value)` pairs in header order.
    pub fn row(&self, index: usize) -> Option<Vec<(&str, &str)>> {
        self.rows.get(index).map(|row| {
            self.headers
                .iter()
                .map(String::as_str)
                .zip(row.iter().map(String::as_str))
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_reader_keeps_strings() {
        let csv = "date,hour,france\n2022-01-01,00:00 - 01:00,124.7\n2022-01-01,01:00 - 02:00,n/e\n";
        let table = RawTable::from_reader(csv.as_bytes()).unwrap();

        assert_eq!(table.headers(), &["date", "hour", "france"]);
        assert_eq!(table.len(), 2);
        let prices: Vec<&str> = table.column(2).collect();
        assert_eq!(prices, vec!["124.7", "n/e"]);
    }

    #[test]
    fn test_short_rows_are_padded() {
        let csv = "a,b,c\n1,2\n";
        let table = RawTable::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(table.row(0).unwrap(), vec![("a", "1"), ("b", "2"), ("c", "")]);
    }

    #[test]
    fn test_byte_order_mark_is_stripped() {
        let csv = "\u{feff}timestamp,price\n2022-01-01 00:00,1.0\n";
        let table = RawTable::from_reader(csv.as_bytes()).unwrap();
        assert!(table.has_column("timestamp"));
    }

    #[test]
    fn test_column_lookup_is_case_sensitive() {
        let table = RawTable::new(vec!["France".to_string()], vec![]);
        assert!(table.has_column("France"));
        assert!(!table.has_column("france"));
        assert!(table.is_empty());
    }
}
