//! Dynamically typed CSV tables.
//!
//! Typed records (`PassRow`, `FeatureVector`, ...) are written straight
//! through serde. Joins and model inputs need to address columns by name
//! and tolerate gaps, so they work on a [`Table`] of [`Cell`]s instead.

use serde::Serialize;
use std::fmt;
use std::io::{Read, Write};
use std::path::Path;
use tracing::debug;

use crate::error::{DatasetError, DatasetResult};

/// One table cell.
#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    Number(f64),
    Text(String),
    Missing,
}

impl Cell {
    /// Interpret a raw CSV field: empty is missing, numeric text is a number.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Cell::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(v) if v.is_nan() => Cell::Missing,
            Ok(v) => Cell::Number(v),
            Err(_) => Cell::Text(trimmed.to_string()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Number(v) => write!(f, "{}", v),
            Cell::Text(s) => f.write_str(s),
            Cell::Missing => Ok(()),
        }
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        if v.is_nan() {
            Cell::Missing
        } else {
            Cell::Number(v)
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

/// Named columns over rows of cells.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append a row; its width must match the header.
    pub fn push_row(&mut self, row: Vec<Cell>) -> DatasetResult<()> {
        if row.len() != self.columns.len() {
            return Err(DatasetError::RaggedRow {
                row: self.rows.len(),
                found: row.len(),
                expected: self.columns.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Index of a column that must exist.
    pub fn require_column(&self, table: &str, name: &str) -> DatasetResult<usize> {
        self.column_index(name)
            .ok_or_else(|| DatasetError::missing_column(table, name))
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&Cell> {
        self.rows.get(row).and_then(|r| r.get(column))
    }

    /// Numeric view of a column; non-numeric cells are `None`.
    pub fn numeric_column(&self, column: usize) -> Vec<Option<f64>> {
        self.rows.iter().map(|r| r[column].as_f64()).collect()
    }

    /// Replace every missing cell of a column. Returns the number replaced.
    pub fn fill_missing(&mut self, column: usize, value: Cell) -> usize {
        let mut filled = 0;
        for row in &mut self.rows {
            if row[column].is_missing() {
                row[column] = value.clone();
                filled += 1;
            }
        }
        filled
    }

    /// Rows reordered by `order` (indices into the current rows).
    pub fn select_rows(&self, order: &[usize]) -> Self {
        Self {
            columns: self.columns.clone(),
            rows: order.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }

    /// Read a table from any CSV source with a header row.
    pub fn from_reader<R: Read>(reader: R) -> DatasetResult<Self> {
        Self::from_reader_with_text(reader, &[])
    }

    /// Read a table, keeping the fields of `text_columns` verbatim.
    ///
    /// Identifier columns go through here so that `007` stays `007`
    /// instead of becoming the number 7.
    pub fn from_reader_with_text<R: Read>(reader: R, text_columns: &[&str]) -> DatasetResult<Self> {
        let mut csv = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);
        let columns: Vec<String> = csv.headers()?.iter().map(str::to_string).collect();
        let verbatim: Vec<bool> = columns
            .iter()
            .map(|c| text_columns.contains(&c.as_str()))
            .collect();
        let mut table = Self::new(columns);

        for record in csv.records() {
            let record = record?;
            let row = record
                .iter()
                .zip(&verbatim)
                .map(|(field, &keep)| match (keep, field.is_empty()) {
                    (true, false) => Cell::Text(field.to_string()),
                    (true, true) => Cell::Missing,
                    (false, _) => Cell::parse(field),
                })
                .collect();
            table.push_row(row)?;
        }
        Ok(table)
    }

    /// Read a CSV file.
    pub fn read_csv(path: impl AsRef<Path>) -> DatasetResult<Self> {
        Self::read_csv_with_text(path, &[])
    }

    /// Read a CSV file, keeping the fields of `text_columns` verbatim.
    pub fn read_csv_with_text(path: impl AsRef<Path>, text_columns: &[&str]) -> DatasetResult<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let table = Self::from_reader_with_text(std::io::BufReader::new(file), text_columns)?;
        debug!(path = %path.display(), rows = table.len(), cols = table.columns.len(), "Read table");
        Ok(table)
    }

    /// Write the table as CSV with a header row.
    pub fn to_writer<W: Write>(&self, writer: W) -> DatasetResult<()> {
        let mut csv = csv::Writer::from_writer(writer);
        csv.write_record(&self.columns)?;
        for row in &self.rows {
            csv.write_record(row.iter().map(|c| c.to_string()))?;
        }
        csv.flush()?;
        Ok(())
    }

    /// Write a CSV file.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> DatasetResult<()> {
        let file = std::fs::File::create(path.as_ref())?;
        self.to_writer(std::io::BufWriter::new(file))
    }

    /// Build a table from serialisable records, using their field names as columns.
    pub fn from_records<T: Serialize>(records: &[T]) -> DatasetResult<Self> {
        let mut buf = Vec::new();
        write_records(&mut buf, records)?;
        if buf.is_empty() {
            return Ok(Self::default());
        }
        Self::from_reader(buf.as_slice())
    }
}

/// Serialise typed records as CSV with a header row.
pub fn write_records<W: Write, T: Serialize>(writer: W, records: &[T]) -> DatasetResult<()> {
    let mut csv = csv::Writer::from_writer(writer);
    for record in records {
        csv.serialize(record)?;
    }
    csv.flush()?;
    Ok(())
}

/// Read typed records from a CSV file.
pub fn read_records<T: serde::de::DeserializeOwned>(path: impl AsRef<Path>) -> DatasetResult<Vec<T>> {
    let mut csv = csv::Reader::from_path(path.as_ref())?;
    let records = csv.deserialize().collect::<Result<Vec<T>, _>>()?;
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "pass_id,snr,modcod,note\nA,1.5,QPSK-1/2,\nB,-3,BPSK-1/2,x\n";

    #[test]
    fn test_parse_cells() {
        let table = Table::from_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(table.columns(), &["pass_id", "snr", "modcod", "note"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(0, 1), Some(&Cell::Number(1.5)));
        assert_eq!(table.cell(1, 2), Some(&Cell::Text("BPSK-1/2".into())));
        assert!(table.cell(0, 3).unwrap().is_missing());
    }

    #[test]
    fn test_write_keeps_missing_empty() {
        let table = Table::from_reader(SAMPLE.as_bytes()).unwrap();
        let mut out = Vec::new();
        table.to_writer(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("pass_id,snr,modcod,note\n"));
        assert!(text.contains("A,1.5,QPSK-1/2,\n"));
        assert!(text.contains("B,-3,BPSK-1/2,x\n"));
    }

    #[test]
    fn test_text_columns_kept_verbatim() {
        let csv = "pass_id,snr\n007,1\n1.0,2\n,3\n";
        let table = Table::from_reader_with_text(csv.as_bytes(), &["pass_id"]).unwrap();
        assert_eq!(table.cell(0, 0), Some(&Cell::Text("007".into())));
        assert_eq!(table.cell(1, 0), Some(&Cell::Text("1.0".into())));
        assert!(table.cell(2, 0).unwrap().is_missing());
        assert_eq!(table.cell(0, 1), Some(&Cell::Number(1.0)));

        let mut out = Vec::new();
        table.to_writer(&mut out).unwrap();
        assert!(String::from_utf8(out).unwrap().contains("007,1\n"));
    }

    #[test]
    fn test_ragged_row_rejected() {
        let mut table = Table::new(vec!["a".into(), "b".into()]);
        assert!(table.push_row(vec![Cell::Number(1.0)]).is_err());
        assert!(table.push_row(vec![Cell::Number(1.0), Cell::Missing]).is_ok());
    }

    #[test]
    fn test_from_records_uses_field_names() {
        #[derive(Serialize)]
        struct Rec {
            id: &'static str,
            value: f64,
        }
        let table = Table::from_records(&[Rec { id: "x", value: 2.0 }]).unwrap();
        assert_eq!(table.columns(), &["id", "value"]);
        assert_eq!(table.numeric_column(1), vec![Some(2.0)]);

        let empty: Vec<Rec> = Vec::new();
        assert!(Table::from_records(&empty).unwrap().is_empty());
    }

    #[test]
    fn test_csv_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        let table = Table::from_reader(SAMPLE.as_bytes()).unwrap();
        table.write_csv(&path).unwrap();
        assert_eq!(Table::read_csv(&path).unwrap(), table);
    }
}
