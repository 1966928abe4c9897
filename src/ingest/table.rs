use std::fmt;

use serde::{Deserialize, Serialize};

use super::delimited::header_names;
use super::{ParseError, TextEncoding};

/// Container format a table was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    /// Delimited text with a non-tab delimiter
    Csv,
    /// Tab-delimited text
    Tsv,
    /// Office Open XML workbook (first worksheet)
    Xlsx,
}

impl SourceFormat {
    /// Guess the format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(SourceFormat::Csv),
            "tsv" | "tab" => Some(SourceFormat::Tsv),
            "xlsx" => Some(SourceFormat::Xlsx),
            _ => None,
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceFormat::Csv => write!(f, "CSV"),
            SourceFormat::Tsv => write!(f, "TSV"),
            SourceFormat::Xlsx => write!(f, "XLSX"),
        }
    }
}

/// A parsed tabular file: column names plus raw string cells.
///
/// Cells are stored exactly as read (after decoding and NFC normalization),
/// untrimmed. Data rows are addressed by a 1-based row number where row 1 is
/// the first row after the header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawTable {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
    format: SourceFormat,
    encoding: Option<TextEncoding>,
    delimiter: Option<char>,
}

impl RawTable {
    pub(crate) fn new(
        columns: Vec<String>,
        rows: Vec<Vec<String>>,
        format: SourceFormat,
        encoding: Option<TextEncoding>,
        delimiter: Option<char>,
    ) -> Self {
        Self {
            columns,
            rows,
            format,
            encoding,
            delimiter,
        }
    }

    /// Build a table from in-memory rows.
    ///
    /// The header goes through the same checks as a parsed file, and every
    /// row must be as wide as the header.
    pub fn from_rows<H, R, C>(header: H, rows: R) -> Result<Self, ParseError>
    where
        H: IntoIterator,
        H::Item: AsRef<str>,
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        let header: Vec<String> = header.into_iter().map(|h| h.as_ref().to_string()).collect();
        let columns = header_names(header.iter().map(String::as_str))?;

        let mut data = Vec::new();
        for (i, row) in rows.into_iter().enumerate() {
            let row: Vec<String> = row.into_iter().map(Into::into).collect();
            if row.len() != columns.len() {
                return Err(ParseError::MalformedRow {
                    line: i + 2,
                    expected: columns.len(),
                    found: row.len(),
                });
            }
            data.push(row);
        }

        Ok(Self::new(
            columns,
            data,
            SourceFormat::Csv,
            Some(TextEncoding::Utf8),
            Some(','),
        ))
    }

    /// Column names in file order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Position of a column by exact name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Number of data rows (header excluded)
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no data rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// A data row by its 1-based row number
    pub fn row(&self, row_number: usize) -> Option<&[String]> {
        row_number
            .checked_sub(1)
            .and_then(|i| self.rows.get(i))
            .map(Vec::as_slice)
    }

    /// Iterate over `(row_number, cells)` in file order
    pub fn rows(&self) -> impl ExactSizeIterator<Item = (usize, &[String])> + '_ {
        self.rows
            .iter()
            .enumerate()
            .map(|(i, row)| (i + 1, row.as_slice()))
    }

    /// Raw cell at a 1-based row number and column position
    pub fn cell(&self, row_number: usize, column: usize) -> Option<&str> {
        self.row(row_number)
            .and_then(|row| row.get(column))
            .map(String::as_str)
    }

    /// Format the table was read from
    pub fn format(&self) -> SourceFormat {
        self.format
    }

    /// Text encoding of delimited input (`None` for workbooks)
    pub fn encoding(&self) -> Option<TextEncoding> {
        self.encoding
    }

    /// Delimiter of delimited input (`None` for workbooks)
    pub fn delimiter(&self) -> Option<char> {
        self.delimiter
    }

    pub(crate) fn raw_rows(&self) -> &[Vec<String>] {
        &self.rows
    }
}
