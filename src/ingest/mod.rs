//! # Tabular Ingest
//!
//! Turns the bytes of an uploaded metadata sheet into a [`RawTable`].
//!
//! ## Supported Inputs
//!
//! | Format | Detection | Notes |
//! |--------|-----------|-------|
//! | CSV / semicolon / pipe | delimiter sniffing | RFC 4180 quoting |
//! | TSV | `.tsv` hint or sniffing | |
//! | XLSX | ZIP magic or `.xlsx` hint | first worksheet only (feature `xlsx`) |
//!
//! ## Text Handling
//!
//! Text input is decoded with the declared encoding, or with the encoding
//! named by its byte order mark, or as strict UTF-8. Line endings are unified
//! to `\n` and the text is composed to Unicode NFC before tokenizing, so two
//! visually identical identifiers always compare equal downstream.
//!
//! Cells are kept raw: leading and trailing whitespace survives ingest so the
//! validator can report it.
//!
//! ## Limits
//!
//! [`IngestLimits`] bounds the input size and the number of data rows.
//! Exceeding either is an error; tables are never truncated.

mod delimited;
mod encoding;
mod error;
mod table;
#[cfg(feature = "xlsx")]
mod xlsx;


use std::path::Path;

use log::{debug, info};
use serde::{Deserialize, Serialize};

pub use encoding::TextEncoding;
pub use error::ParseError;
pub use table::{RawTable, SourceFormat};

/// Default ceiling on data rows per file
pub const DEFAULT_MAX_ROWS: usize = 200_000;

/// Default ceiling on input size (100 MiB)
pub const DEFAULT_MAX_BYTES: usize = 100 * 1024 * 1024;

/// Size ceilings applied while reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestLimits {
    /// Maximum number of data rows (header excluded)
    pub max_rows: usize,
    /// Maximum input size in bytes (decompressed size for workbook parts)
    pub max_bytes: usize,
}

impl Default for IngestLimits {
    fn default() -> Self {
        Self {
            max_rows: DEFAULT_MAX_ROWS,
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }
}

/// Options controlling how a file is read
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestOptions {
    /// Size ceilings
    pub limits: IngestLimits,
    /// Declared text encoding; auto-detected when `None`
    pub encoding: Option<TextEncoding>,
    /// Declared delimiter; detected when `None`
    pub delimiter: Option<char>,
    /// Format hint, usually derived from the file extension
    pub format_hint: Option<SourceFormat>,
}

impl IngestOptions {
    /// Create options with default limits and full auto-detection
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the size ceilings
    pub fn with_limits(mut self, limits: IngestLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Declare the text encoding
    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    /// Declare the delimiter
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    /// Set the format hint
    pub fn with_format_hint(mut self, format: SourceFormat) -> Self {
        self.format_hint = Some(format);
        self
    }
}

fn looks_like_workbook(bytes: &[u8], hint: Option<SourceFormat>) -> bool {
    hint == Some(SourceFormat::Xlsx) || bytes.starts_with(b"PK\x03\x04")
}

/// Parse an uploaded file from memory.
///
/// # Errors
///
/// Every [`ParseError`] is fatal: no partial table is returned.
pub fn parse_bytes(bytes: &[u8], options: &IngestOptions) -> Result<RawTable, ParseError> {
    let limits = &options.limits;
    if bytes.len() > limits.max_bytes {
        return Err(ParseError::ByteLimitExceeded {
            limit: limits.max_bytes,
            size: bytes.len(),
        });
    }

    let table = if looks_like_workbook(bytes, options.format_hint) {
        parse_workbook_bytes(bytes, limits)?
    } else {
        parse_text_bytes(bytes, options)?
    };

    info!(
        "Ingested {} table: {} columns, {} rows",
        table.format(),
        table.columns().len(),
        table.row_count()
    );
    Ok(table)
}

#[cfg(feature = "xlsx")]
fn parse_workbook_bytes(bytes: &[u8], limits: &IngestLimits) -> Result<RawTable, ParseError> {
    let (columns, rows) = xlsx::parse_workbook(bytes, limits)?;
    Ok(RawTable::new(columns, rows, SourceFormat::Xlsx, None, None))
}

#[cfg(not(feature = "xlsx"))]
fn parse_workbook_bytes(_bytes: &[u8], _limits: &IngestLimits) -> Result<RawTable, ParseError> {
    Err(ParseError::Workbook(
        "XLSX support not enabled. Rebuild with --features xlsx".to_string(),
    ))
}

fn parse_text_bytes(bytes: &[u8], options: &IngestOptions) -> Result<RawTable, ParseError> {
    let (text, encoding) = encoding::decode(bytes, options.encoding)?;
    let text = encoding::normalize_text(&text);
    if text.trim().is_empty() {
        return Err(ParseError::EmptyInput);
    }

    let delimiter = match (options.delimiter, options.format_hint) {
        (Some(d), _) => u8::try_from(d)
            .ok()
            .filter(u8::is_ascii)
            .ok_or(ParseError::UnsupportedDelimiter(d))?,
        (None, Some(SourceFormat::Tsv)) => b'\t',
        (None, _) => delimited::detect_delimiter(&text)?,
    };
    debug!(
        "Decoded as {}, delimiter {:?}",
        encoding,
        delimiter as char
    );

    let (columns, rows) = delimited::parse_delimited(&text, delimiter, &options.limits)?;
    let format = if delimiter == b'\t' {
        SourceFormat::Tsv
    } else {
        SourceFormat::Csv
    };
    Ok(RawTable::new(
        columns,
        rows,
        format,
        Some(encoding),
        Some(delimiter as char),
    ))
}

/// Parse a file from disk.
///
/// The extension supplies a format hint when `options` has none. The file
/// size is checked against the byte ceiling before anything is read.
pub fn parse_file<P: AsRef<Path>>(path: P, options: &IngestOptions) -> Result<RawTable, ParseError> {
    let path = path.as_ref();
    let size = std::fs::metadata(path)?.len() as usize;
    if size > options.limits.max_bytes {
        return Err(ParseError::ByteLimitExceeded {
            limit: options.limits.max_bytes,
            size,
        });
    }

    let mut options = options.clone();
    if options.format_hint.is_none() {
        options.format_hint = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(SourceFormat::from_extension);
    }

    let bytes = std::fs::read(path)?;
    parse_bytes(&bytes, &options)
}
