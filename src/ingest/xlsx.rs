//! First-worksheet reader for Office Open XML workbooks.
//!
//! Only what tabular metadata sheets need: shared strings, inline strings,
//! booleans and numbers as written. Formulas are read through their cached
//! value; styles and number formats are ignored.

use std::io::{Cursor, Read};

use log::debug;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use unicode_normalization::UnicodeNormalization;
use zip::ZipArchive;

use super::delimited::header_names;
use super::{IngestLimits, ParseError};

const SHARED_STRINGS: &str = "xl/sharedStrings.xml";
const FIRST_SHEET: &str = "xl/worksheets/sheet1.xml";
const SHEET_DIR: &str = "xl/worksheets/";

fn xml_error(e: impl std::fmt::Display) -> ParseError {
    ParseError::Workbook(format!("invalid XML: {}", e))
}

fn get_attribute(e: &BytesStart, name: &str) -> Result<Option<String>, ParseError> {
    for attr in e.attributes() {
        let attr = attr.map_err(xml_error)?;
        if attr.key.as_ref() == name.as_bytes() {
            let value = std::str::from_utf8(&attr.value)
                .map_err(xml_error)?
                .to_string();
            return Ok(Some(value));
        }
    }
    Ok(None)
}

fn read_part<R: Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
    limits: &IngestLimits,
) -> Result<Vec<u8>, ParseError> {
    let entry = archive.by_name(name)?;
    let mut data = Vec::new();
    entry
        .take(limits.max_bytes as u64 + 1)
        .read_to_end(&mut data)?;
    if data.len() > limits.max_bytes {
        return Err(ParseError::ByteLimitExceeded {
            limit: limits.max_bytes,
            size: data.len(),
        });
    }
    Ok(data)
}

fn first_sheet_name<R: Read + std::io::Seek>(archive: &ZipArchive<R>) -> Result<String, ParseError> {
    let mut sheets: Vec<&str> = archive
        .file_names()
        .filter(|name| {
            name.starts_with(SHEET_DIR)
                && name.ends_with(".xml")
                && !name[SHEET_DIR.len()..].contains('/')
        })
        .collect();
    if sheets.contains(&FIRST_SHEET) {
        return Ok(FIRST_SHEET.to_string());
    }
    sheets.sort_unstable();
    sheets
        .first()
        .map(|s| s.to_string())
        .ok_or_else(|| ParseError::Workbook("workbook contains no worksheets".to_string()))
}

/// Parse `xl/sharedStrings.xml`; phonetic runs (`<rPh>`) are skipped.
fn parse_shared_strings(xml: &[u8]) -> Result<Vec<String>, ParseError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_item = false;
    let mut in_text = false;
    let mut phonetic_depth = 0usize;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"si" => {
                    in_item = true;
                    current.clear();
                }
                b"rPh" => phonetic_depth += 1,
                b"t" if in_item && phonetic_depth == 0 => in_text = true,
                _ => {}
            },
            Ok(Event::Empty(ref e)) => {
                if e.name().as_ref() == b"si" {
                    strings.push(String::new());
                }
            }
            Ok(Event::Text(t)) => {
                if in_text {
                    current.push_str(&t.unescape().map_err(xml_error)?);
                }
            }
            Ok(Event::CData(t)) => {
                if in_text {
                    current.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"si" => {
                    in_item = false;
                    strings.push(std::mem::take(&mut current));
                }
                b"rPh" => phonetic_depth = phonetic_depth.saturating_sub(1),
                b"t" => in_text = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(strings)
}

/// Widest worksheet the format allows (column `XFD`).
const MAX_COLUMNS: usize = 16_384;

/// Convert the letters of an A1-style reference to a 0-based column.
///
/// `Ok(None)` when the reference carries no column letters.
fn column_from_reference(reference: &str) -> Result<Option<usize>, ParseError> {
    let invalid = || ParseError::Workbook(format!("invalid cell reference '{}'", reference));
    let mut index = 0usize;
    for c in reference.chars().take_while(|c| c.is_ascii_alphabetic()) {
        let digit = c.to_ascii_uppercase() as usize - 'A' as usize + 1;
        index = index
            .checked_mul(26)
            .and_then(|i| i.checked_add(digit))
            .filter(|&i| i <= MAX_COLUMNS)
            .ok_or_else(invalid)?;
    }
    Ok(index.checked_sub(1))
}

#[derive(Default)]
struct PendingCell {
    column: usize,
    kind: Option<String>,
    value: String,
}

fn resolve_cell(cell: &PendingCell, shared: &[String]) -> Result<String, ParseError> {
    match cell.kind.as_deref() {
        Some("s") => {
            let index: usize = cell.value.trim().parse().map_err(|_| {
                ParseError::Workbook(format!("invalid shared string index '{}'", cell.value))
            })?;
            shared.get(index).cloned().ok_or_else(|| {
                ParseError::Workbook(format!("shared string index {} out of range", index))
            })
        }
        Some("b") => Ok(match cell.value.trim() {
            "1" => "TRUE".to_string(),
            "0" => "FALSE".to_string(),
            other => other.to_string(),
        }),
        _ => Ok(cell.value.clone()),
    }
}

/// Cells of one physical row as `(0-based column, value)`, in document order.
/// A repeated column keeps its last value when laid out.
type SparseRow = Vec<(usize, String)>;

/// Width a sparse row would take if laid out densely
fn sparse_width(cells: &SparseRow) -> usize {
    cells.iter().map(|(column, _)| column + 1).max().unwrap_or(0)
}

/// Parse a worksheet into physical rows of cells, keyed by 1-based row.
fn parse_sheet(xml: &[u8], shared: &[String]) -> Result<Vec<(usize, SparseRow)>, ParseError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut rows: Vec<(usize, SparseRow)> = Vec::new();
    let mut current_row: Option<(usize, SparseRow)> = None;
    let mut cell: Option<PendingCell> = None;
    let mut in_value = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"row" => {
                    let number = get_attribute(e, "r")?
                        .and_then(|r| r.parse().ok())
                        .unwrap_or_else(|| rows.last().map(|(n, _)| n + 1).unwrap_or(1));
                    current_row = Some((number, Vec::new()));
                }
                b"c" => {
                    let next = current_row
                        .as_ref()
                        .and_then(|(_, r)| r.last())
                        .map(|(c, _)| c + 1)
                        .unwrap_or(0);
                    let column = match get_attribute(e, "r")? {
                        Some(r) => column_from_reference(&r)?.unwrap_or(next),
                        None => next,
                    };
                    if column >= MAX_COLUMNS {
                        return Err(ParseError::Workbook(format!(
                            "cell beyond column XFD in row {}",
                            current_row.as_ref().map(|(n, _)| *n).unwrap_or(0)
                        )));
                    }
                    cell = Some(PendingCell {
                        column,
                        kind: get_attribute(e, "t")?,
                        value: String::new(),
                    });
                }
                b"v" | b"t" => in_value = cell.is_some(),
                _ => {}
            },
            Ok(Event::Empty(ref e)) => {
                if e.name().as_ref() == b"row" {
                    let number = get_attribute(e, "r")?.and_then(|r| r.parse().ok());
                    if let Some(number) = number {
                        rows.push((number, Vec::new()));
                    }
                }
            }
            Ok(Event::Text(t)) => {
                if in_value {
                    if let Some(cell) = cell.as_mut() {
                        cell.value.push_str(&t.unescape().map_err(xml_error)?);
                    }
                }
            }
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"v" | b"t" => in_value = false,
                b"c" => {
                    if let (Some(done), Some((_, row))) = (cell.take(), current_row.as_mut()) {
                        let value = resolve_cell(&done, shared)?;
                        row.push((done.column, value));
                    }
                }
                b"row" => {
                    if let Some(row) = current_row.take() {
                        rows.push(row);
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(rows)
}

/// Read the first worksheet of an XLSX workbook into header and data rows.
pub(crate) fn parse_workbook(
    bytes: &[u8],
    limits: &IngestLimits,
) -> Result<(Vec<String>, Vec<Vec<String>>), ParseError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    let shared = if archive.index_for_name(SHARED_STRINGS).is_some() {
        parse_shared_strings(&read_part(&mut archive, SHARED_STRINGS, limits)?)?
    } else {
        Vec::new()
    };
    let sheet_name = first_sheet_name(&archive)?;
    debug!("Reading worksheet {} ({} shared strings)", sheet_name, shared.len());
    let sheet = read_part(&mut archive, &sheet_name, limits)?;

    let normalize = |s: &str| -> String { s.nfc().collect() };
    let mut physical = parse_sheet(&sheet, &shared)?
        .into_iter()
        .filter(|(_, cells)| cells.iter().any(|(_, c)| !c.trim().is_empty()));

    let (_, header_sparse) = physical.next().ok_or(ParseError::EmptyInput)?;
    let mut header_cells = vec![String::new(); sparse_width(&header_sparse)];
    for (column, value) in &header_sparse {
        header_cells[*column] = normalize(value);
    }
    while header_cells.last().is_some_and(|c| c.trim().is_empty()) {
        header_cells.pop();
    }
    let columns = header_names(header_cells.iter().map(String::as_str))?;
    let width = columns.len();

    let mut rows = Vec::new();
    for (line, sparse) in physical {
        if sparse.iter().any(|(c, v)| *c >= width && !v.is_empty()) {
            return Err(ParseError::MalformedRow {
                line,
                expected: width,
                found: sparse_width(&sparse),
            });
        }
        if rows.len() == limits.max_rows {
            return Err(ParseError::RowLimitExceeded {
                limit: limits.max_rows,
            });
        }
        let mut cells = vec![String::new(); width];
        for (column, value) in sparse.iter().filter(|(c, _)| *c < width) {
            cells[*column] = normalize(value);
        }
        rows.push(cells);
    }

    Ok((columns, rows))
}
