use log::debug;

use super::{IngestLimits, ParseError};

/// Delimiters considered during detection, in tie-reporting order.
pub(crate) const DELIMITER_CANDIDATES: [u8; 4] = [b',', b'\t', b';', b'|'];

/// Number of non-blank lines sampled for delimiter detection.
const SAMPLE_LINES: usize = 50;

/// Field counts observed when splitting the sample with one candidate.
#[derive(Debug)]
struct CandidateScore {
    delimiter: u8,
    header_fields: usize,
    consistent: bool,
}

fn score_candidate(sample: &str, delimiter: u8) -> CandidateScore {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(sample.as_bytes());

    let mut header_fields = 0;
    let mut consistent = true;
    for (i, record) in reader.records().enumerate() {
        let Ok(record) = record else {
            consistent = false;
            break;
        };
        if i == 0 {
            header_fields = record.len();
        } else if record.len() != header_fields {
            consistent = false;
        }
    }

    CandidateScore {
        delimiter,
        header_fields,
        consistent: consistent && header_fields >= 2,
    }
}

/// Pick the delimiter that splits the sample into a consistent grid.
///
/// The widest consistent split wins; equally wide consistent splits are
/// ambiguous. When no candidate is consistent the header decides alone.
pub(crate) fn detect_delimiter(text: &str) -> Result<u8, ParseError> {
    let sample: Vec<&str> = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .take(SAMPLE_LINES)
        .collect();
    let sample = sample.join("\n");

    let scores: Vec<CandidateScore> = DELIMITER_CANDIDATES
        .iter()
        .map(|&d| score_candidate(&sample, d))
        .collect();
    debug!("Delimiter scores: {:?}", scores);

    let best_width = scores
        .iter()
        .filter(|s| s.consistent)
        .map(|s| s.header_fields)
        .max();

    if let Some(width) = best_width {
        let winners: Vec<u8> = scores
            .iter()
            .filter(|s| s.consistent && s.header_fields == width)
            .map(|s| s.delimiter)
            .collect();
        return match winners.as_slice() {
            [single] => Ok(*single),
            _ => Err(ParseError::DelimiterAmbiguous {
                candidates: winners.iter().map(|&d| d as char).collect(),
            }),
        };
    }

    let in_header: Vec<u8> = scores
        .iter()
        .filter(|s| s.header_fields >= 2)
        .map(|s| s.delimiter)
        .collect();
    match in_header.as_slice() {
        [] => Ok(b','),
        [single] => Ok(*single),
        _ => Err(ParseError::DelimiterAmbiguous {
            candidates: in_header.iter().map(|&d| d as char).collect(),
        }),
    }
}

/// Turn header cells into column names: trimmed, non-empty, unique.
pub(crate) fn header_names<'a, I>(cells: I) -> Result<Vec<String>, ParseError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut columns: Vec<String> = Vec::new();
    for (i, cell) in cells.into_iter().enumerate() {
        let name = cell.trim().to_string();
        if name.is_empty() {
            return Err(ParseError::EmptyHeader { column: i + 1 });
        }
        if let Some(first) = columns.iter().position(|c| *c == name) {
            return Err(ParseError::DuplicateColumn {
                name,
                first: first + 1,
                second: i + 1,
            });
        }
        columns.push(name);
    }
    if columns.is_empty() {
        return Err(ParseError::EmptyInput);
    }
    Ok(columns)
}

/// Split normalized text into a header and data rows.
pub(crate) fn parse_delimited(
    text: &str,
    delimiter: u8,
    limits: &IngestLimits,
) -> Result<(Vec<String>, Vec<Vec<String>>), ParseError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut records = reader.records();
    let header = loop {
        match records.next() {
            Some(record) => {
                let record = record?;
                if !is_blank(&record) {
                    break record;
                }
            }
            None => return Err(ParseError::EmptyInput),
        }
    };
    let columns = header_names(header.iter())?;

    let mut rows = Vec::new();
    for record in records {
        let record = record?;
        if is_blank(&record) {
            continue;
        }
        if record.len() != columns.len() {
            return Err(ParseError::MalformedRow {
                line: record.position().map(|p| p.line() as usize).unwrap_or(0),
                expected: columns.len(),
                found: record.len(),
            });
        }
        if rows.len() == limits.max_rows {
            return Err(ParseError::RowLimitExceeded {
                limit: limits.max_rows,
            });
        }
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok((columns, rows))
}

fn is_blank(record: &csv::StringRecord) -> bool {
    record.len() <= 1 && record.iter().all(|field| field.trim().is_empty())
}
