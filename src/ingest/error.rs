use super::TextEncoding;

/// Errors that can occur while ingesting a tabular file.
///
/// Every variant is fatal to the pipeline run: no partial table is produced.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// I/O error reading the input file
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// Bytes are not valid in the declared or detected encoding
    #[error("Encoding error: input is not valid {encoding} (first invalid byte at offset {offset})")]
    EncodingError {
        /// Encoding the input was decoded with
        encoding: TextEncoding,
        /// Byte offset of the first undecodable sequence
        offset: usize,
    },

    /// More than one delimiter explains the sample equally well
    #[error("Ambiguous delimiter: {} all split the header consistently", display_delimiters(.candidates))]
    DelimiterAmbiguous {
        /// Delimiters that remained viable
        candidates: Vec<char>,
    },

    /// The declared delimiter is not a single ASCII character
    #[error("Unsupported delimiter {0:?}: must be a single ASCII character")]
    UnsupportedDelimiter(char),

    /// A data row does not have as many fields as the header
    #[error("Malformed row at line {line}: expected {expected} fields, found {found}")]
    MalformedRow {
        /// 1-based physical line (or worksheet row) of the record
        line: usize,
        /// Number of header columns
        expected: usize,
        /// Number of fields in the offending record
        found: usize,
    },

    /// The file has more data rows than the configured ceiling
    #[error("Row limit exceeded: file has more than {limit} data rows")]
    RowLimitExceeded {
        /// Configured maximum number of data rows
        limit: usize,
    },

    /// The file is larger than the configured byte ceiling
    #[error("Byte limit exceeded: {size} bytes (limit {limit})")]
    ByteLimitExceeded {
        /// Configured maximum size in bytes
        limit: usize,
        /// Observed size in bytes
        size: usize,
    },

    /// Two header cells carry the same name
    #[error("Duplicate column name '{name}' at positions {first} and {second}")]
    DuplicateColumn {
        /// The repeated column name
        name: String,
        /// 1-based position of the first occurrence
        first: usize,
        /// 1-based position of the repeated occurrence
        second: usize,
    },

    /// A header cell is empty
    #[error("Empty column name at position {column}")]
    EmptyHeader {
        /// 1-based column position
        column: usize,
    },

    /// The input has no header row
    #[error("Input contains no header row")]
    EmptyInput,

    /// CSV/TSV tokenizer error
    #[error("CSV parsing error: {0}")]
    CsvError(#[from] csv::Error),

    /// The XLSX container could not be opened
    #[error("ZIP error: {0}")]
    ZipError(#[from] zip::result::ZipError),

    /// The XLSX workbook is structurally invalid
    #[error("Workbook error: {0}")]
    Workbook(String),
}

fn display_delimiters(candidates: &[char]) -> String {
    candidates
        .iter()
        .map(|c| match c {
            '\t' => "'\\t'".to_string(),
            other => format!("'{}'", other),
        })
        .collect::<Vec<_>>()
        .join(", ")
}
