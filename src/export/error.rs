/// Errors that can occur while building or writing an export bundle
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// Export is refused while any blocker remains
    #[error("Export refused: {count} blocker issue(s) must be resolved first")]
    BlockersPresent {
        /// Number of blocker issues
        count: usize,
    },

    /// Dataset and template disagree
    #[error("Dataset was harmonized with {found}, not {expected}")]
    TemplateMismatch {
        /// Template passed to the exporter (`id@version`)
        expected: String,
        /// Template of the dataset
        found: String,
    },

    /// Output path is already taken
    #[error("Output already exists: {0}")]
    AlreadyExists(String),

    /// Bundle path does not exist
    #[error("Bundle not found: {0}")]
    NotFound(String),

    /// I/O error while writing or reading a bundle
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// CSV rendering error
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),

    /// ZIP container error
    #[error("ZIP error: {0}")]
    ZipError(#[from] zip::result::ZipError),
}
