use crate::schema::SchemaError;

/// Run-level harmonization errors.
///
/// Row-level gaps are never errors; they surface as findings.
#[derive(Debug, thiserror::Error)]
pub enum HarmonizationError {
    /// The mapping was confirmed against another template
    #[error("Mapping was confirmed for {found}, not {expected}")]
    TemplateMismatch {
        /// Template passed to harmonize (`id@version`)
        expected: String,
        /// Template the mapping was confirmed for
        found: String,
    },

    /// The mapping was confirmed against a table with another layout
    #[error("Mapped column '{column}' is not at position {index} of the table")]
    TableMismatch {
        /// Source column named by the mapping
        column: String,
        /// Position recorded at confirmation
        index: usize,
    },

    /// The template failed to compile
    #[error("Template error: {0}")]
    Template(#[from] SchemaError),
}
