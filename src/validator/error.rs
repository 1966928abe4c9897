use crate::schema::SchemaError;

/// Errors that prevent validation from running at all
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// No ruleset with this version
    #[error("Unknown ruleset version '{version}' (available: {})", .available.join(", "))]
    UnknownRuleset {
        /// Requested version
        version: String,
        /// Versions this build ships
        available: Vec<String>,
    },

    /// The dataset was harmonized against another template
    #[error("Dataset was harmonized with {found}, not {expected}")]
    TemplateMismatch {
        /// Template passed to validate (`id@version`)
        expected: String,
        /// Template of the dataset
        found: String,
    },

    /// The raw table is not the one the dataset was built from
    #[error("Table has {found} row(s) but the dataset was built from {expected}")]
    TableMismatch {
        /// Rows in the dataset
        expected: usize,
        /// Rows in the table
        found: usize,
    },

    /// The template failed to compile
    #[error("Template error: {0}")]
    Template(#[from] SchemaError),
}
