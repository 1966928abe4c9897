/// Errors raised when confirming a field mapping.
///
/// All of these are recoverable by the operator editing the mapping.
#[derive(Debug, thiserror::Error)]
pub enum MappingError {
    /// Required fields are not mapped to any column
    #[error("Unmapped required field(s): {}", .fields.join(", "))]
    UnmappedRequired {
        /// Unmapped required fields, in template order
        fields: Vec<String>,
    },

    /// The mapping names a field the template does not define
    #[error("Unknown field '{field}' for template {template}")]
    UnknownField {
        /// The unknown field
        field: String,
        /// Template reference (`id@version`)
        template: String,
    },

    /// The mapping points a field at a column the table does not have
    #[error("Field '{field}' is mapped to unknown column '{column}' (available: {})", .available.join(", "))]
    UnknownColumn {
        /// Canonical field
        field: String,
        /// Missing source column
        column: String,
        /// Columns present in the table
        available: Vec<String>,
    },

    /// One column is mapped to more than one field
    #[error("Column '{column}' is mapped to more than one field: {}", .fields.join(", "))]
    ColumnReused {
        /// The shared column
        column: String,
        /// Fields mapped to it
        fields: Vec<String>,
    },

    /// Mapping file could not be parsed
    #[error("Invalid mapping JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}
