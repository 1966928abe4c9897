//! # Field Mapping
//!
//! Binds source columns to canonical template fields.
//!
//! A [`FieldMapping`] is a draft: it may be hand-written, loaded from JSON,
//! or pre-filled from an advisory [`MappingProposal`]. Only
//! [`FieldMapping::confirm`] turns it into a [`ConfirmedMapping`], the sole
//! mapping type the harmonizer accepts. Confirmation never guesses: every
//! required field must name a column that exists.
//!
//! ## JSON Form
//!
//! ```json
//! { "Specimen_ID": "Sample_Name", "Slide_ID": "Slide_Barcode", "Notes": null }
//! ```

mod error;
mod proposal;


use std::collections::BTreeMap;

use log::info;
use serde::{Deserialize, Serialize};

use crate::ingest::RawTable;
use crate::schema::SchemaTemplate;

pub use error::MappingError;
pub use proposal::{
    propose_mapping, propose_mapping_with_threshold, MappingCandidate, MappingProposal,
    DEFAULT_CONFIDENCE_THRESHOLD,
};

/// Draft mapping: canonical field name → source column (`None` = unmapped)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMapping {
    fields: BTreeMap<String, Option<String>>,
}

impl FieldMapping {
    /// Create an empty draft
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a field to a column (builder pattern)
    pub fn with(mut self, field: &str, column: &str) -> Self {
        self.map(field, column);
        self
    }

    /// Map a field to a column
    pub fn map(&mut self, field: &str, column: &str) {
        self.fields
            .insert(field.to_string(), Some(column.to_string()));
    }

    /// Mark a field explicitly unmapped
    pub fn unmap(&mut self, field: &str) {
        self.fields.insert(field.to_string(), None);
    }

    /// Column a field is mapped to
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(|c| c.as_deref())
    }

    /// Iterate over `(field, column)` entries in field-name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.fields.iter().map(|(f, c)| (f.as_str(), c.as_deref()))
    }

    /// Number of entries (mapped or explicitly unmapped)
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the draft is empty
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Parse a draft from JSON
    pub fn from_json(json: &str) -> Result<Self, MappingError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize the draft as pretty JSON
    pub fn to_json_pretty(&self) -> Result<String, MappingError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Confirm the draft against a table and template.
    ///
    /// Checks run in order: unknown fields, unknown or shared columns, then
    /// unmapped required fields (all of them reported at once).
    pub fn confirm(
        self,
        table: &RawTable,
        template: &SchemaTemplate,
    ) -> Result<ConfirmedMapping, MappingError> {
        for field in self.fields.keys() {
            if template.field(field).is_none() {
                return Err(MappingError::UnknownField {
                    field: field.clone(),
                    template: template.reference(),
                });
            }
        }

        let mut by_column: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        for (field, column) in self.iter() {
            let Some(column) = column else { continue };
            if table.column_index(column).is_none() {
                return Err(MappingError::UnknownColumn {
                    field: field.to_string(),
                    column: column.to_string(),
                    available: table.columns().to_vec(),
                });
            }
            by_column.entry(column).or_default().push(field.to_string());
        }
        if let Some((column, fields)) = by_column.into_iter().find(|(_, f)| f.len() > 1) {
            return Err(MappingError::ColumnReused {
                column: column.to_string(),
                fields,
            });
        }

        let unmapped_required: Vec<String> = template
            .fields
            .iter()
            .filter(|f| f.required && self.get(&f.name).is_none())
            .map(|f| f.name.clone())
            .collect();
        if !unmapped_required.is_empty() {
            return Err(MappingError::UnmappedRequired {
                fields: unmapped_required,
            });
        }

        let mut bindings = Vec::new();
        let mut unmapped = Vec::new();
        for (field_index, field) in template.fields.iter().enumerate() {
            match self.get(&field.name) {
                Some(column) => {
                    let column_index = table.column_index(column).unwrap_or_default();
                    bindings.push(ColumnBinding {
                        field: field.name.clone(),
                        field_index,
                        column: column.to_string(),
                        column_index,
                    });
                }
                None => unmapped.push(field.name.clone()),
            }
        }

        info!(
            "Confirmed mapping for {}: {} mapped, {} unmapped",
            template.reference(),
            bindings.len(),
            unmapped.len()
        );
        Ok(ConfirmedMapping {
            template_id: template.id.clone(),
            template_version: template.version.clone(),
            bindings,
            unmapped,
        })
    }
}

/// One confirmed field → column binding
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnBinding {
    /// Canonical field name
    pub field: String,
    /// Position of the field in template order
    #[serde(skip)]
    pub field_index: usize,
    /// Source column name
    pub column: String,
    /// Position of the column in the source table
    #[serde(skip)]
    pub column_index: usize,
}

/// A mapping checked against one table and one template.
///
/// Only produced by [`FieldMapping::confirm`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmedMapping {
    template_id: String,
    template_version: String,
    bindings: Vec<ColumnBinding>,
    unmapped: Vec<String>,
}

impl ConfirmedMapping {
    /// Id of the template the mapping was confirmed against
    pub fn template_id(&self) -> &str {
        &self.template_id
    }

    /// Version of the template the mapping was confirmed against
    pub fn template_version(&self) -> &str {
        &self.template_version
    }

    /// Mapped fields in template order
    pub fn bindings(&self) -> &[ColumnBinding] {
        &self.bindings
    }

    /// Unmapped fields in template order
    pub fn unmapped_fields(&self) -> &[String] {
        &self.unmapped
    }

    /// Binding of a field
    pub fn binding(&self, field: &str) -> Option<&ColumnBinding> {
        self.bindings.iter().find(|b| b.field == field)
    }

    /// Source column of a field
    pub fn column_for(&self, field: &str) -> Option<&str> {
        self.binding(field).map(|b| b.column.as_str())
    }

    /// Back to a draft, e.g. to save the mapping for a later run
    pub fn to_draft(&self) -> FieldMapping {
        let mut draft = FieldMapping::new();
        for binding in &self.bindings {
            draft.map(&binding.field, &binding.column);
        }
        for field in &self.unmapped {
            draft.unmap(field);
        }
        draft
    }
}
