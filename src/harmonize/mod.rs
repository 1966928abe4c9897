//! # Harmonization Engine
//!
//! Turns a parsed table, a confirmed mapping and a schema template into
//! canonical entities and a relationship graph.
//!
//! ## Algorithm
//!
//! 1. **Normalize** (row-parallel with the `parallel` feature): every mapped
//!    cell is trimmed, resolved through the synonym table, case-coerced and,
//!    for dates, rewritten as ISO-8601. Results are collected in row order.
//! 2. **Construct**: per entity type with a key field, a row constructs an
//!    entity when its key is valid and every required attribute of that type
//!    is valid. Rows sharing a natural key collapse into one entity.
//!    Attributes are first-write-wins in file order; a differing later value
//!    is recorded as an attribute conflict.
//! 3. **Identify**: canonical ids (`CM-SLD-000001`, ...) follow the
//!    lexicographic order of natural keys, so they do not depend on row order.
//! 4. **Link**: the parent key cell in the same row is the child's foreign
//!    key. Unresolvable keys, multi-parent children and orphans make the
//!    relationship invalid.
//!
//! Harmonization never fails because of a bad row; every gap becomes a
//! [`Finding`] that the validator turns into an issue.
//!
//! ## Example
//!
//! ```rust,no_run
//! use cmmo::harmonize::{harmonize, HarmonizeOptions};
//! use cmmo::ingest::{parse_file, IngestOptions};
//! use cmmo::mapping::FieldMapping;
//! use cmmo::schema::SchemaRegistry;
//!
//! let registry = SchemaRegistry::builtin();
//! let template = registry.get("cosmx", "1.2")?;
//! let table = parse_file("samples.csv", &IngestOptions::default())?;
//! let json = std::fs::read_to_string("mapping.json")?;
//! let mapping = FieldMapping::from_json(&json)?.confirm(&table, template)?;
//!
//! let dataset = harmonize(&table, &mapping, template, &HarmonizeOptions::default())?;
//! println!("{:?}", dataset.summary().entity_counts);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod dataset;
mod error;
mod finding;
mod graph;
mod normalize;

#[cfg(test)]
mod tests;

#[cfg(feature = "parallel")]
use log::debug;
use log::info;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::ingest::RawTable;
use crate::mapping::{ColumnBinding, ConfirmedMapping};
use crate::schema::{CompiledTemplate, SchemaTemplate};

pub use dataset::{
    CanonicalEntity, EntityRef, EntityRelationship, HarmonizationSummary, HarmonizedDataset,
    JoinIndex,
};
pub use error::HarmonizationError;
pub use finding::{Finding, FindingKind};
pub use graph::canonical_id;
pub use normalize::{
    normalize_value, parse_date, Adjustment, Defect, NormalizedValue, ACCEPTED_DATE_FORMATS,
    ISO_DATE_FORMAT,
};

use graph::{EntityGraph, Projection};

/// Harmonization settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarmonizeOptions {
    /// Normalize rows in parallel (requires the `parallel` feature)
    pub parallel: bool,
    /// Minimum row count before normalization goes parallel
    pub parallel_threshold: usize,
}

impl Default for HarmonizeOptions {
    fn default() -> Self {
        Self {
            parallel: true,
            parallel_threshold: 1024,
        }
    }
}

impl HarmonizeOptions {
    /// Sequential normalization regardless of table size
    pub fn sequential() -> Self {
        Self {
            parallel: false,
            ..Self::default()
        }
    }
}

fn normalize_row(
    row: &[String],
    bindings: &[ColumnBinding],
    compiled: &CompiledTemplate<'_>,
) -> Vec<NormalizedValue> {
    let fields = &compiled.template().fields;
    bindings
        .iter()
        .map(|binding| {
            let raw = row.get(binding.column_index).map(String::as_str).unwrap_or("");
            normalize_value(
                &fields[binding.field_index],
                compiled.pattern(binding.field_index),
                raw,
            )
        })
        .collect()
}

#[cfg(feature = "parallel")]
fn normalize_rows(
    table: &RawTable,
    bindings: &[ColumnBinding],
    compiled: &CompiledTemplate<'_>,
    options: &HarmonizeOptions,
) -> Vec<Vec<NormalizedValue>> {
    let rows = table.raw_rows();
    if options.parallel && rows.len() >= options.parallel_threshold {
        debug!("Normalizing {} rows in parallel", rows.len());
        return rows
            .par_iter()
            .map(|row| normalize_row(row, bindings, compiled))
            .collect();
    }
    rows.iter()
        .map(|row| normalize_row(row, bindings, compiled))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn normalize_rows(
    table: &RawTable,
    bindings: &[ColumnBinding],
    compiled: &CompiledTemplate<'_>,
    _options: &HarmonizeOptions,
) -> Vec<Vec<NormalizedValue>> {
    table
        .raw_rows()
        .iter()
        .map(|row| normalize_row(row, bindings, compiled))
        .collect()
}

/// Field-level findings of one row, in template field order.
///
/// A defective value yields only its whitespace correction and the defect;
/// a valid value yields every correction applied to it.
fn field_findings(projection: &Projection<'_>, row: usize, findings: &mut Vec<Finding>) {
    for (field_index, field) in projection.template.fields.iter().enumerate() {
        let Some(value) = projection.value(row, field_index) else {
            continue;
        };
        let raw = projection.raw(row, field_index);
        let finding = |kind: FindingKind, normalized: Option<String>| Finding {
            kind,
            field: field.name.clone(),
            row: row + 1,
            value: raw.to_string(),
            normalized,
        };

        match (&value.value, value.defect) {
            (Some(normalized), _) => findings.extend(
                value
                    .adjustments
                    .iter()
                    .map(|&a| finding(FindingKind::from_adjustment(a), Some(normalized.clone()))),
            ),
            (None, Some(defect)) => {
                if value.adjustments.contains(&Adjustment::Trimmed) {
                    findings.push(finding(FindingKind::Whitespace, Some(value.trimmed.clone())));
                }
                findings.push(finding(FindingKind::from_defect(defect, field.required), None));
            }
            (None, None) => {}
        }
    }
}

/// Harmonize a table into canonical entities.
///
/// Fails only on run-level problems: a mapping confirmed for another template
/// or table layout, or a template whose patterns do not compile.
pub fn harmonize(
    table: &RawTable,
    mapping: &ConfirmedMapping,
    template: &SchemaTemplate,
    options: &HarmonizeOptions,
) -> Result<HarmonizedDataset, HarmonizationError> {
    if mapping.template_id() != template.id || mapping.template_version() != template.version {
        return Err(HarmonizationError::TemplateMismatch {
            expected: template.reference(),
            found: format!("{}@{}", mapping.template_id(), mapping.template_version()),
        });
    }
    for binding in mapping.bindings() {
        let column = table.columns().get(binding.column_index);
        let field = template.fields.get(binding.field_index).map(|f| &f.name);
        if column != Some(&binding.column) || field != Some(&binding.field) {
            return Err(HarmonizationError::TableMismatch {
                column: binding.column.clone(),
                index: binding.column_index,
            });
        }
    }

    let compiled = template.compile()?;
    info!(
        "Harmonizing {} row(s) against {}",
        table.row_count(),
        template.reference()
    );

    // Phase 1: normalize every mapped cell, collected in row order
    let bindings = mapping.bindings();
    let rows = normalize_rows(table, bindings, &compiled, options);

    let mut slots = vec![None; template.fields.len()];
    for (position, binding) in bindings.iter().enumerate() {
        slots[binding.field_index] = Some((position, binding.column_index));
    }
    let projection = Projection {
        template,
        table,
        slots,
        rows,
    };

    // Phase 2: field findings, then entities and relationships, sequentially
    let mut findings = Vec::new();
    for row in 0..projection.rows.len() {
        field_findings(&projection, row, &mut findings);
    }
    let graph = EntityGraph::build(&projection, &mut findings);

    let dataset = HarmonizedDataset {
        template_id: template.id.clone(),
        template_version: template.version.clone(),
        total_rows: table.row_count(),
        mapping: mapping.clone(),
        entities: graph.entities,
        relationships: graph.relationships,
        findings,
    };

    let summary = dataset.summary();
    info!(
        "Harmonized {} row(s): {} entities, {} finding(s), relationships {}",
        dataset.total_rows,
        summary.entity_counts.values().sum::<usize>(),
        dataset.findings.len(),
        if summary.all_relationships_valid() {
            "valid"
        } else {
            "invalid"
        }
    );
    Ok(dataset)
}
